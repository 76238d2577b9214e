use std::io::Read;

use anyhow::Context;
use clap::Parser;

use stockreloc_cli::cli::Cli;
use stockreloc_cli::scenario;
use stockreloc_inventory::ReservationSettings;

fn main() -> anyhow::Result<()> {
    stockreloc_observability::init();

    let cli = Cli::parse();
    let input = match cli.cmd.scenario_path() {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read scenario from stdin")?;
            buf
        }
    };

    let settings = ReservationSettings::from_env();
    let operation = cli.cmd.operation();
    tracing::info!(?operation, ?settings, "running scenario");

    let output = scenario::run(operation, &input, settings)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
