//! Command-line surface of the `stockreloc` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::scenario::Operation;

#[derive(Debug, Parser)]
#[command(name = "stockreloc")]
#[command(about = "Runs reservation and relocation scenarios over a JSON warehouse snapshot", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Reserve the scenario's demand and print the allocations
    Reserve {
        /// Scenario file; `-` reads stdin
        #[arg(default_value = "-")]
        scenario: PathBuf,
    },

    /// Plan and execute a relocation of the selected quants
    Relocate {
        /// Scenario file; `-` reads stdin
        #[arg(default_value = "-")]
        scenario: PathBuf,
    },

    /// Sum quants by product, location or owner
    Totals {
        /// Scenario file; `-` reads stdin
        #[arg(default_value = "-")]
        scenario: PathBuf,
    },
}

impl Commands {
    pub fn operation(&self) -> Operation {
        match self {
            Self::Reserve { .. } => Operation::Reserve,
            Self::Relocate { .. } => Operation::Relocate,
            Self::Totals { .. } => Operation::Totals,
        }
    }

    /// `None` when the scenario comes from stdin.
    pub fn scenario_path(&self) -> Option<&PathBuf> {
        let (Self::Reserve { scenario } | Self::Relocate { scenario } | Self::Totals { scenario }) = self;
        (scenario.as_os_str() != "-").then_some(scenario)
    }
}
