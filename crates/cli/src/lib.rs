//! Runs warehouse scenarios loaded from JSON snapshots.

pub mod cli;
pub mod scenario;
