//! Reconciliation data for warehouse clients.
//!
//! Produces the rows and totals behind holding statements and stock
//! summaries. Rendering (spreadsheets, PDFs) is left to the caller.

pub mod holding;
pub mod totals;

pub use holding::{
    HoldingRecord, HoldingStatement, MovementKind, StatementRow, StatementSettings, StatementTotals,
    holding_statement,
};
pub use totals::{GroupBy, GroupKey, QuantTotal, quant_totals};
