//! `stockreloc-core`: shared building blocks for the warehouse crates.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! typed identifiers, the domain error model and decimal precision rules.

pub mod entity;
pub mod error;
pub mod id;
pub mod precision;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{LocationId, LotId, OwnerId, PackageId, ProductId, QuantId, UomId};
pub use precision::{Precision, RoundingMethod};
