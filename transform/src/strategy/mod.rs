//! Conversion strategies.
//!
//! A [`StrategyId`] packs a `(source format, destination format)` pair plus
//! condition bits; the [`StrategyTable`] maps it to the ordered list of
//! [`TransformKind`]s that converts one layout into the other.

mod id;
mod kind;
pub mod predicate;
mod table;
mod transpose;

pub use id::StrategyId;
pub use kind::TransformKind;
pub use table::{Lookup, StrategyTable};
pub use transpose::TransposeTable;
