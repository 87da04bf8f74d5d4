//! Traffic report row schema
//!
//! This module defines the input rows fetched from the analytics report (one
//! row per entity and day) and the adapter that groups them into per-entity
//! series for the normalizer.

mod adapter;
mod row;

pub use adapter::*;
pub use row::*;
