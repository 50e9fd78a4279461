//! Shared utilities: measurement parsing for descriptor values.

pub mod units;

pub use units::{deserialize_measure, parse_measure};
