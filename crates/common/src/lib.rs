//! Shared building blocks used by every crate in the workspace:
//! logging setup, the metrics registry and small wire types.

pub mod types;
pub mod utils;
pub mod metrics;
