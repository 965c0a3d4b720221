//! HTTP surface: axum router, bearer-token middleware, role guards and startup.

pub mod errors;
pub mod openapi;
pub mod routes;
pub mod startup;

pub use startup::{build_app, prepare_database, run, run_worker};
