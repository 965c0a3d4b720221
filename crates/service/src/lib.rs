//! Business layer of the marketplace.
//! - Free async functions over a `DatabaseConnection`, grouped per resource.
//! - Validation and entity definitions come from the `models` crate.
//! - Errors surface as `ServiceError` / `AuthError`; the HTTP layer maps them.

pub mod errors;
pub mod pagination;
pub mod auth;
pub mod views;
pub mod users;
pub mod catalog;
pub mod requests;
pub mod reviews;
pub mod dashboard;
pub mod mail;
pub mod jobs;
pub mod seed;
#[cfg(test)]
pub mod test_support;
