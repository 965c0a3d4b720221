pub mod errors;
pub mod db;
pub mod user;
pub mod user_credentials;
pub mod catalog;
pub mod service_request;
pub mod review;

#[cfg(test)]
mod tests;
