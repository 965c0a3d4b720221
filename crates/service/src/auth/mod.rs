//! Auth module: three-layer architecture (domain, repository, service).
//!
//! Registration, login and bearer-token issuing/validation live here; the HTTP
//! layer only maps requests and errors.

pub mod domain;
pub mod errors;
pub mod repository;
pub mod service;
pub mod tokens;
pub mod repo;

pub use service::{AuthService, hash_password};
