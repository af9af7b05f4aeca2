//! # myway_core
//!
//! Authorization and token-lifecycle core for MyWay: credentials, sessions,
//! tenancy resolution and the access gate, over abstract repositories.

pub mod access;
pub mod auth;
pub mod models;
pub mod repo;
pub mod tenancy;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
