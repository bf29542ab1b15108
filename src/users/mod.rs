//! User domain: record types, mutation input, and the repository boundary.

pub mod repo;
pub mod types;
