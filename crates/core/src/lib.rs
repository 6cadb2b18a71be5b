//! Core business logic for yatube.
//!
//! Services sit between the HTTP layer and the repositories. Each one is a
//! cheap `Clone` over repositories sharing a single connection pool.

pub mod services;

pub use services::*;
