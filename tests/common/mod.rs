//! Integration test common infrastructure.
//!
//! Builds a complete auth stack over an in-memory graph (or the SQLite
//! schema) with a manual clock, so token expiry can be driven exactly.

pub mod fixture;

#[allow(unused_imports)]
pub use fixture::{NOW, ROOT_PASSWORD, TestAuth, sample_graph, seed_sqlite};
