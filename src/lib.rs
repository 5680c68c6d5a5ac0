//! gatekeeper - bearer-token authentication and menu permission service.
//!
//! Issues and revokes signed tokens, verifies credentials (configured
//! super-user first, then a delegated strategy), and resolves the menu
//! forest a subject may see with the actions it may invoke.

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod graph;
pub mod http;
pub mod identity;
pub mod login;
pub mod metrics;
pub mod permission;
pub mod store;
pub mod telemetry;
pub mod token;

pub use error::AuthError;
