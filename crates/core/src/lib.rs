//! Domain types and pure helpers for the RapidPipeline batch client.
//!
//! Nothing in this crate performs network I/O. It covers configuration
//! loading, preset validation, input classification, status
//! classification, and output naming.

pub mod config;
pub mod error;
pub mod input;
pub mod naming;
pub mod preset;
pub mod progress;
pub mod schema;
pub mod status;
pub mod types;
