//! RapidPipeline API client.
//!
//! Layers, bottom up:
//! - [`backend`]: one raw HTTP exchange behind the [`backend::HttpBackend`] trait.
//! - [`transport`]: rate-limit retry and error reporting.
//! - [`api`]: typed endpoints and the processing/optimization polling loops.

pub mod api;
pub mod backend;
pub mod download;
pub mod error;
pub mod polling;
pub mod progress;
pub mod transport;

#[cfg(feature = "testing")]
pub mod testing;
