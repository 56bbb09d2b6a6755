//! `rapid-cli`: batch optimization of 3D models through RapidPipeline.
//!
//! [`batch`] expands the model argument into inputs, [`orchestrator`] runs
//! upload, optimization, download and cleanup for each, and [`app`] wires
//! configuration and the API client together.

pub mod app;
pub mod args;
pub mod batch;
pub mod error;
pub mod orchestrator;
