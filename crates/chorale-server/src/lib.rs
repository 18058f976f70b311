//! chorale-server - HTTP front end for the chorale harmonizer
//!
//! - `web`: axum router and handlers
//! - `error`: error codes and HTTP status mapping
//! - `artifact`: optional on-disk copies of generated MIDI
//! - `serve`: state assembly from config, listener and shutdown
//! - `telemetry`: tracing subscriber and OTLP export

pub mod artifact;
pub mod error;
pub mod serve;
pub mod telemetry;
pub mod web;

pub use artifact::{ArtifactSink, FileSink, NullSink};
pub use error::{ApiError, ErrorBody};
pub use web::{router, AppState};
