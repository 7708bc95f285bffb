//! Lazyscope library
//!
//! Image loading-strategy classification and LCP tracking over DOM-like page
//! snapshots. [`ImageEngine`] is the entry point; the classification and LCP
//! crates are re-exported for collaborators that need their types.

pub mod config;
pub mod engine;
pub mod errors;
pub mod report;
pub mod telemetry;

pub use config::EngineConfig;
pub use engine::ImageEngine;
pub use errors::{EngineError, EngineResult};
pub use report::{InspectionReport, LcpSummary};

pub use image_perceiver;
pub use lazyscope_core_types as core_types;
pub use lcp_tracker;
