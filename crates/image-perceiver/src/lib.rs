//! Per-image loading-strategy classification, optimisation checks and scoring.
pub mod analyzer;
pub mod classifier;
pub mod counters;
pub mod errors;
pub mod export;
pub mod fingerprint;
pub mod hosts;
pub mod library;
pub mod metrics;
pub mod model;
pub mod policy;
pub mod scoring;
pub mod session;

pub use analyzer::OptimizationReport;
pub use classifier::{ClassifyContext, StrategyClassifier};
pub use counters::{AggregateCounters, AggregateSnapshot};
pub use errors::PerceiverError;
pub use export::ExportRecord;
pub use fingerprint::{fingerprint, ImageFingerprint};
pub use hosts::HostIndex;
pub use library::{LibraryPatternMatcher, LibraryRegistry, LibraryUsage, PageSignals};
pub use model::{
    FileSizeEstimate, ImageFormat, ImageRecord, LazyLibrary, LoadingMode, Position, Strategy,
};
pub use policy::AnalysisConfig;
pub use scoring::{display_score, export_performance_score, ScoreTier};
pub use session::{ClassificationSession, LcpReassignment, MutationOutcome};
