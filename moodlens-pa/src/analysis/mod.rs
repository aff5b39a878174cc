//! Batch playlist analysis
//!
//! The orchestrator walks a playlist's items through an analysis transport,
//! publishing live state and events as it goes.

pub mod orchestrator;
pub mod transport;
pub mod types;

pub use orchestrator::BatchAnalysisOrchestrator;
pub use transport::{AnalysisTransport, BatchedAnalyzer, PerItemAnalyzer};
pub use types::{AnalysisOutcome, BatchState, Phase, Progress};
