//! Temporal event scoring and investigation continuity engine.
//!
//! The pipeline ingests raw market-news items and indicator readings,
//! deduplicates and classifies them, scores relevant events with causal-chain
//! attribution against a rolling context, keeps open factual questions
//! ("investigations") moving through their lifecycle as evidence arrives, and
//! re-ranks the entire active event population every run with a decay/boost
//! model.
//!
//! Decay, boost, sectioning, and the investigation state machine are pure and
//! deterministic; everything model-shaped lives behind the collaborator
//! traits in `marketpulse-analyst`.

pub mod context;
pub mod crawl;
pub mod dedup;
pub mod gate;
pub mod lifecycle;
pub mod pipeline;
pub mod ranker;
pub mod run_log;
pub mod scoring;
pub mod topics;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use pipeline::{PipelineOrchestrator, RunStats};
