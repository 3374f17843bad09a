//! LLM collaborator boundary.
//!
//! The engine only ever sees the `Classifier` / `Scorer` /
//! `InvestigationReviewer` traits; this crate provides the Claude-backed
//! implementations. Collaborator responses are loosely-typed wire shapes —
//! validation and clamping happen at the engine boundary, never here.

pub mod classifier;
pub mod client;
pub mod reviewer;
pub mod scorer;
pub mod traits;

pub use classifier::ClaudeClassifier;
pub use client::Claude;
pub use reviewer::ClaudeReviewer;
pub use scorer::ClaudeScorer;
pub use traits::*;
