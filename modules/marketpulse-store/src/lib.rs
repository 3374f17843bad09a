//! Durable state for the scoring engine.
//!
//! The `Store` trait is the single owner of all persisted records; every other
//! component passes ids around and re-reads through the store rather than
//! caching mutable copies across pipeline stages. `MemoryStore` is the
//! reference implementation — the persistence backend is a deployment choice
//! behind the trait.

pub mod memory;
pub mod records;
pub mod snapshot;
pub mod store;

pub use memory::MemoryStore;
pub use records::*;
pub use snapshot::{ContextSnapshot, IndicatorTrend};
pub use store::{InsertOutcome, RankingUpdate, Store};
