//! Deduplication gate between crawl and classification.
//!
//! An item's fingerprint is its identity; anything already in the store (or
//! seen earlier in the same batch) is dropped before it costs a collaborator
//! call. Processing the same batch twice is a no-op.

use std::collections::HashSet;

use anyhow::Result;
use tracing::debug;

use marketpulse_common::{fingerprint, EventId, RawEvent};
use marketpulse_store::Store;

pub struct DedupOutcome {
    /// Fingerprinted items not yet in the store, in batch order.
    pub fresh: Vec<(EventId, RawEvent)>,
    pub duplicates: u32,
}

pub async fn partition_fresh<S: Store>(
    store: &S,
    items: Vec<RawEvent>,
) -> Result<DedupOutcome> {
    let mut fresh = Vec::new();
    let mut seen_in_batch: HashSet<EventId> = HashSet::new();
    let mut duplicates = 0;

    for item in items {
        let id = fingerprint(&item);
        if seen_in_batch.contains(&id) || store.get_event(&id).await?.is_some() {
            debug!(event_id = %id, title = item.title, "Duplicate, skipping");
            duplicates += 1;
            continue;
        }
        seen_in_batch.insert(id.clone());
        fresh.push((id, item));
    }

    Ok(DedupOutcome { fresh, duplicates })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::{classified_event, raw_event};
    use marketpulse_common::IndicatorId;
    use marketpulse_store::MemoryStore;

    #[tokio::test]
    async fn repeated_item_in_one_batch_counts_once() {
        let store = MemoryStore::new();
        let outcome = partition_fresh(
            &store,
            vec![raw_event("CPI surprises"), raw_event("CPI surprises")],
        )
        .await
        .unwrap();
        assert_eq!(outcome.fresh.len(), 1);
        assert_eq!(outcome.duplicates, 1);
    }

    #[tokio::test]
    async fn stored_event_is_a_duplicate() {
        let store = MemoryStore::new();
        let item = raw_event("CPI surprises");
        let id = fingerprint(&item);
        store
            .insert_event(classified_event(&id.0, 50, &[IndicatorId::Cpi]))
            .await
            .unwrap();

        let outcome = partition_fresh(&store, vec![item]).await.unwrap();
        assert!(outcome.fresh.is_empty());
        assert_eq!(outcome.duplicates, 1);
    }

    #[tokio::test]
    async fn different_source_is_not_a_duplicate() {
        let store = MemoryStore::new();
        let a = raw_event("CPI surprises");
        let mut b = raw_event("CPI surprises");
        b.source = "OtherWire".to_string();

        let outcome = partition_fresh(&store, vec![a, b]).await.unwrap();
        assert_eq!(outcome.fresh.len(), 2);
    }
}
