//! Context snapshot assembly.
//!
//! Reads are independent: a failing sub-query degrades the snapshot (and the
//! run) instead of aborting it. Scoring with thinner context beats not
//! scoring at all.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use marketpulse_common::MetricRecord;
use marketpulse_store::{ContextSnapshot, IndicatorTrend, Store};

pub async fn build_snapshot<S: Store>(
    store: &S,
    lookback_days: i64,
    now: DateTime<Utc>,
) -> Result<ContextSnapshot> {
    let mut snapshot = ContextSnapshot::default();

    match store.open_investigations().await {
        Ok(investigations) => snapshot.open_investigations = investigations,
        Err(e) => {
            warn!(error = %e, "Context read failed: open investigations");
            snapshot.degraded = true;
        }
    }
    match store.hot_topics().await {
        Ok(topics) => snapshot.hot_topics = topics,
        Err(e) => {
            warn!(error = %e, "Context read failed: hot topics");
            snapshot.degraded = true;
        }
    }
    match store.pending_predictions().await {
        Ok(predictions) => snapshot.pending_predictions = predictions,
        Err(e) => {
            warn!(error = %e, "Context read failed: pending predictions");
            snapshot.degraded = true;
        }
    }
    match store.metrics_since(now - Duration::days(lookback_days)).await {
        Ok(metrics) => snapshot.indicator_trends = trends_from(&metrics),
        Err(e) => {
            warn!(error = %e, "Context read failed: indicator metrics");
            snapshot.degraded = true;
        }
    }
    match store.upcoming_calendar(now).await {
        Ok(calendar) => snapshot.upcoming_calendar = calendar,
        Err(e) => {
            warn!(error = %e, "Context read failed: calendar");
            snapshot.degraded = true;
        }
    }
    match store.latest_run().await {
        Ok(run) => snapshot.last_run_summary = run,
        Err(e) => {
            warn!(error = %e, "Context read failed: last run");
            snapshot.degraded = true;
        }
    }

    Ok(snapshot)
}

/// Latest reading and delta per indicator. Input is sorted by `recorded_at`
/// ascending, so the last two readings per indicator are the pair we want.
fn trends_from(metrics: &[MetricRecord]) -> Vec<IndicatorTrend> {
    let mut readings: BTreeMap<_, Vec<&MetricRecord>> = BTreeMap::new();
    for metric in metrics {
        readings.entry(metric.indicator).or_default().push(metric);
    }

    readings
        .into_iter()
        .map(|(indicator, series)| {
            let latest = series[series.len() - 1];
            let previous = series
                .len()
                .checked_sub(2)
                .map(|i| series[i].value);
            IndicatorTrend {
                indicator,
                latest: latest.value,
                previous,
                delta: previous.map(|p| latest.value - p),
                as_of: latest.recorded_at,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketpulse_common::IndicatorId;
    use marketpulse_store::MemoryStore;

    fn reading(indicator: IndicatorId, value: f64, days_ago: i64) -> MetricRecord {
        MetricRecord {
            indicator,
            value,
            recorded_at: Utc::now() - Duration::days(days_ago),
        }
    }

    #[tokio::test]
    async fn trends_take_latest_two_readings() {
        let store = MemoryStore::new();
        store.insert_metric(reading(IndicatorId::Cpi, 3.1, 20)).await.unwrap();
        store.insert_metric(reading(IndicatorId::Cpi, 3.4, 5)).await.unwrap();
        store.insert_metric(reading(IndicatorId::Vix, 18.0, 2)).await.unwrap();

        let snapshot = build_snapshot(&store, 30, Utc::now()).await.unwrap();
        assert_eq!(snapshot.indicator_trends.len(), 2);

        let cpi = snapshot
            .indicator_trends
            .iter()
            .find(|t| t.indicator == IndicatorId::Cpi)
            .unwrap();
        assert_eq!(cpi.latest, 3.4);
        assert_eq!(cpi.previous, Some(3.1));
        assert!((cpi.delta.unwrap() - 0.3).abs() < 1e-9);

        let vix = snapshot
            .indicator_trends
            .iter()
            .find(|t| t.indicator == IndicatorId::Vix)
            .unwrap();
        assert_eq!(vix.previous, None);
        assert_eq!(vix.delta, None);
    }

    #[tokio::test]
    async fn readings_outside_the_lookback_are_ignored() {
        let store = MemoryStore::new();
        store.insert_metric(reading(IndicatorId::Gdp, 2.0, 40)).await.unwrap();
        let snapshot = build_snapshot(&store, 30, Utc::now()).await.unwrap();
        assert!(snapshot.indicator_trends.is_empty());
        assert!(!snapshot.degraded);
    }
}
