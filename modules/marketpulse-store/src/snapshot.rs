//! ContextSnapshot — the bounded view of recent history handed to scoring.
//!
//! An explicit value object passed per call. No ambient context state; a
//! snapshot built from the same store contents is always the same snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use marketpulse_common::{CalendarRecord, IndicatorId};

use crate::records::{Investigation, Prediction, RunHistory, TopicFrequency};

/// Latest reading and delta for one indicator over the lookback window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorTrend {
    pub indicator: IndicatorId,
    pub latest: f64,
    pub previous: Option<f64>,
    pub delta: Option<f64>,
    pub as_of: DateTime<Utc>,
}

/// Rolling historical context for a scoring pass. Any field may be empty if
/// its sub-query failed; `degraded` flags that the snapshot is incomplete.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub open_investigations: Vec<Investigation>,
    pub hot_topics: Vec<TopicFrequency>,
    pub pending_predictions: Vec<Prediction>,
    pub indicator_trends: Vec<IndicatorTrend>,
    pub upcoming_calendar: Vec<CalendarRecord>,
    pub last_run_summary: Option<RunHistory>,
    pub degraded: bool,
}
