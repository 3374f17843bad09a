use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Identity ---

/// Content-derived event identity: the dedup fingerprint rendered as hex.
/// Stable across crawls — the same (title, source, content-prefix) tuple
/// always yields the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct EventId(pub String);

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        EventId(s.to_string())
    }
}

// --- Indicators ---

/// Closed set of tracked economic indicators. Unknown slugs from the
/// classifier are dropped at the boundary, never stored.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorId {
    Cpi,
    CoreCpi,
    Unemployment,
    NonfarmPayrolls,
    FedFundsRate,
    Gdp,
    Pmi,
    RetailSales,
    Treasury10y,
    WtiCrude,
    Sp500,
    Vix,
}

impl std::fmt::Display for IndicatorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndicatorId::Cpi => write!(f, "cpi"),
            IndicatorId::CoreCpi => write!(f, "core_cpi"),
            IndicatorId::Unemployment => write!(f, "unemployment"),
            IndicatorId::NonfarmPayrolls => write!(f, "nonfarm_payrolls"),
            IndicatorId::FedFundsRate => write!(f, "fed_funds_rate"),
            IndicatorId::Gdp => write!(f, "gdp"),
            IndicatorId::Pmi => write!(f, "pmi"),
            IndicatorId::RetailSales => write!(f, "retail_sales"),
            IndicatorId::Treasury10y => write!(f, "treasury_10y"),
            IndicatorId::WtiCrude => write!(f, "wti_crude"),
            IndicatorId::Sp500 => write!(f, "sp500"),
            IndicatorId::Vix => write!(f, "vix"),
        }
    }
}

impl IndicatorId {
    /// Lenient parse for collaborator output. Returns None for unknown slugs
    /// so the caller can drop them rather than reject the whole response.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "cpi" | "inflation_cpi" => Some(Self::Cpi),
            "core_cpi" => Some(Self::CoreCpi),
            "unemployment" | "unemployment_rate" => Some(Self::Unemployment),
            "nonfarm_payrolls" | "nfp" | "payrolls" => Some(Self::NonfarmPayrolls),
            "fed_funds_rate" | "fed_funds" | "federal_funds_rate" => Some(Self::FedFundsRate),
            "gdp" => Some(Self::Gdp),
            "pmi" => Some(Self::Pmi),
            "retail_sales" => Some(Self::RetailSales),
            "treasury_10y" | "10y_yield" | "us10y" => Some(Self::Treasury10y),
            "wti_crude" | "wti" | "crude_oil" => Some(Self::WtiCrude),
            "sp500" | "s&p500" | "spx" => Some(Self::Sp500),
            "vix" => Some(Self::Vix),
            _ => None,
        }
    }
}

// --- Enums ---

/// Fixed category set for classified events.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    MonetaryPolicy,
    FiscalPolicy,
    Inflation,
    Employment,
    Energy,
    Geopolitics,
    Corporate,
    Markets,
    Trade,
    Housing,
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventCategory::MonetaryPolicy => write!(f, "monetary_policy"),
            EventCategory::FiscalPolicy => write!(f, "fiscal_policy"),
            EventCategory::Inflation => write!(f, "inflation"),
            EventCategory::Employment => write!(f, "employment"),
            EventCategory::Energy => write!(f, "energy"),
            EventCategory::Geopolitics => write!(f, "geopolitics"),
            EventCategory::Corporate => write!(f, "corporate"),
            EventCategory::Markets => write!(f, "markets"),
            EventCategory::Trade => write!(f, "trade"),
            EventCategory::Housing => write!(f, "housing"),
        }
    }
}

impl EventCategory {
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "monetary_policy" | "monetary" | "central_bank" => Some(Self::MonetaryPolicy),
            "fiscal_policy" | "fiscal" => Some(Self::FiscalPolicy),
            "inflation" | "prices" => Some(Self::Inflation),
            "employment" | "labor" | "jobs" => Some(Self::Employment),
            "energy" | "oil" | "commodities" => Some(Self::Energy),
            "geopolitics" | "geopolitical" => Some(Self::Geopolitics),
            "corporate" | "earnings" => Some(Self::Corporate),
            "markets" | "equities" | "bonds" => Some(Self::Markets),
            "trade" | "tariffs" => Some(Self::Trade),
            "housing" | "real_estate" => Some(Self::Housing),
            _ => None,
        }
    }
}

/// Presentation bucket an event is ranked into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DisplaySection {
    KeyEvents,
    OtherNews,
    Archive,
}

impl std::fmt::Display for DisplaySection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisplaySection::KeyEvents => write!(f, "key_events"),
            DisplaySection::OtherNews => write!(f, "other_news"),
            DisplaySection::Archive => write!(f, "archive"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum InvestigationStatus {
    Open,
    Updated,
    Resolved,
    Stale,
    Escalated,
}

impl std::fmt::Display for InvestigationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvestigationStatus::Open => write!(f, "open"),
            InvestigationStatus::Updated => write!(f, "updated"),
            InvestigationStatus::Resolved => write!(f, "resolved"),
            InvestigationStatus::Stale => write!(f, "stale"),
            InvestigationStatus::Escalated => write!(f, "escalated"),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
        }
    }
}

impl Priority {
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "high" | "critical" => Priority::High,
            "low" => Priority::Low,
            _ => Priority::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceType {
    Supports,
    Contradicts,
    Neutral,
}

impl std::fmt::Display for EvidenceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvidenceType::Supports => write!(f, "supports"),
            EvidenceType::Contradicts => write!(f, "contradicts"),
            EvidenceType::Neutral => write!(f, "neutral"),
        }
    }
}

impl EvidenceType {
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "supports" | "supporting" | "corroborates" => EvidenceType::Supports,
            "contradicts" | "contradicting" | "refutes" => EvidenceType::Contradicts,
            _ => EvidenceType::Neutral,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Partial,
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Success => write!(f, "success"),
            RunStatus::Partial => write!(f, "partial"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChainStepStatus {
    Verified,
    Likely,
    Uncertain,
}

impl ChainStepStatus {
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "verified" | "confirmed" => ChainStepStatus::Verified,
            "likely" | "probable" => ChainStepStatus::Likely,
            _ => ChainStepStatus::Uncertain,
        }
    }
}

/// Whether an event made it through classification/scoring cleanly or was
/// parked after repeated collaborator failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    Ok,
    NeedsManualReview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PredictionStatus {
    Pending,
    Confirmed,
    Refuted,
    Expired,
}

// --- Raw crawl input ---

/// A raw news item as fetched, before dedup or classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    pub title: String,
    pub content: String,
    pub source: String,
    pub region: Option<String>,
    pub published_at: DateTime<Utc>,
}

/// A numeric indicator reading. Bypasses the scoring engine entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricRecord {
    pub indicator: IndicatorId,
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
}

/// An upcoming scheduled release. Bypasses the scoring engine entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarRecord {
    pub title: String,
    pub indicator: Option<IndicatorId>,
    pub scheduled_for: DateTime<Utc>,
}

/// One item returned by a crawler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CrawlItem {
    News(RawEvent),
    Metric(MetricRecord),
    Calendar(CalendarRecord),
}

// --- Scoring value types ---

/// Per-factor score breakdown. Each component has a fixed budget; the sum of
/// the budgets is the 100-point base score ceiling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ScoreFactors {
    pub direct_impact: u8,
    pub policy: u8,
    pub breadth: u8,
    pub novelty: u8,
    pub authority: u8,
}

impl ScoreFactors {
    pub const DIRECT_IMPACT_MAX: u8 = 30;
    pub const POLICY_MAX: u8 = 25;
    pub const BREADTH_MAX: u8 = 20;
    pub const NOVELTY_MAX: u8 = 15;
    pub const AUTHORITY_MAX: u8 = 10;

    /// Clamp each component to its budget. Returns true if anything changed,
    /// so the caller can log the contract violation.
    pub fn clamp_to_budgets(&mut self) -> bool {
        let before = *self;
        self.direct_impact = self.direct_impact.min(Self::DIRECT_IMPACT_MAX);
        self.policy = self.policy.min(Self::POLICY_MAX);
        self.breadth = self.breadth.min(Self::BREADTH_MAX);
        self.novelty = self.novelty.min(Self::NOVELTY_MAX);
        self.authority = self.authority.min(Self::AUTHORITY_MAX);
        *self != before
    }

    pub fn total(&self) -> u32 {
        self.direct_impact as u32
            + self.policy as u32
            + self.breadth as u32
            + self.novelty as u32
            + self.authority as u32
    }
}

/// One link in a causal chain explanation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ChainStep {
    pub step: u32,
    pub description: String,
    pub status: ChainStepStatus,
}

/// What an event follows up on, if anything. Two one-directional references —
/// never a mutual back-pointer between Event and Investigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FollowUpRef {
    Event { event_id: EventId },
    Investigation { investigation_id: Uuid },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_loose_parse_drops_unknown() {
        assert_eq!(IndicatorId::from_str_loose("CPI"), Some(IndicatorId::Cpi));
        assert_eq!(
            IndicatorId::from_str_loose("nfp"),
            Some(IndicatorId::NonfarmPayrolls)
        );
        assert_eq!(IndicatorId::from_str_loose("dogecoin"), None);
    }

    #[test]
    fn category_loose_parse() {
        assert_eq!(
            EventCategory::from_str_loose("Monetary_Policy"),
            Some(EventCategory::MonetaryPolicy)
        );
        assert_eq!(EventCategory::from_str_loose("astrology"), None);
    }

    #[test]
    fn factors_clamp_only_when_over_budget() {
        let mut ok = ScoreFactors {
            direct_impact: 30,
            policy: 25,
            breadth: 20,
            novelty: 15,
            authority: 10,
        };
        assert!(!ok.clamp_to_budgets());
        assert_eq!(ok.total(), 100);

        let mut over = ScoreFactors {
            direct_impact: 90,
            policy: 10,
            breadth: 10,
            novelty: 10,
            authority: 10,
        };
        assert!(over.clamp_to_budgets());
        assert_eq!(over.direct_impact, 30);
    }

    #[test]
    fn display_section_serializes_snake_case() {
        let json = serde_json::to_string(&DisplaySection::KeyEvents).unwrap();
        assert_eq!(json, "\"key_events\"");
    }

    #[test]
    fn evidence_type_loose_parse_defaults_neutral() {
        assert_eq!(
            EvidenceType::from_str_loose("refutes"),
            EvidenceType::Contradicts
        );
        assert_eq!(EvidenceType::from_str_loose("???"), EvidenceType::Neutral);
    }
}
