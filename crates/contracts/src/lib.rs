//! v1 contracts shared by the telemetry engine, persistence sinks, and hosts.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod seed_string;

pub const SCHEMA_VERSION_V1: &str = "1.0";
pub const ONE_DAY_MS: i64 = 86_400_000;
pub const DEFAULT_TIMELINE_CAPACITY: usize = 100;
/// Potency assumed for dose records persisted without a stability boost.
pub const DEFAULT_DOSE_POTENCY: f64 = 10.0;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    Calm,
    #[default]
    Normal,
    Aggressive,
    Unstable,
}

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Scenario::Calm,
        Scenario::Normal,
        Scenario::Aggressive,
        Scenario::Unstable,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Calm => "calm",
            Self::Normal => "normal",
            Self::Aggressive => "aggressive",
            Self::Unstable => "unstable",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tick rate multiplier. Serialized as the bare number `1`, `2` or `4`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub enum SimSpeed {
    #[default]
    X1,
    X2,
    X4,
}

impl SimSpeed {
    pub fn factor(self) -> u8 {
        match self {
            Self::X1 => 1,
            Self::X2 => 2,
            Self::X4 => 4,
        }
    }

    pub fn interval_ms(self) -> u64 {
        1000 / u64::from(self.factor())
    }
}

impl TryFrom<u8> for SimSpeed {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::X1),
            2 => Ok(Self::X2),
            4 => Ok(Self::X4),
            other => Err(format!("unsupported speed multiplier {other}; expected 1, 2 or 4")),
        }
    }
}

impl From<SimSpeed> for u8 {
    fn from(value: SimSpeed) -> Self {
        value.factor()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CapsuleType {
    Standard,
    Booster,
    Emergency,
}

impl CapsuleType {
    pub fn stability_boost(self) -> f64 {
        match self {
            Self::Standard => 6.0,
            Self::Booster => 12.0,
            Self::Emergency => 25.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Booster => "booster",
            Self::Emergency => "emergency",
        }
    }
}

impl fmt::Display for CapsuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_dose_potency() -> f64 {
    DEFAULT_DOSE_POTENCY
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoseRecord {
    pub id: String,
    pub timestamp_ms: i64,
    pub capsule_type: CapsuleType,
    pub amount: f64,
    #[serde(default = "default_dose_potency")]
    pub stability_boost: f64,
}

impl DoseRecord {
    /// Contribution of this dose to the stability bonus while it is recent.
    pub fn weighted_boost(&self) -> f64 {
        self.stability_boost * self.amount
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SymptomRecord {
    pub id: String,
    pub timestamp_ms: i64,
    pub label: String,
    pub severity: u8,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
}

impl AlertStatus {
    /// `Active -> Acknowledged -> Resolved` or `Active -> Resolved`. Nothing leaves `Resolved`.
    pub fn can_transition_to(self, next: AlertStatus) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::Acknowledged)
                | (Self::Active, Self::Resolved)
                | (Self::Acknowledged, Self::Resolved)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Alert {
    pub id: String,
    pub title: String,
    pub message: String,
    pub severity: AlertSeverity,
    pub status: AlertStatus,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    /// Recorded through a mutation call; also present in the matching history.
    Manual,
    /// Synthesized by the tick engine; timeline only.
    Simulated,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    Dose {
        dose: DoseRecord,
        source: EventSource,
    },
    Symptom {
        symptom: SymptomRecord,
        source: EventSource,
    },
    Alert {
        alert_id: String,
        severity: AlertSeverity,
    },
    Warning {
        text: String,
    },
    Success {
        text: String,
    },
    Info {
        text: String,
    },
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Dose { .. } => "dose",
            Self::Symptom { .. } => "symptom",
            Self::Alert { .. } => "alert",
            Self::Warning { .. } => "warning",
            Self::Success { .. } => "success",
            Self::Info { .. } => "info",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub id: String,
    pub timestamp_ms: i64,
    pub label: String,
    pub description: String,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Declining,
    #[default]
    Stable,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MetricsSnapshot {
    pub stability: f64,
    pub readiness: f64,
    pub risk_score: f64,
    pub confidence: f64,
    pub trend: Trend,
}

impl MetricsSnapshot {
    pub fn is_within_bounds(&self) -> bool {
        let in_range = |value: f64, max: f64| value.is_finite() && (0.0..=max).contains(&value);
        in_range(self.stability, 100.0)
            && in_range(self.readiness, 100.0)
            && in_range(self.risk_score, 100.0)
            && in_range(self.confidence, 99.0)
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stability={:.0} readiness={:.0} risk={:.0} confidence={:.0} trend={:?}",
            self.stability, self.readiness, self.risk_score, self.confidence, self.trend
        )
    }
}

/// Read-only view handed to hosts after every call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub schema_version: String,
    pub metrics: MetricsSnapshot,
    pub events: Vec<Event>,
    pub alerts: Vec<Alert>,
    pub dose_history: Vec<DoseRecord>,
    pub symptom_history: Vec<SymptomRecord>,
    pub scenario: Scenario,
    pub speed: SimSpeed,
    pub running: bool,
    pub tick: u64,
    pub dose_streak: u32,
    pub advisory: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportHistory {
    pub doses: Vec<DoseRecord>,
    pub symptoms: Vec<SymptomRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportConfig {
    #[serde(with = "seed_string")]
    pub seed: u64,
    pub scenario: Scenario,
    pub speed: SimSpeed,
}

/// Download format: metrics, recorded history, and the settings that reproduce the run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportDocument {
    pub metrics: MetricsSnapshot,
    pub history: ExportHistory,
    pub config: ExportConfig,
}

/// Everything a sink needs to restore a session, including the RNG position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedState {
    pub schema_version: String,
    #[serde(with = "seed_string")]
    pub seed: u64,
    pub rng_state: u32,
    #[serde(default)]
    pub scenario: Scenario,
    #[serde(default)]
    pub speed: SimSpeed,
    #[serde(default)]
    pub tick: u64,
    #[serde(default)]
    pub dose_history: Vec<DoseRecord>,
    #[serde(default)]
    pub symptom_history: Vec<SymptomRecord>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub alerts: Vec<Alert>,
    pub metrics: MetricsSnapshot,
    #[serde(default)]
    pub dose_streak: u32,
    #[serde(default)]
    pub advisory: String,
    #[serde(default)]
    pub next_sequence: u64,
    pub saved_at_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskForecast {
    pub risk: f64,
    pub confidence: f64,
    pub explanation: String,
    pub model_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureWeight {
    pub feature: String,
    pub importance: f64,
}

/// The light forecast plus a fatigue estimate and per-feature weights,
/// heaviest first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetailedForecast {
    #[serde(flatten)]
    pub forecast: RiskForecast,
    pub fatigue_score: f64,
    pub feature_importance: Vec<FeatureWeight>,
}

/// Raw mutation payloads as a host would submit them. Fields are loose on
/// purpose; the orchestrator validates before anything touches state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandPayload {
    AddDose {
        capsule_type: String,
        amount: f64,
    },
    AddSymptom {
        label: String,
        severity: Option<i64>,
        #[serde(default)]
        notes: Option<String>,
    },
    RaiseAlert {
        title: String,
        message: String,
        severity: AlertSeverity,
    },
    AcknowledgeAlert {
        alert_id: String,
    },
    ResolveAlert {
        alert_id: String,
    },
    SetScenario {
        scenario: String,
    },
    SetSpeed {
        speed: i64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    DoseRecorded { dose_id: String },
    SymptomRecorded { symptom_id: String, alert_id: Option<String> },
    AlertRaised { alert_id: String },
    AlertUpdated { alert_id: String, changed: bool },
    ScenarioChanged { scenario: Scenario },
    SpeedChanged { speed: SimSpeed },
}
