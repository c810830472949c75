//! The single owned simulation state: histories, timeline, alerts, metrics
//! and the PRNG position. Every mutation and every tick goes through here
//! synchronously; timers and persistence live one layer up.

mod mutations;
mod snapshot;
mod step;

use contracts::{
    Alert, AlertSeverity, AlertStatus, DoseRecord, Event, EventKind, MetricsSnapshot, Scenario,
    SimSpeed, SymptomRecord, DEFAULT_TIMELINE_CAPACITY,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::lexicon::ADVISORY_INITIAL;
use crate::metrics::{baseline_metrics, compute_metrics};
use crate::rng::SeededRng;
use crate::scenario::GravityConfig;
use crate::timeline::Timeline;

pub use mutations::CRITICAL_SYMPTOM_SEVERITY;
pub use step::TickReport;

/// Wider than the gap between the empty-history stability (60) and the
/// gravity thresholds (40 and 80).
pub const DEFAULT_MAX_TICK_DRIFT: f64 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateSettings {
    pub timeline_capacity: usize,
    /// Largest distance tick noise may hold stability away from the canonical value.
    pub max_tick_drift: f64,
    pub gravity: GravityConfig,
}

impl StateSettings {
    fn sanitized(self) -> Self {
        let max_tick_drift = if self.max_tick_drift.is_finite() {
            self.max_tick_drift.abs()
        } else {
            DEFAULT_MAX_TICK_DRIFT
        };
        Self {
            timeline_capacity: self.timeline_capacity.max(1),
            max_tick_drift,
            gravity: self.gravity,
        }
    }
}

impl Default for StateSettings {
    fn default() -> Self {
        Self {
            timeline_capacity: DEFAULT_TIMELINE_CAPACITY,
            max_tick_drift: DEFAULT_MAX_TICK_DRIFT,
            gravity: GravityConfig::DEFAULT,
        }
    }
}

/// Result of a recorded symptom: the record id and the alert it escalated to, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymptomRecorded {
    pub symptom_id: String,
    pub alert_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SimulationState {
    seed: u64,
    rng: SeededRng,
    scenario: Scenario,
    speed: SimSpeed,
    running: bool,
    tick: u64,
    dose_history: Vec<DoseRecord>,
    symptom_history: Vec<SymptomRecord>,
    timeline: Timeline,
    alerts: Vec<Alert>,
    metrics: MetricsSnapshot,
    dose_streak: u32,
    advisory: String,
    next_sequence: u64,
    settings: StateSettings,
}

impl SimulationState {
    pub fn new(seed: u64, scenario: Scenario, speed: SimSpeed, settings: StateSettings) -> Self {
        let settings = settings.sanitized();
        Self {
            seed,
            rng: SeededRng::from_seed_u64(seed),
            scenario,
            speed,
            running: false,
            tick: 0,
            dose_history: Vec::new(),
            symptom_history: Vec::new(),
            timeline: Timeline::with_capacity(settings.timeline_capacity),
            alerts: Vec::new(),
            metrics: baseline_metrics(),
            dose_streak: 0,
            advisory: ADVISORY_INITIAL.to_string(),
            next_sequence: 0,
            settings,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn rng(&self) -> &SeededRng {
        &self.rng
    }

    pub fn scenario(&self) -> Scenario {
        self.scenario
    }

    pub fn speed(&self) -> SimSpeed {
        self.speed
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn metrics(&self) -> &MetricsSnapshot {
        &self.metrics
    }

    pub fn dose_history(&self) -> &[DoseRecord] {
        &self.dose_history
    }

    pub fn symptom_history(&self) -> &[SymptomRecord] {
        &self.symptom_history
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Newest first.
    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn alert(&self, alert_id: &str) -> Option<&Alert> {
        self.alerts.iter().find(|alert| alert.id == alert_id)
    }

    pub fn active_alert_count(&self) -> usize {
        self.alerts
            .iter()
            .filter(|alert| alert.status == AlertStatus::Active)
            .count()
    }

    pub fn dose_streak(&self) -> u32 {
        self.dose_streak
    }

    pub fn advisory(&self) -> &str {
        &self.advisory
    }

    pub fn settings(&self) -> &StateSettings {
        &self.settings
    }

    pub fn set_scenario(&mut self, scenario: Scenario) {
        self.scenario = scenario;
    }

    pub fn set_speed(&mut self, speed: SimSpeed) {
        self.speed = speed;
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    /// Discard all history and re-seed. Scenario and speed survive; id
    /// numbering keeps counting so ids stay unique across resets.
    pub fn reset(&mut self, seed: u64) {
        self.seed = seed;
        self.rng.reseed(seed);
        self.running = false;
        self.tick = 0;
        self.dose_history.clear();
        self.symptom_history.clear();
        self.timeline.clear();
        self.alerts.clear();
        self.metrics = baseline_metrics();
        self.dose_streak = 0;
        self.advisory = ADVISORY_INITIAL.to_string();
        debug!(seed, "simulation state reset");
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_sequence = self.next_sequence.saturating_add(1);
        format!("{prefix}-{:06}", self.next_sequence)
    }

    fn push_event(
        &mut self,
        timestamp_ms: i64,
        label: String,
        description: String,
        kind: EventKind,
    ) -> String {
        let id = self.next_id("evt");
        self.timeline.push(Event {
            id: id.clone(),
            timestamp_ms,
            label,
            description,
            kind,
        });
        id
    }

    /// Prepend an `Active` alert. `announce` also writes an `Alert` timeline event.
    fn push_alert(
        &mut self,
        title: String,
        message: String,
        severity: AlertSeverity,
        timestamp_ms: i64,
        announce: bool,
    ) -> String {
        let alert_id = self.next_id("alert");
        if announce {
            self.push_event(
                timestamp_ms,
                format!("ALERT: {title}"),
                "Mission Control Notification".to_string(),
                EventKind::Alert {
                    alert_id: alert_id.clone(),
                    severity,
                },
            );
        }
        self.alerts.insert(
            0,
            Alert {
                id: alert_id.clone(),
                title,
                message,
                severity,
                status: AlertStatus::Active,
                timestamp_ms,
            },
        );
        alert_id
    }

    fn canonical_metrics(&self, now_ms: i64) -> MetricsSnapshot {
        compute_metrics(
            &self.dose_history,
            &self.symptom_history,
            self.metrics.stability,
            now_ms,
        )
    }
}

#[cfg(test)]
mod tests;
