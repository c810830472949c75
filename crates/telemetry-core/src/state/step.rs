use super::*;

use crate::lexicon::{ALERT_TITLE_BIO_SPIKE, LABEL_AUTO_INJECT, LABEL_SYSTEM_SCAN};
use crate::metrics::{aggregate_history, metrics_from_aggregate, trend_between, PENALTY_FLAG_RISK};
use crate::scenario::scenario_config;
use crate::tick::{generate_tick_update, TickEvent};
use contracts::{CapsuleType, EventSource};

#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub event: Option<TickEvent>,
    pub event_id: Option<String>,
    pub alert_id: Option<String>,
}

impl SimulationState {
    /// Advance one tick: draw the provisional update, write its event (if
    /// any) to the timeline, then re-anchor metrics on the canonical
    /// recomputation.
    pub fn advance_tick(&mut self, now_ms: i64) -> TickReport {
        let previous = self.metrics;
        let update =
            generate_tick_update(&previous, self.scenario, &self.settings.gravity, &mut self.rng);

        let mut event_id = None;
        let mut alert_id = None;
        if let Some(event) = update.event {
            event_id = Some(self.record_tick_event(event, now_ms));
            if event.raises_critical_alert() {
                alert_id = Some(self.raise_tick_alert(event, now_ms));
            }
        }
        if let Some(line) = update.advisory {
            self.advisory = line.to_string();
        }

        self.metrics = self.merge_tick_metrics(&previous, &update.metrics, now_ms);
        debug_assert!(self.metrics.is_within_bounds(), "merged {}", self.metrics);
        self.tick += 1;

        TickReport {
            tick: self.tick,
            event: update.event,
            event_id,
            alert_id,
        }
    }

    pub fn advance_ticks(&mut self, count: u64, now_ms: i64) -> Vec<TickReport> {
        (0..count).map(|_| self.advance_tick(now_ms)).collect()
    }

    fn merge_tick_metrics(
        &self,
        previous: &MetricsSnapshot,
        candidate: &MetricsSnapshot,
        now_ms: i64,
    ) -> MetricsSnapshot {
        let aggregate = aggregate_history(&self.dose_history, &self.symptom_history, now_ms);
        let canonical = metrics_from_aggregate(&aggregate, previous.stability);
        let drift = self.settings.max_tick_drift;
        let bounded = |canonical: f64, candidate: f64| {
            (canonical + (candidate - canonical).clamp(-drift, drift)).clamp(0.0, 100.0)
        };

        let stability = bounded(canonical.stability, candidate.stability);
        let readiness = bounded(canonical.readiness, candidate.readiness);
        let flag = if aggregate.penalty_flag() {
            PENALTY_FLAG_RISK
        } else {
            0.0
        };
        let volatility = scenario_config(self.scenario).volatility;

        MetricsSnapshot {
            stability,
            readiness,
            risk_score: (100.0 - stability + volatility * 2.0 + flag).clamp(0.0, 100.0),
            confidence: candidate.confidence.min(canonical.confidence),
            trend: trend_between(previous.stability, stability),
        }
    }

    fn record_tick_event(&mut self, event: TickEvent, now_ms: i64) -> String {
        debug!(tick = self.tick + 1, event = ?event, "tick event synthesized");
        match event {
            TickEvent::RecoveryDose { boost } => {
                let dose = DoseRecord {
                    id: self.next_id("dose"),
                    timestamp_ms: now_ms,
                    capsule_type: CapsuleType::Standard,
                    amount: 1.0,
                    stability_boost: boost,
                };
                self.push_event(
                    now_ms,
                    LABEL_AUTO_INJECT.to_string(),
                    format!("Stability +{boost:.1}"),
                    EventKind::Dose {
                        dose,
                        source: EventSource::Simulated,
                    },
                )
            }
            TickEvent::Symptom { label, severity } => {
                let symptom = SymptomRecord {
                    id: self.next_id("sym"),
                    timestamp_ms: now_ms,
                    label: label.to_string(),
                    severity,
                    notes: None,
                };
                self.push_event(
                    now_ms,
                    format!("ANOMALY: {}", label.to_uppercase()),
                    format!("Severity {severity}/10 detected"),
                    EventKind::Symptom {
                        symptom,
                        source: EventSource::Simulated,
                    },
                )
            }
            TickEvent::SystemScan { detail } => self.push_event(
                now_ms,
                LABEL_SYSTEM_SCAN.to_string(),
                detail.to_string(),
                EventKind::Info {
                    text: detail.to_string(),
                },
            ),
        }
    }

    /// The tick already wrote its one timeline event; the alert goes to the
    /// alert list only.
    fn raise_tick_alert(&mut self, event: TickEvent, now_ms: i64) -> String {
        let message = match event {
            TickEvent::Symptom { label, severity } => {
                format!("{label} at severity {severity}/10.")
            }
            _ => "Vitals outside safety thresholds.".to_string(),
        };
        self.push_alert(
            ALERT_TITLE_BIO_SPIKE.to_string(),
            message,
            AlertSeverity::Critical,
            now_ms,
            false,
        )
    }
}
