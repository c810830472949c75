use super::*;

use contracts::{
    DetailedForecast, ExportConfig, ExportDocument, ExportHistory, PersistedState, RiskForecast,
    Snapshot, SCHEMA_VERSION_V1,
};

use crate::forecast::{full_forecast, light_forecast, ForecastFeatures};

impl SimulationState {
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            metrics: self.metrics,
            events: self.timeline.to_vec(),
            alerts: self.alerts.clone(),
            dose_history: self.dose_history.clone(),
            symptom_history: self.symptom_history.clone(),
            scenario: self.scenario,
            speed: self.speed,
            running: self.running,
            tick: self.tick,
            dose_streak: self.dose_streak,
            advisory: self.advisory.clone(),
        }
    }

    pub fn export(&self) -> ExportDocument {
        ExportDocument {
            metrics: self.metrics,
            history: ExportHistory {
                doses: self.dose_history.clone(),
                symptoms: self.symptom_history.clone(),
            },
            config: ExportConfig {
                seed: self.seed,
                scenario: self.scenario,
                speed: self.speed,
            },
        }
    }

    pub fn forecast(&self, now_ms: i64) -> RiskForecast {
        light_forecast(&self.forecast_features(now_ms))
    }

    pub fn detailed_forecast(&self, now_ms: i64) -> DetailedForecast {
        full_forecast(&self.forecast_features(now_ms))
    }

    fn forecast_features(&self, now_ms: i64) -> ForecastFeatures {
        ForecastFeatures::from_history(
            &self.dose_history,
            &self.symptom_history,
            &self.alerts,
            now_ms,
        )
    }

    pub fn to_persisted(&self, saved_at_ms: i64) -> PersistedState {
        PersistedState {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            seed: self.seed,
            rng_state: self.rng.state(),
            scenario: self.scenario,
            speed: self.speed,
            tick: self.tick,
            dose_history: self.dose_history.clone(),
            symptom_history: self.symptom_history.clone(),
            events: self.timeline.to_vec(),
            alerts: self.alerts.clone(),
            metrics: self.metrics,
            dose_streak: self.dose_streak,
            advisory: self.advisory.clone(),
            next_sequence: self.next_sequence,
            saved_at_ms,
        }
    }

    /// Rebuild from a persisted document. The PRNG continues from the saved
    /// position; metrics are recomputed from the restored histories rather
    /// than trusted. Never starts running.
    pub fn from_persisted(persisted: PersistedState, settings: StateSettings, now_ms: i64) -> Self {
        let settings = settings.sanitized();
        let highest_seen = persisted
            .dose_history
            .iter()
            .map(|dose| dose.id.as_str())
            .chain(persisted.symptom_history.iter().map(|symptom| symptom.id.as_str()))
            .chain(persisted.events.iter().map(|event| event.id.as_str()))
            .chain(persisted.alerts.iter().map(|alert| alert.id.as_str()))
            .filter_map(sequence_of)
            .max()
            .unwrap_or(0);

        let previous_stability = if persisted.metrics.stability.is_finite() {
            persisted.metrics.stability
        } else {
            baseline_metrics().stability
        };
        let metrics = compute_metrics(
            &persisted.dose_history,
            &persisted.symptom_history,
            previous_stability,
            now_ms,
        );
        let advisory = if persisted.advisory.trim().is_empty() {
            ADVISORY_INITIAL.to_string()
        } else {
            persisted.advisory
        };

        Self {
            seed: persisted.seed,
            rng: SeededRng::from_state(persisted.rng_state),
            scenario: persisted.scenario,
            speed: persisted.speed,
            running: false,
            tick: persisted.tick,
            dose_history: persisted.dose_history,
            symptom_history: persisted.symptom_history,
            timeline: Timeline::from_newest_first(persisted.events, settings.timeline_capacity),
            alerts: persisted.alerts,
            metrics,
            dose_streak: persisted.dose_streak,
            advisory,
            next_sequence: persisted.next_sequence.max(highest_seen),
            settings,
        }
    }
}

/// Trailing number of an id like `dose-000042`.
fn sequence_of(id: &str) -> Option<u64> {
    id.rsplit_once('-')
        .and_then(|(_, digits)| digits.parse().ok())
}
