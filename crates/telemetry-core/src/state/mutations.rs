use super::*;

use crate::error::ValidationError;
use crate::lexicon::{
    ADVISORY_DOSE, ADVISORY_SYMPTOM, ADVISORY_SYMPTOM_SEVERE, ALERT_TITLE_CRITICAL_VITALS,
    LABEL_ALERT_RESOLVED, LABEL_STATE_RECOVERY,
};
use crate::validate::{validate_alert_title, validate_amount, validate_severity, validate_symptom_label};
use contracts::{CapsuleType, EventSource};

/// Manual symptoms at or above this severity escalate to a critical alert.
pub const CRITICAL_SYMPTOM_SEVERITY: u8 = 7;

impl SimulationState {
    pub fn record_dose(
        &mut self,
        capsule_type: CapsuleType,
        amount: f64,
        now_ms: i64,
    ) -> Result<DoseRecord, ValidationError> {
        let amount = validate_amount(amount)?;
        let dose = DoseRecord {
            id: self.next_id("dose"),
            timestamp_ms: now_ms,
            capsule_type,
            amount,
            stability_boost: capsule_type.stability_boost(),
        };

        self.push_event(
            now_ms,
            format!("INTAKE: {}", capsule_type.as_str().to_uppercase()),
            format!("Stability +{:.1}", dose.weighted_boost()),
            EventKind::Dose {
                dose: dose.clone(),
                source: EventSource::Manual,
            },
        );
        self.dose_history.push(dose.clone());
        self.dose_streak = self.dose_streak.saturating_add(1);
        self.advisory = ADVISORY_DOSE.to_string();
        self.metrics = self.canonical_metrics(now_ms);

        debug!(
            dose_id = %dose.id,
            capsule = %capsule_type,
            amount,
            stability = self.metrics.stability,
            "dose recorded"
        );
        Ok(dose)
    }

    pub fn record_symptom(
        &mut self,
        label: &str,
        severity: u8,
        notes: Option<String>,
        now_ms: i64,
    ) -> Result<SymptomRecorded, ValidationError> {
        let label = validate_symptom_label(label)?.to_string();
        let severity = validate_severity(i64::from(severity))?;
        let notes = notes.filter(|text| !text.trim().is_empty());

        let symptom = SymptomRecord {
            id: self.next_id("sym"),
            timestamp_ms: now_ms,
            label: label.clone(),
            severity,
            notes,
        };

        self.push_event(
            now_ms,
            format!("BIO-SCAN: {}", label.to_uppercase()),
            format!("Severity {severity}/10 detected"),
            EventKind::Symptom {
                symptom: symptom.clone(),
                source: EventSource::Manual,
            },
        );
        let symptom_id = symptom.id.clone();
        self.symptom_history.push(symptom);

        let alert_id = if severity >= CRITICAL_SYMPTOM_SEVERITY {
            Some(self.push_alert(
                ALERT_TITLE_CRITICAL_VITALS.to_string(),
                format!("{label} spikes exceeding safety thresholds."),
                AlertSeverity::Critical,
                now_ms,
                true,
            ))
        } else {
            None
        };

        self.advisory = if severity >= CRITICAL_SYMPTOM_SEVERITY {
            ADVISORY_SYMPTOM_SEVERE
        } else {
            ADVISORY_SYMPTOM
        }
        .to_string();
        self.metrics = self.canonical_metrics(now_ms);

        debug!(
            symptom_id = %symptom_id,
            severity,
            escalated = alert_id.is_some(),
            stability = self.metrics.stability,
            "symptom recorded"
        );
        Ok(SymptomRecorded {
            symptom_id,
            alert_id,
        })
    }

    pub fn raise_alert(
        &mut self,
        title: &str,
        message: &str,
        severity: AlertSeverity,
        now_ms: i64,
    ) -> Result<String, ValidationError> {
        let title = validate_alert_title(title)?.to_string();
        let alert_id = self.push_alert(title, message.trim().to_string(), severity, now_ms, true);
        debug!(alert_id = %alert_id, severity = ?severity, "alert raised");
        Ok(alert_id)
    }

    /// `Active -> Acknowledged`. Returns whether anything changed; unknown ids
    /// and alerts past `Active` are left alone.
    pub fn acknowledge_alert(&mut self, alert_id: &str) -> bool {
        self.transition_alert(alert_id, AlertStatus::Acknowledged)
            .is_some()
    }

    /// Moves an `Active` or `Acknowledged` alert to `Resolved` and notes it on the timeline.
    pub fn resolve_alert(&mut self, alert_id: &str, now_ms: i64) -> bool {
        let Some(title) = self.transition_alert(alert_id, AlertStatus::Resolved) else {
            return false;
        };
        self.push_event(
            now_ms,
            LABEL_ALERT_RESOLVED.to_string(),
            title.clone(),
            EventKind::Success {
                text: format!("{title} resolved"),
            },
        );
        true
    }

    /// Timeline warning for persisted state that could not be restored.
    pub fn note_state_recovery(&mut self, detail: &str, now_ms: i64) {
        self.push_event(
            now_ms,
            LABEL_STATE_RECOVERY.to_string(),
            "Persisted state unreadable; defaults restored".to_string(),
            EventKind::Warning {
                text: detail.to_string(),
            },
        );
    }

    fn transition_alert(&mut self, alert_id: &str, next: AlertStatus) -> Option<String> {
        let alert = self.alerts.iter_mut().find(|alert| alert.id == alert_id)?;
        if !alert.status.can_transition_to(next) {
            debug!(alert_id, from = ?alert.status, to = ?next, "alert transition ignored");
            return None;
        }
        alert.status = next;
        Some(alert.title.clone())
    }
}
