use contracts::{AlertSeverity, AlertStatus, CapsuleType, EventKind, EventSource, Trend};

use super::*;
use crate::error::ValidationError;
use crate::tick::TickEvent;

const NOW: i64 = 1_700_000_000_000;

fn fresh(seed: u64, scenario: Scenario) -> SimulationState {
    SimulationState::new(seed, scenario, SimSpeed::X1, StateSettings::default())
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn severe_symptom_escalates_and_recomputes() {
    let mut state = fresh(5, Scenario::Normal);
    let recorded = state
        .record_symptom("Nausea", 9, None, NOW)
        .expect("valid symptom");

    let metrics = state.metrics();
    assert_eq!(metrics.stability, 33.0);
    assert_eq!(metrics.readiness, 30.0);
    assert_eq!(metrics.risk_score, 77.0);
    assert_eq!(metrics.confidence, 72.0);
    assert_eq!(metrics.trend, Trend::Declining);

    let alert_id = recorded.alert_id.expect("severity 9 escalates");
    let alert = state.alert(&alert_id).expect("alert stored");
    assert_eq!(alert.title, "CRITICAL VITALS");
    assert_eq!(alert.severity, AlertSeverity::Critical);
    assert_eq!(alert.status, AlertStatus::Active);
    assert_eq!(state.active_alert_count(), 1);

    let kinds = state
        .timeline()
        .iter()
        .map(|event| event.kind.name())
        .collect::<Vec<_>>();
    assert_eq!(kinds, vec!["alert", "symptom"]);
    assert_eq!(state.advisory(), crate::lexicon::ADVISORY_SYMPTOM_SEVERE);
}

#[test]
fn mild_symptom_does_not_escalate() {
    let mut state = fresh(5, Scenario::Normal);
    let recorded = state
        .record_symptom("Headache", 6, Some("after briefing".to_string()), NOW)
        .expect("valid symptom");
    assert!(recorded.alert_id.is_none());
    assert!(state.alerts().is_empty());
    assert_eq!(state.symptom_history()[0].notes.as_deref(), Some("after briefing"));
    assert_eq!(state.advisory(), crate::lexicon::ADVISORY_SYMPTOM);
}

#[test]
fn standard_dose_lifts_stability_to_sixty_six() {
    let mut state = fresh(5, Scenario::Normal);
    let dose = state
        .record_dose(CapsuleType::Standard, 1.0, NOW)
        .expect("valid dose");
    assert_eq!(dose.stability_boost, 6.0);

    let metrics = state.metrics();
    assert_eq!(metrics.stability, 66.0);
    assert_eq!(metrics.readiness, 61.0);
    assert_eq!(metrics.risk_score, 34.0);
    assert_eq!(metrics.trend, Trend::Improving);
    assert_eq!(state.dose_streak(), 1);

    let latest = state.timeline().latest().expect("dose event");
    assert_eq!(latest.label, "INTAKE: STANDARD");
    assert!(matches!(
        latest.kind,
        EventKind::Dose {
            source: EventSource::Manual,
            ..
        }
    ));
}

#[test]
fn rejected_payloads_leave_state_untouched() {
    let mut state = fresh(5, Scenario::Normal);
    assert_eq!(
        state.record_dose(CapsuleType::Booster, -1.0, NOW),
        Err(ValidationError::NonPositiveAmount(-1.0))
    );
    assert!(matches!(
        state.record_symptom("Nausea", 11, None, NOW),
        Err(ValidationError::SeverityOutOfRange(11))
    ));
    assert!(matches!(
        state.record_symptom("   ", 3, None, NOW),
        Err(ValidationError::EmptySymptomLabel)
    ));
    assert!(matches!(
        state.raise_alert("", "body", AlertSeverity::Info, NOW),
        Err(ValidationError::EmptyAlertTitle)
    ));

    assert!(state.dose_history().is_empty());
    assert!(state.symptom_history().is_empty());
    assert!(state.timeline().is_empty());
    assert_eq!(*state.metrics(), baseline_metrics());
}

#[test]
fn alert_lifecycle_only_moves_forward() {
    let mut state = fresh(5, Scenario::Normal);
    let alert_id = state
        .raise_alert("Hull breach", "Deck 4", AlertSeverity::Warning, NOW)
        .expect("valid alert");
    assert_eq!(state.timeline().latest().map(|event| event.label.as_str()), Some("ALERT: Hull breach"));

    assert!(state.acknowledge_alert(&alert_id));
    assert!(!state.acknowledge_alert(&alert_id));
    assert!(state.resolve_alert(&alert_id, NOW + 1));
    assert_eq!(state.alert(&alert_id).map(|alert| alert.status), Some(AlertStatus::Resolved));

    let latest = state.timeline().latest().expect("resolution event");
    assert_eq!(latest.label, "ALERT RESOLVED");
    assert!(matches!(latest.kind, EventKind::Success { .. }));

    assert!(!state.acknowledge_alert(&alert_id));
    assert!(!state.resolve_alert(&alert_id, NOW + 2));
    assert_eq!(state.alert(&alert_id).map(|alert| alert.status), Some(AlertStatus::Resolved));
    assert!(!state.resolve_alert("alert-999999", NOW));
    assert_eq!(state.active_alert_count(), 0);
}

#[test]
fn active_alert_resolves_directly() {
    let mut state = fresh(5, Scenario::Normal);
    let alert_id = state
        .raise_alert("Drift", "", AlertSeverity::Info, NOW)
        .expect("valid alert");
    assert!(state.resolve_alert(&alert_id, NOW));
    assert_eq!(state.alert(&alert_id).map(|alert| alert.status), Some(AlertStatus::Resolved));
}

#[test]
fn severe_tick_symptom_raises_alert_without_history() {
    let mut state = fresh(1, Scenario::Unstable);
    let report = state.advance_tick(NOW);

    assert_eq!(report.tick, 1);
    assert_eq!(
        report.event,
        Some(TickEvent::Symptom {
            label: "Hypoxia warning",
            severity: 10
        })
    );
    let alert_id = report.alert_id.expect("critical tick alert");
    let alert = state.alert(&alert_id).expect("alert stored");
    assert_eq!(alert.title, "CRITICAL BIO-SPIKE");
    assert_eq!(alert.severity, AlertSeverity::Critical);

    assert_eq!(state.timeline().len(), 1);
    let event = state.timeline().latest().expect("tick event");
    assert_eq!(Some(&event.id), report.event_id.as_ref());
    assert_eq!(event.label, "ANOMALY: HYPOXIA WARNING");
    assert!(matches!(
        event.kind,
        EventKind::Symptom {
            source: EventSource::Simulated,
            ..
        }
    ));
    assert!(state.symptom_history().is_empty());

    let metrics = state.metrics();
    assert!(close(metrics.stability, 45.23536970294081));
    assert!(close(metrics.readiness, 54.62353697029408));
    assert!(close(metrics.risk_score, 100.0 - 45.23536970294081 + 10.0));
    assert_eq!(metrics.confidence, 70.0);
    assert_eq!(metrics.trend, Trend::Declining);
}

#[test]
fn zero_drift_pins_ticks_to_canonical() {
    let settings = StateSettings {
        max_tick_drift: 0.0,
        ..StateSettings::default()
    };
    let mut state = SimulationState::new(11, Scenario::Unstable, SimSpeed::X4, settings);
    for _ in 0..50 {
        state.advance_tick(NOW);
        assert_eq!(state.metrics().stability, 60.0);
        assert_eq!(state.metrics().readiness, 54.0);
    }
    assert_eq!(state.tick(), 50);
}

#[test]
fn tick_drift_stays_bounded() {
    let mut state = fresh(77, Scenario::Unstable);
    for _ in 0..500 {
        state.advance_tick(NOW);
        let drift = (state.metrics().stability - 60.0).abs();
        assert!(drift <= DEFAULT_MAX_TICK_DRIFT + 1e-9, "drift {drift}");
        assert!(state.metrics().is_within_bounds());
    }
}

#[test]
fn lower_gravity_engages_on_an_empty_history() {
    let gravity_free = StateSettings {
        gravity: GravityConfig {
            lower_pull: 0.0,
            ..GravityConfig::DEFAULT
        },
        ..StateSettings::default()
    };
    let mut pulled = fresh(77, Scenario::Unstable);
    let mut free = SimulationState::new(77, Scenario::Unstable, SimSpeed::X1, gravity_free);

    let mut lowest = f64::MAX;
    let mut first_pull = None;
    for _ in 0..2_000 {
        let before = pulled.metrics().stability;
        pulled.advance_tick(NOW);
        free.advance_tick(NOW);
        lowest = lowest.min(pulled.metrics().stability);
        let gap = pulled.metrics().stability - free.metrics().stability;
        if gap != 0.0 {
            first_pull = Some((before, gap));
            break;
        }
    }

    assert!(lowest < GravityConfig::DEFAULT.lower_threshold, "lowest {lowest}");
    assert!(lowest >= 60.0 - DEFAULT_MAX_TICK_DRIFT - 1e-9);
    let (before, gap) = first_pull.expect("gravity never moved stability");
    assert!(before < GravityConfig::DEFAULT.lower_threshold, "before {before}");
    assert!(gap < 0.0 && gap >= GravityConfig::DEFAULT.lower_pull - 1e-9, "gap {gap}");
}

#[test]
fn timeline_is_bounded_but_history_is_not() {
    let settings = StateSettings {
        timeline_capacity: 5,
        ..StateSettings::default()
    };
    let mut state = SimulationState::new(3, Scenario::Calm, SimSpeed::X1, settings);
    for offset in 0..8 {
        state
            .record_dose(CapsuleType::Standard, 0.5, NOW + offset)
            .expect("valid dose");
    }
    assert_eq!(state.dose_history().len(), 8);
    assert_eq!(state.timeline().len(), 5);
    assert_eq!(state.timeline().latest().map(|event| event.timestamp_ms), Some(NOW + 7));
}

#[test]
fn reset_restores_baseline_and_keeps_ids_unique() {
    let mut state = fresh(9, Scenario::Aggressive);
    let first = state
        .record_dose(CapsuleType::Emergency, 1.0, NOW)
        .expect("valid dose");
    state
        .record_symptom("Nausea", 8, None, NOW)
        .expect("valid symptom");
    state.set_running(true);
    state.advance_ticks(5, NOW);

    state.reset(42);
    assert_eq!(state.seed(), 42);
    assert!(!state.is_running());
    assert_eq!(state.tick(), 0);
    assert_eq!(state.scenario(), Scenario::Aggressive);
    assert!(state.dose_history().is_empty());
    assert!(state.symptom_history().is_empty());
    assert!(state.timeline().is_empty());
    assert!(state.alerts().is_empty());
    assert_eq!(*state.metrics(), baseline_metrics());
    assert_eq!(state.dose_streak(), 0);
    assert_eq!(state.rng(), &SeededRng::from_seed_u64(42));

    let second = state
        .record_dose(CapsuleType::Emergency, 1.0, NOW)
        .expect("valid dose");
    assert_ne!(first.id, second.id);
}

#[test]
fn persisted_state_resumes_the_stream() {
    let mut state = fresh(2024, Scenario::Aggressive);
    state
        .record_dose(CapsuleType::Booster, 1.0, NOW)
        .expect("valid dose");
    state.advance_ticks(25, NOW);

    let persisted = state.to_persisted(NOW);
    let raw = serde_json::to_string(&persisted).expect("serialize");
    let decoded = serde_json::from_str(&raw).expect("deserialize");
    let restored = SimulationState::from_persisted(decoded, StateSettings::default(), NOW);

    assert_eq!(restored.rng(), state.rng());
    assert_eq!(restored.seed(), 2024);
    assert_eq!(restored.tick(), 25);
    assert_eq!(restored.dose_history(), state.dose_history());
    assert_eq!(restored.timeline().to_vec(), state.timeline().to_vec());
    assert_eq!(restored.alerts(), state.alerts());
    assert!(!restored.is_running());
    assert_eq!(restored.metrics().stability, 72.0);
}

#[test]
fn restore_without_sequence_continues_past_existing_ids() {
    let mut state = fresh(1, Scenario::Normal);
    state
        .record_dose(CapsuleType::Standard, 1.0, NOW)
        .expect("valid dose");
    let mut persisted = state.to_persisted(NOW);
    persisted.next_sequence = 0;

    let mut restored = SimulationState::from_persisted(persisted, StateSettings::default(), NOW);
    let dose = restored
        .record_dose(CapsuleType::Standard, 1.0, NOW)
        .expect("valid dose");
    assert!(restored
        .dose_history()
        .iter()
        .filter(|existing| existing.id == dose.id)
        .count()
        == 1);
}

#[test]
fn export_carries_seed_and_history() {
    let mut state = fresh(7, Scenario::Calm);
    state
        .record_dose(CapsuleType::Standard, 1.0, NOW)
        .expect("valid dose");
    let export = state.export();
    assert_eq!(export.config.seed, 7);
    assert_eq!(export.config.scenario, Scenario::Calm);
    assert_eq!(export.history.doses.len(), 1);
    assert!(export.history.symptoms.is_empty());
    assert_eq!(export.metrics, *state.metrics());
}

#[test]
fn state_recovery_note_is_a_warning() {
    let mut state = fresh(7, Scenario::Calm);
    state.note_state_recovery("expected value at line 1 column 1", NOW);
    let latest = state.timeline().latest().expect("warning");
    assert_eq!(latest.label, "STATE RECOVERY");
    assert!(matches!(latest.kind, EventKind::Warning { .. }));
}
