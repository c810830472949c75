use std::sync::Arc;

use contracts::{
    AlertSeverity, AlertStatus, CapsuleType, CommandOutcome, CommandPayload, EventKind, Scenario,
    SimSpeed, Trend,
};
use proptest::prelude::*;
use telemetry_api::{EngineConfig, EngineError, Orchestrator};
use telemetry_core::{ManualClock, ValidationError};

const NOW: i64 = 1_700_000_000_000;

fn manual(config: EngineConfig) -> (Orchestrator, ManualClock) {
    let clock = ManualClock::new(NOW);
    let orchestrator = Orchestrator::with_parts(config, None, Arc::new(clock.clone()));
    (orchestrator, clock)
}

fn validation(result: Result<CommandOutcome, EngineError>) -> ValidationError {
    match result {
        Err(EngineError::Validation(err)) => err,
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn severe_symptom_drops_stability_and_alerts() {
    let (orchestrator, _) = manual(EngineConfig::with_seed(1));
    let recorded = orchestrator
        .add_symptom("Nausea", 9, None)
        .expect("valid symptom");

    let metrics = orchestrator.metrics();
    assert_eq!(metrics.stability, 33.0);
    assert_eq!(metrics.trend, Trend::Declining);
    assert_eq!(orchestrator.active_alert_count(), 1);

    let snapshot = orchestrator.snapshot();
    let alert = &snapshot.alerts[0];
    assert_eq!(Some(&alert.id), recorded.alert_id.as_ref());
    assert_eq!(alert.severity, AlertSeverity::Critical);
    assert_eq!(alert.status, AlertStatus::Active);
}

#[test]
fn standard_dose_recomputes_to_sixty_six() {
    let (orchestrator, _) = manual(EngineConfig::with_seed(1));
    orchestrator
        .add_dose(CapsuleType::Standard, 1.0)
        .expect("valid dose");
    assert_eq!(orchestrator.metrics().stability, 66.0);
    assert_eq!(orchestrator.snapshot().dose_streak, 1);
}

#[test]
fn symptom_penalty_decays_with_age() {
    let (orchestrator, clock) = manual(EngineConfig::with_seed(1));
    orchestrator
        .add_symptom("Nausea", 5, None)
        .expect("valid symptom");
    assert_eq!(orchestrator.metrics().stability, 45.0);

    clock.advance(12 * 3_600_000);
    orchestrator
        .add_dose(CapsuleType::Standard, 1.0)
        .expect("valid dose");
    // 60 + 6 - 15 * 0.5
    assert_eq!(orchestrator.metrics().stability, 59.0);
}

#[test]
fn malformed_payloads_are_rejected() {
    let (orchestrator, _) = manual(EngineConfig::with_seed(1));

    let missing: CommandPayload =
        serde_json::from_str(r#"{"type":"add_symptom","label":"Nausea"}"#).expect("payload json");
    assert_eq!(validation(orchestrator.apply(missing)), ValidationError::MissingSeverity);

    assert_eq!(
        validation(orchestrator.apply(CommandPayload::AddSymptom {
            label: "Nausea".to_string(),
            severity: Some(0),
            notes: None,
        })),
        ValidationError::SeverityOutOfRange(0)
    );
    assert_eq!(
        validation(orchestrator.apply(CommandPayload::AddDose {
            capsule_type: "standard".to_string(),
            amount: -1.0,
        })),
        ValidationError::NonPositiveAmount(-1.0)
    );
    assert_eq!(
        validation(orchestrator.apply(CommandPayload::AddDose {
            capsule_type: " ".to_string(),
            amount: 1.0,
        })),
        ValidationError::EmptyCapsuleType
    );
    assert_eq!(
        validation(orchestrator.apply(CommandPayload::SetSpeed { speed: 3 })),
        ValidationError::UnsupportedSpeed(3)
    );
    assert_eq!(
        validation(orchestrator.apply(CommandPayload::SetScenario {
            scenario: "chaotic".to_string(),
        })),
        ValidationError::UnknownScenario("chaotic".to_string())
    );

    let snapshot = orchestrator.snapshot();
    assert!(snapshot.dose_history.is_empty());
    assert!(snapshot.symptom_history.is_empty());
    assert!(snapshot.events.is_empty());
    assert_eq!(snapshot.speed, SimSpeed::X1);
}

#[test]
fn raw_payloads_dispatch() {
    let (orchestrator, _) = manual(EngineConfig::with_seed(1));
    let outcome = orchestrator
        .apply(
            serde_json::from_str(r#"{"type":"add_dose","capsule_type":"Booster","amount":1}"#)
                .expect("payload json"),
        )
        .expect("valid dose");
    assert!(matches!(outcome, CommandOutcome::DoseRecorded { .. }));
    assert_eq!(orchestrator.metrics().stability, 72.0);

    let outcome = orchestrator
        .apply(CommandPayload::AddSymptom {
            label: "Vertigo".to_string(),
            severity: Some(7),
            notes: Some("during drill".to_string()),
        })
        .expect("valid symptom");
    let CommandOutcome::SymptomRecorded {
        alert_id: Some(alert_id),
        ..
    } = &outcome
    else {
        panic!("severity 7 should escalate, got {outcome:?}");
    };
    let alert_id = alert_id.clone();

    let outcome = orchestrator
        .apply(CommandPayload::AcknowledgeAlert {
            alert_id: alert_id.clone(),
        })
        .expect("acknowledge");
    assert_eq!(
        outcome,
        CommandOutcome::AlertUpdated {
            alert_id: alert_id.clone(),
            changed: true
        }
    );

    let outcome = orchestrator
        .apply(CommandPayload::SetScenario {
            scenario: "AGGRESSIVE".to_string(),
        })
        .expect("scenario");
    assert_eq!(
        outcome,
        CommandOutcome::ScenarioChanged {
            scenario: Scenario::Aggressive
        }
    );
    assert_eq!(orchestrator.snapshot().scenario, Scenario::Aggressive);
}

#[test]
fn alert_lifecycle_and_unknown_ids() {
    let (orchestrator, _) = manual(EngineConfig::with_seed(1));
    let alert_id = orchestrator
        .raise_alert("Hull breach", "Deck 4 pressure loss", AlertSeverity::Warning)
        .expect("valid alert");

    assert!(!orchestrator.acknowledge_alert("alert-missing"));
    assert!(!orchestrator.resolve_alert("alert-missing"));

    assert!(orchestrator.acknowledge_alert(&alert_id));
    assert!(orchestrator.resolve_alert(&alert_id));
    assert!(!orchestrator.acknowledge_alert(&alert_id));

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.alerts[0].status, AlertStatus::Resolved);
    assert_eq!(snapshot.events[0].label, "ALERT RESOLVED");
    assert_eq!(orchestrator.active_alert_count(), 0);
}

#[test]
fn reset_restores_documented_baseline() {
    let (orchestrator, _) = manual(EngineConfig::with_seed(1));
    orchestrator
        .add_symptom("Nausea", 9, None)
        .expect("valid symptom");
    orchestrator
        .add_dose(CapsuleType::Booster, 2.0)
        .expect("valid dose");
    orchestrator.step_n(10);

    orchestrator.reset();
    let snapshot = orchestrator.snapshot();
    assert!(snapshot.dose_history.is_empty());
    assert!(snapshot.symptom_history.is_empty());
    assert!(snapshot.events.is_empty());
    assert!(snapshot.alerts.is_empty());
    assert_eq!(snapshot.tick, 0);
    assert_eq!(snapshot.metrics.stability, 60.0);
    assert_eq!(snapshot.metrics.readiness, 54.0);
    assert_eq!(snapshot.metrics.risk_score, 40.0);
    assert_eq!(snapshot.metrics.confidence, 70.0);
    assert_eq!(orchestrator.seed(), NOW as u64);
}

#[test]
fn unstable_first_tick_raises_bio_spike() {
    let (orchestrator, _) = manual(EngineConfig {
        seed: Some(1),
        scenario: Scenario::Unstable,
        ..EngineConfig::default()
    });
    let report = orchestrator.step();
    assert!(report.alert_id.is_some());

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.alerts.len(), 1);
    assert_eq!(snapshot.alerts[0].title, "CRITICAL BIO-SPIKE");
    assert_eq!(snapshot.events.len(), 1);
    assert!(matches!(snapshot.events[0].kind, EventKind::Symptom { .. }));
    assert!(snapshot.symptom_history.is_empty());
}

#[test]
fn same_seed_orchestrators_agree() {
    let run = || {
        let (orchestrator, clock) = manual(EngineConfig {
            seed: Some(123_456_789),
            scenario: Scenario::Aggressive,
            ..EngineConfig::default()
        });
        for round in 0..40 {
            orchestrator.step_n(5);
            clock.advance(5_000);
            if round % 9 == 0 {
                orchestrator
                    .add_symptom("Tremor", 6, None)
                    .expect("valid symptom");
            }
        }
        orchestrator.snapshot()
    };
    assert_eq!(run(), run());
}

#[test]
fn export_has_documented_shape() {
    let (orchestrator, _) = manual(EngineConfig {
        seed: Some(77),
        scenario: Scenario::Calm,
        speed: SimSpeed::X2,
        ..EngineConfig::default()
    });
    orchestrator
        .add_dose(CapsuleType::Standard, 1.0)
        .expect("valid dose");
    orchestrator
        .add_symptom("Nausea", 2, None)
        .expect("valid symptom");

    let raw = orchestrator.export_snapshot().expect("export");
    assert!(raw.contains('\n'), "export is pretty printed");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("export json");
    assert_eq!(value["config"]["seed"], "77");
    assert_eq!(value["config"]["scenario"], "calm");
    assert_eq!(value["config"]["speed"], 2);
    assert_eq!(value["history"]["doses"].as_array().map(Vec::len), Some(1));
    assert_eq!(value["history"]["symptoms"].as_array().map(Vec::len), Some(1));
    assert_eq!(value["metrics"]["stability"], 60.0);
}

#[test]
fn forecast_reflects_recent_history() {
    let (orchestrator, _) = manual(EngineConfig::with_seed(1));
    let idle = orchestrator.forecast();
    assert_eq!(idle.explanation, "missed dose");

    orchestrator
        .add_dose(CapsuleType::Standard, 1.0)
        .expect("valid dose");
    orchestrator
        .add_symptom("Nausea", 9, None)
        .expect("valid symptom");
    let forecast = orchestrator.forecast();
    assert_eq!(forecast.risk, 38.0);
    assert_eq!(forecast.explanation, "high symptom severity, 1 recent alert(s)");
    assert_eq!(forecast.model_version, "light-v0.1");

    let detailed = orchestrator.detailed_forecast();
    assert_eq!(detailed.forecast.risk, forecast.risk);
    assert_eq!(detailed.forecast.model_version, "full-v0.1");
    assert_eq!(detailed.fatigue_score, 32.6);
    assert_eq!(detailed.feature_importance[0].feature, "symptom_severity");
    let value = serde_json::to_value(&detailed).expect("serialize forecast");
    assert_eq!(value["risk"], 38.0);
    assert_eq!(value["fatigue_score"], 32.6);
}

#[derive(Debug, Clone)]
enum Call {
    Step,
    Dose(f64),
    Symptom(Option<i64>),
    Acknowledge(usize),
    Resolve(usize),
    Reset,
}

fn call_strategy() -> impl Strategy<Value = Call> {
    prop_oneof![
        4 => Just(Call::Step),
        2 => (-2.0f64..4.0).prop_map(Call::Dose),
        2 => proptest::option::of(-1i64..12).prop_map(Call::Symptom),
        1 => (0usize..3).prop_map(Call::Acknowledge),
        1 => (0usize..3).prop_map(Call::Resolve),
        1 => Just(Call::Reset),
    ]
}

proptest! {
    #[test]
    fn arbitrary_call_sequences_keep_invariants(
        seed in any::<u64>(),
        scenario_index in 0usize..4,
        calls in proptest::collection::vec(call_strategy(), 1..60),
    ) {
        let (orchestrator, clock) = manual(EngineConfig {
            seed: Some(seed),
            scenario: Scenario::ALL[scenario_index],
            ..EngineConfig::default()
        });
        let mut doses = 0;
        for call in calls {
            clock.advance(700);
            match call {
                Call::Step => {
                    orchestrator.step();
                }
                Call::Dose(amount) => {
                    let outcome = orchestrator.apply(CommandPayload::AddDose {
                        capsule_type: "standard".to_string(),
                        amount,
                    });
                    prop_assert_eq!(outcome.is_ok(), amount > 0.0);
                }
                Call::Symptom(severity) => {
                    let outcome = orchestrator.apply(CommandPayload::AddSymptom {
                        label: "Vertigo".to_string(),
                        severity,
                        notes: None,
                    });
                    let valid = severity.is_some_and(|value| (1..=10).contains(&value));
                    prop_assert_eq!(outcome.is_ok(), valid);
                }
                Call::Acknowledge(index) => {
                    if let Some(alert) = orchestrator.snapshot().alerts.get(index) {
                        let was_active = alert.status == AlertStatus::Active;
                        prop_assert_eq!(orchestrator.acknowledge_alert(&alert.id), was_active);
                    }
                }
                Call::Resolve(index) => {
                    if let Some(alert) = orchestrator.snapshot().alerts.get(index) {
                        let open = alert.status != AlertStatus::Resolved;
                        prop_assert_eq!(orchestrator.resolve_alert(&alert.id), open);
                        prop_assert_eq!(
                            orchestrator.snapshot().alerts[index].status,
                            AlertStatus::Resolved
                        );
                    }
                }
                Call::Reset => {
                    orchestrator.reset();
                    doses = 0;
                }
            }
            let snapshot = orchestrator.snapshot();
            prop_assert!(snapshot.dose_history.len() >= doses);
            doses = snapshot.dose_history.len();
            prop_assert!(snapshot.metrics.is_within_bounds());
        }
    }
}
