//! One discrete simulation step: noise, homeostatic gravity and scenario bias
//! move stability, then at most one event candidate is rolled from the stream.
//!
//! The draw order is part of the replay contract:
//! noise, event chance, branch roll, branch payload, advisory chance, advisory pick.

use contracts::{MetricsSnapshot, Scenario};

use crate::lexicon::{ADVISORY_LINES, SYMPTOM_LABELS, SYSTEM_SCAN_LINES};
use crate::metrics::trend_between;
use crate::rng::SeededRng;
use crate::scenario::{scenario_config, GravityConfig};

const READINESS_LAG_ALPHA: f64 = 0.1;
const RECOVERY_BRANCH_CEILING: f64 = 70.0;
const RECOVERY_ROLL: f64 = 0.3;
const SYMPTOM_ROLL: f64 = 0.8;
const RECOVERY_BOOST_MIN: f64 = 5.0;
const RECOVERY_BOOST_MAX: f64 = 15.0;
const SYMPTOM_STABILITY_COST: f64 = 1.5;
pub const CRITICAL_TICK_SEVERITY: u8 = 8;
const ADVISORY_CHANCE_AFTER_EVENT: f64 = 0.2;
const ADVISORY_CHANCE_IDLE: f64 = 0.03;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickEvent {
    RecoveryDose { boost: f64 },
    Symptom { label: &'static str, severity: u8 },
    SystemScan { detail: &'static str },
}

impl TickEvent {
    pub fn raises_critical_alert(&self) -> bool {
        matches!(self, Self::Symptom { severity, .. } if *severity >= CRITICAL_TICK_SEVERITY)
    }
}

/// Provisional result of a tick. The caller re-anchors `metrics` on the
/// canonical recomputation before exposing them.
#[derive(Debug, Clone, PartialEq)]
pub struct TickUpdate {
    pub metrics: MetricsSnapshot,
    pub event: Option<TickEvent>,
    pub advisory: Option<&'static str>,
}

pub fn generate_tick_update(
    current: &MetricsSnapshot,
    scenario: Scenario,
    gravity: &GravityConfig,
    rng: &mut SeededRng,
) -> TickUpdate {
    let config = scenario_config(scenario);
    let stability = current.stability;

    let noise = (rng.next_f64() - 0.5) * config.volatility;
    let mut next_stability =
        (stability + noise + gravity.pull(stability) + config.bias).clamp(0.0, 100.0);
    let next_readiness = (current.readiness
        + (next_stability - current.readiness) * READINESS_LAG_ALPHA)
        .clamp(0.0, 100.0);

    let mut event = None;
    if rng.chance(config.event_chance) {
        let roll = rng.next_f64();
        let candidate = if roll < RECOVERY_ROLL && stability < RECOVERY_BRANCH_CEILING {
            let boost = rng.range(RECOVERY_BOOST_MIN, RECOVERY_BOOST_MAX);
            next_stability += boost;
            TickEvent::RecoveryDose { boost }
        } else if (RECOVERY_ROLL..SYMPTOM_ROLL).contains(&roll) {
            let severity = rng.int_range(1, i64::from(config.max_severity)) as u8;
            let label = rng.pick(&SYMPTOM_LABELS).copied().unwrap_or(SYMPTOM_LABELS[0]);
            next_stability -= f64::from(severity) * SYMPTOM_STABILITY_COST;
            TickEvent::Symptom { label, severity }
        } else {
            let detail = rng
                .pick(&SYSTEM_SCAN_LINES)
                .copied()
                .unwrap_or(SYSTEM_SCAN_LINES[0]);
            TickEvent::SystemScan { detail }
        };
        next_stability = next_stability.clamp(0.0, 100.0);
        event = Some(candidate);
    }

    let advisory_chance = if event.is_some() {
        ADVISORY_CHANCE_AFTER_EVENT
    } else {
        ADVISORY_CHANCE_IDLE
    };
    let advisory = if rng.chance(advisory_chance) {
        rng.pick(&ADVISORY_LINES).copied()
    } else {
        None
    };

    let metrics = MetricsSnapshot {
        stability: next_stability,
        readiness: next_readiness,
        risk_score: (100.0 - next_stability + config.volatility * 2.0).clamp(0.0, 100.0),
        confidence: (100.0 - config.volatility * 5.0).clamp(20.0, 99.0),
        trend: trend_between(stability, next_stability),
    };
    debug_assert!(metrics.is_within_bounds(), "tick produced {metrics}");

    TickUpdate {
        metrics,
        event,
        advisory,
    }
}
