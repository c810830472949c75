//! Canonical metrics recomputed from the full dose and symptom histories.
//!
//! This is the source of truth after every mutation and after every tick:
//! tick deltas are provisional and get re-anchored on whatever this returns.

use contracts::{DoseRecord, MetricsSnapshot, SymptomRecord, Trend, ONE_DAY_MS};

const BASE_STABILITY: f64 = 60.0;
const SYMPTOM_WEIGHT: f64 = 3.0;
const RESIDUAL_IMPACT_FLOOR: f64 = 0.2;
const PENALTY_FLAG_THRESHOLD: f64 = 20.0;
pub const PENALTY_FLAG_RISK: f64 = 10.0;
pub const TREND_EPSILON: f64 = 0.2;

/// Intermediate sums behind a [`MetricsSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryAggregate {
    pub dose_bonus: f64,
    pub symptom_penalty: f64,
    pub recent_dose_count: usize,
    pub symptom_count: usize,
}

impl HistoryAggregate {
    pub fn penalty_flag(&self) -> bool {
        self.symptom_penalty > PENALTY_FLAG_THRESHOLD
    }
}

pub fn aggregate_history(
    doses: &[DoseRecord],
    symptoms: &[SymptomRecord],
    now_ms: i64,
) -> HistoryAggregate {
    let mut dose_bonus = 0.0;
    let mut recent_dose_count = 0;
    for dose in doses {
        if age_ms(dose.timestamp_ms, now_ms) >= ONE_DAY_MS {
            continue;
        }
        recent_dose_count += 1;
        let boost = dose.weighted_boost();
        if boost.is_finite() {
            dose_bonus += boost.max(0.0);
        }
    }

    let mut symptom_penalty = 0.0;
    for symptom in symptoms {
        let age = age_ms(symptom.timestamp_ms, now_ms);
        if age > ONE_DAY_MS {
            continue;
        }
        let severity = f64::from(symptom.severity.clamp(1, 10));
        let decay = (1.0 - age as f64 / ONE_DAY_MS as f64).max(RESIDUAL_IMPACT_FLOOR);
        symptom_penalty += severity * SYMPTOM_WEIGHT * decay;
    }

    HistoryAggregate {
        dose_bonus,
        symptom_penalty,
        recent_dose_count,
        symptom_count: symptoms.len(),
    }
}

pub fn compute_metrics(
    doses: &[DoseRecord],
    symptoms: &[SymptomRecord],
    previous_stability: f64,
    now_ms: i64,
) -> MetricsSnapshot {
    let aggregate = aggregate_history(doses, symptoms, now_ms);
    metrics_from_aggregate(&aggregate, previous_stability)
}

pub fn metrics_from_aggregate(
    aggregate: &HistoryAggregate,
    previous_stability: f64,
) -> MetricsSnapshot {
    let recent_doses = aggregate.recent_dose_count as f64;

    let stability = (BASE_STABILITY + aggregate.dose_bonus - aggregate.symptom_penalty)
        .round()
        .clamp(10.0, 100.0);
    let readiness = (stability * 0.9 + 2.0 * recent_doses)
        .round()
        .clamp(5.0, 100.0);

    let flag = if aggregate.penalty_flag() {
        PENALTY_FLAG_RISK
    } else {
        0.0
    };
    let risk_score = (100.0 - stability + flag).round().clamp(0.0, 100.0);

    let data_points = (aggregate.recent_dose_count + aggregate.symptom_count) as f64;
    let confidence = (70.0 + 2.0 * data_points).clamp(0.0, 99.0);

    MetricsSnapshot {
        stability,
        readiness,
        risk_score,
        confidence,
        trend: trend_between(previous_stability, stability),
    }
}

/// Metrics for an empty history.
pub fn baseline_metrics() -> MetricsSnapshot {
    compute_metrics(&[], &[], BASE_STABILITY, 0)
}

pub fn trend_between(previous: f64, next: f64) -> Trend {
    if !previous.is_finite() || !next.is_finite() {
        return Trend::Stable;
    }
    if next > previous + TREND_EPSILON {
        Trend::Improving
    } else if next < previous - TREND_EPSILON {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

/// Future timestamps count as age zero.
fn age_ms(timestamp_ms: i64, now_ms: i64) -> i64 {
    now_ms.saturating_sub(timestamp_ms).max(0)
}
