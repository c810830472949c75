//! Rule-based risk forecast derived from recorded history.

use contracts::{
    Alert, DetailedForecast, DoseRecord, FeatureWeight, RiskForecast, SymptomRecord, ONE_DAY_MS,
};

pub const LIGHT_MODEL_VERSION: &str = "light-v0.1";
pub const FULL_MODEL_VERSION: &str = "full-v0.1";
const HOUR_MS: f64 = 3_600_000.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ForecastFeatures {
    pub last_dose_missed: Option<bool>,
    pub hours_since_last_dose: Option<f64>,
    pub symptom_severity: Option<f64>,
    pub recent_alerts: Option<u32>,
}

impl ForecastFeatures {
    pub fn from_history(
        doses: &[DoseRecord],
        symptoms: &[SymptomRecord],
        alerts: &[Alert],
        now_ms: i64,
    ) -> Self {
        let within_day = |timestamp_ms: i64| now_ms.saturating_sub(timestamp_ms) < ONE_DAY_MS;

        let last_dose_ms = doses.iter().map(|dose| dose.timestamp_ms).max();
        let hours_since_last_dose = last_dose_ms
            .map(|timestamp_ms| (now_ms.saturating_sub(timestamp_ms)).max(0) as f64 / HOUR_MS);
        let last_dose_missed = !last_dose_ms.is_some_and(within_day);

        let symptom_severity = symptoms
            .iter()
            .filter(|symptom| within_day(symptom.timestamp_ms))
            .map(|symptom| symptom.severity)
            .max()
            .map(f64::from);

        let recent_alerts = alerts
            .iter()
            .filter(|alert| within_day(alert.timestamp_ms))
            .count();

        Self {
            last_dose_missed: Some(last_dose_missed),
            hours_since_last_dose,
            symptom_severity,
            recent_alerts: Some(u32::try_from(recent_alerts).unwrap_or(u32::MAX)),
        }
    }

    fn provided(&self) -> u32 {
        [
            self.last_dose_missed.is_some(),
            self.hours_since_last_dose.is_some(),
            self.symptom_severity.is_some(),
            self.recent_alerts.is_some(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count() as u32
    }
}

pub fn light_forecast(features: &ForecastFeatures) -> RiskForecast {
    let missed = features.last_dose_missed.unwrap_or(false);
    let hours = features.hours_since_last_dose.unwrap_or(0.0).max(0.0);
    let severity = features.symptom_severity.unwrap_or(0.0).max(0.0);
    let alerts = features.recent_alerts.unwrap_or(0);

    let mut score = 0.0;
    if missed {
        score += 30.0;
    }
    score += (hours / 2.0).min(20.0);
    score += (severity * 5.0).min(30.0);
    score += (f64::from(alerts) * 8.0).min(20.0);
    let risk = score.clamp(0.0, 100.0);

    let confidence = (50.0 + 12.0 * f64::from(features.provided())).clamp(40.0, 99.0);

    let mut reasons = Vec::new();
    if missed {
        reasons.push("missed dose".to_string());
    }
    if hours >= 8.0 {
        reasons.push(format!("{}h since last dose", hours as u64));
    }
    if severity >= 5.0 {
        reasons.push("high symptom severity".to_string());
    }
    if alerts >= 1 {
        reasons.push(format!("{alerts} recent alert(s)"));
    }
    let explanation = if reasons.is_empty() {
        "normal".to_string()
    } else {
        reasons.join(", ")
    };

    RiskForecast {
        risk: round_tenth(risk),
        confidence: round_tenth(confidence),
        explanation,
        model_version: LIGHT_MODEL_VERSION.to_string(),
    }
}

/// Light forecast extended with a fatigue score (70% of the risk plus 6 per
/// recent alert, capped at 100) and fixed feature weights. A missed dose
/// dominates the weights; otherwise it ranks last.
pub fn full_forecast(features: &ForecastFeatures) -> DetailedForecast {
    let mut forecast = light_forecast(features);
    let alerts = f64::from(features.recent_alerts.unwrap_or(0));
    let fatigue = (forecast.risk * 0.7 + alerts * 6.0).min(100.0);

    let missed_weight = if features.last_dose_missed.unwrap_or(false) {
        0.4
    } else {
        0.05
    };
    let mut feature_importance: Vec<FeatureWeight> = [
        ("last_dose_missed", missed_weight),
        ("symptom_severity", 0.3),
        ("hours_since_last_dose", 0.2),
        ("recent_alerts", 0.1),
    ]
    .into_iter()
    .map(|(feature, importance)| FeatureWeight {
        feature: feature.to_string(),
        importance,
    })
    .collect();
    feature_importance.sort_by(|a, b| b.importance.total_cmp(&a.importance));

    forecast.model_version = FULL_MODEL_VERSION.to_string();
    DetailedForecast {
        forecast,
        fatigue_score: round_tenth(fatigue),
        feature_importance,
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
