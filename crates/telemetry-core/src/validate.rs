//! Payload checks shared by the typed mutation calls and the raw
//! [`contracts::CommandPayload`] path. Each returns the first problem found.

use contracts::{CapsuleType, SimSpeed};

use crate::error::ValidationError;

pub const MIN_SEVERITY: u8 = 1;
pub const MAX_SEVERITY: u8 = 10;

pub fn parse_capsule_type(raw: &str) -> Result<CapsuleType, ValidationError> {
    let normalized = raw.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "" => Err(ValidationError::EmptyCapsuleType),
        "standard" => Ok(CapsuleType::Standard),
        "booster" => Ok(CapsuleType::Booster),
        "emergency" => Ok(CapsuleType::Emergency),
        _ => Err(ValidationError::UnknownCapsuleType(raw.trim().to_string())),
    }
}

pub fn validate_amount(amount: f64) -> Result<f64, ValidationError> {
    if !amount.is_finite() {
        return Err(ValidationError::NonFiniteAmount);
    }
    if amount <= 0.0 {
        return Err(ValidationError::NonPositiveAmount(amount));
    }
    Ok(amount)
}

pub fn validate_severity(severity: i64) -> Result<u8, ValidationError> {
    if (i64::from(MIN_SEVERITY)..=i64::from(MAX_SEVERITY)).contains(&severity) {
        Ok(severity as u8)
    } else {
        Err(ValidationError::SeverityOutOfRange(severity))
    }
}

pub fn validate_symptom_label(label: &str) -> Result<&str, ValidationError> {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        Err(ValidationError::EmptySymptomLabel)
    } else {
        Ok(trimmed)
    }
}

pub fn validate_alert_title(title: &str) -> Result<&str, ValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        Err(ValidationError::EmptyAlertTitle)
    } else {
        Ok(trimmed)
    }
}

pub fn parse_speed(raw: i64) -> Result<SimSpeed, ValidationError> {
    u8::try_from(raw)
        .ok()
        .and_then(|value| SimSpeed::try_from(value).ok())
        .ok_or(ValidationError::UnsupportedSpeed(raw))
}
