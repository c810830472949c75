use thiserror::Error;

/// Rejected mutation payload. Nothing is applied when one of these is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("symptom severity {0} is outside [1, 10]")]
    SeverityOutOfRange(i64),

    #[error("symptom severity is required")]
    MissingSeverity,

    #[error("dose amount must be positive, got {0}")]
    NonPositiveAmount(f64),

    #[error("dose amount must be finite")]
    NonFiniteAmount,

    #[error("capsule type is empty")]
    EmptyCapsuleType,

    #[error("unknown capsule type: {0:?}")]
    UnknownCapsuleType(String),

    #[error("symptom label is empty")]
    EmptySymptomLabel,

    #[error("alert title is empty")]
    EmptyAlertTitle,

    #[error("unknown scenario: {0:?}")]
    UnknownScenario(String),

    #[error("unsupported speed multiplier {0}; expected 1, 2 or 4")]
    UnsupportedSpeed(i64),
}
