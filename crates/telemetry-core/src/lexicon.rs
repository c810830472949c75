//! Fixed text banks. Order matters: `SeededRng::pick` indexes into them, so
//! reordering changes every replay.

pub const SYMPTOM_LABELS: [&str; 8] = [
    "Mild fatigue markers",
    "Elevated heart rate",
    "Cortisol spike detected",
    "Hydration levels dropping",
    "Minor cognitive drift",
    "Oxygen efficiency drop",
    "Neural desync",
    "Hypoxia warning",
];

pub const SYSTEM_SCAN_LINES: [&str; 5] = [
    "Mission telemetry update",
    "Environment scan complete",
    "HQ data packet received",
    "Background synthesis running",
    "Auto-logging biometrics",
];

pub const ADVISORY_LINES: [&str; 7] = [
    "Cognitive load high. Focus breathing.",
    "System suggests hydration in T-minus 10m.",
    "Stability trending down. Advise caution.",
    "You are operating at peak efficiency, Ranger.",
    "Neural patterns indicate mild stress. Compensating.",
    "Next capsule dose window opening soon.",
    "Telemetry sync with HQ established.",
];

pub const ADVISORY_INITIAL: &str = "System initialized. Monitoring neural link.";
pub const ADVISORY_DOSE: &str = "Capsule metabolized. Neural alignment stabilizing.";
pub const ADVISORY_SYMPTOM: &str = "Symptom logged. Adjusting predictive models.";
pub const ADVISORY_SYMPTOM_SEVERE: &str =
    "WARNING: High stress detected. Counter-measures required.";

pub const LABEL_AUTO_INJECT: &str = "AUTO-INJECT: STABILIZER";
pub const LABEL_SYSTEM_SCAN: &str = "SYSTEM SCAN COMPLETE";
pub const LABEL_STATE_RECOVERY: &str = "STATE RECOVERY";
pub const LABEL_ALERT_RESOLVED: &str = "ALERT RESOLVED";
pub const ALERT_TITLE_CRITICAL_VITALS: &str = "CRITICAL VITALS";
pub const ALERT_TITLE_BIO_SPIKE: &str = "CRITICAL BIO-SPIKE";
