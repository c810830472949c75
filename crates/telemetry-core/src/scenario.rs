use contracts::Scenario;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Peak-to-peak width of the per-tick stability noise.
    pub volatility: f64,
    /// Constant per-tick stability drift.
    pub bias: f64,
    /// Probability in `[0, 1]` that a tick synthesizes an event.
    pub event_chance: f64,
    /// Upper bound for synthesized symptom severity.
    pub max_severity: u8,
}

const CALM: ScenarioConfig = ScenarioConfig {
    volatility: 0.2,
    bias: 0.05,
    event_chance: 0.02,
    max_severity: 3,
};

const NORMAL: ScenarioConfig = ScenarioConfig {
    volatility: 0.8,
    bias: 0.0,
    event_chance: 0.05,
    max_severity: 6,
};

const AGGRESSIVE: ScenarioConfig = ScenarioConfig {
    volatility: 2.5,
    bias: -0.15,
    event_chance: 0.12,
    max_severity: 9,
};

const UNSTABLE: ScenarioConfig = ScenarioConfig {
    volatility: 5.0,
    bias: -0.4,
    event_chance: 0.25,
    max_severity: 10,
};

pub fn scenario_config(scenario: Scenario) -> &'static ScenarioConfig {
    match scenario {
        Scenario::Calm => &CALM,
        Scenario::Normal => &NORMAL,
        Scenario::Aggressive => &AGGRESSIVE,
        Scenario::Unstable => &UNSTABLE,
    }
}

pub fn parse_scenario(raw: &str) -> Result<Scenario, ValidationError> {
    let normalized = raw.trim().to_ascii_lowercase();
    Scenario::ALL
        .into_iter()
        .find(|scenario| scenario.as_str() == normalized)
        .ok_or_else(|| ValidationError::UnknownScenario(raw.to_string()))
}

/// Homeostatic pull applied every tick. Empirical constants, kept tunable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GravityConfig {
    pub upper_threshold: f64,
    pub upper_pull: f64,
    pub lower_threshold: f64,
    pub lower_pull: f64,
}

impl GravityConfig {
    pub const DEFAULT: GravityConfig = GravityConfig {
        upper_threshold: 80.0,
        upper_pull: 0.05,
        lower_threshold: 40.0,
        lower_pull: -0.1,
    };

    pub fn pull(&self, stability: f64) -> f64 {
        if stability > self.upper_threshold {
            self.upper_pull
        } else if stability < self.lower_threshold {
            self.lower_pull
        } else {
            0.0
        }
    }
}

impl Default for GravityConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
