use std::time::Duration;

use contracts::{Scenario, SimSpeed, DEFAULT_TIMELINE_CAPACITY};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use telemetry_core::state::DEFAULT_MAX_TICK_DRIFT;
use telemetry_core::validate::parse_speed;
use telemetry_core::{parse_scenario, GravityConfig, StateSettings};
use tracing::warn;

pub const DEFAULT_PERSIST_DEBOUNCE_MS: u64 = 1_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Drawn from the clock at construction when absent.
    #[serde(serialize_with = "serialize_seed", deserialize_with = "deserialize_seed")]
    pub seed: Option<u64>,
    pub scenario: Scenario,
    pub speed: SimSpeed,
    pub persist_debounce_ms: u64,
    pub timeline_capacity: usize,
    pub max_tick_drift: f64,
    pub gravity: GravityConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: None,
            scenario: Scenario::Normal,
            speed: SimSpeed::X1,
            persist_debounce_ms: DEFAULT_PERSIST_DEBOUNCE_MS,
            timeline_capacity: DEFAULT_TIMELINE_CAPACITY,
            max_tick_drift: DEFAULT_MAX_TICK_DRIFT,
            gravity: GravityConfig::DEFAULT,
        }
    }
}

impl EngineConfig {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// Parse host-supplied JSON, keeping every valid field and falling back
    /// to the default for each field that does not validate.
    pub fn from_json_lenient(raw: &str) -> Self {
        let value = match serde_json::from_str::<Value>(raw) {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "engine config is not valid json; using defaults");
                return Self::default();
            }
        };
        let Some(object) = value.as_object() else {
            warn!("engine config is not a json object; using defaults");
            return Self::default();
        };

        let mut config = Self::default();
        if let Some(seed) = field(object, "seed", seed_from_value) {
            config.seed = seed;
        }
        if let Some(scenario) = field(object, "scenario", |value| {
            value.as_str().and_then(|raw| parse_scenario(raw).ok())
        }) {
            config.scenario = scenario;
        }
        if let Some(speed) = field(object, "speed", |value| {
            value.as_i64().and_then(|raw| parse_speed(raw).ok())
        }) {
            config.speed = speed;
        }
        if let Some(debounce) = field(object, "persist_debounce_ms", Value::as_u64) {
            config.persist_debounce_ms = debounce;
        }
        if let Some(capacity) = field(object, "timeline_capacity", |value| {
            value
                .as_u64()
                .filter(|capacity| *capacity >= 1)
                .and_then(|capacity| usize::try_from(capacity).ok())
        }) {
            config.timeline_capacity = capacity;
        }
        if let Some(drift) = field(object, "max_tick_drift", |value| {
            value
                .as_f64()
                .filter(|drift| drift.is_finite() && *drift >= 0.0)
        }) {
            config.max_tick_drift = drift;
        }
        if let Some(gravity) = field(object, "gravity", |value| {
            serde_json::from_value::<GravityConfig>(value.clone()).ok()
        }) {
            config.gravity = gravity;
        }
        config
    }

    pub fn state_settings(&self) -> StateSettings {
        StateSettings {
            timeline_capacity: self.timeline_capacity,
            max_tick_drift: self.max_tick_drift,
            gravity: self.gravity,
        }
    }

    pub fn persist_debounce(&self) -> Duration {
        Duration::from_millis(self.persist_debounce_ms)
    }
}

fn field<T>(
    object: &Map<String, Value>,
    name: &str,
    parse: impl FnOnce(&Value) -> Option<T>,
) -> Option<T> {
    let value = object.get(name)?;
    let parsed = parse(value);
    if parsed.is_none() {
        warn!(field = name, value = %value, "invalid engine config field; using default");
    }
    parsed
}

/// `null` clears the seed; anything else must be a non-negative integer.
fn seed_from_value(value: &Value) -> Option<Option<u64>> {
    match value {
        Value::Null => Some(None),
        Value::Number(number) => number.as_u64().map(Some),
        Value::String(raw) => raw.trim().parse::<u64>().ok().map(Some),
        _ => None,
    }
}

#[derive(Deserialize)]
struct SeedField(#[serde(with = "contracts::seed_string")] u64);

fn serialize_seed<S: Serializer>(seed: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
    match seed {
        Some(seed) => serializer.collect_str(seed),
        None => serializer.serialize_none(),
    }
}

fn deserialize_seed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    Ok(Option::<SeedField>::deserialize(deserializer)?.map(|field| field.0))
}
