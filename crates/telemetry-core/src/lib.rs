//! Deterministic telemetry engine: seeded PRNG, scenario physics, history
//! aggregation, tick synthesis and the owned simulation state.

pub mod clock;
pub mod error;
pub mod forecast;
pub mod lexicon;
pub mod metrics;
pub mod rng;
pub mod scenario;
pub mod state;
pub mod tick;
pub mod timeline;
pub mod validate;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::ValidationError;
pub use forecast::{
    full_forecast, light_forecast, ForecastFeatures, FULL_MODEL_VERSION, LIGHT_MODEL_VERSION,
};
pub use metrics::{baseline_metrics, compute_metrics};
pub use rng::SeededRng;
pub use scenario::{parse_scenario, scenario_config, GravityConfig, ScenarioConfig};
pub use state::{SimulationState, StateSettings, SymptomRecorded, TickReport};
pub use tick::{generate_tick_update, TickEvent, TickUpdate};
pub use timeline::Timeline;
