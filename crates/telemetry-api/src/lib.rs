//! Embeddable orchestrator around the telemetry engine: one mutex-guarded
//! state owner, a cancellable tokio tick timer, payload validation and
//! debounced snapshot persistence.

mod config;
mod debounce;
mod error;
mod persistence;
mod ticker;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use contracts::{
    AlertSeverity, CapsuleType, CommandOutcome, CommandPayload, DetailedForecast, DoseRecord,
    ExportDocument, MetricsSnapshot, PersistedState, RiskForecast, Scenario, SimSpeed, Snapshot,
    SCHEMA_VERSION_V1,
};
use parking_lot::Mutex;
use telemetry_core::validate::{parse_capsule_type, parse_speed, validate_severity};
use telemetry_core::{
    parse_scenario, Clock, SimulationState, SymptomRecorded, SystemClock, TickReport,
    ValidationError,
};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub use config::{EngineConfig, DEFAULT_PERSIST_DEBOUNCE_MS};
pub use debounce::DebouncedSaver;
pub use error::{EngineError, PersistenceError};
pub use persistence::{MemorySnapshotStore, SnapshotSink, SqliteSnapshotStore};

#[derive(Debug)]
struct Shared {
    state: SimulationState,
    saver: Option<DebouncedSaver>,
    runtime: Option<Handle>,
    /// Bumped whenever the running timer is cancelled or replaced.
    timer_generation: u64,
    ticker: Option<JoinHandle<()>>,
    last_persistence_error: Option<String>,
}

#[derive(Debug)]
pub(crate) struct Inner {
    shared: Mutex<Shared>,
    clock: Arc<dyn Clock>,
}

impl Inner {
    /// Called by the timer task. Returns false once the timer is stale.
    pub(crate) fn tick_if_current(self: &Arc<Self>, generation: u64) -> bool {
        let mut shared = self.shared.lock();
        if shared.timer_generation != generation || !shared.state.is_running() {
            return false;
        }
        self.advance(&mut shared);
        true
    }

    fn advance(self: &Arc<Self>, shared: &mut Shared) -> TickReport {
        let report = shared.state.advance_tick(self.clock.now_ms());
        if let Some(alert_id) = &report.alert_id {
            debug!(tick = report.tick, alert_id = %alert_id, "tick raised critical alert");
        }
        self.persist_later(shared);
        report
    }

    fn cancel_timer(&self, shared: &mut Shared) {
        shared.timer_generation = shared.timer_generation.wrapping_add(1);
        if let Some(ticker) = shared.ticker.take() {
            ticker.abort();
        }
    }

    fn restart_timer(self: &Arc<Self>, runtime: &Handle, shared: &mut Shared) {
        self.cancel_timer(shared);
        let period = Duration::from_millis(shared.state.speed().interval_ms());
        shared.ticker = Some(ticker::spawn(
            runtime,
            Arc::downgrade(self),
            shared.timer_generation,
            period,
        ));
    }

    /// Mark the state dirty. The change that opens a batch schedules the one
    /// delayed write for it. Outside a runtime the write waits for an
    /// explicit flush.
    fn persist_later(self: &Arc<Self>, shared: &mut Shared) {
        let runtime = Handle::try_current().ok().or_else(|| shared.runtime.clone());
        let Some(saver) = shared.saver.as_mut() else {
            return;
        };
        let Some(generation) = saver.mark_dirty() else {
            return;
        };
        let window = saver.window();
        let Some(runtime) = runtime else {
            return;
        };
        let inner = Arc::downgrade(self);
        runtime.spawn(async move {
            tokio::time::sleep(window).await;
            if let Some(inner) = inner.upgrade() {
                inner.write_if_due(generation);
            }
        });
    }

    fn write_if_due(&self, generation: u64) {
        let mut shared = self.shared.lock();
        let due = shared
            .saver
            .as_ref()
            .is_some_and(|saver| saver.is_due(generation));
        if due {
            // Failures are recorded on the shared state; the timer task has no caller to return to.
            let _ = self.write_now(&mut shared);
        }
    }

    fn write_now(&self, shared: &mut Shared) -> Result<bool, PersistenceError> {
        let Some(saver) = shared.saver.as_mut() else {
            return Err(PersistenceError::NotAttached);
        };
        let persisted = shared.state.to_persisted(self.clock.now_ms());
        match saver.flush(&persisted) {
            Ok(written) => {
                shared.last_persistence_error = None;
                Ok(written)
            }
            Err(err) => {
                error!(error = %err, "snapshot write failed");
                shared.last_persistence_error = Some(err.to_string());
                Err(err)
            }
        }
    }
}

#[derive(Debug)]
pub struct Orchestrator {
    inner: Arc<Inner>,
    config: EngineConfig,
}

impl Orchestrator {
    pub fn new(seed: Option<u64>) -> Self {
        Self::from_config(EngineConfig {
            seed,
            ..EngineConfig::default()
        })
    }

    pub fn from_config(config: EngineConfig) -> Self {
        Self::with_parts(config, None, Arc::new(SystemClock))
    }

    pub fn with_sink(config: EngineConfig, sink: impl SnapshotSink + 'static) -> Self {
        Self::with_parts(config, Some(Box::new(sink)), Arc::new(SystemClock))
    }

    pub fn open_sqlite(config: EngineConfig, path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let store = SqliteSnapshotStore::open(path)?;
        Ok(Self::with_sink(config, store))
    }

    /// Build with an explicit sink and clock. A sink is loaded exactly once,
    /// here; unreadable state falls back to a fresh session.
    pub fn with_parts(
        config: EngineConfig,
        sink: Option<Box<dyn SnapshotSink>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut saver = sink.map(|sink| DebouncedSaver::new(sink, config.persist_debounce()));
        let state = restore_state(&config, saver.as_mut(), clock.as_ref());
        info!(
            seed = state.seed(),
            scenario = %state.scenario(),
            restored_tick = state.tick(),
            persistent = saver.is_some(),
            "orchestrator ready"
        );

        let shared = Shared {
            state,
            saver,
            runtime: Handle::try_current().ok(),
            timer_generation: 0,
            ticker: None,
            last_persistence_error: None,
        };
        Self {
            inner: Arc::new(Inner {
                shared: Mutex::new(shared),
                clock,
            }),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Begin ticking every `1000ms / speed`. Calling again replaces the
    /// running timer instead of adding a second one.
    pub fn start(&self, speed: SimSpeed) -> Result<(), EngineError> {
        let runtime = Handle::try_current().map_err(|_| EngineError::NoRuntime)?;
        let mut shared = self.inner.shared.lock();
        shared.runtime = Some(runtime.clone());
        shared.state.set_speed(speed);
        shared.state.set_running(true);
        self.inner.restart_timer(&runtime, &mut shared);
        info!(speed = speed.factor(), scenario = %shared.state.scenario(), "simulation started");
        self.inner.persist_later(&mut shared);
        Ok(())
    }

    pub fn pause(&self) {
        let mut shared = self.inner.shared.lock();
        self.inner.cancel_timer(&mut shared);
        if shared.state.is_running() {
            shared.state.set_running(false);
            info!(tick = shared.state.tick(), "simulation paused");
            self.inner.persist_later(&mut shared);
        }
    }

    /// Stop, discard all history and re-seed from the clock.
    pub fn reset(&self) {
        let seed = u64::try_from(self.inner.clock.now_ms()).unwrap_or_default();
        self.reset_with_seed(seed);
    }

    pub fn reset_with_seed(&self, seed: u64) {
        let mut shared = self.inner.shared.lock();
        self.inner.cancel_timer(&mut shared);
        shared.state.reset(seed);
        info!(seed, "simulation reset");
        self.inner.persist_later(&mut shared);
    }

    pub fn set_scenario(&self, scenario: Scenario) {
        let mut shared = self.inner.shared.lock();
        if shared.state.scenario() == scenario {
            return;
        }
        shared.state.set_scenario(scenario);
        info!(scenario = %scenario, "scenario changed");
        self.inner.persist_later(&mut shared);
    }

    /// A running timer restarts at the new interval; state is untouched.
    pub fn set_speed(&self, speed: SimSpeed) {
        let mut shared = self.inner.shared.lock();
        if shared.state.speed() == speed {
            return;
        }
        shared.state.set_speed(speed);
        if shared.state.is_running() {
            let runtime = Handle::try_current().ok().or_else(|| shared.runtime.clone());
            if let Some(runtime) = runtime {
                self.inner.restart_timer(&runtime, &mut shared);
            }
        }
        info!(speed = speed.factor(), running = shared.state.is_running(), "speed changed");
        self.inner.persist_later(&mut shared);
    }

    pub fn add_dose(&self, capsule_type: CapsuleType, amount: f64) -> Result<DoseRecord, EngineError> {
        let mut shared = self.inner.shared.lock();
        let dose = shared
            .state
            .record_dose(capsule_type, amount, self.inner.clock.now_ms())
            .map_err(|err| rejected("add_dose", err))?;
        self.inner.persist_later(&mut shared);
        Ok(dose)
    }

    pub fn add_symptom(
        &self,
        label: &str,
        severity: u8,
        notes: Option<String>,
    ) -> Result<SymptomRecorded, EngineError> {
        let mut shared = self.inner.shared.lock();
        let recorded = shared
            .state
            .record_symptom(label, severity, notes, self.inner.clock.now_ms())
            .map_err(|err| rejected("add_symptom", err))?;
        self.inner.persist_later(&mut shared);
        Ok(recorded)
    }

    pub fn raise_alert(
        &self,
        title: &str,
        message: &str,
        severity: AlertSeverity,
    ) -> Result<String, EngineError> {
        let mut shared = self.inner.shared.lock();
        let alert_id = shared
            .state
            .raise_alert(title, message, severity, self.inner.clock.now_ms())
            .map_err(|err| rejected("raise_alert", err))?;
        self.inner.persist_later(&mut shared);
        Ok(alert_id)
    }

    /// Unknown ids and disallowed transitions are no-ops and return false.
    pub fn acknowledge_alert(&self, alert_id: &str) -> bool {
        let mut shared = self.inner.shared.lock();
        let changed = shared.state.acknowledge_alert(alert_id);
        if changed {
            self.inner.persist_later(&mut shared);
        }
        changed
    }

    pub fn resolve_alert(&self, alert_id: &str) -> bool {
        let mut shared = self.inner.shared.lock();
        let changed = shared
            .state
            .resolve_alert(alert_id, self.inner.clock.now_ms());
        if changed {
            self.inner.persist_later(&mut shared);
        }
        changed
    }

    /// Validate and dispatch a raw host payload.
    pub fn apply(&self, payload: CommandPayload) -> Result<CommandOutcome, EngineError> {
        match payload {
            CommandPayload::AddDose {
                capsule_type,
                amount,
            } => {
                let capsule =
                    parse_capsule_type(&capsule_type).map_err(|err| rejected("add_dose", err))?;
                let dose = self.add_dose(capsule, amount)?;
                Ok(CommandOutcome::DoseRecorded { dose_id: dose.id })
            }
            CommandPayload::AddSymptom {
                label,
                severity,
                notes,
            } => {
                let severity = severity
                    .ok_or(ValidationError::MissingSeverity)
                    .and_then(validate_severity)
                    .map_err(|err| rejected("add_symptom", err))?;
                let recorded = self.add_symptom(&label, severity, notes)?;
                Ok(CommandOutcome::SymptomRecorded {
                    symptom_id: recorded.symptom_id,
                    alert_id: recorded.alert_id,
                })
            }
            CommandPayload::RaiseAlert {
                title,
                message,
                severity,
            } => {
                let alert_id = self.raise_alert(&title, &message, severity)?;
                Ok(CommandOutcome::AlertRaised { alert_id })
            }
            CommandPayload::AcknowledgeAlert { alert_id } => {
                let changed = self.acknowledge_alert(&alert_id);
                Ok(CommandOutcome::AlertUpdated { alert_id, changed })
            }
            CommandPayload::ResolveAlert { alert_id } => {
                let changed = self.resolve_alert(&alert_id);
                Ok(CommandOutcome::AlertUpdated { alert_id, changed })
            }
            CommandPayload::SetScenario { scenario } => {
                let scenario =
                    parse_scenario(&scenario).map_err(|err| rejected("set_scenario", err))?;
                self.set_scenario(scenario);
                Ok(CommandOutcome::ScenarioChanged { scenario })
            }
            CommandPayload::SetSpeed { speed } => {
                let speed = parse_speed(speed).map_err(|err| rejected("set_speed", err))?;
                self.set_speed(speed);
                Ok(CommandOutcome::SpeedChanged { speed })
            }
        }
    }

    /// Advance one tick synchronously, whether or not the timer is running.
    pub fn step(&self) -> TickReport {
        let mut shared = self.inner.shared.lock();
        self.inner.advance(&mut shared)
    }

    pub fn step_n(&self, steps: u64) -> Vec<TickReport> {
        let mut shared = self.inner.shared.lock();
        (0..steps).map(|_| self.inner.advance(&mut shared)).collect()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.inner.shared.lock().state.snapshot()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        *self.inner.shared.lock().state.metrics()
    }

    pub fn export(&self) -> ExportDocument {
        self.inner.shared.lock().state.export()
    }

    /// Pretty JSON `{metrics, history: {doses, symptoms}, config: {seed, scenario, speed}}`.
    pub fn export_snapshot(&self) -> Result<String, EngineError> {
        serde_json::to_string_pretty(&self.export())
            .map_err(|err| EngineError::Persistence(err.into()))
    }

    pub fn forecast(&self) -> RiskForecast {
        self.inner
            .shared
            .lock()
            .state
            .forecast(self.inner.clock.now_ms())
    }

    pub fn detailed_forecast(&self) -> DetailedForecast {
        self.inner
            .shared
            .lock()
            .state
            .detailed_forecast(self.inner.clock.now_ms())
    }

    pub fn active_alert_count(&self) -> usize {
        self.inner.shared.lock().state.active_alert_count()
    }

    pub fn seed(&self) -> u64 {
        self.inner.shared.lock().state.seed()
    }

    pub fn is_running(&self) -> bool {
        self.inner.shared.lock().state.is_running()
    }

    pub fn last_persistence_error(&self) -> Option<String> {
        self.inner.shared.lock().last_persistence_error.clone()
    }

    /// Write pending changes now instead of waiting out the debounce window.
    pub fn flush(&self) -> Result<(), EngineError> {
        let mut shared = self.inner.shared.lock();
        self.inner.write_now(&mut shared)?;
        Ok(())
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        let mut shared = self.inner.shared.lock();
        self.inner.cancel_timer(&mut shared);
        let dirty = shared.saver.as_ref().is_some_and(DebouncedSaver::is_dirty);
        if dirty {
            // Best effort; a failure is already logged by write_now.
            let _ = self.inner.write_now(&mut shared);
        }
    }
}

fn rejected(operation: &'static str, err: ValidationError) -> EngineError {
    warn!(operation, error = %err, "mutation rejected");
    EngineError::Validation(err)
}

fn restore_state(
    config: &EngineConfig,
    saver: Option<&mut DebouncedSaver>,
    clock: &dyn Clock,
) -> SimulationState {
    let now_ms = clock.now_ms();
    let fresh = || {
        let seed = config
            .seed
            .unwrap_or_else(|| u64::try_from(now_ms).unwrap_or_default());
        SimulationState::new(seed, config.scenario, config.speed, config.state_settings())
    };

    let Some(saver) = saver else {
        return fresh();
    };
    let failure = match saver.load() {
        Ok(None) => return fresh(),
        Ok(Some(raw)) => match decode_persisted(&raw) {
            Ok(persisted) => {
                info!(
                    seed = persisted.seed,
                    tick = persisted.tick,
                    doses = persisted.dose_history.len(),
                    symptoms = persisted.symptom_history.len(),
                    "state restored from sink"
                );
                return SimulationState::from_persisted(persisted, config.state_settings(), now_ms);
            }
            Err(reason) => reason,
        },
        Err(err) => err.to_string(),
    };

    warn!(reason = %failure, "persisted state unusable; starting from defaults");
    let mut state = fresh();
    state.note_state_recovery(&failure, now_ms);
    state
}

fn decode_persisted(raw: &str) -> Result<PersistedState, String> {
    let persisted = serde_json::from_str::<PersistedState>(raw).map_err(|err| err.to_string())?;
    if persisted.schema_version != SCHEMA_VERSION_V1 {
        return Err(format!(
            "unsupported schema_version got={} expected={}",
            persisted.schema_version, SCHEMA_VERSION_V1
        ));
    }
    Ok(persisted)
}
