//! Scheduling clocks and the engine loop thread.
//!
//! The scan loop runs on a dedicated OS thread. External command requests
//! are serialised onto the loop: they execute before step 1 of the next
//! tick. Ticks are scheduled at a fixed period; an overrunning tick causes
//! the next firing to be skipped, never overlapped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use indexmap::IndexMap;
use pandaura_syntax::ast::Program;
use parking_lot::Mutex as StateMutex;
use smol_str::SmolStr;

use crate::engine::{CycleReport, EngineAlert, EngineStatus, FaultConfig, ScanEngine};
use crate::error::RuntimeError;
use crate::events::TagEvent;
use crate::value::Value;

/// Clock interface for loop scheduling.
pub trait Clock: Send + Sync + 'static {
    /// Current time in epoch milliseconds.
    fn now_ms(&self) -> i64;

    /// Sleep until the given deadline.
    fn sleep_until(&self, deadline_ms: i64);

    /// Wake any sleepers (best-effort).
    fn wake(&self) {
        // Default: no-op for clocks without a wait mechanism.
    }
}

/// Monotonic clock based on `std::time::Instant`, anchored at an epoch
/// offset so timestamps read as wall-clock milliseconds.
#[derive(Debug, Clone)]
pub struct StdClock {
    start: std::time::Instant,
    epoch_ms: i64,
}

impl StdClock {
    #[allow(missing_docs)]
    #[must_use]
    pub fn new() -> Self {
        let epoch_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        Self {
            start: std::time::Instant::now(),
            epoch_ms,
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    fn now_ms(&self) -> i64 {
        self.epoch_ms + self.start.elapsed().as_millis() as i64
    }

    fn sleep_until(&self, deadline_ms: i64) {
        let delta = deadline_ms - self.now_ms();
        if delta > 0 {
            thread::sleep(std::time::Duration::from_millis(delta as u64));
        }
    }
}

#[derive(Debug)]
struct ManualClockState {
    now_ms: i64,
    sleep_calls: u64,
    interrupted: bool,
}

/// Deterministic clock for tests; time advances only when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    inner: Arc<(Mutex<ManualClockState>, Condvar)>,
}

impl ManualClock {
    #[allow(missing_docs)]
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new((
                Mutex::new(ManualClockState {
                    now_ms: 0,
                    sleep_calls: 0,
                    interrupted: false,
                }),
                Condvar::new(),
            )),
        }
    }

    /// Advance time by `delta_ms` and wake sleepers.
    pub fn advance(&self, delta_ms: i64) -> i64 {
        let (lock, cvar) = &*self.inner;
        let mut state = lock.lock().expect("manual clock lock poisoned");
        state.now_ms += delta_ms;
        cvar.notify_all();
        state.now_ms
    }

    /// Set the time explicitly.
    pub fn set_time(&self, now_ms: i64) {
        let (lock, cvar) = &*self.inner;
        let mut state = lock.lock().expect("manual clock lock poisoned");
        state.now_ms = now_ms;
        cvar.notify_all();
    }

    /// Number of sleep calls issued against this clock.
    #[must_use]
    pub fn sleep_calls(&self) -> u64 {
        let (lock, _) = &*self.inner;
        lock.lock().expect("manual clock lock poisoned").sleep_calls
    }

    /// Interrupt sleepers so they can exit.
    pub fn interrupt(&self) {
        let (lock, cvar) = &*self.inner;
        let mut state = lock.lock().expect("manual clock lock poisoned");
        state.interrupted = true;
        cvar.notify_all();
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        let (lock, _) = &*self.inner;
        lock.lock().expect("manual clock lock poisoned").now_ms
    }

    fn sleep_until(&self, deadline_ms: i64) {
        let (lock, cvar) = &*self.inner;
        let mut state = lock.lock().expect("manual clock lock poisoned");
        state.sleep_calls += 1;
        while !state.interrupted && state.now_ms < deadline_ms {
            state = cvar.wait(state).expect("manual clock wait poisoned");
        }
        // Interrupts are one-shot so a woken loop can sleep again.
        state.interrupted = false;
    }

    fn wake(&self) {
        self.interrupt();
    }
}

/// Engine execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    #[allow(missing_docs)]
    #[default]
    Boot,
    #[allow(missing_docs)]
    Running,
    #[allow(missing_docs)]
    Paused,
    #[allow(missing_docs)]
    Stopped,
    #[allow(missing_docs)]
    Faulted,
}

/// Commands serialised onto the scan loop.
pub enum EngineCommand {
    /// Write a variable (outputs go via the latency outbox).
    WriteVariable {
        #[allow(missing_docs)]
        name: SmolStr,
        #[allow(missing_docs)]
        value: Value,
    },
    /// Schedule a fault injection.
    InjectFault(FaultConfig),
    /// Remove a fault by target.
    RemoveFault(SmolStr),
    /// Suspend scheduling without tearing the loop down.
    Pause,
    /// Resume from the next period.
    Resume,
    /// Run exactly one cycle and report.
    Step {
        #[allow(missing_docs)]
        respond_to: mpsc::Sender<Result<CycleReport, RuntimeError>>,
    },
    /// Tear down cells and re-evaluate initialisers.
    Reset,
    /// Snapshot all variables.
    Snapshot {
        #[allow(missing_docs)]
        respond_to: mpsc::Sender<IndexMap<SmolStr, Value>>,
    },
    /// Read one variable.
    ReadVariable {
        #[allow(missing_docs)]
        name: SmolStr,
        #[allow(missing_docs)]
        respond_to: mpsc::Sender<Option<Value>>,
    },
    /// Engine status snapshot.
    Status {
        #[allow(missing_docs)]
        respond_to: mpsc::Sender<EngineStatus>,
    },
    /// Register a tag subscriber.
    Subscribe {
        #[allow(missing_docs)]
        tags: Vec<SmolStr>,
        #[allow(missing_docs)]
        respond_to: mpsc::Sender<mpsc::Receiver<TagEvent>>,
    },
    /// Drain background alerts.
    TakeAlerts {
        #[allow(missing_docs)]
        respond_to: mpsc::Sender<Vec<EngineAlert>>,
    },
    /// Replace the active program.
    SwapProgram {
        #[allow(missing_docs)]
        program: Program,
        #[allow(missing_docs)]
        respond_to: mpsc::Sender<Result<(), RuntimeError>>,
    },
}

/// Drives a [`ScanEngine`] with a scheduling clock.
pub struct EngineRunner<C: Clock + Clone> {
    engine: ScanEngine,
    clock: C,
}

impl<C: Clock + Clone> EngineRunner<C> {
    #[allow(missing_docs)]
    #[must_use]
    pub fn new(engine: ScanEngine, clock: C) -> Self {
        Self { engine, clock }
    }

    /// Access the underlying engine (single-threaded harness use).
    #[must_use]
    pub fn engine(&self) -> &ScanEngine {
        &self.engine
    }

    /// Mutate the underlying engine (single-threaded harness use).
    pub fn engine_mut(&mut self) -> &mut ScanEngine {
        &mut self.engine
    }

    /// Execute one cycle at the current clock time.
    pub fn tick(&mut self) -> Result<CycleReport, RuntimeError> {
        let now = self.clock.now_ms();
        self.engine.execute_cycle(now)
    }

    /// Spawn the loop in a dedicated OS thread.
    pub fn spawn(self, name: impl Into<String>) -> Result<EngineHandle<C>, RuntimeError> {
        let stop = Arc::new(AtomicBool::new(false));
        let state = Arc::new(StateMutex::new(EngineState::Boot));
        let last_error = Arc::new(StateMutex::new(None));
        let clock = self.clock.clone();
        let (cmd_tx, cmd_rx) = mpsc::channel();

        let stop_thread = stop.clone();
        let state_thread = state.clone();
        let last_error_thread = last_error.clone();

        let builder = thread::Builder::new().name(name.into());
        let join = builder
            .spawn(move || {
                run_engine_loop(self, cmd_rx, stop_thread, state_thread, last_error_thread);
            })
            .map_err(|err| RuntimeError::ControlError(err.to_string().into()))?;

        Ok(EngineHandle {
            stop,
            state,
            last_error,
            clock,
            cmd_tx,
            join: Some(join),
        })
    }
}

fn run_engine_loop<C: Clock + Clone>(
    mut runner: EngineRunner<C>,
    commands: mpsc::Receiver<EngineCommand>,
    stop: Arc<AtomicBool>,
    state: Arc<StateMutex<EngineState>>,
    last_error: Arc<StateMutex<Option<RuntimeError>>>,
) {
    let mut paused = false;
    *state.lock() = EngineState::Running;
    loop {
        if stop.load(Ordering::SeqCst) {
            *state.lock() = EngineState::Stopped;
            break;
        }

        while let Ok(command) = commands.try_recv() {
            match command {
                EngineCommand::Pause => {
                    paused = true;
                    *state.lock() = EngineState::Paused;
                }
                EngineCommand::Resume => {
                    paused = false;
                    *state.lock() = EngineState::Running;
                }
                other => apply_engine_command(&mut runner, other),
            }
        }

        let interval = runner.engine.config().scan_time_ms.max(1);
        if paused {
            let deadline = runner.clock.now_ms() + interval;
            runner.clock.sleep_until(deadline);
            continue;
        }

        let now = runner.clock.now_ms();
        let result = runner.engine.execute_cycle(now);
        if let Err(err) = result {
            *last_error.lock() = Some(err);
            *state.lock() = EngineState::Faulted;
            break;
        }

        // Overrun ticks skip the next firing rather than overlapping it.
        let deadline = now + interval;
        if runner.clock.now_ms() < deadline {
            runner.clock.sleep_until(deadline);
        }
    }
}

fn apply_engine_command<C: Clock + Clone>(runner: &mut EngineRunner<C>, command: EngineCommand) {
    let now = runner.clock.now_ms();
    match command {
        EngineCommand::Pause | EngineCommand::Resume => {}
        EngineCommand::WriteVariable { name, value } => {
            let _ = runner.engine.write_variable(&name, value, now);
        }
        EngineCommand::InjectFault(config) => {
            let _ = runner.engine.inject_fault(config, now);
        }
        EngineCommand::RemoveFault(target) => {
            let _ = runner.engine.remove_fault(&target, now);
        }
        EngineCommand::Step { respond_to } => {
            let _ = respond_to.send(runner.engine.execute_cycle(now));
        }
        EngineCommand::Reset => {
            let _ = runner.engine.reset(now);
        }
        EngineCommand::Snapshot { respond_to } => {
            let _ = respond_to.send(runner.engine.snapshot_variables());
        }
        EngineCommand::ReadVariable { name, respond_to } => {
            let _ = respond_to.send(runner.engine.read_variable(&name));
        }
        EngineCommand::Status { respond_to } => {
            let _ = respond_to.send(runner.engine.status());
        }
        EngineCommand::Subscribe { tags, respond_to } => {
            let _ = respond_to.send(runner.engine.subscribe(tags));
        }
        EngineCommand::TakeAlerts { respond_to } => {
            let _ = respond_to.send(runner.engine.take_alerts());
        }
        EngineCommand::SwapProgram {
            program,
            respond_to,
        } => {
            let _ = respond_to.send(runner.engine.swap_program(program, now));
        }
    }
}

/// Handle to a running engine thread.
pub struct EngineHandle<C: Clock + Clone> {
    stop: Arc<AtomicBool>,
    state: Arc<StateMutex<EngineState>>,
    last_error: Arc<StateMutex<Option<RuntimeError>>>,
    clock: C,
    cmd_tx: mpsc::Sender<EngineCommand>,
    join: Option<thread::JoinHandle<()>>,
}

impl<C: Clock + Clone> EngineHandle<C> {
    /// Cloneable control handle.
    #[must_use]
    pub fn control(&self) -> EngineControl<C> {
        EngineControl {
            stop: self.stop.clone(),
            state: self.state.clone(),
            last_error: self.last_error.clone(),
            clock: self.clock.clone(),
            cmd_tx: self.cmd_tx.clone(),
        }
    }

    /// Signal the loop to stop at the next tick boundary.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        self.clock.wake();
    }

    /// Current loop state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        *self.state.lock()
    }

    /// Last error if the loop faulted.
    #[must_use]
    pub fn last_error(&self) -> Option<RuntimeError> {
        self.last_error.lock().clone()
    }

    /// Join the loop thread.
    pub fn join(&mut self) -> thread::Result<()> {
        if let Some(join) = self.join.take() {
            return join.join();
        }
        Ok(())
    }
}

/// Lightweight control handle, safe to share with command surfaces.
#[derive(Clone)]
pub struct EngineControl<C: Clock + Clone> {
    stop: Arc<AtomicBool>,
    state: Arc<StateMutex<EngineState>>,
    last_error: Arc<StateMutex<Option<RuntimeError>>>,
    clock: C,
    cmd_tx: mpsc::Sender<EngineCommand>,
}

impl<C: Clock + Clone> EngineControl<C> {
    fn send(&self, command: EngineCommand) -> Result<(), RuntimeError> {
        self.cmd_tx
            .send(command)
            .map_err(|_| RuntimeError::ControlError("command channel closed".into()))
    }

    fn request<T>(
        &self,
        make: impl FnOnce(mpsc::Sender<T>) -> EngineCommand,
    ) -> Result<T, RuntimeError> {
        let (tx, rx) = mpsc::channel();
        self.send(make(tx))?;
        rx.recv()
            .map_err(|_| RuntimeError::ControlError("engine stopped before responding".into()))
    }

    /// Write a variable (serialised before the next tick).
    pub fn write_variable(&self, name: impl Into<SmolStr>, value: Value) -> Result<(), RuntimeError> {
        self.send(EngineCommand::WriteVariable {
            name: name.into(),
            value,
        })
    }

    /// Schedule a fault injection.
    pub fn inject_fault(&self, config: FaultConfig) -> Result<(), RuntimeError> {
        self.send(EngineCommand::InjectFault(config))
    }

    /// Remove a fault by target tag.
    pub fn remove_fault(&self, target: impl Into<SmolStr>) -> Result<(), RuntimeError> {
        self.send(EngineCommand::RemoveFault(target.into()))
    }

    /// Suspend the loop.
    pub fn pause(&self) -> Result<(), RuntimeError> {
        self.send(EngineCommand::Pause)?;
        self.clock.wake();
        Ok(())
    }

    /// Resume the loop.
    pub fn resume(&self) -> Result<(), RuntimeError> {
        self.send(EngineCommand::Resume)?;
        self.clock.wake();
        Ok(())
    }

    /// Run exactly one cycle and return its report.
    pub fn step(&self) -> Result<CycleReport, RuntimeError> {
        self.request(|tx| EngineCommand::Step { respond_to: tx })?
    }

    /// Tear down cells and re-evaluate initialisers.
    pub fn reset(&self) -> Result<(), RuntimeError> {
        self.send(EngineCommand::Reset)
    }

    /// Snapshot all variables.
    pub fn snapshot(&self) -> Result<IndexMap<SmolStr, Value>, RuntimeError> {
        self.request(|tx| EngineCommand::Snapshot { respond_to: tx })
    }

    /// Read one variable.
    pub fn read_variable(&self, name: impl Into<SmolStr>) -> Result<Option<Value>, RuntimeError> {
        let name = name.into();
        self.request(|tx| EngineCommand::ReadVariable {
            name,
            respond_to: tx,
        })
    }

    /// Engine status snapshot.
    pub fn status(&self) -> Result<EngineStatus, RuntimeError> {
        self.request(|tx| EngineCommand::Status { respond_to: tx })
    }

    /// Register a tag subscriber; empty filter receives all tags.
    pub fn subscribe(&self, tags: Vec<SmolStr>) -> Result<mpsc::Receiver<TagEvent>, RuntimeError> {
        self.request(|tx| EngineCommand::Subscribe {
            tags,
            respond_to: tx,
        })
    }

    /// Drain background alerts.
    pub fn take_alerts(&self) -> Result<Vec<EngineAlert>, RuntimeError> {
        self.request(|tx| EngineCommand::TakeAlerts { respond_to: tx })
    }

    /// Replace the active program.
    pub fn swap_program(&self, program: Program) -> Result<(), RuntimeError> {
        self.request(|tx| EngineCommand::SwapProgram {
            program,
            respond_to: tx,
        })?
    }

    /// Signal the loop to stop at the next tick boundary.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        self.clock.wake();
    }

    /// Current loop state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        *self.state.lock()
    }

    /// Last error if the loop faulted.
    #[must_use]
    pub fn last_error(&self) -> Option<RuntimeError> {
        self.last_error.lock().clone()
    }
}
