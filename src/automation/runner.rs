//! Attempt Controller: bounded retries around the recognition pipeline.
//!
//! A run is refused while another is in flight. Recognition and retries are
//! bounded by `attempt_timeout_ms` and can be aborted from any thread. The
//! controller is back in `Idle` when `run` returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::spawn_blocking;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::automation::config::SolverConfig;
use crate::automation::input::InputInjector;
use crate::automation::state::{AttemptStats, ControllerState};
use crate::capture::region::MIN_MANUAL_SIZE;
use crate::capture::source::WindowState;
use crate::error::SolveError;
use crate::ocr::pipeline::Recognizer;

/// A recognized and submitted answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Solved {
    pub text: String,
    pub strategy: String,
    /// 1-based attempt that produced the answer
    pub attempt: u32,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Returns the controller to `Idle` however the run ends.
struct RunningGuard<'a> {
    state: &'a Mutex<ControllerState>,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        *lock(self.state) = ControllerState::Idle;
    }
}

/// Rejects manual-mode configurations whose geometry or points are unset.
pub fn validate(config: &SolverConfig) -> Result<(), SolveError> {
    if !config.capture.manual_area.enabled {
        return Ok(());
    }

    let rect = config.capture.manual_area.rect;
    if rect.width <= MIN_MANUAL_SIZE || rect.height <= MIN_MANUAL_SIZE {
        return Err(SolveError::ConfigurationInvalid(format!(
            "manual area {}x{} must be larger than {}x{}",
            rect.width, rect.height, MIN_MANUAL_SIZE, MIN_MANUAL_SIZE
        )));
    }
    if config.input_point.is_origin() {
        return Err(SolveError::ConfigurationInvalid("input point is not set".to_string()));
    }
    if config.confirm_point.is_origin() {
        return Err(SolveError::ConfigurationInvalid("confirm point is not set".to_string()));
    }
    Ok(())
}

pub struct AttemptController {
    state: Mutex<ControllerState>,
    stats: AttemptStats,
    recognizer: Recognizer,
    injector: Arc<dyn InputInjector>,
    cancel: Mutex<CancellationToken>,
}

impl AttemptController {
    pub fn new(recognizer: Recognizer, injector: Arc<dyn InputInjector>) -> Self {
        Self {
            state: Mutex::new(ControllerState::Idle),
            stats: AttemptStats::default(),
            recognizer,
            injector,
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn state(&self) -> ControllerState {
        *lock(&self.state)
    }

    pub fn stats(&self) -> &AttemptStats {
        &self.stats
    }

    pub fn is_running(&self) -> bool {
        self.state() == ControllerState::Running
    }

    /// Cancels the run in flight, if any. Once an answer is being typed the
    /// run is past the point of cancelling and completes.
    pub fn abort(&self) {
        let state = lock(&self.state);
        if *state == ControllerState::Running {
            info!("Abort requested");
            lock(&self.cancel).cancel();
        }
    }

    /// Enters `Running` and installs a fresh cancellation token under the
    /// same lock, so an abort can never hit the previous run's token.
    fn claim(&self) -> Result<(RunningGuard<'_>, CancellationToken), SolveError> {
        let mut state = lock(&self.state);
        if *state == ControllerState::Running {
            return Err(SolveError::AlreadyRunning);
        }
        *state = ControllerState::Running;

        let token = CancellationToken::new();
        *lock(&self.cancel) = token.clone();
        Ok((RunningGuard { state: &self.state }, token))
    }

    fn transition(&self, next: ControllerState) {
        let mut state = lock(&self.state);
        info!("Controller: {} -> {}", *state, next);
        *state = next;
    }

    /// Runs up to `max_retries` recognition attempts against `window`.
    ///
    /// The time budget and abort cover recognition and the retry delays.
    /// Input injection for a recognized answer always runs to the confirm click.
    pub async fn run(&self, config: &SolverConfig, window: WindowState) -> Result<Solved, SolveError> {
        validate(config)?;
        let (_guard, token) = self.claim()?;

        let pending = AtomicBool::new(false);
        let budget = Duration::from_millis(config.attempt_timeout_ms);
        let recognized = tokio::select! {
            _ = token.cancelled() => Err(SolveError::Aborted),
            result = timeout(budget, self.attempt_loop(config, &window, &pending)) => match result {
                Ok(result) => result,
                Err(_) => {
                    // Only an attempt cut off before its outcome was recorded counts
                    if pending.load(Ordering::SeqCst) {
                        self.stats.record_failure();
                    }
                    Err(SolveError::Timeout { after: budget })
                }
            },
        };

        let outcome = match recognized {
            Ok(solved) => {
                self.inject(config, &window, &solved.text).await;
                self.stats.record_success();
                Ok(solved)
            }
            Err(e) => Err(e),
        };

        match &outcome {
            Ok(solved) => {
                self.transition(ControllerState::Success);
                info!(
                    "Solved {:?} via {} on attempt {} ({})",
                    solved.text, solved.strategy, solved.attempt, self.stats
                );
            }
            Err(e @ SolveError::Exhausted { .. }) => {
                self.transition(ControllerState::ExhaustedRetries);
                warn!("{} ({})", e, self.stats);
            }
            Err(e) => warn!("{} ({})", e, self.stats),
        }
        outcome
    }

    /// Recognition attempts with retry delays. `pending` is set while an
    /// attempt's outcome has not been recorded yet.
    async fn attempt_loop(
        &self,
        config: &SolverConfig,
        window: &WindowState,
        pending: &AtomicBool,
    ) -> Result<Solved, SolveError> {
        let attempts = config.max_retries.max(1);

        for attempt in 1..=attempts {
            info!("Recognition attempt {}/{}", attempt, attempts);

            pending.store(true, Ordering::SeqCst);
            let recognition = self.recognizer.recognize_once(&config.capture, window).await;
            pending.store(false, Ordering::SeqCst);

            if let Some(recognition) = recognition {
                return Ok(Solved {
                    text: recognition.text,
                    strategy: recognition.strategy,
                    attempt,
                });
            }

            self.stats.record_failure();
            if attempt < attempts {
                sleep(Duration::from_millis(config.retry_delay_ms)).await;
            }
        }

        Err(SolveError::Exhausted { attempts })
    }

    /// Click input, type, wait, click confirm.
    async fn inject(&self, config: &SolverConfig, window: &WindowState, text: &str) {
        let handle = window.handle;

        let injector = Arc::clone(&self.injector);
        let (input_point, text) = (config.input_point, text.to_string());
        if let Err(e) = spawn_blocking(move || {
            injector.click(handle, input_point);
            injector.send_text(handle, &text);
        })
        .await
        {
            warn!("Input injection failed: {}", e);
        }

        sleep(Duration::from_millis(config.type_delay_ms)).await;

        let injector = Arc::clone(&self.injector);
        let confirm_point = config.confirm_point;
        if let Err(e) = spawn_blocking(move || injector.click(handle, confirm_point)).await {
            warn!("Confirm click failed: {}", e);
        }
    }
}
