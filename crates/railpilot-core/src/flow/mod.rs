//! Polling state machines driving a reservation session.
//!
//! Every loop has the same shape: settle, poll a snapshot, classify, act on
//! the classification, repeat. All waiting goes through the session's
//! [`Pacer`], and every loop honors the optional `max_iterations` safety
//! valve so tests (and cautious operators) can bound a run.
//!
//! The loops run in sequence on one [`Session`]:
//!
//! 1. [`Session::login`]: captcha login
//! 2. [`Session::book`]: search, select, initiate booking (with the Tatkal gate)
//! 3. [`Session::solve_post_search_captcha`]: review-screen captcha until payment

mod booking;
mod captcha;
mod login;
mod tatkal_gate;

#[cfg(test)]
pub(crate) mod test_support;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::classify::{classify, State};
use crate::error::{FlowError, PortError};
use crate::locator::Locator;
use crate::markers::selectors;
use crate::ports::{CaptchaSolver, DomActionPort, Pacer};
use crate::snapshot::ScreenSnapshot;

pub use captcha::{CaptchaAttemptCounter, DEFAULT_CAPTCHA_BUDGET};
pub use tatkal_gate::GateOutcome;

/// Who solves captchas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptchaMode {
    /// Solver service decodes the image.
    #[default]
    Automatic,
    /// Operator types the captcha; the loop focuses the field and waits.
    Manual,
}

/// Whether the session has logged in. Write-once to authenticated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionAuthState {
    #[default]
    Anonymous,
    Authenticated,
}

impl SessionAuthState {
    pub fn is_authenticated(self) -> bool {
        self == SessionAuthState::Authenticated
    }
}

/// Fixed delays of the loops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timings {
    /// Delay before each login poll.
    pub login_settle: Duration,
    /// Poll interval while the operator solves a captcha.
    pub manual_poll: Duration,
    /// Delay before each post-search captcha poll.
    pub captcha_settle: Duration,
    /// Pause after re-triggering the search on a stale transaction.
    pub corrective_pause: Duration,
    /// Delay before each booking poll.
    pub booking_settle: Duration,
    /// How long to wait for train entries to render.
    pub entry_wait: Duration,
    pub tatkal_poll: Duration,
    /// Soft ceiling of the Tatkal clock wait.
    pub tatkal_ceiling: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            login_settle: Duration::from_millis(500),
            manual_poll: Duration::from_millis(500),
            captcha_settle: Duration::from_millis(500),
            corrective_pause: Duration::from_millis(1000),
            booking_settle: Duration::from_millis(1900),
            entry_wait: Duration::from_secs(4),
            tatkal_poll: Duration::from_millis(100),
            tatkal_ceiling: Duration::from_secs(5 * 60),
        }
    }
}

/// Settings shared by all loops of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowSettings {
    pub captcha_mode: CaptchaMode,
    /// Attempts per post-search captcha loop.
    pub captcha_budget: u32,
    /// Iteration cap per loop invocation; `None` loops until a terminal state.
    pub max_iterations: Option<u64>,
    pub timings: Timings,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            captcha_mode: CaptchaMode::default(),
            captcha_budget: DEFAULT_CAPTCHA_BUDGET,
            max_iterations: None,
            timings: Timings::default(),
        }
    }
}

/// Error for a fatal-global screen state.
fn fatal(state: State) -> FlowError {
    FlowError::from_fatal_state(state).unwrap_or_else(|| {
        PortError::internal(format!("{} is not a fatal state", state)).into()
    })
}

/// Swallow port errors that clear up on a later poll.
fn tolerate(err: PortError) -> Result<(), FlowError> {
    if err.is_retryable() {
        warn!("Control not ready, retrying: {}", err);
        Ok(())
    } else {
        Err(err.into())
    }
}

/// Counts iterations of one loop invocation against the safety valve.
#[derive(Debug)]
struct LoopGuard {
    flow: &'static str,
    limit: Option<u64>,
    iterations: u64,
    last_state: State,
}

impl LoopGuard {
    fn new(flow: &'static str, limit: Option<u64>) -> Self {
        Self {
            flow,
            limit,
            iterations: 0,
            last_state: State::Unknown,
        }
    }

    /// Start the next iteration, or fail if the cap is reached.
    fn tick(&mut self) -> Result<u64, FlowError> {
        if let Some(limit) = self.limit {
            if self.iterations >= limit {
                return Err(FlowError::IterationLimit {
                    flow: self.flow,
                    iterations: self.iterations,
                    last_state: self.last_state,
                });
            }
        }
        self.iterations += 1;
        Ok(self.iterations)
    }

    fn observe(&mut self, state: State) {
        self.last_state = state;
    }
}

/// One automation session: the ports plus the state the loops share.
pub struct Session<D, S, P> {
    dom: D,
    solver: S,
    pacer: P,
    settings: FlowSettings,
    auth: SessionAuthState,
    tatkal_released: bool,
}

impl<D, S, P> Session<D, S, P>
where
    D: DomActionPort,
    S: CaptchaSolver,
    P: Pacer,
{
    pub fn new(dom: D, solver: S, pacer: P, settings: FlowSettings) -> Self {
        Self {
            dom,
            solver,
            pacer,
            settings,
            auth: SessionAuthState::Anonymous,
            tatkal_released: false,
        }
    }

    pub fn auth_state(&self) -> SessionAuthState {
        self.auth
    }

    pub fn settings(&self) -> &FlowSettings {
        &self.settings
    }

    pub fn dom(&self) -> &D {
        &self.dom
    }

    pub fn into_dom(self) -> D {
        self.dom
    }

    fn guard(&self, flow: &'static str) -> LoopGuard {
        LoopGuard::new(flow, self.settings.max_iterations)
    }

    fn mark_authenticated(&mut self) {
        if !self.auth.is_authenticated() {
            info!("Session authenticated");
        }
        self.auth = SessionAuthState::Authenticated;
    }

    /// Take a snapshot and classify it.
    async fn poll(&mut self) -> Result<(ScreenSnapshot, State), FlowError> {
        let snapshot = self.dom.snapshot().await?;
        let state = classify(&snapshot);
        debug!("Screen {}: {}", state, snapshot.preview());
        Ok((snapshot, state))
    }

    /// Read the captcha image, solve it and submit the answer.
    ///
    /// Returns `false` when nothing was submitted (image missing, solver
    /// failure or a control not ready); all are retried by the caller.
    async fn solve_and_submit_captcha(&mut self) -> Result<bool, FlowError> {
        let image = Locator::css(selectors::CAPTCHA_IMAGE);
        let image_ref = match self.dom.attribute_of(&image, "src").await {
            Ok(Some(image_ref)) => image_ref,
            Ok(None) => {
                debug!("Captcha image has no source yet");
                return Ok(false);
            }
            Err(e) => {
                tolerate(e)?;
                return Ok(false);
            }
        };

        debug!("Sending captcha to solver");
        let answer = match self.solver.solve(&image_ref).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Captcha solver failed: {}", e);
                return Ok(false);
            }
        };
        let answer = answer.trim();
        if answer.is_empty() {
            warn!("Captcha solver returned an empty answer");
            return Ok(false);
        }
        info!("Captcha solver returned: {}", answer);

        let input = Locator::css(selectors::CAPTCHA_INPUT);
        let submitted = match self.dom.type_text(&input, answer).await {
            Ok(()) => self.dom.press_enter(&input).await,
            Err(e) => Err(e),
        };
        match submitted {
            Ok(()) => Ok(true),
            Err(e) => {
                tolerate(e)?;
                Ok(false)
            }
        }
    }

    /// Focus the captcha field for the operator. Returns `false` when the
    /// field is not ready yet.
    async fn focus_captcha_input(&mut self) -> Result<bool, FlowError> {
        match self.dom.focus(&Locator::css(selectors::CAPTCHA_INPUT)).await {
            Ok(()) => Ok(true),
            Err(e) => {
                tolerate(e)?;
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_without_limit_never_trips() {
        let mut guard = LoopGuard::new("test", None);
        for _ in 0..10_000 {
            guard.tick().unwrap();
        }
    }

    #[test]
    fn guard_trips_after_limit_with_last_state() {
        let mut guard = LoopGuard::new("booking", Some(2));
        guard.tick().unwrap();
        guard.observe(State::BookingNotStarted);
        guard.tick().unwrap();
        match guard.tick() {
            Err(FlowError::IterationLimit {
                flow,
                iterations,
                last_state,
            }) => {
                assert_eq!(flow, "booking");
                assert_eq!(iterations, 2);
                assert_eq!(last_state, State::BookingNotStarted);
            }
            other => panic!("expected iteration limit, got {:?}", other),
        }
    }

    #[test]
    fn tolerate_only_swallows_retryable_errors() {
        assert!(tolerate(PortError::element_not_ready("stale element reference")).is_ok());
        assert!(tolerate(PortError::element_not_found("#captcha")).is_ok());
        assert!(matches!(
            tolerate(PortError::driver_failed("invalid session id")),
            Err(FlowError::Port(_))
        ));
    }

    #[test]
    fn default_settings_match_site_pacing() {
        let settings = FlowSettings::default();
        assert_eq!(settings.captcha_budget, 120);
        assert_eq!(settings.timings.booking_settle, Duration::from_millis(1900));
        assert_eq!(settings.timings.tatkal_ceiling, Duration::from_secs(300));
        assert_eq!(settings.captcha_mode, CaptchaMode::Automatic);
    }
}
