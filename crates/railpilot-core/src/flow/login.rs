//! Captcha login loop.
//!
//! Retries are unbounded in both modes; only the session-wide
//! `max_iterations` valve (if configured) stops a login that never succeeds.

use tracing::{debug, info};

use super::{CaptchaMode, LoopGuard, Session, SessionAuthState};
use crate::classify::{is_invalid_captcha, is_logged_in, State};
use crate::error::FlowError;
use crate::ports::{CaptchaSolver, DomActionPort, Pacer};

impl<D, S, P> Session<D, S, P>
where
    D: DomActionPort,
    S: CaptchaSolver,
    P: Pacer,
{
    /// Drive the login form until the session is authenticated.
    pub async fn login(&mut self) -> Result<SessionAuthState, FlowError> {
        if self.auth.is_authenticated() {
            return Ok(self.auth);
        }

        let mode = self.settings.captcha_mode;
        info!("Attempting login ({:?} captcha)", mode);
        let mut guard = self.guard("login");

        loop {
            guard.tick()?;
            self.pacer.sleep(self.settings.timings.login_settle).await;

            let (snapshot, state) = self.poll().await?;
            guard.observe(state);

            if is_logged_in(&snapshot) {
                self.mark_authenticated();
                return Ok(self.auth);
            }
            if state != State::LoginPageAwaitingCaptcha {
                debug!("Page not in expected state ({}), retrying login", state);
                continue;
            }

            match mode {
                CaptchaMode::Manual => {
                    info!("Manual captcha mode, waiting for the operator to log in");
                    if !self.focus_captcha_input().await? {
                        continue;
                    }
                    self.await_manual_login(&mut guard).await?;
                    return Ok(self.auth);
                }
                CaptchaMode::Automatic => {
                    if !self.solve_and_submit_captcha().await? {
                        continue;
                    }

                    let (snapshot, state) = self.poll().await?;
                    guard.observe(state);
                    if is_logged_in(&snapshot) {
                        self.mark_authenticated();
                        return Ok(self.auth);
                    }
                    if is_invalid_captcha(&snapshot) {
                        info!("Invalid captcha detected, retrying");
                    } else {
                        info!("Login not confirmed ({}), retrying", state);
                    }
                }
            }
        }
    }

    /// Poll until the operator's login lands on a session screen.
    async fn await_manual_login(&mut self, guard: &mut LoopGuard) -> Result<(), FlowError> {
        loop {
            guard.tick()?;
            self.pacer.sleep(self.settings.timings.manual_poll).await;

            let (snapshot, state) = self.poll().await?;
            guard.observe(state);
            if is_logged_in(&snapshot) {
                self.mark_authenticated();
                return Ok(());
            }
        }
    }
}
