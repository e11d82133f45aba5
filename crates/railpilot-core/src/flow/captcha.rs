//! Post-search captcha loop.
//!
//! Unlike login, this loop runs against a fixed budget: every iteration
//! consumes one attempt from a [`CaptchaAttemptCounter`] owned by the
//! invocation, and an empty budget fails closed before any further solver
//! call.

use tracing::{debug, error, info, warn};

use super::{fatal, CaptchaMode, LoopGuard, Session};
use crate::classify::State;
use crate::error::FlowError;
use crate::locator::Locator;
use crate::markers::selectors;
use crate::ports::{CaptchaSolver, DomActionPort, Pacer};

/// Attempts allowed per post-search captcha loop.
pub const DEFAULT_CAPTCHA_BUDGET: u32 = 120;

/// Remaining attempts of one captcha loop invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptchaAttemptCounter {
    budget: u32,
    remaining: u32,
}

impl CaptchaAttemptCounter {
    pub fn new(budget: u32) -> Self {
        Self {
            budget,
            remaining: budget,
        }
    }

    /// Consume one attempt, returning its 1-based number.
    pub fn consume(&mut self) -> Result<u32, FlowError> {
        if self.remaining == 0 {
            return Err(FlowError::CaptchaBudgetExhausted {
                attempts: self.budget,
            });
        }
        self.remaining -= 1;
        Ok(self.budget - self.remaining)
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }
}

impl<D, S, P> Session<D, S, P>
where
    D: DomActionPort,
    S: CaptchaSolver,
    P: Pacer,
{
    /// Clear the review-screen captcha until the payment gateway shows up.
    pub async fn solve_post_search_captcha(&mut self) -> Result<(), FlowError> {
        let mode = self.settings.captcha_mode;
        let mut counter = CaptchaAttemptCounter::new(self.settings.captcha_budget);
        let mut guard = self.guard("post_search_captcha");

        loop {
            guard.tick()?;
            let attempt = counter.consume()?;
            debug!("Captcha solve attempt {} of {}", attempt, counter.budget());

            self.pacer.sleep(self.settings.timings.captcha_settle).await;
            let (_, state) = self.poll().await?;
            guard.observe(state);

            match state {
                State::TransactionRetryable => {
                    info!("Transaction error detected, retrying search");
                    self.dom
                        .click(&Locator::css(selectors::TRAIN_SEARCH))
                        .await?;
                    self.pacer.sleep(self.settings.timings.corrective_pause).await;
                }
                State::ProviderFatalError | State::NoSeatsAvailable => {
                    error!("Fatal screen ({}), stopping", state);
                    return Err(fatal(state));
                }
                State::PaymentGateReached => {
                    info!("Payment page reached");
                    return Ok(());
                }
                State::CaptchaPromptAfterSearch => match mode {
                    CaptchaMode::Manual => {
                        info!("Waiting for manual captcha entry");
                        if !self.focus_captcha_input().await? {
                            continue;
                        }
                        return self.await_payment_gate(&mut guard).await;
                    }
                    CaptchaMode::Automatic => {
                        if !self.solve_and_submit_captcha().await? {
                            continue;
                        }
                        let (_, state) = self.poll().await?;
                        guard.observe(state);
                        if state == State::PaymentGateReached {
                            info!("Captcha solved on attempt {}", attempt);
                            return Ok(());
                        }
                        warn!("Captcha solve not confirmed ({}), retrying", state);
                    }
                },
                _ => debug!("Page not in expected state ({}), retrying captcha", state),
            }
        }
    }

    /// Poll until the operator's captcha lands on the payment gateway.
    async fn await_payment_gate(&mut self, guard: &mut LoopGuard) -> Result<(), FlowError> {
        loop {
            guard.tick()?;
            self.pacer.sleep(self.settings.timings.manual_poll).await;

            let (_, state) = self.poll().await?;
            guard.observe(state);
            match state {
                State::PaymentGateReached => {
                    info!("Manual captcha solved successfully");
                    return Ok(());
                }
                State::ProviderFatalError | State::NoSeatsAvailable => {
                    error!("Fatal screen ({}), stopping", state);
                    return Err(fatal(state));
                }
                _ => {}
            }
        }
    }
}
