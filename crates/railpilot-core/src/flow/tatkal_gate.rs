//! Tatkal opening gate: block until the site's clock shows the opening time.
//!
//! The ceiling is soft and measured on the pacer's clock, so time spent
//! reading the site clock counts toward it. When the clock never shows the
//! opening time the gate logs a warning and lets booking continue
//! unconfirmed.

use tracing::{debug, info, warn};

use super::Session;
use crate::error::FlowError;
use crate::locator::Locator;
use crate::markers::selectors;
use crate::ports::{CaptchaSolver, DomActionPort, Pacer};
use crate::tatkal;

/// How the gate returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// Today's opening had already passed; nothing polled.
    AlreadyOpen,
    /// The clock showed the opening time after `polls` reads.
    Released { polls: u32 },
    /// Ceiling reached without a match.
    TimedOut,
}

impl<D, S, P> Session<D, S, P>
where
    D: DomActionPort,
    S: CaptchaSolver,
    P: Pacer,
{
    /// Wait for the Tatkal window of `coach` to open.
    pub async fn await_tatkal_opening(&mut self, coach: &str) -> Result<GateOutcome, FlowError> {
        let now = self.pacer.now().time();
        if tatkal::has_opened(coach, now) {
            debug!("Tatkal window for {} already open at {}", coach, now);
            return Ok(GateOutcome::AlreadyOpen);
        }

        let target = tatkal::opening_clock_text(coach);
        let poll = self.settings.timings.tatkal_poll;
        let ceiling = self.settings.timings.tatkal_ceiling;
        info!("Waiting for Tatkal opening time: {}", target);

        let clock = Locator::css(selectors::SERVER_CLOCK);
        let start = self.pacer.now();
        let mut polls = 0;
        loop {
            polls += 1;
            if let Some(text) = self.dom.text_of(&clock).await? {
                if text.contains(&target) {
                    info!("Tatkal window open ({})", text.trim());
                    return Ok(GateOutcome::Released { polls });
                }
            }

            let waited = (self.pacer.now() - start).to_std().unwrap_or_default();
            if waited >= ceiling {
                warn!(
                    "Clock did not show {} within {:?}, continuing without confirmation",
                    target, ceiling
                );
                return Ok(GateOutcome::TimedOut);
            }

            self.pacer.sleep(poll).await;
        }
    }
}
