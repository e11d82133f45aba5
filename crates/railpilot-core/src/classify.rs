//! Classification: mapping a snapshot to a screen state.
//!
//! The classifier applies priority-ordered rules; the first rule whose
//! markers are all present wins. Classification is pure and total: a
//! snapshot that matches no rule is [`State::Unknown`].
//!
//! # Rule Priority (highest to lowest)
//!
//! 1. `Please Wait...` → Transitional
//! 2. `Sorry!!! Please Try again!!` → ProviderFatalError
//! 3. `No seats available` → NoSeatsAvailable
//! 4. `Unable to process current transaction` + `Payment Mode` → TransactionRetryable
//! 5. `Payment Methods` → PaymentGateReached
//! 6. `Your ticket will be sent to` + markup `Enter Captcha` → CaptchaPromptAfterSearch
//! 7. `Passenger Details` + `Contact Details` → PassengerDetailsReached
//! 8. `Booking not yet started` → BookingNotStarted
//! 9. `Logout` → Authenticated
//! 10. `FORGOT ACCOUNT DETAILS` → LoginPageAwaitingCaptcha
//!
//! The loading overlay comes first so a half-rendered page carrying stale
//! markers never triggers an action. Error markers precede success markers
//! because error text may co-occur with stale success fragments.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::markers;
use crate::snapshot::ScreenSnapshot;

/// Screen state derived from a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    Authenticated,
    LoginPageAwaitingCaptcha,
    /// Loading overlay visible; always wins over any other marker.
    Transitional,
    BookingNotStarted,
    PassengerDetailsReached,
    PaymentGateReached,
    NoSeatsAvailable,
    ProviderFatalError,
    /// Recoverable stale-transaction error on the payment-mode screen.
    TransactionRetryable,
    CaptchaPromptAfterSearch,
    Unknown,
}

impl State {
    /// Fatal states that must halt the whole run.
    pub fn is_fatal_global(self) -> bool {
        matches!(self, State::NoSeatsAvailable | State::ProviderFatalError)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::Authenticated => "authenticated",
            State::LoginPageAwaitingCaptcha => "login_page_awaiting_captcha",
            State::Transitional => "transitional",
            State::BookingNotStarted => "booking_not_started",
            State::PassengerDetailsReached => "passenger_details_reached",
            State::PaymentGateReached => "payment_gate_reached",
            State::NoSeatsAvailable => "no_seats_available",
            State::ProviderFatalError => "provider_fatal_error",
            State::TransactionRetryable => "transaction_retryable",
            State::CaptchaPromptAfterSearch => "captcha_prompt_after_search",
            State::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// A classification rule: all text markers and all markup markers present.
#[derive(Debug)]
struct Rule {
    state: State,
    text: &'static [&'static str],
    markup: &'static [&'static str],
}

impl Rule {
    const fn text(state: State, text: &'static [&'static str]) -> Self {
        Self {
            state,
            text,
            markup: &[],
        }
    }

    fn matches(&self, snapshot: &ScreenSnapshot) -> bool {
        self.text.iter().all(|m| snapshot.has_text(m))
            && self.markup.iter().all(|m| snapshot.has_markup(m))
    }
}

/// Rules in priority order; first match wins.
const RULES: &[Rule] = &[
    Rule::text(State::Transitional, &[markers::PLEASE_WAIT]),
    Rule::text(State::ProviderFatalError, &[markers::PROVIDER_SORRY]),
    Rule::text(State::NoSeatsAvailable, &[markers::NO_SEATS]),
    Rule::text(
        State::TransactionRetryable,
        &[markers::UNABLE_TO_PROCESS, markers::PAYMENT_MODE],
    ),
    Rule::text(State::PaymentGateReached, &[markers::PAYMENT_METHODS]),
    Rule {
        state: State::CaptchaPromptAfterSearch,
        text: &[markers::TICKET_SENT_TO],
        markup: &[markers::ENTER_CAPTCHA],
    },
    Rule::text(
        State::PassengerDetailsReached,
        &[markers::PASSENGER_DETAILS, markers::CONTACT_DETAILS],
    ),
    Rule::text(State::BookingNotStarted, &[markers::BOOKING_NOT_STARTED]),
    Rule::text(State::Authenticated, &[markers::LOGOUT]),
    Rule::text(
        State::LoginPageAwaitingCaptcha,
        &[markers::FORGOT_ACCOUNT_DETAILS],
    ),
];

/// Classify a snapshot. Pure and total.
#[must_use]
pub fn classify(snapshot: &ScreenSnapshot) -> State {
    RULES
        .iter()
        .find(|rule| rule.matches(snapshot))
        .map_or(State::Unknown, |rule| rule.state)
}

/// Whether the page belongs to a logged-in session.
///
/// Every page after login carries `Logout` in its header, whatever it
/// classifies as. A page under the loading overlay never counts.
pub fn is_logged_in(snapshot: &ScreenSnapshot) -> bool {
    snapshot.has_text(markers::LOGOUT) && classify(snapshot) != State::Transitional
}

/// Whether the login form reports a rejected captcha.
pub fn is_invalid_captcha(snapshot: &ScreenSnapshot) -> bool {
    snapshot.has_text(markers::INVALID_CAPTCHA)
}
