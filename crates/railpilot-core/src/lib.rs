//! Core types and logic for railpilot.
//!
//! This crate holds everything that decides what to do on a reservation
//! screen. It never touches a browser itself: the page is reached through
//! the [`ports`] traits, implemented by the CLI (WebDriver) and by the
//! fakes in the loop tests.
//!
//! # Modules
//!
//! - [`snapshot`]: Screen captures and change detection
//! - [`classify`]: Snapshot → screen state, by ordered marker rules
//! - [`markers`]: Text markers and control selectors of the site
//! - [`locator`]: Element targeting for DOM actions
//! - [`criteria`]: What to book
//! - [`tatkal`]: Tatkal opening schedule
//! - [`ports`]: DOM, captcha solver and pacing interfaces
//! - [`flow`]: Login, booking, Tatkal gate and post-search captcha loops
//! - [`error`]: Port and loop errors with operator suggestions
//!
//! # Screen States
//!
//! | State | Marker | Loop reaction |
//! |-------|--------|---------------|
//! | **Transitional** | `Please Wait...` | wait, never act |
//! | **ProviderFatalError** | `Sorry!!! Please Try again!!` | stop the run |
//! | **NoSeatsAvailable** | `No seats available` | stop the run |
//! | **PaymentGateReached** | `Payment Methods` | captcha loop done |
//! | **PassengerDetailsReached** | `Passenger Details` | booking loop done |
//! | **Authenticated** | `Logout` | login loop done |

pub mod classify;
pub mod criteria;
pub mod error;
pub mod flow;
pub mod locator;
pub mod markers;
pub mod ports;
pub mod snapshot;
pub mod tatkal;
