//! Screen markers and control selectors of the reservation site.
//!
//! Markers are substrings of a snapshot's visible text (or markup) that
//! identify a screen. Selectors are CSS selectors for the handful of
//! controls the loops interact with.

/// Loading overlay shown while the site is mid-transition.
pub const PLEASE_WAIT: &str = "Please Wait...";
/// Link on the login form.
pub const FORGOT_ACCOUNT_DETAILS: &str = "FORGOT ACCOUNT DETAILS";
/// Header entry present only in an authenticated session.
pub const LOGOUT: &str = "Logout";
/// Login form error after a wrong captcha.
pub const INVALID_CAPTCHA: &str = "Invalid Captcha";
/// Hard provider error, never retried.
pub const PROVIDER_SORRY: &str = "Sorry!!! Please Try again!!";
pub const NO_SEATS: &str = "No seats available";
pub const UNABLE_TO_PROCESS: &str = "Unable to process current transaction";
pub const PAYMENT_MODE: &str = "Payment Mode";
pub const PAYMENT_METHODS: &str = "Payment Methods";
/// Review screen text shown next to the post-search captcha.
pub const TICKET_SENT_TO: &str = "Your ticket will be sent to";
/// Captcha placeholder, only visible in markup.
pub const ENTER_CAPTCHA: &str = "Enter Captcha";
pub const PASSENGER_DETAILS: &str = "Passenger Details";
pub const CONTACT_DETAILS: &str = "Contact Details";
/// Search results before the Tatkal window opens.
pub const BOOKING_NOT_STARTED: &str = "Booking not yet started";
/// Currency marker of a bookable fare.
pub const RUPEE: char = '₹';
pub const BOOK_NOW: &str = "Book Now";

/// CSS selectors.
pub mod selectors {
    pub const CAPTCHA_INPUT: &str = "#captcha";
    pub const CAPTCHA_IMAGE: &str = ".captcha-img";
    /// Search button used to recover a stale transaction.
    pub const TRAIN_SEARCH: &str = ".train_Search";
    pub const MODIFY_SEARCH: &str =
        ".level_1.hidden-xs > app-modify-search > .layer_2 > form.ng-untouched > .col-md-2 > .hidden-xs";
    /// One rendered train in the search results.
    pub const TRAIN_ENTRY: &str = ":nth-child(n) > .bull-back";
    /// Availability date cells, relative to a train entry.
    pub const DATE_CELL: &str = "app-train-avl-enq > :nth-child(1) > :nth-child(7) > :nth-child(1)";
    /// Fare row holding the `Book Now` button, relative to a train entry.
    pub const FARE_ROW: &str =
        "app-train-avl-enq > [style=\"padding-top: 10px; padding-bottom: 20px;\"]";
    /// Server clock in the page header.
    pub const SERVER_CLOCK: &str = "div.h_head1";
}
