//! Booking criteria supplied once per booking attempt.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::FlowError;

/// Accepted travel date formats, tried in order.
const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d"];

/// Date format of the availability cells, e.g. `Sat, 18 Jan`.
const AVAILABILITY_DATE_FORMAT: &str = "%a, %d %b";

/// What to book. Immutable for the duration of an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingCriteria {
    pub train_no: String,
    /// Coach/class code such as `3A` or `SL`.
    pub coach: String,
    pub travel_date: NaiveDate,
    pub tatkal: bool,
}

impl BookingCriteria {
    /// Validate and build criteria from raw configuration values.
    pub fn new(
        train_no: &str,
        coach: &str,
        travel_date: &str,
        tatkal: bool,
    ) -> Result<Self, FlowError> {
        let train_no = train_no.trim();
        if train_no.is_empty() {
            return Err(FlowError::InvalidCriteria("train number is empty".into()));
        }
        let coach = coach.trim();
        if coach.is_empty() {
            return Err(FlowError::InvalidCriteria("coach is empty".into()));
        }
        Ok(Self {
            train_no: train_no.to_string(),
            coach: coach.to_uppercase(),
            travel_date: parse_travel_date(travel_date)?,
            tatkal,
        })
    }

    /// Whether a rendered train entry is the one to book.
    pub fn matches_entry(&self, entry_text: &str) -> bool {
        entry_text.contains(&self.train_no) && entry_text.contains(&self.coach)
    }

    /// Travel date as rendered in the availability cells.
    pub fn formatted_travel_date(&self) -> String {
        format_availability_date(self.travel_date)
    }
}

fn parse_travel_date(raw: &str) -> Result<NaiveDate, FlowError> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| {
            FlowError::InvalidCriteria(format!(
                "travel date '{}' is not DD/MM/YYYY, DD-MM-YYYY or YYYY-MM-DD",
                raw
            ))
        })
}

/// Format a date the way availability cells show it.
pub fn format_availability_date(date: NaiveDate) -> String {
    date.format(AVAILABILITY_DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2026, 1, 18).unwrap();
        for raw in ["18/01/2026", "18-01-2026", "2026-01-18", " 18/01/2026 "] {
            let c = BookingCriteria::new("12951", "3A", raw, false).unwrap();
            assert_eq!(c.travel_date, expected, "raw: {}", raw);
        }
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            BookingCriteria::new("", "3A", "18/01/2026", false),
            Err(FlowError::InvalidCriteria(_))
        ));
        assert!(matches!(
            BookingCriteria::new("12951", " ", "18/01/2026", false),
            Err(FlowError::InvalidCriteria(_))
        ));
        assert!(matches!(
            BookingCriteria::new("12951", "3A", "tomorrow", false),
            Err(FlowError::InvalidCriteria(_))
        ));
    }

    #[test]
    fn coach_is_normalized() {
        let c = BookingCriteria::new("12951", "sl", "18/01/2026", true).unwrap();
        assert_eq!(c.coach, "SL");
        assert!(c.tatkal);
    }

    #[test]
    fn entry_must_contain_train_and_coach() {
        let c = BookingCriteria::new("12951", "3A", "18/01/2026", false).unwrap();
        assert!(c.matches_entry("MUMBAI RAJDHANI (12951) ... AC 3 Tier (3A)"));
        assert!(!c.matches_entry("MUMBAI RAJDHANI (12951) ... Sleeper (SL)"));
        assert!(!c.matches_entry("AUGUST KRANTI (12953) ... AC 3 Tier (3A)"));
    }

    #[test]
    fn formats_availability_date() {
        let c = BookingCriteria::new("12951", "3A", "18/01/2026", false).unwrap();
        assert_eq!(c.formatted_travel_date(), "Sun, 18 Jan");
    }
}
