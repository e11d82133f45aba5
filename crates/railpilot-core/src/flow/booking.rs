//! Booking loop: search results → matching train → fare → passenger details.
//!
//! Re-scanning and re-clicking an already selected train is a no-op on the
//! site, so every unrecognized state simply loops. Only the passenger
//! details screen ends the loop successfully.

use tracing::{debug, error, info, warn};

use super::{fatal, tolerate, Session};
use crate::classify::State;
use crate::criteria::BookingCriteria;
use crate::error::FlowError;
use crate::locator::Locator;
use crate::markers::{self, selectors};
use crate::ports::{CaptchaSolver, DomActionPort, Pacer};

/// Which `Book Now` buttons to press in the matching entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FareSelection {
    /// The first one (search was just re-run after "not yet started").
    First,
    /// Every fare row showing a price.
    AllPriced,
}

impl<D, S, P> Session<D, S, P>
where
    D: DomActionPort,
    S: CaptchaSolver,
    P: Pacer,
{
    /// Keep selecting the train until the passenger details screen appears.
    pub async fn book(&mut self, criteria: &BookingCriteria) -> Result<(), FlowError> {
        info!(
            "Starting booking attempt for Train {}, Coach {}",
            criteria.train_no, criteria.coach
        );
        info!(
            "Travel Date: {}, Tatkal: {}",
            criteria.travel_date, criteria.tatkal
        );
        let mut guard = self.guard("booking");

        loop {
            guard.tick()?;
            self.pacer.sleep(self.settings.timings.booking_settle).await;

            if criteria.tatkal && !self.tatkal_released {
                self.await_tatkal_opening(&criteria.coach).await?;
                self.tatkal_released = true;
            }

            let (snapshot, state) = self.poll().await?;
            guard.observe(state);

            match state {
                State::NoSeatsAvailable | State::ProviderFatalError => {
                    error!("Fatal screen ({}), stopping booking", state);
                    return Err(fatal(state));
                }
                State::PassengerDetailsReached => {
                    info!("Successfully reached passenger details page");
                    return Ok(());
                }
                State::Transitional => debug!("Page in transition, retrying booking process"),
                State::BookingNotStarted => {
                    info!("Booking not started, retrying search");
                    let modify = Locator::css(selectors::MODIFY_SEARCH);
                    if let Err(e) = self.dom.click(&modify).await {
                        tolerate(e)?;
                        continue;
                    }

                    let (_, state) = self.poll().await?;
                    guard.observe(state);
                    if state == State::BookingNotStarted {
                        self.select_matching_train(criteria, FareSelection::First)
                            .await?;
                    } else {
                        debug!("Page state changed ({}), retrying booking process", state);
                    }
                }
                _ if snapshot.has_text(markers::PASSENGER_DETAILS)
                    || snapshot.has_text(markers::CONTACT_DETAILS) =>
                {
                    debug!("Passenger details page still rendering");
                }
                _ => {
                    self.select_matching_train(criteria, FareSelection::AllPriced)
                        .await?;
                }
            }
        }
    }

    /// Find the entry matching the criteria and act on it.
    ///
    /// Returns whether an entry was acted on. A missing entry or control is
    /// not an error; the loop retries on the next poll.
    async fn select_matching_train(
        &mut self,
        criteria: &BookingCriteria,
        fares: FareSelection,
    ) -> Result<bool, FlowError> {
        let entries = Locator::css(selectors::TRAIN_ENTRY);
        if !self
            .dom
            .wait_for(&entries, self.settings.timings.entry_wait)
            .await?
        {
            debug!("No train entries rendered yet");
            return Ok(false);
        }

        let texts = self.dom.texts_of(&entries).await?;
        let Some(index) = texts.iter().position(|t| criteria.matches_entry(t)) else {
            debug!(
                "Train {} with class {} not among {} entries",
                criteria.train_no,
                criteria.coach,
                texts.len()
            );
            return Ok(false);
        };

        info!("Found matching train at index {}", index);
        match self.act_on_entry(criteria, index, fares).await {
            Ok(()) => Ok(true),
            Err(FlowError::Port(e)) => {
                tolerate(e)?;
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Select the class and date inside entry `index`, then press `Book Now`.
    ///
    /// Every click is scoped to the entry, so other trains are never touched.
    async fn act_on_entry(
        &mut self,
        criteria: &BookingCriteria,
        index: usize,
        fares: FareSelection,
    ) -> Result<(), FlowError> {
        let coach = Locator::css(selectors::TRAIN_ENTRY)
            .nth(index)
            .containing(criteria.coach.as_str());
        self.dom.click(&coach).await?;

        let date = Locator::css(selectors::DATE_CELL)
            .within(selectors::TRAIN_ENTRY, index)
            .containing(criteria.formatted_travel_date());
        self.dom.click(&date).await?;

        let fare_rows = Locator::css(selectors::FARE_ROW).within(selectors::TRAIN_ENTRY, index);
        match fares {
            FareSelection::First => {
                info!("Clicking Book Now");
                self.dom
                    .click(&fare_rows.containing(markers::BOOK_NOW))
                    .await?;
            }
            FareSelection::AllPriced => {
                info!("Checking for booking options");
                let rows = self.dom.texts_of(&fare_rows).await?;
                for (row, text) in rows.iter().enumerate() {
                    if text.contains(markers::RUPEE) {
                        info!("Found bookable option in row {}", row + 1);
                        let book = fare_rows.clone().nth(row).containing(markers::BOOK_NOW);
                        self.dom.click(&book).await?;
                    }
                }
            }
        }
        Ok(())
    }
}
