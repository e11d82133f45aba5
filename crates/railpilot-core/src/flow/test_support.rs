//! Scripted fakes of the ports for loop tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone};

use crate::error::PortError;
use crate::locator::{Locator, Scope};
use crate::markers::selectors;
use crate::ports::{CaptchaSolver, DomActionPort, Pacer};
use crate::snapshot::ScreenSnapshot;

/// A recorded port call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Snapshot,
    Click(Locator),
    Focus(Locator),
    Type(Locator, String),
    Enter(Locator),
    TextOf(Locator),
    TextsOf(Locator),
    AttributeOf(Locator, String),
    WaitFor(Locator),
}

impl Call {
    /// Calls that change the page.
    pub fn is_action(&self) -> bool {
        matches!(
            self,
            Call::Click(_) | Call::Focus(_) | Call::Type(..) | Call::Enter(_)
        )
    }
}

/// One rendered train in the search results.
#[derive(Debug, Clone)]
pub struct FakeEntry {
    pub text: String,
    pub fare_rows: Vec<String>,
}

impl FakeEntry {
    pub fn new(text: &str, fare_rows: &[&str]) -> Self {
        Self {
            text: text.to_string(),
            fare_rows: fare_rows.iter().map(|r| r.to_string()).collect(),
        }
    }
}

/// DOM port replaying a queue of screens; the last screen repeats forever.
pub struct FakeDom {
    screens: VecDeque<ScreenSnapshot>,
    clock: VecDeque<String>,
    pub entries: Vec<FakeEntry>,
    pub captcha_src: Option<String>,
    /// Selectors whose clicks fail with `ElementNotFound`.
    pub missing: Vec<&'static str>,
    /// Number of upcoming focus/type/enter calls that hit a stale element.
    pub stale_actions: u32,
    pub calls: Vec<Call>,
}

impl FakeDom {
    pub fn new<I: IntoIterator<Item = ScreenSnapshot>>(screens: I) -> Self {
        Self {
            screens: screens.into_iter().collect(),
            clock: VecDeque::new(),
            entries: Vec::new(),
            captcha_src: Some("data:image/jpg;base64,R0lGOD".to_string()),
            missing: Vec::new(),
            stale_actions: 0,
            calls: Vec::new(),
        }
    }

    pub fn with_entries(mut self, entries: Vec<FakeEntry>) -> Self {
        self.entries = entries;
        self
    }

    pub fn with_clock(mut self, readings: &[&str]) -> Self {
        self.clock = readings.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn clicks(&self) -> Vec<&Locator> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Click(loc) => Some(loc),
                _ => None,
            })
            .collect()
    }

    pub fn actions(&self) -> Vec<&Call> {
        self.calls.iter().filter(|c| c.is_action()).collect()
    }

    pub fn snapshot_count(&self) -> usize {
        self.calls.iter().filter(|c| **c == Call::Snapshot).count()
    }

    fn take_stale(&mut self) -> Result<(), PortError> {
        if self.stale_actions > 0 {
            self.stale_actions -= 1;
            return Err(PortError::element_not_ready("stale element reference"));
        }
        Ok(())
    }

    fn entry_scope(target: &Locator) -> Option<usize> {
        match &target.scope {
            Some(Scope { css, index }) if css == selectors::TRAIN_ENTRY => Some(*index),
            _ => None,
        }
    }
}

fn pop_repeating<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

#[async_trait]
impl DomActionPort for FakeDom {
    async fn snapshot(&mut self) -> Result<ScreenSnapshot, PortError> {
        self.calls.push(Call::Snapshot);
        Ok(pop_repeating(&mut self.screens).unwrap_or_default())
    }

    async fn click(&mut self, target: &Locator) -> Result<(), PortError> {
        self.calls.push(Call::Click(target.clone()));
        if self.missing.iter().any(|css| *css == target.css) {
            return Err(PortError::element_not_found(target));
        }
        Ok(())
    }

    async fn focus(&mut self, target: &Locator) -> Result<(), PortError> {
        self.calls.push(Call::Focus(target.clone()));
        self.take_stale()
    }

    async fn type_text(&mut self, target: &Locator, text: &str) -> Result<(), PortError> {
        self.calls.push(Call::Type(target.clone(), text.to_string()));
        self.take_stale()
    }

    async fn press_enter(&mut self, target: &Locator) -> Result<(), PortError> {
        self.calls.push(Call::Enter(target.clone()));
        self.take_stale()
    }

    async fn text_of(&mut self, target: &Locator) -> Result<Option<String>, PortError> {
        self.calls.push(Call::TextOf(target.clone()));
        if target.css == selectors::SERVER_CLOCK {
            return Ok(pop_repeating(&mut self.clock));
        }
        Ok(None)
    }

    async fn texts_of(&mut self, target: &Locator) -> Result<Vec<String>, PortError> {
        self.calls.push(Call::TextsOf(target.clone()));
        if target.css == selectors::TRAIN_ENTRY && target.scope.is_none() {
            return Ok(self.entries.iter().map(|e| e.text.clone()).collect());
        }
        if target.css == selectors::FARE_ROW {
            if let Some(entry) = Self::entry_scope(target).and_then(|i| self.entries.get(i)) {
                return Ok(entry.fare_rows.clone());
            }
        }
        Ok(Vec::new())
    }

    async fn attribute_of(
        &mut self,
        target: &Locator,
        name: &str,
    ) -> Result<Option<String>, PortError> {
        self.calls
            .push(Call::AttributeOf(target.clone(), name.to_string()));
        if target.css == selectors::CAPTCHA_IMAGE && name == "src" {
            return Ok(self.captcha_src.clone());
        }
        Ok(None)
    }

    async fn wait_for(&mut self, target: &Locator, _timeout: Duration) -> Result<bool, PortError> {
        self.calls.push(Call::WaitFor(target.clone()));
        if target.css == selectors::TRAIN_ENTRY {
            return Ok(!self.entries.is_empty());
        }
        Ok(true)
    }
}

/// Solver replaying scripted answers, then repeating a fallback.
pub struct FakeSolver {
    answers: Mutex<VecDeque<Result<String, PortError>>>,
    fallback: Result<String, PortError>,
    calls: AtomicUsize,
}

impl FakeSolver {
    pub fn always(answer: &str) -> Arc<Self> {
        Self::scripted(Vec::new(), Ok(answer.to_string()))
    }

    pub fn failing() -> Arc<Self> {
        Self::scripted(
            Vec::new(),
            Err(PortError::solver_failed_with_stderr("exit status 1", None)),
        )
    }

    pub fn scripted(
        answers: Vec<Result<String, PortError>>,
        fallback: Result<String, PortError>,
    ) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.into()),
            fallback,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptchaSolver for FakeSolver {
    async fn solve(&self, _image_ref: &str) -> Result<String, PortError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self
            .answers
            .lock()
            .map_err(|_| PortError::internal("solver script poisoned"))?
            .pop_front();
        scripted.unwrap_or_else(|| self.fallback.clone())
    }
}

/// Pacer that records sleeps instead of sleeping.
///
/// Its IST clock advances by every sleep, plus `drift` on each read to stand
/// in for time spent in port calls.
pub struct FakePacer {
    now: Mutex<DateTime<FixedOffset>>,
    drift: Duration,
    sleeps: Mutex<Vec<Duration>>,
}

impl FakePacer {
    pub fn at(hour: u32, min: u32, sec: u32) -> Arc<Self> {
        Self::drifting(hour, min, sec, Duration::ZERO)
    }

    pub fn drifting(hour: u32, min: u32, sec: u32, drift: Duration) -> Arc<Self> {
        let ist = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();
        Arc::new(Self {
            now: Mutex::new(ist.with_ymd_and_hms(2026, 1, 17, hour, min, sec).unwrap()),
            drift,
            sleeps: Mutex::new(Vec::new()),
        })
    }

    pub fn noon() -> Arc<Self> {
        Self::at(12, 0, 0)
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }

    fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::from_std(by).unwrap();
    }
}

#[async_trait]
impl Pacer for FakePacer {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        self.advance(duration);
    }

    fn now(&self) -> DateTime<FixedOffset> {
        let current = *self.now.lock().unwrap();
        self.advance(self.drift);
        current
    }
}

pub fn screen(text: &str) -> ScreenSnapshot {
    ScreenSnapshot::from_text(text)
}

/// Review screen with the post-search captcha rendered.
pub fn captcha_prompt() -> ScreenSnapshot {
    ScreenSnapshot::new(
        "Review Journey Your ticket will be sent to you@example.com Logout",
        "<input id=\"captcha\" placeholder=\"Enter Captcha\">",
    )
}
