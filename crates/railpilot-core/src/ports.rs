//! Interfaces to the external collaborators driven by the loops.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};

use crate::error::PortError;
use crate::locator::Locator;
use crate::snapshot::ScreenSnapshot;

/// Read and write access to the live screen.
#[async_trait]
pub trait DomActionPort: Send {
    /// Capture the current screen; may block briefly until the render settles.
    async fn snapshot(&mut self) -> Result<ScreenSnapshot, PortError>;

    async fn click(&mut self, target: &Locator) -> Result<(), PortError>;

    async fn focus(&mut self, target: &Locator) -> Result<(), PortError>;

    /// Clear the field, then type `text` into it.
    async fn type_text(&mut self, target: &Locator, text: &str) -> Result<(), PortError>;

    async fn press_enter(&mut self, target: &Locator) -> Result<(), PortError>;

    /// Visible text of the first match, `None` when nothing matches.
    async fn text_of(&mut self, target: &Locator) -> Result<Option<String>, PortError>;

    /// Visible text of every match, in document order.
    async fn texts_of(&mut self, target: &Locator) -> Result<Vec<String>, PortError>;

    async fn attribute_of(
        &mut self,
        target: &Locator,
        name: &str,
    ) -> Result<Option<String>, PortError>;

    /// Wait until the target exists. Returns `false` on timeout.
    async fn wait_for(&mut self, target: &Locator, timeout: Duration) -> Result<bool, PortError>;
}

/// External captcha solver: image reference in, decoded text out.
#[async_trait]
pub trait CaptchaSolver: Send + Sync {
    async fn solve(&self, image_ref: &str) -> Result<String, PortError>;
}

/// Suspension points and wall clock, injectable for tests.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn sleep(&self, duration: Duration);

    /// Current time in IST.
    fn now(&self) -> DateTime<FixedOffset>;
}

#[async_trait]
impl<T: CaptchaSolver + ?Sized> CaptchaSolver for Arc<T> {
    async fn solve(&self, image_ref: &str) -> Result<String, PortError> {
        (**self).solve(image_ref).await
    }
}

#[async_trait]
impl<T: Pacer + ?Sized> Pacer for Arc<T> {
    async fn sleep(&self, duration: Duration) {
        (**self).sleep(duration).await
    }

    fn now(&self) -> DateTime<FixedOffset> {
        (**self).now()
    }
}
