//! Real-time pacing on the tokio clock.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use railpilot_core::ports::Pacer;
use railpilot_core::tatkal;

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn now(&self) -> DateTime<FixedOffset> {
        tatkal::ist_now()
    }
}
