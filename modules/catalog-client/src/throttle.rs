use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Process-wide spacing between outbound requests: a token bucket of size
/// one, refilled every `min_interval`.
///
/// The lock is held while waiting, so concurrent callers are released one
/// at a time in arrival order.
pub struct RequestThrottle {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RequestThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until a request may be sent, then claim the slot.
    pub async fn acquire(&self) {
        let mut last = self.last.lock().await;
        if let Some(prev) = *last {
            let ready_at = prev + self.min_interval;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}
