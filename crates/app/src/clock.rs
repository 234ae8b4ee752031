//! Clock boundary for testable time handling.

use chrono::{DateTime, TimeZone, Utc};

/// Time source used by the core.
///
/// Injected so staleness math and recovery windows are testable.
pub trait Clock: Send + Sync {
    /// Current time as epoch milliseconds.
    fn now_ms(&self) -> u64;

    /// Current time as UTC.
    fn now_utc(&self) -> DateTime<Utc> {
        let ms = self.now_ms();
        Utc.timestamp_millis_opt(i64::try_from(ms).unwrap_or(i64::MAX))
            .single()
            .unwrap_or_else(Utc::now)
    }
}

/// Wall-clock implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        let now = Utc::now().timestamp_millis();
        u64::try_from(now).unwrap_or(0)
    }
}

/// Fixed clock for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_ms(&self) -> u64 {
        self.0
    }
}
