// Time Provider Port (for testability)

use chrono::{DateTime, Datelike, NaiveDate};

/// Offices run on Indian Standard Time (UTC+05:30)
const IST_OFFSET_SECS: i32 = 5 * 3600 + 1800;

/// Time provider interface (allows mocking in tests)
pub trait TimeProvider: Send + Sync {
    /// Get current time in milliseconds since epoch
    fn now_millis(&self) -> i64;

    /// Current calendar date in IST
    fn today(&self) -> NaiveDate {
        local_date(self.now_millis())
    }

    fn current_year(&self) -> i32 {
        self.today().year()
    }
}

/// System time provider (production)
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Calendar date (IST) of an epoch-ms timestamp
pub fn local_date(millis: i64) -> NaiveDate {
    let shifted = millis + i64::from(IST_OFFSET_SECS) * 1000;
    DateTime::from_timestamp_millis(shifted)
        .unwrap_or_default()
        .date_naive()
}

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Manually driven clock
    pub struct FixedTimeProvider {
        now: AtomicI64,
    }

    impl FixedTimeProvider {
        pub fn new(now_millis: i64) -> Self {
            Self {
                now: AtomicI64::new(now_millis),
            }
        }

        pub fn advance(&self, millis: i64) {
            self.now.fetch_add(millis, Ordering::SeqCst);
        }

        pub fn set(&self, now_millis: i64) {
            self.now.store(now_millis, Ordering::SeqCst);
        }
    }

    impl TimeProvider for FixedTimeProvider {
        fn now_millis(&self) -> i64 {
            self.now.load(Ordering::SeqCst)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_date_uses_ist() {
        // 2025-03-31T19:00:00Z is already 1 April in India
        let millis = 1_743_447_600_000;
        assert_eq!(local_date(millis), NaiveDate::from_ymd_opt(2025, 4, 1).unwrap());
    }
}
