//! Time source shared by the stores and the alert generator.

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Millisecond timestamp id, bumped until `taken` no longer reports a collision.
pub fn timestamp_id(now: DateTime<Utc>, taken: impl Fn(&str) -> bool) -> String {
    let mut millis = now.timestamp_millis();
    loop {
        let id = millis.to_string();
        if !taken(&id) {
            return id;
        }
        millis += 1;
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ManualClock;
    use super::*;

    #[test]
    fn test_timestamp_id_skips_taken_ids() {
        let clock = ManualClock::at_epoch_millis(1_700_000_000_000);
        let taken = ["1700000000000", "1700000000001"];
        let id = timestamp_id(clock.now(), |id| taken.contains(&id));
        assert_eq!(id, "1700000000002");
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::at_epoch_millis(0);
        clock.advance(chrono::Duration::seconds(30));
        assert_eq!(clock.now().timestamp(), 30);
    }
}
