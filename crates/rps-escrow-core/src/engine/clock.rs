//! Engine time source with simulation support.

use chrono::{DateTime, Duration, Utc};

/// Time source for expiry checks.
///
/// A system clock reads the wall clock on every call. A fixed clock starts
/// frozen at a chosen instant and only moves when advanced, which lets tests
/// and demos play out expiry without sleeping.
#[derive(Clone, Debug, Default)]
pub struct Clock {
    current: Option<DateTime<Utc>>,
}

impl Clock {
    /// Wall-clock time.
    pub fn system() -> Self {
        Self { current: None }
    }

    /// Frozen at `start` until advanced.
    pub fn fixed(start: DateTime<Utc>) -> Self {
        Self {
            current: Some(start),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.current.unwrap_or_else(Utc::now)
    }

    /// Move time forward. A system clock becomes frozen at `now + seconds`.
    /// Steps that would leave the representable time range are ignored.
    pub fn advance(&mut self, seconds: i64) {
        let target = Duration::try_seconds(seconds)
            .and_then(|step| self.now().checked_add_signed(step));
        if let Some(target) = target {
            self.current = Some(target);
        }
    }
}
