//! Monotonic millisecond timestamps and the gates built on them.
//!
//! All timing in the loop compares elapsed differences, never absolute
//! values, so the 32-bit counter may wrap (every ~49.7 days) without
//! stalling a poll.

/// A monotonic millisecond counter value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Millis(pub u32);

impl Millis {
    /// Milliseconds from `earlier` to `self`, correct across wraparound.
    pub fn since(self, earlier: Millis) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }

    pub fn add(self, ms: u32) -> Millis {
        Millis(self.0.wrapping_add(ms))
    }

    pub fn sub(self, ms: u32) -> Millis {
        Millis(self.0.wrapping_sub(ms))
    }

    /// Whole seconds, used for event timestamps.
    pub fn as_secs(self) -> u32 {
        self.0 / 1000
    }
}

/// Source of [`Millis`] timestamps.
pub trait Clock {
    fn now(&self) -> Millis;
}

/// Minimum-interval guard.
///
/// `admit` returns true at most once per `interval`; calls inside the
/// window are dropped, not queued.
#[derive(Clone, Copy, Debug)]
pub struct Gate {
    interval: u32,
    last: Option<Millis>,
}

impl Gate {
    pub const fn new(interval_ms: u32) -> Self {
        Self {
            interval: interval_ms,
            last: None,
        }
    }

    pub fn admit(&mut self, now: Millis) -> bool {
        match self.last {
            Some(last) if now.since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    /// Instant of the last admitted call.
    pub fn last(&self) -> Option<Millis> {
        self.last
    }
}

/// Fixed-period poll timer.
#[derive(Clone, Copy, Debug)]
pub struct Periodic {
    period: u32,
    last: Millis,
}

impl Periodic {
    /// Timer whose first poll fires `first_after` ms after `now`.
    pub fn staggered(period_ms: u32, now: Millis, first_after: u32) -> Self {
        // Pretend the last poll happened so the next one lands on `first_after`.
        let first_after = first_after.min(period_ms);
        Self {
            period: period_ms,
            last: now.sub(period_ms - first_after),
        }
    }

    /// Timer that fires on the first check.
    pub fn immediate(period_ms: u32, now: Millis) -> Self {
        Self::staggered(period_ms, now, 0)
    }

    /// True (and re-armed from `now`) once the period has elapsed.
    pub fn due(&mut self, now: Millis) -> bool {
        if now.since(self.last) >= self.period {
            self.last = now;
            true
        } else {
            false
        }
    }
}

/// Sleep needed to finish a frame that started at `frame_start`.
///
/// Never returns 0 so the loop always yields.
pub fn frame_sleep_ms(frame_start: Millis, now: Millis, budget_ms: u32) -> u32 {
    let spent = now.since(frame_start);
    if spent < budget_ms {
        budget_ms - spent
    } else {
        1
    }
}
