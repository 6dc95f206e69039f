//! Appear/disappear events and the bounded feed that holds them.

use core::fmt::Write;

use super::fingerprint::name_for;
use super::{BusSnapshot, DeviceAddress};
use crate::time::Millis;
use heapless::{Deque, String, Vec};

/// Which bus segment an event came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Scope {
    /// The bus the controller is wired to.
    Base,
    /// One multiplexer channel.
    Channel(u8),
}

impl core::fmt::Display for Scope {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Scope::Base => f.write_str("base"),
            Scope::Channel(ch) => write!(f, "ch{}", ch),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Appeared,
    Disappeared,
}

/// One change observed between two scans.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Event {
    pub scope: Scope,
    pub address: DeviceAddress,
    pub direction: Direction,
    pub at: Millis,
}

/// Longest diff a single call can produce (every address flips).
pub const MAX_DIFF_EVENTS: usize = 128;

/// Events turning `old` into `new`.
///
/// Appeared addresses first, then disappeared ones, each in ascending
/// address order.  Identical snapshots produce nothing.
pub fn diff(
    scope: Scope,
    new: &BusSnapshot,
    old: &BusSnapshot,
    at: Millis,
) -> Vec<Event, MAX_DIFF_EVENTS> {
    let mut out = Vec::new();
    let appeared = new.difference(old).iter().map(|address| Event {
        scope,
        address,
        direction: Direction::Appeared,
        at,
    });
    let disappeared = old.difference(new).iter().map(|address| Event {
        scope,
        address,
        direction: Direction::Disappeared,
        at,
    });
    // At most 128 distinct addresses across both halves, so this never overflows.
    for event in appeared.chain(disappeared) {
        let _ = out.push(event);
    }
    out
}

/// Last `N` events, oldest first.
pub struct EventLog<const N: usize> {
    events: Deque<Event, N>,
}

impl<const N: usize> EventLog<N> {
    pub const fn new() -> Self {
        Self {
            events: Deque::new(),
        }
    }

    /// Append, evicting the oldest entry when full.
    pub fn push(&mut self, event: Event) {
        if self.events.is_full() {
            self.events.pop_front();
        }
        // Cannot fail: a slot was freed above.
        let _ = self.events.push_back(event);
    }

    pub fn extend<I: IntoIterator<Item = Event>>(&mut self, events: I) {
        for event in events {
            self.push(event);
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        N
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Event> + '_ {
        self.events.iter()
    }

    /// The most recent event, if any.
    pub fn latest(&self) -> Option<&Event> {
        self.events.back()
    }
}

impl<const N: usize> Default for EventLog<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Render an event as a feed line: `[    5s] ch2 +0x62 SCD4x (CO2L)`.
///
/// Text that does not fit the line buffer is cut off.
pub fn format_event<const L: usize>(event: &Event) -> String<L> {
    let mut line = String::new();
    let sign = match event.direction {
        Direction::Appeared => '+',
        Direction::Disappeared => '-',
    };
    let _ = write!(
        line,
        "[{:>5}s] {} {}0x{:02X}",
        event.at.as_secs(),
        event.scope,
        sign,
        event.address.get()
    );
    if let Some(tag) = name_for(event.address) {
        let _ = write!(line, " {}", tag);
    }
    line
}
