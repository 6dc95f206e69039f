//! Bus topology scanner - discovers devices on the base bus and behind
//! the PaHUB, and turns changes into events.
//!
//! Each [`Scanner::step`] is one full cycle: disconnect every channel,
//! scan the base bus, check the multiplexer is still there, walk its
//! channels, then diff every scope against the previous cycle.  Bus faults never escape a step; a segment
//! that could not be scanned reads as empty for that cycle.

use super::events::{diff, EventLog, Scope};
use super::{BusSnapshot, BusTransport, ChannelMap, DeviceAddress};
use crate::config::{CHANNEL_SETTLE_MS, MUX_MAX_CHANNELS, PAHUB_ADDR, PAHUB_CHANNELS, USE_PAHUB};
use crate::time::Millis;
use embedded_hal::delay::DelayNs;
use heapless::Vec;

/// Scanner tuning.
#[derive(Clone, Debug)]
pub struct ScannerConfig {
    /// Multiplexer address, or `None` when no hub is fitted.
    pub mux: Option<DeviceAddress>,
    /// Channels to walk, in order.
    pub channels: Vec<u8, MUX_MAX_CHANNELS>,
    /// Wait after selecting a channel before scanning it (ms).
    pub settle_ms: u32,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        let mux = if USE_PAHUB {
            DeviceAddress::new(PAHUB_ADDR)
        } else {
            None
        };
        Self {
            mux,
            channels: Vec::from_slice(&PAHUB_CHANNELS).unwrap_or_default(),
            settle_ms: CHANNEL_SETTLE_MS,
        }
    }
}

/// What the scanner saw last cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TopologyState {
    pub base: BusSnapshot,
    pub channels: ChannelMap,
    pub mux_present: bool,
}

pub struct Scanner {
    config: ScannerConfig,
    state: TopologyState,
}

impl Scanner {
    pub fn new(config: ScannerConfig) -> Self {
        Self {
            config,
            state: TopologyState::default(),
        }
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn state(&self) -> &TopologyState {
        &self.state
    }

    /// Everything responding on the base bus; empty on any fault.
    pub fn scan_base<B: BusTransport>(&self, bus: &mut B) -> BusSnapshot {
        match bus.scan() {
            Ok(found) => found,
            Err(e) => {
                debug!("base scan failed: {:?}", e);
                BusSnapshot::empty()
            }
        }
    }

    /// Whether the multiplexer acknowledges its address.
    pub fn probe_multiplexer_presence<B: BusTransport>(&self, bus: &mut B) -> bool {
        match self.config.mux {
            Some(mux) => bus.write(mux, &[]).is_ok(),
            None => false,
        }
    }

    /// Route the bus to `channel` (one-hot select mask).
    pub fn select_channel<B: BusTransport>(&self, bus: &mut B, channel: u8) -> bool {
        let Some(mux) = self.config.mux else {
            return false;
        };
        if channel as usize >= MUX_MAX_CHANNELS {
            return false;
        }
        bus.write(mux, &[1u8 << channel]).is_ok()
    }

    /// Disconnect every channel (all-zero select mask).
    pub fn disable_all_channels<B: BusTransport>(&self, bus: &mut B) {
        if let Some(mux) = self.config.mux {
            if let Err(e) = bus.write(mux, &[0x00]) {
                debug!("mux disable failed: {:?}", e);
            }
        }
    }

    /// Scan each channel in `channels` order.
    ///
    /// A channel that cannot be selected or scanned reads as empty.  The
    /// multiplexer's own address echoes through every channel and is
    /// removed.  All channels are disabled again afterwards.
    pub fn scan_all_channels<B: BusTransport, D: DelayNs>(
        &self,
        bus: &mut B,
        delay: &mut D,
        channels: &[u8],
    ) -> ChannelMap {
        let mut map = ChannelMap::empty();
        for &ch in channels {
            if !self.select_channel(bus, ch) {
                debug!("ch{} select failed", ch);
                continue;
            }
            delay.delay_ms(self.config.settle_ms);
            match bus.scan() {
                Ok(mut found) => {
                    if let Some(mux) = self.config.mux {
                        found.remove(mux);
                    }
                    map.set(ch, found);
                }
                Err(e) => debug!("ch{} scan failed: {:?}", ch, e),
            }
        }
        self.disable_all_channels(bus);
        map
    }

    /// One full scan cycle.
    ///
    /// Appends every change to `log` and returns how many events were
    /// produced.  When the multiplexer disappears, every device last seen
    /// behind it is reported gone before the channel map is cleared.
    pub fn step<B: BusTransport, D: DelayNs, const N: usize>(
        &mut self,
        bus: &mut B,
        delay: &mut D,
        now: Millis,
        log: &mut EventLog<N>,
    ) -> usize {
        // Sensor traffic between cycles may have left a channel routed.
        self.disable_all_channels(bus);
        let base = self.scan_base(bus);
        let mux_present = self.probe_multiplexer_presence(bus);

        let mut produced = 0;
        let base_events = diff(Scope::Base, &base, &self.state.base, now);
        produced += base_events.len();
        log.extend(base_events);

        let channels = if mux_present {
            let map = self.scan_all_channels(bus, delay, &self.config.channels);
            for &ch in self.config.channels.iter() {
                let events = diff(
                    Scope::Channel(ch),
                    &map.get(ch),
                    &self.state.channels.get(ch),
                    now,
                );
                produced += events.len();
                log.extend(events);
            }
            map
        } else {
            if self.state.mux_present {
                warn!("PaHUB no longer detected");
            }
            for &ch in self.config.channels.iter() {
                let old = self.state.channels.get(ch);
                if old.is_empty() {
                    continue;
                }
                let events = diff(Scope::Channel(ch), &BusSnapshot::empty(), &old, now);
                produced += events.len();
                log.extend(events);
            }
            ChannelMap::empty()
        };

        if mux_present && !self.state.mux_present {
            info!("PaHUB detected");
        }
        if produced > 0 {
            info!("topology changed: {} events", produced);
        }

        self.state = TopologyState {
            base,
            channels,
            mux_present,
        };
        produced
    }
}
