//! I²C bus subsystem.
//!
//! This module owns everything that talks to the two-wire bus:
//!
//! 1. **Transport** - [`BusTransport`] is the narrow seam the rest of the
//!    crate uses (scan / write / read).  [`I2cBus`] implements it over any
//!    `embedded-hal` I²C controller; [`ChannelBus`] routes it through one
//!    PaHUB channel.
//! 2. **Scanner** - enumerates the base bus and every multiplexer channel
//!    and diffs successive snapshots.
//! 3. **Events** - the bounded, timestamped appear/disappear feed.
//! 4. **Fingerprint** - best-effort names for well-known addresses.

pub mod events;
pub mod fingerprint;
pub mod scanner;

use crate::config::{MUX_MAX_CHANNELS, SCAN_FIRST_ADDR, SCAN_LAST_ADDR};
use crate::error::BusError;
use embedded_hal::i2c::{Error as _, ErrorKind, I2c};

/// A 7-bit bus address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceAddress(u8);

impl DeviceAddress {
    /// Returns `None` for values outside 0..=127.
    pub const fn new(raw: u8) -> Option<Self> {
        if raw <= 0x7F {
            Some(Self(raw))
        } else {
            None
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

/// Set of addresses seen on one bus segment at one instant.
///
/// Stored as a 128-bit mask, one bit per 7-bit address, so equality is set
/// equality and iteration is always in ascending address order.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusSnapshot {
    bits: u128,
}

impl BusSnapshot {
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    /// Build a snapshot from raw addresses; values above 127 are ignored.
    pub fn from_raw(addrs: &[u8]) -> Self {
        let mut s = Self::empty();
        for &a in addrs {
            if let Some(addr) = DeviceAddress::new(a) {
                s.insert(addr);
            }
        }
        s
    }

    pub fn insert(&mut self, addr: DeviceAddress) {
        self.bits |= 1u128 << addr.0;
    }

    pub fn remove(&mut self, addr: DeviceAddress) {
        self.bits &= !(1u128 << addr.0);
    }

    pub fn contains(&self, addr: DeviceAddress) -> bool {
        self.bits & (1u128 << addr.0) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Addresses in `self` but not in `other`.
    pub fn difference(&self, other: &BusSnapshot) -> BusSnapshot {
        BusSnapshot {
            bits: self.bits & !other.bits,
        }
    }

    /// Ascending iteration.
    pub fn iter(&self) -> SnapshotIter {
        SnapshotIter { bits: self.bits }
    }
}

impl core::fmt::Debug for BusSnapshot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set()
            .entries(self.iter().map(|a| a.get()))
            .finish()
    }
}

/// Iterator over a [`BusSnapshot`], lowest address first.
pub struct SnapshotIter {
    bits: u128,
}

impl Iterator for SnapshotIter {
    type Item = DeviceAddress;

    fn next(&mut self) -> Option<DeviceAddress> {
        if self.bits == 0 {
            return None;
        }
        let low = self.bits.trailing_zeros() as u8;
        self.bits &= self.bits - 1;
        Some(DeviceAddress(low))
    }
}

/// Per-channel snapshots behind the multiplexer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChannelMap {
    slots: [BusSnapshot; MUX_MAX_CHANNELS],
}

impl ChannelMap {
    pub const fn empty() -> Self {
        Self {
            slots: [BusSnapshot::empty(); MUX_MAX_CHANNELS],
        }
    }

    /// Snapshot for `channel`; out-of-range channels read as empty.
    pub fn get(&self, channel: u8) -> BusSnapshot {
        self.slots
            .get(channel as usize)
            .copied()
            .unwrap_or_default()
    }

    pub fn set(&mut self, channel: u8, snapshot: BusSnapshot) {
        if let Some(slot) = self.slots.get_mut(channel as usize) {
            *slot = snapshot;
        }
    }

    pub fn is_all_empty(&self) -> bool {
        self.slots.iter().all(|s| s.is_empty())
    }
}

/// The operations the crate needs from a bus.
///
/// Implementations must not panic on hardware faults; they report a
/// [`BusError`] and the caller decides how to degrade.
pub trait BusTransport {
    /// All addresses that acknowledge.
    fn scan(&mut self) -> Result<BusSnapshot, BusError>;

    fn write(&mut self, addr: DeviceAddress, bytes: &[u8]) -> Result<(), BusError>;

    fn read(&mut self, addr: DeviceAddress, buf: &mut [u8]) -> Result<(), BusError>;
}

impl<T: BusTransport + ?Sized> BusTransport for &mut T {
    fn scan(&mut self) -> Result<BusSnapshot, BusError> {
        (**self).scan()
    }

    fn write(&mut self, addr: DeviceAddress, bytes: &[u8]) -> Result<(), BusError> {
        (**self).write(addr, bytes)
    }

    fn read(&mut self, addr: DeviceAddress, buf: &mut [u8]) -> Result<(), BusError> {
        (**self).read(addr, buf)
    }
}

/// [`BusTransport`] over an `embedded-hal` I²C controller.
pub struct I2cBus<I> {
    i2c: I,
}

impl<I: I2c> I2cBus<I> {
    pub fn new(i2c: I) -> Self {
        Self { i2c }
    }

    /// Give the controller back.
    pub fn release(self) -> I {
        self.i2c
    }
}

impl<I: I2c> BusTransport for I2cBus<I> {
    /// Zero-length write to every non-reserved address.
    ///
    /// A NACK means "nobody home"; any other fault aborts the whole scan.
    fn scan(&mut self) -> Result<BusSnapshot, BusError> {
        let mut found = BusSnapshot::empty();
        for raw in SCAN_FIRST_ADDR..=SCAN_LAST_ADDR {
            match self.i2c.write(raw, &[]) {
                Ok(()) => found.insert(DeviceAddress(raw)),
                Err(e) => match e.kind() {
                    ErrorKind::NoAcknowledge(_) => {}
                    kind => return Err(kind.into()),
                },
            }
        }
        Ok(found)
    }

    fn write(&mut self, addr: DeviceAddress, bytes: &[u8]) -> Result<(), BusError> {
        self.i2c
            .write(addr.get(), bytes)
            .map_err(|e| BusError::from(e.kind()))
    }

    fn read(&mut self, addr: DeviceAddress, buf: &mut [u8]) -> Result<(), BusError> {
        self.i2c
            .read(addr.get(), buf)
            .map_err(|e| BusError::from(e.kind()))
    }
}

/// A view of the bus through one multiplexer channel.
///
/// Every transaction selects the channel first and disconnects all
/// channels afterwards, so the base bus never sees this channel's devices
/// between transactions.
pub struct ChannelBus<B> {
    bus: B,
    mux: DeviceAddress,
    channel: u8,
}

impl<B: BusTransport> ChannelBus<B> {
    pub fn new(bus: B, mux: DeviceAddress, channel: u8) -> Self {
        Self { bus, mux, channel }
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    fn select(&mut self) -> Result<(), BusError> {
        if self.channel as usize >= MUX_MAX_CHANNELS {
            return Err(BusError::Other);
        }
        self.bus.write(self.mux, &[1u8 << self.channel])
    }

    /// Run `op` with the channel selected, then deselect it.
    fn routed<T>(
        &mut self,
        op: impl FnOnce(&mut B) -> Result<T, BusError>,
    ) -> Result<T, BusError> {
        self.select()?;
        let result = op(&mut self.bus);
        if let Err(e) = self.bus.write(self.mux, &[0x00]) {
            debug!("ch{} deselect failed: {:?}", self.channel, e);
        }
        result
    }
}

impl<B: BusTransport> BusTransport for ChannelBus<B> {
    fn scan(&mut self) -> Result<BusSnapshot, BusError> {
        let mux = self.mux;
        let mut found = self.routed(|bus| bus.scan())?;
        found.remove(mux);
        Ok(found)
    }

    fn write(&mut self, addr: DeviceAddress, bytes: &[u8]) -> Result<(), BusError> {
        self.routed(|bus| bus.write(addr, bytes))
    }

    fn read(&mut self, addr: DeviceAddress, buf: &mut [u8]) -> Result<(), BusError> {
        self.routed(|bus| bus.read(addr, buf))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests (run on host, not embedded)
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use embedded_hal::i2c::{ErrorType, NoAcknowledgeSource, Operation};

    /// Minimal I²C controller: a fixed set of responding addresses.
    pub(crate) struct FakeI2c {
        pub present: BusSnapshot,
        pub fault_at: Option<u8>,
        pub writes: heapless::Vec<(u8, heapless::Vec<u8, 4>), 32>,
    }

    impl FakeI2c {
        pub fn with(addrs: &[u8]) -> Self {
            Self {
                present: BusSnapshot::from_raw(addrs),
                fault_at: None,
                writes: heapless::Vec::new(),
            }
        }
    }

    impl ErrorType for FakeI2c {
        type Error = ErrorKind;
    }

    impl I2c for FakeI2c {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            if self.fault_at == Some(address) {
                return Err(ErrorKind::Bus);
            }
            let addr = DeviceAddress::new(address).ok_or(ErrorKind::Other)?;
            if !self.present.contains(addr) {
                return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
            }
            for op in operations {
                match op {
                    Operation::Write(bytes) if !bytes.is_empty() => {
                        let data = heapless::Vec::from_slice(&bytes[..bytes.len().min(4)])
                            .unwrap_or_default();
                        let _ = self.writes.push((address, data));
                    }
                    Operation::Read(buf) => buf.fill(0xAB),
                    _ => {}
                }
            }
            Ok(())
        }
    }

    #[test]
    fn address_rejects_eight_bit_values() {
        assert!(DeviceAddress::new(0x7F).is_some());
        assert!(DeviceAddress::new(0x80).is_none());
    }

    #[test]
    fn snapshot_iterates_ascending() {
        let s = BusSnapshot::from_raw(&[0x77, 0x11, 0x62, 0x00, 0x7F]);
        let v: heapless::Vec<u8, 8> = s.iter().map(|a| a.get()).collect();
        assert_eq!(v.as_slice(), &[0x00, 0x11, 0x62, 0x77, 0x7F]);
        assert_eq!(s.len(), 5);
    }

    #[test]
    fn snapshot_equality_is_set_equality() {
        assert_eq!(
            BusSnapshot::from_raw(&[0x62, 0x77]),
            BusSnapshot::from_raw(&[0x77, 0x62, 0x62])
        );
        assert_ne!(BusSnapshot::from_raw(&[0x62]), BusSnapshot::empty());
    }

    #[test]
    fn snapshot_difference() {
        let a = BusSnapshot::from_raw(&[0x11, 0x62, 0x77]);
        let b = BusSnapshot::from_raw(&[0x62]);
        assert_eq!(a.difference(&b), BusSnapshot::from_raw(&[0x11, 0x77]));
        assert!(b.difference(&a).is_empty());
    }

    #[test]
    fn channel_map_ignores_out_of_range_channels() {
        let mut map = ChannelMap::empty();
        map.set(9, BusSnapshot::from_raw(&[0x62]));
        assert!(map.is_all_empty());
        map.set(2, BusSnapshot::from_raw(&[0x62]));
        assert_eq!(map.get(2), BusSnapshot::from_raw(&[0x62]));
        assert!(map.get(12).is_empty());
    }

    #[test]
    fn i2c_bus_scan_skips_reserved_addresses() {
        let mut bus = I2cBus::new(FakeI2c::with(&[0x03, 0x3C, 0x70, 0x78]));
        let found = bus.scan().unwrap();
        assert_eq!(found, BusSnapshot::from_raw(&[0x3C, 0x70]));
    }

    #[test]
    fn i2c_bus_scan_aborts_on_bus_fault() {
        let mut fake = FakeI2c::with(&[0x3C]);
        fake.fault_at = Some(0x20);
        let mut bus = I2cBus::new(fake);
        assert_eq!(bus.scan(), Err(BusError::Bus));
    }

    #[test]
    fn i2c_bus_write_to_absent_device_is_nack() {
        let mut bus = I2cBus::new(FakeI2c::with(&[]));
        let addr = DeviceAddress::new(0x62).unwrap();
        assert_eq!(bus.write(addr, &[0x01]), Err(BusError::Nack));
    }

    #[test]
    fn channel_bus_routes_each_transaction() {
        let mux = DeviceAddress::new(0x70).unwrap();
        let mut bus = I2cBus::new(FakeI2c::with(&[0x62, 0x70]));
        {
            let mut ch = ChannelBus::new(&mut bus, mux, 2);
            let found = ch.scan().unwrap();
            assert_eq!(found, BusSnapshot::from_raw(&[0x62]));
            ch.write(DeviceAddress::new(0x62).unwrap(), &[0x21, 0xB1])
                .unwrap();
        }
        let writes = &bus.release().writes;
        let seen: heapless::Vec<(u8, &[u8]), 8> =
            writes.iter().map(|(a, d)| (*a, d.as_slice())).collect();
        assert_eq!(
            seen.as_slice(),
            &[
                (0x70, &[0b0000_0100][..]),
                (0x70, &[0x00][..]),
                (0x70, &[0b0000_0100][..]),
                (0x62, &[0x21, 0xB1][..]),
                (0x70, &[0x00][..]),
            ]
        );
    }

    #[test]
    fn channel_bus_deselects_after_failed_transaction() {
        let mux = DeviceAddress::new(0x70).unwrap();
        let mut bus = I2cBus::new(FakeI2c::with(&[0x70]));
        {
            let mut ch = ChannelBus::new(&mut bus, mux, 0);
            let mut buf = [0u8; 3];
            assert_eq!(
                ch.read(DeviceAddress::new(0x62).unwrap(), &mut buf),
                Err(BusError::Nack)
            );
        }
        let writes = &bus.release().writes;
        assert_eq!(writes.last().map(|(a, d)| (*a, d.as_slice())), Some((0x70, &[0x00][..])));
    }
}
