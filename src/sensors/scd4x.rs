//! Sensirion SCD4x (M5Stack Unit CO2L) driver.
//!
//! Commands are 16-bit big-endian words; every 16-bit response word is
//! followed by a CRC-8 byte.

use super::{Co2Reading, Co2Sensor};
use crate::bus::{BusTransport, DeviceAddress};
use crate::error::SensorError;
use embedded_hal::delay::DelayNs;

const CMD_START_PERIODIC: u16 = 0x21B1;
const CMD_STOP_PERIODIC: u16 = 0x3F86;
const CMD_DATA_READY: u16 = 0xE4B8;
const CMD_READ_MEASUREMENT: u16 = 0xEC05;

/// Time the sensor needs between a read command and the response (ms).
const CMD_EXEC_MS: u32 = 1;
/// Time `stop_periodic_measurement` takes to complete (ms).
const STOP_MS: u32 = 500;

/// Sensirion CRC-8: polynomial 0x31, init 0xFF, no reflection.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0xFF;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            if crc & 0x80 != 0 {
                crc = (crc << 1) ^ 0x31;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

/// Check and strip CRC bytes from `raw` (3 bytes per word).
fn decode_words<const W: usize>(raw: &[u8]) -> Result<[u16; W], SensorError> {
    let mut out = [0u16; W];
    for (word, chunk) in out.iter_mut().zip(raw.chunks_exact(3)) {
        if crc8(&chunk[..2]) != chunk[2] {
            return Err(SensorError::Crc);
        }
        *word = u16::from_be_bytes([chunk[0], chunk[1]]);
    }
    Ok(out)
}

pub fn temperature_c(raw: u16) -> f32 {
    -45.0 + 175.0 * raw as f32 / 65535.0
}

pub fn humidity_pct(raw: u16) -> f32 {
    100.0 * raw as f32 / 65535.0
}

pub struct Scd4x<B, D> {
    bus: B,
    delay: D,
    addr: DeviceAddress,
}

impl<B: BusTransport, D: DelayNs> Scd4x<B, D> {
    pub fn new(bus: B, delay: D, addr: DeviceAddress) -> Self {
        Self { bus, delay, addr }
    }

    pub fn release(self) -> (B, D) {
        (self.bus, self.delay)
    }

    fn command(&mut self, cmd: u16) -> Result<(), SensorError> {
        self.bus.write(self.addr, &cmd.to_be_bytes())?;
        Ok(())
    }

    fn query<const W: usize>(&mut self, cmd: u16, raw: &mut [u8]) -> Result<[u16; W], SensorError> {
        self.command(cmd)?;
        self.delay.delay_ms(CMD_EXEC_MS);
        self.bus.read(self.addr, raw)?;
        decode_words::<W>(raw)
    }

    /// Restart measurements from a known state.
    ///
    /// A stop is sent first since the sensor keeps measuring across MCU
    /// resets and ignores most commands while it does.
    pub fn init(&mut self) -> Result<(), SensorError> {
        self.stop_periodic_measurement()?;
        self.start_periodic_measurement()
    }

    pub fn start_periodic_measurement(&mut self) -> Result<(), SensorError> {
        self.command(CMD_START_PERIODIC)
    }

    pub fn stop_periodic_measurement(&mut self) -> Result<(), SensorError> {
        self.command(CMD_STOP_PERIODIC)?;
        self.delay.delay_ms(STOP_MS);
        Ok(())
    }

    /// Low 11 bits of the status word are zero while no sample is pending.
    pub fn get_data_ready(&mut self) -> Result<bool, SensorError> {
        let mut raw = [0u8; 3];
        let [status] = self.query::<1>(CMD_DATA_READY, &mut raw)?;
        Ok(status & 0x07FF != 0)
    }

    pub fn read_measurement(&mut self) -> Result<Co2Reading, SensorError> {
        let mut raw = [0u8; 9];
        let [co2, t, rh] = self.query::<3>(CMD_READ_MEASUREMENT, &mut raw)?;
        // The sensor reports 0 ppm while it has no valid sample.
        if co2 == 0 {
            return Err(SensorError::NotReady);
        }
        Ok(Co2Reading {
            ppm: co2,
            temp_c: temperature_c(t),
            rh: humidity_pct(rh),
        })
    }
}

impl<B: BusTransport, D: DelayNs> Co2Sensor for Scd4x<B, D> {
    fn data_ready(&mut self) -> Result<bool, SensorError> {
        self.get_data_ready()
    }

    fn read(&mut self) -> Result<Co2Reading, SensorError> {
        self.read_measurement()
    }
}
