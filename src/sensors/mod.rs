//! Sensor units polled by the dashboard.
//!
//! Each unit kind is a trait so the dashboard can hold either a real driver
//! or [`NoUnit`] when nothing is fitted on that PaHUB channel.

pub mod bme688;
pub mod scd4x;
pub mod unit_mq;

use crate::error::SensorError;
use embedded_graphics::pixelcolor::{Rgb565, Rgb888};

/// One CO2L (SCD4x) measurement.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Co2Reading {
    pub ppm: u16,
    pub temp_c: f32,
    pub rh: f32,
}

/// One ENV Pro measurement.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EnvReading {
    pub temp_c: f32,
    pub rh: f32,
    pub pressure_hpa: f32,
    /// Gas resistance (Ohm), when the unit reports one.
    pub gas_ohm: Option<f32>,
}

/// One Unit MQ measurement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MqReading {
    pub valid: bool,
    pub adc8: u8,
    pub adc12: u16,
}

/// A CO2 unit with a data-ready flag.
pub trait Co2Sensor {
    fn data_ready(&mut self) -> Result<bool, SensorError>;
    fn read(&mut self) -> Result<Co2Reading, SensorError>;
}

/// A temperature / humidity / pressure unit.
pub trait EnvSensor {
    fn read(&mut self) -> Result<EnvReading, SensorError>;
}

/// A gas (MQ) unit.
pub trait GasSensor {
    fn read(&mut self) -> Result<MqReading, SensorError>;
}

/// Placeholder type for a unit that is not fitted.
///
/// It has no values, so `Option<NoUnit>` is always `None`.
#[derive(Debug)]
pub enum NoUnit {}

impl Co2Sensor for NoUnit {
    fn data_ready(&mut self) -> Result<bool, SensorError> {
        match *self {}
    }

    fn read(&mut self) -> Result<Co2Reading, SensorError> {
        match *self {}
    }
}

impl EnvSensor for NoUnit {
    fn read(&mut self) -> Result<EnvReading, SensorError> {
        match *self {}
    }
}

impl GasSensor for NoUnit {
    fn read(&mut self) -> Result<MqReading, SensorError> {
        match *self {}
    }
}

// CO2 bands

/// Indoor air quality band for a CO2 concentration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Co2Band {
    Good,
    Fair,
    Poor,
    VeryPoor,
    Unknown,
}

impl Co2Band {
    pub fn label(self) -> &'static str {
        match self {
            Co2Band::Good => "Good",
            Co2Band::Fair => "Fair",
            Co2Band::Poor => "Poor",
            Co2Band::VeryPoor => "Very Poor",
            Co2Band::Unknown => "Unknown",
        }
    }

    /// Text colour used for the reading.
    pub fn color(self) -> Rgb565 {
        let (r, g, b) = match self {
            Co2Band::Good => (0x22, 0xCC, 0x22),
            Co2Band::Fair => (0xE6, 0xA6, 0x00),
            Co2Band::Poor => (0xCC, 0x55, 0x22),
            Co2Band::VeryPoor => (0xCC, 0x22, 0x33),
            Co2Band::Unknown => (0x88, 0x88, 0x88),
        };
        Rgb888::new(r, g, b).into()
    }
}

pub fn co2_band(ppm: u16) -> Co2Band {
    match ppm {
        0..=799 => Co2Band::Good,
        800..=1199 => Co2Band::Fair,
        1200..=1999 => Co2Band::Poor,
        2000..=4999 => Co2Band::VeryPoor,
        _ => Co2Band::Unknown,
    }
}
