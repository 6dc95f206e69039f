//! Best-effort names for well-known addresses.
//!
//! Many parts share an address, so a name is a hint, not an identification.

use core::fmt::Write;

use super::{BusSnapshot, DeviceAddress};
use heapless::String;

const FINGERPRINTS: &[(u8, &str)] = &[
    (0x11, "Unit MQ (Default)"),
    (0x20, "PCF8574 (IO expander)"),
    (0x21, "PCF8574 (IO expander)"),
    (0x23, "BH1750 (Light)"),
    (0x27, "LCD Backpack (PCF8574)"),
    (0x29, "TCS34725/VL53L0X (Color/ToF)"),
    (0x3C, "SSD1306 OLED"),
    (0x40, "INA219 / SI7021 / PCA9685"),
    (0x44, "SHT3x (Temp/Hum)"),
    (0x45, "SHT3x (Temp/Hum alt)"),
    (0x48, "ADS1115 / LM75"),
    (0x4A, "MCP4725 (DAC)"),
    (0x57, "MAX3010x (Pulse/Ox)"),
    (0x58, "SGP30 (Air Quality)"),
    (0x59, "SGP41 (Air Quality)"),
    (0x5A, "MLX90614 (IR Temp)"),
    (0x5C, "QMP6988 (Pressure)"),
    (0x60, "MCP4725/MCP23008 (varies)"),
    (0x62, "SCD4x (CO2L)"),
    (0x68, "MPU6050/RTC/IMU"),
    (0x69, "MPU/ICM IMU (alt)"),
    (0x6A, "IMU (MPU6886/ICM)"),
    (0x70, "PaHUB"),
    (0x76, "BME280/BMP280"),
    (0x77, "ENV Pro"),
];

/// Name hint for `addr`, if it is a commonly seen part.
pub fn name_for(addr: DeviceAddress) -> Option<&'static str> {
    FINGERPRINTS
        .binary_search_by_key(&addr.get(), |&(a, _)| a)
        .ok()
        .map(|i| FINGERPRINTS[i].1)
}

/// `[0x62 (SCD4x (CO2L)), 0x77 (ENV Pro)]`, or `[]` when empty.
///
/// Cut off at the buffer capacity; the closing bracket is dropped then.
pub fn format_snapshot<const L: usize>(snapshot: &BusSnapshot) -> String<L> {
    let mut out = String::new();
    let _ = out.push('[');
    for (i, addr) in snapshot.iter().enumerate() {
        let sep = if i == 0 { "" } else { ", " };
        let ok = match name_for(addr) {
            Some(tag) => write!(out, "{}0x{:02X} ({})", sep, addr.get(), tag),
            None => write!(out, "{}0x{:02X}", sep, addr.get()),
        };
        if ok.is_err() {
            return out;
        }
    }
    let _ = out.push(']');
    out
}
