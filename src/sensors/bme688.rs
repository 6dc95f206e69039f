//! Bosch BME688 (M5Stack ENV Pro) driver.
//!
//! Measurements run in forced mode and are pipelined: each [`Bme688::read`]
//! collects the finished measurement and immediately starts the next, so
//! the poll loop never waits out the heater profile.
//!
//! Compensation follows Bosch's floating-point reference formulas.

use super::{EnvReading, EnvSensor};
use crate::bus::{BusTransport, DeviceAddress};
use crate::error::SensorError;
use embedded_hal::delay::DelayNs;

pub const CHIP_ID: u8 = 0x61;
/// Variant id of the BME688 (the BME680 reads 0x00).
pub const VARIANT_BME688: u8 = 0x01;

const REG_COEFF3: u8 = 0x00;
const REG_FIELD0: u8 = 0x1D;
const REG_RES_HEAT0: u8 = 0x5A;
const REG_GAS_WAIT0: u8 = 0x64;
const REG_CTRL_GAS0: u8 = 0x70;
const REG_CTRL_GAS1: u8 = 0x71;
const REG_CTRL_HUM: u8 = 0x72;
const REG_CTRL_MEAS: u8 = 0x74;
const REG_CONFIG: u8 = 0x75;
const REG_COEFF1: u8 = 0x8A;
const REG_CHIP_ID: u8 = 0xD0;
const REG_SOFT_RESET: u8 = 0xE0;
const REG_COEFF2: u8 = 0xE1;
const REG_VARIANT: u8 = 0xF0;

const SOFT_RESET_CMD: u8 = 0xB6;
const RESET_MS: u32 = 10;

const COEFF1_LEN: usize = 23;
const COEFF2_LEN: usize = 14;
const COEFF3_LEN: usize = 5;
pub const COEFF_LEN: usize = COEFF1_LEN + COEFF2_LEN + COEFF3_LEN;
const FIELD_LEN: usize = 17;

const MODE_FORCED: u8 = 0b01;
const RUN_GAS_BME688: u8 = 0x20;

const STATUS_NEW_DATA: u8 = 0x80;
const STATUS_GAS_MEASURING: u8 = 0x40;
const STATUS_MEASURING: u8 = 0x20;
const GAS_VALID: u8 = 0x20;
const HEAT_STABLE: u8 = 0x10;

/// Oversampling for one of the T/P/H channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Oversampling {
    Skip = 0,
    X1 = 1,
    X2 = 2,
    X4 = 3,
    X8 = 4,
    X16 = 5,
}

impl Oversampling {
    /// ADC conversion cycles the setting costs.
    fn cycles(self) -> u32 {
        match self {
            Oversampling::Skip => 0,
            Oversampling::X1 => 1,
            Oversampling::X2 => 2,
            Oversampling::X4 => 4,
            Oversampling::X8 => 8,
            Oversampling::X16 => 16,
        }
    }
}

/// IIR filter coefficient (register code).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Filter {
    Off = 0,
    Size1 = 1,
    Size3 = 2,
    Size7 = 3,
    Size15 = 4,
}

/// Measurement profile.
#[derive(Clone, Copy, Debug)]
pub struct Settings {
    pub temperature: Oversampling,
    pub pressure: Oversampling,
    pub humidity: Oversampling,
    pub filter: Filter,
    /// Hot plate target (°C, capped at 400).
    pub heater_c: u16,
    /// Hot plate dwell time (ms).
    pub heater_ms: u16,
    /// Ambient temperature assumed for the heater set point (°C).
    pub ambient_c: i8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            temperature: Oversampling::X8,
            pressure: Oversampling::X4,
            humidity: Oversampling::X2,
            filter: Filter::Size3,
            heater_c: 320,
            heater_ms: 150,
            ambient_c: 25,
        }
    }
}

impl Settings {
    /// Time from trigger until the measurement is readable (ms).
    pub fn profile_ms(&self) -> u32 {
        let cycles =
            self.temperature.cycles() + self.pressure.cycles() + self.humidity.cycles();
        // 1963 us per cycle, TPH switching and gas set-up, rounded, plus wake-up.
        let tph_us = cycles * 1963 + 477 * 4 + 477 * 5;
        (tph_us + 500) / 1000 + 1 + self.heater_ms as u32
    }
}

/// `gas_wait` register encoding: 6-bit value times a 4^n multiplier.
pub fn gas_wait_code(ms: u16) -> u8 {
    if ms >= 0x0FC0 {
        return 0xFF;
    }
    let mut ms = ms;
    let mut factor = 0u8;
    while ms > 0x3F {
        ms /= 4;
        factor += 1;
    }
    ms as u8 + factor * 64
}

/// Gas resistance (Ohm) from the BME688 gas ADC and range.
pub fn gas_resistance(adc: u16, range: u8) -> f32 {
    let var1 = (262_144u32 >> (range & 0x0F)) as f32;
    let var2 = 4096.0 + (adc as f32 - 512.0) * 3.0;
    1_000_000.0 * var1 / var2
}

/// Factory trimming read from the three coefficient blocks.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Calibration {
    pub t1: u16,
    pub t2: i16,
    pub t3: i8,
    pub p1: u16,
    pub p2: i16,
    pub p3: i8,
    pub p4: i16,
    pub p5: i16,
    pub p6: i8,
    pub p7: i8,
    pub p8: i16,
    pub p9: i16,
    pub p10: u8,
    pub h1: u16,
    pub h2: u16,
    pub h3: i8,
    pub h4: i8,
    pub h5: i8,
    pub h6: u8,
    pub h7: i8,
    pub gh1: i8,
    pub gh2: i16,
    pub gh3: i8,
    pub res_heat_val: i8,
    pub res_heat_range: u8,
}

impl Calibration {
    /// Parse the blocks at 0x8A, 0xE1 and 0x00, concatenated in that order.
    pub fn from_bytes(c: &[u8; COEFF_LEN]) -> Self {
        let u16le = |i: usize| u16::from_le_bytes([c[i], c[i + 1]]);
        let i16le = |i: usize| i16::from_le_bytes([c[i], c[i + 1]]);
        Self {
            t1: u16le(31),
            t2: i16le(0),
            t3: c[2] as i8,
            p1: u16le(4),
            p2: i16le(6),
            p3: c[8] as i8,
            p4: i16le(10),
            p5: i16le(12),
            p6: c[15] as i8,
            p7: c[14] as i8,
            p8: i16le(18),
            p9: i16le(20),
            p10: c[22],
            h1: (c[25] as u16) << 4 | (c[24] & 0x0F) as u16,
            h2: (c[23] as u16) << 4 | (c[24] >> 4) as u16,
            h3: c[26] as i8,
            h4: c[27] as i8,
            h5: c[28] as i8,
            h6: c[29],
            h7: c[30] as i8,
            gh1: c[35] as i8,
            gh2: i16le(33),
            gh3: c[36] as i8,
            res_heat_val: c[37] as i8,
            res_heat_range: (c[39] & 0x30) >> 4,
        }
    }

    /// Temperature (°C) and the `t_fine` term the other channels need.
    pub fn temperature(&self, adc: u32) -> (f32, f32) {
        let adc = adc as f32;
        let t1 = self.t1 as f32;
        let var1 = (adc / 16384.0 - t1 / 1024.0) * self.t2 as f32;
        let d = adc / 131072.0 - t1 / 8192.0;
        let var2 = d * d * (self.t3 as f32 * 16.0);
        let t_fine = var1 + var2;
        (t_fine / 5120.0, t_fine)
    }

    /// Pressure (Pa).
    pub fn pressure(&self, adc: u32, t_fine: f32) -> f32 {
        let mut var1 = t_fine / 2.0 - 64000.0;
        let mut var2 = var1 * var1 * (self.p6 as f32 / 131072.0);
        var2 += var1 * self.p5 as f32 * 2.0;
        var2 = var2 / 4.0 + self.p4 as f32 * 65536.0;
        var1 = (self.p3 as f32 * var1 * var1 / 16384.0 + self.p2 as f32 * var1) / 524288.0;
        var1 = (1.0 + var1 / 32768.0) * self.p1 as f32;
        if var1 as i32 == 0 {
            return 0.0;
        }
        let mut p = 1048576.0 - adc as f32;
        p = (p - var2 / 4096.0) * 6250.0 / var1;
        let var1 = self.p9 as f32 * p * p / 2147483648.0;
        let var2 = p * (self.p8 as f32 / 32768.0);
        let q = p / 256.0;
        let var3 = q * q * q * (self.p10 as f32 / 131072.0);
        p + (var1 + var2 + var3 + self.p7 as f32 * 128.0) / 16.0
    }

    /// Relative humidity (%), clamped to 0..=100.
    pub fn humidity(&self, adc: u16, temp_c: f32) -> f32 {
        let var1 = adc as f32 - (self.h1 as f32 * 16.0 + self.h3 as f32 / 2.0 * temp_c);
        let var2 = var1
            * (self.h2 as f32 / 262144.0
                * (1.0
                    + self.h4 as f32 / 16384.0 * temp_c
                    + self.h5 as f32 / 1048576.0 * temp_c * temp_c));
        let var3 = self.h6 as f32 / 16384.0;
        let var4 = self.h7 as f32 / 2097152.0;
        (var2 + (var3 + var4 * temp_c) * var2 * var2).clamp(0.0, 100.0)
    }

    /// `res_heat` register value for a hot plate target.
    pub fn heater_code(&self, target_c: u16, ambient_c: i8) -> u8 {
        let target = target_c.min(400) as f32;
        let var1 = self.gh1 as f32 / 16.0 + 49.0;
        let var2 = self.gh2 as f32 / 32768.0 * 0.0005 + 0.00235;
        let var3 = self.gh3 as f32 / 1024.0;
        let var4 = var1 * (1.0 + var2 * target);
        let var5 = var4 + var3 * ambient_c as f32;
        let range = 4.0 / (4.0 + self.res_heat_range as f32);
        let val = 1.0 / (1.0 + self.res_heat_val as f32 * 0.002);
        (3.4 * (var5 * range * val - 25.0)) as u8
    }
}

/// Raw ADC words from one field read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Field {
    status: u8,
    temperature: u32,
    pressure: u32,
    humidity: u16,
    gas_adc: u16,
    gas_range: u8,
    gas_flags: u8,
}

impl Field {
    fn parse(b: &[u8; FIELD_LEN]) -> Self {
        let adc20 = |i: usize| (b[i] as u32) << 12 | (b[i + 1] as u32) << 4 | (b[i + 2] as u32) >> 4;
        Self {
            status: b[0],
            pressure: adc20(2),
            temperature: adc20(5),
            humidity: u16::from_be_bytes([b[8], b[9]]),
            gas_adc: (b[15] as u16) << 2 | (b[16] >> 6) as u16,
            gas_range: b[16] & 0x0F,
            gas_flags: b[16] & (GAS_VALID | HEAT_STABLE),
        }
    }
}

pub struct Bme688<B, D> {
    bus: B,
    delay: D,
    addr: DeviceAddress,
    settings: Settings,
    calib: Calibration,
    variant: u8,
}

impl<B: BusTransport, D: DelayNs> Bme688<B, D> {
    pub fn new(bus: B, delay: D, addr: DeviceAddress, settings: Settings) -> Self {
        Self {
            bus,
            delay,
            addr,
            settings,
            calib: Calibration::default(),
            variant: 0,
        }
    }

    pub fn release(self) -> (B, D) {
        (self.bus, self.delay)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calib
    }

    fn read_regs(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), SensorError> {
        self.bus.write(self.addr, &[reg])?;
        self.bus.read(self.addr, buf)?;
        Ok(())
    }

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), SensorError> {
        self.bus.write(self.addr, &[reg, value])?;
        Ok(())
    }

    /// Reset, identify, load calibration, apply the profile and start the
    /// first measurement.
    pub fn init(&mut self) -> Result<(), SensorError> {
        self.write_reg(REG_SOFT_RESET, SOFT_RESET_CMD)?;
        self.delay.delay_ms(RESET_MS);

        let mut id = [0u8];
        self.read_regs(REG_CHIP_ID, &mut id)?;
        if id[0] != CHIP_ID {
            return Err(SensorError::UnknownChip(id[0]));
        }
        let mut variant = [0u8];
        self.read_regs(REG_VARIANT, &mut variant)?;
        self.variant = variant[0];

        let mut coeff = [0u8; COEFF_LEN];
        self.read_regs(REG_COEFF1, &mut coeff[..COEFF1_LEN])?;
        self.read_regs(REG_COEFF2, &mut coeff[COEFF1_LEN..COEFF1_LEN + COEFF2_LEN])?;
        self.read_regs(REG_COEFF3, &mut coeff[COEFF1_LEN + COEFF2_LEN..])?;
        self.calib = Calibration::from_bytes(&coeff);

        self.configure()?;
        self.trigger()
    }

    fn configure(&mut self) -> Result<(), SensorError> {
        let s = self.settings;
        // ctrl_hum only takes effect on the next ctrl_meas write.
        self.write_reg(REG_CTRL_HUM, s.humidity as u8)?;
        self.write_reg(REG_CONFIG, (s.filter as u8) << 2)?;
        self.write_reg(REG_CTRL_MEAS, self.ctrl_meas(false))?;
        let heat = self.calib.heater_code(s.heater_c, s.ambient_c);
        self.write_reg(REG_RES_HEAT0, heat)?;
        self.write_reg(REG_GAS_WAIT0, gas_wait_code(s.heater_ms))?;
        self.write_reg(REG_CTRL_GAS0, 0x00)?;
        let run_gas = if self.is_bme688() { RUN_GAS_BME688 } else { 0 };
        self.write_reg(REG_CTRL_GAS1, run_gas)
    }

    fn ctrl_meas(&self, forced: bool) -> u8 {
        let s = self.settings;
        let mode = if forced { MODE_FORCED } else { 0 };
        (s.temperature as u8) << 5 | (s.pressure as u8) << 2 | mode
    }

    /// Start one forced-mode measurement.
    pub fn trigger(&mut self) -> Result<(), SensorError> {
        self.write_reg(REG_CTRL_MEAS, self.ctrl_meas(true))
    }

    /// Gas readings are only decoded on the BME688.
    pub fn is_bme688(&self) -> bool {
        self.variant == VARIANT_BME688
    }

    /// Collect the finished measurement and start the next one.
    ///
    /// `NotReady` while a measurement is still running.  A sensor found
    /// idle with nothing to report is re-triggered.
    pub fn read_measurement(&mut self) -> Result<EnvReading, SensorError> {
        let mut raw = [0u8; FIELD_LEN];
        self.read_regs(REG_FIELD0, &mut raw)?;
        let field = Field::parse(&raw);

        if field.status & STATUS_NEW_DATA == 0 {
            if field.status & (STATUS_MEASURING | STATUS_GAS_MEASURING) == 0 {
                self.trigger()?;
            }
            return Err(SensorError::NotReady);
        }

        let (temp_c, t_fine) = self.calib.temperature(field.temperature);
        let pressure_hpa = self.calib.pressure(field.pressure, t_fine) / 100.0;
        let rh = self.calib.humidity(field.humidity, temp_c);
        let gas_ok = field.gas_flags == GAS_VALID | HEAT_STABLE;
        let gas_ohm = (self.is_bme688() && gas_ok)
            .then(|| gas_resistance(field.gas_adc, field.gas_range));

        self.trigger()?;
        Ok(EnvReading {
            temp_c,
            rh,
            pressure_hpa,
            gas_ohm,
        })
    }
}

impl<B: BusTransport, D: DelayNs> EnvSensor for Bme688<B, D> {
    fn read(&mut self) -> Result<EnvReading, SensorError> {
        self.read_measurement()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::BusSnapshot;
    use crate::error::BusError;
    use heapless::Vec;

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    /// Register file: a one-byte write sets the pointer, longer writes are
    /// (register, value) pairs, reads auto-increment from the pointer.
    struct FakeBme {
        regs: [u8; 256],
        pointer: u8,
        writes: Vec<(u8, u8), 32>,
    }

    impl FakeBme {
        fn new() -> Self {
            let mut regs = [0u8; 256];
            regs[REG_CHIP_ID as usize] = CHIP_ID;
            regs[REG_VARIANT as usize] = VARIANT_BME688;
            let c = coefficients();
            regs[0x8A..0x8A + COEFF1_LEN].copy_from_slice(&c[..COEFF1_LEN]);
            regs[0xE1..0xE1 + COEFF2_LEN].copy_from_slice(&c[COEFF1_LEN..COEFF1_LEN + COEFF2_LEN]);
            regs[..COEFF3_LEN].copy_from_slice(&c[COEFF1_LEN + COEFF2_LEN..]);
            Self {
                regs,
                pointer: 0,
                writes: Vec::new(),
            }
        }

        /// Publish a finished measurement in the field registers.
        fn publish(&mut self, temp: u32, press: u32, hum: u16, gas: u16, range: u8) {
            let f = &mut self.regs[REG_FIELD0 as usize..REG_FIELD0 as usize + FIELD_LEN];
            f.fill(0);
            f[0] = STATUS_NEW_DATA;
            f[2] = (press >> 12) as u8;
            f[3] = (press >> 4) as u8;
            f[4] = ((press & 0x0F) << 4) as u8;
            f[5] = (temp >> 12) as u8;
            f[6] = (temp >> 4) as u8;
            f[7] = ((temp & 0x0F) << 4) as u8;
            f[8..10].copy_from_slice(&hum.to_be_bytes());
            f[15] = (gas >> 2) as u8;
            f[16] = ((gas & 0x03) << 6) as u8 | GAS_VALID | HEAT_STABLE | range;
        }

        fn triggers(&self) -> usize {
            self.writes
                .iter()
                .filter(|&&(r, v)| r == REG_CTRL_MEAS && v & 0x03 == MODE_FORCED)
                .count()
        }
    }

    impl BusTransport for FakeBme {
        fn scan(&mut self) -> Result<BusSnapshot, BusError> {
            Ok(BusSnapshot::from_raw(&[0x77]))
        }

        fn write(&mut self, _addr: DeviceAddress, bytes: &[u8]) -> Result<(), BusError> {
            if let [reg] = bytes {
                self.pointer = *reg;
                return Ok(());
            }
            for pair in bytes.chunks_exact(2) {
                self.regs[pair[0] as usize] = pair[1];
                let _ = self.writes.push((pair[0], pair[1]));
            }
            Ok(())
        }

        fn read(&mut self, _addr: DeviceAddress, buf: &mut [u8]) -> Result<(), BusError> {
            let start = self.pointer as usize;
            buf.copy_from_slice(&self.regs[start..start + buf.len()]);
            Ok(())
        }
    }

    /// A plausible trimming set, laid out as the three register blocks.
    fn coefficients() -> [u8; COEFF_LEN] {
        let mut c = [0u8; COEFF_LEN];
        c[0..2].copy_from_slice(&26469i16.to_le_bytes());
        c[2] = 3;
        c[4..6].copy_from_slice(&36356u16.to_le_bytes());
        c[6..8].copy_from_slice(&(-10362i16).to_le_bytes());
        c[8] = 88;
        c[10..12].copy_from_slice(&7143i16.to_le_bytes());
        c[12..14].copy_from_slice(&(-82i16).to_le_bytes());
        c[14] = 34;
        c[15] = 30;
        c[18..20].copy_from_slice(&(-4179i16).to_le_bytes());
        c[20..22].copy_from_slice(&(-3029i16).to_le_bytes());
        c[22] = 30;
        // h1 = 0x322, h2 = 0x402 share byte 24
        c[23] = 0x40;
        c[24] = 0x22;
        c[25] = 0x32;
        c[26] = 0;
        c[27] = 45;
        c[28] = 20;
        c[29] = 120;
        c[30] = (-100i8) as u8;
        c[31..33].copy_from_slice(&25989u16.to_le_bytes());
        c[33..35].copy_from_slice(&(-10579i16).to_le_bytes());
        c[35] = (-39i8) as u8;
        c[36] = 18;
        c[37] = 42;
        c[39] = 0x10;
        c
    }

    fn sensor() -> Bme688<FakeBme, NoDelay> {
        Bme688::new(FakeBme::new(), NoDelay, DeviceAddress::new(0x77).unwrap(), Settings::default())
    }

    fn close(a: f32, b: f32, tol: f32) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn calibration_unpacks_split_humidity_words() {
        let cal = Calibration::from_bytes(&coefficients());
        assert_eq!(cal.t1, 25989);
        assert_eq!(cal.p2, -10362);
        assert_eq!(cal.h1, 802);
        assert_eq!(cal.h2, 1026);
        assert_eq!(cal.h7, -100);
        assert_eq!(cal.gh1, -39);
        assert_eq!(cal.gh2, -10579);
        assert_eq!(cal.res_heat_range, 1);
    }

    #[test]
    fn heater_and_wait_encodings() {
        let cal = Calibration::from_bytes(&coefficients());
        assert_eq!(cal.heater_code(320, 25), 114);
        assert_eq!(gas_wait_code(150), 0x65);
        assert_eq!(gas_wait_code(40), 40);
        assert_eq!(gas_wait_code(5_000), 0xFF);
    }

    #[test]
    fn default_profile_duration() {
        // T8 + P4 + H2 = 14 cycles -> 33 ms, plus 150 ms on the hot plate
        assert_eq!(Settings::default().profile_ms(), 183);
    }

    #[test]
    fn init_configures_and_triggers() {
        let mut s = sensor();
        s.init().unwrap();
        assert!(s.is_bme688());
        assert_eq!(s.calibration().p1, 36356);
        let (fake, _) = s.release();
        let w = fake.writes.as_slice();
        assert_eq!(w[0], (REG_SOFT_RESET, SOFT_RESET_CMD));
        assert!(w.contains(&(REG_CTRL_HUM, Oversampling::X2 as u8)));
        assert!(w.contains(&(REG_CONFIG, 0b0000_1000)));
        assert!(w.contains(&(REG_RES_HEAT0, 114)));
        assert!(w.contains(&(REG_GAS_WAIT0, 0x65)));
        assert!(w.contains(&(REG_CTRL_GAS1, RUN_GAS_BME688)));
        // osrs_t 8x, osrs_p 4x, forced
        assert_eq!(w.last(), Some(&(REG_CTRL_MEAS, 0b1000_1101)));
        assert_eq!(fake.triggers(), 1);
    }

    #[test]
    fn wrong_chip_id_is_rejected() {
        let mut fake = FakeBme::new();
        fake.regs[REG_CHIP_ID as usize] = 0x58;
        let mut s = Bme688::new(fake, NoDelay, DeviceAddress::new(0x77).unwrap(), Settings::default());
        assert_eq!(s.init(), Err(SensorError::UnknownChip(0x58)));
    }

    #[test]
    fn measurement_is_compensated_and_next_one_started() {
        let mut s = sensor();
        s.init().unwrap();
        s.bus.publish(514_000, 380_000, 22_000, 700, 5);

        let r = s.read().unwrap();
        assert!(close(r.temp_c, 30.98, 0.02), "temp {}", r.temp_c);
        assert!(close(r.pressure_hpa, 956.44, 0.1), "press {}", r.pressure_hpa);
        assert!(close(r.rh, 48.76, 0.05), "rh {}", r.rh);
        let gas = r.gas_ohm.unwrap();
        assert!(close(gas, 1_757_940.0, 50.0), "gas {}", gas);
        assert_eq!(s.bus.triggers(), 2);
    }

    #[test]
    fn busy_sensor_is_not_ready_and_idle_one_is_retriggered() {
        let mut s = sensor();
        s.init().unwrap();

        s.bus.regs[REG_FIELD0 as usize] = STATUS_MEASURING;
        assert_eq!(s.read(), Err(SensorError::NotReady));
        assert_eq!(s.bus.triggers(), 1);

        s.bus.regs[REG_FIELD0 as usize] = 0;
        assert_eq!(s.read(), Err(SensorError::NotReady));
        assert_eq!(s.bus.triggers(), 2);
    }

    #[test]
    fn unstable_heater_gives_no_gas_value() {
        let mut s = sensor();
        s.init().unwrap();
        s.bus.publish(514_000, 380_000, 22_000, 512, 4);
        s.bus.regs[REG_FIELD0 as usize + 16] &= !HEAT_STABLE;
        assert_eq!(s.read().unwrap().gas_ohm, None);
    }

    #[test]
    fn gas_resistance_by_range() {
        assert_eq!(gas_resistance(512, 4), 4_000_000.0);
        assert!(close(gas_resistance(700, 5), 1_757_940.0, 50.0));
    }

    #[test]
    fn bus_errors_propagate() {
        struct Dead;
        impl BusTransport for Dead {
            fn scan(&mut self) -> Result<BusSnapshot, BusError> {
                Err(BusError::Bus)
            }
            fn write(&mut self, _: DeviceAddress, _: &[u8]) -> Result<(), BusError> {
                Err(BusError::Nack)
            }
            fn read(&mut self, _: DeviceAddress, _: &mut [u8]) -> Result<(), BusError> {
                Err(BusError::Nack)
            }
        }
        let mut s = Bme688::new(Dead, NoDelay, DeviceAddress::new(0x77).unwrap(), Settings::default());
        assert_eq!(s.init(), Err(SensorError::Bus(BusError::Nack)));
    }
}
