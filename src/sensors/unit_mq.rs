//! M5Stack Unit MQ (MQ-5 gas sensor behind an STM32 register interface).

use super::{GasSensor, MqReading};
use crate::bus::{BusTransport, DeviceAddress};
use crate::error::SensorError;

const REG_MQ_CFG: u8 = 0x00;
const REG_ADC8: u8 = 0x20;
const REG_ADC12: u8 = 0x30;
const REG_VALID_TAGS: u8 = 0x40;

const ADC12_MASK: u16 = 0x0FFF;

/// Heater drive set by [`UnitMq::set_mode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeaterMode {
    Off = 0,
    /// Heater always on; the dashboard runs the unit this way.
    Continuous = 1,
    /// Firmware-timed high/low heater cycle.
    Pin = 2,
}

pub struct UnitMq<B> {
    bus: B,
    addr: DeviceAddress,
}

impl<B: BusTransport> UnitMq<B> {
    pub fn new(bus: B, addr: DeviceAddress) -> Self {
        Self { bus, addr }
    }

    pub fn release(self) -> B {
        self.bus
    }

    /// Switch the heater to continuous drive.
    pub fn init(&mut self) -> Result<(), SensorError> {
        self.set_mode(HeaterMode::Continuous)
    }

    pub fn set_mode(&mut self, mode: HeaterMode) -> Result<(), SensorError> {
        self.bus.write(self.addr, &[REG_MQ_CFG, mode as u8])?;
        Ok(())
    }

    fn read_regs(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), SensorError> {
        self.bus.write(self.addr, &[reg])?;
        self.bus.read(self.addr, buf)?;
        Ok(())
    }

    /// Non-zero once the heater has warmed up and the ADC is trustworthy.
    pub fn valid_tags(&mut self) -> Result<u8, SensorError> {
        let mut b = [0u8];
        self.read_regs(REG_VALID_TAGS, &mut b)?;
        Ok(b[0])
    }

    pub fn adc8(&mut self) -> Result<u8, SensorError> {
        let mut b = [0u8];
        self.read_regs(REG_ADC8, &mut b)?;
        Ok(b[0])
    }

    pub fn adc12(&mut self) -> Result<u16, SensorError> {
        let mut b = [0u8; 2];
        self.read_regs(REG_ADC12, &mut b)?;
        Ok(u16::from_le_bytes(b) & ADC12_MASK)
    }
}

impl<B: BusTransport> GasSensor for UnitMq<B> {
    fn read(&mut self) -> Result<MqReading, SensorError> {
        let valid = self.valid_tags()? != 0;
        let adc8 = self.adc8()?;
        let adc12 = self.adc12()?;
        Ok(MqReading { valid, adc8, adc12 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::BusSnapshot;
    use crate::error::BusError;
    use heapless::Vec;

    struct FakeMq {
        regs: [u8; 0x50],
        pointer: u8,
        writes: Vec<(u8, u8), 8>,
        absent: bool,
    }

    impl FakeMq {
        fn new() -> Self {
            Self {
                regs: [0; 0x50],
                pointer: 0,
                writes: Vec::new(),
                absent: false,
            }
        }
    }

    impl BusTransport for FakeMq {
        fn scan(&mut self) -> Result<BusSnapshot, BusError> {
            Ok(BusSnapshot::from_raw(&[0x11]))
        }

        fn write(&mut self, _addr: DeviceAddress, bytes: &[u8]) -> Result<(), BusError> {
            if self.absent {
                return Err(BusError::Nack);
            }
            match bytes {
                [reg] => self.pointer = *reg,
                [reg, value] => {
                    self.regs[*reg as usize] = *value;
                    let _ = self.writes.push((*reg, *value));
                }
                _ => return Err(BusError::Other),
            }
            Ok(())
        }

        fn read(&mut self, _addr: DeviceAddress, buf: &mut [u8]) -> Result<(), BusError> {
            let start = self.pointer as usize;
            buf.copy_from_slice(&self.regs[start..start + buf.len()]);
            Ok(())
        }
    }

    fn sensor(fake: FakeMq) -> UnitMq<FakeMq> {
        UnitMq::new(fake, DeviceAddress::new(0x11).unwrap())
    }

    #[test]
    fn init_enables_continuous_heater() {
        let mut s = sensor(FakeMq::new());
        s.init().unwrap();
        assert_eq!(s.release().writes.as_slice(), &[(REG_MQ_CFG, 1)]);
    }

    #[test]
    fn read_collects_all_three_registers() {
        let mut fake = FakeMq::new();
        fake.regs[REG_VALID_TAGS as usize] = 1;
        fake.regs[REG_ADC8 as usize] = 0x9C;
        // 0x09C4 = 2500, upper nibble noise is masked off
        fake.regs[REG_ADC12 as usize] = 0xC4;
        fake.regs[REG_ADC12 as usize + 1] = 0xF9;
        let mut s = sensor(fake);
        assert_eq!(
            s.read(),
            Ok(MqReading {
                valid: true,
                adc8: 0x9C,
                adc12: 2500,
            })
        );
    }

    #[test]
    fn cold_heater_reads_as_invalid() {
        let mut s = sensor(FakeMq::new());
        let r = s.read().unwrap();
        assert!(!r.valid);
        assert_eq!(r.adc12, 0);
    }

    #[test]
    fn bus_errors_propagate() {
        let mut fake = FakeMq::new();
        fake.absent = true;
        let mut s = sensor(fake);
        assert_eq!(s.read(), Err(SensorError::Bus(BusError::Nack)));
        assert_eq!(s.init(), Err(SensorError::Bus(BusError::Nack)));
    }
}
