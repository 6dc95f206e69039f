//! sensordeck firmware - M5Stack Cardputer (ESP32-S3).
//!
//! Wires the library to the hardware and runs the single UI loop:
//! keyboard scan, timer-gated bus scans and sensor polls, redraw when
//! something visible changed, then sleep out the frame budget.
//!
//! ## Hardware
//!
//! - HY2.0 port: I²C0, SDA G2 / SCL G1 at 400 kHz, PaHUB at 0x70
//! - LCD: ST7789 135×240 on SPI2 (SCK G36, MOSI G35, CS G37, DC G34,
//!   RST G33, backlight G38), used in landscape
//! - Keyboard: 74HC138 address G8/G9/G11, columns G13/G15/G3..G7

#![no_std]
#![no_main]

use core::cell::RefCell;

use defmt::{info, warn};
use embassy_executor::Spawner;
use embassy_time::Timer;
use embedded_hal_bus::i2c::RefCellDevice;
use embedded_hal_bus::spi::ExclusiveDevice;
use esp_backtrace as _;
use esp_hal::clock::CpuClock;
use esp_hal::delay::Delay;
use esp_hal::gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull};
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::spi::master::{Config as SpiConfig, Spi};
use esp_hal::spi::Mode;
use esp_hal::time::{Instant, Rate};
use esp_hal::timer::timg::TimerGroup;
use esp_println as _;
use mipidsi::interface::SpiInterface;
use mipidsi::models::ST7789;
use mipidsi::options::{ColorInversion, Orientation, Rotation};
use mipidsi::Builder;

use sensordeck::app::App;
use sensordeck::bus::scanner::ScannerConfig;
use sensordeck::bus::{ChannelBus, DeviceAddress, I2cBus};
use sensordeck::config::{
    BME688_ADDR, FRAME_MS, I2C_FREQ_KHZ, PAHUB_ADDR, PAHUB_CO2L_CH, PAHUB_ENVPRO_CH,
    PAHUB_MQ_CH, SCD4X_ADDR, SCREEN_H, SCREEN_W, UNIT_MQ_ADDR,
};
use sensordeck::dashboard::Dashboard;
use sensordeck::keyboard::MatrixKeyboard;
use sensordeck::sensors::bme688::{self, Bme688};
use sensordeck::sensors::scd4x::Scd4x;
use sensordeck::sensors::unit_mq::UnitMq;
use sensordeck::time::{frame_sleep_ms, Clock, Millis};
use sensordeck::ui::KeySource;

esp_bootloader_esp_idf::esp_app_desc!();

/// Milliseconds since boot from the esp-hal system timer.
struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Millis {
        // Truncation to 32 bits is fine: all comparisons use wrapping differences.
        Millis(Instant::now().duration_since_epoch().as_millis() as u32)
    }
}

#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("sensordeck starting");

    let clock = SystemClock;
    let mut delay = Delay::new();

    // ── I²C (HY2.0 port), shared by the scanner and the sensor units ────
    let i2c = I2c::new(
        peripherals.I2C0,
        I2cConfig::default().with_frequency(Rate::from_khz(I2C_FREQ_KHZ)),
    )
    .expect("i2c0 init")
    .with_sda(peripherals.GPIO2)
    .with_scl(peripherals.GPIO1);
    let i2c = RefCell::new(i2c);
    let mut scan_bus = I2cBus::new(RefCellDevice::new(&i2c));

    // ── Sensor units ────────────────────────────────────────────────────
    let hub = DeviceAddress::new(PAHUB_ADDR).expect("hub address");
    let co2_addr = DeviceAddress::new(SCD4X_ADDR).expect("scd4x address");
    let co2_bus = ChannelBus::new(I2cBus::new(RefCellDevice::new(&i2c)), hub, PAHUB_CO2L_CH);
    let mut scd = Scd4x::new(co2_bus, Delay::new(), co2_addr);
    let co2 = match scd.init() {
        Ok(()) => {
            info!("CO2L ready on PaHUB ch{}", PAHUB_CO2L_CH);
            Some(scd)
        }
        Err(e) => {
            warn!("CO2L not available: {}", e);
            None
        }
    };

    let env_addr = DeviceAddress::new(BME688_ADDR).expect("bme688 address");
    let env_bus = ChannelBus::new(I2cBus::new(RefCellDevice::new(&i2c)), hub, PAHUB_ENVPRO_CH);
    let mut bme = Bme688::new(env_bus, Delay::new(), env_addr, bme688::Settings::default());
    let env = match bme.init() {
        Ok(()) => {
            info!("ENV Pro ready on PaHUB ch{}", PAHUB_ENVPRO_CH);
            Some(bme)
        }
        Err(e) => {
            warn!("ENV Pro not available: {}", e);
            None
        }
    };

    let mq_addr = DeviceAddress::new(UNIT_MQ_ADDR).expect("unit mq address");
    let mq_bus = ChannelBus::new(I2cBus::new(RefCellDevice::new(&i2c)), hub, PAHUB_MQ_CH);
    let mut unit_mq = UnitMq::new(mq_bus, mq_addr);
    let mq = match unit_mq.init() {
        Ok(()) => {
            info!("Unit MQ ready on PaHUB ch{}", PAHUB_MQ_CH);
            Some(unit_mq)
        }
        Err(e) => {
            warn!("Unit MQ not available: {}", e);
            None
        }
    };

    // ── LCD ─────────────────────────────────────────────────────────────
    let mut backlight = Output::new(peripherals.GPIO38, Level::Low, OutputConfig::default());
    let spi = Spi::new(
        peripherals.SPI2,
        SpiConfig::default()
            .with_frequency(Rate::from_mhz(40))
            .with_mode(Mode::_0),
    )
    .expect("spi2 init")
    .with_sck(peripherals.GPIO36)
    .with_mosi(peripherals.GPIO35);
    let cs = Output::new(peripherals.GPIO37, Level::High, OutputConfig::default());
    let dc = Output::new(peripherals.GPIO34, Level::Low, OutputConfig::default());
    let rst = Output::new(peripherals.GPIO33, Level::High, OutputConfig::default());
    let spi_device = ExclusiveDevice::new(spi, cs, Delay::new()).expect("lcd spi device");
    let mut spi_buffer = [0u8; 512];
    let interface = SpiInterface::new(spi_device, dc, &mut spi_buffer);
    let mut display = Builder::new(ST7789, interface)
        .display_size(SCREEN_H as u16, SCREEN_W as u16)
        .display_offset(52, 40)
        .invert_colors(ColorInversion::Inverted)
        .orientation(Orientation::new().rotate(Rotation::Deg90))
        .reset_pin(rst)
        .init(&mut delay)
        .expect("lcd init");
    backlight.set_high();

    // ── Keyboard ────────────────────────────────────────────────────────
    let pull_up = || InputConfig::default().with_pull(Pull::Up);
    let mut keyboard = MatrixKeyboard::new(
        [
            Output::new(peripherals.GPIO8, Level::Low, OutputConfig::default()),
            Output::new(peripherals.GPIO9, Level::Low, OutputConfig::default()),
            Output::new(peripherals.GPIO11, Level::Low, OutputConfig::default()),
        ],
        [
            Input::new(peripherals.GPIO13, pull_up()),
            Input::new(peripherals.GPIO15, pull_up()),
            Input::new(peripherals.GPIO3, pull_up()),
            Input::new(peripherals.GPIO4, pull_up()),
            Input::new(peripherals.GPIO5, pull_up()),
            Input::new(peripherals.GPIO6, pull_up()),
            Input::new(peripherals.GPIO7, pull_up()),
        ],
    );

    // ── Application ─────────────────────────────────────────────────────
    let start = clock.now();
    let dashboard = Dashboard::new(co2, env, mq, start);
    let mut app = App::new(ScannerConfig::default(), dashboard, start);

    info!("entering main loop");
    loop {
        let frame_start = clock.now();
        let key = keyboard.poll();

        if app.tick(&mut scan_bus, &mut delay, key, frame_start) {
            if let Err(e) = app.render(&mut display) {
                warn!("lcd draw failed: {}", defmt::Debug2Format(&e));
            }
        }

        let sleep = frame_sleep_ms(frame_start, clock.now(), FRAME_MS);
        Timer::after_millis(sleep as u64).await;
    }
}
