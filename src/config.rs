//! Application-wide constants and compile-time configuration.
//!
//! Timing parameters, bus addresses and protocol constants live here so
//! they can be tuned in one place.  GPIO pins are typed peripherals and are
//! taken in `main.rs`.

// I2C (HY2.0 / Grove port: yellow = SDA G2, white = SCL G1)

/// Bus clock (kHz).
pub const I2C_FREQ_KHZ: u32 = 400;

/// First and last address tried by a bus scan (reserved ranges skipped).
pub const SCAN_FIRST_ADDR: u8 = 0x08;
pub const SCAN_LAST_ADDR: u8 = 0x77;

// PaHUB (TCA9548A-style multiplexer)

/// Set to false when no PaHUB is wired to the port.
pub const USE_PAHUB: bool = true;

/// Multiplexer address (TCA9548A default).
pub const PAHUB_ADDR: u8 = 0x70;

/// Channels scanned behind the PaHUB (the unit exposes 0..5).
pub const PAHUB_CHANNELS: [u8; 6] = [0, 1, 2, 3, 4, 5];

/// Hardware limit of the channel-select mask (8 bits).
pub const MUX_MAX_CHANNELS: usize = 8;

/// Settle time after switching channels (ms).
pub const CHANNEL_SETTLE_MS: u32 = 10;

// Watcher

/// Interval between full topology scans (ms).
pub const SCAN_INTERVAL_MS: u32 = 1_000;

/// Number of event lines kept in the feed.
pub const EVENT_HISTORY_MAX: usize = 10;

// Frame pacing & chart feed

/// Frame budget for one loop iteration (ms). ~16 FPS max UI work.
pub const FRAME_MS: u32 = 60;

/// Minimum time between visible refreshes for one sensor (ms).
pub const UI_THROTTLE_MS: u32 = 200;

/// Cooldown between chart Y-range commits (ms).
pub const RANGE_REFRESH_MS: u32 = 1_200;

/// Span change (percent) that forces a range commit inside the cooldown.
pub const RANGE_HYSTERESIS_PCT: u32 = 20;

/// Points kept per plotted series.
pub const HISTORY_LEN: usize = 40;

/// Maximum charts / series the feed keeps state for.
pub const MAX_CHARTS: usize = 4;
pub const MAX_SERIES: usize = 8;

// Sensor units

/// PaHUB channel each unit is wired to.
pub const PAHUB_CO2L_CH: u8 = 0;
pub const PAHUB_MQ_CH: u8 = 1;
pub const PAHUB_ENVPRO_CH: u8 = 2;

/// SCD4x (CO2L) default address.
pub const SCD4X_ADDR: u8 = 0x62;
pub const BME688_ADDR: u8 = 0x77;
pub const UNIT_MQ_ADDR: u8 = 0x11;

/// Sampling periods (ms).
pub const PERIOD_CO2L_MS: u32 = 5_000;
pub const PERIOD_ENVPRO_MS: u32 = 1_000;
pub const PERIOD_MQ_MS: u32 = 1_000;

/// Delay before the first poll of each unit, so they don't all fire on
/// the same frame (ms).
pub const STAGGER_CO2L_MS: u32 = 250;
pub const STAGGER_ENVPRO_MS: u32 = 500;
pub const STAGGER_MQ_MS: u32 = 750;

// Screen & input

/// LCD size in landscape (rotation 1).
pub const SCREEN_W: u32 = 240;
pub const SCREEN_H: u32 = 135;

/// Minimum time between two focus moves (ms).
pub const KEY_DEBOUNCE_MS: u32 = 90;
