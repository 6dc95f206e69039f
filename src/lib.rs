//! Host-testable library behind the sensordeck firmware.
//!
//! Everything except peripheral setup lives here: the bus topology
//! scanner, the adaptive chart feed, sensor drivers, navigation and screen
//! rendering.  Hardware is reached only through `embedded-hal` traits and
//! `embedded-graphics` draw targets, so all of it runs under `cargo test`
//! on the host.
//!
//! Usage: `cargo test`
//!
//! Note: The embedded binary (`src/main.rs`, `--features embedded`) wires
//! these modules to the Cardputer's I²C port, LCD and keyboard.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod app;
pub mod bus;
pub mod chart;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod keyboard;
pub mod sensors;
pub mod time;
pub mod ui;

// ═══════════════════════════════════════════════════════════════════════════
// Cross-module Tests
// ═══════════════════════════════════════════════════════════════════════════
