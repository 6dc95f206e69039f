//! Application context: screens, navigation and the per-frame tick.
//!
//! All long-lived state (scanner, event log, dashboard, focus) lives in
//! [`App`]; the firmware loop only feeds it keys and timestamps and draws
//! when [`App::tick`] reports a change.

use crate::bus::events::EventLog;
use crate::bus::scanner::{Scanner, ScannerConfig};
use crate::bus::BusTransport;
use crate::config::{EVENT_HISTORY_MAX, KEY_DEBOUNCE_MS, SCAN_INTERVAL_MS};
use crate::dashboard::{Dashboard, TAB_CO2, TAB_ENV, TAB_MQ, TAB_OVERVIEW};
use crate::sensors::{Co2Sensor, EnvSensor, GasSensor};
use crate::time::{Gate, Millis, Periodic};
use crate::ui::display::{self, Icon, TileSpec, COLS, ROWS};
use crate::ui::input_logic::Grid;
use crate::ui::Key;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_hal::delay::DelayNs;

/// Screens (views) the UI can be in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Screen {
    /// Tile grid.
    Launcher,
    /// Live bus topology and event feed.
    Watcher,
    /// Tabbed sensor dashboard.
    Dashboard,
    About,
}

/// Launcher entries, in grid order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Tile {
    Watcher,
    Dashboard,
    Co2l,
    EnvPro,
    Mq,
    About,
}

pub const TILES: [Tile; 6] = [
    Tile::Watcher,
    Tile::Dashboard,
    Tile::Co2l,
    Tile::EnvPro,
    Tile::Mq,
    Tile::About,
];

pub const TILE_SPECS: [TileSpec; 6] = [
    TileSpec { label: "Watcher", bg: 0x1E2A78, icon: Icon::Gear },
    TileSpec { label: "Dashboard", bg: 0x1C7C54, icon: Icon::Chart },
    TileSpec { label: "CO2L", bg: 0x8344AD, icon: Icon::Chart },
    TileSpec { label: "ENV Pro", bg: 0x174A7A, icon: Icon::Chart },
    TileSpec { label: "MQ", bg: 0x6B3E2E, icon: Icon::Folder },
    TileSpec { label: "About", bg: 0x7A8A2F, icon: Icon::Gear },
];

const LAUNCHER: Grid = Grid::new(COLS, ROWS);

pub struct App<C, E, G> {
    screen: Screen,
    focus: usize,
    move_gate: Gate,
    scanner: Scanner,
    events: EventLog<EVENT_HISTORY_MAX>,
    scan_timer: Periodic,
    dashboard: Dashboard<C, E, G>,
    /// Forces a full redraw on the next tick.
    dirty: bool,
}

impl<C, E, G> App<C, E, G> {
    pub fn new(scanner: ScannerConfig, dashboard: Dashboard<C, E, G>, now: Millis) -> Self {
        Self {
            screen: Screen::Launcher,
            focus: 0,
            move_gate: Gate::new(KEY_DEBOUNCE_MS),
            scanner: Scanner::new(scanner),
            events: EventLog::new(),
            scan_timer: Periodic::immediate(SCAN_INTERVAL_MS, now),
            dashboard,
            dirty: true,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    pub fn events(&self) -> &EventLog<EVENT_HISTORY_MAX> {
        &self.events
    }

    pub fn dashboard(&self) -> &Dashboard<C, E, G> {
        &self.dashboard
    }

    /// Enter the screen behind `tile`.
    pub fn open(&mut self, tile: Tile) {
        let (screen, tab) = match tile {
            Tile::Watcher => (Screen::Watcher, None),
            Tile::Dashboard => (Screen::Dashboard, Some(TAB_OVERVIEW)),
            Tile::Co2l => (Screen::Dashboard, Some(TAB_CO2)),
            Tile::EnvPro => (Screen::Dashboard, Some(TAB_ENV)),
            Tile::Mq => (Screen::Dashboard, Some(TAB_MQ)),
            Tile::About => (Screen::About, None),
        };
        if let Some(tab) = tab {
            self.dashboard.set_tab(tab);
        }
        debug!("open {:?}", tile);
        self.screen = screen;
        self.dirty = true;
    }

    /// React to one key.  Returns true if the screen must be redrawn.
    ///
    /// Focus and tab moves are debounced; Enter and Esc are not.
    pub fn handle_key(&mut self, key: Key, now: Millis) -> bool {
        if key.is_move() && !self.move_gate.admit(now) {
            return false;
        }
        match (self.screen, key) {
            (Screen::Launcher, Key::Enter) => {
                self.open(TILES[self.focus]);
                true
            }
            (Screen::Launcher, Key::Esc) => false,
            (Screen::Launcher, _) => {
                let next = LAUNCHER.step(self.focus, key);
                let moved = next != self.focus;
                self.focus = next;
                moved
            }
            (Screen::Dashboard, Key::Left) => {
                self.dashboard.prev_tab();
                true
            }
            (Screen::Dashboard, Key::Right) => {
                self.dashboard.next_tab();
                true
            }
            (Screen::Dashboard, Key::Esc) => self.back(),
            (Screen::Watcher | Screen::About, Key::Enter | Key::Esc) => self.back(),
            _ => false,
        }
    }

    fn back(&mut self) -> bool {
        self.screen = Screen::Launcher;
        true
    }

    /// Draw the current screen in full.
    pub fn render<T>(&self, target: &mut T) -> Result<(), T::Error>
    where
        T: DrawTarget<Color = Rgb565>,
    {
        match self.screen {
            Screen::Launcher => display::draw_launcher(target, &TILE_SPECS, self.focus),
            Screen::Watcher => display::draw_watcher(
                target,
                self.scanner.state(),
                &self.scanner.config().channels,
                &self.events,
            ),
            Screen::Dashboard => display::draw_dashboard(target, &self.dashboard),
            Screen::About => display::draw_about(target),
        }
    }
}

impl<C: Co2Sensor, E: EnvSensor, G: GasSensor> App<C, E, G> {
    /// One loop iteration: key, bus scan when due, sensor polls when due.
    ///
    /// Returns true if the visible screen changed and should be redrawn.
    pub fn tick<B, D>(&mut self, bus: &mut B, delay: &mut D, key: Option<u8>, now: Millis) -> bool
    where
        B: BusTransport,
        D: DelayNs,
    {
        let mut dirty = core::mem::take(&mut self.dirty);

        if let Some(key) = key.and_then(Key::from_code) {
            dirty |= self.handle_key(key, now);
            // `open` may have queued a redraw of its own.
            dirty |= core::mem::take(&mut self.dirty);
        }

        if self.scan_timer.due(now) {
            let changes = self.scanner.step(bus, delay, now, &mut self.events);
            dirty |= changes > 0 && self.screen == Screen::Watcher;
        }

        let polled = self.dashboard.poll(now);
        dirty |= polled && self.screen == Screen::Dashboard;

        dirty
    }
}
