//! Cardputer matrix keyboard.
//!
//! 56 keys in a 4×14 layout, wired as 8 scan lines (driven through a
//! 74HC138 decoder from three address pins) by 7 active-low input columns
//! with pull-ups:
//!   - address  - G8, G9, G11
//!   - columns  - G13, G15, G3, G4, G5, G6, G7
//!
//! Each scan line covers half of two physical rows, interleaved by column.

use crate::ui::KeySource;
use embedded_hal::digital::{InputPin, OutputPin};

const LINES: u8 = 8;
const COLUMNS: usize = 7;

const BS: u8 = 8;
const TAB: u8 = 9;
const ENTER: u8 = 13;
const ESC: u8 = 27;
/// Modifier keys (fn, shift, ctrl, opt, alt) produce no code.
const MOD: u8 = 0;

/// ASCII per physical key; the top-left key doubles as Esc.
const KEYMAP: [[u8; 14]; 4] = [
    [ESC, b'1', b'2', b'3', b'4', b'5', b'6', b'7', b'8', b'9', b'0', b'-', b'=', BS],
    [TAB, b'q', b'w', b'e', b'r', b't', b'y', b'u', b'i', b'o', b'p', b'[', b']', b'\\'],
    [MOD, MOD, b'a', b's', b'd', b'f', b'g', b'h', b'j', b'k', b'l', b';', b'\'', ENTER],
    [MOD, MOD, MOD, b'z', b'x', b'c', b'v', b'b', b'n', b'm', b',', b'.', b'/', b' '],
];

/// Physical (column, row) of input `column` on scan line `line`.
pub fn key_position(line: u8, column: u8) -> (u8, u8) {
    let x = if line > 3 { 2 * column } else { 2 * column + 1 };
    let y = 3 - (line % 4);
    (x, y)
}

/// ASCII code of the key at a physical position, 0 for modifiers.
pub fn key_code(x: u8, y: u8) -> u8 {
    KEYMAP
        .get(y as usize)
        .and_then(|row| row.get(x as usize))
        .copied()
        .unwrap_or(MOD)
}

pub struct MatrixKeyboard<O, I> {
    address: [O; 3],
    columns: [I; COLUMNS],
    /// Key held during the previous poll, reported once per press.
    held: Option<(u8, u8)>,
}

impl<O: OutputPin, I: InputPin> MatrixKeyboard<O, I> {
    pub fn new(address: [O; 3], columns: [I; COLUMNS]) -> Self {
        Self {
            address,
            columns,
            held: None,
        }
    }

    fn select_line(&mut self, line: u8) {
        for (bit, pin) in self.address.iter_mut().enumerate() {
            let _ = if line & (1 << bit) != 0 {
                pin.set_high()
            } else {
                pin.set_low()
            };
        }
    }

    /// First pressed key, scanning lines in order.
    pub fn scan(&mut self) -> Option<(u8, u8)> {
        for line in 0..LINES {
            self.select_line(line);
            for j in 0..COLUMNS {
                if self.columns[j].is_low().unwrap_or(false) {
                    return Some(key_position(line, j as u8));
                }
            }
        }
        None
    }
}

impl<O: OutputPin, I: InputPin> KeySource for MatrixKeyboard<O, I> {
    /// Reports a key on press only; holding it does not repeat.
    fn poll(&mut self) -> Option<u8> {
        let pressed = self.scan();
        if pressed == self.held {
            return None;
        }
        self.held = pressed;
        let (x, y) = pressed?;
        let code = key_code(x, y);
        trace!("key ({}, {}) -> {}", x, y, code);
        (code != MOD).then_some(code)
    }
}
