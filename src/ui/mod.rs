//! User interface subsystem - colour LCD + matrix keyboard.
//!
//! ## Components
//!
//! - **Display**: 240×135 ST7789 drawn through any `DrawTarget<Color = Rgb565>`
//! - **Keys**: ASCII codes from the keyboard, mapped to navigation [`Key`]s
//! - **Charts**: [`chart::LineChart`], the on-screen [`crate::chart::ChartWidget`]
//! - **Labels**: [`text::Label`], text that only changes when its content does

pub mod chart;
pub mod display;
pub mod input_logic;
pub mod text;

/// Navigation keys (after mapping from ASCII).
///
/// The Cardputer has no arrow cluster; `, / ; .` sit where arrows would,
/// with WASD as an alternative.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Enter,
    Esc,
}

impl Key {
    /// Map an ASCII key code; other codes are ignored.
    pub fn from_code(code: u8) -> Option<Key> {
        match code {
            b',' | b'A' | b'a' => Some(Key::Left),
            b'/' | b'D' | b'd' => Some(Key::Right),
            b';' | b'W' | b'w' => Some(Key::Up),
            b'.' | b'S' | b's' => Some(Key::Down),
            13 | 10 | b' ' => Some(Key::Enter),
            27 | b'q' => Some(Key::Esc),
            _ => None,
        }
    }

    /// Movement keys are debounced; Enter/Esc are not.
    pub fn is_move(self) -> bool {
        matches!(self, Key::Left | Key::Right | Key::Up | Key::Down)
    }
}

/// Source of key presses, polled once per frame.
pub trait KeySource {
    /// ASCII code of the next pending key press, if any.
    fn poll(&mut self) -> Option<u8>;
}
