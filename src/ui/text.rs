//! On-screen text: glyph sanitising and change-tracking labels.

use core::fmt::{self, Write as _};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::RgbColor;
use heapless::String;

/// Replacement for glyphs the ASCII font cannot draw.
fn replacement(c: char) -> Option<&'static str> {
    Some(match c {
        '₂' => "2",
        '₃' => "3",
        '₄' => "4",
        'Ω' => "Ohm",
        'µ' => "u",
        '²' => "^2",
        '³' => "^3",
        '–' | '—' => "-",
        '…' => "...",
        '°' => " deg",
        _ => return None,
    })
}

/// Copy `s` into a fixed buffer with non-ASCII glyphs replaced.
///
/// Unknown non-ASCII characters become `?`.  Output is truncated at a
/// character boundary when it does not fit.
pub fn safe_text<const L: usize>(s: &str) -> String<L> {
    let mut out = String::new();
    for c in s.chars() {
        let ok = if c.is_ascii() {
            out.push(c).is_ok()
        } else if let Some(r) = replacement(c) {
            out.push_str(r).is_ok()
        } else {
            out.push('?').is_ok()
        };
        if !ok {
            break;
        }
    }
    out
}

/// A text field that only reports a change when its content changes.
#[derive(Clone, Debug)]
pub struct Label<const L: usize> {
    text: String<L>,
    color: Rgb565,
}

impl<const L: usize> Label<L> {
    pub fn new(initial: &str) -> Self {
        Self {
            text: safe_text(initial),
            color: Rgb565::WHITE,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn color(&self) -> Rgb565 {
        self.color
    }

    /// Replace the text.  Returns true if it differed.
    pub fn set(&mut self, s: &str) -> bool {
        let next = safe_text::<L>(s);
        if next == self.text {
            return false;
        }
        self.text = next;
        true
    }

    /// Format into the label, e.g. `label.set_fmt(format_args!("{} ppm", v))`.
    pub fn set_fmt(&mut self, args: fmt::Arguments<'_>) -> bool {
        let mut buf: String<L> = String::new();
        // Overflow only truncates.
        let _ = buf.write_fmt(args);
        self.set(&buf)
    }

    pub fn set_color(&mut self, color: Rgb565) -> bool {
        if color == self.color {
            return false;
        }
        self.color = color;
        true
    }
}
