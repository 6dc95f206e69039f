//! Adaptive chart feed.
//!
//! Sensor pollers hand every observation to [`feed::ChartFeed`], which
//! keeps a rolling history per series, works out the display range, and
//! drives a [`ChartWidget`].  Widgets differ in one capability: whether
//! they accept an explicit Y range.  The feed checks that once per chart
//! and settles on a [`RangeMode`]:
//!
//! - **RangeCapable** - raw values are plotted; the axis follows the data,
//!   rate-limited by a cooldown and a span hysteresis band.
//! - **NormalizedFallback** - the widget keeps a fixed 0..100 scale and
//!   the feed maps each value into it.

pub mod feed;
pub mod history;

pub use feed::{ChartFeed, ChartRangeState, FeedConfig, PlotOutcome, Sample};
pub use history::SeriesHistory;

use crate::error::ChartError;

/// Identifies one chart widget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChartId(pub u8);

/// One series: its chart and its slot within that chart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SeriesId {
    pub chart: ChartId,
    pub slot: u8,
}

impl SeriesId {
    pub const fn new(chart: ChartId, slot: u8) -> Self {
        Self { chart, slot }
    }
}

/// Logical quantity whose visible refresh is rate-limited as a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RefreshKey {
    Co2,
    Env,
    Mq,
}

impl RefreshKey {
    pub const COUNT: usize = 3;

    pub const fn index(self) -> usize {
        match self {
            RefreshKey::Co2 => 0,
            RefreshKey::Env => 1,
            RefreshKey::Mq => 2,
        }
    }
}

/// How a chart's Y axis is driven, fixed after the first check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RangeMode {
    RangeCapable,
    NormalizedFallback,
}

/// Closed display range.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Bounds {
    pub min: f32,
    pub max: f32,
}

impl Bounds {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Zero-width range at `v`.
    pub const fn point(v: f32) -> Self {
        Self { min: v, max: v }
    }

    /// A zero-span range grows by one on each side.
    pub fn widened(self) -> Self {
        if self.min == self.max {
            Self::new(self.min - 1.0, self.max + 1.0)
        } else {
            self
        }
    }

    pub fn span(&self) -> f32 {
        self.max - self.min
    }

    /// Integer axis range covering `self`: floor of min, ceiling of max,
    /// at least one unit wide.  Values beyond `i32` saturate at its limits.
    pub fn to_axis(self) -> (i32, i32) {
        let lo = floor_i32(self.min).min(i32::MAX - 1);
        let hi = ceil_i32(self.max).max(lo + 1);
        (lo, hi)
    }
}

/// `v` pulled into the range an `f32 -> i32` cast represents exactly.
fn clamp_to_i32(v: f32) -> f32 {
    v.clamp(i32::MIN as f32, i32::MAX as f32)
}

fn floor_i32(v: f32) -> i32 {
    let v = clamp_to_i32(v);
    let t = v as i32;
    if (t as f32) > v {
        t.saturating_sub(1)
    } else {
        t
    }
}

fn ceil_i32(v: f32) -> i32 {
    let v = clamp_to_i32(v);
    let t = v as i32;
    if (t as f32) < v {
        t.saturating_add(1)
    } else {
        t
    }
}

/// The chart primitives the feed needs.
pub trait ChartWidget {
    /// Set the primary Y range.  Widgets without range control return
    /// [`ChartError::Unsupported`].
    fn set_range(&mut self, min: i32, max: i32) -> Result<(), ChartError>;

    /// Append the next point to series `slot`.
    fn push(&mut self, slot: u8, value: i32) -> Result<(), ChartError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_bounds_widen_to_span_two() {
        let b = Bounds::point(400.0).widened();
        assert_eq!(b, Bounds::new(399.0, 401.0));
        assert!(b.span() >= 2.0);
    }

    #[test]
    fn non_degenerate_bounds_unchanged() {
        let b = Bounds::new(1.0, 3.5);
        assert_eq!(b.widened(), b);
    }

    #[test]
    fn axis_covers_fractional_bounds() {
        assert_eq!(Bounds::new(21.4, 23.2).to_axis(), (21, 24));
        assert_eq!(Bounds::new(-2.5, -0.5).to_axis(), (-3, 0));
        assert_eq!(Bounds::new(5.0, 5.0).to_axis(), (5, 6));
    }

    #[test]
    fn axis_saturates_outside_i32() {
        assert_eq!(Bounds::new(2.9e9, 3.1e9).to_axis(), (i32::MAX - 1, i32::MAX));
        assert_eq!(Bounds::new(-3.1e9, -2.9e9).to_axis(), (i32::MIN, i32::MIN + 1));
        assert_eq!(Bounds::new(-3.0e9, 3.0e9).to_axis(), (i32::MIN, i32::MAX));
        assert_eq!(Bounds::new(f32::NAN, f32::NAN).to_axis(), (0, 1));
    }

    #[test]
    fn refresh_keys_have_distinct_slots() {
        let idx = [RefreshKey::Co2, RefreshKey::Env, RefreshKey::Mq].map(RefreshKey::index);
        assert_eq!(idx, [0, 1, 2]);
        assert!(idx.iter().all(|&i| i < RefreshKey::COUNT));
    }
}
