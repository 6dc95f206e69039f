//! Line chart drawn with embedded-graphics.

use crate::chart::ChartWidget;
use crate::error::ChartError;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line, PrimitiveStyle, Rectangle};
use heapless::Deque;

/// How the Y axis is scaled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scale {
    /// Accepts explicit ranges from the feed.
    Ranged { min: i32, max: i32 },
    /// Fixed 0..=100; explicit ranges are refused.
    Fixed,
}

impl Scale {
    fn bounds(self) -> (i32, i32) {
        match self {
            Scale::Ranged { min, max } => (min, max),
            Scale::Fixed => (0, 100),
        }
    }
}

/// `S` series of up to `N` points each, plotted left to right.
pub struct LineChart<const S: usize, const N: usize> {
    area: Rectangle,
    scale: Scale,
    colors: [Rgb565; S],
    series: [Deque<i32, N>; S],
}

impl<const S: usize, const N: usize> LineChart<S, N> {
    /// Chart whose Y axis follows `set_range`.
    pub fn ranged(area: Rectangle, colors: [Rgb565; S]) -> Self {
        Self::with_scale(area, colors, Scale::Ranged { min: 0, max: 100 })
    }

    /// Chart with a fixed 0..=100 axis.
    pub fn fixed(area: Rectangle, colors: [Rgb565; S]) -> Self {
        Self::with_scale(area, colors, Scale::Fixed)
    }

    fn with_scale(area: Rectangle, colors: [Rgb565; S], scale: Scale) -> Self {
        Self {
            area,
            scale,
            colors,
            series: core::array::from_fn(|_| Deque::new()),
        }
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    pub fn area(&self) -> Rectangle {
        self.area
    }

    /// Points of series `slot`, oldest first.
    pub fn points(&self, slot: usize) -> impl Iterator<Item = i32> + '_ {
        self.series
            .get(slot)
            .into_iter()
            .flat_map(|s| s.iter().copied())
    }

    /// Screen position of the `i`-th point with value `v`.
    fn to_screen(&self, i: usize, v: i32) -> Point {
        let (min, max) = self.scale.bounds();
        let w = self.area.size.width.saturating_sub(1) as i32;
        let h = self.area.size.height.saturating_sub(1) as i32;
        let span = (max as i64 - min as i64).max(1);
        let steps = (N as i32 - 1).max(1);
        let x = self.area.top_left.x + i as i32 * w / steps;
        let dy = ((v.clamp(min, max) as i64 - min as i64) * h as i64 / span) as i32;
        Point::new(x, self.area.top_left.y + h - dy)
    }

    pub fn draw<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        self.area
            .into_styled(PrimitiveStyle::with_stroke(Rgb565::CSS_DIM_GRAY, 1))
            .draw(target)?;

        for (series, &color) in self.series.iter().zip(self.colors.iter()) {
            let style = PrimitiveStyle::with_stroke(color, 1);
            let mut prev: Option<Point> = None;
            for (i, &v) in series.iter().enumerate() {
                let p = self.to_screen(i, v);
                if let Some(q) = prev {
                    Line::new(q, p).into_styled(style).draw(target)?;
                }
                prev = Some(p);
            }
        }
        Ok(())
    }
}

impl<const S: usize, const N: usize> ChartWidget for LineChart<S, N> {
    fn set_range(&mut self, min: i32, max: i32) -> Result<(), ChartError> {
        match self.scale {
            Scale::Fixed => Err(ChartError::Unsupported),
            Scale::Ranged { .. } if min >= max => Err(ChartError::Backend),
            Scale::Ranged { .. } => {
                self.scale = Scale::Ranged { min, max };
                Ok(())
            }
        }
    }

    fn push(&mut self, slot: u8, value: i32) -> Result<(), ChartError> {
        let series = self
            .series
            .get_mut(slot as usize)
            .ok_or(ChartError::NoSuchSeries)?;
        if series.is_full() {
            series.pop_front();
        }
        series.push_back(value).map_err(|_| ChartError::Backend)
    }
}
