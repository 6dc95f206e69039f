//! Screen rendering for the 240×135 LCD.
//!
//! Every screen is redrawn in full when the application reports it dirty;
//! nothing here keeps state between frames.

use crate::bus::events::{format_event, EventLog};
use crate::bus::fingerprint::format_snapshot;
use crate::bus::scanner::TopologyState;
use crate::config::{EVENT_HISTORY_MAX, SCREEN_H, SCREEN_W, USE_PAHUB};
use crate::dashboard::{Dashboard, Text as LabelText, TAB_CO2, TAB_ENV, TAB_MQ, TAB_NAMES};
use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::mono_font::{MonoTextStyle, MonoTextStyleBuilder};
use embedded_graphics::pixelcolor::{Rgb565, Rgb888};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Circle, Line, PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Baseline, Text};
use heapless::String;

const W: i32 = SCREEN_W as i32;
const H: i32 = SCREEN_H as i32;

/// Height of one text line (6×10 font plus spacing).
pub const LINE_H: i32 = 11;

// Launcher geometry (2 rows × 3 columns of tiles under a title strip)
pub const COLS: usize = 3;
pub const ROWS: usize = 2;
const TILE_W: i32 = 66;
const TILE_H: i32 = 52;
const GAP_X: i32 = 15;
const GAP_Y: i32 = 10;
const TITLE_H: i32 = 14;

/// `0xRRGGBB` to the panel's colour format.
pub fn rgb(hex: u32) -> Rgb565 {
    Rgb888::new((hex >> 16) as u8, (hex >> 8) as u8, hex as u8).into()
}

fn bg() -> Rgb565 {
    rgb(0x101015)
}

/// Vector icon drawn on a launcher tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Icon {
    Gear,
    Chart,
    Folder,
}

/// One launcher tile.
#[derive(Clone, Copy, Debug)]
pub struct TileSpec {
    pub label: &'static str,
    pub bg: u32,
    pub icon: Icon,
}

fn text<D>(target: &mut D, s: &str, x: i32, y: i32, color: Rgb565) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    let style = MonoTextStyle::new(&FONT_6X10, color);
    Text::with_baseline(s, Point::new(x, y), style, Baseline::Top).draw(target)?;
    Ok(())
}

fn text_on<D>(target: &mut D, s: &str, x: i32, y: i32, fg: Rgb565, back: Rgb565) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    let style = MonoTextStyleBuilder::new()
        .font(&FONT_6X10)
        .text_color(fg)
        .background_color(back)
        .build();
    Text::with_baseline(s, Point::new(x, y), style, Baseline::Top).draw(target)?;
    Ok(())
}

fn fill<D>(target: &mut D, x: i32, y: i32, w: i32, h: i32, color: Rgb565) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    Rectangle::new(Point::new(x, y), Size::new(w.max(0) as u32, h.max(0) as u32))
        .into_styled(PrimitiveStyle::with_fill(color))
        .draw(target)
}

fn frame<D>(target: &mut D, x: i32, y: i32, w: i32, h: i32, color: Rgb565) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    Rectangle::new(Point::new(x, y), Size::new(w.max(0) as u32, h.max(0) as u32))
        .into_styled(PrimitiveStyle::with_stroke(color, 1))
        .draw(target)
}

fn line<D>(target: &mut D, a: (i32, i32), b: (i32, i32), color: Rgb565) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    Line::new(Point::new(a.0, a.1), Point::new(b.0, b.1))
        .into_styled(PrimitiveStyle::with_stroke(color, 1))
        .draw(target)
}

// Launcher

/// Top-left corner of tile `index`.
pub fn tile_origin(index: usize) -> Point {
    let total_w = COLS as i32 * TILE_W + (COLS as i32 - 1) * GAP_X;
    let total_h = ROWS as i32 * TILE_H + (ROWS as i32 - 1) * GAP_Y;
    let start_x = (W - total_w) / 2;
    let start_y = (H - TITLE_H - total_h) / 2 + TITLE_H;
    let (r, c) = ((index / COLS) as i32, (index % COLS) as i32);
    Point::new(start_x + c * (TILE_W + GAP_X), start_y + r * (TILE_H + GAP_Y))
}

pub fn draw_launcher<D>(target: &mut D, tiles: &[TileSpec], focus: usize) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    target.clear(bg())?;
    text(target, "Launcher", 12, 3, Rgb565::WHITE)?;
    for (i, tile) in tiles.iter().enumerate() {
        draw_tile(target, i, tile, i == focus)?;
    }
    Ok(())
}

/// Shadow, body, optional focus ring, icon and caption strip.
pub fn draw_tile<D>(target: &mut D, index: usize, tile: &TileSpec, focused: bool) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    let Point { x, y } = tile_origin(index);
    fill(target, x - 4, y - 4, TILE_W + 8, TILE_H + 8, bg())?;
    fill(target, x + 2, y + 3, TILE_W, TILE_H, Rgb565::BLACK)?;
    fill(target, x, y, TILE_W, TILE_H, rgb(tile.bg))?;
    if focused {
        frame(target, x - 2, y - 2, TILE_W + 4, TILE_H + 4, Rgb565::WHITE)?;
        frame(target, x - 3, y - 3, TILE_W + 6, TILE_H + 6, Rgb565::WHITE)?;
    }
    draw_icon(target, tile.icon, x, y, TILE_W, TILE_H)?;
    fill(target, x, y + TILE_H - 18, TILE_W, 18, Rgb565::BLACK)?;
    text_on(target, tile.label, x + 6, y + TILE_H - 15, Rgb565::WHITE, Rgb565::BLACK)
}

fn draw_icon<D>(target: &mut D, icon: Icon, x: i32, y: i32, w: i32, h: i32) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    match icon {
        Icon::Gear => {
            let r = w.min(h) / 5 + 6;
            draw_gear(target, x + w / 2, y + h / 2 - 6, r, Rgb565::WHITE)
        }
        Icon::Chart => draw_bar_chart(target, x + 10, y + 12, w - 20, h - 26, Rgb565::WHITE),
        Icon::Folder => draw_folder(target, x + 10, y + 16, w - 20, h - 30, Rgb565::WHITE),
    }
}

/// Two rings, four spokes and a diamond of teeth.
pub fn draw_gear<D>(target: &mut D, cx: i32, cy: i32, r: i32, color: Rgb565) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    let ring = PrimitiveStyle::with_stroke(color, 1);
    let center = Point::new(cx, cy);
    Circle::with_center(center, (2 * r) as u32).into_styled(ring).draw(target)?;
    Circle::with_center(center, (2 * (r - 4)).max(0) as u32)
        .into_styled(ring)
        .draw(target)?;
    for (dx, dy) in [(0, -r + 2), (0, r - 2), (-r + 2, 0), (r - 2, 0)] {
        line(target, (cx, cy), (cx + dx, cy + dy), color)?;
    }
    let t = r + 3;
    let teeth = [(cx, cy - t), (cx + t, cy), (cx, cy + t), (cx - t, cy)];
    for i in 0..teeth.len() {
        line(target, teeth[i], teeth[(i + 1) % teeth.len()], color)?;
    }
    Ok(())
}

/// Axes and three rising bars.
pub fn draw_bar_chart<D>(target: &mut D, x: i32, y: i32, w: i32, h: i32, color: Rgb565) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    line(target, (x + 6, y + h - 8), (x + w - 6, y + h - 8), color)?;
    line(target, (x + 6, y + 10), (x + 6, y + h - 8), color)?;
    let bw = (w - 20) / 3;
    let bx = x + 10;
    for (i, hv) in [h / 3, h / 2, h * 2 / 3].into_iter().enumerate() {
        let left = bx + i as i32 * (bw + 5);
        fill(target, left, y + h - 8 - hv, bw, hv, color)?;
        frame(target, left, y + h - 8 - hv, bw, hv, Rgb565::WHITE)?;
    }
    Ok(())
}

pub fn draw_folder<D>(target: &mut D, x: i32, y: i32, w: i32, h: i32, color: Rgb565) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    let (tab_w, tab_h) = (w / 3, h / 5);
    fill(target, x, y + tab_h, w, h - tab_h, color)?;
    fill(target, x + 6, y, tab_w, tab_h, color)?;
    frame(target, x, y + tab_h, w, h - tab_h, Rgb565::WHITE)?;
    frame(target, x + 6, y, tab_w, tab_h, Rgb565::WHITE)
}

// Detail pages

/// Header, framed content box and a back hint.
pub fn draw_detail_chrome<D>(target: &mut D, title: &str) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    let base = rgb(0x20262C);
    target.clear(base)?;
    text(target, title, 10, 6, Rgb565::WHITE)?;
    fill(target, 10, 22, W - 20, H - 42, rgb(0x0C0F12))?;
    frame(target, 10, 22, W - 20, H - 42, Rgb565::WHITE)?;
    text(target, "Enter/ESC: Back", 10, H - 14, Rgb565::WHITE)
}

pub fn draw_about<D>(target: &mut D) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    draw_detail_chrome(target, "About")?;
    text(target, "sensordeck", 16, 30, Rgb565::WHITE)?;
    text(target, concat!("Version: ", env!("CARGO_PKG_VERSION")), 16, 44, Rgb565::WHITE)?;
    text(target, "I2C watcher + sensor dashboard", 16, 58, Rgb565::WHITE)
}

// Watcher

/// Current topology, a divider, then the event feed (newest at the bottom).
pub fn draw_watcher<D, const N: usize>(
    target: &mut D,
    state: &TopologyState,
    channels: &[u8],
    log: &EventLog<N>,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    use core::fmt::Write;

    target.clear(Rgb565::BLACK)?;
    let white = Rgb565::WHITE;
    let mut y = 0;
    let mut buf: String<96> = String::new();

    text(target, "I2C Watcher", 0, y, Rgb565::CSS_LIGHT_GRAY)?;
    y += LINE_H;

    let _ = write!(buf, "Base: {}", format_snapshot::<80>(&state.base).as_str());
    text(target, &buf, 0, y, white)?;
    y += LINE_H;

    if USE_PAHUB {
        if state.mux_present {
            for &ch in channels {
                buf.clear();
                let snap = format_snapshot::<80>(&state.channels.get(ch));
                let _ = write!(buf, "ch{}: {}", ch, snap.as_str());
                text(target, &buf, 0, y, white)?;
                y += LINE_H;
            }
        } else {
            text(target, "PaHUB: not detected", 0, y, Rgb565::CSS_ORANGE)?;
            y += LINE_H;
        }
    }

    y += 2;
    line(target, (0, y), (W - 1, y), Rgb565::CSS_DIM_GRAY)?;
    y += 3;

    buf.clear();
    let _ = write!(buf, "Events (last {}):", EVENT_HISTORY_MAX);
    text(target, &buf, 0, y, Rgb565::CSS_LIGHT_GRAY)?;
    y += LINE_H;

    let room = ((H - y) / LINE_H).max(0) as usize;
    let skip = log.len().saturating_sub(room);
    for event in log.iter().skip(skip) {
        let entry = format_event::<64>(event);
        text(target, &entry, 0, y, white)?;
        y += LINE_H;
    }
    Ok(())
}

// Dashboard

/// Page dots, `active` filled.
pub fn draw_dots<D>(target: &mut D, count: usize, active: usize, center_x: i32, y: i32) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    const PITCH: i32 = 10;
    let left = center_x - (count as i32 - 1) * PITCH / 2;
    for i in 0..count {
        let c = Point::new(left + i as i32 * PITCH, y);
        let dot = Circle::with_center(c, 6);
        if i == active {
            dot.into_styled(PrimitiveStyle::with_fill(Rgb565::WHITE)).draw(target)?;
        } else {
            dot.into_styled(PrimitiveStyle::with_stroke(Rgb565::CSS_GRAY, 1))
                .draw(target)?;
        }
    }
    Ok(())
}

fn draw_labels<D>(target: &mut D, labels: &[&LabelText], x: i32, y: i32) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    for (i, l) in labels.iter().enumerate() {
        text(target, l.as_str(), x, y + i as i32 * 16, l.color())?;
    }
    Ok(())
}

/// Tab header with dots, then the active tab's labels, chart and badge.
pub fn draw_dashboard<D, C, E, G>(target: &mut D, dash: &Dashboard<C, E, G>) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    target.clear(rgb(0x0C0F12))?;
    let tab = dash.tab();
    text(target, TAB_NAMES[tab], 8, 4, Rgb565::WHITE)?;
    draw_dots(target, TAB_NAMES.len(), tab, W - 30, 9)?;
    line(target, (0, 18), (W - 1, 18), Rgb565::CSS_DIM_GRAY)?;

    let (x, y) = (8, 26);
    match tab {
        TAB_CO2 => {
            let l = &dash.co2_labels;
            draw_labels(target, &[&l.co2, &l.temp, &l.hum, &l.status], x, y)?;
            text(target, "Plot: CO2 (ppm)", 124, 20, Rgb565::CSS_LIGHT_GRAY)?;
            dash.co2_chart.draw(target)?;
            draw_badge(target, &l.badge)?;
        }
        TAB_ENV => {
            let l = &dash.env_labels;
            draw_labels(target, &[&l.temp, &l.hum, &l.press, &l.gas], x, y)?;
            text(target, "Plot: T / RH / P", 124, 20, Rgb565::CSS_LIGHT_GRAY)?;
            dash.env_chart.draw(target)?;
            draw_badge(target, &l.badge)?;
        }
        TAB_MQ => {
            let l = &dash.mq_labels;
            draw_labels(target, &[&l.valid, &l.adc8, &l.adc12], x, y)?;
            text(target, "Plot: MQ (12b)", 124, 20, Rgb565::CSS_LIGHT_GRAY)?;
            dash.mq_chart.draw(target)?;
            draw_badge(target, &l.badge)?;
        }
        _ => {
            let o = &dash.overview;
            draw_labels(target, &[&o.co2, &o.temp, &o.hum, &o.press, &o.mq], x, y)?;
        }
    }
    Ok(())
}

/// Latest value, under the chart's right edge.
fn draw_badge<D>(target: &mut D, badge: &LabelText) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    text_on(target, badge.as_str(), 124, H - 22, Rgb565::BLACK, Rgb565::CSS_LIGHT_GRAY)
}
