//! Three-unit sensor dashboard.
//!
//! Each unit is polled on its own period, staggered so the first polls do
//! not land on the same frame.  Every reading goes through the chart feed;
//! labels, charts and badges only change when the feed admits a refresh
//! for that unit.

use crate::chart::{ChartFeed, ChartId, FeedConfig, RefreshKey, Sample, SeriesId};
use crate::config::{
    HISTORY_LEN, PERIOD_CO2L_MS, PERIOD_ENVPRO_MS, PERIOD_MQ_MS, STAGGER_CO2L_MS,
    STAGGER_ENVPRO_MS, STAGGER_MQ_MS,
};
use crate::sensors::{co2_band, Co2Sensor, EnvSensor, GasSensor};
use crate::time::{Millis, Periodic};
use crate::ui::chart::LineChart;
use crate::ui::input_logic::{page_next, page_prev};
use crate::ui::text::Label;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

pub const TAB_NAMES: [&str; 4] = ["Dashboard", "CO2L", "ENV Pro", "MQ"];

pub const TAB_OVERVIEW: usize = 0;
pub const TAB_CO2: usize = 1;
pub const TAB_ENV: usize = 2;
pub const TAB_MQ: usize = 3;

pub const CO2_SERIES: SeriesId = SeriesId::new(ChartId(0), 0);
pub const ENV_TEMP_SERIES: SeriesId = SeriesId::new(ChartId(1), 0);
pub const ENV_HUM_SERIES: SeriesId = SeriesId::new(ChartId(1), 1);
pub const ENV_PRESS_SERIES: SeriesId = SeriesId::new(ChartId(1), 2);
pub const MQ_SERIES: SeriesId = SeriesId::new(ChartId(2), 0);

/// Where tab charts are drawn (right half, below the tab header).
pub const CHART_AREA: Rectangle = Rectangle::new(Point::new(124, 30), Size::new(108, 80));

/// Text capacity of one label.
pub const LABEL_LEN: usize = 32;

pub type Text = Label<LABEL_LEN>;

/// Labels of the overview tab.
pub struct OverviewLabels {
    pub co2: Text,
    pub temp: Text,
    pub hum: Text,
    pub press: Text,
    pub mq: Text,
}

pub struct Co2Labels {
    pub co2: Text,
    pub temp: Text,
    pub hum: Text,
    pub status: Text,
    pub badge: Text,
}

pub struct EnvLabels {
    pub temp: Text,
    pub hum: Text,
    pub press: Text,
    pub gas: Text,
    pub badge: Text,
}

pub struct MqLabels {
    pub valid: Text,
    pub adc8: Text,
    pub adc12: Text,
    pub badge: Text,
}

/// Dashboard state: units, poll timers, feed, charts and labels.
pub struct Dashboard<C, E, G> {
    co2: Option<C>,
    env: Option<E>,
    mq: Option<G>,
    co2_timer: Periodic,
    env_timer: Periodic,
    mq_timer: Periodic,
    tab: usize,
    pub feed: ChartFeed,
    pub co2_chart: LineChart<1, HISTORY_LEN>,
    pub env_chart: LineChart<3, HISTORY_LEN>,
    pub mq_chart: LineChart<1, HISTORY_LEN>,
    pub overview: OverviewLabels,
    pub co2_labels: Co2Labels,
    pub env_labels: EnvLabels,
    pub mq_labels: MqLabels,
}

impl<C, E, G> Dashboard<C, E, G> {
    pub fn tab(&self) -> usize {
        self.tab
    }

    pub fn set_tab(&mut self, tab: usize) {
        self.tab = tab.min(TAB_NAMES.len() - 1);
    }

    pub fn next_tab(&mut self) {
        self.tab = page_next(self.tab, TAB_NAMES.len());
    }

    pub fn prev_tab(&mut self) {
        self.tab = page_prev(self.tab, TAB_NAMES.len());
    }
}

impl<C: Co2Sensor, E: EnvSensor, G: GasSensor> Dashboard<C, E, G> {
    pub fn new(co2: Option<C>, env: Option<E>, mq: Option<G>, now: Millis) -> Self {
        Self {
            co2,
            env,
            mq,
            co2_timer: Periodic::staggered(PERIOD_CO2L_MS, now, STAGGER_CO2L_MS),
            env_timer: Periodic::staggered(PERIOD_ENVPRO_MS, now, STAGGER_ENVPRO_MS),
            mq_timer: Periodic::staggered(PERIOD_MQ_MS, now, STAGGER_MQ_MS),
            tab: TAB_OVERVIEW,
            feed: ChartFeed::new(FeedConfig::default()),
            co2_chart: LineChart::ranged(CHART_AREA, [Rgb565::CSS_LIME_GREEN]),
            // ENV mixes units on one axis, so each series is normalised.
            env_chart: LineChart::fixed(
                CHART_AREA,
                [Rgb565::CSS_ORANGE_RED, Rgb565::CSS_DEEP_SKY_BLUE, Rgb565::CSS_GOLD],
            ),
            mq_chart: LineChart::ranged(CHART_AREA, [Rgb565::CSS_VIOLET]),
            overview: OverviewLabels {
                co2: Text::new("CO2: -- ppm"),
                temp: Text::new("Temp: -- C"),
                hum: Text::new("Hum:  -- %"),
                press: Text::new("Press: -- hPa"),
                mq: Text::new("MQ ADC: --"),
            },
            co2_labels: Co2Labels {
                co2: Text::new("CO2: -- ppm"),
                temp: Text::new("Temp: -- C"),
                hum: Text::new("Hum:  -- %"),
                status: Text::new("Status: waiting..."),
                badge: Text::new("-"),
            },
            env_labels: EnvLabels {
                temp: Text::new("Temp: -- C"),
                hum: Text::new("Hum:  -- %"),
                press: Text::new("Press: -- hPa"),
                gas: Text::new("Gas:  --"),
                badge: Text::new("-"),
            },
            mq_labels: MqLabels {
                valid: Text::new("Valid: --"),
                adc8: Text::new("ADC(8b): --"),
                adc12: Text::new("ADC(12b): --"),
                badge: Text::new("-"),
            },
        }
    }

    /// Run whichever polls are due.  Returns true if anything visible changed.
    pub fn poll(&mut self, now: Millis) -> bool {
        let mut dirty = false;
        if self.co2_timer.due(now) {
            dirty |= self.poll_co2(now);
        }
        if self.env_timer.due(now) {
            dirty |= self.poll_env(now);
        }
        if self.mq_timer.due(now) {
            dirty |= self.poll_mq(now);
        }
        dirty
    }

    pub fn poll_co2(&mut self, now: Millis) -> bool {
        let Some(unit) = self.co2.as_mut() else {
            return self.co2_labels.status.set("Status: Not available");
        };

        match unit.data_ready() {
            Ok(true) => {}
            Ok(false) => return self.co2_labels.status.set("Status: Waiting..."),
            Err(e) => {
                debug!("co2 data-ready failed: {:?}", e);
                return self.co2_labels.status.set("Status: Waiting...");
            }
        }

        let reading = match unit.read() {
            Ok(r) => r,
            Err(e) => {
                warn!("co2 read failed: {:?}", e);
                return self.co2_labels.status.set("Status: Read error");
            }
        };

        let sample = Sample::tracked(CO2_SERIES, RefreshKey::Co2, reading.ppm as f32);
        let out = self.feed.record_sample(&mut self.co2_chart, sample, now);
        if !out.refreshed {
            return false;
        }

        let band = co2_band(reading.ppm);
        let l = &mut self.co2_labels;
        l.co2.set_fmt(format_args!("CO2: {} ppm", reading.ppm));
        l.co2.set_color(band.color());
        l.temp.set_fmt(format_args!("Temp: {:.1} C", reading.temp_c));
        l.hum.set_fmt(format_args!("Hum:  {:.1} %", reading.rh));
        l.status.set_fmt(format_args!("Status: {}", band.label()));
        l.badge.set_fmt(format_args!("{}", reading.ppm));
        self.overview
            .co2
            .set_fmt(format_args!("CO2: {} ppm", reading.ppm));
        true
    }

    pub fn poll_env(&mut self, now: Millis) -> bool {
        let Some(unit) = self.env.as_mut() else {
            return self.env_labels.temp.set("Temp: -- (not available)");
        };

        let r = match unit.read() {
            Ok(r) => r,
            Err(e) => {
                debug!("env read failed: {:?}", e);
                return false;
            }
        };

        let series = [
            (ENV_TEMP_SERIES, r.temp_c),
            (ENV_HUM_SERIES, r.rh),
            (ENV_PRESS_SERIES, r.pressure_hpa),
        ];
        let mut refreshed = false;
        for (id, value) in series {
            let sample = Sample::tracked(id, RefreshKey::Env, value);
            refreshed |= self
                .feed
                .record_sample(&mut self.env_chart, sample, now)
                .refreshed;
        }
        if !refreshed {
            return false;
        }

        let l = &mut self.env_labels;
        l.temp.set_fmt(format_args!("Temp: {:.1} C", r.temp_c));
        l.hum.set_fmt(format_args!("Hum:  {:.1} %", r.rh));
        l.press.set_fmt(format_args!("Press: {:.1} hPa", r.pressure_hpa));
        match r.gas_ohm {
            Some(g) => l.gas.set_fmt(format_args!("Gas:  {:.0} Ohm", g)),
            None => l.gas.set("Gas:  --"),
        };
        l.badge.set_fmt(format_args!("{:.1} C", r.temp_c));

        let o = &mut self.overview;
        o.temp.set_fmt(format_args!("Temp: {:.1} C", r.temp_c));
        o.hum.set_fmt(format_args!("Hum:  {:.1} %", r.rh));
        o.press.set_fmt(format_args!("Press: {:.1} hPa", r.pressure_hpa));
        true
    }

    pub fn poll_mq(&mut self, now: Millis) -> bool {
        let Some(unit) = self.mq.as_mut() else {
            return self.mq_labels.valid.set("Valid: -- (not available)");
        };

        let r = match unit.read() {
            Ok(r) => r,
            Err(e) => {
                debug!("mq read failed: {:?}", e);
                return false;
            }
        };

        let sample = Sample::tracked(MQ_SERIES, RefreshKey::Mq, r.adc12 as f32);
        let out = self.feed.record_sample(&mut self.mq_chart, sample, now);
        if !out.refreshed {
            return false;
        }

        let l = &mut self.mq_labels;
        l.valid
            .set(if r.valid { "Valid: yes" } else { "Valid: no" });
        l.adc8.set_fmt(format_args!("ADC(8b): {}", r.adc8));
        l.adc12.set_fmt(format_args!("ADC(12b): {}", r.adc12));
        l.badge.set_fmt(format_args!("{}", r.adc12));
        self.overview
            .mq
            .set_fmt(format_args!("MQ ADC: {}", r.adc12));
        true
    }
}
