//! The per-observation entry point of the chart feed.

use super::{Bounds, ChartId, ChartWidget, RangeMode, RefreshKey, SeriesHistory, SeriesId};
use crate::config::{
    HISTORY_LEN, MAX_CHARTS, MAX_SERIES, RANGE_HYSTERESIS_PCT, RANGE_REFRESH_MS, UI_THROTTLE_MS,
};
use crate::time::{Gate, Millis};
use heapless::LinearMap;

/// Feed tuning.
#[derive(Clone, Copy, Debug)]
pub struct FeedConfig {
    /// Minimum time between visible refreshes of one [`RefreshKey`] (ms).
    pub throttle_ms: u32,
    /// Cooldown between range commits (ms).
    pub range_refresh_ms: u32,
    /// Span change (percent) that overrides the cooldown.
    pub hysteresis_pct: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            throttle_ms: UI_THROTTLE_MS,
            range_refresh_ms: RANGE_REFRESH_MS,
            hysteresis_pct: RANGE_HYSTERESIS_PCT,
        }
    }
}

/// One observation handed to [`ChartFeed::record_sample`].
#[derive(Clone, Copy, Debug)]
pub struct Sample {
    pub series: SeriesId,
    pub key: RefreshKey,
    pub value: f32,
    /// Bounds to use when the series keeps no history.
    pub explicit: Option<Bounds>,
    /// Whether the value joins the series' rolling history.
    pub tracked: bool,
}

impl Sample {
    /// A sample that joins the series history; bounds follow the history.
    pub fn tracked(series: SeriesId, key: RefreshKey, value: f32) -> Self {
        Self {
            series,
            key,
            value,
            explicit: None,
            tracked: true,
        }
    }

    /// A one-off sample; bounds are `explicit` or the value itself.
    pub fn untracked(series: SeriesId, key: RefreshKey, value: f32) -> Self {
        Self {
            tracked: false,
            ..Self::tracked(series, key, value)
        }
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.explicit = Some(bounds);
        self
    }
}

/// What happened to a sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlotOutcome {
    /// Value in the widget's scale (raw, or 0..=100 when normalized).
    pub plotted: i32,
    /// Bounds the value was placed in.
    pub bounds: Bounds,
    /// False when the refresh throttle suppressed all widget calls.
    pub refreshed: bool,
    /// True when a new Y range was committed to the widget.
    pub range_committed: bool,
}

/// Range bookkeeping for one chart.
#[derive(Clone, Copy, Debug)]
pub struct ChartRangeState {
    /// `None` until the first range attempt.
    mode: Option<RangeMode>,
    committed: Bounds,
    committed_at: Option<Millis>,
}

impl ChartRangeState {
    const fn new() -> Self {
        Self {
            mode: None,
            committed: Bounds::new(0.0, 100.0),
            committed_at: None,
        }
    }

    pub fn mode(&self) -> Option<RangeMode> {
        self.mode
    }

    pub fn committed(&self) -> Bounds {
        self.committed
    }

    pub fn committed_at(&self) -> Option<Millis> {
        self.committed_at
    }
}

/// Owns every series history and chart range state.
pub struct ChartFeed {
    config: FeedConfig,
    charts: LinearMap<ChartId, ChartRangeState, MAX_CHARTS>,
    series: LinearMap<SeriesId, SeriesHistory<HISTORY_LEN>, MAX_SERIES>,
    gates: [Gate; RefreshKey::COUNT],
    /// Chart each gate last admitted a refresh for.
    admitted: [Option<ChartId>; RefreshKey::COUNT],
}

impl ChartFeed {
    pub fn new(config: FeedConfig) -> Self {
        Self {
            config,
            charts: LinearMap::new(),
            series: LinearMap::new(),
            gates: [Gate::new(config.throttle_ms); RefreshKey::COUNT],
            admitted: [None; RefreshKey::COUNT],
        }
    }

    pub fn history(&self, series: SeriesId) -> Option<&SeriesHistory<HISTORY_LEN>> {
        self.series.get(&series)
    }

    pub fn chart_state(&self, chart: ChartId) -> Option<&ChartRangeState> {
        self.charts.get(&chart)
    }

    /// Whether visible state for `key` on `chart` may change at `now`.
    ///
    /// Other series of the admitted chart stamped with the same instant
    /// share its refresh, so a multi-series chart lands in one tick.
    pub fn admit_refresh(&mut self, key: RefreshKey, chart: ChartId, now: Millis) -> bool {
        let i = key.index();
        if self.gates[i].last() == Some(now) {
            return self.admitted[i] == Some(chart);
        }
        if self.gates[i].admit(now) {
            self.admitted[i] = Some(chart);
            true
        } else {
            false
        }
    }

    /// Record one observation and, unless throttled, plot it.
    ///
    /// Widget failures are logged and swallowed; the sample stays in the
    /// history either way.
    pub fn record_sample<W: ChartWidget>(
        &mut self,
        widget: &mut W,
        sample: Sample,
        now: Millis,
    ) -> PlotOutcome {
        let bounds = self.desired_bounds(&sample);
        let chart = sample.series.chart;

        if self.charts.get(&chart).is_none()
            && self.charts.insert(chart, ChartRangeState::new()).is_err()
        {
            warn!("chart feed full - chart {} not tracked", chart.0);
        }

        let refreshed = self.admit_refresh(sample.key, chart, now);
        let mut range_committed = false;

        if refreshed {
            if let Some(st) = self.charts.get_mut(&chart) {
                range_committed = apply_range(&self.config, st, widget, bounds, now);
            }
        }

        let mode = self
            .charts
            .get(&chart)
            .and_then(|st| st.mode)
            .unwrap_or(RangeMode::NormalizedFallback);
        let plotted = match mode {
            RangeMode::RangeCapable => sample.value as i32,
            RangeMode::NormalizedFallback => normalize(sample.value, bounds),
        };

        if refreshed {
            if let Err(e) = widget.push(sample.series.slot, plotted) {
                debug!("chart {} push failed: {:?}", chart.0, e);
            }
        }

        PlotOutcome {
            plotted,
            bounds,
            refreshed,
            range_committed,
        }
    }

    /// Append to history (for tracked samples) and derive the range.
    fn desired_bounds(&mut self, sample: &Sample) -> Bounds {
        let mut from_history = None;
        if sample.tracked {
            if self.series.get(&sample.series).is_none()
                && self
                    .series
                    .insert(sample.series, SeriesHistory::new())
                    .is_err()
            {
                warn!("chart feed full - series not tracked");
            }
            if let Some(history) = self.series.get_mut(&sample.series) {
                history.push(sample.value);
                from_history = history.bounds();
            }
        }
        from_history
            .or(sample.explicit)
            .unwrap_or(Bounds::point(sample.value))
            .widened()
    }
}

/// Discover or refresh the chart's Y range.  Returns true on a commit.
fn apply_range<W: ChartWidget>(
    config: &FeedConfig,
    st: &mut ChartRangeState,
    widget: &mut W,
    bounds: Bounds,
    now: Millis,
) -> bool {
    let (lo, hi) = bounds.to_axis();
    match st.mode {
        None => {
            let ok = widget.set_range(lo, hi).is_ok();
            st.mode = Some(if ok {
                RangeMode::RangeCapable
            } else {
                RangeMode::NormalizedFallback
            });
            st.committed = bounds;
            st.committed_at = Some(now);
            debug!("chart range mode resolved: {:?}", st.mode);
            ok
        }
        Some(RangeMode::RangeCapable) => {
            if !should_refresh_range(config, st, bounds, now) {
                return false;
            }
            match widget.set_range(lo, hi) {
                Ok(()) => {
                    st.committed = bounds;
                    st.committed_at = Some(now);
                    true
                }
                Err(e) => {
                    debug!("range commit failed: {:?}", e);
                    false
                }
            }
        }
        Some(RangeMode::NormalizedFallback) => false,
    }
}

/// Cooldown elapsed, or the span moved outside the hysteresis band.
fn should_refresh_range(
    config: &FeedConfig,
    st: &ChartRangeState,
    bounds: Bounds,
    now: Millis,
) -> bool {
    let Some(at) = st.committed_at else {
        return true;
    };
    if now.since(at) >= config.range_refresh_ms {
        return true;
    }
    let prev_span = nonzero_span(st.committed);
    let new_span = nonzero_span(bounds);
    let band = config.hysteresis_pct as f32 / 100.0;
    new_span > prev_span * (1.0 + band) || new_span < prev_span * (1.0 - band)
}

fn nonzero_span(b: Bounds) -> f32 {
    let span = b.span();
    if span == 0.0 {
        1.0
    } else {
        span
    }
}

/// Map `value` into 0..=100 within `bounds`.
pub fn normalize(value: f32, bounds: Bounds) -> i32 {
    let span = nonzero_span(bounds);
    let scaled = ((value - bounds.min) * 100.0 / span) as i32;
    scaled.clamp(0, 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChartError;
    use heapless::Vec;

    /// Records every call; optionally refuses ranges.
    struct FakeChart {
        range_ok: bool,
        push_ok: bool,
        ranges: Vec<(i32, i32), 32>,
        points: Vec<(u8, i32), 64>,
    }

    impl FakeChart {
        fn ranged() -> Self {
            Self {
                range_ok: true,
                push_ok: true,
                ranges: Vec::new(),
                points: Vec::new(),
            }
        }

        fn fixed() -> Self {
            Self {
                range_ok: false,
                ..Self::ranged()
            }
        }
    }

    impl ChartWidget for FakeChart {
        fn set_range(&mut self, min: i32, max: i32) -> Result<(), ChartError> {
            let _ = self.ranges.push((min, max));
            if self.range_ok {
                Ok(())
            } else {
                Err(ChartError::Unsupported)
            }
        }

        fn push(&mut self, slot: u8, value: i32) -> Result<(), ChartError> {
            if !self.push_ok {
                return Err(ChartError::Backend);
            }
            let _ = self.points.push((slot, value));
            Ok(())
        }
    }

    const CO2: SeriesId = SeriesId::new(ChartId(0), 0);

    fn feed() -> ChartFeed {
        ChartFeed::new(FeedConfig::default())
    }

    #[test]
    fn history_keeps_last_capacity_samples() {
        let mut f = feed();
        let mut w = FakeChart::ranged();
        for i in 0..=HISTORY_LEN {
            let t = Millis(i as u32 * 1_000);
            f.record_sample(&mut w, Sample::tracked(CO2, RefreshKey::Co2, i as f32), t);
        }
        let h = f.history(CO2).unwrap();
        assert_eq!(h.len(), HISTORY_LEN);
        let first = h.iter().next().unwrap();
        assert_eq!(first, 1.0);
        assert_eq!(h.latest(), Some(HISTORY_LEN as f32));
    }

    #[test]
    fn repeated_value_widens_range_without_division_by_zero() {
        let mut f = feed();
        let mut w = FakeChart::fixed();
        let mut last = None;
        for i in 0..3 {
            let t = Millis(i * 1_000);
            last = Some(f.record_sample(&mut w, Sample::tracked(CO2, RefreshKey::Co2, 700.0), t));
        }
        let out = last.unwrap();
        assert!(out.bounds.span() >= 2.0);
        assert_eq!(out.plotted, 50);
    }

    #[test]
    fn first_sample_tests_range_support_and_capable_plots_raw() {
        let mut f = feed();
        let mut w = FakeChart::ranged();
        let out = f.record_sample(&mut w, Sample::tracked(CO2, RefreshKey::Co2, 612.0), Millis(0));
        assert!(out.range_committed);
        assert_eq!(w.ranges.as_slice(), &[(611, 613)]);
        assert_eq!(w.points.as_slice(), &[(0, 612)]);
        assert_eq!(
            f.chart_state(ChartId(0)).unwrap().mode(),
            Some(RangeMode::RangeCapable)
        );
    }

    #[test]
    fn capability_absence_is_sticky() {
        let mut f = feed();
        let mut w = FakeChart::fixed();
        let values = [10.0, 500.0, 3.0, 9_000.0, 42.0];
        for (i, v) in values.iter().enumerate() {
            let t = Millis(i as u32 * 5_000);
            f.record_sample(&mut w, Sample::tracked(CO2, RefreshKey::Co2, *v), t);
        }
        // Only the first call ever tried to set a range.
        assert_eq!(w.ranges.len(), 1);
        assert_eq!(
            f.chart_state(ChartId(0)).unwrap().mode(),
            Some(RangeMode::NormalizedFallback)
        );
        assert_eq!(w.points.len(), values.len());
        assert!(w.points.iter().all(|&(_, v)| (0..=100).contains(&v)));
    }

    #[test]
    fn fallback_normalizes_into_window() {
        let mut f = feed();
        let mut w = FakeChart::fixed();
        f.record_sample(&mut w, Sample::tracked(CO2, RefreshKey::Co2, 400.0), Millis(0));
        f.record_sample(&mut w, Sample::tracked(CO2, RefreshKey::Co2, 800.0), Millis(1_000));
        let out = f.record_sample(&mut w, Sample::tracked(CO2, RefreshKey::Co2, 700.0), Millis(2_000));
        assert_eq!(out.bounds, Bounds::new(400.0, 800.0));
        assert_eq!(out.plotted, 75);
    }

    #[test]
    fn range_held_inside_cooldown_and_hysteresis() {
        let mut f = feed();
        let mut w = FakeChart::ranged();
        f.record_sample(&mut w, Sample::tracked(CO2, RefreshKey::Co2, 600.0), Millis(0));
        f.record_sample(&mut w, Sample::tracked(CO2, RefreshKey::Co2, 610.0), Millis(300));
        // span 2 (widened) -> 10 is a big jump: commits despite cooldown
        assert_eq!(w.ranges.len(), 2);

        // 611 widens span 10 -> 11 (+10%): held
        let out = f.record_sample(&mut w, Sample::tracked(CO2, RefreshKey::Co2, 611.0), Millis(600));
        assert!(!out.range_committed);
        assert_eq!(w.ranges.len(), 2);

        // cooldown since the last commit (300 ms) has passed
        let out = f.record_sample(&mut w, Sample::tracked(CO2, RefreshKey::Co2, 611.0), Millis(1_500));
        assert!(out.range_committed);
        assert_eq!(w.ranges.last(), Some(&(600, 611)));
    }

    #[test]
    fn narrowing_window_commits_inside_cooldown() {
        let mut f = feed();
        let mut w = FakeChart::ranged();
        let at = |lo: f32, hi: f32| {
            Sample::untracked(CO2, RefreshKey::Co2, lo).with_bounds(Bounds::new(lo, hi))
        };
        f.record_sample(&mut w, at(0.0, 100.0), Millis(0));
        assert_eq!(w.ranges.as_slice(), &[(0, 100)]);

        // -10%: held
        let out = f.record_sample(&mut w, at(0.0, 90.0), Millis(300));
        assert!(!out.range_committed);
        assert_eq!(w.ranges.len(), 1);

        // -30% of the committed span: commits well inside the cooldown
        let out = f.record_sample(&mut w, at(0.0, 70.0), Millis(600));
        assert!(out.range_committed);
        assert_eq!(w.ranges.last(), Some(&(0, 70)));
        assert_eq!(f.chart_state(ChartId(0)).unwrap().committed_at(), Some(Millis(600)));
    }

    #[test]
    fn throttle_suppresses_visible_refresh_but_history_grows() {
        let mut f = feed();
        let mut w = FakeChart::ranged();
        let a = f.record_sample(&mut w, Sample::tracked(CO2, RefreshKey::Co2, 500.0), Millis(1_000));
        let b = f.record_sample(&mut w, Sample::tracked(CO2, RefreshKey::Co2, 520.0), Millis(1_050));
        assert!(a.refreshed);
        assert!(!b.refreshed);
        assert_eq!(w.points.len(), 1);
        assert_eq!(f.history(CO2).unwrap().len(), 2);

        let c = f.record_sample(&mut w, Sample::tracked(CO2, RefreshKey::Co2, 530.0), Millis(1_200));
        assert!(c.refreshed);
        assert_eq!(w.points.len(), 2);
    }

    #[test]
    fn throttle_is_per_key() {
        let mut f = feed();
        let mut w = FakeChart::ranged();
        let mq = SeriesId::new(ChartId(2), 0);
        f.record_sample(&mut w, Sample::tracked(CO2, RefreshKey::Co2, 500.0), Millis(1_000));
        let out = f.record_sample(&mut w, Sample::tracked(mq, RefreshKey::Mq, 1_800.0), Millis(1_010));
        assert!(out.refreshed);
    }

    #[test]
    fn series_sharing_an_instant_share_the_refresh() {
        let mut f = feed();
        let mut w = FakeChart::fixed();
        let now = Millis(5_000);
        for slot in 0..3 {
            let s = SeriesId::new(ChartId(1), slot);
            let out = f.record_sample(&mut w, Sample::tracked(s, RefreshKey::Env, 20.0 + slot as f32), now);
            assert!(out.refreshed);
        }
        assert_eq!(w.points.len(), 3);
    }

    #[test]
    fn shared_instant_does_not_cross_charts() {
        let mut f = feed();
        let mut w = FakeChart::fixed();
        let now = Millis(5_000);
        let a = SeriesId::new(ChartId(1), 0);
        let b = SeriesId::new(ChartId(3), 0);
        assert!(f.record_sample(&mut w, Sample::tracked(a, RefreshKey::Env, 1.0), now).refreshed);
        assert!(!f.record_sample(&mut w, Sample::tracked(b, RefreshKey::Env, 2.0), now).refreshed);
        assert_eq!(w.points.len(), 1);
    }

    #[test]
    fn untracked_sample_uses_explicit_bounds() {
        let mut f = feed();
        let mut w = FakeChart::fixed();
        let s = Sample::untracked(CO2, RefreshKey::Co2, 25.0).with_bounds(Bounds::new(0.0, 50.0));
        let out = f.record_sample(&mut w, s, Millis(0));
        assert_eq!(out.plotted, 50);
        assert!(f.history(CO2).is_none());
    }

    #[test]
    fn untracked_without_bounds_centres_value() {
        let mut f = feed();
        let mut w = FakeChart::fixed();
        let out = f.record_sample(&mut w, Sample::untracked(CO2, RefreshKey::Co2, 9.0), Millis(0));
        assert_eq!(out.bounds, Bounds::new(8.0, 10.0));
        assert_eq!(out.plotted, 50);
    }

    #[test]
    fn widget_failure_keeps_sample_in_history() {
        let mut f = feed();
        let mut w = FakeChart::ranged();
        w.push_ok = false;
        let out = f.record_sample(&mut w, Sample::tracked(CO2, RefreshKey::Co2, 480.0), Millis(0));
        assert!(out.refreshed);
        assert_eq!(f.history(CO2).unwrap().len(), 1);
    }

    #[test]
    fn normalize_clamps() {
        let b = Bounds::new(0.0, 10.0);
        assert_eq!(normalize(-5.0, b), 0);
        assert_eq!(normalize(15.0, b), 100);
        assert_eq!(normalize(2.5, b), 25);
    }
}
