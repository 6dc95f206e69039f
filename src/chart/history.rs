use super::Bounds;
use heapless::Deque;

/// Rolling sample window, oldest first.
#[derive(Clone, Debug)]
pub struct SeriesHistory<const N: usize> {
    samples: Deque<f32, N>,
}

impl<const N: usize> SeriesHistory<N> {
    pub const fn new() -> Self {
        Self {
            samples: Deque::new(),
        }
    }

    /// Append, dropping the oldest sample once full.
    pub fn push(&mut self, value: f32) {
        if self.samples.is_full() {
            self.samples.pop_front();
        }
        let _ = self.samples.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        N
    }

    pub fn latest(&self) -> Option<f32> {
        self.samples.back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.samples.iter().copied()
    }

    /// Min/max of the window, `None` when empty.
    pub fn bounds(&self) -> Option<Bounds> {
        let mut it = self.iter();
        let first = it.next()?;
        let (min, max) = it.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        Some(Bounds::new(min, max))
    }
}

impl<const N: usize> Default for SeriesHistory<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_keeps_last_capacity_values_in_order() {
        let mut h: SeriesHistory<4> = SeriesHistory::new();
        for v in 1..=5 {
            h.push(v as f32);
            assert!(h.len() <= h.capacity());
        }
        let kept: heapless::Vec<f32, 4> = h.iter().collect();
        assert_eq!(kept.as_slice(), &[2.0, 3.0, 4.0, 5.0]);
        assert_eq!(h.latest(), Some(5.0));
    }

    #[test]
    fn bounds_of_window() {
        let mut h: SeriesHistory<8> = SeriesHistory::new();
        assert!(h.bounds().is_none());
        for v in [612.0, 598.0, 640.5, 601.0] {
            h.push(v);
        }
        assert_eq!(h.bounds(), Some(Bounds::new(598.0, 640.5)));
    }

    #[test]
    fn bounds_forget_evicted_extremes() {
        let mut h: SeriesHistory<2> = SeriesHistory::new();
        h.push(1000.0);
        h.push(10.0);
        h.push(12.0);
        assert_eq!(h.bounds(), Some(Bounds::new(10.0, 12.0)));
    }
}
