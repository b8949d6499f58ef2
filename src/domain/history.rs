//! Bounded bar history owned by a strategy.
//!
//! Bars are kept in a ring buffer capped at the largest lookback any feature
//! needs, so memory stays flat over arbitrarily long runs. Older bars fall
//! off the front; `observed()` still counts every bar ever pushed.

use std::collections::VecDeque;

use crate::domain::ohlcv::OhlcvBar;

#[derive(Debug, Clone)]
pub struct History {
    bars: VecDeque<OhlcvBar>,
    capacity: usize,
    observed: usize,
}

impl History {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        History {
            bars: VecDeque::with_capacity(capacity),
            capacity,
            observed: 0,
        }
    }

    pub fn push(&mut self, bar: OhlcvBar) {
        if self.bars.len() == self.capacity {
            self.bars.pop_front();
        }
        self.bars.push_back(bar);
        self.observed += 1;
    }

    /// Number of bars currently retained (never above `capacity`).
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total bars pushed since construction.
    pub fn observed(&self) -> usize {
        self.observed
    }

    pub fn latest(&self) -> Option<&OhlcvBar> {
        self.bars.back()
    }

    /// Closes of the last `window` bars, oldest first, or `None` when fewer
    /// than `window` bars are retained.
    pub fn last_closes(&self, window: usize) -> Option<impl Iterator<Item = f64> + '_> {
        if window == 0 || self.bars.len() < window {
            return None;
        }
        Some(self.bars.range(self.bars.len() - window..).map(|b| b.close))
    }
}
