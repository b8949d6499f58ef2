//! Simple moving average over closing prices.
//!
//! SMA(n) = sum(C[i-j] for j in 0..n) / n, current bar included.

use crate::domain::history::History;

pub fn moving_average(history: &History, window: usize) -> Option<f64> {
    let closes = history.last_closes(window)?;
    Some(closes.sum::<f64>() / window as f64)
}
