//! Rolling volatility of closing prices.
//!
//! Sample standard deviation over the last n closes:
//! STDDEV(n) = sqrt(sum((C[i-j] - SMA(n))^2 for j in 0..n) / (n - 1))
//! Undefined (None) for n < 2 or until n bars have been observed.

use crate::domain::history::History;

pub fn sample_stddev(history: &History, window: usize) -> Option<f64> {
    if window < 2 {
        return None;
    }
    let closes: Vec<f64> = history.last_closes(window)?.collect();

    let mean = closes.iter().sum::<f64>() / window as f64;
    let variance = closes
        .iter()
        .map(|c| {
            let diff = c - mean;
            diff * diff
        })
        .sum::<f64>()
        / (window - 1) as f64;

    Some(variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::OhlcvBar;
    use chrono::NaiveDate;

    fn make_history(prices: &[f64]) -> History {
        let mut h = History::with_capacity(prices.len().max(1));
        for (i, &close) in prices.iter().enumerate() {
            h.push(OhlcvBar {
                date: NaiveDate::from_ymd_opt(2024, 1, (i + 1) as u32).unwrap(),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000.0,
            });
        }
        h
    }

    #[test]
    fn stddev_warmup() {
        let h = make_history(&[10.0, 20.0]);
        assert_eq!(sample_stddev(&h, 3), None);
    }

    #[test]
    fn stddev_constant_values() {
        let h = make_history(&[100.0, 100.0, 100.0]);
        assert_eq!(sample_stddev(&h, 3), Some(0.0));
    }

    #[test]
    fn stddev_basic_calculation() {
        let h = make_history(&[10.0, 20.0, 30.0]);
        // mean 20, squared deviations 100 + 0 + 100, divisor 2
        let v = sample_stddev(&h, 3).unwrap();
        assert!((v - 10.0).abs() < 1e-10);
    }

    #[test]
    fn stddev_known_values() {
        let h = make_history(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        // population stddev is 2.0, sample is sqrt(32 / 7)
        let v = sample_stddev(&h, 8).unwrap();
        assert!((v - (32.0_f64 / 7.0).sqrt()).abs() < 1e-10);
    }

    #[test]
    fn stddev_window_below_two_is_undefined() {
        let h = make_history(&[1.0, 2.0, 3.0]);
        assert_eq!(sample_stddev(&h, 1), None);
        assert_eq!(sample_stddev(&h, 0), None);
    }
}
