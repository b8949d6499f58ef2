//! Position sizer: ratchets the target weight one step at a time.
//!
//! The gate (if configured) is checked first; a closed gate freezes the
//! weight. Otherwise the directional signal moves the weight up or down by
//! `step`, clamped to [0, 1].

use crate::domain::error::SteptraderError;
use crate::domain::signal::{Direction, SignalClass, SignalSet, SignalValue};

#[derive(Debug, Clone, PartialEq)]
pub struct PositionSizer {
    directional: String,
    gate: Option<String>,
    step: f64,
}

impl PositionSizer {
    pub fn new(
        directional: impl Into<String>,
        gate: Option<String>,
        step: f64,
    ) -> Result<Self, SteptraderError> {
        if !(step > 0.0 && step <= 1.0) {
            return Err(SteptraderError::invalid(
                "strategy",
                "step",
                "step must be in (0, 1]",
            ));
        }
        Ok(PositionSizer {
            directional: directional.into(),
            gate,
            step,
        })
    }

    pub fn directional(&self) -> &str {
        &self.directional
    }

    pub fn gate(&self) -> Option<&str> {
        self.gate.as_deref()
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Check that every referenced signal exists and has the right class.
    pub fn bind(&self, signals: &SignalSet) -> Result<(), SteptraderError> {
        check_slot(signals, &self.directional, SignalClass::Directional)?;
        if let Some(gate) = &self.gate {
            check_slot(signals, gate, SignalClass::Gate)?;
        }
        Ok(())
    }

    pub fn calculate_target(
        &self,
        current_weight: f64,
        signals: &SignalSet,
    ) -> Result<f64, SteptraderError> {
        self.bind(signals)?;
        let current = current_weight.clamp(0.0, 1.0);

        if let Some(gate) = &self.gate {
            // A gate that has not been evaluated yet counts as closed.
            let open = matches!(signals.value(gate), Some(SignalValue::Gate(true)));
            if !open {
                return Ok(current);
            }
        }

        let direction = match signals.value(&self.directional) {
            Some(SignalValue::Direction(d)) => d,
            _ => Direction::Flat,
        };

        Ok(match direction {
            Direction::Long => (current + self.step).min(1.0),
            Direction::Short => (current - self.step).max(0.0),
            Direction::Flat => current,
        })
    }
}

fn check_slot(
    signals: &SignalSet,
    name: &str,
    expected: SignalClass,
) -> Result<(), SteptraderError> {
    match signals.class_of(name) {
        None => Err(SteptraderError::UnknownReference {
            owner: "position sizer".to_string(),
            kind: "signal",
            name: name.to_string(),
        }),
        Some(found) if found != expected => Err(SteptraderError::ReferenceKind {
            owner: "position sizer".to_string(),
            name: name.to_string(),
            expected: expected.as_str(),
            found: found.as_str(),
        }),
        Some(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::feature::{FeatureKind, FeatureSet};
    use crate::domain::history::History;
    use crate::domain::ohlcv::OhlcvBar;
    use crate::domain::signal::SignalKind;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    fn bar(close: f64) -> OhlcvBar {
        OhlcvBar {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1000.0,
        }
    }

    /// Signals evaluated against an SMA(1) "ma" of `reference` and a
    /// gate on the same value with `threshold`, for a bar closing at `close`.
    fn evaluated(reference: f64, close: f64, threshold: f64) -> SignalSet {
        let mut features = FeatureSet::new();
        features.insert("ma", FeatureKind::MovingAverage { window: 1 }).unwrap();
        let mut history = History::with_capacity(1);
        history.push(bar(reference));
        features.update_all(&history);

        let mut signals = SignalSet::new();
        signals
            .insert("mom", SignalKind::Momentum { feature: "ma".into() }, &features)
            .unwrap();
        signals
            .insert(
                "gate",
                SignalKind::VolatilityGate {
                    feature: "ma".into(),
                    threshold,
                },
                &features,
            )
            .unwrap();
        signals.update_all(&bar(close), &features);
        signals
    }

    #[test]
    fn rejects_step_out_of_range() {
        assert!(PositionSizer::new("mom", None, 0.0).is_err());
        assert!(PositionSizer::new("mom", None, 1.5).is_err());
        assert!(PositionSizer::new("mom", None, f64::NAN).is_err());
        assert!(PositionSizer::new("mom", None, 1.0).is_ok());
    }

    #[test]
    fn long_signal_steps_up_and_caps() {
        let sizer = PositionSizer::new("mom", None, 0.1).unwrap();
        let signals = evaluated(100.0, 105.0, 0.0);
        assert_abs_diff_eq!(sizer.calculate_target(0.3, &signals).unwrap(), 0.4, epsilon = 1e-12);
        assert_eq!(sizer.calculate_target(0.95, &signals).unwrap(), 1.0);
    }

    #[test]
    fn short_signal_steps_down_and_floors() {
        let sizer = PositionSizer::new("mom", None, 0.1).unwrap();
        let signals = evaluated(100.0, 95.0, 0.0);
        assert_abs_diff_eq!(sizer.calculate_target(0.3, &signals).unwrap(), 0.2, epsilon = 1e-12);
        assert_eq!(sizer.calculate_target(0.05, &signals).unwrap(), 0.0);
    }

    #[test]
    fn flat_signal_holds() {
        let sizer = PositionSizer::new("mom", None, 0.1).unwrap();
        let signals = evaluated(100.0, 100.0, 0.0);
        assert_eq!(sizer.calculate_target(0.3, &signals).unwrap(), 0.3);
    }

    #[test]
    fn closed_gate_freezes_weight() {
        let sizer = PositionSizer::new("mom", Some("gate".into()), 0.1).unwrap();
        // reference 100 is not below threshold 50, so the gate is closed
        let up = evaluated(100.0, 105.0, 50.0);
        let down = evaluated(100.0, 95.0, 50.0);
        assert_eq!(sizer.calculate_target(0.5, &up).unwrap(), 0.5);
        assert_eq!(sizer.calculate_target(0.5, &down).unwrap(), 0.5);
    }

    #[test]
    fn open_gate_lets_direction_through() {
        let sizer = PositionSizer::new("mom", Some("gate".into()), 0.25).unwrap();
        let signals = evaluated(100.0, 105.0, 500.0);
        assert_eq!(sizer.calculate_target(0.5, &signals).unwrap(), 0.75);
    }

    #[test]
    fn out_of_range_current_weight_is_clamped() {
        let sizer = PositionSizer::new("mom", None, 0.1).unwrap();
        let flat = evaluated(100.0, 100.0, 0.0);
        assert_eq!(sizer.calculate_target(1.7, &flat).unwrap(), 1.0);
        assert_eq!(sizer.calculate_target(-0.2, &flat).unwrap(), 0.0);
    }

    #[test]
    fn unknown_signal_is_an_error() {
        let sizer = PositionSizer::new("missing", None, 0.1).unwrap();
        let signals = evaluated(100.0, 100.0, 0.0);
        let err = sizer.calculate_target(0.0, &signals).unwrap_err();
        assert!(matches!(err, SteptraderError::UnknownReference { kind: "signal", .. }));
    }

    #[test]
    fn gate_slot_rejects_directional_signal() {
        let sizer = PositionSizer::new("mom", Some("mom".into()), 0.1).unwrap();
        let signals = evaluated(100.0, 100.0, 0.0);
        let err = sizer.bind(&signals).unwrap_err();
        assert!(matches!(
            err,
            SteptraderError::ReferenceKind { expected: "gate", found: "directional", .. }
        ));
    }

    #[test]
    fn directional_slot_rejects_gate() {
        let sizer = PositionSizer::new("gate", None, 0.1).unwrap();
        let signals = evaluated(100.0, 100.0, 0.0);
        assert!(sizer.bind(&signals).is_err());
    }
}
