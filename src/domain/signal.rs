//! Signal layer: directional and gating decisions derived from features.
//!
//! Signals are pure functions of the current bar and the same-bar values of
//! the features they name. Feature references are resolved when a signal is
//! registered, so evaluation never meets a dangling name.

use std::collections::HashMap;
use std::fmt;

use crate::domain::error::SteptraderError;
use crate::domain::feature::FeatureSet;
use crate::domain::ohlcv::OhlcvBar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Long,
    Short,
    Flat,
}

impl Direction {
    /// +1 / -1 / 0
    pub fn score(self) -> i8 {
        match self {
            Direction::Long => 1,
            Direction::Short => -1,
            Direction::Flat => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SignalValue {
    Direction(Direction),
    /// `true` allows position changes.
    Gate(bool),
}

/// What a sizer slot may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalClass {
    Directional,
    Gate,
}

impl SignalClass {
    pub fn as_str(self) -> &'static str {
        match self {
            SignalClass::Directional => "directional",
            SignalClass::Gate => "gate",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignalKind {
    /// Long when close is strictly above the feature, short when strictly below.
    Momentum { feature: String },
    /// Open when the feature is known and strictly below `threshold`.
    VolatilityGate { feature: String, threshold: f64 },
    /// Long when close sits more than `band` below the feature, short when
    /// more than `band` above.
    MeanReversion { feature: String, band: f64 },
}

impl SignalKind {
    pub fn class(&self) -> SignalClass {
        match self {
            SignalKind::Momentum { .. } | SignalKind::MeanReversion { .. } => {
                SignalClass::Directional
            }
            SignalKind::VolatilityGate { .. } => SignalClass::Gate,
        }
    }

    pub fn feature(&self) -> &str {
        match self {
            SignalKind::Momentum { feature }
            | SignalKind::VolatilityGate { feature, .. }
            | SignalKind::MeanReversion { feature, .. } => feature,
        }
    }

    pub fn evaluate(&self, bar: &OhlcvBar, features: &FeatureSet) -> SignalValue {
        let reference = features.value(self.feature());
        match self {
            SignalKind::Momentum { .. } => {
                let direction = match reference {
                    Some(ma) if bar.close > ma => Direction::Long,
                    Some(ma) if bar.close < ma => Direction::Short,
                    _ => Direction::Flat,
                };
                SignalValue::Direction(direction)
            }
            SignalKind::VolatilityGate { threshold, .. } => {
                SignalValue::Gate(matches!(reference, Some(vol) if vol < *threshold))
            }
            SignalKind::MeanReversion { band, .. } => {
                let direction = match reference {
                    Some(ma) if bar.close < ma * (1.0 - band) => Direction::Long,
                    Some(ma) if bar.close > ma * (1.0 + band) => Direction::Short,
                    _ => Direction::Flat,
                };
                SignalValue::Direction(direction)
            }
        }
    }

    fn validate(&self, name: &str, features: &FeatureSet) -> Result<(), SteptraderError> {
        let section = format!("signal.{name}");
        if !features.contains(self.feature()) {
            return Err(SteptraderError::UnknownReference {
                owner: format!("signal '{name}'"),
                kind: "feature",
                name: self.feature().to_string(),
            });
        }
        match self {
            SignalKind::VolatilityGate { threshold, .. } if !threshold.is_finite() => Err(
                SteptraderError::invalid(&section, "threshold", "threshold must be finite"),
            ),
            SignalKind::MeanReversion { band, .. } if !(0.0..1.0).contains(band) => Err(
                SteptraderError::invalid(&section, "band", "band must be in [0, 1)"),
            ),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalKind::Momentum { feature } => write!(f, "MOMENTUM({})", feature),
            SignalKind::VolatilityGate { feature, threshold } => {
                write!(f, "VOL_GATE({} < {})", feature, threshold)
            }
            SignalKind::MeanReversion { feature, band } => {
                write!(f, "MEAN_REVERSION({}, {})", feature, band)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Signal {
    name: String,
    kind: SignalKind,
    value: Option<SignalValue>,
}

impl Signal {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &SignalKind {
        &self.kind
    }

    /// Latest value; `None` before the first bar.
    pub fn value(&self) -> Option<SignalValue> {
        self.value
    }

    pub fn update(&mut self, bar: &OhlcvBar, features: &FeatureSet) -> SignalValue {
        let value = self.kind.evaluate(bar, features);
        self.value = Some(value);
        value
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignalSet {
    signals: Vec<Signal>,
    index: HashMap<String, usize>,
}

impl SignalSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a signal; its feature reference must already exist in `features`.
    pub fn insert(
        &mut self,
        name: &str,
        kind: SignalKind,
        features: &FeatureSet,
    ) -> Result<(), SteptraderError> {
        if self.index.contains_key(name) {
            return Err(SteptraderError::DuplicateName {
                kind: "signal",
                name: name.to_string(),
            });
        }
        kind.validate(name, features)?;
        self.index.insert(name.to_string(), self.signals.len());
        self.signals.push(Signal {
            name: name.to_string(),
            kind,
            value: None,
        });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Signal> {
        self.index.get(name).map(|&i| &self.signals[i])
    }

    pub fn value(&self, name: &str) -> Option<SignalValue> {
        self.get(name).and_then(Signal::value)
    }

    pub fn class_of(&self, name: &str) -> Option<SignalClass> {
        self.get(name).map(|s| s.kind.class())
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Signal> {
        self.signals.iter()
    }

    pub fn update_all(&mut self, bar: &OhlcvBar, features: &FeatureSet) {
        for signal in &mut self.signals {
            signal.update(bar, features);
        }
    }
}
