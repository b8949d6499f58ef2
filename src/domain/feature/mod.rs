//! Feature layer: scalar indicators recomputed from history every bar.
//!
//! - `FeatureKind`: indicator identity + parameters
//! - `Feature`: a named, configured indicator holding its latest value
//! - `FeatureSet`: the name-keyed registry a strategy updates each bar
//!
//! A value of `None` means the history is still shorter than the feature's
//! lookback window.

pub mod sma;
pub mod stddev;

use std::collections::HashMap;
use std::fmt;

use crate::domain::error::SteptraderError;
use crate::domain::history::History;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    /// Arithmetic mean of the last `window` closes.
    MovingAverage { window: usize },
    /// Sample standard deviation (divisor `window - 1`) of the last `window` closes.
    Volatility { window: usize },
}

impl FeatureKind {
    pub fn required_window(&self) -> usize {
        match *self {
            FeatureKind::MovingAverage { window } | FeatureKind::Volatility { window } => window,
        }
    }

    pub fn compute(&self, history: &History) -> Option<f64> {
        match *self {
            FeatureKind::MovingAverage { window } => sma::moving_average(history, window),
            FeatureKind::Volatility { window } => stddev::sample_stddev(history, window),
        }
    }

    fn validate(&self, name: &str) -> Result<(), SteptraderError> {
        let section = format!("feature.{name}");
        match *self {
            FeatureKind::MovingAverage { window } if window < 1 => Err(SteptraderError::invalid(
                &section,
                "window",
                "moving average window must be at least 1",
            )),
            FeatureKind::Volatility { window } if window < 2 => Err(SteptraderError::invalid(
                &section,
                "window",
                "volatility window must be at least 2 (sample standard deviation)",
            )),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureKind::MovingAverage { window } => write!(f, "SMA({})", window),
            FeatureKind::Volatility { window } => write!(f, "STDDEV({})", window),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Feature {
    name: String,
    kind: FeatureKind,
    value: Option<f64>,
}

impl Feature {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FeatureKind {
        self.kind
    }

    /// Latest value computed by `update`.
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn update(&mut self, history: &History) -> Option<f64> {
        self.value = self.kind.compute(history);
        self.value
    }
}

/// Features in registration order, addressable by name.
#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    features: Vec<Feature>,
    index: HashMap<String, usize>,
}

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, kind: FeatureKind) -> Result<(), SteptraderError> {
        if self.index.contains_key(name) {
            return Err(SteptraderError::DuplicateName {
                kind: "feature",
                name: name.to_string(),
            });
        }
        kind.validate(name)?;
        self.index.insert(name.to_string(), self.features.len());
        self.features.push(Feature {
            name: name.to_string(),
            kind,
            value: None,
        });
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Feature> {
        self.index.get(name).map(|&i| &self.features[i])
    }

    /// Latest value of the named feature; `None` if missing or not yet warm.
    pub fn value(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Feature::value)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// Largest lookback among registered features; sizes the history buffer.
    pub fn max_window(&self) -> usize {
        self.features
            .iter()
            .map(|f| f.kind.required_window())
            .max()
            .unwrap_or(1)
    }

    pub fn update_all(&mut self, history: &History) {
        for feature in &mut self.features {
            feature.update(history);
        }
    }
}
