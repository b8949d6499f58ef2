//! Strategy orchestration.
//!
//! A strategy turns one bar plus the carried `StrategyState` into a new
//! target weight. `LayeredStrategy` does this through a fixed per-bar
//! sequence: history → features → signals → sizer. Signals always see the
//! same bar's feature values and the sizer the same bar's signal values.

use crate::domain::error::SteptraderError;
use crate::domain::feature::{FeatureKind, FeatureSet};
use crate::domain::history::History;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::signal::{SignalKind, SignalSet};
use crate::domain::sizer::PositionSizer;

/// The only value carried from one bar to the next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyState {
    pub target_weight: f64,
}

impl StrategyState {
    /// Clamps into [0, 1]. Non-finite weights become 0.
    pub fn new(target_weight: f64) -> Self {
        let target_weight = if target_weight.is_finite() {
            target_weight.clamp(0.0, 1.0)
        } else {
            0.0
        };
        StrategyState { target_weight }
    }
}

impl Default for StrategyState {
    fn default() -> Self {
        StrategyState { target_weight: 0.0 }
    }
}

pub trait Strategy {
    fn name(&self) -> &str;

    /// Evaluate one bar. Returns the target weight in [0, 1] and the state to
    /// carry into the next bar.
    fn on_bar(
        &mut self,
        bar: &OhlcvBar,
        state: StrategyState,
    ) -> Result<(f64, StrategyState), SteptraderError>;

    /// Human-readable wiring, one component per line.
    fn describe(&self) -> Vec<String> {
        vec![self.name().to_string()]
    }
}

#[derive(Debug, Clone)]
pub struct LayeredStrategy {
    name: String,
    history: History,
    features: FeatureSet,
    signals: SignalSet,
    sizer: PositionSizer,
}

impl LayeredStrategy {
    /// Wire features, signals and sizer together. Every name reference is
    /// resolved here; a dangling or mistyped reference is an error.
    pub fn new(
        name: impl Into<String>,
        features: Vec<(String, FeatureKind)>,
        signals: Vec<(String, SignalKind)>,
        sizer: PositionSizer,
    ) -> Result<Self, SteptraderError> {
        let mut feature_set = FeatureSet::new();
        for (feature_name, kind) in features {
            feature_set.insert(&feature_name, kind)?;
        }

        let mut signal_set = SignalSet::new();
        for (signal_name, kind) in signals {
            signal_set.insert(&signal_name, kind, &feature_set)?;
        }

        sizer.bind(&signal_set)?;

        Ok(LayeredStrategy {
            name: name.into(),
            history: History::with_capacity(feature_set.max_window()),
            features: feature_set,
            signals: signal_set,
            sizer,
        })
    }

    /// Price-vs-moving-average momentum, optionally gated by rolling volatility.
    pub fn momentum(
        ma_window: usize,
        vol_filter: Option<(usize, f64)>,
        step: f64,
    ) -> Result<Self, SteptraderError> {
        let mut features = vec![(
            "ma".to_string(),
            FeatureKind::MovingAverage { window: ma_window },
        )];
        let mut signals = vec![(
            "momentum".to_string(),
            SignalKind::Momentum {
                feature: "ma".into(),
            },
        )];
        let mut gate = None;

        if let Some((vol_window, threshold)) = vol_filter {
            features.push((
                "volatility".to_string(),
                FeatureKind::Volatility { window: vol_window },
            ));
            signals.push((
                "low_volatility".to_string(),
                SignalKind::VolatilityGate {
                    feature: "volatility".into(),
                    threshold,
                },
            ));
            gate = Some("low_volatility".to_string());
        }

        let sizer = PositionSizer::new("momentum", gate, step)?;
        Self::new("Momentum", features, signals, sizer)
    }

    /// Fixed-band averaging: add a step when price drops `band` below its
    /// moving average, remove one when it rises `band` above.
    pub fn dca(window: usize, step: f64, band: f64) -> Result<Self, SteptraderError> {
        let features = vec![(
            "ma".to_string(),
            FeatureKind::MovingAverage { window },
        )];
        let signals = vec![(
            "deviation".to_string(),
            SignalKind::MeanReversion {
                feature: "ma".into(),
                band,
            },
        )];
        let sizer = PositionSizer::new("deviation", None, step)?;
        Self::new("Simple DCA", features, signals, sizer)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    pub fn signals(&self) -> &SignalSet {
        &self.signals
    }

    pub fn sizer(&self) -> &PositionSizer {
        &self.sizer
    }

    pub fn history(&self) -> &History {
        &self.history
    }
}

impl Strategy for LayeredStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_bar(
        &mut self,
        bar: &OhlcvBar,
        state: StrategyState,
    ) -> Result<(f64, StrategyState), SteptraderError> {
        self.history.push(bar.clone());
        self.features.update_all(&self.history);
        self.signals.update_all(bar, &self.features);

        let weight = self
            .sizer
            .calculate_target(state.target_weight, &self.signals)?;
        let next = StrategyState {
            target_weight: weight,
        };
        Ok((weight, next))
    }

    fn describe(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .features
            .iter()
            .map(|f| format!("feature {} = {}", f.name(), f.kind()))
            .collect();
        lines.extend(
            self.signals
                .iter()
                .map(|s| format!("signal {} = {}", s.name(), s.kind())),
        );
        lines.push(format!(
            "sizer directional = {}, gate = {}, step = {}",
            self.sizer.directional(),
            self.sizer.gate().unwrap_or("none"),
            self.sizer.step()
        ));
        lines
    }
}

/// Holds a constant target weight regardless of price.
#[derive(Debug, Clone)]
pub struct FixedWeightStrategy {
    name: String,
    weight: f64,
}

impl FixedWeightStrategy {
    pub fn new(weight: f64) -> Result<Self, SteptraderError> {
        if !(0.0..=1.0).contains(&weight) {
            return Err(SteptraderError::invalid(
                "strategy",
                "weight",
                "weight must be in [0, 1]",
            ));
        }
        Ok(FixedWeightStrategy {
            name: "Fixed Weight".to_string(),
            weight,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn buy_and_hold() -> Self {
        FixedWeightStrategy {
            name: "Buy and Hold".to_string(),
            weight: 1.0,
        }
    }
}

impl Strategy for FixedWeightStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_bar(
        &mut self,
        _bar: &OhlcvBar,
        _state: StrategyState,
    ) -> Result<(f64, StrategyState), SteptraderError> {
        Ok((self.weight, StrategyState::new(self.weight)))
    }

    fn describe(&self) -> Vec<String> {
        vec![format!("fixed weight = {}", self.weight)]
    }
}
