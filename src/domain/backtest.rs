//! Backtest engine and event loop.
//!
//! One deterministic pass over the bar sequence. For every bar the account
//! is marked at the previous close, the strategy picks a target weight, the
//! holding is rebalanced to that weight at this bar's close (with slippage
//! and fees), and the resulting equity is recorded.

use chrono::NaiveDate;
use tracing::{debug, info, info_span, warn};

use super::account::{Account, EquityPoint, TradeRecord};
use super::error::SteptraderError;
use super::execution::{simulate_fill, ExecutionConfig, MATERIALITY_THRESHOLD};
use super::ohlcv::OhlcvBar;
use super::strategy::{Strategy, StrategyState};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub initial_capital: f64,
    pub fee_rate: f64,
    pub slippage: f64,
    pub risk_free_rate: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            start_date: None,
            end_date: None,
            initial_capital: 100_000.0,
            fee_rate: 0.0005,
            slippage: 0.0005,
            risk_free_rate: 0.0,
        }
    }
}

impl BacktestConfig {
    pub fn execution(&self) -> ExecutionConfig {
        ExecutionConfig {
            fee_rate: self.fee_rate,
            slippage: self.slippage,
        }
    }

    fn check(&self) -> Result<(), SteptraderError> {
        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return Err(SteptraderError::invalid(
                "backtest",
                "initial_capital",
                "initial_capital must be positive",
            ));
        }
        if !(self.fee_rate.is_finite() && self.fee_rate >= 0.0) {
            return Err(SteptraderError::invalid(
                "backtest",
                "fee_rate",
                "fee_rate must be non-negative",
            ));
        }
        if !(self.slippage.is_finite() && (0.0..1.0).contains(&self.slippage)) {
            return Err(SteptraderError::invalid(
                "backtest",
                "slippage",
                "slippage must be in [0, 1)",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub strategy_name: String,
    pub initial_capital: f64,
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<TradeRecord>,
    pub final_state: StrategyState,
    pub total_fees: f64,
}

impl BacktestResult {
    /// True when the bar source produced nothing and no run took place.
    pub fn is_empty(&self) -> bool {
        self.equity_curve.is_empty()
    }

    pub fn final_equity(&self) -> f64 {
        self.equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(self.initial_capital)
    }
}

/// Run `strategy` over `bars`, starting from `initial_state` with
/// `config.initial_capital` in cash.
///
/// An empty bar sequence yields an empty result. Bars with a non-positive
/// close are still shown to the strategy but never traded; equity for them
/// is marked at the last valid close.
pub fn run<I>(
    bars: I,
    strategy: &mut dyn Strategy,
    initial_state: StrategyState,
    config: &BacktestConfig,
) -> Result<BacktestResult, SteptraderError>
where
    I: IntoIterator<Item = OhlcvBar>,
{
    config.check()?;
    let _span = info_span!(
        "backtest",
        strategy = %strategy.name(),
        initial_capital = config.initial_capital
    )
    .entered();

    let execution = config.execution();
    let mut account = Account::new(config.initial_capital);
    let mut state = initial_state;
    let mut equity_curve = Vec::new();
    let mut trades = Vec::new();
    let mut total_fees = 0.0;
    let mut prev_date: Option<NaiveDate> = None;

    for bar in bars {
        if let Some(prev) = prev_date {
            if bar.date <= prev {
                warn!(date = %bar.date, previous = %prev, "bar dates are not strictly increasing");
            }
        }
        prev_date = Some(bar.date);

        let tradeable = bar.is_tradeable();
        if account.last_price.is_none() && tradeable {
            account.last_price = Some(bar.close);
        }

        // Decision is made before this bar's fill is known.
        let current_equity = account.marked_equity();

        let (weight, next) = strategy.on_bar(&bar, state)?;
        state = next;

        if !tradeable {
            warn!(date = %bar.date, close = bar.close, "non-positive close, skipping trade");
            equity_curve.push(EquityPoint {
                date: bar.date,
                equity: account.marked_equity(),
            });
            continue;
        }

        let target_value = (current_equity * weight.clamp(0.0, 1.0)).max(0.0);
        let target_shares = target_value / bar.close;
        let delta_shares = target_shares - account.position_shares;

        let fill = simulate_fill(bar.close, delta_shares, &execution);
        if fill.is_trade() {
            total_fees += fill.fee;
        }
        account.settle(&fill, target_shares, bar.close);

        let equity = account.equity_at(bar.close);
        equity_curve.push(EquityPoint {
            date: bar.date,
            equity,
        });

        if delta_shares.abs() > MATERIALITY_THRESHOLD {
            debug!(
                date = %bar.date,
                price = fill.price,
                delta_shares,
                fee = fill.fee,
                weight,
                "trade"
            );
            trades.push(TradeRecord {
                date: bar.date,
                price: fill.price,
                delta_shares,
                fee: fill.fee,
                equity,
            });
        }
    }

    let result = BacktestResult {
        strategy_name: strategy.name().to_string(),
        initial_capital: config.initial_capital,
        equity_curve,
        trades,
        final_state: state,
        total_fees,
    };

    info!(
        bars = result.equity_curve.len(),
        trades = result.trades.len(),
        final_equity = result.final_equity(),
        "backtest complete"
    );

    Ok(result)
}
