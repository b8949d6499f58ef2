//! Fill simulation: slippage and proportional fees.
//!
//! Slippage always moves the price against the trader: buys fill above the
//! close, sells below it. Fees are charged on the post-slippage notional.

/// Share deltas at or below this size are not executed.
pub const EXECUTION_EPSILON: f64 = 1e-8;

/// Share deltas at or below this size are not written to the trade log.
pub const MATERIALITY_THRESHOLD: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutionConfig {
    /// Fraction of traded notional charged as a fee.
    pub fee_rate: f64,
    /// Fractional price impact applied against the trader.
    pub slippage: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            fee_rate: 0.0005,
            slippage: 0.0005,
        }
    }
}

/// price * (1 + slippage * sign(delta_shares))
pub fn apply_slippage(market_price: f64, delta_shares: f64, slippage: f64) -> f64 {
    if delta_shares > 0.0 {
        market_price * (1.0 + slippage)
    } else if delta_shares < 0.0 {
        market_price * (1.0 - slippage)
    } else {
        market_price
    }
}

/// |trade_value| * fee_rate
pub fn calculate_fee(trade_value: f64, config: &ExecutionConfig) -> f64 {
    trade_value.abs() * config.fee_rate
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub price: f64,
    pub delta_shares: f64,
    /// Signed: positive for buys (cash out), negative for sells (cash in).
    pub value: f64,
    pub fee: f64,
}

impl Fill {
    fn none(market_price: f64) -> Self {
        Fill {
            price: market_price,
            delta_shares: 0.0,
            value: 0.0,
            fee: 0.0,
        }
    }

    pub fn is_trade(&self) -> bool {
        self.delta_shares.abs() > EXECUTION_EPSILON
    }

    /// Total cash leaving the account: trade value plus fee.
    pub fn cash_impact(&self) -> f64 {
        self.value + self.fee
    }
}

/// Simulate filling `delta_shares` at `market_price`. Deltas within
/// `EXECUTION_EPSILON` of zero produce an empty fill.
pub fn simulate_fill(market_price: f64, delta_shares: f64, config: &ExecutionConfig) -> Fill {
    if delta_shares.abs() <= EXECUTION_EPSILON {
        return Fill::none(market_price);
    }

    let price = apply_slippage(market_price, delta_shares, config.slippage);
    let value = delta_shares * price;
    let fee = calculate_fee(value, config);

    Fill {
        price,
        delta_shares,
        value,
        fee,
    }
}
