//! Account state and the records a run produces.

use chrono::NaiveDate;

use super::execution::Fill;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

/// One executed rebalance. `delta_shares` is positive for buys.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeRecord {
    pub date: NaiveDate,
    pub price: f64,
    pub delta_shares: f64,
    pub fee: f64,
    pub equity: f64,
}

impl TradeRecord {
    pub fn is_buy(&self) -> bool {
        self.delta_shares > 0.0
    }

    pub fn notional(&self) -> f64 {
        (self.delta_shares * self.price).abs()
    }
}

/// Cash and holdings for a single instrument. Equity is always derived.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub cash: f64,
    pub position_shares: f64,
    pub last_price: Option<f64>,
}

impl Account {
    pub fn new(initial_capital: f64) -> Self {
        Account {
            cash: initial_capital,
            position_shares: 0.0,
            last_price: None,
        }
    }

    pub fn equity_at(&self, price: f64) -> f64 {
        self.cash + self.position_shares * price
    }

    /// Equity valued at the last traded close; cash only before any price.
    pub fn marked_equity(&self) -> f64 {
        match self.last_price {
            Some(price) => self.equity_at(price),
            None => self.cash,
        }
    }

    /// Book a fill and move the holding to `target_shares` at `close`.
    pub fn settle(&mut self, fill: &Fill, target_shares: f64, close: f64) {
        self.cash -= fill.cash_impact();
        self.position_shares = target_shares;
        self.last_price = Some(close);
    }
}
