//! CSV report adapter implementing ReportPort.
//!
//! Writes three files into the output directory: `equity.csv`
//! (`date,equity`), `trades.csv` (`date,price,shares,fee,equity`) and
//! `summary.csv` (`metric,value`).

use std::fs;
use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::SteptraderError;
use crate::domain::metrics::Metrics;
use crate::ports::report_port::ReportPort;

pub const EQUITY_FILE: &str = "equity.csv";
pub const TRADES_FILE: &str = "trades.csv";
pub const SUMMARY_FILE: &str = "summary.csv";

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

fn report_error(e: csv::Error) -> SteptraderError {
    SteptraderError::Report {
        reason: e.to_string(),
    }
}

fn open_writer(output_dir: &Path, name: &str) -> Result<csv::Writer<fs::File>, SteptraderError> {
    csv::Writer::from_path(output_dir.join(name)).map_err(report_error)
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        result: &BacktestResult,
        metrics: &Metrics,
        output_dir: &Path,
    ) -> Result<(), SteptraderError> {
        fs::create_dir_all(output_dir)?;

        let mut equity = open_writer(output_dir, EQUITY_FILE)?;
        equity
            .write_record(["date", "equity"])
            .map_err(report_error)?;
        for point in &result.equity_curve {
            equity
                .write_record([point.date.to_string(), format!("{:.6}", point.equity)])
                .map_err(report_error)?;
        }
        equity.flush()?;

        let mut trades = open_writer(output_dir, TRADES_FILE)?;
        trades
            .write_record(["date", "price", "shares", "fee", "equity"])
            .map_err(report_error)?;
        for trade in &result.trades {
            trades
                .write_record([
                    trade.date.to_string(),
                    format!("{:.6}", trade.price),
                    format!("{:.6}", trade.delta_shares),
                    format!("{:.6}", trade.fee),
                    format!("{:.6}", trade.equity),
                ])
                .map_err(report_error)?;
        }
        trades.flush()?;

        let mut summary = open_writer(output_dir, SUMMARY_FILE)?;
        summary
            .write_record(["metric", "value"])
            .map_err(report_error)?;
        let rows: [(&str, String); 13] = [
            ("strategy", result.strategy_name.clone()),
            ("initial_capital", format!("{:.2}", result.initial_capital)),
            ("final_equity", format!("{:.2}", metrics.final_equity)),
            ("total_return", format!("{:.6}", metrics.total_return)),
            ("annualized_return", format!("{:.6}", metrics.annualized_return)),
            ("sharpe_ratio", format!("{:.4}", metrics.sharpe_ratio)),
            ("sortino_ratio", format!("{:.4}", metrics.sortino_ratio)),
            ("max_drawdown", format!("{:.6}", metrics.max_drawdown)),
            (
                "max_drawdown_duration",
                metrics.max_drawdown_duration.to_string(),
            ),
            ("total_trades", metrics.total_trades.to_string()),
            ("total_fees", format!("{:.2}", metrics.total_fees)),
            ("turnover", format!("{:.4}", metrics.turnover)),
            (
                "final_target_weight",
                format!("{:.4}", result.final_state.target_weight),
            ),
        ];
        for (metric, value) in rows {
            summary
                .write_record([metric, value.as_str()])
                .map_err(report_error)?;
        }
        summary.flush()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::{EquityPoint, TradeRecord};
    use crate::domain::strategy::StrategyState;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn sample_result() -> BacktestResult {
        let d1 = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        BacktestResult {
            strategy_name: "Momentum".into(),
            initial_capital: 1000.0,
            equity_curve: vec![
                EquityPoint {
                    date: d1,
                    equity: 997.999,
                },
                EquityPoint {
                    date: d2,
                    equity: 1010.5,
                },
            ],
            trades: vec![TradeRecord {
                date: d1,
                price: 50.05,
                delta_shares: 20.0,
                fee: 1.001,
                equity: 997.999,
            }],
            final_state: StrategyState::new(1.0),
            total_fees: 1.001,
        }
    }

    fn write_sample(dir: &Path) {
        let result = sample_result();
        let metrics = Metrics::compute(&result, 0.0);
        CsvReportAdapter::new()
            .write(&result, &metrics, dir)
            .unwrap();
    }

    #[test]
    fn writes_equity_curve() {
        let dir = TempDir::new().unwrap();
        write_sample(dir.path());
        let content = fs::read_to_string(dir.path().join(EQUITY_FILE)).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "date,equity");
        assert_eq!(lines[1], "2024-01-02,997.999000");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn writes_trade_log() {
        let dir = TempDir::new().unwrap();
        write_sample(dir.path());
        let content = fs::read_to_string(dir.path().join(TRADES_FILE)).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "date,price,shares,fee,equity");
        assert_eq!(
            lines[1],
            "2024-01-02,50.050000,20.000000,1.001000,997.999000"
        );
    }

    #[test]
    fn writes_summary() {
        let dir = TempDir::new().unwrap();
        write_sample(dir.path());
        let content = fs::read_to_string(dir.path().join(SUMMARY_FILE)).unwrap();
        assert!(content.starts_with("metric,value\n"));
        assert!(content.contains("strategy,Momentum\n"));
        assert!(content.contains("total_trades,1\n"));
        assert!(content.contains("final_equity,1010.50\n"));
    }

    #[test]
    fn creates_missing_output_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        write_sample(&nested);
        assert!(nested.join(EQUITY_FILE).exists());
        assert!(nested.join(TRADES_FILE).exists());
    }

    #[test]
    fn empty_trade_log_has_header_only() {
        let dir = TempDir::new().unwrap();
        let mut result = sample_result();
        result.trades.clear();
        let metrics = Metrics::compute(&result, 0.0);
        CsvReportAdapter::new()
            .write(&result, &metrics, dir.path())
            .unwrap();
        let content = fs::read_to_string(dir.path().join(TRADES_FILE)).unwrap();
        assert_eq!(content, "date,price,shares,fee,equity\n");
    }
}
