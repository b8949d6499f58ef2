//! CSV file bar source.
//!
//! Reads `<base_path>/<SYMBOL>.csv` with a header row naming at least
//! `date,open,high,low,close,volume` (any order, case-insensitive; extra
//! columns such as `adj close` are ignored). Rows are sorted by date,
//! duplicate dates keep the last row, and empty price/volume cells are
//! forward-filled from the previous row.

use crate::domain::error::SteptraderError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs::File;
use std::path::PathBuf;
use tracing::debug;

const FIELDS: [&str; 5] = ["open", "high", "low", "close", "volume"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    fn load(&self, symbol: &str) -> Result<Vec<OhlcvBar>, SteptraderError> {
        let path = self.csv_path(symbol);
        let file = File::open(&path).map_err(|e| SteptraderError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(file);

        let headers = rdr.headers().map_err(csv_error)?.clone();
        let date_col = column(&headers, "date")?;
        let mut value_cols = [0usize; 5];
        for (slot, name) in value_cols.iter_mut().zip(FIELDS) {
            *slot = column(&headers, name)?;
        }

        let mut rows: Vec<(NaiveDate, [Option<f64>; 5])> = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(csv_error)?;
            let date_str = record.get(date_col).unwrap_or_default();
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                SteptraderError::Data {
                    reason: format!("row {}: invalid date '{}': {}", line + 2, date_str, e),
                }
            })?;

            let mut values = [None; 5];
            for (i, (&col, name)) in value_cols.iter().zip(FIELDS).enumerate() {
                let raw = record.get(col).unwrap_or_default();
                if raw.is_empty() {
                    continue;
                }
                let parsed: f64 = raw.parse().map_err(|e| SteptraderError::Data {
                    reason: format!("row {}: invalid {} value '{}': {}", line + 2, name, raw, e),
                })?;
                values[i] = Some(parsed);
            }
            rows.push((date, values));
        }

        // Stable sort keeps file order among equal dates, so the last wins.
        rows.sort_by_key(|(date, _)| *date);
        let before = rows.len();
        rows.reverse();
        rows.dedup_by_key(|(date, _)| *date);
        rows.reverse();
        if rows.len() < before {
            debug!(symbol, dropped = before - rows.len(), "dropped duplicate dates");
        }

        forward_fill(rows)
    }
}

fn forward_fill(rows: Vec<(NaiveDate, [Option<f64>; 5])>) -> Result<Vec<OhlcvBar>, SteptraderError> {
    let mut bars: Vec<OhlcvBar> = Vec::with_capacity(rows.len());
    let mut prev: Option<[f64; 5]> = None;

    for (date, values) in rows {
        let mut filled = [0.0; 5];
        for (i, value) in values.iter().enumerate() {
            filled[i] = match (value, prev) {
                (Some(v), _) => *v,
                (None, Some(p)) => p[i],
                (None, None) => {
                    return Err(SteptraderError::Data {
                        reason: format!(
                            "{}: missing {} on the first row cannot be forward-filled",
                            date, FIELDS[i]
                        ),
                    })
                }
            };
        }
        prev = Some(filled);
        let [open, high, low, close, volume] = filled;
        bars.push(OhlcvBar {
            date,
            open,
            high,
            low,
            close,
            volume,
        });
    }
    Ok(bars)
}

fn column(headers: &csv::StringRecord, name: &str) -> Result<usize, SteptraderError> {
    headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(name))
        .ok_or_else(|| SteptraderError::Data {
            reason: format!("missing {} column", name),
        })
}

fn csv_error(e: csv::Error) -> SteptraderError {
    SteptraderError::Data {
        reason: format!("CSV parse error: {}", e),
    }
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, SteptraderError> {
        let bars = self
            .load(symbol)?
            .into_iter()
            .filter(|b| start_date.is_none_or(|start| b.date >= start))
            .filter(|b| end_date.is_none_or(|end| b.date <= end))
            .collect();
        Ok(bars)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SteptraderError> {
        let bars = self.load(symbol)?;
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, bars.len())),
            _ => None,
        })
    }
}
