//! CSV market data adapter: one `<TICKER>.csv` file per ticker.
//!
//! Expected header: `date,close,adj_close,volume`. The `adj_close` column is
//! optional and may have empty cells; columns are located by name.

use crate::domain::error::OverlayError;
use crate::domain::market_data::DailyBar;
use crate::ports::data_port::MarketDataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct CsvMarketDataAdapter {
    base_path: PathBuf,
}

struct Columns {
    date: usize,
    close: usize,
    adj_close: Option<usize>,
    volume: usize,
}

fn data_err(reason: String) -> OverlayError {
    OverlayError::Data { reason }
}

impl CsvMarketDataAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker))
    }

    fn read_all(&self, ticker: &str) -> Result<Vec<DailyBar>, OverlayError> {
        let path = self.csv_path(ticker);
        let content = fs::read_to_string(&path)
            .map_err(|e| data_err(format!("failed to read {}: {}", path.display(), e)))?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| data_err(format!("{}: CSV header error: {}", path.display(), e)))?
            .clone();
        let find = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
        let require = |name: &str| {
            find(name).ok_or_else(|| data_err(format!("{}: missing {} column", path.display(), name)))
        };
        let columns = Columns {
            date: require("date")?,
            close: require("close")?,
            adj_close: find("adj_close"),
            volume: require("volume")?,
        };

        let mut bars = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| data_err(format!("CSV parse error: {}", e)))?;
            let field = |j: usize| record.get(j).unwrap_or("");
            let number = |j: usize, name: &str| -> Result<f64, OverlayError> {
                field(j).parse().map_err(|e| {
                    data_err(format!(
                        "{} row {}: invalid {} value: {}",
                        path.display(),
                        line + 1,
                        name,
                        e
                    ))
                })
            };

            let date = NaiveDate::parse_from_str(field(columns.date), "%Y-%m-%d").map_err(|e| {
                data_err(format!("{} row {}: invalid date format: {}", path.display(), line + 1, e))
            })?;
            let adj_close = match columns.adj_close {
                Some(j) if !field(j).is_empty() => Some(number(j, "adj_close")?),
                _ => None,
            };

            bars.push(DailyBar {
                ticker: ticker.to_string(),
                date,
                close: number(columns.close, "close")?,
                adj_close,
                volume: number(columns.volume, "volume")?,
            });
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}

impl MarketDataPort for CsvMarketDataAdapter {
    fn fetch_daily(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<DailyBar>, OverlayError> {
        let mut bars = self.read_all(ticker)?;
        bars.retain(|b| b.date >= start_date && end_date.is_none_or(|end| b.date <= end));
        Ok(bars)
    }

    fn list_tickers(&self) -> Result<Vec<String>, OverlayError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            data_err(format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let mut tickers = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| data_err(format!("directory entry error: {}", e)))?;
            let name = entry.file_name();
            if let Some(ticker) = name.to_string_lossy().strip_suffix(".csv") {
                tickers.push(ticker.to_string());
            }
        }

        tickers.sort();
        Ok(tickers)
    }

    fn get_data_range(&self, ticker: &str) -> Result<Option<(NaiveDate, NaiveDate, usize)>, OverlayError> {
        let bars = self.read_all(ticker)?;
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, bars.len())),
            _ => None,
        })
    }
}
