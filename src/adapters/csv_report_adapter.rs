//! CSV result writer implementing ResultSink.
//!
//! One file per output series plus a summary table. Undefined values are
//! written as empty cells.

use std::fs;
use std::path::Path;

use crate::domain::error::OverlayError;
use crate::domain::frame::Series;
use crate::domain::metrics::PerformanceStats;
use crate::domain::pipeline::PipelineResult;
use crate::ports::report_port::ResultSink;

pub const WEIGHTS_FILE: &str = "weights_monthly.csv";
pub const SUMMARY_FILE: &str = "summary.csv";

fn io_err(e: csv::Error) -> OverlayError {
    OverlayError::Io(std::io::Error::other(e))
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub struct CsvResultWriter;

impl CsvResultWriter {
    pub fn new() -> Self {
        Self
    }

    fn write_series(path: &Path, column: &str, series: &Series) -> Result<(), OverlayError> {
        let mut wtr = csv::Writer::from_path(path).map_err(io_err)?;
        wtr.write_record(["date", column]).map_err(io_err)?;
        for (date, value) in series.dates.iter().zip(&series.values) {
            wtr.write_record([date.to_string(), cell(*value)])
                .map_err(io_err)?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_weights(path: &Path, result: &PipelineResult) -> Result<(), OverlayError> {
        let weights = &result.weights;
        let mut wtr = csv::Writer::from_path(path).map_err(io_err)?;
        let header = std::iter::once("date").chain(weights.tickers.iter().map(String::as_str));
        wtr.write_record(header).map_err(io_err)?;
        for (date, row) in weights.dates.iter().zip(&weights.rows) {
            let record = std::iter::once(date.to_string()).chain(row.iter().map(|w| w.to_string()));
            wtr.write_record(record).map_err(io_err)?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_summary(path: &Path, result: &PipelineResult) -> Result<(), OverlayError> {
        let mut wtr = csv::Writer::from_path(path).map_err(io_err)?;
        wtr.write_record(["series", "cagr", "vol", "sharpe", "max_drawdown"])
            .map_err(io_err)?;
        let rows: [(&str, &PerformanceStats); 2] = [
            ("strategy", &result.strategy.stats),
            ("benchmark", &result.benchmark.stats),
        ];
        for (name, stats) in rows {
            wtr.write_record([
                name.to_string(),
                cell(stats.cagr),
                cell(stats.volatility),
                cell(stats.sharpe),
                cell(stats.max_drawdown),
            ])
            .map_err(io_err)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl Default for CsvResultWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultSink for CsvResultWriter {
    fn write(&self, result: &PipelineResult, output_dir: &Path) -> Result<(), OverlayError> {
        fs::create_dir_all(output_dir)?;

        Self::write_weights(&output_dir.join(WEIGHTS_FILE), result)?;
        for (prefix, evaluated) in [("strategy", &result.strategy), ("benchmark", &result.benchmark)] {
            Self::write_series(
                &output_dir.join(format!("{prefix}_daily_returns.csv")),
                "return",
                &evaluated.returns,
            )?;
            Self::write_series(
                &output_dir.join(format!("{prefix}_cum_curve.csv")),
                "cumulative",
                &evaluated.cumulative,
            )?;
            Self::write_series(
                &output_dir.join(format!("{prefix}_drawdown.csv")),
                "drawdown",
                &evaluated.drawdown,
            )?;
        }
        Self::write_summary(&output_dir.join(SUMMARY_FILE), result)?;

        tracing::info!(dir = %output_dir.display(), "results written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::allocation::WeightMatrix;
    use crate::domain::evaluation::EvaluatedSeries;
    use crate::domain::pipeline::PipelineDiagnostics;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn sample_result() -> PipelineResult {
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        let returns = Series::new(
            vec![d(2), d(3), d(4)],
            vec![Some(0.0), Some(0.1), Some(-0.05)],
        );
        PipelineResult {
            weights: WeightMatrix {
                dates: vec![d(31)],
                tickers: vec!["SPY".into(), "BIL".into()],
                rows: vec![vec![0.6, 0.4]],
            },
            strategy: EvaluatedSeries::from_returns(returns.clone(), 252.0),
            benchmark: EvaluatedSeries::from_returns(returns, 252.0),
            diagnostics: PipelineDiagnostics::default(),
        }
    }

    #[test]
    fn writes_every_output_file() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("nested/results");
        CsvResultWriter::new().write(&sample_result(), &out).unwrap();

        for name in [
            "weights_monthly.csv",
            "strategy_daily_returns.csv",
            "benchmark_daily_returns.csv",
            "strategy_cum_curve.csv",
            "benchmark_cum_curve.csv",
            "strategy_drawdown.csv",
            "benchmark_drawdown.csv",
            "summary.csv",
        ] {
            assert!(out.join(name).exists(), "{name} not written");
        }
    }

    #[test]
    fn weights_file_has_ticker_header() {
        let dir = tempdir().unwrap();
        CsvResultWriter::new().write(&sample_result(), dir.path()).unwrap();
        let contents = fs::read_to_string(dir.path().join(WEIGHTS_FILE)).unwrap();
        assert_eq!(contents, "date,SPY,BIL\n2024-01-31,0.6,0.4\n");
    }

    #[test]
    fn summary_leaves_undefined_stats_empty() {
        let dir = tempdir().unwrap();
        CsvResultWriter::new().write(&sample_result(), dir.path()).unwrap();
        let contents = fs::read_to_string(dir.path().join(SUMMARY_FILE)).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "series,cagr,vol,sharpe,max_drawdown");
        // three observations: below the statistics minimum
        assert_eq!(lines[1], "strategy,,,,");
        assert_eq!(lines[2], "benchmark,,,,");
    }

    #[test]
    fn cumulative_curve_file_compounds() {
        let dir = tempdir().unwrap();
        CsvResultWriter::new().write(&sample_result(), dir.path()).unwrap();
        let contents = fs::read_to_string(dir.path().join("strategy_cum_curve.csv")).unwrap();
        let last = contents.lines().last().unwrap();
        let value: f64 = last.split(',').nth(1).unwrap().parse().unwrap();
        assert!((value - 1.1 * 0.95).abs() < 1e-12);
    }
}
