//! Configuration validation.
//!
//! Every key is checked before a run starts. Values that are present but
//! unparseable are rejected here rather than silently replaced by defaults.

use crate::domain::error::OverlayError;
use crate::domain::universe::{Universe, parse_tickers};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const DEFAULT_CASH: &str = "BIL";
pub const DEFAULT_BENCHMARK: &str = "SPY";

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), OverlayError> {
    validate_universe(config)?;
    validate_dates(config)?;
    validate_signals(config)?;
    validate_overlay(config)?;
    validate_allocation(config)?;
    validate_evaluation(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> OverlayError {
    OverlayError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn missing(section: &str, key: &str) -> OverlayError {
    OverlayError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn read_int(config: &dyn ConfigPort, section: &str, key: &str, default: i64) -> Result<i64, OverlayError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(s) => s
            .trim()
            .parse()
            .map_err(|_| invalid(section, key, format!("{key} must be an integer"))),
    }
}

fn read_double(config: &dyn ConfigPort, section: &str, key: &str, default: f64) -> Result<f64, OverlayError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| invalid(section, key, format!("{key} must be a number"))),
    }
}

/// Parse a `YYYY-MM-DD` value.
pub fn parse_date(value: &str, section: &str, key: &str) -> Result<NaiveDate, OverlayError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| invalid(section, key, format!("invalid {key} format, expected YYYY-MM-DD")))
}

/// The universe as configured, with defaults for cash and benchmark.
pub fn configured_universe(config: &dyn ConfigPort) -> Result<Universe, OverlayError> {
    let tickers = config
        .get_string("universe", "tickers")
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| missing("universe", "tickers"))?;
    let cash = config
        .get_string("universe", "cash")
        .unwrap_or_else(|| DEFAULT_CASH.to_string());
    let benchmark = config
        .get_string("universe", "benchmark")
        .unwrap_or_else(|| DEFAULT_BENCHMARK.to_string());
    Ok(Universe::new(parse_tickers(&tickers)?, &cash, &benchmark)?)
}

/// Start date (required) and optional end date of the data window.
pub fn configured_dates(config: &dyn ConfigPort) -> Result<(NaiveDate, Option<NaiveDate>), OverlayError> {
    let start = config
        .get_string("data", "start_date")
        .ok_or_else(|| missing("data", "start_date"))?;
    let start = parse_date(&start, "data", "start_date")?;
    let end = config
        .get_string("data", "end_date")
        .filter(|s| !s.trim().is_empty())
        .map(|s| parse_date(&s, "data", "end_date"))
        .transpose()?;
    Ok((start, end))
}

fn validate_universe(config: &dyn ConfigPort) -> Result<(), OverlayError> {
    configured_universe(config).map(|_| ())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), OverlayError> {
    let (start, end) = configured_dates(config)?;
    match end {
        Some(end) if start >= end => Err(invalid(
            "data",
            "start_date",
            "start_date must be before end_date",
        )),
        _ => Ok(()),
    }
}

fn validate_signals(config: &dyn ConfigPort) -> Result<(), OverlayError> {
    let mut windows = Vec::new();
    for (key, default) in [
        ("momentum_long", 12),
        ("momentum_short", 6),
        ("z_window", 36),
        ("vol_window", 6),
        ("crowding_window", 6),
    ] {
        let value = read_int(config, "signals", key, default)?;
        if value < 1 {
            return Err(invalid("signals", key, format!("{key} must be at least 1")));
        }
        windows.push(value);
    }
    if windows[0] <= windows[1] {
        return Err(invalid(
            "signals",
            "momentum_long",
            "momentum_long must be greater than momentum_short",
        ));
    }
    if windows[2] < 2 {
        return Err(invalid("signals", "z_window", "z_window must be at least 2"));
    }
    Ok(())
}

fn validate_overlay(config: &dyn ConfigPort) -> Result<(), OverlayError> {
    for (key, default) in [("target_vol", 0.10), ("vol_floor", 1e-4), ("leverage_cap", 1.5)] {
        if read_double(config, "overlay", key, default)? <= 0.0 {
            return Err(invalid("overlay", key, format!("{key} must be positive")));
        }
    }
    for (key, default) in [
        ("crowding_beta", 0.7),
        ("crowding_cap", 3.0),
        ("liquidity_alpha", 0.6),
        ("liquidity_cap", 3.0),
    ] {
        if read_double(config, "overlay", key, default)? < 0.0 {
            return Err(invalid("overlay", key, format!("{key} must be non-negative")));
        }
    }
    Ok(())
}

fn validate_allocation(config: &dyn ConfigPort) -> Result<(), OverlayError> {
    let cap = read_double(config, "allocation", "cash_cap", 0.40)?;
    if cap <= 0.0 || cap > 1.0 {
        return Err(invalid("allocation", "cash_cap", "cash_cap must be in (0, 1]"));
    }
    if let Some(flag) = config.get_string("allocation", "cash_cap_enabled") {
        let known = ["true", "false", "yes", "no", "on", "off", "1", "0"];
        if !known.contains(&flag.trim().to_lowercase().as_str()) {
            return Err(invalid(
                "allocation",
                "cash_cap_enabled",
                "cash_cap_enabled must be true or false",
            ));
        }
    }
    Ok(())
}

fn validate_evaluation(config: &dyn ConfigPort) -> Result<(), OverlayError> {
    if read_double(config, "evaluation", "periods_per_year", 252.0)? < 1.0 {
        return Err(invalid(
            "evaluation",
            "periods_per_year",
            "periods_per_year must be at least 1",
        ));
    }
    Ok(())
}

fn validate_logging(config: &dyn ConfigPort) -> Result<(), OverlayError> {
    match config.get_string("logging", "format") {
        Some(format) if !matches!(format.trim(), "pretty" | "json") => Err(invalid(
            "logging",
            "format",
            "format must be pretty or json",
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;
    use crate::domain::universe::UniverseError;

    const BASE: &str = "[universe]\ntickers = SPY,TLT,GLD,BIL\n[data]\nstart_date = 2007-01-01\n";

    fn make_config(extra: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(&format!("{BASE}{extra}")).unwrap()
    }

    fn invalid_key(err: OverlayError) -> String {
        match err {
            OverlayError::ConfigInvalid { key, .. } => key,
            other => panic!("expected ConfigInvalid, got {other:?}"),
        }
    }

    #[test]
    fn minimal_config_passes() {
        assert!(validate_config(&make_config("")).is_ok());
    }

    #[test]
    fn full_config_passes() {
        let config = make_config(
            r#"
[signals]
momentum_long = 12
momentum_short = 6
z_window = 36
vol_window = 6
crowding_window = 6

[overlay]
target_vol = 0.10
vol_floor = 0.0001
leverage_cap = 1.5
crowding_beta = 0.7
crowding_cap = 3.0
liquidity_alpha = 0.6
liquidity_cap = 3.0

[allocation]
cash_cap = 0.40
cash_cap_enabled = true

[evaluation]
periods_per_year = 252

[logging]
level = debug
format = json
"#,
        );
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn missing_tickers_fails() {
        let config = FileConfigAdapter::from_string("[data]\nstart_date = 2007-01-01\n").unwrap();
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, OverlayError::ConfigMissing { key, .. } if key == "tickers"));
    }

    #[test]
    fn duplicate_ticker_fails() {
        let config =
            FileConfigAdapter::from_string("[universe]\ntickers = SPY,BIL,spy\n[data]\nstart_date = 2007-01-01\n")
                .unwrap();
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(
            err,
            OverlayError::InvalidTicker(UniverseError::DuplicateTicker(t)) if t == "SPY"
        ));
    }

    #[test]
    fn cash_outside_universe_fails() {
        let config = FileConfigAdapter::from_string(
        "[universe]\ntickers = SPY,BIL\ncash = SHY\n[data]\nstart_date = 2007-01-01\n",
    )
    .unwrap();
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, OverlayError::InvalidTicker(UniverseError::NotInUniverse { .. })));
    }

    #[test]
    fn missing_start_date_fails() {
        let config = FileConfigAdapter::from_string("[universe]\ntickers = SPY,BIL\n").unwrap();
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, OverlayError::ConfigMissing { key, .. } if key == "start_date"));
    }

    #[test]
    fn bad_date_format_fails() {
        let config =
            FileConfigAdapter::from_string("[universe]\ntickers = SPY,BIL\n[data]\nstart_date = 01/02/2007\n")
                .unwrap();
        assert_eq!(invalid_key(validate_config(&config).unwrap_err()), "start_date");
    }

    #[test]
    fn start_after_end_fails() {
        let config = make_config("end_date = 2006-12-31\n");
        assert_eq!(invalid_key(validate_config(&config).unwrap_err()), "start_date");
    }

    #[test]
    fn momentum_long_must_exceed_short() {
        let config = make_config("[signals]\nmomentum_long = 6\nmomentum_short = 6\n");
        assert_eq!(invalid_key(validate_config(&config).unwrap_err()), "momentum_long");
    }

    #[test]
    fn window_must_be_positive() {
        let config = make_config("[signals]\nvol_window = 0\n");
        assert_eq!(invalid_key(validate_config(&config).unwrap_err()), "vol_window");
    }

    #[test]
    fn z_window_of_one_fails() {
        let config = make_config("[signals]\nz_window = 1\n");
        assert_eq!(invalid_key(validate_config(&config).unwrap_err()), "z_window");
    }

    #[test]
    fn non_numeric_window_fails() {
        let config = make_config("[signals]\ncrowding_window = six\n");
        assert_eq!(invalid_key(validate_config(&config).unwrap_err()), "crowding_window");
    }

    #[test]
    fn target_vol_must_be_positive() {
        let config = make_config("[overlay]\ntarget_vol = 0\n");
        assert_eq!(invalid_key(validate_config(&config).unwrap_err()), "target_vol");
    }

    #[test]
    fn negative_decay_coefficient_fails() {
        let config = make_config("[overlay]\nliquidity_alpha = -0.1\n");
        assert_eq!(invalid_key(validate_config(&config).unwrap_err()), "liquidity_alpha");
    }

    #[test]
    fn cash_cap_range() {
        let config = make_config("[allocation]\ncash_cap = 1.5\n");
        assert_eq!(invalid_key(validate_config(&config).unwrap_err()), "cash_cap");
        let config = make_config("[allocation]\ncash_cap = 1.0\n");
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn cash_cap_flag_must_be_boolean() {
        let config = make_config("[allocation]\ncash_cap_enabled = sometimes\n");
        assert_eq!(invalid_key(validate_config(&config).unwrap_err()), "cash_cap_enabled");
    }

    #[test]
    fn periods_per_year_at_least_one() {
        let config = make_config("[evaluation]\nperiods_per_year = 0.5\n");
        assert_eq!(invalid_key(validate_config(&config).unwrap_err()), "periods_per_year");
    }

    #[test]
    fn unknown_log_format_fails() {
        let config = make_config("[logging]\nformat = xml\n");
        assert_eq!(invalid_key(validate_config(&config).unwrap_err()), "format");
    }

    #[test]
    fn configured_universe_uses_defaults() {
        let universe = configured_universe(&make_config("")).unwrap();
        assert_eq!(universe.cash, "BIL");
        assert_eq!(universe.benchmark, "SPY");
        assert_eq!(universe.risk_tickers(), vec!["SPY", "TLT", "GLD"]);
    }

}
