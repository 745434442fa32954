//! Configuration validation.
//!
//! Checks every `[trading]`, `[data]` and `[schedule]` value before a cycle
//! runs. Absent keys are validated against their defaults.

use crate::domain::config::{
    DEFAULT_BUY_TRIGGER, DEFAULT_INITIAL_BUDGET, DEFAULT_LOOKBACK_DAYS, DEFAULT_POSITION_SIZE,
    DEFAULT_SHORT_TRIGGER, DEFAULT_STOP_LOSS, DEFAULT_TAKE_PROFIT,
};
use crate::domain::error::SimtraderError;
use crate::ports::config_port::ConfigPort;

pub fn validate_trading_config(config: &dyn ConfigPort) -> Result<(), SimtraderError> {
    validate_budget(config)?;
    validate_max_positions(config)?;
    validate_triggers(config)?;
    validate_exit_levels(config)?;
    validate_lookback(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), SimtraderError> {
    validate_source(config)?;
    validate_positive_int(config, "data", "max_companies", 1000)?;
    validate_positive_int(config, "data", "request_timeout_secs", 10)?;
    validate_positive_int(config, "data", "universe_cache_hours", 24)?;
    if config.get_int("data", "request_pause_ms", 0) < 0 {
        return Err(invalid("data", "request_pause_ms", "must be non-negative"));
    }
    Ok(())
}

pub fn validate_schedule_config(config: &dyn ConfigPort) -> Result<(), SimtraderError> {
    validate_positive_int(config, "schedule", "interval_minutes", 30)
}

fn invalid(section: &str, key: &str, reason: &str) -> SimtraderError {
    SimtraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_budget(config: &dyn ConfigPort) -> Result<(), SimtraderError> {
    let budget = config.get_double("trading", "initial_budget", DEFAULT_INITIAL_BUDGET);
    if budget <= 0.0 {
        return Err(invalid(
            "trading",
            "initial_budget",
            "initial_budget must be positive",
        ));
    }
    let size = config.get_double("trading", "position_size", DEFAULT_POSITION_SIZE);
    if size <= 0.0 || size > budget {
        return Err(invalid(
            "trading",
            "position_size",
            "position_size must be positive and no larger than initial_budget",
        ));
    }
    Ok(())
}

fn validate_max_positions(config: &dyn ConfigPort) -> Result<(), SimtraderError> {
    if config.get_string("trading", "max_positions").is_none() {
        return Ok(());
    }
    if config.get_int("trading", "max_positions", 0) < 1 {
        return Err(invalid(
            "trading",
            "max_positions",
            "max_positions must be at least 1",
        ));
    }
    Ok(())
}

fn validate_triggers(config: &dyn ConfigPort) -> Result<(), SimtraderError> {
    if config.get_double("trading", "short_trigger", DEFAULT_SHORT_TRIGGER) <= 0.0 {
        return Err(invalid(
            "trading",
            "short_trigger",
            "short_trigger must be a positive ratio",
        ));
    }
    if config.get_double("trading", "buy_trigger", DEFAULT_BUY_TRIGGER) >= 0.0 {
        return Err(invalid(
            "trading",
            "buy_trigger",
            "buy_trigger must be a negative ratio",
        ));
    }
    Ok(())
}

fn validate_exit_levels(config: &dyn ConfigPort) -> Result<(), SimtraderError> {
    if config.get_double("trading", "take_profit", DEFAULT_TAKE_PROFIT) <= 0.0 {
        return Err(invalid(
            "trading",
            "take_profit",
            "take_profit must be positive",
        ));
    }
    let stop = config.get_double("trading", "stop_loss", DEFAULT_STOP_LOSS);
    if stop <= 0.0 || stop >= 1.0 {
        return Err(invalid(
            "trading",
            "stop_loss",
            "stop_loss must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_lookback(config: &dyn ConfigPort) -> Result<(), SimtraderError> {
    validate_positive_int(
        config,
        "trading",
        "lookback_days",
        DEFAULT_LOOKBACK_DAYS as i64,
    )
}

fn validate_positive_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<(), SimtraderError> {
    if config.get_int(section, key, default) < 1 {
        return Err(invalid(section, key, &format!("{key} must be at least 1")));
    }
    Ok(())
}

fn validate_source(config: &dyn ConfigPort) -> Result<(), SimtraderError> {
    match config.get_string("data", "source").as_deref() {
        None | Some("yahoo") => Ok(()),
        Some("csv") => match config.get_string("data", "csv_dir") {
            Some(dir) if !dir.trim().is_empty() => Ok(()),
            _ => Err(SimtraderError::ConfigMissing {
                section: "data".to_string(),
                key: "csv_dir".to_string(),
            }),
        },
        Some(_) => Err(invalid("data", "source", "source must be yahoo or csv")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn empty_config_uses_valid_defaults() {
        let config = make_config("");
        assert!(validate_trading_config(&config).is_ok());
        assert!(validate_data_config(&config).is_ok());
        assert!(validate_schedule_config(&config).is_ok());
    }

    #[test]
    fn valid_trading_config_passes() {
        let config = make_config(
            r#"
[trading]
initial_budget = 5000
position_size = 50
max_positions = 20
short_trigger = 0.15
buy_trigger = -0.08
take_profit = 0.04
stop_loss = 0.06
lookback_days = 5
"#,
        );
        assert!(validate_trading_config(&config).is_ok());
    }

    #[test]
    fn initial_budget_must_be_positive() {
        let config = make_config("[trading]\ninitial_budget = 0\n");
        let err = validate_trading_config(&config).unwrap_err();
        assert!(
            matches!(err, SimtraderError::ConfigInvalid { key, .. } if key == "initial_budget")
        );
    }

    #[test]
    fn position_size_larger_than_budget_fails() {
        let config = make_config("[trading]\ninitial_budget = 100\nposition_size = 150\n");
        let err = validate_trading_config(&config).unwrap_err();
        assert!(matches!(err, SimtraderError::ConfigInvalid { key, .. } if key == "position_size"));
    }

    #[test]
    fn max_positions_zero_fails() {
        let config = make_config("[trading]\nmax_positions = 0\n");
        let err = validate_trading_config(&config).unwrap_err();
        assert!(matches!(err, SimtraderError::ConfigInvalid { key, .. } if key == "max_positions"));
    }

    #[test]
    fn non_negative_buy_trigger_fails() {
        let config = make_config("[trading]\nbuy_trigger = 0.05\n");
        let err = validate_trading_config(&config).unwrap_err();
        assert!(matches!(err, SimtraderError::ConfigInvalid { key, .. } if key == "buy_trigger"));
    }

    #[test]
    fn non_positive_short_trigger_fails() {
        let config = make_config("[trading]\nshort_trigger = -0.1\n");
        let err = validate_trading_config(&config).unwrap_err();
        assert!(matches!(err, SimtraderError::ConfigInvalid { key, .. } if key == "short_trigger"));
    }

    #[test]
    fn stop_loss_out_of_range_fails() {
        let config = make_config("[trading]\nstop_loss = 1.5\n");
        let err = validate_trading_config(&config).unwrap_err();
        assert!(matches!(err, SimtraderError::ConfigInvalid { key, .. } if key == "stop_loss"));
    }

    #[test]
    fn take_profit_zero_fails() {
        let config = make_config("[trading]\ntake_profit = 0\n");
        let err = validate_trading_config(&config).unwrap_err();
        assert!(matches!(err, SimtraderError::ConfigInvalid { key, .. } if key == "take_profit"));
    }

    #[test]
    fn lookback_zero_fails() {
        let config = make_config("[trading]\nlookback_days = 0\n");
        let err = validate_trading_config(&config).unwrap_err();
        assert!(matches!(err, SimtraderError::ConfigInvalid { key, .. } if key == "lookback_days"));
    }

    #[test]
    fn csv_source_requires_directory() {
        let config = make_config("[data]\nsource = csv\n");
        let err = validate_data_config(&config).unwrap_err();
        assert!(matches!(err, SimtraderError::ConfigMissing { key, .. } if key == "csv_dir"));

        let config = make_config("[data]\nsource = csv\ncsv_dir = /tmp/prices\n");
        assert!(validate_data_config(&config).is_ok());
    }

    #[test]
    fn unknown_source_fails() {
        let config = make_config("[data]\nsource = bloomberg\n");
        let err = validate_data_config(&config).unwrap_err();
        assert!(matches!(err, SimtraderError::ConfigInvalid { key, .. } if key == "source"));
    }

    #[test]
    fn zero_timeout_fails() {
        let config = make_config("[data]\nrequest_timeout_secs = 0\n");
        let err = validate_data_config(&config).unwrap_err();
        assert!(
            matches!(err, SimtraderError::ConfigInvalid { key, .. } if key == "request_timeout_secs")
        );
    }

    #[test]
    fn zero_interval_fails() {
        let config = make_config("[schedule]\ninterval_minutes = 0\n");
        let err = validate_schedule_config(&config).unwrap_err();
        assert!(
            matches!(err, SimtraderError::ConfigInvalid { key, .. } if key == "interval_minutes")
        );
    }
}
