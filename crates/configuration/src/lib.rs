use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{
    Aggregation, AnalyzerWeight, Backtest, Config, DataSettings, Logging, MarketSegment,
    PriceTargetParams, RiskSettings, Screener, TechnicalsParams,
};
pub use error::ConfigError;

/// File consulted when no explicit path is given. Missing is fine.
pub const DEFAULT_CONFIG_FILE: &str = "quorum.toml";

/// Loads and validates the application configuration.
///
/// Sources are layered in order: built-in defaults, then the TOML file (the
/// explicit `path` must exist, the default `quorum.toml` is optional), then
/// `QUORUM__SECTION__KEY` environment variables.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let file = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::MissingFile(p.display().to_string()));
            }
            config::File::from(p).required(true)
        }
        None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };

    let builder = config::Config::builder()
        .add_source(file)
        .add_source(
            config::Environment::with_prefix("QUORUM")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    tracing::debug!(
        analyzers = config.aggregation.analyzers.len(),
        data_dir = %config.data.directory.display(),
        "Configuration loaded"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{AnalyzerId, UnpricedValuation};
    use rust_decimal_macros::dec;
    use std::io::Write;

    fn write_toml(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.backtest.initial_capital, dec!(1000000));
        assert_eq!(config.screener.max_workers, 5);
        assert_eq!(config.aggregation.risk_analyzer, "Risk Manager");
        assert_eq!(config.aggregation.weight_map()["Risk Manager"], 0.40);
    }

    #[test]
    fn file_overrides_only_what_it_names() {
        let file = write_toml(
            r#"
[risk]
max_position_size = 0.1

[backtest]
unpriced_valuation = "last_known"
start_date = "2024-01-02"
end_date = "2024-03-28"

[aggregation]
analyzers = ["technicals", "risk"]

[[aggregation.weights]]
name = "Technical Analysis"
weight = 1.0
"#,
        );
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.risk.max_position_size, 0.1);
        assert_eq!(config.risk.beta_threshold, 1.5);
        assert_eq!(config.backtest.unpriced_valuation, UnpricedValuation::LastKnown);
        assert_eq!(
            config.aggregation.analyzers,
            vec![AnalyzerId::Technicals, AnalyzerId::Risk]
        );
        assert_eq!(config.aggregation.weights.len(), 1);
        assert_eq!(config.technicals.long_window, 50);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = load_config(Some(Path::new("/definitely/not/here/quorum.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile(_)));
    }

    #[test]
    fn validation_rejects_negative_weight() {
        let mut config = Config::default();
        config.aggregation.weights[0].weight = -0.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn validation_rejects_inverted_dates() {
        let mut config = Config::default();
        config.backtest.start_date = chrono::NaiveDate::from_ymd_opt(2024, 5, 1);
        config.backtest.end_date = chrono::NaiveDate::from_ymd_opt(2024, 4, 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_rejects_out_of_range_fraction() {
        let mut config = Config::default();
        config.backtest.max_allocation = 1.5;
        assert!(config.validate().is_err());
    }
}
