use crate::error::DataError;
use chrono::NaiveDate;
use core_types::{PriceBar, PriceHistory};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// A provider of daily price tables.
pub trait PriceSource: Send + Sync {
    /// Returns the bars for `symbol` dated within `start..=end`, in date order.
    fn fetch_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceHistory, DataError>;
}

/// Reads one `<SYMBOL>.csv` file per symbol from a directory.
///
/// Files carry a `Date,Open,High,Low,Close,Volume` header. Extra columns
/// (an adjusted close, for instance) are ignored.
#[derive(Debug, Clone)]
pub struct CsvPriceSource {
    directory: PathBuf,
}

impl CsvPriceSource {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, symbol: &str) -> PathBuf {
        self.directory.join(format!("{symbol}.csv"))
    }
}

impl PriceSource for CsvPriceSource {
    fn fetch_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceHistory, DataError> {
        let path = self.path_for(symbol);
        let mut reader = match csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&path)
        {
            Ok(reader) => reader,
            Err(e) => {
                if let csv::ErrorKind::Io(io) = e.kind() {
                    if io.kind() == ErrorKind::NotFound {
                        return Err(DataError::NotFound(symbol.to_string()));
                    }
                }
                return Err(e.into());
            }
        };

        let mut bars = Vec::new();
        for row in reader.deserialize::<PriceBar>() {
            let bar = row?;
            if bar.date >= start && bar.date <= end {
                bars.push(bar);
            }
        }

        tracing::debug!(
            symbol,
            path = %path.display(),
            bars = bars.len(),
            "Loaded price table"
        );
        Ok(PriceHistory::new(symbol, bars)?)
    }
}

/// A source backed by histories held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPriceSource {
    histories: HashMap<String, PriceHistory>,
}

impl InMemoryPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a history under its own symbol, replacing any previous one.
    pub fn insert(&mut self, history: PriceHistory) {
        self.histories.insert(history.symbol().to_string(), history);
    }

    pub fn with_history(mut self, history: PriceHistory) -> Self {
        self.insert(history);
        self
    }
}

impl PriceSource for InMemoryPriceSource {
    fn fetch_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceHistory, DataError> {
        let history = self
            .histories
            .get(symbol)
            .ok_or_else(|| DataError::NotFound(symbol.to_string()))?;
        let bars = history
            .bars()
            .iter()
            .filter(|bar| bar.date >= start && bar.date <= end)
            .cloned()
            .collect();
        Ok(PriceHistory::new(symbol, bars)?)
    }
}
