//! CSV directory data adapter.
//!
//! Layout: one directory per instrument under the base path, one CSV export
//! per contract inside it, e.g. `data/ZC/CBOT_DL_ZCZ2024, D.csv`.

use crate::domain::error::BackadjustError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::repository::RawContractSeries;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn instrument_dir(&self, instrument: &str) -> PathBuf {
        self.base_path.join(instrument)
    }

    /// Local contract symbol of an export file name: the text before the
    /// first comma, after the last underscore.
    ///
    /// `"CBOT_DL_ZCZ2024, D.csv"` -> `"ZCZ2024"`, `"ESH2025.csv"` -> `"ESH2025"`.
    pub fn local_symbol(file_name: &str) -> Option<String> {
        let stem = file_name.strip_suffix(".csv").unwrap_or(file_name);
        let head = stem.split(',').next()?.trim();
        let symbol = head.rsplit('_').next()?.trim();
        if symbol.is_empty() {
            None
        } else {
            Some(symbol.to_string())
        }
    }

    fn read_contract_file(path: &Path, symbol: &str) -> Result<Vec<OhlcvBar>, BackadjustError> {
        let content = fs::read_to_string(path)?;
        let mut rdr = csv::Reader::from_reader(content.as_bytes());

        let headers = rdr.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let missing = |name: &str| {
            BackadjustError::format(symbol, format!("{}: missing {name} column", path.display()))
        };
        let time_idx = column("time").ok_or_else(|| missing("time"))?;
        let close_idx = column("close").ok_or_else(|| missing("close"))?;
        let open_idx = column("open");
        let high_idx = column("high");
        let low_idx = column("low");
        let volume_idx = column("volume");

        let mut bars = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let record = result?;
            let invalid = |what: &str, value: &str| {
                BackadjustError::format(
                    symbol,
                    format!("{} row {}: invalid {what} {value:?}", path.display(), line + 2),
                )
            };

            let time_str = record.get(time_idx).unwrap_or("").trim();
            let timestamp = parse_time(time_str).ok_or_else(|| invalid("time", time_str))?;

            let close_str = record.get(close_idx).unwrap_or("").trim();
            let close: f64 = close_str
                .parse()
                .map_err(|_| invalid("close", close_str))?;

            let optional = |idx: Option<usize>, fallback: f64| {
                idx.and_then(|i| record.get(i))
                    .and_then(|v| v.trim().parse::<f64>().ok())
                    .unwrap_or(fallback)
            };

            let bar = OhlcvBar::from_timestamp(
                symbol,
                timestamp,
                optional(open_idx, close),
                optional(high_idx, close),
                optional(low_idx, close),
                close,
                optional(volume_idx, 0.0),
            )
            .ok_or_else(|| invalid("time", time_str))?;
            bars.push(bar);
        }

        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }
}

/// Unix seconds, or a date/datetime starting with `YYYY-MM-DD`.
fn parse_time(value: &str) -> Option<i64> {
    if let Ok(secs) = value.parse::<i64>() {
        return Some(secs);
    }
    if let Ok(secs) = value.parse::<f64>() {
        return secs.is_finite().then_some(secs as i64);
    }
    let date = NaiveDate::parse_from_str(value.get(..10)?, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp())
}

impl DataPort for CsvAdapter {
    fn list_instruments(&self) -> Result<Vec<String>, BackadjustError> {
        let entries = fs::read_dir(&self.base_path)?;

        let mut instruments = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                instruments.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        instruments.sort();
        Ok(instruments)
    }

    fn fetch_contracts(&self, instrument: &str) -> Result<Vec<RawContractSeries>, BackadjustError> {
        let dir = self.instrument_dir(instrument);
        let entries = fs::read_dir(&dir).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BackadjustError::NoData {
                    symbol: instrument.to_string(),
                }
            } else {
                BackadjustError::Io(e)
            }
        })?;

        let mut series = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.to_lowercase().ends_with(".csv") {
                continue;
            }
            let Some(symbol) = Self::local_symbol(&name) else {
                tracing::warn!(instrument, file = %name, "skipping file without a contract symbol");
                continue;
            };
            match Self::read_contract_file(&entry.path(), &symbol) {
                Ok(bars) => series.push(RawContractSeries { symbol, bars }),
                Err(e) => {
                    tracing::warn!(instrument, file = %name, "skipping unreadable contract file ({e})");
                }
            }
        }

        series.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(series)
    }
}
