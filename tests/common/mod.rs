#![allow(dead_code)]

use backadjust::domain::error::BackadjustError;
pub use backadjust::domain::ohlcv::OhlcvBar;
use backadjust::domain::repository::RawContractSeries;
use backadjust::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<RawContractSeries>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_contract(mut self, instrument: &str, series: RawContractSeries) -> Self {
        self.data
            .entry(instrument.to_string())
            .or_default()
            .push(series);
        self
    }

    pub fn with_error(mut self, instrument: &str, reason: &str) -> Self {
        self.errors
            .insert(instrument.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn list_instruments(&self) -> Result<Vec<String>, BackadjustError> {
        let mut names: Vec<String> = self.data.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn fetch_contracts(&self, instrument: &str) -> Result<Vec<RawContractSeries>, BackadjustError> {
        if let Some(reason) = self.errors.get(instrument) {
            return Err(BackadjustError::Io(std::io::Error::other(reason.clone())));
        }
        self.data
            .get(instrument)
            .cloned()
            .ok_or_else(|| BackadjustError::NoData {
                symbol: instrument.to_string(),
            })
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn make_bar(symbol: &str, day: &str, close: f64) -> OhlcvBar {
    let date = date(day);
    OhlcvBar {
        symbol: symbol.to_string(),
        timestamp: date.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp(),
        date,
        open: close,
        high: close,
        low: close,
        close,
        volume: 100.0,
    }
}

pub fn contract(symbol: &str, closes: &[(&str, f64)]) -> RawContractSeries {
    RawContractSeries {
        symbol: symbol.to_string(),
        bars: closes
            .iter()
            .map(|&(day, close)| make_bar(symbol, day, close))
            .collect(),
    }
}

/// Write `closes` as a TradingView export under `dir/<instrument>/`.
pub fn write_tradingview_csv(dir: &Path, instrument: &str, symbol: &str, closes: &[(&str, f64)]) {
    let inst_dir = dir.join(instrument);
    fs::create_dir_all(&inst_dir).unwrap();
    let mut content = String::from("time,open,high,low,close,Volume\n");
    for &(day, close) in closes {
        let ts = date(day).and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp();
        content.push_str(&format!("{ts},{close},{close},{close},{close},10\n"));
    }
    fs::write(inst_dir.join(format!("CME_MINI_DL_{symbol}, 1D.csv")), content).unwrap();
}
