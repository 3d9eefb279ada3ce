//! Closing prices indexed by (expiration, date).

use crate::domain::contract::ContractChain;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq)]
pub struct PriceColumn {
    pub symbol: String,
    pub closes: BTreeMap<NaiveDate, f64>,
}

/// Sparse price table: one column per expiration, one row per date on which
/// any contract traded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceMatrix {
    columns: BTreeMap<NaiveDate, PriceColumn>,
    dates: BTreeSet<NaiveDate>,
}

impl PriceMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every bar of `chain`. A later bar on the same date overwrites an
    /// earlier one.
    pub fn from_chain(chain: &ContractChain) -> Self {
        let mut matrix = Self::new();
        for contract in chain.iter() {
            for bar in &contract.bars {
                matrix.insert(contract.expiration, &contract.symbol, bar.date, bar.close);
            }
        }
        matrix
    }

    pub fn insert(&mut self, expiration: NaiveDate, symbol: &str, date: NaiveDate, close: f64) {
        if !close.is_finite() {
            return;
        }
        self.columns
            .entry(expiration)
            .or_insert_with(|| PriceColumn {
                symbol: symbol.to_string(),
                closes: BTreeMap::new(),
            })
            .closes
            .insert(date, close);
        self.dates.insert(date);
    }

    pub fn close(&self, expiration: NaiveDate, date: NaiveDate) -> Option<f64> {
        self.columns.get(&expiration)?.closes.get(&date).copied()
    }

    pub fn column(&self, expiration: NaiveDate) -> Option<&PriceColumn> {
        self.columns.get(&expiration)
    }

    pub fn symbol(&self, expiration: NaiveDate) -> Option<&str> {
        self.columns.get(&expiration).map(|c| c.symbol.as_str())
    }

    /// Expirations sorted farthest-future first.
    pub fn expirations_desc(&self) -> Vec<NaiveDate> {
        self.columns.keys().rev().copied().collect()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}
