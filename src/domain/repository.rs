//! Contract repository: turns raw per-contract bar series into a chain.
//!
//! Each series is tagged with its parsed contract code and an expiration
//! date. Series that cannot be tagged are skipped and reported, unless
//! nothing at all could be loaded.

use crate::domain::contract::{Contract, ContractChain, ContractCode};
use crate::domain::error::BackadjustError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Bars of one contract as delivered by a data source.
#[derive(Debug, Clone)]
pub struct RawContractSeries {
    pub symbol: String,
    pub bars: Vec<OhlcvBar>,
}

#[derive(Debug, Clone)]
pub struct RejectedContract {
    pub symbol: String,
    pub reason: RejectReason,
}

#[derive(Debug, Clone)]
pub enum RejectReason {
    Malformed(String),
    NoBars,
    DuplicateExpiration { kept: String, expiration: NaiveDate },
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::Malformed(reason) => write!(f, "{reason}"),
            RejectReason::NoBars => write!(f, "no bars"),
            RejectReason::DuplicateExpiration { kept, expiration } => {
                write!(f, "expiration {expiration} already taken by {kept}")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContractRepository {
    instrument: String,
    chain: ContractChain,
    rejected: Vec<RejectedContract>,
}

impl ContractRepository {
    /// Tag every series with its contract code and expiration.
    ///
    /// `today` decides which contracts count as expired. Input order does not
    /// matter: series are processed sorted by symbol.
    pub fn load_chain(
        instrument: &str,
        mut series: Vec<RawContractSeries>,
        today: NaiveDate,
    ) -> Result<Self, BackadjustError> {
        series.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        let mut chain = ContractChain::new();
        let mut rejected = Vec::new();
        let mut first_error = None;

        for raw in series {
            match tag_contract(raw, today) {
                Ok(contract) => {
                    if let Err(dup) = chain.insert(contract) {
                        let kept = chain
                            .get(dup.expiration)
                            .map(|c| c.symbol.clone())
                            .unwrap_or_default();
                        tracing::warn!(
                            instrument,
                            symbol = %dup.symbol,
                            %kept,
                            "skipping contract with duplicate expiration {}",
                            dup.expiration
                        );
                        rejected.push(RejectedContract {
                            symbol: dup.symbol,
                            reason: RejectReason::DuplicateExpiration {
                                kept,
                                expiration: dup.expiration,
                            },
                        });
                    }
                }
                Err((symbol, err)) => {
                    tracing::warn!(instrument, %symbol, "skipping contract ({err})");
                    let reason = match &err {
                        BackadjustError::NoData { .. } => RejectReason::NoBars,
                        other => RejectReason::Malformed(other.to_string()),
                    };
                    rejected.push(RejectedContract { symbol, reason });
                    first_error.get_or_insert(err);
                }
            }
        }

        if chain.is_empty() {
            return Err(first_error.unwrap_or_else(|| BackadjustError::NoData {
                symbol: instrument.to_string(),
            }));
        }

        tracing::debug!(
            instrument,
            contracts = chain.len(),
            rejected = rejected.len(),
            "loaded contract chain"
        );

        Ok(Self {
            instrument: instrument.to_string(),
            chain,
            rejected,
        })
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn chain(&self) -> &ContractChain {
        &self.chain
    }

    pub fn rejected(&self) -> &[RejectedContract] {
        &self.rejected
    }

    /// Contracts expiring on or after `as_of`, one per symbol (the latest
    /// expiration wins), sorted by expiration descending.
    pub fn active_contracts(&self, as_of: NaiveDate) -> Vec<&Contract> {
        let mut by_symbol: BTreeMap<&str, &Contract> = BTreeMap::new();
        for contract in self.chain.iter().filter(|c| c.expiration >= as_of) {
            by_symbol
                .entry(contract.symbol.as_str())
                .and_modify(|kept| {
                    if contract.expiration > kept.expiration {
                        *kept = contract;
                    }
                })
                .or_insert(contract);
        }
        let mut active: Vec<&Contract> = by_symbol.into_values().collect();
        active.sort_by(|a, b| b.expiration.cmp(&a.expiration));
        active
    }
}

fn tag_contract(
    raw: RawContractSeries,
    today: NaiveDate,
) -> Result<Contract, (String, BackadjustError)> {
    let code = match ContractCode::parse(&raw.symbol) {
        Ok(code) => code,
        Err(e) => return Err((raw.symbol, e)),
    };
    if raw.bars.is_empty() {
        return Err((
            raw.symbol.clone(),
            BackadjustError::NoData { symbol: raw.symbol },
        ));
    }
    let last_bar = raw.bars.iter().map(|b| b.date).max();
    let expiration = match code.expiration_date(last_bar, today) {
        Ok(date) => date,
        Err(e) => return Err((raw.symbol, e)),
    };
    Ok(Contract::new(raw.symbol, code, expiration, raw.bars))
}
