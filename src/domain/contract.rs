//! Futures contracts and contract chains.

use crate::domain::error::BackadjustError;
use crate::domain::month_code::MonthCode;
use crate::domain::ohlcv::OhlcvBar;
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use std::fmt;

/// Day-of-month assumed for contracts that have not expired yet.
///
/// This is an estimate: the true last trade day is usually earlier in the
/// month, so roll dates computed from it can be late by several trading days.
/// Downstream roll arithmetic is calibrated against it, so it stays.
pub const PLACEHOLDER_EXPIRATION_DAY: u32 = 30;

/// Parsed contract code, e.g. `ZCZ2024` -> root `ZC`, month `Z`, year 2024.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCode {
    pub root: String,
    pub month: MonthCode,
    pub year: i32,
}

impl ContractCode {
    /// Parse `<root><month letter><2 or 4 digit year>`.
    ///
    /// Two digit years are read as 20yy.
    pub fn parse(code: &str) -> Result<Self, BackadjustError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(BackadjustError::format(code, "empty contract code"));
        }

        let digits = code
            .chars()
            .rev()
            .take_while(|c| c.is_ascii_digit())
            .count();
        let year: i32 = match digits {
            2 | 4 => code[code.len() - digits..]
                .parse()
                .map_err(|_| BackadjustError::format(code, "invalid year"))?,
            0 => return Err(BackadjustError::format(code, "missing year")),
            n => {
                return Err(BackadjustError::format(
                    code,
                    format!("year must have 2 or 4 digits, found {n}"),
                ));
            }
        };
        let year = if digits == 2 { 2000 + year } else { year };

        let head = &code[..code.len() - digits];
        let letter = head
            .chars()
            .last()
            .ok_or_else(|| BackadjustError::format(code, "missing month letter"))?;
        let month = MonthCode::from_letter(letter).ok_or_else(|| {
            BackadjustError::format(code, format!("unknown month letter {letter:?}"))
        })?;
        let root = head[..head.len() - letter.len_utf8()].to_string();

        Ok(Self { root, month, year })
    }

    /// True when this contract's delivery month lies strictly before the
    /// month of `today`.
    pub fn is_expired_as_of(&self, today: NaiveDate) -> bool {
        (self.year, self.month.month()) < (today.year(), today.month())
    }

    /// Expiration date assigned to this contract.
    ///
    /// Expired contracts take the day-of-month of their last bar; others take
    /// [`PLACEHOLDER_EXPIRATION_DAY`]. Days past the end of the month clamp to
    /// the month's last day.
    pub fn expiration_date(
        &self,
        last_bar: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<NaiveDate, BackadjustError> {
        let day = if self.is_expired_as_of(today) {
            match last_bar {
                Some(date) => date.day(),
                None => {
                    return Err(BackadjustError::NoData {
                        symbol: self.to_string(),
                    });
                }
            }
        } else {
            PLACEHOLDER_EXPIRATION_DAY
        };
        clamped_date(self.year, self.month.month(), day).ok_or_else(|| {
            BackadjustError::format(&self.to_string(), "expiration outside calendar range")
        })
    }
}

impl fmt::Display for ContractCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{:04}", self.root, self.month, self.year)
    }
}

fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    (1..=day.min(31))
        .rev()
        .find_map(|d| NaiveDate::from_ymd_opt(year, month, d))
}

/// One futures contract and its bars, ordered by date.
#[derive(Debug, Clone, PartialEq)]
pub struct Contract {
    pub symbol: String,
    pub code: ContractCode,
    pub expiration: NaiveDate,
    pub bars: Vec<OhlcvBar>,
}

impl Contract {
    pub fn new(
        symbol: String,
        code: ContractCode,
        expiration: NaiveDate,
        mut bars: Vec<OhlcvBar>,
    ) -> Self {
        bars.sort_by_key(|b| (b.date, b.timestamp));
        Self {
            symbol,
            code,
            expiration,
            bars,
        }
    }

    /// Month letter of the assigned expiration date.
    pub fn expiration_month(&self) -> MonthCode {
        MonthCode::from_month(self.expiration.month()).unwrap_or(self.code.month)
    }

    /// Drop bars dated after `cutoff`.
    pub fn truncated(&self, cutoff: NaiveDate) -> Self {
        Self {
            bars: self
                .bars
                .iter()
                .filter(|b| b.date <= cutoff)
                .cloned()
                .collect(),
            ..self.clone()
        }
    }
}

/// All contracts of one instrument, at most one per expiration date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContractChain {
    contracts: BTreeMap<NaiveDate, Contract>,
}

impl ContractChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `contract`, handing it back if its expiration is already taken.
    pub fn insert(&mut self, contract: Contract) -> Result<(), Contract> {
        if self.contracts.contains_key(&contract.expiration) {
            return Err(contract);
        }
        self.contracts.insert(contract.expiration, contract);
        Ok(())
    }

    pub fn get(&self, expiration: NaiveDate) -> Option<&Contract> {
        self.contracts.get(&expiration)
    }

    /// Contracts in ascending expiration order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Contract> {
        self.contracts.values()
    }

    pub fn expirations(&self) -> Vec<NaiveDate> {
        self.contracts.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    /// Keep only contracts for which `keep` returns true.
    pub fn filtered<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&Contract) -> bool,
    {
        Self {
            contracts: self
                .contracts
                .iter()
                .filter(|(_, c)| keep(c))
                .map(|(k, c)| (*k, c.clone()))
                .collect(),
        }
    }

    /// Apply `f` to every contract, keeping expirations unchanged.
    pub fn map_contracts<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&Contract) -> Contract,
    {
        Self {
            contracts: self
                .contracts
                .iter()
                .map(|(k, c)| (*k, f(c)))
                .collect(),
        }
    }
}

impl FromIterator<Contract> for ContractChain {
    /// Later contracts with an already-taken expiration are dropped.
    fn from_iter<T: IntoIterator<Item = Contract>>(iter: T) -> Self {
        let mut chain = Self::new();
        for contract in iter {
            let _ = chain.insert(contract);
        }
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn contract(symbol: &str, expiration: NaiveDate) -> Contract {
        let code = ContractCode::parse(symbol).unwrap();
        Contract::new(symbol.to_string(), code, expiration, vec![])
    }

    #[test]
    fn parse_four_digit_year() {
        let code = ContractCode::parse("ZCZ2024").unwrap();
        assert_eq!(code.root, "ZC");
        assert_eq!(code.month, MonthCode::Z);
        assert_eq!(code.year, 2024);
        assert_eq!(code.to_string(), "ZCZ2024");
    }

    #[test]
    fn parse_two_digit_year() {
        let code = ContractCode::parse("MESH25").unwrap();
        assert_eq!(code.root, "MES");
        assert_eq!(code.month, MonthCode::H);
        assert_eq!(code.year, 2025);
    }

    #[test]
    fn parse_code_without_root() {
        let code = ContractCode::parse("U1999").unwrap();
        assert_eq!(code.root, "");
        assert_eq!(code.month, MonthCode::U);
        assert_eq!(code.year, 1999);
    }

    #[test]
    fn malformed_codes_are_format_errors() {
        for bad in ["", "ZC", "ZCZ", "ZCZ202", "ZCZ20245", "ZCA2024", "2024"] {
            let err = ContractCode::parse(bad).unwrap_err();
            assert!(
                matches!(err, BackadjustError::Format { .. }),
                "{bad:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn expired_contract_uses_last_bar_day() {
        let code = ContractCode::parse("ZCZ2022").unwrap();
        let exp = code
            .expiration_date(Some(d(2022, 12, 14)), d(2024, 6, 1))
            .unwrap();
        assert_eq!(exp, d(2022, 12, 14));
    }

    #[test]
    fn current_month_contract_uses_placeholder() {
        let code = ContractCode::parse("ZCZ2024").unwrap();
        let exp = code
            .expiration_date(Some(d(2024, 12, 3)), d(2024, 12, 10))
            .unwrap();
        assert_eq!(exp, d(2024, 12, 30));
    }

    #[test]
    fn future_contract_uses_placeholder() {
        let code = ContractCode::parse("MESM2025").unwrap();
        let exp = code
            .expiration_date(Some(d(2024, 6, 1)), d(2024, 6, 1))
            .unwrap();
        assert_eq!(exp, d(2025, 6, 30));
    }

    #[test]
    fn placeholder_clamps_to_month_end() {
        let code = ContractCode::parse("CLG2030").unwrap();
        let exp = code.expiration_date(None, d(2024, 6, 1)).unwrap();
        assert_eq!(exp, d(2030, 2, 28));
    }

    #[test]
    fn expired_contract_without_bars_has_no_data() {
        let code = ContractCode::parse("ZCZ2020").unwrap();
        let err = code.expiration_date(None, d(2024, 6, 1)).unwrap_err();
        assert!(matches!(err, BackadjustError::NoData { .. }));
    }

    #[test]
    fn chain_rejects_duplicate_expiration() {
        let mut chain = ContractChain::new();
        assert!(chain.insert(contract("ESH2024", d(2024, 3, 15))).is_ok());
        let dup = chain.insert(contract("ESH24", d(2024, 3, 15))).unwrap_err();
        assert_eq!(dup.symbol, "ESH24");
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn chain_iterates_by_expiration() {
        let chain: ContractChain = vec![
            contract("ESU2024", d(2024, 9, 20)),
            contract("ESH2024", d(2024, 3, 15)),
            contract("ESM2024", d(2024, 6, 21)),
        ]
        .into_iter()
        .collect();
        let symbols: Vec<_> = chain.iter().map(|c| c.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["ESH2024", "ESM2024", "ESU2024"]);
        assert_eq!(
            chain.expirations(),
            vec![d(2024, 3, 15), d(2024, 6, 21), d(2024, 9, 20)]
        );
    }

    #[test]
    fn truncated_drops_later_bars() {
        let bars = vec![
            OhlcvBar::from_timestamp("ESH2024", 1_704_067_200, 1.0, 1.0, 1.0, 1.0, 0.0).unwrap(),
            OhlcvBar::from_timestamp("ESH2024", 1_704_153_600, 2.0, 2.0, 2.0, 2.0, 0.0).unwrap(),
        ];
        let c = Contract::new(
            "ESH2024".into(),
            ContractCode::parse("ESH2024").unwrap(),
            d(2024, 3, 15),
            bars,
        );
        let t = c.truncated(d(2024, 1, 1));
        assert_eq!(t.bars.len(), 1);
        assert_eq!(t.bars[0].date, d(2024, 1, 1));
    }
}
