//! Roll schedule selection: which contracts are rolled through and which one
//! is traded now.

use crate::domain::contract::{Contract, ContractChain};
use crate::domain::error::BackadjustError;
use crate::domain::month_code::MonthCode;

/// Keep only contracts whose expiration month is one of `allowed`.
pub fn filter_rollable(chain: &ContractChain, allowed: &[MonthCode]) -> ContractChain {
    chain.filtered(|c| allowed.contains(&c.expiration_month()))
}

/// Same filter over a plain contract list, preserving order.
pub fn filter_rollable_contracts<'a>(
    contracts: &[&'a Contract],
    allowed: &[MonthCode],
) -> Vec<&'a Contract> {
    contracts
        .iter()
        .copied()
        .filter(|c| allowed.contains(&c.expiration_month()))
        .collect()
}

/// Pick the contract to trade among the active rollable contracts.
///
/// The nearest expiration is the front month; with `trade_into_backmonth`
/// the second nearest is chosen instead.
pub fn select_trading_contract<'a>(
    active_rollable: &[&'a Contract],
    trade_into_backmonth: bool,
) -> Result<&'a Contract, BackadjustError> {
    let required = if trade_into_backmonth { 2 } else { 1 };
    let mut by_expiration = active_rollable.to_vec();
    by_expiration.sort_by_key(|c| c.expiration);
    by_expiration
        .get(required - 1)
        .copied()
        .ok_or(BackadjustError::InsufficientContracts {
            required,
            found: by_expiration.len(),
        })
}
