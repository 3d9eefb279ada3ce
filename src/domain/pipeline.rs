//! Per-instrument driver: load the chain, pick the trading window, adjust.

use crate::domain::calendar::TradingCalendar;
use crate::domain::contract::Contract;
use crate::domain::error::BackadjustError;
use crate::domain::instrument::InstrumentConfig;
use crate::domain::panama::{Adjustment, ContractRef, Diagnostic, PanamaAdjuster};
use crate::domain::price_matrix::PriceMatrix;
use crate::domain::repository::{ContractRepository, RawContractSeries};
use crate::domain::roll_schedule::{
    filter_rollable, filter_rollable_contracts, select_trading_contract,
};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;

/// Which contracts are live and which one is traded.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Active rollable contracts, farthest expiration first.
    pub active_rollable: Vec<ContractRef>,
    pub trading: Option<ContractRef>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentRun {
    pub instrument: String,
    pub selection: Selection,
    /// Last date included in the series.
    pub cutoff: NaiveDate,
    pub adjustment: Adjustment,
}

impl InstrumentRun {
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.selection
            .diagnostics
            .iter()
            .chain(self.adjustment.diagnostics.iter())
    }
}

fn contract_ref(contract: &Contract) -> ContractRef {
    ContractRef {
        symbol: contract.symbol.clone(),
        expiration: contract.expiration,
    }
}

/// Select the trading contract among those active on `today`.
///
/// Too few active rollable contracts is recorded, not raised; the trading
/// window then extends to the farthest active rollable contract, if any.
pub fn select_contracts(
    repo: &ContractRepository,
    instrument: &InstrumentConfig,
    today: NaiveDate,
) -> Selection {
    let mut diagnostics: Vec<Diagnostic> = repo
        .rejected()
        .iter()
        .map(|r| Diagnostic::RejectedContract {
            symbol: r.symbol.clone(),
            reason: r.reason.to_string(),
        })
        .collect();

    let active = repo.active_contracts(today);
    let active_rollable = filter_rollable_contracts(&active, &instrument.roll_months);

    let trading = match select_trading_contract(&active_rollable, instrument.trade_into_backmonth)
    {
        Ok(contract) => Some(contract_ref(contract)),
        Err(BackadjustError::InsufficientContracts { found, .. }) => {
            tracing::warn!(
                instrument = %instrument.symbol,
                found,
                backmonth = instrument.trade_into_backmonth,
                "not enough active rollable contracts to select a trading contract"
            );
            diagnostics.push(Diagnostic::InsufficientContracts { found });
            active_rollable.first().map(|c| contract_ref(c))
        }
        Err(e) => {
            tracing::warn!(instrument = %instrument.symbol, "selection failed: {e}");
            None
        }
    };

    Selection {
        active_rollable: active_rollable.iter().map(|c| contract_ref(c)).collect(),
        trading,
        diagnostics,
    }
}

/// Build the continuous series of one instrument from raw contract series.
///
/// Bars after the last completed trading day before `today` are ignored, as
/// are contracts expiring after the trading contract.
pub fn build_continuous(
    raw: Vec<RawContractSeries>,
    instrument: &InstrumentConfig,
    calendar: &TradingCalendar,
    today: NaiveDate,
) -> Result<InstrumentRun, BackadjustError> {
    let repo = ContractRepository::load_chain(&instrument.symbol, raw, today)?;
    let selection = select_contracts(&repo, instrument, today);
    let cutoff = calendar.previous_trading_day(today);

    let rolling = filter_rollable(repo.chain(), &instrument.roll_months);
    let rolling = match &selection.trading {
        Some(trading) => rolling.filtered(|c| c.expiration <= trading.expiration),
        None => rolling,
    };
    let rolling = rolling.map_contracts(|c| c.truncated(cutoff));

    let matrix = PriceMatrix::from_chain(&rolling);
    let adjustment = PanamaAdjuster::new(calendar, instrument.roll_lead_trading_days, today)
        .adjust(&matrix)?;

    if adjustment.series.is_empty() {
        return Err(BackadjustError::NoData {
            symbol: instrument.symbol.clone(),
        });
    }

    tracing::info!(
        instrument = %instrument.symbol,
        rolls = adjustment.rolls.len(),
        points = adjustment.series.len(),
        trading = selection.trading.as_ref().map(|t| t.symbol.as_str()).unwrap_or("-"),
        "built continuous series"
    );

    Ok(InstrumentRun {
        instrument: instrument.symbol.clone(),
        selection,
        cutoff,
        adjustment,
    })
}

/// Fetch the contracts stored under `source` and build their series.
///
/// `source` is the instrument name as the data port lists it, which may
/// differ in case from `instrument.symbol`.
pub fn run_instrument(
    data_port: &dyn DataPort,
    source: &str,
    instrument: &InstrumentConfig,
    calendar: &TradingCalendar,
    today: NaiveDate,
) -> Result<InstrumentRun, BackadjustError> {
    let raw = data_port.fetch_contracts(source)?;
    build_continuous(raw, instrument, calendar, today)
}
