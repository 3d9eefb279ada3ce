//! Per-instrument roll settings.

use crate::domain::month_code::MonthCode;

/// Longest accepted roll lead, about one trading year.
pub const MAX_ROLL_LEAD_TRADING_DAYS: u32 = 260;

#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentConfig {
    pub symbol: String,
    /// Delivery months the instrument rolls through.
    pub roll_months: Vec<MonthCode>,
    /// Trading days before expiration on which the roll happens.
    pub roll_lead_trading_days: u32,
    pub trade_into_backmonth: bool,
}

impl InstrumentConfig {
    /// Built-in roll schedule for well known instruments.
    pub fn builtin(symbol: &str, trade_into_backmonth: bool) -> Option<Self> {
        let (roll_months, roll_lead_trading_days) = match symbol.to_uppercase().as_str() {
            "MES" | "ES" => (vec![MonthCode::H, MonthCode::M, MonthCode::U, MonthCode::Z], 3),
            "ZC" => (vec![MonthCode::Z], 30),
            _ => return None,
        };
        Some(Self {
            symbol: symbol.to_uppercase(),
            roll_months,
            roll_lead_trading_days,
            trade_into_backmonth,
        })
    }

    pub fn roll_months_display(&self) -> String {
        self.roll_months
            .iter()
            .map(|m| m.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}
