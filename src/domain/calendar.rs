//! Trading day calendar.
//!
//! Weekends are always closed. On top of that a calendar carries the public
//! holidays of one jurisdiction plus any extra closures supplied through
//! configuration.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Holiday rules a calendar follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Jurisdiction {
    /// Weekends only.
    None,
    /// US federal holidays with weekend observance.
    #[default]
    UnitedStates,
}

impl FromStr for Jurisdiction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "us" | "usa" | "united_states" => Ok(Jurisdiction::UnitedStates),
            "none" | "" => Ok(Jurisdiction::None),
            other => Err(format!("unknown country {other:?} (expected US or none)")),
        }
    }
}

impl fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Jurisdiction::None => write!(f, "none"),
            Jurisdiction::UnitedStates => write!(f, "US"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TradingCalendar {
    jurisdiction: Jurisdiction,
    extra_holidays: BTreeSet<NaiveDate>,
}

impl TradingCalendar {
    pub fn new(jurisdiction: Jurisdiction) -> Self {
        Self {
            jurisdiction,
            extra_holidays: BTreeSet::new(),
        }
    }

    pub fn weekdays_only() -> Self {
        Self::new(Jurisdiction::None)
    }

    pub fn with_holidays<I>(mut self, dates: I) -> Self
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        self.extra_holidays.extend(dates);
        self
    }

    pub fn jurisdiction(&self) -> Jurisdiction {
        self.jurisdiction
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        if self.extra_holidays.contains(&date) {
            return true;
        }
        match self.jurisdiction {
            Jurisdiction::None => false,
            Jurisdiction::UnitedStates => is_us_federal_holiday(date),
        }
    }

    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        !is_weekend(date) && !self.is_holiday(date)
    }

    /// The latest trading day on or before `date`.
    ///
    /// Terminates: no jurisdiction closes more than a handful of consecutive
    /// weekdays and the extra holiday set is finite.
    pub fn preceding_trading_day(&self, date: NaiveDate) -> NaiveDate {
        let mut day = date;
        while !self.is_trading_day(day) {
            day = day_before(day);
        }
        day
    }

    /// The latest trading day strictly before `date`.
    pub fn previous_trading_day(&self, date: NaiveDate) -> NaiveDate {
        self.preceding_trading_day(day_before(date))
    }

    /// The earliest trading day strictly after `date`.
    pub fn next_trading_day(&self, date: NaiveDate) -> NaiveDate {
        let mut day = day_after(date);
        while !self.is_trading_day(day) {
            day = day_after(day);
        }
        day
    }

    /// Step back `n` trading days from `date`.
    ///
    /// Starting from a closed day, the first step lands on the preceding
    /// trading day. `n == 0` snaps to the preceding trading day.
    pub fn subtract_trading_days(&self, date: NaiveDate, n: u32) -> NaiveDate {
        let mut day = date;
        for _ in 0..n {
            day = self.previous_trading_day(day);
        }
        self.preceding_trading_day(day)
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn day_before(date: NaiveDate) -> NaiveDate {
    date.checked_sub_days(Days::new(1)).unwrap_or(NaiveDate::MIN)
}

fn day_after(date: NaiveDate) -> NaiveDate {
    date.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX)
}

// ---------------------------------------------------------------------------
// US federal holidays
// ---------------------------------------------------------------------------

fn is_us_federal_holiday(date: NaiveDate) -> bool {
    let year = date.year();
    // New Year's Day falling on a Saturday is observed on Dec 31 of the
    // previous year.
    us_federal_holidays(year).contains(&date)
        || (date.month() == 12 && us_federal_holidays(year + 1).contains(&date))
}

/// Observed US federal holidays of `year`.
pub fn us_federal_holidays(year: i32) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(11);

    let mut fixed = |month: u32, day: u32| {
        if let Some(d) = NaiveDate::from_ymd_opt(year, month, day) {
            days.push(observed(d));
        }
    };
    fixed(1, 1);
    if year >= 2021 {
        fixed(6, 19);
    }
    fixed(7, 4);
    fixed(11, 11);
    fixed(12, 25);

    let mut floating = |month: u32, weekday: Weekday, n: u8| {
        if let Some(d) = NaiveDate::from_weekday_of_month_opt(year, month, weekday, n) {
            days.push(d);
        }
    };
    if year >= 1986 {
        floating(1, Weekday::Mon, 3);
    }
    floating(2, Weekday::Mon, 3);
    floating(9, Weekday::Mon, 1);
    floating(10, Weekday::Mon, 2);
    floating(11, Weekday::Thu, 4);

    if let Some(memorial) = last_weekday_of_month(year, 5, Weekday::Mon) {
        days.push(memorial);
    }

    days.sort();
    days
}

fn observed(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => day_before(date),
        Weekday::Sun => day_after(date),
        _ => date,
    }
}

fn last_weekday_of_month(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let mut day = day_before(first_of_next);
    while day.weekday() != weekday {
        day = day_before(day);
    }
    Some(day)
}
