//! Panama back-adjustment.
//!
//! Rolls are processed from the most future one back to the oldest. Each
//! roll adds its price differential (incoming minus outgoing close on the
//! roll date) to a running total, and every date up to the roll date is
//! rewritten from the outgoing contract's close plus that total. Older rolls
//! therefore overwrite the history of newer ones, and the value left on any
//! date comes from the contract that was active on it.
//!
//! The adjuster never mutates its input; [`PanamaAdjuster::adjust`] returns a
//! fresh [`Adjustment`].

use crate::domain::calendar::TradingCalendar;
use crate::domain::error::BackadjustError;
use crate::domain::price_matrix::PriceMatrix;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;

/// Trading days searched before the nominal roll date when prices are
/// missing on it.
pub const MAX_ROLL_LOOKBACK: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct ContinuousPoint {
    pub date: NaiveDate,
    pub unadjusted: f64,
    pub backadjusted: f64,
    /// Symbol of the contract whose close produced this point.
    pub contract: String,
}

/// Date-ordered continuous price series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContinuousSeries {
    points: Vec<ContinuousPoint>,
}

impl ContinuousSeries {
    fn from_map(points: BTreeMap<NaiveDate, ContinuousPoint>) -> Self {
        Self {
            points: points.into_values().collect(),
        }
    }

    pub fn points(&self) -> &[ContinuousPoint] {
        &self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ContinuousPoint> {
        self.points.iter()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&ContinuousPoint> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|i| &self.points[i])
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&ContinuousPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&ContinuousPoint> {
        self.points.last()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractRef {
    pub symbol: String,
    pub expiration: NaiveDate,
}

impl fmt::Display for ContractRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.symbol, self.expiration)
    }
}

/// One resolved roll from a nearer to a farther expiration.
#[derive(Debug, Clone, PartialEq)]
pub struct RollEvent {
    pub outgoing: ContractRef,
    pub incoming: ContractRef,
    /// Roll date before falling back over missing prices.
    pub nominal_roll_date: NaiveDate,
    pub roll_date: NaiveDate,
    pub outgoing_close: f64,
    pub incoming_close: f64,
    /// `incoming_close - outgoing_close`.
    pub differential: f64,
    /// Sum of this and every more future differential; added to the
    /// outgoing contract's closes.
    pub cumulative_differential: f64,
}

/// Non-fatal findings recorded while building a series.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Fewer than two rollable contracts: nothing to adjust.
    InsufficientContracts { found: usize },
    /// A roll resolved on or after the next newer roll, so the contract in
    /// between never became active.
    RollOverlap {
        roll_date: NaiveDate,
        newer_roll_date: NaiveDate,
        skipped: String,
    },
    /// A contract dropped while loading the chain.
    RejectedContract { symbol: String, reason: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::InsufficientContracts { found } => write!(
                f,
                "couldn't find enough contracts to backadjust ({found} rollable)"
            ),
            Diagnostic::RollOverlap {
                roll_date,
                newer_roll_date,
                skipped,
            } => write!(
                f,
                "roll on {roll_date} is not before the next roll on {newer_roll_date}; {skipped} is never active"
            ),
            Diagnostic::RejectedContract { symbol, reason } => {
                write!(f, "skipped contract {symbol}: {reason}")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Adjustment {
    pub series: ContinuousSeries,
    /// Rolls in processing order, most future first.
    pub rolls: Vec<RollEvent>,
    pub diagnostics: Vec<Diagnostic>,
}

/// A roll date with the two closes found on it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedRoll {
    pub nominal: NaiveDate,
    pub date: NaiveDate,
    pub outgoing_close: f64,
    pub incoming_close: f64,
}

pub struct PanamaAdjuster<'a> {
    calendar: &'a TradingCalendar,
    roll_lead_trading_days: u32,
    today: NaiveDate,
}

impl<'a> PanamaAdjuster<'a> {
    pub fn new(calendar: &'a TradingCalendar, roll_lead_trading_days: u32, today: NaiveDate) -> Self {
        Self {
            calendar,
            roll_lead_trading_days,
            today,
        }
    }

    /// `expiration` minus the lead, snapped to a trading day.
    pub fn nominal_roll_date(&self, expiration: NaiveDate) -> NaiveDate {
        self.calendar
            .subtract_trading_days(expiration, self.roll_lead_trading_days)
    }

    /// Resolve the roll date between two expirations, falling back over
    /// trading days without prices for both contracts.
    ///
    /// A nominal date past the last row of the matrix is a roll that has not
    /// happened yet; the search then starts from the last row.
    pub fn resolve_roll(
        &self,
        matrix: &PriceMatrix,
        outgoing: NaiveDate,
        incoming: NaiveDate,
    ) -> Result<ResolvedRoll, BackadjustError> {
        let nominal = self.nominal_roll_date(outgoing);
        let start = match matrix.last_date() {
            Some(last) if last < nominal => last,
            _ => nominal,
        };
        self.find_roll_row(matrix, start, outgoing, incoming)
            .map(|(date, outgoing_close, incoming_close)| ResolvedRoll {
                nominal,
                date,
                outgoing_close,
                incoming_close,
            })
            .ok_or_else(|| BackadjustError::DataGap {
                outgoing: matrix.symbol(outgoing).unwrap_or_default().to_string(),
                incoming: matrix.symbol(incoming).unwrap_or_default().to_string(),
                roll_date: start,
                lookback: MAX_ROLL_LOOKBACK,
            })
    }

    fn find_roll_row(
        &self,
        matrix: &PriceMatrix,
        start: NaiveDate,
        outgoing: NaiveDate,
        incoming: NaiveDate,
    ) -> Option<(NaiveDate, f64, f64)> {
        let mut day = start;
        for _ in 0..=MAX_ROLL_LOOKBACK {
            if let (Some(out), Some(inc)) =
                (matrix.close(outgoing, day), matrix.close(incoming, day))
            {
                return Some((day, out, inc));
            }
            day = self.calendar.previous_trading_day(day);
        }
        None
    }

    /// Build the unadjusted and back-adjusted series from `matrix`.
    pub fn adjust(&self, matrix: &PriceMatrix) -> Result<Adjustment, BackadjustError> {
        let expirations = matrix.expirations_desc();
        if expirations.len() < 2 {
            return Ok(passthrough(matrix, &expirations));
        }

        let mut points: BTreeMap<NaiveDate, ContinuousPoint> = BTreeMap::new();
        let mut rolls: Vec<RollEvent> = Vec::with_capacity(expirations.len() - 1);
        let mut diagnostics = Vec::new();
        let mut cumulative = 0.0;

        for pair in expirations.windows(2) {
            let (incoming, outgoing) = (pair[0], pair[1]);
            let ResolvedRoll {
                nominal: nominal_roll_date,
                date: roll_date,
                outgoing_close,
                incoming_close,
            } = self.resolve_roll(matrix, outgoing, incoming)?;
            let outgoing_ref = contract_ref(matrix, outgoing);
            let incoming_ref = contract_ref(matrix, incoming);

            if rolls.is_empty() {
                self.seed(&mut points, matrix, incoming, nominal_roll_date, roll_date);
            }

            let newer_roll = rolls.last().map(|r| r.roll_date);
            let upper = match newer_roll {
                Some(newer) if roll_date >= newer => {
                    tracing::warn!(
                        %roll_date,
                        newer_roll = %newer,
                        skipped = %incoming_ref.symbol,
                        "roll dates overlap"
                    );
                    diagnostics.push(Diagnostic::RollOverlap {
                        roll_date,
                        newer_roll_date: newer,
                        skipped: incoming_ref.symbol.clone(),
                    });
                    Bound::Excluded(newer)
                }
                _ => Bound::Included(roll_date),
            };

            let differential = incoming_close - outgoing_close;
            cumulative += differential;

            if let Some(column) = matrix.column(outgoing) {
                for (&date, &close) in column.closes.range((Bound::Unbounded, upper)) {
                    points.insert(
                        date,
                        ContinuousPoint {
                            date,
                            unadjusted: close,
                            backadjusted: close + cumulative,
                            contract: outgoing_ref.symbol.clone(),
                        },
                    );
                }
            }

            tracing::debug!(
                from = %outgoing_ref,
                into = %incoming_ref,
                %nominal_roll_date,
                %roll_date,
                differential,
                cumulative,
                "rolled"
            );

            rolls.push(RollEvent {
                outgoing: outgoing_ref,
                incoming: incoming_ref,
                nominal_roll_date,
                roll_date,
                outgoing_close,
                incoming_close,
                differential,
                cumulative_differential: cumulative,
            });
        }

        Ok(Adjustment {
            series: ContinuousSeries::from_map(points),
            rolls,
            diagnostics,
        })
    }

    /// Fill the segment after the most future roll with the incoming
    /// contract's raw closes. When that segment has not started yet, the
    /// incoming contract also fills everything before it.
    ///
    /// Whether the segment has started is judged from the nominal roll date,
    /// not the date the lookback settled on, so it does not depend on where
    /// the data happens to end.
    fn seed(
        &self,
        points: &mut BTreeMap<NaiveDate, ContinuousPoint>,
        matrix: &PriceMatrix,
        incoming: NaiveDate,
        nominal_roll_date: NaiveDate,
        roll_date: NaiveDate,
    ) {
        let Some(column) = matrix.column(incoming) else {
            return;
        };
        let seed_start = self.calendar.next_trading_day(nominal_roll_date);
        let lower = if seed_start > self.today {
            Bound::Unbounded
        } else {
            Bound::Excluded(roll_date)
        };
        for (&date, &close) in column.closes.range((lower, Bound::Unbounded)) {
            points.insert(
                date,
                ContinuousPoint {
                    date,
                    unadjusted: close,
                    backadjusted: close,
                    contract: column.symbol.clone(),
                },
            );
        }
    }
}

fn contract_ref(matrix: &PriceMatrix, expiration: NaiveDate) -> ContractRef {
    ContractRef {
        symbol: matrix.symbol(expiration).unwrap_or_default().to_string(),
        expiration,
    }
}

fn passthrough(matrix: &PriceMatrix, expirations: &[NaiveDate]) -> Adjustment {
    tracing::warn!(
        found = expirations.len(),
        "couldn't find enough contracts to backadjust"
    );
    let mut points = BTreeMap::new();
    if let Some(column) = expirations.first().and_then(|&e| matrix.column(e)) {
        for (&date, &close) in &column.closes {
            points.insert(
                date,
                ContinuousPoint {
                    date,
                    unadjusted: close,
                    backadjusted: close,
                    contract: column.symbol.clone(),
                },
            );
        }
    }
    Adjustment {
        series: ContinuousSeries::from_map(points),
        rolls: Vec::new(),
        diagnostics: vec![Diagnostic::InsufficientContracts {
            found: expirations.len(),
        }],
    }
}
