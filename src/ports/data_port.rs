//! Data access port trait.

use crate::domain::error::BackadjustError;
use crate::domain::repository::RawContractSeries;

pub trait DataPort {
    /// Instruments with contract data available, sorted.
    fn list_instruments(&self) -> Result<Vec<String>, BackadjustError>;

    /// Every contract series stored for `instrument`, in no particular order.
    fn fetch_contracts(&self, instrument: &str) -> Result<Vec<RawContractSeries>, BackadjustError>;
}
