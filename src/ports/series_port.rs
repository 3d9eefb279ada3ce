//! Output port for continuous series.

use crate::domain::error::BackadjustError;
use crate::domain::panama::ContinuousSeries;
use std::path::PathBuf;

/// Port for handing a finished series to a sink.
pub trait SeriesPort {
    /// Write the series of `instrument`, returning the paths written.
    fn write(
        &self,
        instrument: &str,
        series: &ContinuousSeries,
    ) -> Result<Vec<PathBuf>, BackadjustError>;
}
