//! CSV sink for continuous series: `<output_dir>/<SYMBOL>_continuous.csv`.

use crate::domain::error::BackadjustError;
use crate::domain::panama::ContinuousSeries;
use crate::ports::series_port::SeriesPort;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

#[derive(Serialize)]
struct Row<'a> {
    date: String,
    unadjusted: f64,
    backadjusted: f64,
    contract: &'a str,
}

pub struct CsvSeriesWriter {
    output_dir: PathBuf,
}

impl CsvSeriesWriter {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    pub fn path_for(&self, instrument: &str) -> PathBuf {
        self.output_dir.join(format!("{instrument}_continuous.csv"))
    }
}

impl SeriesPort for CsvSeriesWriter {
    fn write(
        &self,
        instrument: &str,
        series: &ContinuousSeries,
    ) -> Result<Vec<PathBuf>, BackadjustError> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.path_for(instrument);

        let mut wtr = csv::Writer::from_path(&path)?;
        for point in series.iter() {
            wtr.serialize(Row {
                date: point.date.format("%Y-%m-%d").to_string(),
                unadjusted: point.unadjusted,
                backadjusted: point.backadjusted,
                contract: &point.contract,
            })?;
        }
        // An empty series still gets its header.
        if series.is_empty() {
            wtr.write_record(["date", "unadjusted", "backadjusted", "contract"])?;
        }
        wtr.flush()?;

        tracing::debug!(instrument, path = %path.display(), rows = series.len(), "wrote series");
        Ok(vec![path])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::calendar::TradingCalendar;
    use crate::domain::panama::PanamaAdjuster;
    use crate::domain::price_matrix::PriceMatrix;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sample_series() -> ContinuousSeries {
        let mut matrix = PriceMatrix::default();
        matrix.insert(d(2024, 6, 28), "MESM2024", d(2024, 5, 1), 100.0);
        matrix.insert(d(2024, 6, 28), "MESM2024", d(2024, 5, 2), 101.5);
        let cal = TradingCalendar::weekdays_only();
        PanamaAdjuster::new(&cal, 3, d(2024, 5, 3))
            .adjust(&matrix)
            .unwrap()
            .series
    }

    #[test]
    fn writes_header_and_rows() {
        let dir = TempDir::new().unwrap();
        let writer = CsvSeriesWriter::new(dir.path().join("out"));
        let paths = writer.write("MES", &sample_series()).unwrap();

        assert_eq!(paths, vec![dir.path().join("out").join("MES_continuous.csv")]);
        let content = fs::read_to_string(&paths[0]).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "date,unadjusted,backadjusted,contract");
        assert_eq!(lines[1], "2024-05-01,100.0,100.0,MESM2024");
        assert_eq!(lines[2], "2024-05-02,101.5,101.5,MESM2024");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn empty_series_writes_header_only() {
        let dir = TempDir::new().unwrap();
        let writer = CsvSeriesWriter::new(dir.path().to_path_buf());
        let paths = writer.write("ZC", &ContinuousSeries::default()).unwrap();
        let content = fs::read_to_string(&paths[0]).unwrap();
        assert_eq!(content.trim(), "date,unadjusted,backadjusted,contract");
    }
}
