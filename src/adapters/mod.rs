//! Concrete adapter implementations for ports.

pub mod chart_svg;
pub mod csv_adapter;
pub mod csv_series_writer;
pub mod file_config_adapter;
