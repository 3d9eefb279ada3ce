//! Core domain types and logic.

pub mod calendar;
pub mod config_validation;
pub mod contract;
pub mod error;
pub mod instrument;
pub mod month_code;
pub mod ohlcv;
pub mod panama;
pub mod pipeline;
pub mod price_matrix;
pub mod repository;
pub mod roll_schedule;
