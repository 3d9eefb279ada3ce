//! backadjust: continuous back-adjusted futures series.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], command-line driver in [`cli`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
