//! Core domain types and logic.

pub mod config_validation;
pub mod error;
pub mod indicator;
pub mod metrics;
pub mod optimizer;
pub mod price;
pub mod quarter;
pub mod returns;
pub mod risk;
pub mod signal;
