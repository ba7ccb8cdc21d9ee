//! Core domain types and logic.

pub mod account;
pub mod benchmark;
pub mod clock;
pub mod comparison;
pub mod config_validation;
pub mod engine;
pub mod error;
pub mod execution;
pub mod marks;
pub mod position;
pub mod price;
pub mod reports;
pub mod screener;
pub mod settings;
pub mod trade;
