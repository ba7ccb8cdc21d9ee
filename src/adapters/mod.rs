//! Concrete adapter implementations for ports.

pub mod chart_svg;
pub mod csv_quote_adapter;
pub mod env_config_adapter;
pub mod file_config_adapter;
pub mod html_report_adapter;
pub mod layered_config;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
#[cfg(feature = "yahoo")]
pub mod yahoo_quote_adapter;
