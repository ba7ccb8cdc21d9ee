//! Port traits: the boundaries between domain logic and I/O.

pub mod config_port;
pub mod ledger_port;
pub mod quote_port;
pub mod report_port;
