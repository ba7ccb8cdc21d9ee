//! Dashboard report port.

use crate::domain::error::PaperTradeError;
use crate::domain::reports::Dashboard;

/// Port for writing a rendered dashboard.
pub trait ReportPort {
    fn write_dashboard(&self, dashboard: &Dashboard, output_path: &str)
    -> Result<(), PaperTradeError>;
}
