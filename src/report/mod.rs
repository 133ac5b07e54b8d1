//! Reports on a user's income and spending.

mod endpoint;
mod summary;

pub use endpoint::get_report_summary_endpoint;
pub use summary::{ReportSummary, report_summary};
