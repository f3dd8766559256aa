pub mod report_writer;
pub mod run_report;

pub use report_writer::{read_count_table, ReportWriter};
pub use run_report::{GroupSummary, RunReport};
