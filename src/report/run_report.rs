use crate::counter::CountTable;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub directory: String,
    pub reports_dir: String,
    pub generated_at: DateTime<Utc>,
    pub duration: Duration,
    pub files_processed: usize,
    pub elements_read: usize,
    pub renamed_files: Vec<String>,
    pub exclusions_added: Vec<String>,
    pub exclusions_total: usize,
    pub groups: Vec<GroupSummary>,
    pub totals: GroupSummary,
}

/// One written (or skipped) report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSummary {
    pub name: String,
    pub report_path: Option<String>,
    pub distinct_elements: usize,
    pub total_count: usize,
    pub counts: CountTable,
}

impl GroupSummary {
    pub fn new(name: &str, report_path: Option<String>, counts: &CountTable) -> Self {
        Self {
            name: name.to_string(),
            report_path,
            distinct_elements: counts.len(),
            total_count: counts.total(),
            counts: counts.clone(),
        }
    }
}

impl RunReport {
    pub fn reports_written(&self) -> usize {
        self.groups
            .iter()
            .chain(std::iter::once(&self.totals))
            .filter(|g| g.report_path.is_some())
            .count()
    }

    pub fn display_summary(&self) -> String {
        let mut summary = format!(
            "Run Results:\n  Files processed: {}\n  Elements read: {}\n  Distinct elements counted: {}\n",
            self.files_processed, self.elements_read, self.totals.distinct_elements
        );

        summary.push_str(&format!(
            "  Exclusions: {} ({} added this run)\n",
            self.exclusions_total,
            self.exclusions_added.len()
        ));
        summary.push_str(&format!("  Reports written: {}\n", self.reports_written()));

        summary
    }
}
