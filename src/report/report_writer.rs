use crate::config::OutputConfig;
use crate::counter::CountTable;
use crate::error::{Result, TallyError};
use std::fs;
use std::path::{Path, PathBuf};

pub const ELEMENT_COLUMN: &str = "element";
pub const COUNT_COLUMN: &str = "count";

/// Writes `element,count` CSV reports into the reports directory.
pub struct ReportWriter {
    reports_dir: PathBuf,
    report_suffix: String,
    totals_file: String,
    use_source_header: bool,
}

impl ReportWriter {
    pub fn new(reports_dir: PathBuf, config: &OutputConfig) -> Self {
        Self {
            reports_dir,
            report_suffix: config.report_suffix.clone(),
            totals_file: config.totals_file.clone(),
            use_source_header: config.use_source_header,
        }
    }

    /// Creates the reports directory if needed. Returns true if it was
    /// created by this call.
    pub fn initialize(&self) -> Result<bool> {
        if self.reports_dir.is_dir() {
            return Ok(false);
        }

        if self.reports_dir.exists() {
            return Err(TallyError::InvalidPath {
                path: format!("{} exists but is not a directory", self.reports_dir.display()),
            });
        }

        fs::create_dir_all(&self.reports_dir)?;
        Ok(true)
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    pub fn group_report_path(&self, group: &str) -> PathBuf {
        self.reports_dir.join(format!("{}{}", group, self.report_suffix))
    }

    pub fn totals_path(&self) -> PathBuf {
        self.reports_dir.join(&self.totals_file)
    }

    /// `source_header` is the header row of the group's input file; it is
    /// only used when configured to replace the `element` column name.
    pub fn write_group_report(
        &self,
        group: &str,
        source_header: Option<&str>,
        table: &CountTable,
    ) -> Result<PathBuf> {
        let path = self.group_report_path(group);
        let element_column = match source_header {
            Some(header) if self.use_source_header && !header.is_empty() => header,
            _ => ELEMENT_COLUMN,
        };

        write_count_table(&path, element_column, table)?;
        Ok(path)
    }

    pub fn write_totals(&self, table: &CountTable) -> Result<PathBuf> {
        let path = self.totals_path();
        write_count_table(&path, ELEMENT_COLUMN, table)?;
        Ok(path)
    }
}

/// Overwrites `path` with a header row and one row per table entry.
pub fn write_count_table(path: &Path, element_column: &str, table: &CountTable) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| TallyError::csv(path, e))?;

    writer
        .write_record([element_column, COUNT_COLUMN])
        .map_err(|e| TallyError::csv(path, e))?;

    for (element, count) in table.iter() {
        writer
            .write_record([element, count.to_string().as_str()])
            .map_err(|e| TallyError::csv(path, e))?;
    }

    writer.flush()?;
    Ok(())
}

/// Parses a report written by [`write_count_table`].
pub fn read_count_table<P: AsRef<Path>>(path: P) -> Result<CountTable> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(fs::File::open(path)?);

    let mut records = reader.records();
    match records.next() {
        Some(header) => {
            header.map_err(|e| TallyError::csv(path, e))?;
        }
        None => return Err(TallyError::missing_header(path)),
    }

    let mut entries = Vec::new();
    for (row, record) in records.enumerate() {
        let record = record.map_err(|e| TallyError::csv(path, e))?;
        let malformed = |message: String| TallyError::MalformedReport {
            path: path.display().to_string(),
            message,
        };

        let element = record
            .get(0)
            .ok_or_else(|| malformed(format!("row {} has no element", row + 1)))?;
        let count = record
            .get(1)
            .ok_or_else(|| malformed(format!("row {} has no count", row + 1)))?
            .parse::<usize>()
            .map_err(|e| malformed(format!("row {}: {}", row + 1, e)))?;

        entries.push((element.to_string(), count));
    }

    Ok(CountTable::from_entries(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::count_elements;
    use crate::exclusions::ExclusionSet;
    use tempfile::TempDir;

    fn writer_in(dir: &TempDir, config: &OutputConfig) -> ReportWriter {
        ReportWriter::new(dir.path().join("reports"), config)
    }

    fn fruit_table() -> CountTable {
        count_elements(vec!["apple", "banana", "apple"], &ExclusionSet::new())
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let writer = writer_in(&temp_dir, &OutputConfig::default());

        assert!(writer.initialize().unwrap());
        assert!(writer.reports_dir().is_dir());
        assert!(!writer.initialize().unwrap());
    }

    #[test]
    fn test_initialize_rejects_file_in_the_way() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("reports"), "not a dir").unwrap();

        let writer = writer_in(&temp_dir, &OutputConfig::default());
        assert!(matches!(writer.initialize(), Err(TallyError::InvalidPath { .. })));
    }

    #[test]
    fn test_group_report_contents() {
        let temp_dir = TempDir::new().unwrap();
        let writer = writer_in(&temp_dir, &OutputConfig::default());
        writer.initialize().unwrap();

        let path = writer
            .write_group_report("fruits", Some("fruit"), &fruit_table())
            .unwrap();

        assert_eq!(path, temp_dir.path().join("reports").join("fruits_report.csv"));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "element,count\napple,2\nbanana,1\n"
        );
    }

    #[test]
    fn test_source_header_option() {
        let temp_dir = TempDir::new().unwrap();
        let config = OutputConfig {
            use_source_header: true,
            ..OutputConfig::default()
        };
        let writer = writer_in(&temp_dir, &config);
        writer.initialize().unwrap();

        let path = writer
            .write_group_report("fruits", Some("fruit"), &fruit_table())
            .unwrap();
        let content = fs::read_to_string(path).unwrap();
        assert!(content.starts_with("fruit,count\n"));

        let totals = fs::read_to_string(writer.write_totals(&fruit_table()).unwrap()).unwrap();
        assert!(totals.starts_with("element,count\n"));
    }

    #[test]
    fn test_reports_are_overwritten() {
        let temp_dir = TempDir::new().unwrap();
        let writer = writer_in(&temp_dir, &OutputConfig::default());
        writer.initialize().unwrap();
        fs::write(writer.totals_path(), "stale,data\nold,99\nolder,98\n").unwrap();

        writer.write_totals(&fruit_table()).unwrap();

        assert_eq!(
            fs::read_to_string(writer.totals_path()).unwrap(),
            "element,count\napple,2\nbanana,1\n"
        );
    }

    #[test]
    fn test_round_trip_with_quoted_elements() {
        let temp_dir = TempDir::new().unwrap();
        let writer = writer_in(&temp_dir, &OutputConfig::default());
        writer.initialize().unwrap();

        let table = count_elements(
            vec!["Smith, John", "say \"hi\"", "Smith, John", "plain"],
            &ExclusionSet::new(),
        );
        let path = writer.write_totals(&table).unwrap();

        assert_eq!(read_count_table(&path).unwrap(), table);
    }

    #[test]
    fn test_read_rejects_bad_counts() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.csv");
        fs::write(&path, "element,count\napple,many\n").unwrap();

        assert!(matches!(
            read_count_table(&path),
            Err(TallyError::MalformedReport { .. })
        ));
    }
}
