use crate::error::{Result, TallyError};
use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

pub const DEFAULT_CONFIG_FILES: [&str; 2] = ["csvtally.toml", ".csvtally.toml"];

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub output: OutputConfig,
    pub exclusions: ExclusionConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InputConfig {
    pub extension: String,
    pub normalize_file_names: bool,
    pub sort_rows: bool,
    pub delimiter: char,
    pub quote: char,
    pub exclude_patterns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub reports_dir: PathBuf,
    pub report_suffix: String,
    pub totals_file: String,
    pub use_source_header: bool,
    pub write_group_reports: bool,
    pub top: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExclusionConfig {
    pub file_name: String,
    pub dedup_on_write: bool,
    pub mode: SelectionMode,
}

/// How new exclusions are chosen each run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Ask on the terminal, one number at a time
    Prompt,
    /// Add nothing
    None,
    /// Exclude every remaining element
    All,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            extension: "csv".to_string(),
            normalize_file_names: true,
            sort_rows: true,
            delimiter: ' ',
            quote: '|',
            exclude_patterns: Vec::new(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            reports_dir: PathBuf::from("reports"),
            report_suffix: "_report.csv".to_string(),
            totals_file: "totals.csv".to_string(),
            use_source_header: false,
            write_group_reports: true,
            top: None,
        }
    }
}

impl Default for ExclusionConfig {
    fn default() -> Self {
        Self {
            file_name: "exclusions.csv".to_string(),
            dedup_on_write: true,
            mode: SelectionMode::Prompt,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(TallyError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| TallyError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| TallyError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    /// Loads `config_path` when given, otherwise the first default config
    /// file found in `directory`, otherwise the built-in defaults.
    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>, directory: &Path) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                for default_path in &DEFAULT_CONFIG_FILES {
                    let candidate = directory.join(default_path);
                    if candidate.exists() {
                        return Self::load_from_file(candidate);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref reports_dir) = cli_args.reports_dir {
            self.output.reports_dir = reports_dir.clone();
        }

        if let Some(mode) = cli_args.mode {
            self.exclusions.mode = mode;
        }

        if let Some(normalize) = cli_args.normalize_file_names {
            self.input.normalize_file_names = normalize;
        }

        if let Some(sort_rows) = cli_args.sort_rows {
            self.input.sort_rows = sort_rows;
        }

        if let Some(dedup) = cli_args.dedup_on_write {
            self.exclusions.dedup_on_write = dedup;
        }

        if let Some(write_group_reports) = cli_args.write_group_reports {
            self.output.write_group_reports = write_group_reports;
        }

        if let Some(top) = cli_args.top {
            self.output.top = Some(top);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.input.extension.trim().is_empty() {
            return Err(TallyError::Config {
                message: "An input file extension must be specified".to_string(),
            });
        }

        if !self.input.delimiter.is_ascii() || !self.input.quote.is_ascii() {
            return Err(TallyError::Config {
                message: "Delimiter and quote characters must be ASCII".to_string(),
            });
        }

        if self.input.delimiter == self.input.quote {
            return Err(TallyError::Config {
                message: "Delimiter and quote characters must differ".to_string(),
            });
        }

        for pattern in &self.input.exclude_patterns {
            Regex::new(pattern).map_err(|e| TallyError::Config {
                message: format!("Invalid exclude pattern '{}': {}", pattern, e),
            })?;
        }

        if self.output.report_suffix.is_empty() {
            return Err(TallyError::Config {
                message: "Report suffix must not be empty".to_string(),
            });
        }

        if self.output.totals_file.is_empty() || self.exclusions.file_name.is_empty() {
            return Err(TallyError::Config {
                message: "Totals and exclusions file names must not be empty".to_string(),
            });
        }

        if self.output.totals_file == self.exclusions.file_name {
            return Err(TallyError::Config {
                message: format!(
                    "Totals file and exclusions file cannot share the name '{}'",
                    self.output.totals_file
                ),
            });
        }

        if self.output.top == Some(0) {
            return Err(TallyError::Config {
                message: "Number of displayed results must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Reports directory, resolved against the input directory when relative.
    pub fn reports_path(&self, directory: &Path) -> PathBuf {
        if self.output.reports_dir.is_absolute() {
            self.output.reports_dir.clone()
        } else {
            directory.join(&self.output.reports_dir)
        }
    }

    /// Rejects a reports directory that is the input directory itself, since
    /// the reports and the exclusions file would then be scanned as inputs.
    pub fn validate_reports_location(&self, directory: &Path) -> Result<()> {
        let reports = self.reports_path(directory);

        let same = match (reports.canonicalize(), directory.canonicalize()) {
            (Ok(reports), Ok(directory)) => reports == directory,
            _ => without_cur_dir(&reports).eq(without_cur_dir(directory)),
        };

        if same {
            return Err(TallyError::Config {
                message: format!(
                    "Reports directory {} is the input directory; choose a subdirectory",
                    reports.display()
                ),
            });
        }

        Ok(())
    }

    pub fn exclusions_path(&self, directory: &Path) -> PathBuf {
        self.reports_path(directory).join(&self.exclusions.file_name)
    }

    pub fn create_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config).unwrap_or_else(|_| String::new())
    }
}

fn without_cur_dir(path: &Path) -> impl Iterator<Item = Component<'_>> {
    path.components().filter(|c| !matches!(c, Component::CurDir))
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub reports_dir: Option<PathBuf>,
    pub mode: Option<SelectionMode>,
    pub normalize_file_names: Option<bool>,
    pub sort_rows: Option<bool>,
    pub dedup_on_write: Option<bool>,
    pub write_group_reports: Option<bool>,
    pub top: Option<usize>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reports_dir(mut self, reports_dir: Option<PathBuf>) -> Self {
        self.reports_dir = reports_dir;
        self
    }

    pub fn with_mode(mut self, mode: Option<SelectionMode>) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_normalize_file_names(mut self, normalize: Option<bool>) -> Self {
        self.normalize_file_names = normalize;
        self
    }

    pub fn with_sort_rows(mut self, sort_rows: Option<bool>) -> Self {
        self.sort_rows = sort_rows;
        self
    }

    pub fn with_dedup_on_write(mut self, dedup: Option<bool>) -> Self {
        self.dedup_on_write = dedup;
        self
    }

    pub fn with_write_group_reports(mut self, write: Option<bool>) -> Self {
        self.write_group_reports = write;
        self
    }

    pub fn with_top(mut self, top: Option<usize>) -> Self {
        self.top = top;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.input.extension, "csv");
        assert_eq!(config.input.delimiter, ' ');
        assert_eq!(config.input.quote, '|');
        assert_eq!(config.output.reports_dir, PathBuf::from("reports"));
        assert_eq!(config.exclusions.file_name, "exclusions.csv");
        assert!(config.exclusions.dedup_on_write);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.input.quote = ' ';
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.input.exclude_patterns.push("(unclosed".to_string());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.output.totals_file = "exclusions.csv".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_operations() {
        let mut config = Config::default();
        config.output.top = Some(5);
        config.exclusions.mode = SelectionMode::None;
        let temp_file = NamedTempFile::new().unwrap();

        std::fs::write(temp_file.path(), toml::to_string_pretty(&config).unwrap()).unwrap();

        let loaded_config = Config::load_from_file(temp_file.path()).unwrap();
        assert_eq!(loaded_config.output.top, Some(5));
        assert_eq!(loaded_config.exclusions.mode, SelectionMode::None);
        assert_eq!(loaded_config.input.delimiter, ' ');
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str("[exclusions]\nmode = \"all\"\n").unwrap();
        assert_eq!(config.exclusions.mode, SelectionMode::All);
        assert_eq!(config.exclusions.file_name, "exclusions.csv");
        assert!(config.input.sort_rows);
    }

    #[test]
    fn test_load_with_defaults_finds_local_file() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("csvtally.toml"),
            "[output]\ntotals_file = \"all.csv\"\n",
        )
        .unwrap();

        let config = Config::load_with_defaults(None::<&Path>, temp_dir.path()).unwrap();
        assert_eq!(config.output.totals_file, "all.csv");

        let empty_dir = TempDir::new().unwrap();
        let config = Config::load_with_defaults(None::<&Path>, empty_dir.path()).unwrap();
        assert_eq!(config.output.totals_file, "totals.csv");
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = Config::default();

        let overrides = CliOverrides::new()
            .with_mode(Some(SelectionMode::All))
            .with_sort_rows(Some(false))
            .with_top(Some(3));

        config.merge_with_cli_args(&overrides);

        assert_eq!(config.exclusions.mode, SelectionMode::All);
        assert!(!config.input.sort_rows);
        assert_eq!(config.output.top, Some(3));
        assert!(config.input.normalize_file_names);
    }

    #[test]
    fn test_reports_dir_must_differ_from_input_dir() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        assert!(config.validate_reports_location(temp_dir.path()).is_ok());

        config.output.reports_dir = PathBuf::from(".");
        assert!(matches!(
            config.validate_reports_location(temp_dir.path()),
            Err(TallyError::Config { .. })
        ));

        config.output.reports_dir = temp_dir.path().to_path_buf();
        assert!(config.validate_reports_location(temp_dir.path()).is_err());

        config.output.reports_dir = PathBuf::from("sub/..");
        std::fs::create_dir(temp_dir.path().join("sub")).unwrap();
        assert!(config.validate_reports_location(temp_dir.path()).is_err());

        let missing = temp_dir.path().join("missing");
        config.output.reports_dir = PathBuf::from(".");
        assert!(config.validate_reports_location(&missing).is_err());
    }

    #[test]
    fn test_reports_path_resolution() {
        let config = Config::default();
        let root = Path::new("/data/apps");
        assert_eq!(config.reports_path(root), PathBuf::from("/data/apps/reports"));
        assert_eq!(
            config.exclusions_path(root),
            PathBuf::from("/data/apps/reports/exclusions.csv")
        );
    }

    #[test]
    fn test_sample_config_generation() {
        let sample = Config::create_sample_config();
        assert!(sample.contains("[input]"));
        assert!(sample.contains("[output]"));
        assert!(sample.contains("[exclusions]"));
    }
}
