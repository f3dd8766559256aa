use crate::config::{CliOverrides, Config, SelectionMode};
use crate::error::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "csvtally")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Count elements across single-column CSV files")]
#[command(
    long_about = "csvtally reads every single-column CSV file in a directory, counts how often \
                  each value occurs per file and in total, and writes the counts to CSV reports. \
                  Values can be excluded interactively; exclusions are remembered between runs."
)]
#[command(after_help = "EXAMPLES:\n  \
    csvtally\n  \
    csvtally ~/exports --top 10\n  \
    csvtally --mode none --output-format json\n  \
    csvtally --exclude-element \"Microsoft Edge,Google Chrome\"\n  \
    csvtally --generate-config")]
pub struct Cli {
    /// Directory holding the CSV files
    #[arg(default_value = ".")]
    pub directory: PathBuf,

    /// Reports directory (relative paths resolve against DIRECTORY)
    #[arg(short, long)]
    pub reports_dir: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// How new exclusions are chosen
    #[arg(short, long, value_enum)]
    pub mode: Option<SelectionMode>,

    /// Exclude these elements without prompting (comma-separated)
    #[arg(short = 'x', long, value_delimiter = ',')]
    pub exclude_element: Option<Vec<String>>,

    /// Keep input file names as they are
    #[arg(long, help = "Do not rename input files (spaces to underscores, lowercase)")]
    pub no_normalize: bool,

    /// Keep rows in file order instead of sorting them
    #[arg(long)]
    pub no_sort: bool,

    /// Append exclusions even if they are already in the exclusions file
    #[arg(long)]
    pub no_dedup: bool,

    /// Only write the totals report
    #[arg(long)]
    pub totals_only: bool,

    /// Number of results to display per table
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    pub top: Option<u64>,

    /// Verbose output level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Dry run (show what would be done without executing)
    #[arg(long, help = "Show what would be renamed and counted without writing anything")]
    pub dry_run: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref(), &self.directory)?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        let flag = |set: bool| if set { Some(false) } else { None };

        CliOverrides::new()
            .with_reports_dir(self.reports_dir.clone())
            .with_mode(self.mode)
            .with_normalize_file_names(flag(self.no_normalize))
            .with_sort_rows(flag(self.no_sort))
            .with_dedup_on_write(flag(self.no_dedup))
            .with_write_group_reports(flag(self.totals_only))
            .with_top(self.top.map(|top| top as usize))
    }

    /// Elements given with `--exclude-element`, trimmed, empties dropped.
    pub fn preset_exclusions(&self) -> Option<Vec<String>> {
        self.exclude_element.as_ref().map(|elements| {
            elements
                .iter()
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty())
                .collect()
        })
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["csvtally"]);

        assert_eq!(cli.directory, PathBuf::from("."));
        assert!(cli.mode.is_none());
        assert!(!cli.dry_run);
        assert!(matches!(cli.output_format, OutputFormat::Human));
    }

    #[test]
    fn test_parse_full_command_line() {
        let cli = Cli::parse_from([
            "csvtally",
            "data",
            "--mode",
            "none",
            "--exclude-element",
            "apple, banana,",
            "--no-sort",
            "--totals-only",
            "--top",
            "5",
            "-vv",
        ]);

        assert_eq!(cli.directory, PathBuf::from("data"));
        assert_eq!(cli.mode, Some(SelectionMode::None));
        assert_eq!(
            cli.preset_exclusions(),
            Some(vec!["apple".to_string(), "banana".to_string()])
        );
        assert!(cli.no_sort);
        assert_eq!(cli.top, Some(5));
        assert_eq!(cli.verbosity_level(), 2);
    }

    #[test]
    fn test_top_must_be_positive() {
        assert!(Cli::try_parse_from(["csvtally", "--top", "0"]).is_err());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["csvtally", "-q", "-v"]).is_err());
    }

    #[test]
    fn test_load_config_applies_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let directory = temp_dir.path().to_str().unwrap();
        let cli = Cli::parse_from([
            "csvtally",
            directory,
            "--no-normalize",
            "--no-dedup",
            "--mode",
            "all",
            "--reports-dir",
            "out",
        ]);

        let config = cli.load_config().unwrap();

        assert!(!config.input.normalize_file_names);
        assert!(!config.exclusions.dedup_on_write);
        assert!(config.input.sort_rows);
        assert_eq!(config.exclusions.mode, SelectionMode::All);
        assert_eq!(config.reports_path(temp_dir.path()), temp_dir.path().join("out"));
    }
}
