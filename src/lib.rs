pub mod cli;
pub mod config;
pub mod counter;
pub mod error;
pub mod exclusions;
pub mod ingest;
pub mod report;
pub mod scanner;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, OutputFormat};
pub use config::{CliOverrides, Config, ExclusionConfig, InputConfig, OutputConfig, SelectionMode};
pub use error::{Result, TallyError, UserFriendlyError};

// Core functionality re-exports
pub use counter::{count_elements, count_groups, count_totals, CountTable, GroupCounts};
pub use exclusions::{
    AcceptAll, AcceptNone, ExclusionSelector, ExclusionSet, ExclusionStore, ExclusionUpdate,
    PresetSelector, PromptSelector, RemainingElements,
};
pub use ingest::{read_source_column, ElementGroups, SourceColumn};
pub use report::{read_count_table, GroupSummary, ReportWriter, RunReport};
pub use scanner::{FileNameNormalizer, InputFile, InputScanner, Rename};
pub use ui::{GracefulShutdown, OutputFormatter, OutputMode, ProgressManager};

use chrono::Utc;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Intermediate results handed from one pipeline stage to the next.
#[derive(Debug, Default)]
pub struct PipelineState {
    pub renamed: Vec<Rename>,
    pub files: Vec<InputFile>,
    pub headers: HashMap<String, String>,
    pub groups: ElementGroups,
    pub exclusions: ExclusionSet,
    pub exclusions_added: Vec<String>,
    pub group_counts: Vec<GroupCounts>,
    pub totals: CountTable,
}

/// What a run would do, without touching the filesystem.
#[derive(Debug, Clone)]
pub struct DryRunPlan {
    pub renames: Vec<Rename>,
    pub files: Vec<InputFile>,
    pub reports_dir: PathBuf,
}

/// Main library interface: runs the count pipeline over one directory.
pub struct Tally {
    config: Config,
    directory: PathBuf,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    shutdown: GracefulShutdown,
}

impl Tally {
    pub fn new<P: Into<PathBuf>>(
        config: Config,
        directory: P,
        output_mode: OutputMode,
        verbose: u8,
        quiet: bool,
    ) -> Result<Self> {
        let shutdown = GracefulShutdown::new()?;
        Ok(Self::with_shutdown(config, directory, output_mode, verbose, quiet, shutdown))
    }

    /// Like [`Tally::new`] but with a caller-supplied shutdown flag, so no
    /// signal handler is installed.
    fn with_shutdown<P: Into<PathBuf>>(
        config: Config,
        directory: P,
        output_mode: OutputMode,
        verbose: u8,
        quiet: bool,
        shutdown: GracefulShutdown,
    ) -> Self {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(!quiet && output_mode == OutputMode::Human);

        Self {
            config,
            directory: directory.into(),
            output_formatter,
            progress_manager,
            shutdown,
        }
    }

    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let output_mode = match cli_args.output_format {
            crate::cli::OutputFormat::Human => OutputMode::Human,
            crate::cli::OutputFormat::Json => OutputMode::Json,
            crate::cli::OutputFormat::Plain => OutputMode::Plain,
        };

        Self::new(
            config,
            cli_args.directory.clone(),
            output_mode,
            cli_args.verbosity_level(),
            cli_args.quiet,
        )
    }

    /// Picks the selector for this run: preset elements win over the
    /// configured mode.
    pub fn selector(&self, preset: Option<Vec<String>>) -> Box<dyn ExclusionSelector> {
        if let Some(elements) = preset {
            return Box::new(PresetSelector::new(elements));
        }

        match self.config.exclusions.mode {
            SelectionMode::Prompt => match self.output_formatter.mode() {
                // keep stdout parseable
                OutputMode::Json => Box::new(PromptSelector::new(io::stdin().lock(), io::stderr())),
                _ => Box::new(PromptSelector::stdio()),
            },
            SelectionMode::All => Box::new(AcceptAll),
            SelectionMode::None => Box::new(AcceptNone),
        }
    }

    /// Runs every stage and returns the run summary.
    pub fn run(&self, selector: &mut dyn ExclusionSelector) -> Result<RunReport> {
        let start_time = Instant::now();
        let mut state = PipelineState::default();

        self.shutdown.check_shutdown()?;
        self.output_formatter.start_operation("Preparing working directory");
        let (writer, store) = self.prepare(&mut state)?;
        self.shutdown.check_shutdown()?;

        self.scan(&mut state)?;
        self.shutdown.check_shutdown()?;

        self.ingest(&mut state)?;
        self.shutdown.check_shutdown()?;

        self.update_exclusions(&mut state, &store, selector)?;
        self.shutdown.check_shutdown()?;

        self.count(&mut state);
        let groups = self.write_reports(&state, &writer)?;
        self.print_tables(&state);

        let totals = GroupSummary::new(
            "totals",
            Some(writer.totals_path().display().to_string()),
            &state.totals,
        );

        let report = RunReport {
            directory: self.directory.display().to_string(),
            reports_dir: writer.reports_dir().display().to_string(),
            generated_at: Utc::now(),
            duration: start_time.elapsed(),
            files_processed: state.files.len(),
            elements_read: state.groups.total_elements(),
            renamed_files: state.renamed.iter().map(Rename::display_summary).collect(),
            exclusions_added: state.exclusions_added.clone(),
            exclusions_total: state.exclusions.len(),
            groups,
            totals,
        };

        self.output_formatter.debug(&report.display_summary());

        Ok(report)
    }

    fn prepare(&self, state: &mut PipelineState) -> Result<(ReportWriter, ExclusionStore)> {
        self.config.validate_reports_location(&self.directory)?;

        let writer = ReportWriter::new(self.reports_path(), &self.config.output);
        if writer.initialize()? {
            self.output_formatter.success(&format!(
                "Created reports directory: {}",
                writer.reports_dir().display()
            ));
        } else {
            self.output_formatter
                .info(&format!("Reports directory exists: {}", writer.reports_dir().display()));
        }

        let store = ExclusionStore::new(self.config.exclusions_path(&self.directory))
            .with_dedup_on_write(self.config.exclusions.dedup_on_write);
        if store.ensure_exists()? {
            self.output_formatter
                .info(&format!("Created exclusions file: {}", store.path().display()));
        }

        if self.config.input.normalize_file_names {
            state.renamed = FileNameNormalizer::new(&self.directory).normalize()?;
            for rename in &state.renamed {
                self.output_formatter.info(&format!("Renamed {}", rename.display_summary()));
            }
        }

        Ok((writer, store))
    }

    fn scan(&self, state: &mut PipelineState) -> Result<()> {
        self.output_formatter.start_operation("Scanning for input files");

        let scanner = InputScanner::new(&self.config.input);
        state.files = scanner.scan_directory(&self.directory)?;

        self.output_formatter
            .info(&format!("Found {} input files", state.files.len()));
        for file in &state.files {
            self.output_formatter.debug(&format!("{} ({} bytes)", file.file_name, file.size));
        }

        Ok(())
    }

    fn ingest(&self, state: &mut PipelineState) -> Result<()> {
        self.output_formatter.start_operation("Reading input files");

        let started = Instant::now();
        let file_progress = self.progress_manager.create_file_progress(state.files.len() as u64);
        let mut pairs = Vec::new();

        for (index, file) in state.files.iter().enumerate() {
            self.shutdown.check_shutdown()?;
            ui::progress::update_file_progress(&file_progress, index, &file.file_name);

            let column = read_source_column(&file.path, &self.config.input)?;
            if column.elements.is_empty() {
                self.progress_manager.suspend(|| {
                    self.output_formatter
                        .warning(&format!("{} has a header row but no elements", file.file_name))
                });
            }
            state.groups.ensure_group(&column.group);
            state.headers.insert(column.group.clone(), column.header.clone());
            pairs.extend(column.pairs());
        }

        for (group, element) in pairs {
            state.groups.push(group, element);
        }

        ui::progress::finish_progress_with_summary(
            &file_progress,
            &format!("Read {} files", state.files.len()),
            started.elapsed(),
        );
        self.progress_manager.clear();

        Ok(())
    }

    fn update_exclusions(
        &self,
        state: &mut PipelineState,
        store: &ExclusionStore,
        selector: &mut dyn ExclusionSelector,
    ) -> Result<()> {
        self.output_formatter.start_operation("Updating exclusions");

        let update = self
            .progress_manager
            .suspend(|| store.update(&state.groups, selector))?;

        if !update.appended.is_empty() {
            self.output_formatter.success(&format!(
                "Added {} exclusions to {}",
                update.appended.len(),
                store.path().display()
            ));
        }

        state.exclusions = update.set;
        state.exclusions_added = update.selected;

        Ok(())
    }

    fn count(&self, state: &mut PipelineState) {
        state.group_counts = count_groups(&state.groups, &state.exclusions);
        state.totals = count_totals(&state.groups, &state.exclusions);
    }

    fn write_reports(&self, state: &PipelineState, writer: &ReportWriter) -> Result<Vec<GroupSummary>> {
        self.output_formatter.start_operation("Writing reports");

        let mut summaries = Vec::with_capacity(state.group_counts.len());

        for counts in &state.group_counts {
            let report_path = if self.config.output.write_group_reports {
                let header = state.headers.get(&counts.group).map(String::as_str);
                let path = writer.write_group_report(&counts.group, header, &counts.table)?;
                self.output_formatter
                    .success(&format!("\"{}\" exported successfully", file_name(&path)));
                Some(path.display().to_string())
            } else {
                None
            };

            summaries.push(GroupSummary::new(&counts.group, report_path, &counts.table));
        }

        let totals_path = writer.write_totals(&state.totals)?;
        self.output_formatter
            .success(&format!("\"{}\" exported successfully", file_name(&totals_path)));

        Ok(summaries)
    }

    fn print_tables(&self, state: &PipelineState) {
        let limit = self.config.output.top;

        for counts in &state.group_counts {
            let header = state
                .headers
                .get(&counts.group)
                .map(String::as_str)
                .unwrap_or(report::report_writer::ELEMENT_COLUMN);
            self.output_formatter
                .print_count_table(&counts.group, header, &counts.table, limit);
        }

        self.output_formatter.print_count_table(
            "totals",
            report::report_writer::ELEMENT_COLUMN,
            &state.totals,
            limit,
        );
    }

    /// Lists planned renames and the files that would be read.
    pub fn plan(&self) -> Result<DryRunPlan> {
        self.config.validate_reports_location(&self.directory)?;

        let renames = if self.config.input.normalize_file_names {
            FileNameNormalizer::new(&self.directory).plan()?
        } else {
            Vec::new()
        };

        let scanner = InputScanner::new(&self.config.input);
        let mut files = scanner.scan_directory(&self.directory)?;

        // show the names the files will have once renamed
        for file in &mut files {
            if let Some(rename) = renames.iter().find(|r| r.from == file.path) {
                *file = InputFile::new(rename.to.clone(), file.size);
            }
        }

        Ok(DryRunPlan {
            renames,
            files,
            reports_dir: self.reports_path(),
        })
    }

    pub fn reports_path(&self) -> PathBuf {
        self.config.reports_path(&self.directory)
    }

    /// Generate sample configuration file
    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        std::fs::write(output_path.as_ref(), sample_config).map_err(TallyError::Io)?;
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    pub fn handle_error(&self, error: &TallyError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
