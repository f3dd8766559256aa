use clap::Parser;
use csv_tally::{Cli, OutputFormatter, OutputMode, Tally, TallyError, UserFriendlyError};
use std::process;

fn main() {
    let exit_code = run();
    process::exit(exit_code);
}

fn run() -> i32 {
    let cli = Cli::parse();

    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    let tally = match Tally::from_cli(&cli) {
        Ok(tally) => tally,
        Err(e) => {
            print_startup_error(&e);
            return exit_code(&e);
        }
    };

    if cli.dry_run {
        return handle_dry_run(&tally);
    }

    let mut selector = tally.selector(cli.preset_exclusions());

    match tally.run(selector.as_mut()) {
        Ok(report) => {
            tally.output_formatter().print_run_report(&report);
            0
        }
        Err(e) => {
            tally.handle_error(&e);
            exit_code(&e)
        }
    }
}

fn exit_code(error: &TallyError) -> i32 {
    match error {
        TallyError::Cancelled => 130, // Interrupted (SIGINT)
        TallyError::InvalidSelection { .. } => 2,
        TallyError::NoInputFiles { .. } => 3,
        TallyError::Csv { .. } | TallyError::MissingHeader { .. } | TallyError::MalformedReport { .. } => 4,
        TallyError::RenameCollision { .. } => 5,
        TallyError::Config { .. } => 6,
        _ => 1,
    }
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.directory.join("csvtally.toml"));

    match Tally::generate_sample_config(&config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path.display());
            println!("\nTo use this configuration:");
            println!("  csvtally <directory> --config {}", config_path.display());
            println!("\nA csvtally.toml inside the directory is picked up automatically.");
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            exit_code(&e)
        }
    }
}

fn handle_dry_run(tally: &Tally) -> i32 {
    let formatter = tally.output_formatter();

    formatter.info("DRY RUN MODE - No files will be renamed or written");
    formatter.print_separator();

    let config = tally.config();
    formatter.info("Configuration that would be used:");
    println!("  Directory: {}", tally.directory().display());
    println!("  Extension: {}", config.input.extension);
    println!("  Normalize file names: {}", config.input.normalize_file_names);
    println!("  Sort rows: {}", config.input.sort_rows);
    println!("  Exclusion mode: {:?}", config.exclusions.mode);
    println!("  Deduplicate exclusions: {}", config.exclusions.dedup_on_write);
    println!("  Group reports: {}", config.output.write_group_reports);

    formatter.print_separator();

    let plan = match tally.plan() {
        Ok(plan) => plan,
        Err(e) => {
            tally.handle_error(&e);
            return exit_code(&e);
        }
    };

    if plan.renames.is_empty() {
        formatter.info("No files need renaming");
    } else {
        formatter.info("Files that would be renamed:");
        for rename in &plan.renames {
            println!("  {}", rename.display_summary());
        }
    }

    formatter.info("Files that would be counted:");
    for file in &plan.files {
        println!("  {} (group {})", file.file_name, file.group);
    }
    println!("  Reports directory: {}", plan.reports_dir.display());

    formatter.print_separator();
    formatter.success("Dry run completed successfully");
    formatter.info("Run without --dry-run to count and write reports");

    0
}

fn print_startup_error(error: &TallyError) {
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}
