use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TallyError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse CSV file {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("CSV file has no header row: {path}")]
    MissingHeader { path: String },

    #[error("Malformed report {path}: {message}")]
    MalformedReport { path: String, message: String },

    #[error("Selection {key} is out of range (1-{max})")]
    InvalidSelection { key: usize, max: usize },

    #[error("Cannot rename {from} to {to}: target already exists")]
    RenameCollision { from: String, to: String },

    #[error("No input files found in {directory}")]
    NoInputFiles { directory: String, extension: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Path validation failed: {path}")]
    InvalidPath { path: String },

    #[error("Operation was cancelled by user")]
    Cancelled,
}

impl TallyError {
    pub fn csv<P: AsRef<Path>>(path: P, source: csv::Error) -> Self {
        TallyError::Csv {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub fn missing_header<P: AsRef<Path>>(path: P) -> Self {
        TallyError::MissingHeader {
            path: path.as_ref().display().to_string(),
        }
    }
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for TallyError {
    fn user_message(&self) -> String {
        match self {
            TallyError::Csv { path, source } => {
                if source.is_io_error() {
                    format!("Could not read {}: {}", path, source)
                } else {
                    format!("Could not parse {}: {}", path, source)
                }
            }
            TallyError::MissingHeader { path } => {
                format!("Missing header row in {}", path)
            }
            TallyError::InvalidSelection { key, max } => {
                if *max == 0 {
                    format!("Selection {} is invalid: there is nothing left to exclude", key)
                } else {
                    format!("Selection {} is invalid: choose a number between 1 and {}", key, max)
                }
            }
            TallyError::RenameCollision { from, to } => {
                format!("Cannot rename '{}' to '{}': a file with that name already exists", from, to)
            }
            TallyError::NoInputFiles { directory, extension } => {
                format!("No .{} files found in {}", extension, directory)
            }
            TallyError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            TallyError::InvalidPath { path } => {
                format!("Invalid path: {}", path)
            }
            TallyError::Cancelled => "Operation was cancelled by user".to_string(),
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            TallyError::MissingHeader { .. } => Some(
                "Every input file and the exclusions file must start with a header row (e.g. 'element').".to_string()
            ),
            TallyError::InvalidSelection { .. } => Some(
                "Enter one of the numbers shown in the list, or an empty line to finish.".to_string()
            ),
            TallyError::RenameCollision { .. } => Some(
                "Rename or remove one of the conflicting files, or run with --no-normalize.".to_string()
            ),
            TallyError::NoInputFiles { .. } => Some(
                "Run csvtally from the directory holding your CSV files, or pass that directory as an argument.".to_string()
            ),
            TallyError::Config { .. } => Some(
                "Check your configuration file syntax and ensure all values are valid.".to_string()
            ),
            TallyError::Csv { .. } => Some(
                "Input files must contain a single column with one value per line.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for TallyError {
    fn from(error: toml::de::Error) -> Self {
        TallyError::Config {
            message: error.to_string(),
        }
    }
}

impl From<walkdir::Error> for TallyError {
    fn from(error: walkdir::Error) -> Self {
        let path = error
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        match error.into_io_error() {
            Some(io) => TallyError::Io(io),
            None => TallyError::InvalidPath {
                path: format!("filesystem loop detected at {}", path),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, TallyError>;
