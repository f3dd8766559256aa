use crate::config::InputConfig;
use crate::error::{Result, TallyError};
use crate::scanner::file_filter::FileFilter;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A CSV file in the working directory, with the group it feeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub path: PathBuf,
    pub file_name: String,
    pub group: String,
    pub size: u64,
}

impl InputFile {
    pub fn new(path: PathBuf, size: u64) -> Self {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_string();

        Self {
            group: group_name(&path),
            path,
            file_name,
            size,
        }
    }
}

/// Group name for a source file: its file name minus the extension.
pub fn group_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub struct InputScanner {
    filter: FileFilter,
}

impl InputScanner {
    pub fn new(config: &InputConfig) -> Self {
        Self {
            filter: FileFilter::new(config),
        }
    }

    /// Lists input files directly inside `root`, sorted by file name.
    pub fn scan_directory<P: AsRef<Path>>(&self, root: P) -> Result<Vec<InputFile>> {
        let root_path = root.as_ref();

        if !root_path.is_dir() {
            return Err(TallyError::InvalidPath {
                path: format!("{} is not a directory", root_path.display()),
            });
        }

        let mut files = Vec::new();

        for entry in WalkDir::new(root_path).min_depth(1).max_depth(1) {
            let entry = entry?;

            if !entry.file_type().is_file() || !self.filter.is_input_file(entry.path()) {
                continue;
            }

            let metadata = entry.metadata()?;
            files.push(InputFile::new(entry.path().to_path_buf(), metadata.len()));
        }

        if files.is_empty() {
            return Err(TallyError::NoInputFiles {
                directory: root_path.display().to_string(),
                extension: self.filter.extension().to_string(),
            });
        }

        files.sort_by(|a, b| a.file_name.cmp(&b.file_name));

        Ok(files)
    }
}
