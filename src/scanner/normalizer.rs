use crate::error::{Result, TallyError};
use crate::scanner::file_filter::is_hidden;
use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Spaces become underscores, then the whole name is lowercased.
pub fn normalize_file_name(name: &str) -> String {
    name.replace(' ', "_").to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub from: PathBuf,
    pub to: PathBuf,
}

impl Rename {
    pub fn display_summary(&self) -> String {
        format!(
            "{} -> {}",
            file_name_lossy(&self.from),
            file_name_lossy(&self.to)
        )
    }
}

pub struct FileNameNormalizer {
    root: PathBuf,
}

impl FileNameNormalizer {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Computes the renames needed for every non-hidden file in the root
    /// directory. Nothing is touched on disk.
    pub fn plan(&self) -> Result<Vec<Rename>> {
        let mut existing: HashSet<OsString> = HashSet::new();
        let mut candidates = Vec::new();

        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1) {
            let entry = entry?;
            let name = entry.file_name().to_os_string();

            // names that are not UTF-8 are left alone
            if let Some(utf8) = name.to_str() {
                if entry.file_type().is_file() && !is_hidden(utf8) {
                    candidates.push(utf8.to_string());
                }
            }

            existing.insert(name);
        }

        candidates.sort();

        let mut planned_targets = HashSet::new();
        let mut renames = Vec::new();

        for name in candidates {
            let target = normalize_file_name(&name);
            if target == name {
                continue;
            }

            // Exact listing names, so a case-only rename on a
            // case-insensitive filesystem is not a collision.
            if existing.contains(OsStr::new(&target)) || !planned_targets.insert(target.clone()) {
                return Err(TallyError::RenameCollision {
                    from: name,
                    to: target,
                });
            }

            renames.push(Rename {
                from: self.root.join(&name),
                to: self.root.join(&target),
            });
        }

        Ok(renames)
    }

    pub fn apply(&self, renames: &[Rename]) -> Result<()> {
        for rename in renames {
            fs::rename(&rename.from, &rename.to)?;
        }
        Ok(())
    }

    pub fn normalize(&self) -> Result<Vec<Rename>> {
        let renames = self.plan()?;
        self.apply(&renames)?;
        Ok(renames)
    }
}

fn file_name_lossy(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
