use crate::config::InputConfig;
use regex::Regex;
use std::path::Path;

pub struct FileFilter {
    extension: String,
    exclude_patterns: Vec<Regex>,
}

impl FileFilter {
    pub fn new(config: &InputConfig) -> Self {
        let exclude_patterns = config
            .exclude_patterns
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect();

        Self {
            extension: config.extension.trim_start_matches('.').to_lowercase(),
            exclude_patterns,
        }
    }

    pub fn is_input_file(&self, path: &Path) -> bool {
        let Some(filename) = path.file_name().and_then(|s| s.to_str()) else {
            return false;
        };

        if is_hidden(filename) {
            return false;
        }

        let extension_matches = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.to_lowercase() == self.extension);

        extension_matches && !self.matches_any_pattern(filename)
    }

    pub fn matches_any_pattern(&self, text: &str) -> bool {
        self.exclude_patterns
            .iter()
            .any(|pattern| pattern.is_match(text))
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }
}

pub fn is_hidden(filename: &str) -> bool {
    filename.starts_with('.')
}
