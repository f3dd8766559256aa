use crate::error::{Result, TallyError};
use crate::exclusions::selector::{ExclusionSelector, RemainingElements};
use crate::ingest::ElementGroups;
use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const EXCLUSIONS_HEADER: &str = "element";

/// Elements kept out of every count table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    elements: BTreeSet<String>,
}

impl ExclusionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, element: &str) -> bool {
        self.elements.contains(element)
    }

    /// Returns false when the element was already excluded.
    pub fn insert(&mut self, element: String) -> bool {
        self.elements.insert(element)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ExclusionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            elements: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Outcome of one exclusion round.
#[derive(Debug, Clone)]
pub struct ExclusionUpdate {
    /// Previously persisted exclusions merged with this run's selections.
    pub set: ExclusionSet,
    /// Elements the selector picked, in selection order.
    pub selected: Vec<String>,
    /// Rows actually appended to the exclusions file.
    pub appended: Vec<String>,
}

/// The append-only exclusions file: a header row followed by one element
/// per row.
pub struct ExclusionStore {
    path: PathBuf,
    dedup_on_write: bool,
}

impl ExclusionStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            dedup_on_write: true,
        }
    }

    pub fn with_dedup_on_write(mut self, dedup: bool) -> Self {
        self.dedup_on_write = dedup;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the file with only its header row. Returns true if the file
    /// had to be created.
    pub fn ensure_exists(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }

        let mut writer = csv::Writer::from_path(&self.path).map_err(|e| TallyError::csv(&self.path, e))?;
        writer
            .write_record([EXCLUSIONS_HEADER])
            .map_err(|e| TallyError::csv(&self.path, e))?;
        writer.flush()?;

        Ok(true)
    }

    pub fn load(&self) -> Result<ExclusionSet> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(fs::File::open(&self.path)?);

        let mut records = reader.records();
        match records.next() {
            Some(header) => {
                header.map_err(|e| TallyError::csv(&self.path, e))?;
            }
            None => return Err(TallyError::missing_header(&self.path)),
        }

        let mut set = ExclusionSet::new();
        for record in records {
            let record = record.map_err(|e| TallyError::csv(&self.path, e))?;
            set.insert(record.get(0).unwrap_or("").to_string());
        }

        Ok(set)
    }

    /// Appends `elements` as new rows and adds them to `set`. Existing rows
    /// are never rewritten. With dedup on, elements already in `set` (or
    /// repeated within `elements`) are not written again.
    pub fn append(&self, set: &mut ExclusionSet, elements: &[String]) -> Result<Vec<String>> {
        let mut to_write = Vec::new();
        for element in elements {
            let is_new = set.insert(element.clone());
            if is_new || !self.dedup_on_write {
                to_write.push(element.clone());
            }
        }

        if to_write.is_empty() {
            return Ok(to_write);
        }

        let needs_newline = fs::read(&self.path)
            .map(|bytes| !bytes.is_empty() && !bytes.ends_with(b"\n"))
            .unwrap_or(false);

        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        if needs_newline {
            file.write_all(b"\n")?;
        }

        let mut writer = csv::Writer::from_writer(file);
        for element in &to_write {
            writer
                .write_record([element])
                .map_err(|e| TallyError::csv(&self.path, e))?;
        }
        writer.flush()?;

        Ok(to_write)
    }

    /// Loads the persisted exclusions, lets `selector` choose among the
    /// remaining distinct elements, persists the choice and returns the
    /// merged set.
    pub fn update(
        &self,
        groups: &ElementGroups,
        selector: &mut dyn ExclusionSelector,
    ) -> Result<ExclusionUpdate> {
        let mut set = self.load()?;
        let remaining = RemainingElements::new(groups.distinct_elements(), &set);

        let selected = selector.select(&remaining)?;
        let appended = self.append(&mut set, &selected)?;

        Ok(ExclusionUpdate {
            set,
            selected,
            appended,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exclusions::selector::{AcceptAll, PresetSelector};
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> ExclusionStore {
        let store = ExclusionStore::new(dir.path().join("exclusions.csv"));
        store.ensure_exists().unwrap();
        store
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_ensure_exists_writes_header_once() {
        let temp_dir = TempDir::new().unwrap();
        let store = ExclusionStore::new(temp_dir.path().join("exclusions.csv"));

        assert!(store.ensure_exists().unwrap());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "element\n");

        fs::write(store.path(), "element\nkeep\n").unwrap();
        assert!(!store.ensure_exists().unwrap());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "element\nkeep\n");
    }

    #[test]
    fn test_load_skips_header() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);
        fs::write(store.path(), "element\napple\nbanana\napple\n").unwrap();

        let set = store.load().unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains("apple"));
        assert!(set.contains("banana"));
        assert!(!set.contains("element"));
    }

    #[test]
    fn test_load_rejects_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = ExclusionStore::new(temp_dir.path().join("exclusions.csv"));
        fs::write(store.path(), "").unwrap();

        assert!(matches!(store.load(), Err(TallyError::MissingHeader { .. })));
    }

    #[test]
    fn test_append_is_append_only() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);
        fs::write(store.path(), "element\nzebra\n").unwrap();
        let before = fs::read(store.path()).unwrap();

        let mut set = store.load().unwrap();
        let appended = store.append(&mut set, &strings(&["apple", "Big Corp, Inc"])).unwrap();

        assert_eq!(appended, strings(&["apple", "Big Corp, Inc"]));
        let after = fs::read(store.path()).unwrap();
        assert!(after.starts_with(&before));

        let reloaded = store.load().unwrap();
        assert!(reloaded.contains("zebra"));
        assert!(reloaded.contains("apple"));
        assert!(reloaded.contains("Big Corp, Inc"));
    }

    #[test]
    fn test_append_dedups_by_default() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);
        fs::write(store.path(), "element\napple\n").unwrap();

        let mut set = store.load().unwrap();
        let appended = store
            .append(&mut set, &strings(&["apple", "kiwi", "kiwi"]))
            .unwrap();

        assert_eq!(appended, strings(&["kiwi"]));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "element\napple\nkiwi\n");
    }

    #[test]
    fn test_append_without_dedup_keeps_duplicates() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir).with_dedup_on_write(false);
        fs::write(store.path(), "element\napple\n").unwrap();

        let mut set = store.load().unwrap();
        let appended = store.append(&mut set, &strings(&["apple", "apple"])).unwrap();

        assert_eq!(appended.len(), 2);
        assert_eq!(
            fs::read_to_string(store.path()).unwrap(),
            "element\napple\napple\napple\n"
        );
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_append_repairs_missing_trailing_newline() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);
        fs::write(store.path(), "element").unwrap();

        let mut set = store.load().unwrap();
        store.append(&mut set, &strings(&["apple"])).unwrap();

        assert_eq!(fs::read_to_string(store.path()).unwrap(), "element\napple\n");
    }

    #[test]
    fn test_no_selection_leaves_file_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);
        fs::write(store.path(), "element\nkiwi").unwrap();
        let before = fs::read(store.path()).unwrap();

        let mut set = store.load().unwrap();
        store.append(&mut set, &[]).unwrap();

        assert_eq!(fs::read(store.path()).unwrap(), before);
    }

    #[test]
    fn test_update_merges_previous_and_new() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);
        fs::write(store.path(), "element\nbanana\n").unwrap();

        let groups = ElementGroups::from_pairs(vec![
            ("fruits".to_string(), "apple".to_string()),
            ("fruits".to_string(), "banana".to_string()),
            ("fruits".to_string(), "cherry".to_string()),
        ]);

        let mut selector = PresetSelector::new(strings(&["apple"]));
        let update = store.update(&groups, &mut selector).unwrap();

        assert_eq!(update.selected, strings(&["apple"]));
        assert_eq!(update.appended, strings(&["apple"]));
        assert!(update.set.contains("apple"));
        assert!(update.set.contains("banana"));
        assert!(!update.set.contains("cherry"));
    }

    #[test]
    fn test_update_accept_all_skips_already_excluded() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);
        fs::write(store.path(), "element\nbanana\n").unwrap();

        let groups = ElementGroups::from_pairs(vec![
            ("fruits".to_string(), "banana".to_string()),
            ("fruits".to_string(), "apple".to_string()),
        ]);

        let update = store.update(&groups, &mut AcceptAll).unwrap();
        assert_eq!(update.selected, strings(&["apple"]));
        assert_eq!(update.set.len(), 2);
    }
}
