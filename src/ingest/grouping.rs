use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub name: String,
    pub elements: Vec<String>,
}

/// Elements partitioned by originating file. Groups keep first-seen order
/// and elements keep insertion order within their group.
#[derive(Debug, Clone, Default)]
pub struct ElementGroups {
    groups: Vec<Group>,
    index: HashMap<String, usize>,
}

impl ElementGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut groups = Self::new();
        for (group, element) in pairs {
            groups.push(group, element);
        }
        groups
    }

    pub fn push(&mut self, group: String, element: String) {
        let slot = match self.index.get(&group) {
            Some(&slot) => slot,
            None => self.insert_group(group),
        };
        self.groups[slot].elements.push(element);
    }

    /// Registers a group even when it ends up with no elements, so header-only
    /// files still get a report.
    pub fn ensure_group(&mut self, group: &str) {
        if !self.index.contains_key(group) {
            self.insert_group(group.to_string());
        }
    }

    fn insert_group(&mut self, name: String) -> usize {
        let slot = self.groups.len();
        self.index.insert(name.clone(), slot);
        self.groups.push(Group {
            name,
            elements: Vec::new(),
        });
        slot
    }

    pub fn get(&self, name: &str) -> Option<&Group> {
        self.index.get(name).map(|&slot| &self.groups[slot])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter()
    }

    /// Every element of every group, groups in first-seen order.
    pub fn all_elements(&self) -> impl Iterator<Item = &str> {
        self.groups
            .iter()
            .flat_map(|group| group.elements.iter().map(String::as_str))
    }

    pub fn distinct_elements(&self) -> BTreeSet<&str> {
        self.all_elements().collect()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn total_elements(&self) -> usize {
        self.groups.iter().map(|g| g.elements.len()).sum()
    }
}
