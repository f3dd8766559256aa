use crate::exclusions::ExclusionSet;
use crate::ingest::ElementGroups;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Element frequencies ordered by descending count. Equal counts keep the
/// order in which the elements were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountTable {
    entries: Vec<(String, usize)>,
}

impl CountTable {
    /// Builds a table from already counted pairs, re-establishing the
    /// descending-count order.
    pub fn from_entries(mut entries: Vec<(String, usize)>) -> Self {
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        Self { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(element, count)| (element.as_str(), *count))
    }

    pub fn get(&self, element: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|(e, _)| e == element)
            .map(|(_, count)| *count)
    }

    /// At most `limit` leading entries; all of them when `limit` is `None`.
    pub fn top(&self, limit: Option<usize>) -> &[(String, usize)] {
        let end = limit.unwrap_or(self.entries.len()).min(self.entries.len());
        &self.entries[..end]
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupCounts {
    pub group: String,
    pub table: CountTable,
}

pub fn count_elements<'a, I>(elements: I, exclusions: &ExclusionSet) -> CountTable
where
    I: IntoIterator<Item = &'a str>,
{
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut entries: Vec<(String, usize)> = Vec::new();

    for element in elements {
        if exclusions.contains(element) {
            continue;
        }

        match slots.get(element) {
            Some(&slot) => entries[slot].1 += 1,
            None => {
                slots.insert(element, entries.len());
                entries.push((element.to_string(), 1));
            }
        }
    }

    // stable, so ties stay in discovery order
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    CountTable { entries }
}

/// One table per group, in group order.
pub fn count_groups(groups: &ElementGroups, exclusions: &ExclusionSet) -> Vec<GroupCounts> {
    groups
        .iter()
        .map(|group| GroupCounts {
            group: group.name.clone(),
            table: count_elements(group.elements.iter().map(String::as_str), exclusions),
        })
        .collect()
}

pub fn count_totals(groups: &ElementGroups, exclusions: &ExclusionSet) -> CountTable {
    count_elements(groups.all_elements(), exclusions)
}
