use crate::error::{Result, TallyError};
use crate::exclusions::store::ExclusionSet;
use std::collections::BTreeMap;
use std::io::{self, BufRead, StdinLock, Stdout, Write};

/// Sorted distinct elements that are not excluded yet, numbered from 1.
#[derive(Debug, Clone, Default)]
pub struct RemainingElements {
    entries: BTreeMap<usize, String>,
}

impl RemainingElements {
    /// `distinct` must already be sorted; a `BTreeSet` iterator is.
    pub fn new<'a, I>(distinct: I, excluded: &ExclusionSet) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let entries = distinct
            .into_iter()
            .filter(|element| !excluded.contains(element))
            .enumerate()
            .map(|(i, element)| (i + 1, element.to_string()))
            .collect();

        Self { entries }
    }

    pub fn get(&self, key: usize) -> Result<&str> {
        self.entries
            .get(&key)
            .map(String::as_str)
            .ok_or(TallyError::InvalidSelection {
                key,
                max: self.entries.len(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.entries.iter().map(|(key, element)| (*key, element.as_str()))
    }

    pub fn elements(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(String::as_str)
    }

    pub fn contains(&self, element: &str) -> bool {
        self.entries.values().any(|e| e == element)
    }

    pub fn menu_lines(&self) -> Vec<String> {
        self.iter()
            .map(|(key, element)| format!("{}. {}", key, element))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Chooses which remaining elements become new exclusions.
pub trait ExclusionSelector {
    fn select(&mut self, remaining: &RemainingElements) -> Result<Vec<String>>;
}

/// Numbered menu on a terminal. A blank line (or end of input) finishes
/// the selection; a number outside the menu is an error.
pub struct PromptSelector<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptSelector<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl PromptSelector<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ExclusionSelector for PromptSelector<R, W> {
    fn select(&mut self, remaining: &RemainingElements) -> Result<Vec<String>> {
        let mut selected = Vec::new();

        if remaining.is_empty() {
            writeln!(self.output, "Nothing left to exclude.")?;
            return Ok(selected);
        }

        writeln!(
            self.output,
            "Enter the number of an element to exclude it, or a blank line to continue:"
        )?;
        for line in remaining.menu_lines() {
            writeln!(self.output, "{}", line)?;
        }

        loop {
            write!(self.output, "> ")?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                break;
            }

            let answer = line.trim();
            if answer.is_empty() {
                break;
            }

            match answer.parse::<usize>() {
                Ok(key) => {
                    let element = remaining.get(key)?;
                    writeln!(self.output, "Excluding {}", element)?;
                    selected.push(element.to_string());
                }
                Err(_) => writeln!(self.output, "'{}' is not a whole number.", answer)?,
            }
        }

        Ok(selected)
    }
}

/// Selects the given element names that are still on the menu.
#[derive(Debug, Clone, Default)]
pub struct PresetSelector {
    elements: Vec<String>,
}

impl PresetSelector {
    pub fn new(elements: Vec<String>) -> Self {
        Self { elements }
    }
}

impl ExclusionSelector for PresetSelector {
    fn select(&mut self, remaining: &RemainingElements) -> Result<Vec<String>> {
        Ok(self
            .elements
            .iter()
            .filter(|element| remaining.contains(element))
            .cloned()
            .collect())
    }
}

pub struct AcceptAll;

impl ExclusionSelector for AcceptAll {
    fn select(&mut self, remaining: &RemainingElements) -> Result<Vec<String>> {
        Ok(remaining.elements().map(str::to_string).collect())
    }
}

pub struct AcceptNone;

impl ExclusionSelector for AcceptNone {
    fn select(&mut self, _remaining: &RemainingElements) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn remaining(elements: &[&str], excluded: &[&str]) -> RemainingElements {
        let excluded: ExclusionSet = excluded.iter().copied().collect();
        let mut sorted: Vec<&str> = elements.to_vec();
        sorted.sort();
        RemainingElements::new(sorted, &excluded)
    }

    fn prompt(input: &str, remaining: &RemainingElements) -> (Result<Vec<String>>, String) {
        let mut output = Vec::new();
        let result = PromptSelector::new(Cursor::new(input.as_bytes()), &mut output).select(remaining);
        (result, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_remaining_elements_numbering() {
        let remaining = remaining(&["cherry", "apple", "banana"], &["banana"]);

        assert_eq!(remaining.len(), 2);
        assert_eq!(remaining.get(1).unwrap(), "apple");
        assert_eq!(remaining.get(2).unwrap(), "cherry");
        assert_eq!(remaining.menu_lines(), vec!["1. apple", "2. cherry"]);
    }

    #[test]
    fn test_remaining_get_out_of_range() {
        let remaining = remaining(&["apple"], &[]);

        assert!(matches!(
            remaining.get(0),
            Err(TallyError::InvalidSelection { key: 0, max: 1 })
        ));
        assert!(matches!(
            remaining.get(2),
            Err(TallyError::InvalidSelection { key: 2, max: 1 })
        ));
    }

    #[test]
    fn test_prompt_selects_until_blank_line() {
        let remaining = remaining(&["apple", "banana", "cherry"], &[]);
        let (result, output) = prompt("3\n1\n3\n\n2\n", &remaining);

        assert_eq!(result.unwrap(), vec!["cherry", "apple", "cherry"]);
        assert!(output.contains("1. apple"));
        assert!(output.contains("3. cherry"));
        assert!(output.contains("> "));
    }

    #[test]
    fn test_prompt_stops_at_end_of_input() {
        let remaining = remaining(&["apple"], &[]);
        let (result, _) = prompt("1\n", &remaining);
        assert_eq!(result.unwrap(), vec!["apple"]);
    }

    #[test]
    fn test_prompt_reasks_on_non_numbers() {
        let remaining = remaining(&["apple", "banana"], &[]);
        let (result, output) = prompt("two\n2\n\n", &remaining);

        assert_eq!(result.unwrap(), vec!["banana"]);
        assert!(output.contains("'two' is not a whole number."));
    }

    #[test]
    fn test_prompt_fails_on_out_of_range_key() {
        let remaining = remaining(&["apple", "banana"], &[]);
        let (result, _) = prompt("1\n9\n", &remaining);

        assert!(matches!(
            result,
            Err(TallyError::InvalidSelection { key: 9, max: 2 })
        ));
    }

    #[test]
    fn test_prompt_with_nothing_remaining() {
        let remaining = remaining(&["apple"], &["apple"]);
        let (result, output) = prompt("1\n", &remaining);

        assert!(result.unwrap().is_empty());
        assert!(output.contains("Nothing left to exclude."));
    }

    #[test]
    fn test_non_interactive_selectors() {
        let remaining = remaining(&["apple", "banana", "cherry"], &["banana"]);

        let mut preset = PresetSelector::new(vec![
            "cherry".to_string(),
            "banana".to_string(),
            "durian".to_string(),
        ]);
        assert_eq!(preset.select(&remaining).unwrap(), vec!["cherry"]);
        assert_eq!(AcceptAll.select(&remaining).unwrap(), vec!["apple", "cherry"]);
        assert!(AcceptNone.select(&remaining).unwrap().is_empty());
    }
}
