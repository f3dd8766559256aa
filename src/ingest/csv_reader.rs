use crate::config::InputConfig;
use crate::error::{Result, TallyError};
use crate::scanner::input_scanner::group_name;
use std::fs;
use std::path::Path;

/// The single data column of one input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceColumn {
    pub group: String,
    pub header: String,
    pub elements: Vec<String>,
}

impl SourceColumn {
    /// `(group, element)` pairs in row order.
    pub fn pairs(&self) -> impl Iterator<Item = (String, String)> + '_ {
        self.elements
            .iter()
            .map(move |element| (self.group.clone(), element.clone()))
    }
}

/// Reads a one-column CSV file. The first row is the header and is kept
/// apart from the elements. Fields split on the configured delimiter are
/// joined back with single spaces. Blank lines are rows with no fields, so
/// they become the empty element.
pub fn read_source_column<P: AsRef<Path>>(path: P, config: &InputConfig) -> Result<SourceColumn> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;

    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(false)
        .flexible(true)
        .delimiter(config.delimiter as u8)
        .quote(config.quote as u8)
        .terminator(csv::Terminator::Any(b'\n'));

    let mut rows = split_rows(&content, config.delimiter, config.quote)
        .into_iter()
        .map(|row| parse_row(&builder, row, path));

    let header = match rows.next() {
        Some(row) => row?,
        None => return Err(TallyError::missing_header(path)),
    };

    let mut elements = rows.collect::<Result<Vec<_>>>()?;

    if config.sort_rows {
        elements.sort();
    }

    Ok(SourceColumn {
        group: group_name(path),
        header,
        elements,
    })
}

/// Splits `content` into physical rows, keeping newlines that sit inside a
/// quoted field. A quote only opens a field at its start; a doubled quote
/// inside a quoted field stays quoted. A final newline does not start a row.
fn split_rows(content: &str, delimiter: char, quote: char) -> Vec<&str> {
    let mut rows = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut just_closed = false;
    let mut at_field_start = true;

    for (i, c) in content.char_indices() {
        if quoted {
            if c == quote {
                quoted = false;
                just_closed = true;
            }
            continue;
        }

        if c == quote && (at_field_start || just_closed) {
            quoted = true;
            just_closed = false;
            at_field_start = false;
            continue;
        }

        just_closed = false;

        if c == '\n' {
            rows.push(trim_carriage_return(&content[start..i]));
            start = i + 1;
            at_field_start = true;
        } else {
            at_field_start = c == delimiter;
        }
    }

    if start < content.len() {
        rows.push(trim_carriage_return(&content[start..]));
    }

    rows
}

fn trim_carriage_return(row: &str) -> &str {
    row.strip_suffix('\r').unwrap_or(row)
}

fn parse_row(builder: &csv::ReaderBuilder, row: &str, path: &Path) -> Result<String> {
    if row.is_empty() {
        return Ok(String::new());
    }

    let mut reader = builder.from_reader(row.as_bytes());
    match reader.records().next() {
        Some(record) => Ok(join_fields(&record.map_err(|e| TallyError::csv(path, e))?)),
        None => Ok(String::new()),
    }
}

fn join_fields(record: &csv::StringRecord) -> String {
    record.iter().collect::<Vec<_>>().join(" ")
}
