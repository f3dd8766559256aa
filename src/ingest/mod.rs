pub mod csv_reader;
pub mod grouping;

pub use csv_reader::{read_source_column, SourceColumn};
pub use grouping::{ElementGroups, Group};
