pub mod file_filter;
pub mod input_scanner;
pub mod normalizer;

pub use file_filter::FileFilter;
pub use input_scanner::{InputFile, InputScanner};
pub use normalizer::{normalize_file_name, FileNameNormalizer, Rename};
