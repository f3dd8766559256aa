pub mod count_table;

pub use count_table::{count_elements, count_groups, count_totals, CountTable, GroupCounts};
