pub mod html_table;
pub mod match_info;
pub mod match_tables;
pub mod schedule;
