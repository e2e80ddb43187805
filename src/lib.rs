pub mod api;
pub mod config;
pub mod data_collector;
pub mod parser;
pub mod query;
pub mod schema;
pub mod storage;
