// Library for the binary and the integration tests

pub mod collector;
pub mod config;
pub mod disk_repo;
pub mod error;
pub mod models;
pub mod node_list;
pub mod remote_repo;
pub mod report_parser;
pub mod table_sink;
pub mod units;
