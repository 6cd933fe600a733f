pub mod config;
pub mod graph;
pub mod reports;
pub mod session;
