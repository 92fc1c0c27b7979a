pub mod catalog;
pub mod cli;
pub mod config;
pub mod ledger;
pub mod logging;
pub mod optimizer;
pub mod persistence;
pub mod server;
