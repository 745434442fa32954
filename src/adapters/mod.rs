//! Concrete adapter implementations for ports.

pub mod csv_market_adapter;
pub mod file_config_adapter;
pub mod file_store;
pub mod memory_store;
pub mod universe_adapter;
#[cfg(feature = "network")]
pub mod yahoo_adapter;
