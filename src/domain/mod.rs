//! Core domain types and logic.

pub mod config;
pub mod config_validation;
pub mod cycle;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod performance;
pub mod position;
pub mod signal;
pub mod universe;
