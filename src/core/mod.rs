//! Engine-wide plumbing: balance numbers, configuration, errors, ports,
//! content tables and action results.

pub mod balance;
pub mod config;
pub mod content;
pub mod error;
pub mod ports;
pub mod report;
