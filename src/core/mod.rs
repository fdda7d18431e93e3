//! Core rule matching functionality
//!
//! This module contains the types and logic for evaluating packets against a
//! static allow-list. It provides:
//!
//! - [`interval`]: Inclusive port and IPv4 ranges
//! - [`rule`]: Rule and packet data structures
//! - [`index`]: The rule table and the accept query
//! - [`loader`]: CSV and JSON rule sources, CSV query batches
//! - [`error`]: Error types for loading and querying

pub mod error;
pub mod index;
pub mod interval;
pub mod loader;
pub mod rule;

#[cfg(test)]
pub mod test_helpers;
