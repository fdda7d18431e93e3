//! fwgate - allow-list packet filter
//!
//! Loads a static table of firewall rules and answers, for each packet,
//! whether any rule allows it.
//!
//! # Architecture
//!
//! - [`core`] - Range parsing, the rule index, and rule file loading
//! - [`config`] - Configuration persistence
//! - [`utils`] - Utility functions (XDG directories)
//!
//! # Model
//!
//! - Rules are (direction, protocol, port range, address range) tuples
//! - A packet is accepted if at least one rule covers it, denied otherwise
//! - The table is built once, all-or-nothing, and never changes afterwards
//!
//! # Example
//!
//! ```
//! use fwgate::core::index::BuildLimits;
//! use fwgate::core::loader::{RuleFormat, index_from_str};
//!
//! let rules = "inbound,tcp,80,192.168.1.1-192.168.1.10\ninbound,udp,53,192.168.2.0/24\n";
//! let index = index_from_str(rules, RuleFormat::Csv, BuildLimits { max_rules: 100, ..BuildLimits::UNBOUNDED }).unwrap();
//!
//! assert!(index.accept("inbound", "tcp", 80, "192.168.1.2").unwrap());
//! assert!(!index.accept("inbound", "udp", 24, "52.12.48.92").unwrap());
//! ```

// Allow pedantic clippy warnings that are not worth fixing for this codebase
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::uninlined_format_args)]

pub mod config;
pub mod core;
pub mod utils;

// Re-export commonly used types
pub use crate::core::error::{Error, Result};
pub use crate::core::index::RuleIndex;
pub use crate::core::rule::{Direction, Packet, Protocol, Rule};
