//! Shared test utilities for core module tests
//!
//! This module is only compiled in test mode.

use crate::core::rule::{Direction, Protocol, Rule};

/// CSV text of the canonical test rule table.
///
/// Mirrors `tests/fixtures/fw.csv` so unit tests don't touch the filesystem.
pub const FIXTURE_CSV: &str = "\
inbound,tcp,80,192.168.1.1-192.168.1.10
inbound,tcp,81-90,10.0.0.1-10.0.0.10
inbound,udp,53,192.168.2.0-192.168.2.255
outbound,tcp,10000-10234,192.168.10.0-192.168.10.11
outbound,udp,1000-2000,52.12.48.92
";

/// The canonical test rule table as parsed rules.
pub fn fixture_rules() -> Vec<Rule> {
    vec![
        Rule::new(
            Direction::Inbound,
            Protocol::Tcp,
            "80",
            "192.168.1.1-192.168.1.10",
        ),
        Rule::new(Direction::Inbound, Protocol::Tcp, "81-90", "10.0.0.1-10.0.0.10"),
        Rule::new(
            Direction::Inbound,
            Protocol::Udp,
            "53",
            "192.168.2.0-192.168.2.255",
        ),
        Rule::new(
            Direction::Outbound,
            Protocol::Tcp,
            "10000-10234",
            "192.168.10.0-192.168.10.11",
        ),
        Rule::new(Direction::Outbound, Protocol::Udp, "1000-2000", "52.12.48.92"),
    ]
}
