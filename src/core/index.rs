//! Rule table indexed for exact-port lookup
//!
//! [`RuleIndex`] expands every rule's port range at build time and files the
//! rule's address range under each `(direction, protocol, port)` key it
//! covers. A query is then one hash lookup followed by a scan of the address
//! ranges filed under that key.
//!
//! The table is an allow-list: a packet is accepted if any range under its
//! key contains its address, and denied otherwise. There is no rule priority
//! and no deny rule.
//!
//! Construction is all-or-nothing. The index is immutable once built and can
//! be shared across threads without locking.
//!
//! # Example
//!
//! ```
//! use fwgate::core::index::RuleIndex;
//! use fwgate::core::rule::{Direction, Protocol, Rule};
//!
//! let index = RuleIndex::build(vec![
//!     Rule::new(Direction::Inbound, Protocol::Tcp, "80", "192.168.1.1-192.168.1.10"),
//! ])
//! .unwrap();
//!
//! assert!(index.accept("inbound", "tcp", 80, "192.168.1.2").unwrap());
//! assert!(!index.accept("inbound", "tcp", 81, "192.168.1.2").unwrap());
//! ```

use super::error::{Error, Result, RuleField};
use super::interval::{IpRange, PortRange, ipv4_to_u32};
use super::rule::{Direction, Packet, Protocol, Rule};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Composite lookup key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RuleKey {
    direction: Direction,
    protocol: Protocol,
    port: u16,
}

/// Size figures for a built index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Rules the index was built from
    pub rules: usize,
    /// Distinct `(direction, protocol, port)` keys
    pub keys: usize,
    /// Address ranges stored across all keys
    pub entries: usize,
}

/// Upper bounds enforced before an index is populated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildLimits {
    /// Rules in the source
    pub max_rules: usize,
    /// Address ranges stored across all keys, one per port a rule covers
    pub max_entries: usize,
}

impl BuildLimits {
    pub const UNBOUNDED: Self = Self {
        max_rules: usize::MAX,
        max_entries: usize::MAX,
    };
}

/// A rule with its ranges parsed, ready to be filed
struct ParsedRule {
    direction: Direction,
    protocol: Protocol,
    ports: PortRange,
    addresses: IpRange,
}

#[derive(Debug, Clone, Default)]
pub struct RuleIndex {
    table: HashMap<RuleKey, Vec<IpRange>>,
    rule_count: usize,
}

impl RuleIndex {
    /// Builds the index from a sequence of rules.
    ///
    /// Rows are numbered from 1 in error reports.
    pub fn build<I>(rules: I) -> Result<Self>
    where
        I: IntoIterator<Item = Rule>,
    {
        Self::build_with_limits(rules, BuildLimits::UNBOUNDED)
    }

    /// Builds the index, refusing rule sets that exceed `limits`.
    ///
    /// Every rule is parsed and the expanded entry count is checked before
    /// anything is inserted, so an oversized source costs no table memory.
    pub fn build_with_limits<I>(rules: I, limits: BuildLimits) -> Result<Self>
    where
        I: IntoIterator<Item = Rule>,
    {
        let rules: Vec<Rule> = rules.into_iter().collect();
        if rules.len() > limits.max_rules {
            return Err(Error::TooManyRules {
                count: rules.len(),
                max: limits.max_rules,
            });
        }

        let mut parsed = Vec::with_capacity(rules.len());
        let mut entries: usize = 0;

        for (i, rule) in rules.iter().enumerate() {
            let row = i + 1;
            let ports = PortRange::parse(&rule.ports).map_err(|source| Error::MalformedRule {
                row,
                field: RuleField::Ports,
                source,
            })?;
            let addresses =
                IpRange::parse(&rule.addresses).map_err(|source| Error::MalformedRule {
                    row,
                    field: RuleField::Addresses,
                    source,
                })?;

            if ports.is_empty() || addresses.is_empty() {
                tracing::warn!(
                    "Rule {} ({} {} {} {}) has an inverted range and will never match",
                    row,
                    rule.direction,
                    rule.protocol,
                    rule.ports,
                    rule.addresses
                );
            }

            entries = entries.saturating_add(ports.width());
            parsed.push(ParsedRule {
                direction: rule.direction,
                protocol: rule.protocol,
                ports,
                addresses,
            });
        }

        if entries > limits.max_entries {
            return Err(Error::TooManyEntries {
                entries,
                max: limits.max_entries,
            });
        }

        let mut table: HashMap<RuleKey, Vec<IpRange>> = HashMap::new();
        for rule in &parsed {
            for port in rule.ports.ports() {
                let key = RuleKey {
                    direction: rule.direction,
                    protocol: rule.protocol,
                    port,
                };
                table.entry(key).or_default().push(rule.addresses);
            }
        }

        let index = Self {
            table,
            rule_count: parsed.len(),
        };
        let stats = index.stats();
        tracing::debug!(
            "Built rule index: {} rules, {} keys, {} entries",
            stats.rules,
            stats.keys,
            stats.entries
        );
        Ok(index)
    }

    /// Returns whether a packet described by raw strings is allowed.
    ///
    /// An unrecognized `direction` or `protocol` matches no rule and yields
    /// `Ok(false)`. A malformed `ip_address` is an error for this query only.
    pub fn accept(
        &self,
        direction: &str,
        protocol: &str,
        port: u16,
        ip_address: &str,
    ) -> Result<bool> {
        let address =
            Ipv4Addr::from_str(ip_address.trim()).map_err(|source| Error::MalformedAddress {
                address: ip_address.to_string(),
                source,
            })?;

        let (Ok(direction), Ok(protocol)) =
            (Direction::from_str(direction), Protocol::from_str(protocol))
        else {
            return Ok(false);
        };

        Ok(self.accept_packet(&Packet::new(direction, protocol, port, address)))
    }

    /// Returns whether a typed packet is allowed.
    pub fn accept_packet(&self, packet: &Packet) -> bool {
        let value = ipv4_to_u32(packet.address);
        self.ranges(packet.direction, packet.protocol, packet.port)
            .iter()
            .any(|range| range.contains(value))
    }

    /// Address ranges filed under a key, empty when the key is absent.
    pub fn ranges(&self, direction: Direction, protocol: Protocol, port: u16) -> &[IpRange] {
        let key = RuleKey {
            direction,
            protocol,
            port,
        };
        self.table.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            rules: self.rule_count,
            keys: self.table.len(),
            entries: self.table.values().map(Vec::len).sum(),
        }
    }

    /// Number of rules the index was built from.
    pub fn len(&self) -> usize {
        self.rule_count
    }

    pub fn is_empty(&self) -> bool {
        self.rule_count == 0
    }
}
