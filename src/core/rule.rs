//! Rule and packet data structures
//!
//! A [`Rule`] is one allow-listed traffic pattern as read from a rule source.
//! Its port and address fields are kept as the raw range specs; they are only
//! parsed when the rule is indexed, so a bad row is reported with its position.
//!
//! A [`Packet`] is the typed descriptor a query is evaluated for.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Traffic direction relative to the protected host
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[strum(serialize = "inbound")]
    Inbound,
    #[strum(serialize = "outbound")]
    Outbound,
}

/// Transport protocol of a rule or packet
///
/// Only port-carrying protocols can appear in the rule table.
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Transmission Control Protocol
    #[strum(serialize = "tcp")]
    Tcp,
    /// User Datagram Protocol
    #[strum(serialize = "udp")]
    Udp,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rule {
    pub direction: Direction,
    pub protocol: Protocol,
    /// Port spec: `80` or `10000-20000`
    pub ports: String,
    /// Address spec: `10.0.0.1`, `10.0.0.1-10.0.0.9` or `10.0.0.0/24`
    pub addresses: String,
}

impl Rule {
    pub fn new(
        direction: Direction,
        protocol: Protocol,
        ports: impl Into<String>,
        addresses: impl Into<String>,
    ) -> Self {
        Self {
            direction,
            protocol,
            ports: ports.into(),
            addresses: addresses.into(),
        }
    }
}

/// A packet to be checked against the rule table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    pub direction: Direction,
    pub protocol: Protocol,
    pub port: u16,
    pub address: Ipv4Addr,
}

impl Packet {
    pub const fn new(
        direction: Direction,
        protocol: Protocol,
        port: u16,
        address: Ipv4Addr,
    ) -> Self {
        Self {
            direction,
            protocol,
            port,
            address,
        }
    }
}
