//! Inclusive numeric intervals for port and IPv4 address ranges
//!
//! Both kinds of range share one parser and one containment test through
//! [`IntervalRange`], which is parameterized by a [`Domain`] marker. The marker
//! keeps port ranges (`u16`) and address ranges (`u32`) distinct at the type
//! level while reusing the same algorithm.
//!
//! # Range Syntax
//!
//! - `X` - a single value, `low == high`
//! - `X-Y` - an inclusive range split on the first `-`
//! - `A.B.C.D/N` - a CIDR block (IPv4 only), covering network to broadcast
//!
//! Ranges are not required to be ordered. An inverted range such as `200-100`
//! parses successfully and contains nothing.
//!
//! # Example
//!
//! ```
//! use fwgate::core::interval::{IpRange, PortRange};
//! use std::net::Ipv4Addr;
//!
//! let ports: PortRange = "80-90".parse().unwrap();
//! assert!(ports.contains(85));
//!
//! let hosts: IpRange = "10.0.0.0/30".parse().unwrap();
//! assert!(hosts.contains_addr(Ipv4Addr::new(10, 0, 0, 3)));
//! assert!(!hosts.contains_addr(Ipv4Addr::new(10, 0, 0, 4)));
//! ```

use super::error::MalformedRange;
use ipnetwork::Ipv4Network;
use std::fmt;
use std::marker::PhantomData;
use std::net::Ipv4Addr;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Value space an [`IntervalRange`] is defined over
pub trait Domain {
    type Value: Copy + Ord + fmt::Debug;

    /// Short name used in error messages
    const NAME: &'static str;

    /// Parses a single bound token (already trimmed and non-empty).
    fn parse_value(token: &str) -> Result<Self::Value, String>;

    /// Parses a whole-range notation specific to the domain.
    ///
    /// Returns `None` when `spec` is not in that notation, so the generic
    /// `X` / `X-Y` syntax applies.
    fn parse_block(_spec: &str) -> Option<Result<(Self::Value, Self::Value), String>> {
        None
    }

    fn fmt_value(value: Self::Value, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

/// Transport-layer port numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortDomain;

impl Domain for PortDomain {
    type Value = u16;
    const NAME: &'static str = "port";

    fn parse_value(token: &str) -> Result<u16, String> {
        token.parse::<u16>().map_err(|e| e.to_string())
    }

    fn fmt_value(value: u16, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{value}")
    }
}

/// IPv4 addresses as big-endian 32-bit integers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Domain;

impl Domain for Ipv4Domain {
    type Value = u32;
    const NAME: &'static str = "ipv4";

    fn parse_value(token: &str) -> Result<u32, String> {
        token
            .parse::<Ipv4Addr>()
            .map(ipv4_to_u32)
            .map_err(|e| e.to_string())
    }

    fn parse_block(spec: &str) -> Option<Result<(u32, u32), String>> {
        if !spec.contains('/') {
            return None;
        }
        Some(
            spec.trim()
                .parse::<Ipv4Network>()
                .map(|net| (ipv4_to_u32(net.network()), ipv4_to_u32(net.broadcast())))
                .map_err(|e| e.to_string()),
        )
    }

    fn fmt_value(value: u32, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u32_to_ipv4(value))
    }
}

/// Converts an address to its integer form, treating the octets as big-endian.
#[inline]
pub fn ipv4_to_u32(addr: Ipv4Addr) -> u32 {
    u32::from_be_bytes(addr.octets())
}

#[inline]
pub fn u32_to_ipv4(value: u32) -> Ipv4Addr {
    Ipv4Addr::from(value.to_be_bytes())
}

/// Parses a dotted-quad string into its integer form.
pub fn parse_ipv4(address: &str) -> Result<u32, MalformedRange> {
    Ipv4Domain::parse_value(address.trim())
        .map_err(|reason| MalformedRange::new(Ipv4Domain::NAME, address, reason))
}

/// Inclusive interval `[low, high]` over a [`Domain`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalRange<D: Domain> {
    low: D::Value,
    high: D::Value,
    domain: PhantomData<D>,
}

/// Port interval, e.g. `80` or `8000-9000`
pub type PortRange = IntervalRange<PortDomain>;

/// IPv4 interval, e.g. `10.0.0.1-10.0.0.9` or `10.0.0.0/24`
pub type IpRange = IntervalRange<Ipv4Domain>;

impl<D: Domain> IntervalRange<D> {
    pub const fn new(low: D::Value, high: D::Value) -> Self {
        Self {
            low,
            high,
            domain: PhantomData,
        }
    }

    pub const fn single(value: D::Value) -> Self {
        Self::new(value, value)
    }

    /// Parses `X`, `X-Y`, or a domain-specific block notation.
    ///
    /// Whitespace around each bound is ignored. The bounds are not reordered.
    pub fn parse(spec: &str) -> Result<Self, MalformedRange> {
        if let Some(block) = D::parse_block(spec) {
            let (low, high) = block.map_err(|reason| MalformedRange::new(D::NAME, spec, reason))?;
            return Ok(Self::new(low, high));
        }

        match spec.split_once('-') {
            None => parse_bound::<D>(spec, spec).map(Self::single),
            Some((low, high)) => Ok(Self::new(
                parse_bound::<D>(spec, low)?,
                parse_bound::<D>(spec, high)?,
            )),
        }
    }

    #[inline]
    pub fn contains(&self, value: D::Value) -> bool {
        self.low <= value && value <= self.high
    }

    pub fn low(&self) -> D::Value {
        self.low
    }

    pub fn high(&self) -> D::Value {
        self.high
    }

    /// Returns `true` for inverted ranges, which match no value.
    pub fn is_empty(&self) -> bool {
        self.low > self.high
    }
}

fn parse_bound<D: Domain>(spec: &str, token: &str) -> Result<D::Value, MalformedRange> {
    let token = token.trim();
    if token.is_empty() {
        return Err(MalformedRange::new(D::NAME, spec, "missing bound"));
    }
    D::parse_value(token)
        .map_err(|reason| MalformedRange::new(D::NAME, spec, format!("'{token}': {reason}")))
}

impl PortRange {
    /// Every port covered by the range, in ascending order.
    ///
    /// Empty for inverted ranges.
    pub fn ports(&self) -> RangeInclusive<u16> {
        self.low..=self.high
    }

    /// Number of ports covered by the range.
    pub fn width(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            usize::from(self.high - self.low) + 1
        }
    }
}

impl IpRange {
    pub fn contains_addr(&self, addr: Ipv4Addr) -> bool {
        self.contains(ipv4_to_u32(addr))
    }
}

impl<D: Domain> FromStr for IntervalRange<D> {
    type Err = MalformedRange;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<D: Domain> fmt::Display for IntervalRange<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        D::fmt_value(self.low, f)?;
        if self.low != self.high {
            f.write_str("-")?;
            D::fmt_value(self.high, f)?;
        }
        Ok(())
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_single_value_contains_only_itself(x in any::<u16>(), y in any::<u16>()) {
            let range = PortRange::parse(&x.to_string()).unwrap();
            prop_assert!(range.contains(x));
            prop_assert_eq!(range.contains(y), x == y);
        }

        #[test]
        fn test_port_range_containment(
            a in any::<u16>(),
            b in any::<u16>(),
            v in any::<u16>()
        ) {
            let (low, high) = (a.min(b), a.max(b));
            let range = PortRange::parse(&format!("{low}-{high}")).unwrap();
            prop_assert_eq!(range.contains(v), low <= v && v <= high);
        }

        #[test]
        fn test_ip_range_containment(a in any::<u32>(), b in any::<u32>(), v in any::<u32>()) {
            let (low, high) = (a.min(b), a.max(b));
            let spec = format!("{}-{}", u32_to_ipv4(low), u32_to_ipv4(high));
            let range = IpRange::parse(&spec).unwrap();
            prop_assert_eq!(range.contains(v), low <= v && v <= high);
        }

        #[test]
        fn test_dotted_quad_roundtrip(octets in any::<[u8; 4]>()) {
            let addr = Ipv4Addr::from(octets);
            let value = parse_ipv4(&addr.to_string()).unwrap();
            prop_assert_eq!(u32_to_ipv4(value).octets(), octets);
        }

        #[test]
        fn test_inverted_ranges_never_match(a in any::<u16>(), b in any::<u16>(), v in any::<u16>()) {
            prop_assume!(a != b);
            let range = PortRange::new(a.max(b), a.min(b));
            prop_assert!(range.is_empty());
            prop_assert!(!range.contains(v));
        }

        #[test]
        fn test_parse_never_panics(spec in "\\PC*") {
            let _ = PortRange::parse(&spec);
            let _ = IpRange::parse(&spec);
        }
    }
}
