//! Rule and query file loading
//!
//! Rule sources come in two formats:
//!
//! - CSV: one rule per row, `direction,protocol,ports,addresses`, no header.
//! - JSON: an array of [`Rule`] objects.
//!
//! The format is picked from the file extension (see [`RuleFormat::from_path`]).
//! Blank CSV lines are skipped, and errors are reported with the line number
//! in the file rather than the rule's position. Double quotes may wrap a
//! whole field; quoted commas are not supported and are rejected as
//! unbalanced quotes. Direction and protocol names are lowercase.
//!
//! Loading is synchronous: the complete index is built before anything is
//! returned.

use super::error::{Error, Result, RuleField};
use super::index::{BuildLimits, RuleIndex};
use super::rule::{Direction, Packet, Protocol, Rule};
use std::net::Ipv4Addr;
use std::path::Path;
use std::str::FromStr;

/// Number of columns in a rule row and in a query row
const ROW_FIELDS: usize = 4;

/// On-disk format of a rule source
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
pub enum RuleFormat {
    #[strum(serialize = "csv")]
    Csv,
    #[strum(serialize = "json")]
    Json,
}

impl RuleFormat {
    /// Picks the format from the file extension; anything but `.json` is CSV.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => RuleFormat::Json,
            _ => RuleFormat::Csv,
        }
    }
}

/// Rules along with the source row each one came from
struct ParsedSource {
    rules: Vec<Rule>,
    rows: Vec<usize>,
}

impl ParsedSource {
    /// Rewrites a rule position in a build error to its source row.
    fn locate(&self, err: Error) -> Error {
        match err {
            Error::MalformedRule { row, field, source } => Error::MalformedRule {
                row: self.rows.get(row - 1).copied().unwrap_or(row),
                field,
                source,
            },
            other => other,
        }
    }
}

/// Splits a CSV line into trimmed fields, dropping surrounding double quotes.
///
/// Returns `None` when a quote is left over after unwrapping, which is what a
/// quoted comma looks like once the line has been split.
fn split_row(line: &str) -> Option<Vec<&str>> {
    line.split(',')
        .map(|field| {
            let field = field.trim();
            let unquoted = field
                .strip_prefix('"')
                .and_then(|f| f.strip_suffix('"'))
                .unwrap_or(field);
            (!unquoted.contains('"')).then_some(unquoted)
        })
        .collect()
}

/// Yields `(row, fields)` for every non-blank line, rows numbered from 1.
fn csv_rows(text: &str) -> impl Iterator<Item = (usize, Option<Vec<&str>>)> {
    text.trim_start_matches('\u{feff}')
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| (i + 1, split_row(line)))
}

fn parse_csv_source(text: &str) -> Result<ParsedSource> {
    let mut source = ParsedSource {
        rules: Vec::new(),
        rows: Vec::new(),
    };

    for (row, fields) in csv_rows(text) {
        let fields = fields.ok_or(Error::UnbalancedQuote { row })?;
        let [direction, protocol, ports, addresses] = fields[..] else {
            return Err(Error::RuleShape {
                row,
                found: fields.len(),
            });
        };

        let direction = Direction::from_str(direction).map_err(|_| Error::UnknownValue {
            row,
            field: RuleField::Direction,
            value: direction.to_string(),
        })?;
        let protocol = Protocol::from_str(protocol).map_err(|_| Error::UnknownValue {
            row,
            field: RuleField::Protocol,
            value: protocol.to_string(),
        })?;

        source
            .rules
            .push(Rule::new(direction, protocol, ports, addresses));
        source.rows.push(row);
    }

    Ok(source)
}

fn parse_json_source(text: &str) -> Result<ParsedSource> {
    let rules: Vec<Rule> = serde_json::from_str(text)?;
    let rows = (1..=rules.len()).collect();
    Ok(ParsedSource { rules, rows })
}

fn parse_source(text: &str, format: RuleFormat) -> Result<ParsedSource> {
    match format {
        RuleFormat::Csv => parse_csv_source(text),
        RuleFormat::Json => parse_json_source(text),
    }
}

/// Parses CSV rule text.
///
/// Only the row shape, direction and protocol are checked here; range specs
/// are validated when the rules are indexed.
pub fn parse_rules_csv(text: &str) -> Result<Vec<Rule>> {
    parse_csv_source(text).map(|source| source.rules)
}

/// Parses a JSON array of rules.
pub fn parse_rules_json(text: &str) -> Result<Vec<Rule>> {
    parse_json_source(text).map(|source| source.rules)
}

/// Reads the rules in `path` without indexing them.
pub fn load_rules(path: &Path) -> Result<Vec<Rule>> {
    let text = std::fs::read_to_string(path)?;
    parse_source(&text, RuleFormat::from_path(path)).map(|source| source.rules)
}

/// Builds an index from rule text, reporting errors by source row.
pub fn index_from_str(text: &str, format: RuleFormat, limits: BuildLimits) -> Result<RuleIndex> {
    let source = parse_source(text, format)?;
    RuleIndex::build_with_limits(source.rules.iter().cloned(), limits)
        .map_err(|err| source.locate(err))
}

/// Reads `path` and builds the rule index from it.
///
/// Any failure means no index: there is no partially loaded rule table.
pub fn load_index(path: &Path, limits: BuildLimits) -> Result<RuleIndex> {
    let text = std::fs::read_to_string(path)?;
    let format = RuleFormat::from_path(path);
    let index = index_from_str(&text, format, limits)?;

    let stats = index.stats();
    tracing::info!(
        "Loaded {} rules from {} ({}, {} keys)",
        stats.rules,
        path.display(),
        format,
        stats.keys
    );
    Ok(index)
}

/// Parses CSV query rows of `direction,protocol,port,address`.
///
/// Queries are validated strictly: unknown directions and protocols are
/// errors here, unlike in [`RuleIndex::accept`].
pub fn parse_packets_csv(text: &str) -> Result<Vec<Packet>> {
    csv_rows(text)
        .map(|(row, fields)| {
            let malformed = |message: String| Error::MalformedQuery { row, message };

            let Some(fields) = fields else {
                return Err(malformed("unbalanced quote".to_string()));
            };

            let [direction, protocol, port, address] = fields[..] else {
                return Err(malformed(format!(
                    "{} fields (expected {ROW_FIELDS})",
                    fields.len()
                )));
            };

            let direction = Direction::from_str(direction)
                .map_err(|_| malformed(format!("unknown direction '{direction}'")))?;
            let protocol = Protocol::from_str(protocol)
                .map_err(|_| malformed(format!("unknown protocol '{protocol}'")))?;
            let port = port
                .parse::<u16>()
                .map_err(|e| malformed(format!("invalid port '{port}': {e}")))?;
            let address = address
                .parse::<Ipv4Addr>()
                .map_err(|e| malformed(format!("invalid address '{address}': {e}")))?;

            Ok(Packet::new(direction, protocol, port, address))
        })
        .collect()
}

/// Reads a query batch file.
pub fn load_packets(path: &Path) -> Result<Vec<Packet>> {
    let text = std::fs::read_to_string(path)?;
    parse_packets_csv(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_helpers::{FIXTURE_CSV, fixture_rules};

    const LIMITS: BuildLimits = BuildLimits {
        max_rules: 100,
        max_entries: 10_000,
    };

    #[test]
    fn test_csv_fixture_parses() {
        let rules = parse_rules_csv(FIXTURE_CSV).unwrap();
        assert_eq!(rules, fixture_rules());
    }

    #[test]
    fn test_csv_tolerates_whitespace_quotes_and_blank_lines() {
        let text = "\u{feff}\n inbound , tcp , \"80\" , 10.0.0.1 \r\n\n";
        let rules = parse_rules_csv(text).unwrap();
        assert_eq!(
            rules,
            vec![Rule::new(Direction::Inbound, Protocol::Tcp, "80", "10.0.0.1")]
        );
    }

    #[test]
    fn test_csv_wrong_field_count() {
        let err = parse_rules_csv("inbound,tcp,80\n").unwrap_err();
        assert!(matches!(err, Error::RuleShape { row: 1, found: 3 }));

        let err = parse_rules_csv("inbound,tcp,80,10.0.0.1\n\ninbound,tcp,80,10.0.0.1,x\n")
            .unwrap_err();
        assert!(matches!(err, Error::RuleShape { row: 3, found: 5 }));
    }

    #[test]
    fn test_csv_unknown_direction_and_protocol() {
        let err = parse_rules_csv("forward,tcp,80,10.0.0.1").unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownValue {
                field: RuleField::Direction,
                ..
            }
        ));

        let err = parse_rules_csv("inbound,sctp,80,10.0.0.1").unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownValue {
                field: RuleField::Protocol,
                ..
            }
        ));
    }

    #[test]
    fn test_csv_names_are_lowercase_only() {
        let err = parse_rules_csv("inbound,tcp,80,10.0.0.1\nInbound,tcp,80,10.0.0.1\n").unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownValue {
                row: 2,
                field: RuleField::Direction,
                ..
            }
        ));

        let err = parse_rules_csv("outbound,UDP,53,10.0.0.1").unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownValue {
                row: 1,
                field: RuleField::Protocol,
                ..
            }
        ));
    }

    #[test]
    fn test_csv_quoted_comma_is_rejected() {
        let text = "inbound,tcp,80,10.0.0.1\ninbound,tcp,\"80,90\",10.0.0.1\n";
        let err = parse_rules_csv(text).unwrap_err();
        assert!(matches!(err, Error::UnbalancedQuote { row: 2 }));

        let err = parse_rules_csv("inbound,tcp,\"80,10.0.0.1").unwrap_err();
        assert!(matches!(err, Error::UnbalancedQuote { row: 1 }));

        let err = parse_rules_csv("inbound,tcp,8\"0,10.0.0.1").unwrap_err();
        assert!(matches!(err, Error::UnbalancedQuote { row: 1 }));
    }

    #[test]
    fn test_csv_header_row_is_rejected() {
        let err = parse_rules_csv("direction,protocol,port,ip_address\n").unwrap_err();
        assert!(matches!(err, Error::UnknownValue { row: 1, .. }));
    }

    #[test]
    fn test_index_error_reports_source_line() {
        let text = "inbound,tcp,80,10.0.0.1\n\n\noutbound,udp,53,10.0.0.256\n";
        let err = index_from_str(text, RuleFormat::Csv, LIMITS).unwrap_err();
        match err {
            Error::MalformedRule { row, field, .. } => {
                assert_eq!(row, 4);
                assert_eq!(field, RuleField::Addresses);
            }
            other => panic!("expected MalformedRule, got {other:?}"),
        }
    }

    #[test]
    fn test_index_from_str_respects_limit() {
        let limits = BuildLimits {
            max_rules: 3,
            ..LIMITS
        };
        let err = index_from_str(FIXTURE_CSV, RuleFormat::Csv, limits).unwrap_err();
        assert!(matches!(err, Error::TooManyRules { count: 5, max: 3 }));
    }

    #[test]
    fn test_index_from_str_refuses_full_span_rules() {
        let text = "inbound,tcp,1-65535,10.0.0.1\n".repeat(20);
        let limits = BuildLimits {
            max_rules: 20,
            max_entries: 1_000_000,
        };
        let err = index_from_str(&text, RuleFormat::Csv, limits).unwrap_err();
        assert!(matches!(
            err,
            Error::TooManyEntries {
                entries: 1_310_700,
                max: 1_000_000
            }
        ));

        let index = index_from_str(&text[..text.len() / 20], RuleFormat::Csv, limits).unwrap();
        assert!(index.accept("inbound", "tcp", 65535, "10.0.0.1").unwrap());
    }

    #[test]
    fn test_json_rules() {
        let text = r#"[
            {"direction": "inbound", "protocol": "udp", "ports": "53", "addresses": "192.168.2.0/24"},
            {"direction": "outbound", "protocol": "tcp", "ports": "443", "addresses": "0.0.0.0/0"}
        ]"#;
        let index = index_from_str(text, RuleFormat::Json, LIMITS).unwrap();
        assert!(index.accept("inbound", "udp", 53, "192.168.2.200").unwrap());
        assert!(index.accept("outbound", "tcp", 443, "8.8.8.8").unwrap());
        assert!(!index.accept("outbound", "tcp", 80, "8.8.8.8").unwrap());
    }

    #[test]
    fn test_json_unknown_protocol_is_serialization_error() {
        let text = r#"[{"direction": "inbound", "protocol": "icmp", "ports": "1", "addresses": "1.1.1.1"}]"#;
        assert!(matches!(
            parse_rules_json(text).unwrap_err(),
            Error::Serialization(_)
        ));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(RuleFormat::from_path(Path::new("fw.csv")), RuleFormat::Csv);
        assert_eq!(RuleFormat::from_path(Path::new("fw.JSON")), RuleFormat::Json);
        assert_eq!(RuleFormat::from_path(Path::new("rules")), RuleFormat::Csv);
    }

    #[test]
    fn test_packets_csv() {
        let packets = parse_packets_csv("inbound,tcp,80,192.168.1.2\noutbound,udp,53,8.8.8.8\n")
            .unwrap();
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].port, 80);
        assert_eq!(packets[1].address, Ipv4Addr::new(8, 8, 8, 8));
    }

    #[test]
    fn test_packets_csv_rejects_bad_rows() {
        for (text, needle) in [
            ("inbound,tcp,80", "fields"),
            ("sideways,tcp,80,1.1.1.1", "direction"),
            ("inbound,gre,80,1.1.1.1", "protocol"),
            ("inbound,tcp,70000,1.1.1.1", "port"),
            ("inbound,tcp,80,1.1.1", "address"),
            ("inbound,tcp,\"80,1.1.1.1\"", "unbalanced quote"),
            ("Inbound,tcp,80,1.1.1.1", "direction"),
        ] {
            match parse_packets_csv(text).unwrap_err() {
                Error::MalformedQuery { row, message } => {
                    assert_eq!(row, 1);
                    assert!(message.contains(needle), "{text}: {message}");
                }
                other => panic!("expected MalformedQuery, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_load_index_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fw.csv");
        std::fs::write(&path, FIXTURE_CSV).unwrap();

        let index = load_index(&path, LIMITS).unwrap();
        assert_eq!(index.len(), 5);
        assert_eq!(load_rules(&path).unwrap(), fixture_rules());
    }

    #[test]
    fn test_load_index_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_index(&dir.path().join("absent.csv"), LIMITS).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
