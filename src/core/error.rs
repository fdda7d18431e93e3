use std::net::AddrParseError;
use thiserror::Error;

/// A port or IP range token that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed {domain} range '{spec}': {reason}")]
pub struct MalformedRange {
    /// Domain the range was parsed in ("port" or "ipv4")
    pub domain: &'static str,
    /// The full range spec as supplied
    pub spec: String,
    pub reason: String,
}

impl MalformedRange {
    pub fn new(domain: &'static str, spec: &str, reason: impl Into<String>) -> Self {
        Self {
            domain,
            spec: spec.to_string(),
            reason: reason.into(),
        }
    }
}

/// Which column of a rule row failed to parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
pub enum RuleField {
    #[strum(serialize = "direction")]
    Direction,
    #[strum(serialize = "protocol")]
    Protocol,
    #[strum(serialize = "port range")]
    Ports,
    #[strum(serialize = "ip range")]
    Addresses,
}

/// Core error types for fwgate
#[derive(Debug, Error)]
pub enum Error {
    /// A rule's port or IP range could not be parsed during index construction
    #[error("Malformed rule at row {row} ({field}): {source}")]
    MalformedRule {
        row: usize,
        field: RuleField,
        #[source]
        source: MalformedRange,
    },

    /// The address supplied to a query is not a dotted-quad
    #[error("Malformed address '{address}': {source}")]
    MalformedAddress {
        address: String,
        #[source]
        source: AddrParseError,
    },

    /// A rule row does not have exactly four fields
    #[error("Rule at row {row} has {found} fields (expected 4)")]
    RuleShape { row: usize, found: usize },

    /// A direction or protocol value in a rule source is not recognized
    #[error("Unknown {field} '{value}' at row {row}")]
    UnknownValue {
        row: usize,
        field: RuleField,
        value: String,
    },

    /// A row of a query batch could not be parsed
    #[error("Malformed query at row {row}: {message}")]
    MalformedQuery { row: usize, message: String },

    /// The rule source exceeds the configured rule limit
    #[error("Rule source contains {count} rules (max: {max})")]
    TooManyRules { count: usize, max: usize },

    /// The rule source's port ranges expand to more index entries than allowed
    #[error("Rule source expands to {entries} index entries (max: {max})")]
    TooManyEntries { entries: usize, max: usize },

    /// A CSV row has a quote that does not close within its field
    #[error("Unbalanced quote at row {row} (quoted commas are not supported)")]
    UnbalancedQuote { row: usize },

    /// Neither the command line nor the config names a rule source
    #[error("No rule source configured")]
    NoRuleSource,

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Represents a translated error with helpful context
#[derive(Debug, Clone)]
pub struct ErrorTranslation {
    pub user_message: String,
    pub suggestions: Vec<String>,
}

impl ErrorTranslation {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            user_message: message.into(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }
}

impl Error {
    /// Returns a user-facing explanation of the error with hints for fixing it.
    pub fn translate(&self) -> ErrorTranslation {
        match self {
            Error::MalformedRule { row, field, .. } => {
                ErrorTranslation::new(format!("Rule {row} has an invalid {field}"))
                    .with_suggestion("Ports are decimal numbers: 22 or 8000-9000")
                    .with_suggestion(
                        "Addresses are dotted quads: 10.0.0.1, 10.0.0.1-10.0.0.9 or 10.0.0.0/24",
                    )
            }
            Error::MalformedAddress { address, .. } => {
                ErrorTranslation::new(format!("'{address}' is not an IPv4 address"))
                    .with_suggestion("Use four decimal octets separated by dots: 192.168.1.2")
            }
            Error::RuleShape { row, found } => {
                ErrorTranslation::new(format!("Rule {row} has {found} columns instead of 4"))
                    .with_suggestion("Each row is: direction,protocol,ports,addresses")
                    .with_suggestion("Rule files have no header row")
            }
            Error::UnknownValue { field, value, .. } => {
                let expected = match field {
                    RuleField::Direction => "inbound or outbound",
                    RuleField::Protocol => "tcp or udp",
                    RuleField::Ports | RuleField::Addresses => "a range",
                };
                ErrorTranslation::new(format!("'{value}' is not a valid {field}"))
                    .with_suggestion(format!("Expected {expected}"))
            }
            Error::MalformedQuery { row, .. } => {
                ErrorTranslation::new(format!("Query {row} could not be parsed"))
                    .with_suggestion("Each query row is: direction,protocol,port,address")
            }
            Error::TooManyRules { max, .. } => {
                ErrorTranslation::new("Rule source is larger than the configured limit")
                    .with_suggestion(format!("Raise max_rules above {max} in the config file"))
                    .with_suggestion("Or split the rule source and merge overlapping rows")
            }
            Error::TooManyEntries { max, .. } => {
                ErrorTranslation::new("Rule source covers too many ports")
                    .with_suggestion("Each rule is stored once for every port in its range")
                    .with_suggestion("Narrow wide port ranges such as 1-65535")
                    .with_suggestion(format!("Or raise max_entries above {max} in the config file"))
            }
            Error::UnbalancedQuote { row } => {
                ErrorTranslation::new(format!("Rule {row} has an unclosed quote"))
                    .with_suggestion("Quotes may only wrap a whole field")
                    .with_suggestion("Fields never contain commas")
            }
            Error::NoRuleSource => ErrorTranslation::new("No rule file given")
                .with_suggestion("Pass --rules <FILE>")
                .with_suggestion("Or set rules_path in the config file"),
            Error::Io(e) => ErrorTranslation::new(format!("Could not read file: {e}"))
                .with_suggestion("Check the path and its permissions"),
            Error::Serialization(e) => ErrorTranslation::new(format!("Invalid JSON: {e}"))
                .with_suggestion("JSON rule files are arrays of rule objects"),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
