//! Snapshot options parsing and storage.

use lotledger_booking::LotSelection;
use lotledger_core::AccountId;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Known option names.
const KNOWN_OPTIONS: &[&str] = &[
    "booking_method",
    "long_term_months",
    "percent_precision",
    "gain_parts",
    "account_long_term_gains",
    "account_short_term_gains",
];

/// Option validation warning.
#[derive(Debug, Clone)]
pub struct OptionWarning {
    /// Warning code (E7001, E7002, E7003).
    pub code: &'static str,
    /// Warning message.
    pub message: String,
    /// Option name.
    pub option: String,
    /// Option value.
    pub value: String,
}

/// Which cost basis counts as the input of a gain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum GainPartsKind {
    /// Every lot's cost basis.
    #[default]
    Simple,
    /// Cash-purchase lots only.
    #[value(name = "cash_in")]
    CashIn,
}

impl FromStr for GainPartsKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "cash_in" | "cash-in" => Ok(Self::CashIn),
            _ => Err(format!("unknown gain parts: {s}")),
        }
    }
}

impl fmt::Display for GainPartsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple => write!(f, "simple"),
            Self::CashIn => write!(f, "cash_in"),
        }
    }
}

/// Ledger-wide options.
///
/// Read from the snapshot's `options` table and from `-o key=value` on the
/// command line, in that order.
#[derive(Debug, Clone)]
pub struct Options {
    /// Default lot selection for sales.
    pub booking_method: LotSelection,

    /// Calendar months a lot must be held for its gains to be long-term.
    pub long_term_months: u32,

    /// Decimal places of percent figures.
    pub percent_precision: u32,

    /// Default input side of gain reports.
    pub gain_parts: GainPartsKind,

    /// Long-term gains account for accounts that do not name their own.
    pub account_long_term_gains: Option<AccountId>,

    /// Short-term gains account for accounts that do not name their own.
    pub account_short_term_gains: Option<AccountId>,

    /// Any other custom options.
    pub custom: HashMap<String, String>,

    /// Options that have been set (for duplicate detection).
    #[doc(hidden)]
    pub set_options: HashSet<String>,

    /// Validation warnings collected during parsing.
    pub warnings: Vec<OptionWarning>,
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}

impl Options {
    /// Create new options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            booking_method: LotSelection::Fifo,
            long_term_months: 12,
            percent_precision: 2,
            gain_parts: GainPartsKind::Simple,
            account_long_term_gains: None,
            account_short_term_gains: None,
            custom: HashMap::new(),
            set_options: HashSet::new(),
            warnings: Vec::new(),
        }
    }

    /// Set an option by name.
    ///
    /// Validates the option and collects any warnings in `self.warnings`. An
    /// invalid value leaves the previous value in place.
    pub fn set(&mut self, key: &str, value: &str) {
        // Check for unknown options (E7001)
        let is_known = KNOWN_OPTIONS.contains(&key);
        if !is_known {
            self.warnings.push(OptionWarning {
                code: "E7001",
                message: format!("Unknown option \"{key}\""),
                option: key.to_string(),
                value: value.to_string(),
            });
        }

        // Check for duplicate options (E7003)
        if is_known && self.set_options.contains(key) {
            self.warnings.push(OptionWarning {
                code: "E7003",
                message: format!("Option \"{key}\" can only be specified once"),
                option: key.to_string(),
                value: value.to_string(),
            });
        }

        self.set_options.insert(key.to_string());

        match key {
            "booking_method" => match value.parse::<LotSelection>() {
                Ok(selection) => self.booking_method = selection,
                Err(_) => self.invalid(key, value, "expected one of FIFO, LIFO"),
            },
            "long_term_months" => match value.parse::<u32>() {
                Ok(months) if months > 0 => self.long_term_months = months,
                _ => self.invalid(key, value, "expected a positive number of months"),
            },
            "percent_precision" => match value.parse::<u32>() {
                Ok(dp) if dp <= 28 => self.percent_precision = dp,
                _ => self.invalid(key, value, "expected an integer from 0 to 28"),
            },
            "gain_parts" => match value.parse::<GainPartsKind>() {
                Ok(parts) => self.gain_parts = parts,
                Err(_) => self.invalid(key, value, "expected simple or cash_in"),
            },
            "account_long_term_gains" => match value.parse::<u64>() {
                Ok(id) => self.account_long_term_gains = Some(AccountId(id)),
                Err(_) => self.invalid(key, value, "expected an account id"),
            },
            "account_short_term_gains" => match value.parse::<u64>() {
                Ok(id) => self.account_short_term_gains = Some(AccountId(id)),
                Err(_) => self.invalid(key, value, "expected an account id"),
            },
            _ => {
                // Unknown options go to custom map
                self.custom.insert(key.to_string(), value.to_string());
            }
        }
    }

    /// Get a custom option value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.custom.get(key).map(String::as_str)
    }

    fn invalid(&mut self, key: &str, value: &str, expected: &str) {
        self.warnings.push(OptionWarning {
            code: "E7002",
            message: format!("Invalid value \"{value}\" for option \"{key}\": {expected}"),
            option: key.to_string(),
            value: value.to_string(),
        });
    }
}

/// Split a `key=value` command-line option.
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got \"{s}\""))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing option name in \"{s}\""));
    }
    Ok((key.to_string(), value.trim().to_string()))
}
