use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use rust_decimal::Decimal;

use crate::models::{MappedRow, TransactionRecord};
use crate::vendor::VendorProfile;

// ---------------------------------------------------------------------------
// Field parsers
// ---------------------------------------------------------------------------

// Two-digit years go first: `%Y` would happily read "23" as year 23.
const DATE_FORMATS: &[&str] = &[
    "%m/%d/%y",
    "%m/%d/%Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m-%d-%Y",
    "%d %b %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
];

/// Permissive calendar-date parser. Time components are discarded.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

fn is_numeric_literal(s: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(s))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedAmount {
    Exact(Decimal),
    /// A valid number `Decimal` cannot hold, clamped to `Decimal::MAX`/`MIN`
    /// (or zero when it underflows).
    Clamped(Decimal),
    NotNumeric,
}

/// Plain or scientific decimal notation. Currency symbols, thousands
/// separators and digit underscores are not accepted.
pub fn parse_amount(raw: &str) -> ParsedAmount {
    let s = raw.trim();
    if !is_numeric_literal(s) {
        return ParsedAmount::NotNumeric;
    }
    let exact = Decimal::from_str(s).or_else(|_| Decimal::from_scientific(&s.replace('E', "e")));
    if let Ok(value) = exact {
        return ParsedAmount::Exact(value);
    }
    let magnitude_above_one = s.parse::<f64>().is_ok_and(|f| f.abs() >= 1.0);
    let clamped = match (magnitude_above_one, s.starts_with('-')) {
        (false, _) => Decimal::ZERO,
        (true, false) => Decimal::MAX,
        (true, true) => Decimal::MIN,
    };
    ParsedAmount::Clamped(clamped)
}

// ---------------------------------------------------------------------------
// Coercion with explicit defaulting
// ---------------------------------------------------------------------------

/// A coerced value plus whether it was substituted for input that could not be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coerced<T> {
    pub value: T,
    pub defaulted: bool,
}

/// Null stays null without counting as defaulted; unparseable text becomes null and does.
pub fn coerce_date(raw: Option<&str>) -> Coerced<Option<NaiveDate>> {
    match raw {
        None => Coerced { value: None, defaulted: false },
        Some(s) => {
            let value = parse_date(s);
            Coerced { value, defaulted: value.is_none() }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoercedAmount {
    pub value: Decimal,
    pub defaulted: bool,
    pub clamped: bool,
}

/// Anything that is not a number, including null, becomes zero. Numbers
/// outside `Decimal`'s range are clamped, not defaulted.
pub fn coerce_amount(raw: Option<&str>) -> CoercedAmount {
    match raw.map(parse_amount) {
        Some(ParsedAmount::Exact(value)) => CoercedAmount { value, defaulted: false, clamped: false },
        Some(ParsedAmount::Clamped(value)) => CoercedAmount { value, defaulted: false, clamped: true },
        Some(ParsedAmount::NotNumeric) | None => {
            CoercedAmount { value: Decimal::ZERO, defaulted: true, clamped: false }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoercionStats {
    pub rows: usize,
    pub transaction_dates_defaulted: usize,
    pub clearing_dates_defaulted: usize,
    pub amounts_defaulted: usize,
    pub amounts_clamped: usize,
}

impl CoercionStats {
    pub fn defaulted_fields(&self) -> usize {
        self.transaction_dates_defaulted + self.clearing_dates_defaulted + self.amounts_defaulted
    }

    pub fn merge(&mut self, other: &CoercionStats) {
        self.rows += other.rows;
        self.transaction_dates_defaulted += other.transaction_dates_defaulted;
        self.clearing_dates_defaulted += other.clearing_dates_defaulted;
        self.amounts_defaulted += other.amounts_defaulted;
        self.amounts_clamped += other.amounts_clamped;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoercedBatch {
    pub records: Vec<TransactionRecord>,
    pub stats: CoercionStats,
}

/// Convert mapped rows to typed records stamped with the profile's source label.
/// Never fails: bad field values degrade and are counted in `stats`.
pub fn coerce_rows(rows: &[MappedRow], profile: VendorProfile) -> CoercedBatch {
    let mut stats = CoercionStats::default();
    let mut records = Vec::with_capacity(rows.len());

    for row in rows {
        let transaction_date = coerce_date(row.transaction_date.as_deref());
        let clearing_date = coerce_date(row.clearing_date.as_deref());
        let amount = coerce_amount(row.amount.as_deref());

        stats.rows += 1;
        stats.transaction_dates_defaulted += usize::from(transaction_date.defaulted);
        stats.clearing_dates_defaulted += usize::from(clearing_date.defaulted);
        stats.amounts_defaulted += usize::from(amount.defaulted);
        stats.amounts_clamped += usize::from(amount.clamped);

        records.push(TransactionRecord {
            transaction_date: transaction_date.value,
            clearing_date: clearing_date.value,
            description: row.description.clone(),
            category: row.category.clone(),
            amount: amount.value,
            source: profile,
        });
    }

    CoercedBatch { records, stats }
}
