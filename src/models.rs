use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::vendor::VendorProfile;

/// The canonical columns of the `BudgetTracker` table, in insert order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    TransactionDate,
    ClearingDate,
    Description,
    Category,
    Amount,
    Source,
}

impl Column {
    pub const ALL: [Column; 6] = [
        Column::TransactionDate,
        Column::ClearingDate,
        Column::Description,
        Column::Category,
        Column::Amount,
        Column::Source,
    ];

    /// Everything except `Source`, which is stamped by the coercer.
    pub const MAPPED: [Column; 5] = [
        Column::TransactionDate,
        Column::ClearingDate,
        Column::Description,
        Column::Category,
        Column::Amount,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::TransactionDate => "TransactionDate",
            Self::ClearingDate => "ClearingDate",
            Self::Description => "Description",
            Self::Category => "Category",
            Self::Amount => "Amount",
            Self::Source => "Source",
        }
    }
}

/// One CSV row as read from disk: header name to raw cell text.
pub type RawRow = HashMap<String, String>;

/// A row after column renaming: every mapped canonical column is present, possibly null.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappedRow {
    pub transaction_date: Option<String>,
    pub clearing_date: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub amount: Option<String>,
}

impl MappedRow {
    pub fn slot_mut(&mut self, column: Column) -> Option<&mut Option<String>> {
        match column {
            Column::TransactionDate => Some(&mut self.transaction_date),
            Column::ClearingDate => Some(&mut self.clearing_date),
            Column::Description => Some(&mut self.description),
            Column::Category => Some(&mut self.category),
            Column::Amount => Some(&mut self.amount),
            Column::Source => None,
        }
    }
}

#[cfg(test)]
impl MappedRow {
    pub fn columns(&self) -> [(Column, Option<&str>); 5] {
        [
            (Column::TransactionDate, self.transaction_date.as_deref()),
            (Column::ClearingDate, self.clearing_date.as_deref()),
            (Column::Description, self.description.as_deref()),
            (Column::Category, self.category.as_deref()),
            (Column::Amount, self.amount.as_deref()),
        ]
    }

    /// Back to a raw row keyed by canonical names. Null columns are omitted.
    pub fn to_raw(&self) -> RawRow {
        self.columns()
            .into_iter()
            .filter_map(|(col, v)| v.map(|v| (col.name().to_string(), v.to_string())))
            .collect()
    }
}

/// A fully normalized transaction, ready for the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub transaction_date: Option<NaiveDate>,
    pub clearing_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub amount: Decimal,
    pub source: VendorProfile,
}

impl TransactionRecord {
    /// Values in `Column::ALL` order, rendered as text for binding.
    pub fn as_row(&self) -> [Option<String>; 6] {
        [
            self.transaction_date.map(|d| d.format("%Y-%m-%d").to_string()),
            self.clearing_date.map(|d| d.format("%Y-%m-%d").to_string()),
            self.description.clone(),
            self.category.clone(),
            Some(self.amount.to_string()),
            Some(self.source.label().to_string()),
        ]
    }
}
