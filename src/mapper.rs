use crate::models::{Column, MappedRow, RawRow};
use crate::vendor::VendorProfile;

/// Cell contents read as null, in addition to the empty string.
const NULL_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>",
    "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn cell(raw: &str) -> Option<String> {
    if raw.is_empty() || NULL_TOKENS.contains(&raw) {
        None
    } else {
        Some(raw.to_string())
    }
}

/// Rename one raw row into the canonical layout for `profile`.
///
/// A canonical column is filled from the first source header in the profile's
/// rename table that holds a value, then from a header already carrying the
/// canonical name, and is otherwise null. Columns the profile synthesizes are
/// always null. Unmapped source columns are dropped.
pub fn map_row(row: &RawRow, profile: VendorProfile) -> MappedRow {
    let mut out = MappedRow::default();
    for col in Column::MAPPED {
        let value = if profile.synthesized().contains(&col) {
            None
        } else {
            profile
                .column_map()
                .iter()
                .filter(|(_, target)| *target == col)
                .find_map(|(header, _)| row.get(*header).and_then(|v| cell(v)))
                .or_else(|| row.get(col.name()).and_then(|v| cell(v)))
        };
        if let Some(slot) = out.slot_mut(col) {
            *slot = value;
        }
    }
    out
}

pub fn map_rows(rows: &[RawRow], profile: VendorProfile) -> Vec<MappedRow> {
    rows.iter().map(|row| map_row(row, profile)).collect()
}
