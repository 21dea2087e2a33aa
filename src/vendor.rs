use crate::error::{LoaderError, Result};
use crate::models::Column;

// ---------------------------------------------------------------------------
// Vendor profiles: enum dispatch, each variant carries its layout as data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VendorProfile {
    AppleCard,
    DiscoverCard,
    FifthThirdBank,
}

impl VendorProfile {
    /// Value written to the `Source` column.
    pub fn label(&self) -> &'static str {
        match self {
            Self::AppleCard => "Apple Card",
            Self::DiscoverCard => "Discover Card",
            Self::FifthThirdBank => "5/3 Bank",
        }
    }

    /// File-name prefix the upstream export tool gives this vendor's files.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::AppleCard => "Apple Card",
            Self::DiscoverCard => "Discover",
            Self::FifthThirdBank => "EXPORT",
        }
    }

    pub fn matches(&self, file_name: &str) -> bool {
        file_name.starts_with(self.prefix())
    }

    /// Source header → canonical column. Earlier entries win when several
    /// headers target the same column.
    pub fn column_map(&self) -> &'static [(&'static str, Column)] {
        match self {
            Self::AppleCard => &[
                ("Transaction Date", Column::TransactionDate),
                ("Clearing Date", Column::ClearingDate),
                ("Description", Column::Description),
                ("Category", Column::Category),
                ("Amount (USD)", Column::Amount),
                ("Amount", Column::Amount),
            ],
            Self::DiscoverCard => &[
                ("Trans. Date", Column::TransactionDate),
                ("Post Date", Column::ClearingDate),
                ("Description", Column::Description),
                ("Category", Column::Category),
                ("Amount (USD)", Column::Amount),
                ("Amount", Column::Amount),
            ],
            Self::FifthThirdBank => &[
                ("Date", Column::TransactionDate),
                ("Description", Column::Description),
                ("Amount", Column::Amount),
            ],
        }
    }

    /// Columns this vendor never exports; always null in mapped output.
    pub fn synthesized(&self) -> &'static [Column] {
        match self {
            Self::AppleCard | Self::DiscoverCard => &[],
            Self::FifthThirdBank => &[Column::ClearingDate, Column::Category],
        }
    }
}

/// Registration order is the match order.
pub const ALL_PROFILES: &[VendorProfile] = &[
    VendorProfile::AppleCard,
    VendorProfile::DiscoverCard,
    VendorProfile::FifthThirdBank,
];

pub fn classify(file_name: &str) -> Result<VendorProfile> {
    classify_with(ALL_PROFILES, file_name)
}

/// First profile whose prefix matches wins.
pub fn classify_with(profiles: &[VendorProfile], file_name: &str) -> Result<VendorProfile> {
    profiles
        .iter()
        .find(|p| p.matches(file_name))
        .copied()
        .ok_or_else(|| LoaderError::UnrecognizedSource(file_name.to_string()))
}
