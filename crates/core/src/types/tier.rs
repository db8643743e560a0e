//! Loyalty tier ladder.
//!
//! Guests climb one season per recorded stay and stay on the top rung once
//! they reach it. Stored labels come from staff input and an older system, so
//! matching is done on a normalized key rather than the raw text.

use core::fmt;

use serde::{Deserialize, Serialize};

/// One rung of the four-season loyalty ladder, in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LoyaltyTier {
    #[default]
    FirstSeason,
    SecondSeason,
    ThirdSeason,
    FourthSeason,
}

impl LoyaltyTier {
    /// All tiers, lowest first.
    pub const LADDER: [Self; 4] = [
        Self::FirstSeason,
        Self::SecondSeason,
        Self::ThirdSeason,
        Self::FourthSeason,
    ];

    /// Normalized lookup key (lowercase, single spaces).
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::FirstSeason => "1 сезон",
            Self::SecondSeason => "2 сезона",
            Self::ThirdSeason => "3 сезона",
            Self::FourthSeason => "4 сезона",
        }
    }

    /// Label shown to staff and stored on new rows.
    #[must_use]
    pub const fn display_label(self) -> &'static str {
        match self {
            Self::FirstSeason => "1 СЕЗОН",
            Self::SecondSeason => "2 СЕЗОНА",
            Self::ThirdSeason => "3 СЕЗОНА",
            Self::FourthSeason => "4 СЕЗОНА",
        }
    }

    /// Match a stored label against the ladder.
    ///
    /// Returns `None` for blank or unknown labels.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = normalize_tier_label(label);
        Self::LADDER
            .into_iter()
            .find(|tier| tier.key() == normalized)
    }

    /// The tier after this one, saturating at the top.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::FirstSeason => Self::SecondSeason,
            Self::SecondSeason => Self::ThirdSeason,
            Self::ThirdSeason | Self::FourthSeason => Self::FourthSeason,
        }
    }

    /// The tier a guest reaches on their next stay.
    ///
    /// Unknown or missing labels mean a new guest, who starts on the first
    /// rung rather than advancing.
    #[must_use]
    pub fn resolve_next(current: Option<&str>) -> Self {
        current
            .and_then(Self::from_label)
            .map_or(Self::FirstSeason, Self::next)
    }
}

impl fmt::Display for LoyaltyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_label())
    }
}

/// Trim, lowercase and collapse whitespace runs to single spaces.
#[must_use]
pub fn normalize_tier_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Display label of the tier following `current`.
///
/// ```
/// use loyalty_core::next_tier_label;
///
/// assert_eq!(next_tier_label(Some("1 сезон")), "2 СЕЗОНА");
/// assert_eq!(next_tier_label(Some("4 СЕЗОНА")), "4 СЕЗОНА");
/// assert_eq!(next_tier_label(None), "1 СЕЗОН");
/// ```
#[must_use]
pub fn next_tier_label(current: Option<&str>) -> &'static str {
    LoyaltyTier::resolve_next(current).display_label()
}
