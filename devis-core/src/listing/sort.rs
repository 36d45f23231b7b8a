use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::calculations::common::or_zero;
use crate::models::PersistedProposal;

/// Key compared numerically; every other key compares as text.
pub const NUMERIC_SORT_KEY: &str = "prime_seule_tarif_duo";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: Option<String>,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(
        key: impl Into<String>,
        direction: SortDirection,
    ) -> Self {
        Self {
            key: Some(key.into()),
            direction,
        }
    }

    /// Sorting applied right after the listing is fetched.
    pub fn latest_first() -> Self {
        Self::new("opportunity_number", SortDirection::Descending)
    }

    /// Header click: the same key flips the direction, a new key starts
    /// ascending.
    pub fn request(
        &mut self,
        key: &str,
    ) {
        if self.key.as_deref() == Some(key) {
            self.direction = self.direction.toggled();
        } else {
            self.key = Some(key.to_string());
            self.direction = SortDirection::Ascending;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn compare(
        &self,
        a: &PersistedProposal,
        b: &PersistedProposal,
    ) -> Ordering {
        let Some(key) = self.key.as_deref() else {
            return Ordering::Equal;
        };
        let ordering = if key == NUMERIC_SORT_KEY {
            or_zero(a.prime_seule_tarif_duo).cmp(&or_zero(b.prime_seule_tarif_duo))
        } else {
            a.field_value(key)
                .as_text()
                .to_lowercase()
                .cmp(&b.field_value(key).as_text().to_lowercase())
        };
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}
