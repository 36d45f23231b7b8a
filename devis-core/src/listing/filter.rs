use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::common::{or_zero, round_half_up};
use crate::models::{FieldValue, PersistedProposal, wire};

pub const PRICE_MIN: &str = "prime_price_min";
pub const PRICE_MAX: &str = "prime_price_max";

/// Keys offered by the listing filter panel.
pub const FILTER_KEYS: &[&str] = &[
    "opportunity_number",
    "client_name",
    "guarantee_type",
    "ouvrage_destination",
    "work_type",
    PRICE_MIN,
    PRICE_MAX,
    "existing_presence",
    "is_vip_client",
    "rcmo_desired",
];

/// Active listing filters, field name to predicate text. A blank predicate
/// is inactive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    values: BTreeMap<String, String>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        let key = key.into();
        let value = value.into();
        if value.trim().is_empty() {
            self.values.remove(&key);
        } else {
            self.values.insert(key, value);
        }
    }

    pub fn clear(
        &mut self,
        key: &str,
    ) {
        self.values.remove(key);
    }

    pub fn reset(&mut self) {
        self.values.clear();
    }

    pub fn get(
        &self,
        key: &str,
    ) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn active(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Whether `record` satisfies every active criterion.
    pub fn matches(
        &self,
        record: &PersistedProposal,
    ) -> bool {
        self.active().all(|(key, value)| criterion_matches(record, key, value))
    }
}

/// Premium compared against the price bounds: absent counts as zero, and
/// the amount is taken to the cent.
fn listed_price(record: &PersistedProposal) -> Decimal {
    round_half_up(or_zero(record.prime_seule_tarif_duo))
}

fn criterion_matches(
    record: &PersistedProposal,
    key: &str,
    value: &str,
) -> bool {
    let needle = value.trim();
    match key {
        PRICE_MIN | PRICE_MAX => {
            let Some(bound) = wire::parse_decimal_text(needle) else {
                return false;
            };
            let price = listed_price(record);
            if key == PRICE_MIN { price >= bound } else { price <= bound }
        }
        _ => match record.field_value(key) {
            FieldValue::Missing => false,
            FieldValue::Flag(flag) => flag.to_string() == needle,
            other => other
                .as_text()
                .to_lowercase()
                .contains(&needle.to_lowercase()),
        },
    }
}
