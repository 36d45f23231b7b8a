use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::wire;
use super::{GuaranteeType, OuvrageDestination, ProposalId, WorkType};

/// A proposal as returned by the store.
///
/// Decoding is lenient: decimals may be strings or numbers, flags may be
/// booleans or `"true"`/`"false"`, and anything missing takes the draft
/// default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedProposal {
    pub id: ProposalId,

    // Editable fields
    #[serde(default, deserialize_with = "wire::lenient_string")]
    pub opportunity_number: String,
    #[serde(default, deserialize_with = "wire::lenient_string")]
    pub client_name: String,
    #[serde(default)]
    pub guarantee_type: GuaranteeType,
    #[serde(default, with = "wire::destination")]
    pub ouvrage_destination: Option<OuvrageDestination>,
    #[serde(default)]
    pub work_type: WorkType,
    #[serde(default, deserialize_with = "wire::lenient_decimal")]
    pub ouvrage_cost: Option<Decimal>,
    #[serde(default, deserialize_with = "wire::lenient_string")]
    pub address_chantier: String,
    #[serde(default, deserialize_with = "wire::lenient_string")]
    pub ouvrage_description: String,
    #[serde(default, deserialize_with = "wire::lenient_bool")]
    pub existing_presence: bool,
    #[serde(default, deserialize_with = "wire::lenient_bool")]
    pub is_vip_client: bool,
    #[serde(default, deserialize_with = "wire::lenient_bool")]
    pub rcmo_desired: bool,
    #[serde(default, deserialize_with = "wire::lenient_decimal")]
    pub trc_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "wire::lenient_decimal")]
    pub do_rate: Option<Decimal>,

    // Server-computed premiums
    #[serde(default, deserialize_with = "wire::lenient_decimal")]
    pub prime_seule_tarif_trc: Option<Decimal>,
    #[serde(default, deserialize_with = "wire::lenient_decimal")]
    pub prime_seule_tarif_do: Option<Decimal>,
    #[serde(default, deserialize_with = "wire::lenient_decimal")]
    pub prime_seule_tarif_duo: Option<Decimal>,

    #[serde(default, deserialize_with = "wire::lenient_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "wire::lenient_datetime")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A record field looked up by its wire name, for filtering and sorting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Number(Decimal),
    Flag(bool),
    Missing,
}

impl FieldValue {
    /// String form used for substring matching and string ordering.
    /// `Missing` renders as the empty string.
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => n.to_string(),
            Self::Flag(b) => b.to_string(),
            Self::Missing => String::new(),
        }
    }
}

fn opt_number(value: Option<Decimal>) -> FieldValue {
    value.map(FieldValue::Number).unwrap_or(FieldValue::Missing)
}

impl PersistedProposal {
    pub fn field_value(
        &self,
        key: &str,
    ) -> FieldValue {
        match key {
            "id" => FieldValue::Number(Decimal::from(self.id)),
            "opportunity_number" => FieldValue::Text(self.opportunity_number.clone()),
            "client_name" => FieldValue::Text(self.client_name.clone()),
            "guarantee_type" => FieldValue::Text(self.guarantee_type.as_str().to_string()),
            "ouvrage_destination" => self
                .ouvrage_destination
                .map(|d| FieldValue::Text(d.as_str().to_string()))
                .unwrap_or(FieldValue::Missing),
            "work_type" => FieldValue::Text(self.work_type.as_str().to_string()),
            "ouvrage_cost" => opt_number(self.ouvrage_cost),
            "address_chantier" => FieldValue::Text(self.address_chantier.clone()),
            "ouvrage_description" => FieldValue::Text(self.ouvrage_description.clone()),
            "existing_presence" => FieldValue::Flag(self.existing_presence),
            "is_vip_client" => FieldValue::Flag(self.is_vip_client),
            "rcmo_desired" => FieldValue::Flag(self.rcmo_desired),
            "trc_rate" => opt_number(self.trc_rate),
            "do_rate" => opt_number(self.do_rate),
            "prime_seule_tarif_trc" => opt_number(self.prime_seule_tarif_trc),
            "prime_seule_tarif_do" => opt_number(self.prime_seule_tarif_do),
            "prime_seule_tarif_duo" => opt_number(self.prime_seule_tarif_duo),
            "created_at" => self
                .created_at
                .map(|t| FieldValue::Text(t.to_rfc3339()))
                .unwrap_or(FieldValue::Missing),
            "updated_at" => self
                .updated_at
                .map(|t| FieldValue::Text(t.to_rfc3339()))
                .unwrap_or(FieldValue::Missing),
            _ => FieldValue::Missing,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn decodes_api_record_with_string_decimals() {
        let record: PersistedProposal = serde_json::from_str(
            r#"{
                "id": 7,
                "opportunity_number": "OPP-7",
                "client_name": "Bâtir SA",
                "guarantee_type": "DUO",
                "ouvrage_destination": "HABITATION",
                "work_type": "RENOVATIONLD",
                "ouvrage_cost": "250000.00",
                "address_chantier": "1 rue de Rivoli 75001 Paris",
                "ouvrage_description": null,
                "existing_presence": "true",
                "is_vip_client": false,
                "rcmo_desired": true,
                "trc_rate": "0.0100",
                "do_rate": 0.02,
                "prime_seule_tarif_trc": "2500.00",
                "prime_seule_tarif_do": "5000.00",
                "prime_seule_tarif_duo": "7500.00",
                "created_at": "2025-05-20T10:15:00.123456+02:00",
                "updated_at": "2025-05-21T08:00:00Z"
            }"#,
        )
        .unwrap();

        assert_eq!(record.id, 7);
        assert_eq!(record.ouvrage_destination, Some(OuvrageDestination::Habitation));
        assert_eq!(record.ouvrage_cost, Some(dec!(250000.00)));
        assert_eq!(record.ouvrage_description, "");
        assert!(record.existing_presence);
        assert_eq!(record.do_rate, Some(dec!(0.02)));
        assert_eq!(record.prime_seule_tarif_duo, Some(dec!(7500.00)));
        assert!(record.created_at.is_some());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let record: PersistedProposal = serde_json::from_str(r#"{"id": 3}"#).unwrap();

        assert_eq!(record.guarantee_type, GuaranteeType::Trc);
        assert_eq!(record.work_type, WorkType::Neuf);
        assert_eq!(record.ouvrage_destination, None);
        assert_eq!(record.prime_seule_tarif_duo, None);
        assert!(!record.rcmo_desired);
    }

    #[test]
    fn garbage_decimal_decodes_as_missing() {
        let record: PersistedProposal =
            serde_json::from_str(r#"{"id": 3, "prime_seule_tarif_duo": "n/a"}"#).unwrap();

        assert_eq!(record.field_value("prime_seule_tarif_duo"), FieldValue::Missing);
    }

    #[test]
    fn unknown_destination_does_not_sink_the_list() {
        let records: Vec<PersistedProposal> = serde_json::from_str(
            r#"[
                {"id": 1, "guarantee_type": "DO", "ouvrage_destination": "ENTREPOT"},
                {"id": 2, "guarantee_type": "DO", "ouvrage_destination": "HORS_HABITATION"}
            ]"#,
        )
        .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].ouvrage_destination, None);
        assert_eq!(records[1].ouvrage_destination, Some(OuvrageDestination::HorsHabitation));
    }

    #[test]
    fn field_value_by_key() {
        let record: PersistedProposal = serde_json::from_str(
            r#"{"id": 3, "client_name": "Dupont", "is_vip_client": true, "ouvrage_cost": 10}"#,
        )
        .unwrap();

        assert_eq!(record.field_value("client_name"), FieldValue::Text("Dupont".into()));
        assert_eq!(record.field_value("is_vip_client"), FieldValue::Flag(true));
        assert_eq!(record.field_value("ouvrage_cost"), FieldValue::Number(dec!(10)));
        assert_eq!(record.field_value("unknown"), FieldValue::Missing);
        assert_eq!(FieldValue::Missing.as_text(), "");
    }
}
