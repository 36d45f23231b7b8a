use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::wire;

/// Marker the store writes on the `status` key when a proposal is created.
pub const CREATED_STATUS: &str = "Created";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    #[serde(default)]
    pub old: Value,
    #[serde(default)]
    pub new: Value,
}

impl FieldChange {
    pub fn new(
        old: Value,
        new: Value,
    ) -> Self {
        Self { old, new }
    }
}

/// One audit record of a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    #[serde(with = "wire::history_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub user_ip: Option<String>,
    #[serde(default)]
    pub changes: BTreeMap<String, FieldChange>,
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "N/A".to_string(),
        Value::Bool(true) => "Oui".to_string(),
        Value::Bool(false) => "Non".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl HistoryEntry {
    pub fn is_creation(&self) -> bool {
        self.changes
            .get("status")
            .is_some_and(|c| c.new.as_str() == Some(CREATED_STATUS))
    }

    /// One human-readable line per changed field, in key order.
    pub fn describe_changes(&self) -> Vec<String> {
        self.changes
            .iter()
            .map(|(field, change)| {
                if field == "status" && change.new.as_str() == Some(CREATED_STATUS) {
                    "Devis créé".to_string()
                } else {
                    format!(
                        "{}: {} → {}",
                        field,
                        display_value(&change.old),
                        display_value(&change.new)
                    )
                }
            })
            .collect()
    }

    pub fn timestamp_display(&self) -> String {
        self.timestamp.format(wire::history_timestamp::FORMAT).to_string()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_history_payload() {
        let entries: Vec<HistoryEntry> = serde_json::from_value(json!([
            {
                "id": 2,
                "timestamp": "21/05/2025 09:30",
                "user_ip": "10.0.0.4",
                "changes": {"client_name": {"old": "Dupont", "new": "Dupond"}}
            },
            {
                "id": 1,
                "timestamp": "20/05/2025 10:15",
                "user_ip": null,
                "changes": {"status": {"old": null, "new": "Created"}}
            }
        ]))
        .unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].timestamp_display(), "21/05/2025 09:30");
        assert_eq!(entries[1].user_ip, None);
        assert!(entries[1].is_creation());
        assert!(!entries[0].is_creation());
    }

    #[test]
    fn describe_changes_renders_flags_and_nulls() {
        let mut changes = BTreeMap::new();
        changes.insert("is_vip_client".to_string(), FieldChange::new(json!(false), json!(true)));
        changes.insert("do_rate".to_string(), FieldChange::new(Value::Null, json!("0.02")));
        changes.insert("ouvrage_cost".to_string(), FieldChange::new(json!(1000), json!(2000)));
        let entry = HistoryEntry {
            id: 4,
            timestamp: Utc::now(),
            user_ip: None,
            changes,
        };

        assert_eq!(
            entry.describe_changes(),
            vec![
                "do_rate: N/A → 0.02".to_string(),
                "is_vip_client: Non → Oui".to_string(),
                "ouvrage_cost: 1000 → 2000".to_string(),
            ]
        );
    }

    #[test]
    fn creation_marker_renders_as_single_line() {
        let mut changes = BTreeMap::new();
        changes.insert("status".to_string(), FieldChange::new(Value::Null, json!(CREATED_STATUS)));
        let entry = HistoryEntry {
            id: 1,
            timestamp: Utc::now(),
            user_ip: Some("127.0.0.1".into()),
            changes,
        };

        assert_eq!(entry.describe_changes(), vec!["Devis créé".to_string()]);
    }
}
