//! Wire types for the remote plant store.
//!
//! Records use `id`, `name`, `interval` and `lastWatered`. The canonical
//! identifier field is `id`; `_id` is read when `id` is absent.
//!
//! Inbound records are decoded one at a time from loose JSON so a single
//! malformed record never hides the rest of a listing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::RemoteError;
use crate::models::{validate_interval, validate_name, Plant, PlantError, SyncState};

/// A plant record as exchanged with the remote store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotePlant {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub interval: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_watered: Option<DateTime<Utc>>,
}

impl TryFrom<&Value> for RemotePlant {
    type Error = RemoteError;

    /// Reads a record leniently: a missing or null name becomes empty and an
    /// unreadable interval becomes 0, both rejected later by
    /// [`to_plant`](RemotePlant::to_plant). Only a non-object record or a
    /// `lastWatered` that is not RFC 3339 fails here.
    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        let record = value
            .as_object()
            .ok_or_else(|| RemoteError::Protocol(format!("plant record is not an object: {}", value)))?;

        Ok(Self {
            id: record_id(record),
            name: record
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            interval: record.get("interval").and_then(parse_interval).unwrap_or(0),
            last_watered: last_watered(record)?,
        })
    }
}

impl RemotePlant {
    /// Validates the record and converts it into a synced plant.
    ///
    /// A missing `lastWatered` falls back to `now`. A record without an id is
    /// kept as [`SyncState::NoRemoteId`]: the store holds it, but it cannot be
    /// addressed remotely.
    pub fn to_plant(&self, now: DateTime<Utc>) -> Result<Plant, PlantError> {
        let plant = Plant {
            local_id: uuid::Uuid::new_v4(),
            remote_id: None,
            name: validate_name(&self.name)?,
            interval_days: validate_interval(self.interval)?,
            last_watered_at: self.last_watered.unwrap_or(now),
            sync: SyncState::NoRemoteId,
        };

        Ok(match &self.id {
            Some(id) if !id.is_empty() => plant.with_remote_id(id.clone()),
            _ => plant,
        })
    }
}

impl From<&Plant> for RemotePlant {
    fn from(plant: &Plant) -> Self {
        Self {
            id: plant.remote_id.clone(),
            name: plant.name.clone(),
            interval: i64::from(plant.interval_days.get()),
            last_watered: Some(plant.last_watered_at),
        }
    }
}

/// Body of a create request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlant {
    pub name: String,
    pub interval: u32,
    pub last_watered: DateTime<Utc>,
}

impl From<&Plant> for NewPlant {
    fn from(plant: &Plant) -> Self {
        Self {
            name: plant.name.clone(),
            interval: plant.interval_days.get(),
            last_watered: plant.last_watered_at,
        }
    }
}

/// Listing response: either a bare array or an object wrapping it.
///
/// Elements stay raw until [`into_plants`](PlantListing::into_plants).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PlantListing {
    Bare(Vec<Value>),
    Wrapped {
        #[serde(default)]
        plants: Vec<Value>,
    },
}

impl PlantListing {
    /// Decodes every element, dropping the ones that cannot be read.
    pub fn into_plants(self) -> Vec<RemotePlant> {
        let records = match self {
            PlantListing::Bare(records) => records,
            PlantListing::Wrapped { plants } => plants,
        };

        records
            .iter()
            .filter_map(|value| match RemotePlant::try_from(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!("Dropping unreadable remote plant: {}", e);
                    None
                }
            })
            .collect()
    }
}

/// Error body returned by the store on non-success responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Reads a watering interval the way the store does: numbers are truncated,
/// numeric strings are parsed, anything else is rejected.
pub fn parse_interval(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.trunc() as i64),
        _ => None,
    }
}

/// `id` first, then `_id`. Empty strings count as missing.
fn record_id(record: &Map<String, Value>) -> Option<String> {
    ["id", "_id"].iter().find_map(|key| match record.get(*key) {
        Some(Value::String(id)) if !id.trim().is_empty() => Some(id.clone()),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    })
}

fn last_watered(record: &Map<String, Value>) -> Result<Option<DateTime<Utc>>, RemoteError> {
    match record.get("lastWatered") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(raw)) => DateTime::parse_from_rfc3339(raw)
            .map(|at| Some(at.with_timezone(&Utc)))
            .map_err(|e| RemoteError::Protocol(format!("invalid lastWatered '{}': {}", raw, e))),
        Some(other) => Err(RemoteError::Protocol(format!("invalid lastWatered: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_listing_bare_array() {
        let listing: PlantListing = serde_json::from_value(json!([
            {"id": "a", "name": "Fern", "interval": 3, "lastWatered": "2025-01-01T08:00:00Z"}
        ]))
        .unwrap();

        let plants = listing.into_plants();
        assert_eq!(plants.len(), 1);
        assert_eq!(plants[0].id.as_deref(), Some("a"));
        assert_eq!(plants[0].interval, 3);
    }

    #[test]
    fn test_listing_wrapped_object() {
        let listing: PlantListing = serde_json::from_value(json!({
            "success": true,
            "plants": [{"_id": "b", "name": "Basil", "interval": "2"}]
        }))
        .unwrap();

        let plants = listing.into_plants();
        assert_eq!(plants[0].id.as_deref(), Some("b"));
        assert_eq!(plants[0].interval, 2);
        assert!(plants[0].last_watered.is_none());
    }

    #[test]
    fn test_listing_wrapper_without_plants_is_empty() {
        let listing: PlantListing = serde_json::from_value(json!({"count": 0})).unwrap();
        assert!(listing.into_plants().is_empty());
    }

    #[test]
    fn test_to_plant_adopts_remote_fields() {
        let watered = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
        let record = RemotePlant {
            id: Some("a".into()),
            name: "Fern".into(),
            interval: 3,
            last_watered: Some(watered),
        };

        let plant = record.to_plant(Utc::now()).unwrap();
        assert_eq!(plant.remote_id.as_deref(), Some("a"));
        assert_eq!(plant.interval_days.get(), 3);
        assert_eq!(plant.last_watered_at, watered);
        assert_eq!(plant.sync, SyncState::Synced);
    }

    #[test]
    fn test_to_plant_defaults_missing_timestamp() {
        let now = Utc::now();
        let record = RemotePlant {
            id: Some("a".into()),
            name: "Fern".into(),
            interval: 3,
            last_watered: None,
        };
        assert_eq!(record.to_plant(now).unwrap().last_watered_at, now);
    }

    #[test]
    fn test_to_plant_rejects_invalid_records() {
        let zero = RemotePlant {
            id: Some("a".into()),
            name: "Fern".into(),
            interval: 0,
            last_watered: None,
        };
        assert!(zero.to_plant(Utc::now()).is_err());

        let unnamed = RemotePlant {
            id: Some("a".into()),
            name: " ".into(),
            interval: 2,
            last_watered: None,
        };
        assert!(unnamed.to_plant(Utc::now()).is_err());
    }

    #[test]
    fn test_to_plant_without_id_is_flagged() {
        let record = RemotePlant {
            id: None,
            name: "Fern".into(),
            interval: 3,
            last_watered: None,
        };
        let plant = record.to_plant(Utc::now()).unwrap();
        assert!(plant.remote_id.is_none());
        assert_eq!(plant.sync, SyncState::NoRemoteId);
    }

    #[test]
    fn test_listing_drops_only_unreadable_records() {
        let listing: PlantListing = serde_json::from_value(json!([
            {"_id": "a", "name": null, "interval": 3},
            {"_id": "b", "name": "Basil", "interval": 2},
            {"_id": "c", "name": "Mint", "interval": 4, "lastWatered": "garbage"},
            "not a plant",
            {"_id": "d", "id": "d", "name": "Fern", "interval": 3, "lastWatered": "2025-01-01T08:00:00Z"}
        ]))
        .unwrap();

        let plants = listing.into_plants();
        let ids: Vec<_> = plants.iter().map(|p| p.id.as_deref()).collect();
        assert_eq!(ids, vec![Some("a"), Some("b"), Some("d")]);
        // A null name survives decoding and is rejected as a plant instead.
        assert!(plants[0].to_plant(Utc::now()).is_err());
        assert_eq!(plants[1].name, "Basil");
    }

    #[test]
    fn test_record_prefers_id_over_underscore_id() {
        let both = RemotePlant::try_from(&json!({"_id": "mongo", "id": "virtual", "name": "Fern", "interval": 3})).unwrap();
        assert_eq!(both.id.as_deref(), Some("virtual"));

        let fallback = RemotePlant::try_from(&json!({"_id": "mongo", "id": "", "name": "Fern", "interval": 3})).unwrap();
        assert_eq!(fallback.id.as_deref(), Some("mongo"));

        let numeric = RemotePlant::try_from(&json!({"id": 7, "name": "Fern", "interval": 3})).unwrap();
        assert_eq!(numeric.id.as_deref(), Some("7"));
    }

    #[test]
    fn test_record_rejects_unparsable_timestamp() {
        let err = RemotePlant::try_from(&json!({"id": "a", "name": "Fern", "interval": 3, "lastWatered": 12})).unwrap_err();
        assert!(matches!(err, RemoteError::Protocol(_)));
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval(&json!(4)), Some(4));
        assert_eq!(parse_interval(&json!(4.7)), Some(4));
        assert_eq!(parse_interval(&json!(" 5 ")), Some(5));
        assert_eq!(parse_interval(&json!("abc")), None);
        assert_eq!(parse_interval(&json!(null)), None);
    }

    #[test]
    fn test_new_plant_uses_wire_field_names() {
        let plant = Plant::new("Fern", 3).unwrap();
        let value = serde_json::to_value(NewPlant::from(&plant)).unwrap();
        assert_eq!(value["name"], "Fern");
        assert_eq!(value["interval"], 3);
        assert!(value.get("lastWatered").is_some());
    }
}
