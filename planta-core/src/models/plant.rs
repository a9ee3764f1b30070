use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use thiserror::Error;
use uuid::Uuid;

use crate::schedule::compute_next_due;

/// Errors raised when a plant would violate its invariants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlantError {
    #[error("Plant name cannot be empty")]
    EmptyName,

    #[error("Watering interval must be a positive number of days, got {0}")]
    InvalidInterval(i64),
}

/// Outcome of the last exchange with the remote store for a plant.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum SyncState {
    /// The remote store has acknowledged the current local state.
    Synced,
    /// The plant has never reached the remote store.
    #[default]
    LocalOnly,
    /// The last remote call for this plant failed.
    SyncFailed(String),
    /// The remote store holds the plant but never gave it an id, so it can
    /// neither be addressed nor sent again.
    NoRemoteId,
}

impl SyncState {
    pub fn is_synced(&self) -> bool {
        matches!(self, SyncState::Synced)
    }

    /// Whether the local state still has to reach the remote store.
    pub fn needs_push(&self) -> bool {
        matches!(self, SyncState::LocalOnly | SyncState::SyncFailed(_))
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::Synced => write!(f, "synced"),
            SyncState::LocalOnly => write!(f, "local only"),
            SyncState::SyncFailed(reason) => write!(f, "sync failed: {}", reason),
            SyncState::NoRemoteId => write!(f, "stored remotely without id"),
        }
    }
}

/// A tracked houseplant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plant {
    /// Identifier assigned locally; stable for the lifetime of the entry.
    pub local_id: Uuid,
    /// Identifier issued by the remote store, once it has accepted the plant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    pub name: String,
    pub interval_days: NonZeroU32,
    pub last_watered_at: DateTime<Utc>,
    #[serde(default)]
    pub sync: SyncState,
}

impl Plant {
    /// Creates a local-only plant watered right now.
    pub fn new(name: &str, interval_days: u32) -> Result<Self, PlantError> {
        Ok(Self {
            local_id: Uuid::new_v4(),
            remote_id: None,
            name: validate_name(name)?,
            interval_days: validate_interval(i64::from(interval_days))?,
            last_watered_at: Utc::now(),
            sync: SyncState::LocalOnly,
        })
    }

    /// Attaches the remote identifier and marks the plant as synced.
    pub fn with_remote_id(mut self, remote_id: impl Into<String>) -> Self {
        self.remote_id = Some(remote_id.into());
        self.sync = SyncState::Synced;
        self
    }

    pub fn with_last_watered(mut self, at: DateTime<Utc>) -> Self {
        self.last_watered_at = at;
        self
    }

    /// Records a watering at `now`. The timestamp never moves backward.
    pub fn mark_watered(&mut self, now: DateTime<Utc>) {
        self.last_watered_at = self.last_watered_at.max(now);
    }

    /// When this plant is next due for water, in UTC.
    pub fn next_due(&self) -> DateTime<Utc> {
        compute_next_due(&self.last_watered_at, self.interval_days)
    }

    /// When this plant is next due for water, computed on the calendar of `tz`.
    pub fn next_due_in<Tz: TimeZone>(&self, tz: &Tz) -> DateTime<Tz> {
        compute_next_due(&self.last_watered_at.with_timezone(tz), self.interval_days)
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_due() <= now
    }
}

impl fmt::Display for Plant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "{}", "=".repeat(self.name.chars().count()))?;
        writeln!(f, "Water every: {} day(s)", self.interval_days)?;
        writeln!(f, "Last watered: {}", self.last_watered_at.to_rfc3339())?;
        writeln!(f, "Next watering: {}", self.next_due().format("%a %b %d %Y"))?;
        writeln!(f, "Sync: {}", self.sync)?;
        if let Some(remote_id) = &self.remote_id {
            writeln!(f, "Remote ID: {}", remote_id)?;
        }
        Ok(())
    }
}

/// Trims the name and rejects empty ones.
pub fn validate_name(name: &str) -> Result<String, PlantError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(PlantError::EmptyName);
    }
    Ok(trimmed.to_string())
}

pub fn validate_interval(days: i64) -> Result<NonZeroU32, PlantError> {
    u32::try_from(days)
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or(PlantError::InvalidInterval(days))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_plant_new() {
        let before = Utc::now();
        let plant = Plant::new("  Fern ", 3).unwrap();
        let after = Utc::now();

        assert_eq!(plant.name, "Fern");
        assert_eq!(plant.interval_days.get(), 3);
        assert!(plant.remote_id.is_none());
        assert_eq!(plant.sync, SyncState::LocalOnly);
        assert!(plant.last_watered_at >= before && plant.last_watered_at <= after);
    }

    #[test]
    fn test_plant_new_rejects_invalid_input() {
        assert_eq!(Plant::new("   ", 3).unwrap_err(), PlantError::EmptyName);
        assert_eq!(
            Plant::new("Fern", 0).unwrap_err(),
            PlantError::InvalidInterval(0)
        );
    }

    #[test]
    fn test_validate_interval_bounds() {
        assert!(validate_interval(-1).is_err());
        assert!(validate_interval(i64::from(u32::MAX) + 1).is_err());
        assert_eq!(validate_interval(7).unwrap().get(), 7);
    }

    #[test]
    fn test_with_remote_id_marks_synced() {
        let plant = Plant::new("Basil", 2).unwrap().with_remote_id("abc");
        assert_eq!(plant.remote_id.as_deref(), Some("abc"));
        assert!(plant.sync.is_synced());
    }

    #[test]
    fn test_mark_watered_never_goes_backward() {
        let now = Utc::now();
        let mut plant = Plant::new("Cactus", 14)
            .unwrap()
            .with_last_watered(now + Duration::hours(1));

        plant.mark_watered(now);
        assert_eq!(plant.last_watered_at, now + Duration::hours(1));

        plant.mark_watered(now + Duration::hours(2));
        assert_eq!(plant.last_watered_at, now + Duration::hours(2));
    }

    #[test]
    fn test_is_due() {
        let now = Utc::now();
        let plant = Plant::new("Mint", 2)
            .unwrap()
            .with_last_watered(now - Duration::days(3));
        assert!(plant.is_due(now));

        let fresh = Plant::new("Mint", 2).unwrap().with_last_watered(now);
        assert!(!fresh.is_due(now));
    }

    #[test]
    fn test_sync_state_serialization() {
        let json = serde_json::to_string(&SyncState::SyncFailed("offline".into())).unwrap();
        assert_eq!(json, r#"{"state":"sync_failed","reason":"offline"}"#);

        let parsed: SyncState = serde_json::from_str(r#"{"state":"synced"}"#).unwrap();
        assert_eq!(parsed, SyncState::Synced);

        let json = serde_json::to_string(&SyncState::NoRemoteId).unwrap();
        assert_eq!(json, r#"{"state":"no_remote_id"}"#);
    }

    #[test]
    fn test_needs_push() {
        assert!(SyncState::LocalOnly.needs_push());
        assert!(SyncState::SyncFailed("offline".into()).needs_push());
        assert!(!SyncState::Synced.needs_push());
        assert!(!SyncState::NoRemoteId.needs_push());
    }

    #[test]
    fn test_plant_display() {
        let plant = Plant::new("Monstera", 7).unwrap();
        let output = format!("{}", plant);
        assert!(output.contains("Monstera"));
        assert!(output.contains("7 day(s)"));
        assert!(output.contains("local only"));
    }

    #[test]
    fn test_zero_interval_rejected_when_deserializing() {
        let json = format!(
            r#"{{"local_id":"{}","name":"Fern","interval_days":0,"last_watered_at":"2025-01-01T00:00:00Z"}}"#,
            Uuid::new_v4()
        );
        assert!(serde_json::from_str::<Plant>(&json).is_err());
    }
}
