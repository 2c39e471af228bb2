//! Quote-line to mission reconciliation.
//!
//! A confirmed quote owns commercial lines; dispatch works off
//! operational missions. This module keeps exactly one mission per
//! mission-worthy line without ever touching operator-owned dispatch
//! state (driver, vehicle, status). Missions reflecting real
//! operational progress are detached from deleted lines, never
//! deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::traits::{QuoteStore, StoreError};

/// Commercial classification of a quote line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuoteLineKind {
    Calculated,
    Manual,
    Group,
}

/// Trip-specific source data carried by a line or mission, keyed by
/// what the line represents so field-by-field copies stay exhaustive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineSource {
    /// A costed passenger transfer.
    Transfer {
        label: String,
        pickup_address: String,
        dropoff_address: String,
        start_at: DateTime<Utc>,
        end_at: Option<DateTime<Utc>>,
        vehicle_category: Option<String>,
    },
    /// Internal non-commercial work (repositioning, maintenance run).
    InternalTask {
        label: String,
        start_at: DateTime<Utc>,
        end_at: Option<DateTime<Utc>>,
    },
    /// A grouping line; only dispatchable when it carries timing.
    Group {
        label: String,
        start_at: Option<DateTime<Utc>>,
    },
}

impl LineSource {
    pub fn start_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Transfer { start_at, .. } | Self::InternalTask { start_at, .. } => {
                Some(*start_at)
            }
            Self::Group { start_at, .. } => *start_at,
        }
    }

    pub fn end_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Transfer { end_at, .. } | Self::InternalTask { end_at, .. } => *end_at,
            Self::Group { .. } => None,
        }
    }
}

/// A commercial quote line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteLine {
    pub id: String,
    pub kind: QuoteLineKind,
    pub source: LineSource,
}

impl QuoteLine {
    /// Whether this line should have a mission: CALCULATED always,
    /// GROUP only with explicit start timing, MANUAL never.
    pub fn is_mission_worthy(&self) -> bool {
        match self.kind {
            QuoteLineKind::Calculated => true,
            QuoteLineKind::Manual => false,
            QuoteLineKind::Group => self.source.start_at().is_some(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissionStatus {
    Pending,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

/// Operational dispatch record.
///
/// `quote_line_id` is a weak back-reference: nullable, no ownership.
/// `driver_id`, `vehicle_id` and `status` are owned by dispatch
/// tooling and are never written by the reconciler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub id: String,
    pub quote_id: String,
    pub quote_line_id: Option<String>,
    pub status: MissionStatus,
    pub driver_id: Option<String>,
    pub vehicle_id: Option<String>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub source: Option<LineSource>,
}

/// A quote with its nested lines and missions, as loaded by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: String,
    pub lines: Vec<QuoteLine>,
    pub missions: Vec<Mission>,
}

/// New mission derived from a line; always starts PENDING and
/// unassigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionDraft {
    pub quote_id: String,
    pub quote_line_id: String,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub source: LineSource,
}

/// Line-derived fields applied to an existing mission. Dispatch fields
/// are deliberately unrepresentable here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionPatch {
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub source: LineSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncErrorKind {
    CreateFailed,
    UpdateFailed,
    DeletionBlocked,
}

/// One per-item reconciliation failure; never aborts the other items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncError {
    pub kind: SyncErrorKind,
    /// The offending quote-line or mission id (or the quote id for a
    /// top-level load failure).
    pub entity_id: String,
    pub detail: String,
}

/// Counts of what one reconciliation run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub created: u32,
    pub updated: u32,
    pub deleted: u32,
    pub detached: u32,
    pub errors: Vec<SyncError>,
}

impl SyncResult {
    /// True when the run changed nothing and hit no errors.
    pub fn is_noop(&self) -> bool {
        self.created == 0
            && self.updated == 0
            && self.deleted == 0
            && self.detached == 0
            && self.errors.is_empty()
    }
}

/// Reconciles one quote's missions against its current lines.
///
/// Re-running on an unchanged quote is a no-op. The store instance is
/// assumed to be scoped to a single transaction for the quote.
pub fn sync_quote_missions<S: QuoteStore>(store: &mut S, quote_id: &str) -> SyncResult {
    let mut result = SyncResult::default();

    let quote = match store.load_quote(quote_id) {
        Ok(Some(quote)) => quote,
        Ok(None) => {
            result.errors.push(SyncError {
                kind: SyncErrorKind::UpdateFailed,
                entity_id: quote_id.to_string(),
                detail: "quote not found".to_string(),
            });
            return result;
        }
        Err(err) => {
            result.errors.push(SyncError {
                kind: SyncErrorKind::UpdateFailed,
                entity_id: quote_id.to_string(),
                detail: err.to_string(),
            });
            return result;
        }
    };

    for line in quote.lines.iter().filter(|line| line.is_mission_worthy()) {
        let existing = quote
            .missions
            .iter()
            .find(|mission| mission.quote_line_id.as_deref() == Some(line.id.as_str()));

        match existing {
            None => create_for_line(store, &quote.id, line, &mut result),
            Some(mission) => update_if_drifted(store, mission, line, &mut result),
        }
    }

    for mission in &quote.missions {
        let Some(line_id) = mission.quote_line_id.as_deref() else {
            // Already detached; operations own it now.
            continue;
        };
        let line_still_worthy = quote
            .lines
            .iter()
            .any(|line| line.id == line_id && line.is_mission_worthy());
        if !line_still_worthy {
            remove_or_detach(store, mission, &mut result);
        }
    }

    debug!(
        quote_id,
        created = result.created,
        updated = result.updated,
        deleted = result.deleted,
        detached = result.detached,
        errors = result.errors.len(),
        "quote missions reconciled"
    );
    result
}

fn create_for_line<S: QuoteStore>(
    store: &mut S,
    quote_id: &str,
    line: &QuoteLine,
    result: &mut SyncResult,
) {
    let draft = MissionDraft {
        quote_id: quote_id.to_string(),
        quote_line_id: line.id.clone(),
        start_at: line.source.start_at(),
        end_at: line.source.end_at(),
        source: line.source.clone(),
    };
    match store.create_mission(draft) {
        Ok(_) => result.created += 1,
        Err(err) => result.errors.push(SyncError {
            kind: SyncErrorKind::CreateFailed,
            entity_id: line.id.clone(),
            detail: err.to_string(),
        }),
    }
}

fn update_if_drifted<S: QuoteStore>(
    store: &mut S,
    mission: &Mission,
    line: &QuoteLine,
    result: &mut SyncResult,
) {
    let desired = MissionPatch {
        start_at: line.source.start_at(),
        end_at: line.source.end_at(),
        source: line.source.clone(),
    };

    let drifted = mission.start_at != desired.start_at
        || mission.end_at != desired.end_at
        || mission.source.as_ref() != Some(&desired.source);
    if !drifted {
        return;
    }

    match store.update_mission(&mission.id, desired) {
        Ok(()) => result.updated += 1,
        Err(err) => result.errors.push(SyncError {
            kind: SyncErrorKind::UpdateFailed,
            entity_id: mission.id.clone(),
            detail: err.to_string(),
        }),
    }
}

fn remove_or_detach<S: QuoteStore>(store: &mut S, mission: &Mission, result: &mut SyncResult) {
    match mission.status {
        // Never actioned: safe to remove outright.
        MissionStatus::Pending => match store.delete_mission(&mission.id) {
            Ok(()) => result.deleted += 1,
            Err(err) => result.errors.push(SyncError {
                kind: SyncErrorKind::DeletionBlocked,
                entity_id: mission.id.clone(),
                detail: err.to_string(),
            }),
        },
        // The mission reflects operational work (or an operator's
        // explicit cancellation): keep the record, drop the link.
        MissionStatus::Assigned
        | MissionStatus::InProgress
        | MissionStatus::Completed
        | MissionStatus::Cancelled => match store.detach_mission(&mission.id) {
            Ok(()) => result.detached += 1,
            Err(err) => result.errors.push(SyncError {
                kind: SyncErrorKind::UpdateFailed,
                entity_id: mission.id.clone(),
                detail: err.to_string(),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_calculated_line_is_mission_worthy() {
        let line = QuoteLine {
            id: "l1".to_string(),
            kind: QuoteLineKind::Calculated,
            source: LineSource::Transfer {
                label: "Airport pickup".to_string(),
                pickup_address: "CDG T2".to_string(),
                dropoff_address: "Hotel Lutetia".to_string(),
                start_at: t(9),
                end_at: Some(t(10)),
                vehicle_category: None,
            },
        };
        assert!(line.is_mission_worthy());
    }

    #[test]
    fn test_manual_line_is_never_mission_worthy() {
        let line = QuoteLine {
            id: "l2".to_string(),
            kind: QuoteLineKind::Manual,
            source: LineSource::Group {
                label: "Extra fee".to_string(),
                start_at: Some(t(9)),
            },
        };
        assert!(!line.is_mission_worthy());
    }

    #[test]
    fn test_group_line_needs_explicit_timing() {
        let untimed = QuoteLine {
            id: "l3".to_string(),
            kind: QuoteLineKind::Group,
            source: LineSource::Group {
                label: "Day 1".to_string(),
                start_at: None,
            },
        };
        assert!(!untimed.is_mission_worthy());

        let timed = QuoteLine {
            id: "l4".to_string(),
            kind: QuoteLineKind::Group,
            source: LineSource::Group {
                label: "Day 1".to_string(),
                start_at: Some(t(8)),
            },
        };
        assert!(timed.is_mission_worthy());
    }

    #[test]
    fn test_line_source_serializes_tagged() {
        let source = LineSource::InternalTask {
            label: "Garage run".to_string(),
            start_at: t(7),
            end_at: None,
        };
        let json = serde_json::to_value(&source).unwrap();
        assert_eq!(json["kind"], "internal_task");
        assert_eq!(json["label"], "Garage run");
    }
}
