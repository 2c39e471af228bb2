//! Test fixtures for fleetops-core.
//!
//! Provides builders for quotes, lines, and missions, plus in-memory
//! implementations of the injected store and routing capabilities.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, TimeZone, Utc};

use fleetops_core::compliance::{ActivityDelta, CounterKey, DriverRseCounter};
use fleetops_core::reconcile::{
    LineSource, Mission, MissionDraft, MissionPatch, MissionStatus, Quote, QuoteLine,
    QuoteLineKind,
};
use fleetops_core::traits::{CounterStore, QuoteStore, StoreError};

/// A fixed timestamp on the fixture day, at the given hour.
pub fn at_hour(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 10, hour, 0, 0).unwrap()
}

/// Builder for quote lines with sensible defaults (a calculated
/// transfer starting at 09:00).
#[derive(Clone, Debug)]
pub struct LineBuilder {
    id: String,
    kind: QuoteLineKind,
    source: LineSource,
}

impl LineBuilder {
    pub fn transfer(id: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: QuoteLineKind::Calculated,
            source: LineSource::Transfer {
                label: format!("Transfer {}", id),
                pickup_address: "CDG Terminal 2E".to_string(),
                dropoff_address: "Hotel Lutetia, Paris".to_string(),
                start_at: at_hour(9),
                end_at: Some(at_hour(10)),
                vehicle_category: Some("SEDAN".to_string()),
            },
        }
    }

    pub fn manual(id: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: QuoteLineKind::Manual,
            source: LineSource::Group {
                label: format!("Manual {}", id),
                start_at: None,
            },
        }
    }

    pub fn group(id: &str, start_at: Option<DateTime<Utc>>) -> Self {
        Self {
            id: id.to_string(),
            kind: QuoteLineKind::Group,
            source: LineSource::Group {
                label: format!("Group {}", id),
                start_at,
            },
        }
    }

    pub fn starting_at(mut self, start: DateTime<Utc>) -> Self {
        match &mut self.source {
            LineSource::Transfer { start_at, .. } | LineSource::InternalTask { start_at, .. } => {
                *start_at = start;
            }
            LineSource::Group { start_at, .. } => *start_at = Some(start),
        }
        self
    }

    pub fn build(self) -> QuoteLine {
        QuoteLine {
            id: self.id,
            kind: self.kind,
            source: self.source,
        }
    }
}

/// Builder for missions; defaults to a pending, unassigned mission.
#[derive(Clone, Debug)]
pub struct MissionBuilder {
    mission: Mission,
}

impl MissionBuilder {
    pub fn for_line(id: &str, quote_id: &str, line: &QuoteLine) -> Self {
        Self {
            mission: Mission {
                id: id.to_string(),
                quote_id: quote_id.to_string(),
                quote_line_id: Some(line.id.clone()),
                status: MissionStatus::Pending,
                driver_id: None,
                vehicle_id: None,
                start_at: line.source.start_at(),
                end_at: line.source.end_at(),
                source: Some(line.source.clone()),
            },
        }
    }

    pub fn orphan(id: &str, quote_id: &str, line_id: &str) -> Self {
        Self {
            mission: Mission {
                id: id.to_string(),
                quote_id: quote_id.to_string(),
                quote_line_id: Some(line_id.to_string()),
                status: MissionStatus::Pending,
                driver_id: None,
                vehicle_id: None,
                start_at: Some(at_hour(9)),
                end_at: None,
                source: None,
            },
        }
    }

    pub fn status(mut self, status: MissionStatus) -> Self {
        self.mission.status = status;
        self
    }

    pub fn assigned_to(mut self, driver_id: &str, vehicle_id: &str) -> Self {
        self.mission.driver_id = Some(driver_id.to_string());
        self.mission.vehicle_id = Some(vehicle_id.to_string());
        self
    }

    pub fn build(self) -> Mission {
        self.mission
    }
}

/// In-memory quote/mission store with per-entity failure injection.
#[derive(Default)]
pub struct InMemoryQuoteStore {
    pub quotes: HashMap<String, Quote>,
    pub fail_create_for_lines: HashSet<String>,
    pub fail_update_for_missions: HashSet<String>,
    pub fail_delete_for_missions: HashSet<String>,
    next_id: u32,
}

impl InMemoryQuoteStore {
    pub fn with_quote(quote: Quote) -> Self {
        let mut store = Self::default();
        store.quotes.insert(quote.id.clone(), quote);
        store
    }

    pub fn mission(&self, mission_id: &str) -> Option<&Mission> {
        self.quotes
            .values()
            .flat_map(|quote| quote.missions.iter())
            .find(|mission| mission.id == mission_id)
    }

    pub fn mission_count(&self, quote_id: &str) -> usize {
        self.quotes
            .get(quote_id)
            .map(|quote| quote.missions.len())
            .unwrap_or(0)
    }
}

impl QuoteStore for InMemoryQuoteStore {
    fn load_quote(&self, quote_id: &str) -> Result<Option<Quote>, StoreError> {
        Ok(self.quotes.get(quote_id).cloned())
    }

    fn create_mission(&mut self, draft: MissionDraft) -> Result<String, StoreError> {
        if self.fail_create_for_lines.contains(&draft.quote_line_id) {
            return Err(StoreError::Backend("injected create failure".to_string()));
        }
        let quote = self
            .quotes
            .get_mut(&draft.quote_id)
            .ok_or_else(|| StoreError::NotFound(draft.quote_id.clone()))?;

        self.next_id += 1;
        let id = format!("mission-{}", self.next_id);
        quote.missions.push(Mission {
            id: id.clone(),
            quote_id: draft.quote_id,
            quote_line_id: Some(draft.quote_line_id),
            status: MissionStatus::Pending,
            driver_id: None,
            vehicle_id: None,
            start_at: draft.start_at,
            end_at: draft.end_at,
            source: Some(draft.source),
        });
        Ok(id)
    }

    fn update_mission(&mut self, mission_id: &str, patch: MissionPatch) -> Result<(), StoreError> {
        if self.fail_update_for_missions.contains(mission_id) {
            return Err(StoreError::Backend("injected update failure".to_string()));
        }
        let mission = self
            .quotes
            .values_mut()
            .flat_map(|quote| quote.missions.iter_mut())
            .find(|mission| mission.id == mission_id)
            .ok_or_else(|| StoreError::NotFound(mission_id.to_string()))?;
        mission.start_at = patch.start_at;
        mission.end_at = patch.end_at;
        mission.source = Some(patch.source);
        Ok(())
    }

    fn delete_mission(&mut self, mission_id: &str) -> Result<(), StoreError> {
        if self.fail_delete_for_missions.contains(mission_id) {
            return Err(StoreError::Backend("injected delete failure".to_string()));
        }
        for quote in self.quotes.values_mut() {
            quote.missions.retain(|mission| mission.id != mission_id);
        }
        Ok(())
    }

    fn detach_mission(&mut self, mission_id: &str) -> Result<(), StoreError> {
        let mission = self
            .quotes
            .values_mut()
            .flat_map(|quote| quote.missions.iter_mut())
            .find(|mission| mission.id == mission_id)
            .ok_or_else(|| StoreError::NotFound(mission_id.to_string()))?;
        mission.quote_line_id = None;
        Ok(())
    }
}

/// In-memory counter store with atomic-style upsert-with-increment.
#[derive(Default)]
pub struct InMemoryCounterStore {
    pub counters: HashMap<CounterKey, DriverRseCounter>,
}

impl CounterStore for InMemoryCounterStore {
    fn increment(
        &mut self,
        key: &CounterKey,
        delta: &ActivityDelta,
    ) -> Result<DriverRseCounter, StoreError> {
        let counter = self
            .counters
            .entry(key.clone())
            .or_insert_with(|| DriverRseCounter::zero(key.clone()));
        counter.driving_minutes += delta.driving_minutes;
        counter.amplitude_minutes += delta.amplitude_minutes;
        counter.break_minutes += delta.break_minutes;
        counter.rest_minutes += delta.rest_minutes;
        Ok(counter.clone())
    }
}
