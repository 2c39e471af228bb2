//! Injected capabilities for the costing/compliance core.
//!
//! These are intentionally minimal. The surrounding platform implements
//! them over its own routing vendor and persistence technology; the
//! engines in this crate never talk to a database or HTTP API except
//! through these seams.

use thiserror::Error;

use crate::compliance::{ActivityDelta, CounterKey, DriverRseCounter};
use crate::reconcile::{MissionDraft, MissionPatch, Quote};
use crate::routing::{RouteRequest, RouteResponse, RoutingError};

/// Failure of an injected persistence capability.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("storage failure: {0}")]
    Backend(String),
}

/// Computes routes between an origin and a destination.
///
/// Implementations must be usable from multiple threads at once: the
/// scenario engine fans the three variant requests out in parallel.
pub trait RoutingProvider: Sync {
    fn compute_route(&self, request: &RouteRequest) -> Result<RouteResponse, RoutingError>;
}

/// Quote/mission persistence used by the reconciler.
///
/// One instance is expected to be scoped to a single storage
/// transaction covering one quote's reconciliation; the reconciler
/// performs no retries and no cross-quote coordination.
pub trait QuoteStore {
    /// Loads a quote with its nested lines and missions.
    fn load_quote(&self, quote_id: &str) -> Result<Option<Quote>, StoreError>;

    /// Creates a mission and returns its new id.
    fn create_mission(&mut self, draft: MissionDraft) -> Result<String, StoreError>;

    /// Applies line-derived fields to an existing mission. The patch
    /// type carries no dispatch fields, so operator-owned state cannot
    /// be overwritten here.
    fn update_mission(&mut self, mission_id: &str, patch: MissionPatch) -> Result<(), StoreError>;

    fn delete_mission(&mut self, mission_id: &str) -> Result<(), StoreError>;

    /// Nulls the mission's quote-line back-reference, leaving every
    /// other field untouched.
    fn detach_mission(&mut self, mission_id: &str) -> Result<(), StoreError>;
}

/// Regulatory counter persistence.
///
/// `increment` must be an atomic upsert-with-increment at the storage
/// layer: two activities for the same driver/date/regime can be
/// recorded concurrently.
pub trait CounterStore {
    fn increment(
        &mut self,
        key: &CounterKey,
        delta: &ActivityDelta,
    ) -> Result<DriverRseCounter, StoreError>;
}
