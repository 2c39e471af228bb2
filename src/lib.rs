//! fleetops-core: trip costing & regulatory consistency engines
//!
//! The computational core of a chauffeur/fleet operations platform:
//! route geometry, multi-scenario trip costing, per-driver regulatory
//! counters, quote-line/mission reconciliation, and subcontracting
//! comparisons. Routing and storage are injected capabilities; this
//! crate owns no I/O beyond the routing HTTP adapter.

pub mod traits;
pub mod geometry;
pub mod polyline;
pub mod routing;
pub mod scenario;
pub mod compliance;
pub mod reconcile;
pub mod subcontracting;
