//! Multi-scenario route costing engine.
//!
//! Produces three comparable scenarios per trip (fastest, shortest,
//! cheapest-to-operate), each with a full total-cost-of-ownership
//! breakdown, then selects one according to organization policy.
//! Provider outages degrade to a straight-line estimate; routing
//! failures never escape to the caller.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::geometry::{self, GeoPoint};
use crate::routing::{Route, RouteRequest, RoutingError, RoutingPreference};
use crate::traits::RoutingProvider;

/// Rounds a monetary amount to 2 decimals. Applied only when a
/// breakdown is assembled, never mid-calculation.
fn round_money(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Scenario variants computed for every trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScenarioKind {
    MinTime,
    MinDistance,
    MinTco,
}

/// Where a figure came from: provider data or a local estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueSource {
    Provider,
    Estimate,
}

/// Which scenario the organization prefers when all are available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScenarioPolicy {
    /// Lowest total cost of ownership (the default).
    #[default]
    PreferTco,
    /// Fastest route, e.g. for time-critical trip types.
    PreferTime,
    /// Shortest route.
    PreferDistance,
}

/// Per-organization operating cost rates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostRates {
    pub fuel_price_per_liter: f64,
    pub consumption_l_per_100km: f64,
    /// Used when the provider returns no toll figure.
    pub toll_rate_per_km: f64,
    pub driver_hourly_rate: f64,
    pub wear_rate_per_km: f64,
    /// Flat per-trip parking estimate.
    pub parking_estimate: f64,
    /// Assumed average speed for straight-line fallback estimates.
    pub fallback_speed_kmh: f64,
}

impl Default for CostRates {
    fn default() -> Self {
        Self {
            fuel_price_per_liter: 1.85,
            consumption_l_per_100km: 7.5,
            toll_rate_per_km: 0.09,
            driver_hourly_rate: 28.0,
            wear_rate_per_km: 0.12,
            parking_estimate: 0.0,
            fallback_speed_kmh: 60.0,
        }
    }
}

/// Internal trip cost, broken down by component.
///
/// `total` is always the rounded sum of the components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub fuel: f64,
    pub tolls: f64,
    pub wear: f64,
    pub driver: f64,
    pub parking: f64,
    pub total: f64,
}

impl CostBreakdown {
    pub fn new(fuel: f64, tolls: f64, wear: f64, driver: f64, parking: f64) -> Self {
        let fuel = round_money(fuel);
        let tolls = round_money(tolls);
        let wear = round_money(wear);
        let driver = round_money(driver);
        let parking = round_money(parking);
        Self {
            fuel,
            tolls,
            wear,
            driver,
            parking,
            total: round_money(fuel + tolls + wear + driver + parking),
        }
    }
}

/// One candidate routing/cost outcome for a trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteScenario {
    pub kind: ScenarioKind,
    pub duration_minutes: f64,
    pub distance_km: f64,
    pub cost: CostBreakdown,
    pub toll_source: ValueSource,
    pub is_from_cache: bool,
    pub is_recommended: bool,
}

/// The comparable scenario set for one trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteScenarios {
    pub scenarios: Vec<RouteScenario>,
    pub selected: ScenarioKind,
    pub selection_reason: String,
    pub fallback_used: bool,
    pub fallback_reason: Option<String>,
}

impl RouteScenarios {
    pub fn selected_scenario(&self) -> Option<&RouteScenario> {
        self.scenarios.iter().find(|s| s.kind == self.selected)
    }
}

/// One leg of an analyzed trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripSegment {
    pub distance_km: f64,
    pub duration_minutes: f64,
    pub polyline: Option<String>,
}

/// Flat cost/timing analysis of a single trip, for quote screens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripAnalysis {
    pub cost_breakdown: CostBreakdown,
    pub segments: Vec<TripSegment>,
    pub total_distance_km: f64,
    pub total_duration_minutes: f64,
    pub routing_source: ValueSource,
    pub toll_source: Option<ValueSource>,
    pub fuel_price_source: Option<ValueSource>,
}

/// Computes and selects route scenarios for trips.
pub struct RouteScenarioEngine<P> {
    provider: P,
    rates: CostRates,
    policy: ScenarioPolicy,
}

impl<P: RoutingProvider> RouteScenarioEngine<P> {
    pub fn new(provider: P, rates: CostRates, policy: ScenarioPolicy) -> Self {
        Self {
            provider,
            rates,
            policy,
        }
    }

    /// Computes the three scenarios and selects one per policy.
    ///
    /// When the provider fails for every variant, a single
    /// straight-line estimate scenario is returned instead with
    /// `fallback_used` set; no routing error is ever surfaced.
    pub fn compute_scenarios(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        stops: &[GeoPoint],
    ) -> RouteScenarios {
        const KINDS: [ScenarioKind; 3] = [
            ScenarioKind::MinTime,
            ScenarioKind::MinDistance,
            ScenarioKind::MinTco,
        ];

        let outcomes: Vec<(ScenarioKind, Result<Route, RoutingError>)> = KINDS
            .par_iter()
            .map(|kind| {
                let request = variant_request(*kind, origin, destination, stops);
                let route = self.provider.compute_route(&request).and_then(|response| {
                    best_route(response.routes).ok_or(RoutingError::NoRoute)
                });
                (*kind, route)
            })
            .collect();

        let mut scenarios = Vec::new();
        let mut first_error: Option<RoutingError> = None;
        for (kind, outcome) in outcomes {
            match outcome {
                Ok(route) => scenarios.push(self.scenario_from_route(kind, &route)),
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }

        if scenarios.is_empty() {
            let reason = first_error
                .map(|err| err.to_string())
                .unwrap_or_else(|| "routing provider returned no route".to_string());
            warn!(reason = %reason, "routing degraded, using straight-line estimate");
            return self.fallback_scenarios(origin, destination, stops, reason);
        }

        let (selected, selection_reason) = self.select(&scenarios);
        for scenario in &mut scenarios {
            scenario.is_recommended = scenario.kind == selected;
        }

        RouteScenarios {
            scenarios,
            selected,
            selection_reason,
            fallback_used: false,
            fallback_reason: None,
        }
    }

    /// Single-route trip analysis for quote costing screens.
    ///
    /// Uses the traffic-aware route; degrades to a straight-line
    /// estimate segment on provider failure.
    pub fn analyze_trip(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        stops: &[GeoPoint],
    ) -> TripAnalysis {
        let request = variant_request(ScenarioKind::MinTime, origin, destination, stops);
        let outcome = self.provider.compute_route(&request).and_then(|response| {
            best_route(response.routes).ok_or(RoutingError::NoRoute)
        });
        match outcome {
            Ok(route) => {
                let segments: Vec<TripSegment> = if route.legs.is_empty() {
                    vec![TripSegment {
                        distance_km: route.distance_meters / 1000.0,
                        duration_minutes: route.duration_seconds / 60.0,
                        polyline: Some(route.polyline.clone()),
                    }]
                } else {
                    route
                        .legs
                        .iter()
                        .map(|leg| TripSegment {
                            distance_km: leg.distance_meters / 1000.0,
                            duration_minutes: leg.duration_seconds / 60.0,
                            polyline: leg.polyline.clone(),
                        })
                        .collect()
                };

                let distance_km = route.distance_meters / 1000.0;
                let duration_minutes = route.duration_seconds / 60.0;
                let toll_source = toll_source_of(&route);
                TripAnalysis {
                    cost_breakdown: self.breakdown(distance_km, duration_minutes, route.toll_cost),
                    segments,
                    total_distance_km: distance_km,
                    total_duration_minutes: duration_minutes,
                    routing_source: ValueSource::Provider,
                    toll_source: Some(toll_source),
                    fuel_price_source: Some(ValueSource::Estimate),
                }
            }
            Err(err) => {
                warn!(reason = %err, "routing degraded, analyzing trip as straight line");
                let (distance_km, duration_minutes) =
                    self.straight_line_estimate(origin, destination, stops);
                TripAnalysis {
                    cost_breakdown: self.breakdown(distance_km, duration_minutes, None),
                    segments: vec![TripSegment {
                        distance_km,
                        duration_minutes,
                        polyline: None,
                    }],
                    total_distance_km: distance_km,
                    total_duration_minutes: duration_minutes,
                    routing_source: ValueSource::Estimate,
                    toll_source: Some(ValueSource::Estimate),
                    fuel_price_source: Some(ValueSource::Estimate),
                }
            }
        }
    }

    fn scenario_from_route(&self, kind: ScenarioKind, route: &Route) -> RouteScenario {
        let distance_km = route.distance_meters / 1000.0;
        let duration_minutes = route.duration_seconds / 60.0;
        RouteScenario {
            kind,
            duration_minutes,
            distance_km,
            cost: self.breakdown(distance_km, duration_minutes, route.toll_cost),
            toll_source: toll_source_of(route),
            is_from_cache: false,
            is_recommended: false,
        }
    }

    fn breakdown(
        &self,
        distance_km: f64,
        duration_minutes: f64,
        provider_tolls: Option<f64>,
    ) -> CostBreakdown {
        let rates = &self.rates;
        let fuel = distance_km * (rates.consumption_l_per_100km / 100.0) * rates.fuel_price_per_liter;
        let tolls = provider_tolls.unwrap_or(distance_km * rates.toll_rate_per_km);
        let wear = distance_km * rates.wear_rate_per_km;
        let driver = duration_minutes / 60.0 * rates.driver_hourly_rate;
        CostBreakdown::new(fuel, tolls, wear, driver, rates.parking_estimate)
    }

    fn select(&self, scenarios: &[RouteScenario]) -> (ScenarioKind, String) {
        let preferred = match self.policy {
            ScenarioPolicy::PreferTco => ScenarioKind::MinTco,
            ScenarioPolicy::PreferTime => ScenarioKind::MinTime,
            ScenarioPolicy::PreferDistance => ScenarioKind::MinDistance,
        };

        if scenarios.iter().any(|s| s.kind == preferred) {
            let reason = match self.policy {
                ScenarioPolicy::PreferTco => "lowest total cost of ownership (default policy)",
                ScenarioPolicy::PreferTime => "fastest route (organization policy)",
                ScenarioPolicy::PreferDistance => "shortest route (organization policy)",
            };
            return (preferred, reason.to_string());
        }

        // Preferred variant unavailable: fall back to the cheapest
        // scenario, breaking ties by duration.
        let best = scenarios
            .iter()
            .min_by(|a, b| {
                (a.cost.total, a.duration_minutes)
                    .partial_cmp(&(b.cost.total, b.duration_minutes))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|s| s.kind)
            .unwrap_or(preferred);
        (
            best,
            "preferred scenario unavailable, selected lowest-cost alternative".to_string(),
        )
    }

    fn straight_line_estimate(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        stops: &[GeoPoint],
    ) -> (f64, f64) {
        let mut path = Vec::with_capacity(stops.len() + 2);
        path.push(origin);
        path.extend_from_slice(stops);
        path.push(destination);

        let distance_km = geometry::path_distance_km(&path);
        let duration_minutes = distance_km / self.rates.fallback_speed_kmh * 60.0;
        (distance_km, duration_minutes)
    }

    fn fallback_scenarios(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        stops: &[GeoPoint],
        reason: String,
    ) -> RouteScenarios {
        let (distance_km, duration_minutes) =
            self.straight_line_estimate(origin, destination, stops);

        let scenario = RouteScenario {
            kind: ScenarioKind::MinTco,
            duration_minutes,
            distance_km,
            cost: self.breakdown(distance_km, duration_minutes, None),
            toll_source: ValueSource::Estimate,
            is_from_cache: false,
            is_recommended: true,
        };

        RouteScenarios {
            scenarios: vec![scenario],
            selected: ScenarioKind::MinTco,
            selection_reason: "straight-line estimate (routing provider unavailable)".to_string(),
            fallback_used: true,
            fallback_reason: Some(reason),
        }
    }
}

/// Builds the provider request for one scenario variant.
fn variant_request(
    kind: ScenarioKind,
    origin: GeoPoint,
    destination: GeoPoint,
    stops: &[GeoPoint],
) -> RouteRequest {
    let mut request = RouteRequest::new(origin, destination, stops.to_vec());
    match kind {
        ScenarioKind::MinTime => {
            request.routing_preference = RoutingPreference::TrafficAware;
        }
        ScenarioKind::MinDistance => {
            request.routing_preference = RoutingPreference::TrafficUnaware;
            request.route_modifiers.avoid_highways = true;
        }
        ScenarioKind::MinTco => {
            request.routing_preference = RoutingPreference::TrafficUnaware;
            request.route_modifiers.avoid_tolls = true;
        }
    }
    request
}

fn toll_source_of(route: &Route) -> ValueSource {
    if route.toll_cost.is_some() {
        ValueSource::Provider
    } else {
        ValueSource::Estimate
    }
}

/// Picks the best route from a provider response (shortest duration).
///
/// None when the provider answered with an empty route set; the
/// caller treats that as a failed variant, same as `NoRoute`.
fn best_route(mut routes: Vec<Route>) -> Option<Route> {
    routes.sort_by(|a, b| {
        a.duration_seconds
            .partial_cmp(&b.duration_seconds)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    routes.into_iter().next()
}
