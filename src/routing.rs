//! HTTP adapter for the hosted routing provider.
//!
//! Speaks a computeRoutes-style JSON API: origin/destination plus
//! optional intermediates in, encoded polylines and leg timings out.
//! Provider failures are classified so the scenario engine can decide
//! whether to degrade to an estimate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::GeoPoint;
use crate::traits::RoutingProvider;

/// Routing failure taxonomy. The scenario engine absorbs all of these
/// into its fallback path; they never reach API callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("routing auth rejected: {0}")]
    Auth(String),
    #[error("routing quota exhausted: {0}")]
    Quota(String),
    #[error("routing request timed out")]
    Timeout,
    #[error("no route between the requested points")]
    NoRoute,
    #[error("routing failed: {0}")]
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TravelMode {
    Drive,
}

/// What the provider should optimize for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoutingPreference {
    TrafficAware,
    TrafficUnaware,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteModifiers {
    pub avoid_tolls: bool,
    pub avoid_highways: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequest {
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    pub intermediates: Vec<GeoPoint>,
    pub travel_mode: TravelMode,
    pub routing_preference: RoutingPreference,
    pub route_modifiers: RouteModifiers,
}

impl RouteRequest {
    pub fn new(origin: GeoPoint, destination: GeoPoint, intermediates: Vec<GeoPoint>) -> Self {
        Self {
            origin,
            destination,
            intermediates,
            travel_mode: TravelMode::Drive,
            routing_preference: RoutingPreference::TrafficAware,
            route_modifiers: RouteModifiers::default(),
        }
    }
}

/// One leg of a computed route (between consecutive waypoints).
#[derive(Debug, Clone)]
pub struct RouteLeg {
    pub distance_meters: f64,
    pub duration_seconds: f64,
    pub polyline: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Route {
    pub distance_meters: f64,
    pub duration_seconds: f64,
    /// Encoded overview polyline.
    pub polyline: String,
    pub legs: Vec<RouteLeg>,
    /// Provider toll estimate, when the provider computed one.
    pub toll_cost: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct RouteResponse {
    pub routes: Vec<Route>,
}

#[derive(Debug, Clone)]
pub struct RoutingConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://routes.googleapis.com".to_string(),
            api_key: String::new(),
            timeout_secs: 10,
        }
    }
}

/// Blocking HTTP routing client.
#[derive(Debug, Clone)]
pub struct HttpRoutingClient {
    config: RoutingConfig,
    client: reqwest::blocking::Client,
}

impl HttpRoutingClient {
    pub fn new(config: RoutingConfig) -> Result<Self, RoutingError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| RoutingError::Other(err.to_string()))?;

        Ok(Self { config, client })
    }
}

impl RoutingProvider for HttpRoutingClient {
    fn compute_route(&self, request: &RouteRequest) -> Result<RouteResponse, RoutingError> {
        let url = format!("{}/directions/v2:computeRoutes", self.config.base_url);

        let response = self
            .client
            .post(url)
            .header("X-Goog-Api-Key", &self.config.api_key)
            .json(&WireRequest::from(request))
            .send()
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            return Err(classify_status(status.as_u16(), detail));
        }

        let body: WireResponse = response
            .json()
            .map_err(|err| RoutingError::Other(err.to_string()))?;

        let routes: Vec<Route> = body
            .routes
            .unwrap_or_default()
            .into_iter()
            .map(Route::from)
            .collect();

        if routes.is_empty() {
            return Err(RoutingError::NoRoute);
        }

        Ok(RouteResponse { routes })
    }
}

fn classify_transport_error(err: reqwest::Error) -> RoutingError {
    if err.is_timeout() {
        RoutingError::Timeout
    } else {
        RoutingError::Other(err.to_string())
    }
}

fn classify_status(status: u16, detail: String) -> RoutingError {
    match status {
        401 | 403 => RoutingError::Auth(detail),
        429 => RoutingError::Quota(detail),
        _ => RoutingError::Other(format!("status {}: {}", status, detail)),
    }
}

// Wire types mirror the provider's JSON shapes; everything public above
// is in crate units (meters, seconds, decoded-friendly polylines).

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest {
    origin: WireWaypoint,
    destination: WireWaypoint,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    intermediates: Vec<WireWaypoint>,
    travel_mode: TravelMode,
    routing_preference: RoutingPreference,
    route_modifiers: RouteModifiers,
}

impl From<&RouteRequest> for WireRequest {
    fn from(request: &RouteRequest) -> Self {
        Self {
            origin: WireWaypoint::from(request.origin),
            destination: WireWaypoint::from(request.destination),
            intermediates: request
                .intermediates
                .iter()
                .copied()
                .map(WireWaypoint::from)
                .collect(),
            travel_mode: request.travel_mode,
            routing_preference: request.routing_preference,
            route_modifiers: request.route_modifiers,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireWaypoint {
    location: WireLocation,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireLocation {
    lat_lng: WireLatLng,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireLatLng {
    latitude: f64,
    longitude: f64,
}

impl From<GeoPoint> for WireWaypoint {
    fn from(point: GeoPoint) -> Self {
        Self {
            location: WireLocation {
                lat_lng: WireLatLng {
                    latitude: point.lat,
                    longitude: point.lng,
                },
            },
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResponse {
    routes: Option<Vec<WireRoute>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRoute {
    #[serde(default)]
    distance_meters: f64,
    #[serde(default)]
    duration: String,
    polyline: Option<WirePolyline>,
    #[serde(default)]
    legs: Vec<WireLeg>,
    travel_advisory: Option<WireAdvisory>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireLeg {
    #[serde(default)]
    distance_meters: f64,
    #[serde(default)]
    duration: String,
    polyline: Option<WirePolyline>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePolyline {
    encoded_polyline: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAdvisory {
    toll_info: Option<WireTollInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTollInfo {
    estimated_price: Option<WireMoney>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMoney {
    #[serde(default)]
    units: i64,
    #[serde(default)]
    nanos: i64,
}

impl From<WireRoute> for Route {
    fn from(wire: WireRoute) -> Self {
        Self {
            distance_meters: wire.distance_meters,
            duration_seconds: parse_duration_secs(&wire.duration),
            polyline: wire
                .polyline
                .map(|p| p.encoded_polyline)
                .unwrap_or_default(),
            legs: wire.legs.into_iter().map(RouteLeg::from).collect(),
            toll_cost: wire
                .travel_advisory
                .and_then(|advisory| advisory.toll_info)
                .and_then(|info| info.estimated_price)
                .map(|price| price.units as f64 + price.nanos as f64 / 1e9),
        }
    }
}

impl From<WireLeg> for RouteLeg {
    fn from(wire: WireLeg) -> Self {
        Self {
            distance_meters: wire.distance_meters,
            duration_seconds: parse_duration_secs(&wire.duration),
            polyline: wire.polyline.map(|p| p.encoded_polyline),
        }
    }
}

/// Parses provider durations of the form `"3600s"`.
fn parse_duration_secs(raw: &str) -> f64 {
    raw.trim_end_matches('s').parse().unwrap_or(0.0)
}
