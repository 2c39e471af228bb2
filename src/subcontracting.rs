//! Subcontracting cost comparison and margin helpers.
//!
//! Decides whether a trip is cheaper to run internally or to hand to a
//! partner, using the same distance/duration primitives as the
//! scenario engine. All thresholds are organization-tunable; none of
//! the bands are baked in.

use serde::{Deserialize, Serialize};

use crate::geometry::{self, GeoPoint};

/// Default zone radius when a zone does not specify one.
const DEFAULT_ZONE_RADIUS_KM: f64 = 20.0;

/// Margin as a percentage of the selling price.
///
/// `None` when the selling price is zero: the margin is unknown, not
/// infinite.
pub fn margin_percent(selling_price: f64, cost: f64) -> Option<f64> {
    if selling_price == 0.0 {
        return None;
    }
    Some((selling_price - cost) / selling_price * 100.0)
}

/// A line is structurally unprofitable when it cannot be sold at all
/// or its margin sits under the organization's floor.
pub fn is_structurally_unprofitable(
    selling_price: f64,
    cost: f64,
    threshold_percent: f64,
) -> bool {
    if selling_price <= 0.0 {
        return true;
    }
    match margin_percent(selling_price, cost) {
        Some(margin) => margin < threshold_percent,
        None => true,
    }
}

/// Traffic-light profitability classification for quote screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProfitabilityLevel {
    Green,
    Orange,
    Red,
}

/// Classifies a margin against green/red thresholds.
///
/// An unknown margin is Orange (needs a look, not an alarm).
pub fn profitability_level(
    margin: Option<f64>,
    green_threshold: f64,
    red_threshold: f64,
) -> ProfitabilityLevel {
    match margin {
        None => ProfitabilityLevel::Orange,
        Some(m) if m < red_threshold => ProfitabilityLevel::Red,
        Some(m) if m >= green_threshold => ProfitabilityLevel::Green,
        Some(_) => ProfitabilityLevel::Orange,
    }
}

/// A partner's pricing grid. Missing rates fall back to organization
/// defaults before the price is computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SubcontractorRates {
    pub rate_per_km: Option<f64>,
    pub rate_per_hour: Option<f64>,
    pub minimum_fare: Option<f64>,
}

/// Organization defaults used when a partner's grid is incomplete.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DefaultSubcontractorRates {
    pub rate_per_km: f64,
    pub rate_per_hour: f64,
}

impl Default for DefaultSubcontractorRates {
    fn default() -> Self {
        Self {
            rate_per_km: 1.5,
            rate_per_hour: 35.0,
        }
    }
}

/// What the subcontractor would be paid for a trip.
///
/// The larger of the distance-based and time-based calculations,
/// floored by the optional minimum fare.
pub fn subcontractor_price(
    rates: &SubcontractorRates,
    defaults: &DefaultSubcontractorRates,
    distance_km: f64,
    duration_minutes: f64,
) -> f64 {
    let rate_per_km = rates.rate_per_km.unwrap_or(defaults.rate_per_km);
    let rate_per_hour = rates.rate_per_hour.unwrap_or(defaults.rate_per_hour);

    let by_distance = distance_km * rate_per_km;
    let by_time = duration_minutes / 60.0 * rate_per_hour;
    by_distance.max(by_time).max(rates.minimum_fare.unwrap_or(0.0))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Internal,
    Subcontract,
    Review,
}

/// Organization-tunable decision band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComparisonThresholds {
    /// Relative band (percent of internal cost) inside which the two
    /// options are considered too close to call.
    pub review_band_percent: f64,
}

impl Default for ComparisonThresholds {
    fn default() -> Self {
        Self {
            review_band_percent: 5.0,
        }
    }
}

/// Derived, non-persisted comparison between running a trip internally
/// and subcontracting it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubcontractorComparison {
    pub internal_cost: f64,
    pub subcontractor_price: f64,
    /// Positive when subcontracting is cheaper.
    pub savings: f64,
    pub savings_percent: Option<f64>,
    pub recommendation: Recommendation,
    /// Margin on the selling price under each option.
    pub internal_margin_percent: Option<f64>,
    pub subcontractor_margin_percent: Option<f64>,
}

/// Compares internal cost against a subcontractor quote.
pub fn compare_margins(
    selling_price: f64,
    internal_cost: f64,
    subcontractor_cost: f64,
    thresholds: &ComparisonThresholds,
) -> SubcontractorComparison {
    let savings = internal_cost - subcontractor_cost;
    let savings_percent = if internal_cost > 0.0 {
        Some(savings / internal_cost * 100.0)
    } else {
        None
    };

    let recommendation = match savings_percent {
        None => Recommendation::Review,
        Some(percent) if percent.abs() <= thresholds.review_band_percent => Recommendation::Review,
        Some(percent) if percent > 0.0 => Recommendation::Subcontract,
        Some(_) => Recommendation::Internal,
    };

    SubcontractorComparison {
        internal_cost,
        subcontractor_price: subcontractor_cost,
        savings,
        savings_percent,
        recommendation,
        internal_margin_percent: margin_percent(selling_price, internal_cost),
        subcontractor_margin_percent: margin_percent(selling_price, subcontractor_cost),
    }
}

/// A partner's service zone: a center point and an optional radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub center: GeoPoint,
    pub radius_km: Option<f64>,
}

/// Whether a point falls inside a zone (great-circle distance from the
/// zone center within its radius; 20km when unspecified).
pub fn point_in_zone(point: GeoPoint, zone: &Zone) -> bool {
    let radius = zone.radius_km.unwrap_or(DEFAULT_ZONE_RADIUS_KM);
    geometry::haversine_km(point, zone.center) <= radius
}

/// Scores how well a partner's zones cover a trip: 100 when both ends
/// match, 50 for exactly one, 0 for neither.
pub fn zone_match_score(pickup_matches: bool, dropoff_matches: bool) -> u8 {
    match (pickup_matches, dropoff_matches) {
        (true, true) => 100,
        (true, false) | (false, true) => 50,
        (false, false) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_margin_percent() {
        assert_eq!(margin_percent(100.0, 75.0), Some(25.0));
        assert_eq!(margin_percent(0.0, 50.0), None, "Zero price: unknown, not NaN");
        assert_eq!(margin_percent(50.0, 75.0), Some(-50.0));
    }

    #[test]
    fn test_structural_unprofitability() {
        assert!(is_structurally_unprofitable(0.0, 10.0, 15.0));
        assert!(is_structurally_unprofitable(-5.0, 10.0, 15.0));
        assert!(is_structurally_unprofitable(100.0, 90.0, 15.0)); // 10% < 15%
        assert!(!is_structurally_unprofitable(100.0, 80.0, 15.0)); // 20% >= 15%
    }

    #[test]
    fn test_profitability_levels() {
        assert_eq!(profitability_level(Some(25.0), 20.0, 0.0), ProfitabilityLevel::Green);
        assert_eq!(profitability_level(Some(10.0), 20.0, 0.0), ProfitabilityLevel::Orange);
        assert_eq!(profitability_level(Some(-5.0), 20.0, 0.0), ProfitabilityLevel::Red);
        assert_eq!(profitability_level(None, 20.0, 0.0), ProfitabilityLevel::Orange);
    }

    #[test]
    fn test_subcontractor_price_distance_wins() {
        let rates = SubcontractorRates {
            rate_per_km: Some(2.0),
            rate_per_hour: Some(40.0),
            minimum_fare: None,
        };
        // 50km * 2 = 100 beats 60min * 40/h = 40
        let price = subcontractor_price(&rates, &DefaultSubcontractorRates::default(), 50.0, 60.0);
        assert_eq!(price, 100.0);
    }

    #[test]
    fn test_subcontractor_price_minimum_fare_floor() {
        let rates = SubcontractorRates {
            rate_per_km: Some(2.0),
            rate_per_hour: Some(40.0),
            minimum_fare: Some(25.0),
        };
        // 5km*2=10 and 10min*40/h=6.67 both below the 25 floor
        let price = subcontractor_price(&rates, &DefaultSubcontractorRates::default(), 5.0, 10.0);
        assert_eq!(price, 25.0);
    }

    #[test]
    fn test_subcontractor_price_missing_rates_use_defaults() {
        let defaults = DefaultSubcontractorRates {
            rate_per_km: 3.0,
            rate_per_hour: 10.0,
        };
        let price = subcontractor_price(&SubcontractorRates::default(), &defaults, 10.0, 30.0);
        assert_eq!(price, 30.0); // 10km * default 3.0
    }

    #[test]
    fn test_compare_margins_recommendations() {
        let thresholds = ComparisonThresholds::default();

        let sub = compare_margins(300.0, 200.0, 150.0, &thresholds);
        assert_eq!(sub.recommendation, Recommendation::Subcontract);
        assert_eq!(sub.savings, 50.0);
        assert_eq!(sub.savings_percent, Some(25.0));

        let internal = compare_margins(300.0, 150.0, 200.0, &thresholds);
        assert_eq!(internal.recommendation, Recommendation::Internal);
        assert_eq!(internal.savings, -50.0);

        let close = compare_margins(300.0, 200.0, 195.0, &thresholds);
        assert_eq!(close.recommendation, Recommendation::Review, "2.5% is inside the band");
    }

    #[test]
    fn test_compare_margins_band_is_tunable() {
        let wide = ComparisonThresholds {
            review_band_percent: 30.0,
        };
        let comparison = compare_margins(300.0, 200.0, 150.0, &wide);
        assert_eq!(comparison.recommendation, Recommendation::Review);
    }

    #[test]
    fn test_compare_margins_zero_internal_cost() {
        let comparison = compare_margins(300.0, 0.0, 100.0, &ComparisonThresholds::default());
        assert_eq!(comparison.savings_percent, None);
        assert_eq!(comparison.recommendation, Recommendation::Review);
    }

    #[test]
    fn test_point_in_zone_default_radius() {
        let zone = Zone {
            center: GeoPoint::new(48.85, 2.35),
            radius_km: None,
        };
        // ~14km from the center: inside the default 20km radius
        assert!(point_in_zone(GeoPoint::new(48.73, 2.37), &zone));
        // Lyon is not in a Paris zone
        assert!(!point_in_zone(GeoPoint::new(45.76, 4.84), &zone));
    }

    #[test]
    fn test_point_in_zone_explicit_radius() {
        let zone = Zone {
            center: GeoPoint::new(48.85, 2.35),
            radius_km: Some(5.0),
        };
        assert!(!point_in_zone(GeoPoint::new(48.73, 2.37), &zone), "~14km > 5km radius");
    }

    #[test]
    fn test_zone_match_score() {
        assert_eq!(zone_match_score(true, true), 100);
        assert_eq!(zone_match_score(true, false), 50);
        assert_eq!(zone_match_score(false, true), 50);
        assert_eq!(zone_match_score(false, false), 0);
    }
}
