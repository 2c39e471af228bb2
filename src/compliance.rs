//! Driver regulatory counters and daily driving-time rules.
//!
//! Each driver accumulates minutes into one counter per
//! (organization, driver, business date, regulatory regime). Counters
//! only ever grow within a business date; evaluation is a pure
//! function over an already-fetched counter. Regimes are fully
//! isolated: a driver's HEAVY counter never bounds their LIGHT one,
//! even when both accumulate from the same working day.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::traits::{CounterStore, StoreError};

/// Ratio-to-limit at which a warning is raised.
const WARNING_RATIO: f64 = 0.9;

/// License/vehicle category under which driving-time rules apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegulatoryRegime {
    Light,
    Heavy,
}

/// Accumulation bucket identity: one counter per driver per calendar
/// day per regime. `business_date` carries no time-of-day component;
/// activities spanning midnight belong to two counters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CounterKey {
    pub organization_id: String,
    pub driver_id: String,
    pub business_date: NaiveDate,
    pub regime: RegulatoryRegime,
}

/// Per-day accumulated regulatory minutes for one driver/regime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverRseCounter {
    pub key: CounterKey,
    pub driving_minutes: u32,
    pub amplitude_minutes: u32,
    pub break_minutes: u32,
    pub rest_minutes: u32,
}

impl DriverRseCounter {
    /// Fresh counter for a key's first activity of the day.
    pub fn zero(key: CounterKey) -> Self {
        Self {
            key,
            driving_minutes: 0,
            amplitude_minutes: 0,
            break_minutes: 0,
            rest_minutes: 0,
        }
    }
}

/// Additive minutes recorded for one activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityDelta {
    pub driving_minutes: u32,
    pub amplitude_minutes: u32,
    pub break_minutes: u32,
    pub rest_minutes: u32,
}

/// Organization-configured daily rule for one regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceRule {
    pub regime: RegulatoryRegime,
    pub max_daily_driving_hours: f64,
    pub max_daily_amplitude_hours: f64,
    pub break_minutes_per_driving_block: u32,
    pub driving_block_hours_for_break: f64,
    pub capped_average_speed_kmh: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceStatus {
    Ok,
    Warning,
    Violation,
}

/// The regulated quantity a violation or warning refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LimitKind {
    DailyDriving,
    DailyAmplitude,
}

/// A blocking breach of a daily limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceViolation {
    pub limit: LimitKind,
    pub actual_minutes: u32,
    pub limit_minutes: u32,
}

/// Non-blocking notice that a limit is nearly reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceWarning {
    pub limit: LimitKind,
    pub actual_minutes: u32,
    pub limit_minutes: u32,
    pub percent_of_limit: f64,
}

/// A trip duration with regulatory adjustments reported alongside the
/// raw estimate, never silently substituted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustedDurations {
    pub raw_minutes: f64,
    /// Driving duration recomputed at the rule's capped average speed.
    pub speed_capped_minutes: Option<f64>,
    pub break_minutes_added: u32,
    /// Effective driving duration plus injected breaks.
    pub adjusted_minutes: f64,
}

/// Outcome of evaluating a counter (optionally with a projected trip).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceValidationResult {
    pub is_compliant: bool,
    pub status: ComplianceStatus,
    pub regulatory_regime: RegulatoryRegime,
    /// Deterministic order: daily driving before daily amplitude.
    pub violations: Vec<ComplianceViolation>,
    pub warnings: Vec<ComplianceWarning>,
    pub adjusted_durations: Option<AdjustedDurations>,
    pub rules_applied: Vec<String>,
}

/// Evaluates counters against organization-configured daily rules.
#[derive(Debug, Clone, Default)]
pub struct ComplianceEngine {
    rules: Vec<ComplianceRule>,
}

impl ComplianceEngine {
    pub fn new(rules: Vec<ComplianceRule>) -> Self {
        Self { rules }
    }

    /// The rule for a regime, if the organization regulates it.
    ///
    /// Matching keys on the regime alone; counters of other regimes
    /// are never consulted.
    pub fn rule_for(&self, regime: RegulatoryRegime) -> Option<&ComplianceRule> {
        self.rules.iter().find(|rule| rule.regime == regime)
    }

    /// Records an activity into its counter via the store's atomic
    /// upsert-with-increment.
    ///
    /// The engine performs no deduplication: callers must guarantee
    /// each activity is recorded exactly once.
    pub fn record_activity<S: CounterStore>(
        &self,
        store: &mut S,
        key: &CounterKey,
        delta: &ActivityDelta,
    ) -> Result<DriverRseCounter, StoreError> {
        store.increment(key, delta)
    }

    /// Evaluates a day counter against its regime's rule.
    ///
    /// A regime with no configured rule is unregulated: always
    /// compliant, with an empty `rules_applied` list.
    pub fn evaluate(&self, counter: &DriverRseCounter) -> ComplianceValidationResult {
        self.evaluate_minutes(
            counter.key.regime,
            counter.driving_minutes,
            counter.amplitude_minutes,
            None,
        )
    }

    /// Would adding `additional_driving_minutes` to this counter
    /// exceed either daily limit? Used to block scheduling before the
    /// driving happens.
    pub fn project(&self, counter: &DriverRseCounter, additional_driving_minutes: u32) -> bool {
        let Some(rule) = self.rule_for(counter.key.regime) else {
            return false;
        };
        let driving = counter.driving_minutes + additional_driving_minutes;
        let amplitude = counter.amplitude_minutes + additional_driving_minutes;
        driving > hours_to_minutes(rule.max_daily_driving_hours)
            || amplitude > hours_to_minutes(rule.max_daily_amplitude_hours)
    }

    /// Applies break injection and the optional average-speed cap to a
    /// raw trip duration estimate.
    pub fn adjust_duration(
        &self,
        regime: RegulatoryRegime,
        distance_km: f64,
        raw_minutes: f64,
    ) -> AdjustedDurations {
        let Some(rule) = self.rule_for(regime) else {
            return AdjustedDurations {
                raw_minutes,
                speed_capped_minutes: None,
                break_minutes_added: 0,
                adjusted_minutes: raw_minutes,
            };
        };

        let speed_capped_minutes = rule
            .capped_average_speed_kmh
            .filter(|speed| *speed > 0.0)
            .map(|speed| distance_km / speed * 60.0);
        let effective = speed_capped_minutes
            .map(|capped| capped.max(raw_minutes))
            .unwrap_or(raw_minutes);

        let block_minutes = rule.driving_block_hours_for_break * 60.0;
        let full_blocks = if block_minutes > 0.0 && effective > block_minutes {
            (effective / block_minutes).ceil() as u32 - 1
        } else {
            0
        };
        let break_minutes_added = full_blocks * rule.break_minutes_per_driving_block;

        AdjustedDurations {
            raw_minutes,
            speed_capped_minutes,
            break_minutes_added,
            adjusted_minutes: effective + break_minutes_added as f64,
        }
    }

    /// Evaluates a counter with a candidate trip projected onto it.
    ///
    /// The trip's duration is first adjusted (breaks, speed cap).
    /// Injected breaks are not driving, so only the break-free
    /// (speed-capped) duration counts toward the driving limit; the
    /// break-inclusive duration counts toward amplitude, which spans
    /// the whole working stretch.
    pub fn validate_trip(
        &self,
        counter: &DriverRseCounter,
        trip_distance_km: f64,
        trip_duration_minutes: f64,
    ) -> ComplianceValidationResult {
        let adjusted =
            self.adjust_duration(counter.key.regime, trip_distance_km, trip_duration_minutes);
        let driving_added =
            (adjusted.adjusted_minutes - adjusted.break_minutes_added as f64).round() as u32;
        let amplitude_added = adjusted.adjusted_minutes.round() as u32;
        self.evaluate_minutes(
            counter.key.regime,
            counter.driving_minutes + driving_added,
            counter.amplitude_minutes + amplitude_added,
            Some(adjusted),
        )
    }

    fn evaluate_minutes(
        &self,
        regime: RegulatoryRegime,
        driving_minutes: u32,
        amplitude_minutes: u32,
        adjusted_durations: Option<AdjustedDurations>,
    ) -> ComplianceValidationResult {
        let Some(rule) = self.rule_for(regime) else {
            return ComplianceValidationResult {
                is_compliant: true,
                status: ComplianceStatus::Ok,
                regulatory_regime: regime,
                violations: Vec::new(),
                warnings: Vec::new(),
                adjusted_durations,
                rules_applied: Vec::new(),
            };
        };

        let mut violations = Vec::new();
        let mut warnings = Vec::new();

        // Driving before amplitude, always, so violation order is stable.
        let axes = [
            (
                LimitKind::DailyDriving,
                driving_minutes,
                hours_to_minutes(rule.max_daily_driving_hours),
            ),
            (
                LimitKind::DailyAmplitude,
                amplitude_minutes,
                hours_to_minutes(rule.max_daily_amplitude_hours),
            ),
        ];

        for (limit, actual, max) in axes {
            if actual > max {
                violations.push(ComplianceViolation {
                    limit,
                    actual_minutes: actual,
                    limit_minutes: max,
                });
            } else if max > 0 && actual as f64 / max as f64 >= WARNING_RATIO {
                warnings.push(ComplianceWarning {
                    limit,
                    actual_minutes: actual,
                    limit_minutes: max,
                    percent_of_limit: actual as f64 / max as f64 * 100.0,
                });
            }
        }

        let status = if !violations.is_empty() {
            ComplianceStatus::Violation
        } else if !warnings.is_empty() {
            ComplianceStatus::Warning
        } else {
            ComplianceStatus::Ok
        };

        ComplianceValidationResult {
            is_compliant: violations.is_empty(),
            status,
            regulatory_regime: regime,
            violations,
            warnings,
            adjusted_durations,
            rules_applied: describe_rule(rule),
        }
    }
}

fn hours_to_minutes(hours: f64) -> u32 {
    (hours * 60.0).round() as u32
}

fn describe_rule(rule: &ComplianceRule) -> Vec<String> {
    let mut applied = vec![
        format!("max daily driving {}h", rule.max_daily_driving_hours),
        format!("max daily amplitude {}h", rule.max_daily_amplitude_hours),
    ];
    if rule.break_minutes_per_driving_block > 0 {
        applied.push(format!(
            "{}min break per {}h driving block",
            rule.break_minutes_per_driving_block, rule.driving_block_hours_for_break
        ));
    }
    if let Some(speed) = rule.capped_average_speed_kmh {
        applied.push(format!("average speed capped at {}km/h", speed));
    }
    applied
}
