//! Threshold crossing evaluation
//!
//! The evaluator compares a company's current usage with the last observation
//! recorded for it and reports the highest threshold that was crossed since.
//! It never touches the state store; callers record the new observation after
//! evaluating, whether or not an event fired.

use chrono::{DateTime, Utc};

use crate::notification::NotificationEvent;
use crate::traits::UsageObservation;
use crate::usage::{usage_percentage, UsageRecord};

/// Default thresholds, highest first
pub const DEFAULT_THRESHOLDS: [u32; 3] = [100, 90, 80];

/// Ordered set of percentage thresholds, always iterated highest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdSet {
    descending: Vec<u32>,
}

impl ThresholdSet {
    /// Build a set from any thresholds; duplicates are removed and order is normalized
    pub fn new(thresholds: impl IntoIterator<Item = u32>) -> Self {
        let mut descending: Vec<u32> = thresholds.into_iter().collect();
        descending.sort_unstable_by(|a, b| b.cmp(a));
        descending.dedup();
        Self { descending }
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.descending.iter().copied()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.descending
    }
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLDS)
    }
}

/// Decides whether an observation crossed a threshold.
#[derive(Debug, Clone, Default)]
pub struct ThresholdEvaluator {
    thresholds: ThresholdSet,
}

impl ThresholdEvaluator {
    pub fn new(thresholds: ThresholdSet) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ThresholdSet {
        &self.thresholds
    }

    /// The highest threshold `t` with `previous% < t <= current%`, if any.
    ///
    /// Previous usage is measured against the *current* allocation so that an
    /// allocation change is respected. No previous observation counts as 0%.
    pub fn crossed_threshold(
        &self,
        current: &UsageRecord,
        previous: Option<&UsageObservation>,
    ) -> Option<u32> {
        let current_pct = usage_percentage(current.usage, current.allocation);
        let previous_pct = previous
            .map(|p| usage_percentage(p.usage, current.allocation))
            .unwrap_or(0.0);

        self.thresholds
            .iter()
            .find(|&t| current_pct >= f64::from(t) && previous_pct < f64::from(t))
    }

    /// Evaluate one company. At most one event per call.
    ///
    /// `observed_at` becomes the event timestamp, so identical inputs always
    /// produce identical events.
    pub fn evaluate(
        &self,
        current: &UsageRecord,
        previous: Option<&UsageObservation>,
        observed_at: DateTime<Utc>,
    ) -> Option<NotificationEvent> {
        let threshold = self.crossed_threshold(current, previous)?;

        Some(NotificationEvent {
            company_id: current.company_id.clone(),
            company_name: current.company_name.clone(),
            feature_name: current.feature_name.clone(),
            threshold,
            usage: current.usage,
            allocation: current.allocation,
            timestamp: observed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::{Allocation, UsagePeriod};

    fn record(usage: f64, allocation: Allocation) -> UsageRecord {
        UsageRecord {
            company_id: "comp_1".to_string(),
            company_name: "Acme".to_string(),
            plan_name: Some("Pro".to_string()),
            feature_id: "feat_1".to_string(),
            feature_name: "API Calls".to_string(),
            period: UsagePeriod::CurrentMonth,
            usage,
            allocation,
        }
    }

    fn seen(usage: f64, allocation: Allocation) -> UsageObservation {
        UsageObservation { usage, allocation }
    }

    #[test]
    fn test_threshold_set_is_descending() {
        let set = ThresholdSet::new([80, 100, 90, 90]);
        assert_eq!(set.as_slice(), &[100, 90, 80]);
        assert_eq!(ThresholdSet::default().as_slice(), &DEFAULT_THRESHOLDS);
    }

    #[test]
    fn test_crossing_80() {
        let evaluator = ThresholdEvaluator::default();
        let previous = seen(70.0, Allocation::Limited(100.0));
        let event = evaluator
            .evaluate(&record(85.0, Allocation::Limited(100.0)), Some(&previous), Utc::now())
            .expect("should fire");
        assert_eq!(event.threshold, 80);
        assert_eq!(event.usage, 85.0);
        assert_eq!(event.company_id, "comp_1");
    }

    #[test]
    fn test_jump_fires_only_highest() {
        let evaluator = ThresholdEvaluator::default();
        let previous = seen(95.0, Allocation::Limited(100.0));
        let event = evaluator
            .evaluate(&record(101.0, Allocation::Limited(100.0)), Some(&previous), Utc::now())
            .expect("should fire");
        assert_eq!(event.threshold, 100);

        let from_zero = evaluator
            .evaluate(&record(100.0, Allocation::Limited(100.0)), None, Utc::now())
            .expect("should fire");
        assert_eq!(from_zero.threshold, 100);
    }

    #[test]
    fn test_no_refire_when_already_above() {
        let evaluator = ThresholdEvaluator::default();
        let previous = seen(85.0, Allocation::Limited(100.0));
        assert!(evaluator
            .evaluate(&record(88.0, Allocation::Limited(100.0)), Some(&previous), Utc::now())
            .is_none());
    }

    #[test]
    fn test_first_observation_below_thresholds() {
        let evaluator = ThresholdEvaluator::default();
        assert!(evaluator
            .evaluate(&record(50.0, Allocation::Limited(100.0)), None, Utc::now())
            .is_none());
    }

    #[test]
    fn test_first_observation_above_threshold_fires() {
        let evaluator = ThresholdEvaluator::default();
        let event = evaluator
            .evaluate(&record(92.0, Allocation::Limited(100.0)), None, Utc::now())
            .expect("should fire");
        assert_eq!(event.threshold, 90);
    }

    #[test]
    fn test_unlimited_never_fires() {
        let evaluator = ThresholdEvaluator::default();
        for usage in [0.0, 80.0, 100.0, 1e12] {
            assert!(evaluator
                .evaluate(&record(usage, Allocation::Unlimited), None, Utc::now())
                .is_none());
        }
    }

    #[test]
    fn test_previous_measured_against_current_allocation() {
        let evaluator = ThresholdEvaluator::default();
        // 85/200 was 42.5%; against the new allocation of 100 it is already 85%
        let previous = seen(85.0, Allocation::Limited(200.0));
        assert!(evaluator
            .evaluate(&record(86.0, Allocation::Limited(100.0)), Some(&previous), Utc::now())
            .is_none());

        // Raising the allocation drops the percentage; crossing again fires
        let previous = seen(85.0, Allocation::Limited(100.0));
        let event = evaluator
            .evaluate(&record(170.0, Allocation::Limited(200.0)), Some(&previous), Utc::now())
            .expect("should fire");
        assert_eq!(event.threshold, 80);
    }

    #[test]
    fn test_evaluate_is_pure() {
        let evaluator = ThresholdEvaluator::default();
        let current = record(91.0, Allocation::Limited(100.0));
        let previous = seen(10.0, Allocation::Limited(100.0));
        let at = Utc::now();

        let first = evaluator.evaluate(&current, Some(&previous), at);
        let second = evaluator.evaluate(&current, Some(&previous), at);
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn test_crossing_property_over_grid() {
        let evaluator = ThresholdEvaluator::default();
        let alloc = Allocation::Limited(100.0);
        for prev in (0..=120).step_by(5) {
            for cur in (0..=120).step_by(5) {
                let (prev, cur) = (prev as f64, cur as f64);
                let fired = evaluator.crossed_threshold(&record(cur, alloc), Some(&seen(prev, alloc)));
                let expected = DEFAULT_THRESHOLDS
                    .iter()
                    .copied()
                    .find(|&t| cur >= t as f64 && prev < t as f64);
                assert_eq!(fired, expected, "prev={} cur={}", prev, cur);
            }
        }
    }
}
