use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::budget_functions::{self, MergeStrategy};
use crate::constants::{BUDGET_THRESHOLD, TRUTH_EPSILON};
use crate::error::{NarsError, Result};
use crate::fuzzy::{and, ave_geo, clamp_unit, or};

/// Marks both ends of an encoded budget.
const MARK: char = '$';
/// Separates the three components of an encoded budget.
const SEPARATOR: char = ';';

static BUDGET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$\s*([0-9]*\.?[0-9]+)\s*;\s*([0-9]*\.?[0-9]+)\s*;\s*([0-9]*\.?[0-9]+)\s*\$$")
        .unwrap()
});

/// The resource currency attached to every item: priority (current share of
/// attention), durability (fraction of priority kept per decay period) and
/// quality (long-term, context-independent value).
///
/// Invariants: `priority ≤ 1`, `durability < 1`, all components finite and
/// non-negative. Every mutator clamps instead of failing.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "RawBudget")]
pub struct Budget {
    priority: f32,
    durability: f32,
    quality: f32,
    /// Time of the last decay application. `None` until the first one.
    #[serde(skip)]
    last_forget_time: Option<u64>,
}

#[derive(Deserialize)]
struct RawBudget {
    priority: f32,
    durability: f32,
    quality: f32,
}

impl TryFrom<RawBudget> for Budget {
    type Error = NarsError;

    fn try_from(raw: RawBudget) -> Result<Self> {
        Budget::try_new(raw.priority, raw.durability, raw.quality)
    }
}

impl Budget {
    /// Build a budget from components the caller has already clamped.
    ///
    /// # Panics
    /// On `priority > 1`, `durability ≥ 1`, or any component that is negative,
    /// above one or not finite. These come only from internal code that must
    /// pre-clamp, so a bad value is a bug and halts the call path.
    pub fn new(priority: f32, durability: f32, quality: f32) -> Self {
        match Self::try_new(priority, durability, quality) {
            Ok(budget) => budget,
            Err(e) => panic!("{e}"),
        }
    }

    /// Checked constructor for values that come from outside the engine.
    pub fn try_new(priority: f32, durability: f32, quality: f32) -> Result<Self> {
        for (name, v) in [("priority", priority), ("durability", durability), ("quality", quality)] {
            if !v.is_finite() || v < 0.0 {
                return Err(NarsError::InvalidBudget(format!("{name} {v} is not in [0, 1]")));
            }
        }
        if priority > 1.0 {
            return Err(NarsError::InvalidBudget(format!("priority {priority} above 1")));
        }
        if durability >= 1.0 {
            return Err(NarsError::InvalidBudget(format!(
                "durability {durability} above or equal to 1"
            )));
        }
        if quality > 1.0 {
            return Err(NarsError::InvalidBudget(format!("quality {quality} above 1")));
        }
        Ok(Self {
            priority,
            durability,
            quality,
            last_forget_time: None,
        })
    }

    pub fn priority(&self) -> f32 {
        self.priority
    }

    pub fn durability(&self) -> f32 {
        self.durability
    }

    pub fn quality(&self) -> f32 {
        self.quality
    }

    pub fn set_priority(&mut self, v: f32) {
        self.priority = clamp_unit(v);
    }

    /// Values at or above 1 are stored as `1 - TRUTH_EPSILON`.
    pub fn set_durability(&mut self, v: f32) {
        self.durability = clamp_durability(v);
    }

    pub fn set_quality(&mut self, v: f32) {
        self.quality = clamp_unit(v);
    }

    /// Raise priority by a share of the remaining headroom.
    pub fn inc_priority(&mut self, v: f32) {
        self.priority = clamp_unit(or(self.priority, v));
    }

    /// Multiply priority by `v`.
    pub fn and_priority(&mut self, v: f32) {
        self.priority = clamp_unit(and(self.priority, v));
    }

    /// Lower priority in proportion to its current value.
    pub fn dec_priority(&mut self, v: f32) {
        self.priority = clamp_unit(and(self.priority, v));
    }

    pub fn inc_durability(&mut self, v: f32) {
        self.durability = clamp_durability(or(self.durability, v));
    }

    pub fn dec_durability(&mut self, v: f32) {
        self.durability = clamp_durability(and(self.durability, v));
    }

    pub fn inc_quality(&mut self, v: f32) {
        self.quality = clamp_unit(or(self.quality, v));
    }

    pub fn dec_quality(&mut self, v: f32) {
        self.quality = clamp_unit(and(self.quality, v));
    }

    /// Reconcile with the budget of the same item arriving a second time,
    /// using the default (component-wise maximum) policy.
    pub fn merge(&mut self, other: &Budget) {
        self.merge_with(other, MergeStrategy::default());
    }

    /// Merge under an explicit policy. The later decay mark survives, so a
    /// fresh duplicate never resets an item's idle time.
    pub fn merge_with(&mut self, other: &Budget, strategy: MergeStrategy) {
        budget_functions::merge(self, other, strategy);
        self.last_forget_time = self.last_forget_time.max(other.last_forget_time);
    }

    /// Geometric mean of the three components: one ranking scalar in [0, 1].
    pub fn summary(&self) -> f32 {
        ave_geo(&[self.priority, self.durability, self.quality])
    }

    /// Whether the item deserves any processing at all.
    pub fn above_threshold(&self) -> bool {
        self.above(BUDGET_THRESHOLD)
    }

    /// `summary() >= threshold` for a configured threshold.
    pub fn above(&self, threshold: f32) -> bool {
        self.summary() >= threshold
    }

    /// Compact two-digit form: `$0.50;0.50;0.50$`.
    pub fn to_string_external(&self) -> String {
        format!(
            "{MARK}{:.2}{SEPARATOR}{:.2}{SEPARATOR}{:.2}{MARK}",
            self.priority, self.durability, self.quality
        )
    }

    /// Move priority toward `target`. `momentum` 1 keeps the current value,
    /// 0 replaces it outright.
    pub fn lerp_priority(&mut self, target: f32, momentum: f32) {
        if momentum == 1.0 {
            return;
        }
        if momentum == 0.0 {
            self.set_priority(target);
        } else {
            self.set_priority(self.priority * momentum + target * (1.0 - momentum));
        }
    }

    /// Idle time since the previous call, recording `now` as the new mark.
    /// Returns 0 on the first call.
    pub fn forget_period(&mut self, now: u64) -> u64 {
        let period = match self.last_forget_time {
            Some(last) => now.saturating_sub(last),
            None => 0,
        };
        self.last_forget_time = Some(now);
        period
    }

    pub fn last_forget_time(&self) -> Option<u64> {
        self.last_forget_time
    }
}

fn clamp_durability(v: f32) -> f32 {
    if v >= 1.0 {
        1.0 - TRUTH_EPSILON
    } else {
        clamp_unit(v)
    }
}

/// Approximate equality: every component within `TRUTH_EPSILON`.
impl PartialEq for Budget {
    fn eq(&self, other: &Self) -> bool {
        (self.priority - other.priority).abs() < TRUTH_EPSILON
            && (self.durability - other.durability).abs() < TRUTH_EPSILON
            && (self.quality - other.quality).abs() < TRUTH_EPSILON
    }
}

/// Full four-digit form: `$0.5000;0.5000;0.5000$`.
impl fmt::Display for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{MARK}{:.4}{SEPARATOR}{:.4}{SEPARATOR}{:.4}{MARK}",
            self.priority, self.durability, self.quality
        )
    }
}

/// Parses both the full and the compact encoding.
impl FromStr for Budget {
    type Err = NarsError;

    fn from_str(s: &str) -> Result<Self> {
        let caps = BUDGET_RE
            .captures(s.trim())
            .ok_or_else(|| NarsError::Parse(format!("not a budget: {s:?}")))?;
        let component = |i: usize| -> Result<f32> {
            caps[i]
                .parse::<f32>()
                .map_err(|e| NarsError::Parse(format!("budget component {:?}: {e}", &caps[i])))
        };
        Budget::try_new(component(1)?, component(2)?, component(3)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_merge_keeps_decay_mark() {
        let mut fresh = Budget::new(0.5, 0.5, 0.5);
        let mut used = Budget::new(0.4, 0.5, 0.5);
        used.forget_period(7);
        fresh.merge(&used);
        assert_eq!(fresh.last_forget_time(), Some(7));

        let mut later = Budget::new(0.4, 0.5, 0.5);
        later.forget_period(9);
        later.merge(&used);
        assert_eq!(later.last_forget_time(), Some(9));
    }

    #[test]
    fn test_summary_is_geometric_mean() {
        let b = Budget::new(0.8, 0.5, 0.2);
        assert_relative_eq!(b.summary(), ave_geo(&[0.8, 0.5, 0.2]), epsilon = 1e-6);
        assert_relative_eq!(b.summary(), 0.08f32.cbrt(), epsilon = 1e-6);
    }

    #[test]
    fn test_above_threshold() {
        assert!(Budget::new(0.5, 0.5, 0.5).above_threshold());
        assert!(!Budget::new(0.0, 0.5, 0.5).above_threshold());
        // summary of (0.001, 0.001, 0.9) ≈ 0.0097
        assert!(!Budget::new(0.001, 0.001, 0.9).above_threshold());
        assert!(Budget::new(0.001, 0.001, 0.9).above(0.005));
    }

    #[test]
    #[should_panic(expected = "priority")]
    fn test_new_rejects_priority_above_one() {
        Budget::new(1.5, 0.5, 0.5);
    }

    #[test]
    #[should_panic(expected = "durability")]
    fn test_new_rejects_durability_of_one() {
        Budget::new(0.5, 1.0, 0.5);
    }

    #[test]
    fn test_try_new_reports_invalid_budget() {
        assert!(matches!(
            Budget::try_new(1.5, 0.5, 0.5),
            Err(NarsError::InvalidBudget(_))
        ));
        assert!(matches!(
            Budget::try_new(0.5, 1.0, 0.5),
            Err(NarsError::InvalidBudget(_))
        ));
        assert!(matches!(
            Budget::try_new(f32::NAN, 0.5, 0.5),
            Err(NarsError::InvalidBudget(_))
        ));
        assert!(Budget::try_new(1.0, 0.99, 1.0).is_ok());
    }

    #[test]
    fn test_set_priority_clamps() {
        let mut b = Budget::new(0.5, 0.5, 0.5);
        b.set_priority(3.0);
        assert_eq!(b.priority(), 1.0);
        b.set_priority(-1.0);
        assert_eq!(b.priority(), 0.0);
    }

    #[test]
    fn test_set_durability_one_clamps_below_one() {
        let mut b = Budget::new(0.5, 0.5, 0.5);
        b.set_durability(1.0);
        assert_relative_eq!(b.durability(), 1.0 - TRUTH_EPSILON);
        assert!(b.durability() < 1.0);
        b.set_durability(7.0);
        assert_relative_eq!(b.durability(), 1.0 - TRUTH_EPSILON);
    }

    #[test]
    fn test_inc_and_dec_priority() {
        let mut b = Budget::new(0.5, 0.5, 0.5);
        b.inc_priority(0.5);
        assert_relative_eq!(b.priority(), 0.75, epsilon = 1e-6);
        b.dec_priority(0.5);
        assert_relative_eq!(b.priority(), 0.375, epsilon = 1e-6);
        b.and_priority(0.0);
        assert_eq!(b.priority(), 0.0);
    }

    #[test]
    fn test_inc_durability_never_reaches_one() {
        let mut b = Budget::new(0.5, 0.98, 0.5);
        b.inc_durability(1.0);
        assert!(b.durability() < 1.0);
        assert_relative_eq!(b.durability(), 1.0 - TRUTH_EPSILON);
        b.dec_durability(0.5);
        assert_relative_eq!(b.durability(), 0.495, epsilon = 1e-6);
    }

    #[test]
    fn test_quality_combinators() {
        let mut b = Budget::new(0.5, 0.5, 0.4);
        b.inc_quality(0.5);
        assert_relative_eq!(b.quality(), 0.7, epsilon = 1e-6);
        b.dec_quality(0.5);
        assert_relative_eq!(b.quality(), 0.35, epsilon = 1e-6);
    }

    #[test]
    fn test_approximate_equality() {
        let a = Budget::new(0.5, 0.5, 0.5);
        assert_eq!(a, Budget::new(0.505, 0.495, 0.5));
        assert_ne!(a, Budget::new(0.52, 0.5, 0.5));
        assert_ne!(a, Budget::new(0.5, 0.5, 0.48));
    }

    #[test]
    fn test_display_full_encoding() {
        assert_eq!(Budget::new(0.5, 0.5, 0.5).to_string(), "$0.5000;0.5000;0.5000$");
        assert_eq!(Budget::new(0.8, 0.25, 1.0).to_string(), "$0.8000;0.2500;1.0000$");
    }

    #[test]
    fn test_external_encoding() {
        assert_eq!(Budget::new(0.5, 0.5, 0.5).to_string_external(), "$0.50;0.50;0.50$");
        assert_eq!(Budget::new(0.126, 0.9, 0.0).to_string_external(), "$0.13;0.90;0.00$");
    }

    #[test]
    fn test_parse_both_encodings() {
        let full: Budget = "$0.8000;0.5000;0.9000$".parse().unwrap();
        assert_eq!(full, Budget::new(0.8, 0.5, 0.9));
        let compact: Budget = "$0.80;0.50;0.90$".parse().unwrap();
        assert_eq!(compact, full);
        let loose: Budget = " $ .8 ; .5 ; .9 $ ".parse().unwrap();
        assert_eq!(loose, full);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!("0.5;0.5;0.5".parse::<Budget>(), Err(NarsError::Parse(_))));
        assert!(matches!("$0.5;0.5$".parse::<Budget>(), Err(NarsError::Parse(_))));
        assert!(matches!(
            "$0.5;1.0;0.5$".parse::<Budget>(),
            Err(NarsError::InvalidBudget(_))
        ));
    }

    #[test]
    fn test_lerp_priority() {
        let mut b = Budget::new(0.2, 0.5, 0.5);
        b.lerp_priority(0.9, 1.0);
        assert_relative_eq!(b.priority(), 0.2);
        b.lerp_priority(0.6, 0.5);
        assert_relative_eq!(b.priority(), 0.4, epsilon = 1e-6);
        b.lerp_priority(0.9, 0.0);
        assert_relative_eq!(b.priority(), 0.9);
        b.lerp_priority(2.0, 0.0);
        assert_eq!(b.priority(), 1.0);
    }

    #[test]
    fn test_forget_period() {
        let mut b = Budget::new(0.5, 0.5, 0.5);
        assert_eq!(b.last_forget_time(), None);
        assert_eq!(b.forget_period(10), 0);
        assert_eq!(b.last_forget_time(), Some(10));
        assert_eq!(b.forget_period(17), 7);
        assert_eq!(b.forget_period(17), 0);
        assert_eq!(b.last_forget_time(), Some(17));
    }

    #[test]
    fn test_clone_is_independent() {
        let a = Budget::new(0.5, 0.5, 0.5);
        let mut b = a.clone();
        b.set_priority(0.9);
        assert_relative_eq!(a.priority(), 0.5);
        assert_relative_eq!(b.priority(), 0.9);
    }

    #[test]
    fn test_serde_rejects_invalid() {
        let ok: Budget =
            serde_json::from_str(r#"{"priority":0.5,"durability":0.5,"quality":0.5}"#).unwrap();
        assert_eq!(ok, Budget::new(0.5, 0.5, 0.5));
        let bad = serde_json::from_str::<Budget>(r#"{"priority":0.5,"durability":1.0,"quality":0.5}"#);
        assert!(bad.is_err());
    }

    proptest! {
        #[test]
        fn prop_priority_stays_in_unit_range(
            start in 0.0f32..=1.0,
            ops in proptest::collection::vec((any::<bool>(), 0.0f32..=1.0), 0..64),
        ) {
            let mut b = Budget::new(start, 0.5, 0.5);
            for (increase, v) in ops {
                if increase { b.inc_priority(v) } else { b.dec_priority(v) }
                prop_assert!(b.priority() >= 0.0 && b.priority() <= 1.0);
            }
        }

        #[test]
        fn prop_durability_stays_below_one(
            start in 0.0f32..0.99,
            ops in proptest::collection::vec((any::<bool>(), 0.0f32..=1.0), 0..64),
        ) {
            let mut b = Budget::new(0.5, start, 0.5);
            for (increase, v) in ops {
                if increase { b.inc_durability(v) } else { b.dec_durability(v) }
                prop_assert!(b.durability() >= 0.0 && b.durability() < 1.0);
            }
        }

        #[test]
        fn prop_summary_matches_threshold(p in 0.0f32..=1.0, d in 0.0f32..0.99, q in 0.0f32..=1.0) {
            let b = Budget::new(p, d, q);
            prop_assert_eq!(b.summary(), ave_geo(&[p, d, q]));
            prop_assert_eq!(b.above_threshold(), b.summary() >= BUDGET_THRESHOLD);
        }
    }
}
