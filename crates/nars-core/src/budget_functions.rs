//! Budget policies: how duplicate arrivals merge, how idle items decay, and
//! how a concept is activated by incoming work.

use serde::{Deserialize, Serialize};

use crate::budget::Budget;
use crate::fuzzy::{ave_ari, or};

/// Policy for reconciling two budgets of the same item.
///
/// Every strategy is commutative in its two inputs and never yields a
/// priority below the larger of the two.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Component-wise maximum.
    #[default]
    Max,
    /// Priority OR-combined so repeated arrivals reinforce each other;
    /// durability and quality take the maximum.
    Or,
}

/// Merge `adjuster` into `base` in place. Never fails.
pub fn merge(base: &mut Budget, adjuster: &Budget, strategy: MergeStrategy) {
    let priority = match strategy {
        MergeStrategy::Max => base.priority().max(adjuster.priority()),
        MergeStrategy::Or => or(base.priority(), adjuster.priority()),
    };
    base.set_priority(priority);
    base.set_durability(base.durability().max(adjuster.durability()));
    base.set_quality(base.quality().max(adjuster.quality()));
}

/// Decay priority by the idle time since the last decay:
/// `p ← p · d^(Δ / forget_cycles)`.
///
/// `Δ` is zero on an item's first decay, so a fresh item keeps its
/// priority once. Returns the new priority.
pub fn forget(budget: &mut Budget, now: u64, forget_cycles: f32) -> f32 {
    let period = budget.forget_period(now);
    if period == 0 || forget_cycles <= 0.0 {
        return budget.priority();
    }
    let exponent = period as f32 / forget_cycles;
    let retained = budget.durability().powf(exponent);
    budget.set_priority(budget.priority() * retained);
    budget.priority()
}

/// Activate a concept with the budget of incoming work.
pub fn activate(concept: &mut Budget, incoming: &Budget) {
    concept.set_priority(or(concept.priority(), incoming.priority()));
    concept.set_durability(ave_ari(&[concept.durability(), incoming.durability()]));
    concept.set_quality(concept.quality().max(incoming.quality()));
}
