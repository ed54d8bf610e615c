use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::budget::Budget;
use crate::budget_functions::MergeStrategy;

/// Anything a bag can hold: a keyed payload carrying its own budget.
///
/// The key is the item's identity. Two items with equal keys are the same
/// logical content and are merged rather than stored twice.
pub trait Item {
    type Key: Clone + Eq + Hash + fmt::Debug;

    fn key(&self) -> &Self::Key;

    fn budget(&self) -> &Budget;

    fn budget_mut(&mut self) -> &mut Budget;

    fn priority(&self) -> f32 {
        self.budget().priority()
    }

    /// Absorb a duplicate of this item, which is then discarded.
    /// The default only reconciles budgets.
    fn merge(&mut self, other: Self, strategy: MergeStrategy)
    where
        Self: Sized,
    {
        self.budget_mut().merge_with(other.budget(), strategy);
    }
}

/// A plain (key, value, budget) triple for callers that need no richer item.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Entry<K, V> {
    key: K,
    pub value: V,
    budget: Budget,
}

impl<K, V> Entry<K, V> {
    pub fn new(key: K, value: V, budget: Budget) -> Self {
        Self { key, value, budget }
    }
}

impl<K, V> Item for Entry<K, V>
where
    K: Clone + Eq + Hash + fmt::Debug,
{
    type Key = K;

    fn key(&self) -> &K {
        &self.key
    }

    fn budget(&self) -> &Budget {
        &self.budget
    }

    fn budget_mut(&mut self) -> &mut Budget {
        &mut self.budget
    }
}
