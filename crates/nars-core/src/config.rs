use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

use crate::bag::{Bag, Sampling};
use crate::budget_functions::MergeStrategy;
use crate::constants::{
    BAG_LEVELS, BELIEF_BAG_SIZE, BUDGET_THRESHOLD, CONCEPT_BAG_SIZE, CONCEPT_FORGET_CYCLES,
    TASK_BAG_SIZE, TASK_FORGET_CYCLES, TRACE_RETENTION,
};
use crate::error::{NarsError, Result};
use crate::item::Item;
use crate::time::ClockMode;

/// Tunables of a [`crate::Memory`]. Every field has a default, so a config
/// file only needs the values it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MemoryConfig {
    pub concept_capacity: usize,
    /// Task bag capacity of each concept.
    pub task_capacity: usize,
    /// Belief bag capacity of each concept.
    pub belief_capacity: usize,
    /// Priority levels per bag.
    pub levels: usize,
    /// Minimum budget summary worth processing.
    pub budget_threshold: f32,
    /// Clock units for an idle concept to lose one durability factor.
    pub concept_forget_cycles: f32,
    pub task_forget_cycles: f32,
    pub merge: MergeStrategy,
    pub sampling: Sampling,
    /// Fixed seed for reproducible runs. Random when absent.
    pub seed: Option<u64>,
    pub clock: ClockMode,
    /// Timepoints kept in the trace.
    pub trace_retention: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            concept_capacity: CONCEPT_BAG_SIZE,
            task_capacity: TASK_BAG_SIZE,
            belief_capacity: BELIEF_BAG_SIZE,
            levels: BAG_LEVELS,
            budget_threshold: BUDGET_THRESHOLD,
            concept_forget_cycles: CONCEPT_FORGET_CYCLES,
            task_forget_cycles: TASK_FORGET_CYCLES,
            merge: MergeStrategy::default(),
            sampling: Sampling::default(),
            seed: None,
            clock: ClockMode::default(),
            trace_retention: TRACE_RETENTION,
        }
    }
}

impl MemoryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.concept_capacity == 0 {
            return Err(NarsError::InvalidConfig("concept_capacity must be positive".into()));
        }
        if self.task_capacity == 0 {
            return Err(NarsError::InvalidConfig("task_capacity must be positive".into()));
        }
        if self.levels == 0 {
            return Err(NarsError::InvalidConfig("levels must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.budget_threshold) {
            return Err(NarsError::InvalidConfig(format!(
                "budget_threshold {} not in [0, 1]",
                self.budget_threshold
            )));
        }
        for (name, cycles) in [
            ("concept_forget_cycles", self.concept_forget_cycles),
            ("task_forget_cycles", self.task_forget_cycles),
        ] {
            if !cycles.is_finite() || cycles <= 0.0 {
                return Err(NarsError::InvalidConfig(format!("{name} must be positive")));
            }
        }
        if self.trace_retention == 0 {
            return Err(NarsError::InvalidConfig("trace_retention must be positive".into()));
        }
        Ok(())
    }

    /// Root generator: seeded when configured, otherwise from the OS.
    pub fn rng(&self) -> SmallRng {
        match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        }
    }

    /// A bag shaped by this config, drawing its generator from `rng`.
    pub fn bag<T: Item>(&self, capacity: usize, rng: &mut SmallRng) -> Bag<T> {
        Bag::new(capacity, SmallRng::from_rng(rng))
            .with_levels(self.levels)
            .with_sampling(self.sampling)
            .with_merge(self.merge)
    }
}
