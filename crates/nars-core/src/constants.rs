/// Precision of truth and budget values. Two values closer than this are equal.
pub const TRUTH_EPSILON: f32 = 0.01;

/// Minimum budget summary for an item to be worth any processing at all.
pub const BUDGET_THRESHOLD: f32 = 0.01;

/// Number of discrete priority levels in a bag.
pub const BAG_LEVELS: usize = 100;

/// Default capacity of the concept bag.
pub const CONCEPT_BAG_SIZE: usize = 1000;

/// Default capacity of each concept's task bag.
pub const TASK_BAG_SIZE: usize = 20;

/// Default capacity of each concept's belief bag.
pub const BELIEF_BAG_SIZE: usize = 7;

/// Cycles over which an idle concept loses one durability factor of priority.
pub const CONCEPT_FORGET_CYCLES: f32 = 10.0;

/// Cycles over which an idle task loses one durability factor of priority.
pub const TASK_FORGET_CYCLES: f32 = 20.0;

/// Timepoints kept in the trace before the oldest are pruned.
pub const TRACE_RETENTION: usize = 10_000;

/// Default budget of a fresh judgment: priority, durability, quality.
pub const DEFAULT_JUDGMENT_BUDGET: (f32, f32, f32) = (0.8, 0.5, 0.9);

/// Default budget of a fresh question.
pub const DEFAULT_QUESTION_BUDGET: (f32, f32, f32) = (0.9, 0.9, 0.9);

/// Default budget of a fresh goal.
pub const DEFAULT_GOAL_BUDGET: (f32, f32, f32) = (0.9, 0.9, 0.9);
