//! Attention core of a resource-bounded reasoner.
//!
//! Every task and concept carries a budget (priority, durability, quality).
//! Bags hold a bounded number of budgeted items and hand them out with
//! probability rising with priority. The memory cycle selects, dispatches,
//! decays and files back; executable goals go through the operator bridge,
//! whose feedback re-enters memory as new competing tasks.
//!
//! No I/O: reading input and exporting traces belong to the caller.

pub mod bag;
pub mod budget;
pub mod budget_functions;
pub mod concept;
pub mod config;
pub mod constants;
pub mod error;
pub mod fuzzy;
pub mod inference;
pub mod item;
pub mod memory;
pub mod operator;
pub mod task;
pub mod term;
pub mod time;
pub mod trace;

pub use bag::{Bag, PutOutcome, Sampling};
pub use budget::Budget;
pub use budget_functions::MergeStrategy;
pub use concept::Concept;
pub use config::MemoryConfig;
pub use constants::{BAG_LEVELS, BUDGET_THRESHOLD, TRUTH_EPSILON};
pub use error::{NarsError, Result};
pub use inference::{Inference, NoInference};
pub use item::{Entry, Item};
pub use memory::{CycleOutcome, Memory, StopHandle};
pub use operator::{FnOperator, Mental, Operator, Operators};
pub use task::{Punctuation, Task, TaskKey, Truth};
pub use term::Term;
pub use time::ClockMode;
pub use trace::{Channel, Payload, Timeline, TraceEvent, TraceReader, export_json};
