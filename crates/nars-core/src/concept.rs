use std::fmt;

use rand::rngs::SmallRng;

use crate::bag::{Bag, PutOutcome};
use crate::budget::Budget;
use crate::budget_functions::MergeStrategy;
use crate::config::MemoryConfig;
use crate::item::Item;
use crate::task::Task;
use crate::term::Term;

/// Everything memory knows about one term: the tasks waiting to be
/// processed on it and the judgments held as beliefs.
pub struct Concept {
    term: Term,
    budget: Budget,
    tasks: Bag<Task>,
    beliefs: Bag<Task>,
    /// Tasks that did not fit when a duplicate was merged in through the bag.
    lost: Vec<Task>,
}

impl Concept {
    pub fn new(term: Term, budget: Budget, config: &MemoryConfig, rng: &mut SmallRng) -> Self {
        Self {
            term,
            budget,
            tasks: config.bag(config.task_capacity, rng),
            beliefs: config.bag(config.belief_capacity, rng),
            lost: Vec::new(),
        }
    }

    pub fn term(&self) -> &Term {
        &self.term
    }

    /// File a task for processing. Judgments are also kept as beliefs.
    pub fn accept(&mut self, task: Task) -> PutOutcome<Task> {
        if task.is_judgment() {
            // belief bag overflow only loses a copy
            let _ = self.beliefs.put_in(task.clone());
        }
        self.tasks.put_in(task)
    }

    pub fn tasks(&self) -> &Bag<Task> {
        &self.tasks
    }

    pub fn tasks_mut(&mut self) -> &mut Bag<Task> {
        &mut self.tasks
    }

    pub fn beliefs(&self) -> &Bag<Task> {
        &self.beliefs
    }

    /// Take over a duplicate concept for the same term: budgets merge, its
    /// tasks and beliefs move here. Returns the tasks that did not fit.
    pub fn absorb(&mut self, other: Concept, strategy: MergeStrategy) -> Vec<Task> {
        self.budget.merge_with(&other.budget, strategy);
        let mut lost = other.lost;
        for task in other.tasks.into_items() {
            match self.tasks.put_in(task) {
                PutOutcome::Inserted | PutOutcome::Merged => {}
                PutOutcome::Evicted(task) | PutOutcome::Rejected(task) => lost.push(task),
            }
        }
        for belief in other.beliefs.into_items() {
            // beliefs are copies; the task itself is accounted for above
            let _ = self.beliefs.put_in(belief);
        }
        lost
    }

    /// Drain the tasks lost by merges that happened inside a bag.
    pub fn take_lost(&mut self) -> Vec<Task> {
        std::mem::take(&mut self.lost)
    }

    /// Tasks still waiting; a concept with pending work is never dropped for
    /// low priority.
    pub fn has_pending(&self) -> bool {
        !self.tasks.is_empty()
    }
}

impl Item for Concept {
    type Key = Term;

    fn key(&self) -> &Term {
        &self.term
    }

    fn budget(&self) -> &Budget {
        &self.budget
    }

    fn budget_mut(&mut self) -> &mut Budget {
        &mut self.budget
    }

    /// A second concept for the same term (created while this one was out of
    /// the bag) hands over its tasks and beliefs.
    fn merge(&mut self, other: Self, strategy: MergeStrategy) {
        let lost = self.absorb(other, strategy);
        self.lost.extend(lost);
    }
}

impl fmt::Debug for Concept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Concept")
            .field("term", &self.term)
            .field("budget", &self.budget)
            .field("tasks", &self.tasks.len())
            .field("beliefs", &self.beliefs.len())
            .field("lost", &self.lost.len())
            .finish()
    }
}
