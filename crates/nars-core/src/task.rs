use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::budget::Budget;
use crate::constants::{DEFAULT_GOAL_BUDGET, DEFAULT_JUDGMENT_BUDGET, DEFAULT_QUESTION_BUDGET};
use crate::error::{NarsError, Result};
use crate::item::Item;
use crate::term::Term;

/// Sentence type of a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Punctuation {
    Judgment,
    Question,
    Goal,
}

impl Punctuation {
    pub fn symbol(self) -> char {
        match self {
            Punctuation::Judgment => '.',
            Punctuation::Question => '?',
            Punctuation::Goal => '!',
        }
    }

    pub fn from_symbol(c: char) -> Option<Self> {
        match c {
            '.' => Some(Punctuation::Judgment),
            '?' => Some(Punctuation::Question),
            '!' => Some(Punctuation::Goal),
            _ => None,
        }
    }

    /// Budget given to a fresh task of this type when its source supplies none.
    pub fn default_budget(self) -> Budget {
        let (p, d, q) = match self {
            Punctuation::Judgment => DEFAULT_JUDGMENT_BUDGET,
            Punctuation::Question => DEFAULT_QUESTION_BUDGET,
            Punctuation::Goal => DEFAULT_GOAL_BUDGET,
        };
        Budget::new(p, d, q)
    }
}

/// Frequency and confidence of a judgment or goal. Carried, not computed:
/// truth functions live in the inference layer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Truth {
    pub frequency: f32,
    pub confidence: f32,
}

impl Truth {
    pub fn new(frequency: f32, confidence: f32) -> Result<Self> {
        if !(0.0..=1.0).contains(&frequency) {
            return Err(NarsError::Parse(format!("frequency {frequency} not in [0, 1]")));
        }
        if !(0.0..1.0).contains(&confidence) {
            return Err(NarsError::Parse(format!("confidence {confidence} not in [0, 1)")));
        }
        Ok(Self {
            frequency,
            confidence,
        })
    }
}

impl Default for Truth {
    fn default() -> Self {
        Self {
            frequency: 1.0,
            confidence: 0.9,
        }
    }
}

impl fmt::Display for Truth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{:.2};{:.2}%", self.frequency, self.confidence)
    }
}

/// Identity of a task inside a concept: the same term with the same
/// punctuation is the same task, whatever its budget.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskKey {
    pub term: Term,
    pub punctuation: Punctuation,
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.term, self.punctuation.symbol())
    }
}

/// A unit of work competing for attention.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    key: TaskKey,
    pub truth: Option<Truth>,
    budget: Budget,
    /// Produced by inference or operator feedback rather than external input.
    #[serde(default)]
    pub derived: bool,
}

impl Task {
    pub fn new(term: Term, punctuation: Punctuation, truth: Option<Truth>, budget: Budget) -> Self {
        Self {
            id: Uuid::new_v4(),
            key: TaskKey { term, punctuation },
            truth,
            budget,
            derived: false,
        }
    }

    pub fn judgment(term: Term, truth: Truth) -> Self {
        let budget = Punctuation::Judgment.default_budget();
        Self::new(term, Punctuation::Judgment, Some(truth), budget)
    }

    pub fn question(term: Term) -> Self {
        let budget = Punctuation::Question.default_budget();
        Self::new(term, Punctuation::Question, None, budget)
    }

    pub fn goal(term: Term, truth: Truth) -> Self {
        let budget = Punctuation::Goal.default_budget();
        Self::new(term, Punctuation::Goal, Some(truth), budget)
    }

    pub fn with_budget(mut self, budget: Budget) -> Self {
        self.budget = budget;
        self
    }

    /// Mark as produced inside the system.
    pub fn into_derived(mut self) -> Self {
        self.derived = true;
        self
    }

    pub fn term(&self) -> &Term {
        &self.key.term
    }

    pub fn punctuation(&self) -> Punctuation {
        self.key.punctuation
    }

    pub fn is_judgment(&self) -> bool {
        self.key.punctuation == Punctuation::Judgment
    }

    /// A goal whose term is an operation: something to execute.
    pub fn is_executable(&self) -> bool {
        self.key.punctuation == Punctuation::Goal && self.key.term.as_operation().is_some()
    }
}

impl Item for Task {
    type Key = TaskKey;

    fn key(&self) -> &TaskKey {
        &self.key
    }

    fn budget(&self) -> &Budget {
        &self.budget
    }

    fn budget_mut(&mut self) -> &mut Budget {
        &mut self.budget
    }
}

/// `$0.80;0.50;0.90$ (-->,a,b). %1.00;0.90%`
impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.budget.to_string_external(), self.key)?;
        if let Some(truth) = self.truth {
            write!(f, " {truth}")?;
        }
        Ok(())
    }
}
