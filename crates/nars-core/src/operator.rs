//! Operator invocation: how an executable goal turns into an effect and how
//! the effect's feedback re-enters memory.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::memory::Memory;
use crate::task::{Punctuation, Task, Truth};
use crate::term::{Term, operator_name};
use crate::trace::{Channel, Payload};

/// An effect the system can carry out.
pub trait Operator: Send + Sync {
    /// Registered name, `^`-prefixed.
    fn name(&self) -> &str;

    /// Carry out the operation. `None` and an empty list both mean "no
    /// feedback".
    fn execute(&self, args: &[Term], memory: &mut Memory) -> Option<Vec<Task>>;
}

/// Execute `operator`, report the execution, then feed every returned task
/// back through [`Memory::input_task`] in the order returned.
///
/// Returns how many feedback tasks were accepted.
pub fn call(operator: &dyn Operator, args: &[Term], memory: &mut Memory) -> usize {
    let feedback = operator.execute(args, memory).unwrap_or_default();
    report_execution(operator, args, memory);
    feedback
        .into_iter()
        .map(|task| memory.input_task(task))
        .filter(|accepted| *accepted)
        .count()
}

/// One `Execution` event: the operator name followed by its arguments.
fn report_execution(operator: &dyn Operator, args: &[Term], memory: &mut Memory) {
    let parts = std::iter::once(operator.name().to_string()).chain(args.iter().map(Term::to_string));
    let signal = Payload::signal(parts);
    tracing::info!(
        operator = operator.name(),
        args = args.len(),
        time = memory.time(),
        "execute"
    );
    memory.output(Channel::Execution, signal);
}

/// Operators that act on the system itself: each argument becomes a new
/// judgment, goal or question.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mental {
    Believe,
    Want,
    Wonder,
}

impl Mental {
    pub const ALL: [Mental; 3] = [Mental::Believe, Mental::Want, Mental::Wonder];

    fn punctuation(self) -> Punctuation {
        match self {
            Mental::Believe => Punctuation::Judgment,
            Mental::Want => Punctuation::Goal,
            Mental::Wonder => Punctuation::Question,
        }
    }
}

impl Operator for Mental {
    fn name(&self) -> &str {
        match self {
            Mental::Believe => "^believe",
            Mental::Want => "^want",
            Mental::Wonder => "^wonder",
        }
    }

    fn execute(&self, args: &[Term], _memory: &mut Memory) -> Option<Vec<Task>> {
        let punctuation = self.punctuation();
        let truth = match punctuation {
            Punctuation::Question => None,
            Punctuation::Judgment | Punctuation::Goal => Some(Truth::default()),
        };
        let tasks = args
            .iter()
            .map(|arg| {
                Task::new(arg.clone(), punctuation, truth, punctuation.default_budget())
                    .into_derived()
            })
            .collect();
        Some(tasks)
    }
}

type OperatorFn = dyn Fn(&[Term], &mut Memory) -> Option<Vec<Task>> + Send + Sync;

/// An externally registered operator backed by a closure.
pub struct FnOperator {
    name: String,
    body: Box<OperatorFn>,
}

impl FnOperator {
    pub fn new<F>(name: &str, body: F) -> Self
    where
        F: Fn(&[Term], &mut Memory) -> Option<Vec<Task>> + Send + Sync + 'static,
    {
        Self {
            name: operator_name(name),
            body: Box::new(body),
        }
    }
}

impl Operator for FnOperator {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, args: &[Term], memory: &mut Memory) -> Option<Vec<Task>> {
        (self.body)(args, memory)
    }
}

impl fmt::Debug for FnOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnOperator").field("name", &self.name).finish()
    }
}

/// Operators by name.
#[derive(Clone, Default)]
pub struct Operators {
    by_name: HashMap<String, Arc<dyn Operator>>,
}

impl Operators {
    pub fn new() -> Self {
        Self::default()
    }

    /// The mental operators `^believe`, `^want` and `^wonder`.
    pub fn with_builtins() -> Self {
        let mut operators = Self::new();
        for mental in Mental::ALL {
            operators.register(mental);
        }
        operators
    }

    /// Register `operator`, replacing any operator of the same name.
    pub fn register<O: Operator + 'static>(&mut self, operator: O) {
        let name = operator.name().to_string();
        if self.by_name.insert(name.clone(), Arc::new(operator)).is_some() {
            tracing::debug!(operator = %name, "operator replaced");
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Operator>> {
        self.by_name.get(&operator_name(name)).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(&operator_name(name))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl fmt::Debug for Operators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfig;
    use crate::item::Item;

    fn memory() -> Memory {
        let config = MemoryConfig {
            seed: Some(42),
            ..MemoryConfig::default()
        };
        Memory::new(config).unwrap()
    }

    #[test]
    fn test_builtins_registered() {
        let ops = Operators::with_builtins();
        assert_eq!(ops.names(), vec!["^believe", "^want", "^wonder"]);
        assert!(ops.contains("want"));
        assert!(ops.get("^nope").is_none());
    }

    #[test]
    fn test_mental_punctuation() {
        let mut mem = memory();
        let args = [Term::atom("a"), Term::atom("b")];
        let tasks = Mental::Wonder.execute(&args, &mut mem).unwrap();
        assert_eq!(tasks.len(), 2);
        assert!(tasks.iter().all(|t| t.punctuation() == Punctuation::Question));
        assert!(tasks.iter().all(|t| t.derived && t.truth.is_none()));
        assert_eq!(tasks[1].term(), &Term::atom("b"));
    }

    #[test]
    fn test_call_reports_once_then_inputs_in_order() {
        let mut mem = memory();
        let op = FnOperator::new("pair", |_, _| {
            Some(vec![
                Task::judgment(Term::atom("first"), Truth::default()),
                Task::judgment(Term::atom("second"), Truth::default()),
            ])
        });
        let accepted = call(&op, &[Term::atom("x")], &mut mem);
        assert_eq!(accepted, 2);

        let events = mem.trace().events(..);
        let channels: Vec<Channel> = events.iter().map(|e| e.channel).collect();
        assert_eq!(channels, vec![Channel::Execution, Channel::Input, Channel::Input]);
        match &events[0].payload {
            Payload::Signal(parts) => assert_eq!(parts, &["^pair", "x"]),
            other => panic!("unexpected payload {other:?}"),
        }
        let terms: Vec<String> = events[1..]
            .iter()
            .filter_map(|e| e.payload.as_task())
            .map(|t| t.term().to_string())
            .collect();
        assert_eq!(terms, vec!["first", "second"]);
    }

    #[test]
    fn test_no_feedback_still_reported() {
        let mut mem = memory();
        let silent = FnOperator::new("^noop", |_, _| None);
        let empty = FnOperator::new("^empty", |_, _| Some(Vec::new()));
        assert_eq!(call(&silent, &[], &mut mem), 0);
        assert_eq!(call(&empty, &[], &mut mem), 0);
        assert_eq!(mem.trace().events_on(.., Channel::Execution).len(), 2);
        assert_eq!(mem.concept_count(), 0);
    }

    #[test]
    fn test_feedback_budget_is_task_budget() {
        let mut mem = memory();
        call(&Mental::Believe, &[Term::atom("a")], &mut mem);
        let concept = mem.concept(&Term::atom("a")).unwrap();
        let belief = concept.beliefs().iter().next().unwrap();
        assert_eq!(belief.budget(), &Punctuation::Judgment.default_budget());
    }
}
