//! The cycle controller.
//!
//! Memory owns a bag of concepts. Each cycle selects one concept, selects one
//! of its tasks, dispatches the task (operator bridge for executable goals,
//! the inference collaborator for everything else), decays what was used and
//! files it back or drops it. All mutation happens on the thread that owns
//! the `Memory`; observers read the trace through a [`TraceReader`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::rngs::SmallRng;

use crate::bag::{Bag, PutOutcome};
use crate::budget::Budget;
use crate::budget_functions::{activate, forget};
use crate::concept::Concept;
use crate::config::MemoryConfig;
use crate::error::Result;
use crate::inference::{Inference, NoInference};
use crate::item::Item;
use crate::operator::{self, Operator, Operators};
use crate::task::{Task, TaskKey};
use crate::term::Term;
use crate::time::Clock;
use crate::trace::{Channel, Payload, Trace, TraceEvent, TraceReader};

/// External stop signal, checked between cycles.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What one cycle did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing in memory.
    Idle,
    /// A concept was selected; `task` is the task processed, if it had any.
    Processed { concept: Term, task: Option<TaskKey> },
    /// The requested concept was not in memory.
    Vanished(Term),
}

pub struct Memory {
    config: MemoryConfig,
    concepts: Bag<Concept>,
    operators: Operators,
    inference: Box<dyn Inference>,
    trace: Trace,
    clock: Clock,
    rng: SmallRng,
    stop: StopHandle,
}

impl Memory {
    /// Empty memory with the builtin mental operators and no inference.
    pub fn new(config: MemoryConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = config.rng();
        let concepts = config.bag(config.concept_capacity, &mut rng);
        Ok(Self {
            concepts,
            operators: Operators::with_builtins(),
            inference: Box::new(NoInference),
            trace: Trace::new(config.trace_retention),
            clock: Clock::new(config.clock),
            rng,
            stop: StopHandle::default(),
            config,
        })
    }

    pub fn with_inference(mut self, inference: impl Inference + 'static) -> Self {
        self.inference = Box::new(inference);
        self
    }

    pub fn register_operator<O: Operator + 'static>(&mut self, operator: O) {
        self.operators.register(operator);
    }

    pub fn operators(&self) -> &Operators {
        &self.operators
    }

    // --- input / output ---

    /// Accept a task into the concept named by its term, creating the concept
    /// if needed. Returns `false` when the task was neglected or did not fit.
    pub fn input_task(&mut self, task: Task) -> bool {
        if !task.budget().above(self.config.budget_threshold) {
            tracing::debug!(task = %task, "neglected, budget below threshold");
            self.output(Channel::Removed, Payload::Task(task));
            return false;
        }
        let channel = if task.derived {
            Channel::Added
        } else {
            Channel::Input
        };
        self.output(channel, Payload::Task(task.clone()));

        let incoming = task.budget().clone();
        let term = task.term().clone();
        let mut concept = match self.concepts.pick_out(&term) {
            Some(mut concept) => {
                activate(concept.budget_mut(), &incoming);
                concept
            }
            None => {
                let budget =
                    Budget::new(incoming.priority(), incoming.durability(), incoming.quality());
                Concept::new(term, budget, &self.config, &mut self.rng)
            }
        };

        let mut stored = match concept.accept(task) {
            PutOutcome::Inserted | PutOutcome::Merged => true,
            PutOutcome::Evicted(old) => {
                self.output(Channel::Removed, Payload::Task(old));
                true
            }
            PutOutcome::Rejected(task) => {
                self.output(Channel::Removed, Payload::Task(task));
                false
            }
        };
        if !self.file_concept(concept) {
            stored = false;
        }
        stored
    }

    /// Append an event to the trace, stamped with the current cycle.
    pub fn output(&self, channel: Channel, payload: Payload) {
        self.trace.append(TraceEvent {
            time: self.clock.cycles(),
            channel,
            payload,
        });
    }

    /// Report a result to the outside.
    pub fn report(&self, task: &Task) {
        tracing::info!(task = %task, "report");
        self.output(Channel::Output, Payload::Task(task.clone()));
    }

    // --- cycle ---

    /// One step: select a concept, process one of its tasks, decay and
    /// file back.
    pub fn cycle(&mut self) -> CycleOutcome {
        self.clock.tick();
        match self.concepts.take_next() {
            Some(concept) => self.fire(concept),
            None => CycleOutcome::Idle,
        }
    }

    /// One step on a specific concept instead of a sampled one.
    pub fn process_concept(&mut self, term: &Term) -> CycleOutcome {
        self.clock.tick();
        match self.concepts.pick_out(term) {
            Some(concept) => self.fire(concept),
            None => {
                tracing::debug!(concept = %term, "vanished before dispatch");
                CycleOutcome::Vanished(term.clone())
            }
        }
    }

    /// Run up to `max_cycles` cycles, stopping early on the stop signal.
    /// Returns the cycles run.
    pub fn run(&mut self, max_cycles: usize) -> usize {
        let mut done = 0;
        while done < max_cycles && !self.stop.is_stopped() {
            self.cycle();
            done += 1;
        }
        done
    }

    /// Like [`Memory::run`] but also stops once memory is empty.
    pub fn run_until_idle(&mut self, max_cycles: usize) -> usize {
        let mut done = 0;
        while done < max_cycles && !self.stop.is_stopped() {
            done += 1;
            if self.cycle() == CycleOutcome::Idle {
                break;
            }
        }
        done
    }

    fn fire(&mut self, mut concept: Concept) -> CycleOutcome {
        let now = self.clock.now();
        let term = concept.term().clone();
        let task = concept.tasks_mut().take_next();
        let key = task.as_ref().map(|t| t.key().clone());
        tracing::trace!(concept = %term, task = ?key, "fire");

        // derived tasks wait until the concept is back in the bag
        let mut derived = Vec::new();
        if let Some(mut task) = task {
            if task.is_executable() {
                // an executed goal is consumed
                self.execute(&task);
            } else {
                derived = self.inference.fire(&concept, &task);
                forget(task.budget_mut(), now, self.config.task_forget_cycles);
                if task.budget().above(self.config.budget_threshold) {
                    match concept.tasks_mut().put_back(task) {
                        PutOutcome::Inserted | PutOutcome::Merged => {}
                        PutOutcome::Evicted(old) | PutOutcome::Rejected(old) => {
                            self.output(Channel::Removed, Payload::Task(old));
                        }
                    }
                } else {
                    tracing::debug!(task = %task, "forgotten");
                    self.output(Channel::Removed, Payload::Task(task));
                }
            }
        }

        // operator feedback may have recreated this concept meanwhile
        self.absorb_duplicate(&mut concept);
        forget(concept.budget_mut(), now, self.config.concept_forget_cycles);
        if concept.budget().above(self.config.budget_threshold) || concept.has_pending() {
            self.file_concept(concept);
        } else {
            self.concept_removed(&concept);
        }

        for result in derived {
            self.input_task(result.into_derived());
        }

        CycleOutcome::Processed { concept: term, task: key }
    }

    /// Put a concept into the bag, tracing whatever leaves memory as a
    /// result. Returns `false` when the concept itself was rejected.
    fn file_concept(&mut self, mut concept: Concept) -> bool {
        self.absorb_duplicate(&mut concept);
        match self.concepts.put_back(concept) {
            PutOutcome::Inserted | PutOutcome::Merged => true,
            PutOutcome::Evicted(old) => {
                self.concept_removed(&old);
                true
            }
            PutOutcome::Rejected(concept) => {
                self.concept_removed(&concept);
                false
            }
        }
    }

    /// Merge in a concept for the same term that entered the bag while
    /// `concept` was out of it.
    fn absorb_duplicate(&mut self, concept: &mut Concept) {
        if let Some(duplicate) = self.concepts.pick_out(concept.term()) {
            for lost in concept.absorb(duplicate, self.config.merge) {
                self.output(Channel::Removed, Payload::Task(lost));
            }
        }
    }

    fn execute(&mut self, task: &Task) {
        let Some((name, args)) = task.term().as_operation() else {
            return;
        };
        match self.operators.get(name) {
            Some(op) => {
                operator::call(op.as_ref(), args, self);
            }
            None => tracing::warn!(operator = name, "no operator registered"),
        }
    }

    fn concept_removed(&self, concept: &Concept) {
        tracing::debug!(
            concept = %concept.term(),
            tasks = concept.tasks().len(),
            "concept removed"
        );
        self.output(
            Channel::Removed,
            Payload::signal(["concept".to_string(), concept.term().to_string()]),
        );
    }

    // --- inspection ---

    /// Cycles run so far.
    pub fn time(&self) -> u64 {
        self.clock.cycles()
    }

    pub fn concept_count(&self) -> usize {
        self.concepts.len()
    }

    /// Tasks waiting across all concepts in the bag.
    pub fn task_count(&self) -> usize {
        self.concepts.iter().map(|c| c.tasks().len()).sum()
    }

    pub fn concept(&self, term: &Term) -> Option<&Concept> {
        self.concepts.get(term)
    }

    pub fn concepts(&self) -> &Bag<Concept> {
        &self.concepts
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn trace(&self) -> TraceReader {
        self.trace.reader()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }
}
