use crate::concept::Concept;
use crate::task::Task;

/// The inference layer as seen by the cycle: given the concept and the task
/// selected this cycle, return derived tasks. Returned tasks re-enter memory
/// and compete like any other.
pub trait Inference: Send {
    fn fire(&mut self, concept: &Concept, task: &Task) -> Vec<Task>;
}

/// Derives nothing. Memory then only schedules, decays and executes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInference;

impl Inference for NoInference {
    fn fire(&mut self, _concept: &Concept, _task: &Task) -> Vec<Task> {
        Vec::new()
    }
}

impl<F> Inference for F
where
    F: FnMut(&Concept, &Task) -> Vec<Task> + Send,
{
    fn fire(&mut self, concept: &Concept, task: &Task) -> Vec<Task> {
        self(concept, task)
    }
}
