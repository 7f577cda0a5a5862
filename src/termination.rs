//! Termination conditions.

use crate::engine::{Individual, Terminator};

/// Terminates the run once `n` generations have passed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct GenerationTerminator(pub usize);

impl Terminator for GenerationTerminator {
  fn terminate(&mut self, _: &[Individual], generations: usize, _: usize) -> bool {
    generations >= self.0
  }
}

/// Terminates the run once at least `n` candidates have been evaluated. The
/// generation that crosses the limit still finishes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct EvaluationTerminator(pub usize);

impl Terminator for EvaluationTerminator {
  fn terminate(&mut self, _: &[Individual], _: usize, evaluations: usize) -> bool {
    evaluations >= self.0
  }
}

/// Terminates as soon as any of the terminators does. An empty list never
/// terminates.
impl Terminator for Vec<Box<dyn Terminator>> {
  fn terminate(
    &mut self,
    population: &[Individual],
    generations: usize,
    evaluations: usize,
  ) -> bool {
    self
      .iter_mut()
      .any(|t| t.terminate(population, generations, evaluations))
  }
}
