//! Parent selection operators.

use rand::{rngs::StdRng, seq::index};

use crate::{
  engine::{Individual, Selector},
  fitness::Sense,
  representation::Candidate,
};

/// Runs `count` tournaments. Each tournament draws `k` distinct individuals
/// and selects the best of them by
/// [`Fitness::rank_cmp`](crate::fitness::Fitness::rank_cmp).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TournamentSelector(pub usize);

impl Default for TournamentSelector {
  fn default() -> Self {
    Self(2)
  }
}

impl Selector for TournamentSelector {
  fn select(
    &self,
    rng: &mut StdRng,
    population: &[Individual],
    sense: Sense,
    count: usize,
  ) -> Vec<Candidate> {
    if population.is_empty() {
      return Vec::new();
    }
    let k = self.0.clamp(1, population.len());
    (0..count)
      .filter_map(|_| {
        index::sample(rng, population.len(), k)
          .into_iter()
          .map(|i| &population[i])
          .min_by(|a, b| a.fitness.rank_cmp(&b.fitness, sense))
          .map(|winner| winner.candidate.clone())
      })
      .collect()
  }
}

/// Selects every individual once, in order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct AllSelector;

impl Selector for AllSelector {
  fn select(
    &self,
    _: &mut StdRng,
    population: &[Individual],
    _: Sense,
    _: usize,
  ) -> Vec<Candidate> {
    population.iter().map(|i| i.candidate.clone()).collect()
  }
}
