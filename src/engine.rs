//! The generational loop and the hooks it calls.
//!
//! The engine knows nothing about models or targets. It creates a population
//! with a [`Generator`], scores it with an [`Evaluator`], and then, once per
//! generation, asks a [`Selector`] for parents, a [`Variator`] for offspring
//! and a [`Replacer`] for the survivors. An [`Archiver`] sees every processed
//! population and [`Observer`]s are notified at the end of each generation.
//!
//! Every hook is a trait with a blanket implementation for matching closures.

use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::{
  error::SearchError,
  fitness::{Fitness, Sense},
  representation::Candidate,
  variation::Variator,
};

/// An evaluated candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
  pub candidate: Candidate,
  pub fitness: Fitness,
}

impl Individual {
  pub fn new(candidate: Candidate, fitness: Fitness) -> Self {
    Self { candidate, fitness }
  }
}

/// A shared interrupt flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn cancel(&self) {
    self.0.store(true, Ordering::SeqCst);
  }

  pub fn is_cancelled(&self) -> bool {
    self.0.load(Ordering::SeqCst)
  }

  /// Clears the flag for every clone.
  pub fn reset(&self) {
    self.0.store(false, Ordering::SeqCst);
  }
}

/// Creates one initial candidate.
pub trait Generator {
  fn generate(&self, rng: &mut StdRng) -> Candidate;
}

impl<F> Generator for F
where
  F: Fn(&mut StdRng) -> Candidate,
{
  fn generate(&self, rng: &mut StdRng) -> Candidate {
    self(rng)
  }
}

/// Scores a batch of candidates, returning one fitness per candidate in the
/// same order.
pub trait Evaluator {
  fn evaluate(&self, candidates: &[Candidate])
    -> Result<Vec<Fitness>, SearchError>;
}

impl<F> Evaluator for F
where
  F: Fn(&[Candidate]) -> Result<Vec<Fitness>, SearchError>,
{
  fn evaluate(
    &self,
    candidates: &[Candidate],
  ) -> Result<Vec<Fitness>, SearchError> {
    self(candidates)
  }
}

/// Picks the candidates offspring are bred from.
pub trait Selector {
  fn select(
    &self,
    rng: &mut StdRng,
    population: &[Individual],
    sense: Sense,
    count: usize,
  ) -> Vec<Candidate>;
}

impl<F> Selector for F
where
  F: Fn(&mut StdRng, &[Individual], Sense, usize) -> Vec<Candidate>,
{
  fn select(
    &self,
    rng: &mut StdRng,
    population: &[Individual],
    sense: Sense,
    count: usize,
  ) -> Vec<Candidate> {
    self(rng, population, sense, count)
  }
}

/// Decides which individuals make up the next generation. The result has as
/// many individuals as `population`.
pub trait Replacer {
  fn replace(
    &self,
    population: Vec<Individual>,
    offspring: Vec<Individual>,
    sense: Sense,
  ) -> Vec<Individual>;
}

impl<F> Replacer for F
where
  F: Fn(Vec<Individual>, Vec<Individual>, Sense) -> Vec<Individual>,
{
  fn replace(
    &self,
    population: Vec<Individual>,
    offspring: Vec<Individual>,
    sense: Sense,
  ) -> Vec<Individual> {
    self(population, offspring, sense)
  }
}

/// Records the best individuals of each processed population.
pub trait Archiver {
  fn archive(&mut self, population: &[Individual]);
}

impl<F> Archiver for F
where
  F: FnMut(&[Individual]),
{
  fn archive(&mut self, population: &[Individual]) {
    self(population)
  }
}

/// Gets notified once per generation.
pub trait Observer {
  fn observe(
    &mut self,
    population: &[Individual],
    generations: usize,
    evaluations: usize,
  );
}

impl<F> Observer for F
where
  F: FnMut(&[Individual], usize, usize),
{
  fn observe(
    &mut self,
    population: &[Individual],
    generations: usize,
    evaluations: usize,
  ) {
    self(population, generations, evaluations)
  }
}

/// Exchanges individuals with other populations after a generation.
pub trait Migrator {
  fn migrate(&mut self, rng: &mut StdRng, population: &mut [Individual]);
}

impl<F> Migrator for F
where
  F: FnMut(&mut StdRng, &mut [Individual]),
{
  fn migrate(&mut self, rng: &mut StdRng, population: &mut [Individual]) {
    self(rng, population)
  }
}

/// Stops the run when it returns `true`. Checked before every generation.
pub trait Terminator {
  fn terminate(
    &mut self,
    population: &[Individual],
    generations: usize,
    evaluations: usize,
  ) -> bool;
}

impl<F> Terminator for F
where
  F: FnMut(&[Individual], usize, usize) -> bool,
{
  fn terminate(
    &mut self,
    population: &[Individual],
    generations: usize,
    evaluations: usize,
  ) -> bool {
    self(population, generations, evaluations)
  }
}

/// Counters and the final population of a finished run.
#[derive(Debug, Clone, Default)]
pub struct EvolutionStats {
  pub generations: usize,
  pub evaluations: usize,
  pub population: Vec<Individual>,
}

/// A generational evolutionary loop assembled from hooks.
#[derive(TypedBuilder)]
pub struct Engine<'a> {
  generator: &'a dyn Generator,
  evaluator: &'a dyn Evaluator,
  selector: &'a dyn Selector,
  variator: &'a dyn Variator,
  replacer: &'a dyn Replacer,
  terminator: &'a mut dyn Terminator,
  archiver: &'a mut dyn Archiver,
  #[builder(default)]
  migrator: Option<&'a mut dyn Migrator>,
  #[builder(default)]
  observers: Vec<&'a mut dyn Observer>,
  population_size: usize,
  #[builder(default)]
  sense: Sense,
  #[builder(default)]
  cancel: CancelToken,
}

impl Engine<'_> {
  /// Runs until the terminator fires.
  ///
  /// # Errors
  ///
  /// Returns [`SearchError::Cancelled`] if the cancel token was set. The
  /// archiver has seen every generation that finished before that.
  pub fn evolve(
    mut self,
    rng: &mut StdRng,
  ) -> Result<EvolutionStats, SearchError> {
    let mut stats = EvolutionStats::default();

    let candidates = (0..self.population_size)
      .map(|_| self.generator.generate(rng))
      .collect();
    let mut population = self.evaluate(candidates, &mut stats)?;
    self.archiver.archive(&population);
    self.notify(&population, &stats);

    loop {
      if self.cancel.is_cancelled() {
        return Err(SearchError::Cancelled);
      }
      if self
        .terminator
        .terminate(&population, stats.generations, stats.evaluations)
      {
        break;
      }

      let parents =
        self
          .selector
          .select(rng, &population, self.sense, self.population_size);
      let offspring = self.variator.vary(rng, parents);
      let offspring = self.evaluate(offspring, &mut stats)?;
      population = self.replacer.replace(population, offspring, self.sense);
      if let Some(migrator) = self.migrator.as_mut() {
        migrator.migrate(rng, &mut population);
      }
      stats.generations += 1;

      self.archiver.archive(&population);
      self.notify(&population, &stats);
    }

    stats.population = population;
    Ok(stats)
  }

  fn evaluate(
    &self,
    candidates: Vec<Candidate>,
    stats: &mut EvolutionStats,
  ) -> Result<Vec<Individual>, SearchError> {
    let fitness = self.evaluator.evaluate(&candidates)?;
    stats.evaluations += candidates.len();
    Ok(
      candidates
        .into_iter()
        .zip(fitness)
        .map(|(c, f)| Individual::new(c, f))
        .collect(),
    )
  }

  fn notify(&mut self, population: &[Individual], stats: &EvolutionStats) {
    for observer in &mut self.observers {
      observer.observe(population, stats.generations, stats.evaluations);
    }
  }
}
