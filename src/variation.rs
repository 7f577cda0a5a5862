//! The variator hook and its sequential composition.

use rand::rngs::StdRng;

use crate::{
  config::OptimizationConfig,
  mutation::{SetIndel, SetMutation},
  recombination::SetNPointCrossover,
  representation::Candidate,
};

/// Turns selected parents into offspring.
///
/// Variators never modify their input in place: every candidate they return
/// is a new value.
///
/// **Note that you always can implement this trait for a closure** of type
/// `Fn(&mut StdRng, Vec<Candidate>) -> Vec<Candidate>`.
pub trait Variator {
  fn vary(&self, rng: &mut StdRng, candidates: Vec<Candidate>) -> Vec<Candidate>;
}

impl<F> Variator for F
where
  F: Fn(&mut StdRng, Vec<Candidate>) -> Vec<Candidate>,
{
  fn vary(&self, rng: &mut StdRng, candidates: Vec<Candidate>) -> Vec<Candidate> {
    self(rng, candidates)
  }
}

/// Applies variators one after another, each to the output of the previous.
#[derive(Default)]
pub struct VariatorPipeline(Vec<Box<dyn Variator + Send + Sync>>);

impl VariatorPipeline {
  pub fn new() -> Self {
    Self::default()
  }

  /// Crossover, then mutation, then indel, configured from `config` for a
  /// representation of `len` identifiers. Indel is left out unless
  /// `config.variable_size` is set.
  pub fn from_config(config: &OptimizationConfig, len: usize) -> Self {
    let pipeline = Self::new()
      .then(SetNPointCrossover::new(
        config.crossover_rate,
        config.num_crossover_points,
        config.max_size,
      ))
      .then(SetMutation::new(config.mutation_rate, len));
    if config.variable_size {
      pipeline.then(SetIndel::new(config.indel_rate, config.max_size, len))
    } else {
      pipeline
    }
  }

  pub fn then(mut self, variator: impl Variator + Send + Sync + 'static) -> Self {
    self.0.push(Box::new(variator));
    self
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl Variator for VariatorPipeline {
  fn vary(&self, rng: &mut StdRng, candidates: Vec<Candidate>) -> Vec<Candidate> {
    self
      .0
      .iter()
      .fold(candidates, |candidates, variator| variator.vary(rng, candidates))
  }
}
