//! The single-island driver.
//!
//! [`HeuristicOptimization`] wires a decoder, an evaluator, the variator
//! pipeline and a [`BestSolutionArchive`] into the hooks of the [`Engine`] and
//! runs one population to completion or cancellation.

use std::sync::Arc;

use rand::{rngs::StdRng, seq::index, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{
  archive::BestSolutionArchive,
  config::{HeuristicMethod, OptimizationConfig},
  engine::{
    CancelToken, Engine, Generator, Individual, Migrator, Observer, Replacer,
    Terminator,
  },
  error::{ConfigError, SearchError},
  evaluation::FitnessEvaluator,
  model::Model,
  objective::ObjectiveSet,
  replacement::{NondominatedReplacer, TruncationReplacer},
  representation::{Candidate, Decoder},
  selection::TournamentSelector,
  simulation::SimulationMethod,
  termination::{EvaluationTerminator, GenerationTerminator},
  variation::VariatorPipeline,
};

/// Lifecycle of a driver.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
pub enum RunStatus {
  #[default]
  Idle,
  Running,
  /// The termination condition was met.
  Completed,
  /// The cancel token was set. The archive holds every generation finished
  /// before that.
  Cancelled,
}

/// What a run leaves behind.
#[derive(Debug, Clone)]
pub struct OptimizationResult {
  pub archive: BestSolutionArchive,
  pub status: RunStatus,
  /// Generations fully processed.
  pub generations: usize,
  pub evaluations: usize,
}

/// Creates candidates as uniform random subsets of the representation.
///
/// Sizes are uniform in `1..=max_size`, or always `max_size` if
/// `variable_size` is off, and never exceed the representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomSubsetGenerator {
  len: usize,
  max_size: usize,
  variable_size: bool,
}

impl RandomSubsetGenerator {
  pub fn new(len: usize, max_size: usize, variable_size: bool) -> Self {
    Self {
      len,
      max_size,
      variable_size,
    }
  }
}

impl Generator for RandomSubsetGenerator {
  fn generate(&self, rng: &mut StdRng) -> Candidate {
    let max_size = self.max_size.min(self.len);
    let size = if self.variable_size && max_size > 1 {
      rng.gen_range(1..=max_size)
    } else {
      max_size
    };
    index::sample(rng, self.len, size).into_iter().collect()
  }
}

/// Logs progress once per generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingObserver {
  island: usize,
}

impl LoggingObserver {
  pub fn new(island: usize) -> Self {
    Self { island }
  }
}

impl Observer for LoggingObserver {
  fn observe(
    &mut self,
    population: &[Individual],
    generations: usize,
    evaluations: usize,
  ) {
    let best = population.first().map(|i| i.fitness.to_string());
    log::debug!(
      "island {}: generation {generations}, {evaluations} evaluations, \
       first individual {}",
      self.island,
      best.as_deref().unwrap_or("-"),
    );
  }
}

/// Heuristic strain design on a single population.
///
/// Construction validates the configuration against the objectives and the
/// representation, so a driver that exists can run. Every run builds a fresh
/// evaluator on its own copy of the model.
///
/// # Examples
/// ```
/// # use strainga::*;
/// let mut model = Model::new("toy");
/// for (id, ub) in [("R0", 1.0), ("R1", 2.0), ("R2", 4.0)] {
///   model.add_reaction(Reaction::new(id, 0.0, ub));
/// }
/// let representation = Representation::reactions(&model, &[]);
/// let simulate = |scope: &mut ModelScope<'_>, _: &mut ProblemCache| {
///   let open = scope.reactions().filter(|r| !r.is_blocked()).count();
///   Ok::<_, SimulationError>(FluxState::new([("P", open as f64)], 0.0))
/// };
/// let config = OptimizationConfig::builder()
///   .max_size(2)
///   .population_size(4)
///   .max_evaluations(Some(40))
///   .seed(7)
///   .build();
///
/// let mut driver = HeuristicOptimization::new(
///   model,
///   ReactionKnockoutDecoder::new(representation),
///   simulate,
///   ObjectiveSet::single(TargetFlux::new("P").minimize()),
///   config,
/// )?;
/// let result = driver.run()?;
/// assert_eq!(result.status, RunStatus::Completed);
/// assert!(!result.archive.is_empty());
/// # Ok::<(), SearchError>(())
/// ```
pub struct HeuristicOptimization {
  model: Model,
  decoder: Arc<dyn Decoder>,
  simulation: Arc<dyn SimulationMethod>,
  objectives: Arc<ObjectiveSet>,
  config: OptimizationConfig,
  cancel: CancelToken,
  owns_cancel: bool,
  status: RunStatus,
}

impl HeuristicOptimization {
  /// # Errors
  ///
  /// Returns [`SearchError::Config`] if the configuration is invalid, does
  /// not suit the number of objectives, or the representation is empty.
  pub fn new(
    model: Model,
    decoder: impl Decoder + 'static,
    simulation: impl SimulationMethod + 'static,
    objectives: ObjectiveSet,
    config: OptimizationConfig,
  ) -> Result<Self, SearchError> {
    Self::from_shared(
      model,
      Arc::new(decoder),
      Arc::new(simulation),
      Arc::new(objectives),
      config,
    )
  }

  pub(crate) fn from_shared(
    model: Model,
    decoder: Arc<dyn Decoder>,
    simulation: Arc<dyn SimulationMethod>,
    objectives: Arc<ObjectiveSet>,
    config: OptimizationConfig,
  ) -> Result<Self, SearchError> {
    config.validate()?;
    config.check_objectives(&objectives)?;
    if decoder.representation().is_empty() {
      return Err(ConfigError::EmptyRepresentation.into());
    }
    Ok(Self {
      model,
      decoder,
      simulation,
      objectives,
      config,
      cancel: CancelToken::new(),
      owns_cancel: true,
      status: RunStatus::Idle,
    })
  }

  /// Replaces the driver's cancel token with a shared one. A shared token is
  /// never reset by the driver: once it is cancelled, every later run stops
  /// after its first generation.
  pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
    self.cancel = cancel;
    self.owns_cancel = false;
    self
  }

  /// A handle that cancels this driver's runs from any thread. The driver's
  /// own token is reset when a run ends, so the driver can run again after
  /// a cancellation and the handle stays valid.
  pub fn cancel_token(&self) -> CancelToken {
    self.cancel.clone()
  }

  pub fn status(&self) -> RunStatus {
    self.status
  }

  pub fn config(&self) -> &OptimizationConfig {
    &self.config
  }

  pub fn objectives(&self) -> &ObjectiveSet {
    &self.objectives
  }

  pub fn decoder(&self) -> &dyn Decoder {
    self.decoder.as_ref()
  }

  /// Builds an evaluator like the one a run uses, e.g. for
  /// [`ResultTable::assemble`](crate::results::ResultTable::assemble).
  pub fn evaluator(&self) -> Result<FitnessEvaluator, SearchError> {
    Ok(
      FitnessEvaluator::new(
        self.model.clone(),
        self.decoder.clone(),
        self.simulation.clone(),
        self.objectives.clone(),
        self.config.evaluation_threads,
        self.config.memo_capacity,
      )?
      .with_cancel_token(self.cancel.clone()),
    )
  }

  /// Runs the search, seeded from the configuration or from entropy.
  ///
  /// # Errors
  ///
  /// Cancellation is not an error: it ends the run with
  /// [`RunStatus::Cancelled`]. Errors are decoding or target errors raised by
  /// the evaluator and pool construction failures.
  pub fn run(&mut self) -> Result<OptimizationResult, SearchError> {
    self.run_observed(Vec::new())
  }

  /// Like [`run`](Self::run), notifying `observers` once per generation.
  pub fn run_observed(
    &mut self,
    observers: Vec<&mut dyn Observer>,
  ) -> Result<OptimizationResult, SearchError> {
    let seed = self.config.seed.unwrap_or_else(rand::random);
    self.run_island(0, seed, None, observers)
  }

  pub(crate) fn run_island(
    &mut self,
    island: usize,
    seed: u64,
    migrator: Option<&mut dyn Migrator>,
    observers: Vec<&mut dyn Observer>,
  ) -> Result<OptimizationResult, SearchError> {
    let config = &self.config;
    let sense = self.objectives.sense();
    let len = self.decoder.representation().len();
    log::info!(
      "island {island}: starting {:?} search with seed {seed}, {len} targets",
      config.heuristic_method
    );
    self.status = RunStatus::Running;

    let mut evaluator = self.evaluator()?;
    let generator =
      RandomSubsetGenerator::new(len, config.max_size, config.variable_size);
    let selector = TournamentSelector(config.tournament_size);
    let variator = VariatorPipeline::from_config(config, len);
    let replacer: &dyn Replacer = match config.heuristic_method {
      HeuristicMethod::Ga => &TruncationReplacer,
      HeuristicMethod::Nsga2 => &NondominatedReplacer,
    };
    let mut terminator = terminators(config);
    let mut archive = BestSolutionArchive::new(config.max_archive_size, sense);

    let mut progress = (0, 0);
    let mut track = |_: &[Individual], generations: usize, evaluations: usize| {
      progress = (generations, evaluations);
    };
    let mut logging = LoggingObserver::new(island);
    let mut notified: Vec<&mut dyn Observer> = vec![&mut logging, &mut track];
    for observer in observers {
      notified.push(observer);
    }

    let outcome = Engine::builder()
      .generator(&generator)
      .evaluator(&evaluator)
      .selector(&selector)
      .variator(&variator)
      .replacer(replacer)
      .terminator(&mut terminator)
      .archiver(&mut archive)
      .migrator(migrator.map(|m| m as &mut dyn Migrator))
      .observers(notified)
      .population_size(config.population_size)
      .sense(sense)
      .cancel(self.cancel.clone())
      .build()
      .evolve(&mut StdRng::seed_from_u64(seed));

    if self.owns_cancel {
      self.cancel.reset();
    }
    let (generations, evaluations) = progress;
    let status = match outcome {
      Ok(_) => RunStatus::Completed,
      Err(SearchError::Cancelled) => {
        log::warn!("island {island}: cancelled after {generations} generations");
        RunStatus::Cancelled
      }
      Err(err) => {
        self.status = RunStatus::Idle;
        return Err(err);
      }
    };
    evaluator.shutdown();
    self.status = status;

    log::info!(
      "island {island}: {status:?} after {generations} generations and \
       {evaluations} evaluations, archive holds {}",
      archive.len()
    );
    Ok(OptimizationResult {
      archive,
      status,
      generations,
      evaluations,
    })
  }
}

impl std::fmt::Debug for HeuristicOptimization {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("HeuristicOptimization")
      .field("model", &self.model.id())
      .field("objectives", &self.objectives)
      .field("config", &self.config)
      .field("status", &self.status)
      .finish_non_exhaustive()
  }
}

/// Any-of the configured limits.
fn terminators(config: &OptimizationConfig) -> Vec<Box<dyn Terminator>> {
  let mut terminators: Vec<Box<dyn Terminator>> = Vec::new();
  if let Some(n) = config.max_evaluations {
    terminators.push(Box::new(EvaluationTerminator(n)));
  }
  if let Some(n) = config.max_generations {
    terminators.push(Box::new(GenerationTerminator(n)));
  }
  terminators
}
