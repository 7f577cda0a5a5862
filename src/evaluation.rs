//! LP-backed fitness evaluation.
//!
//! A [`FitnessEvaluator`] decodes a candidate, applies its targets inside a
//! [`ModelScope`](crate::model::ModelScope), runs the simulation method and
//! scores the resulting flux state. Failed simulations never abort a batch:
//! they score the worst fitness of the objectives instead.
//!
//! Batches are split into contiguous chunks and evaluated on a private
//! [rayon] pool. Each chunk borrows a workspace, a model copy with its own
//! [`ProblemCache`], so a model is never modified by two threads at once.

use std::{
  num::NonZeroUsize,
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  },
};

use lru::LruCache;
use parking_lot::Mutex;
use rayon::{prelude::*, ThreadPool, ThreadPoolBuilder};

use crate::{
  engine::{CancelToken, Evaluator},
  error::{ConfigError, SearchError},
  fitness::Fitness,
  model::Model,
  objective::ObjectiveSet,
  problem::ProblemCache,
  representation::{Candidate, Decoded, Decoder},
  simulation::{FluxState, SimulationMethod},
};

/// A model copy and the cache of auxiliary terms added to it.
#[derive(Debug)]
struct Workspace {
  model: Model,
  cache: ProblemCache,
}

impl Workspace {
  fn new(model: Model) -> Self {
    Self {
      model,
      cache: ProblemCache::new(),
    }
  }
}

/// Scores candidates by simulating the interventions they decode to.
pub struct FitnessEvaluator {
  decoder: Arc<dyn Decoder>,
  simulation: Arc<dyn SimulationMethod>,
  objectives: Arc<ObjectiveSet>,
  template: Model,
  workspaces: Mutex<Vec<Workspace>>,
  memo: Mutex<LruCache<Candidate, Fitness>>,
  pool: Option<ThreadPool>,
  cancel: CancelToken,
  simulations: AtomicUsize,
}

impl FitnessEvaluator {
  /// Creates an evaluator working on copies of `model`.
  ///
  /// `threads` sizes the worker pool, `None` lets rayon decide.
  /// `memo_capacity` bounds the number of memoized fitness values.
  ///
  /// # Errors
  ///
  /// Fails if `memo_capacity` is zero or the pool cannot be built.
  pub fn new(
    model: Model,
    decoder: Arc<dyn Decoder>,
    simulation: Arc<dyn SimulationMethod>,
    objectives: Arc<ObjectiveSet>,
    threads: Option<usize>,
    memo_capacity: usize,
  ) -> Result<Self, SearchError> {
    let capacity = NonZeroUsize::new(memo_capacity)
      .ok_or(ConfigError::Zero("memo_capacity"))?;
    let pool = ThreadPoolBuilder::new()
      .num_threads(threads.unwrap_or(0))
      .thread_name(|i| format!("strainga-eval-{i}"))
      .build()?;
    Ok(Self {
      decoder,
      simulation,
      objectives,
      template: model,
      workspaces: Mutex::new(Vec::new()),
      memo: Mutex::new(LruCache::new(capacity)),
      pool: Some(pool),
      cancel: CancelToken::new(),
      simulations: AtomicUsize::new(0),
    })
  }

  /// Makes batch evaluation stop at the next candidate once `cancel` is set.
  pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
    self.cancel = cancel;
    self
  }

  pub fn decoder(&self) -> &dyn Decoder {
    self.decoder.as_ref()
  }

  pub fn objectives(&self) -> &ObjectiveSet {
    &self.objectives
  }

  /// Number of simulations actually run, memo hits excluded.
  pub fn simulations(&self) -> usize {
    self.simulations.load(Ordering::Relaxed)
  }

  /// Evaluates one candidate on `model` without touching the memo.
  ///
  /// The model is restored before this returns, whatever the outcome.
  ///
  /// # Errors
  ///
  /// Fails if the candidate cannot be decoded or its targets cannot be
  /// applied. A failed simulation is not an error.
  pub fn evaluate_with(
    &self,
    model: &mut Model,
    cache: &mut ProblemCache,
    candidate: &Candidate,
  ) -> Result<Fitness, SearchError> {
    let fitness =
      self.inspect_with(model, cache, candidate, |model, flux, decoded| {
        self.objectives.fitness(model, flux, &decoded.simulation)
      })?;
    Ok(fitness.unwrap_or_else(|| self.objectives.worst_fitness()))
  }

  /// Simulates one candidate and hands the modified model and the flux state
  /// to `inspect`. Returns `None` if the simulation failed.
  ///
  /// # Errors
  ///
  /// Fails if the candidate cannot be decoded or its targets cannot be
  /// applied.
  pub fn inspect_with<T>(
    &self,
    model: &mut Model,
    cache: &mut ProblemCache,
    candidate: &Candidate,
    inspect: impl FnOnce(&Model, &FluxState, &Decoded) -> T,
  ) -> Result<Option<T>, SearchError> {
    let decoded = self.decoder.decode(candidate)?;
    let mut scope = model.scope();
    decoded.simulation.apply(&mut scope)?;

    cache.begin_transaction();
    self.simulations.fetch_add(1, Ordering::Relaxed);
    match self.simulation.simulate(&mut scope, cache) {
      Ok(flux) => {
        cache.commit();
        Ok(Some(inspect(&*scope, &flux, &decoded)))
      }
      Err(err) => {
        cache.rollback(scope.problem_mut());
        log::debug!("simulation of {} failed: {err}", decoded.simulation);
        Ok(None)
      }
    }
  }

  /// Like [`inspect_with`](Self::inspect_with), on one of the evaluator's
  /// own workspaces.
  pub fn inspect<T>(
    &self,
    candidate: &Candidate,
    inspect: impl FnOnce(&Model, &FluxState, &Decoded) -> T,
  ) -> Result<Option<T>, SearchError> {
    self.with_workspace(|ws| {
      self.inspect_with(&mut ws.model, &mut ws.cache, candidate, inspect)
    })
  }

  /// Evaluates one candidate. Repeated calls with the same candidate are
  /// answered from the memo.
  pub fn evaluate_one(
    &self,
    candidate: &Candidate,
  ) -> Result<Fitness, SearchError> {
    self.with_workspace(|ws| self.memoized(ws, candidate))
  }

  /// Evaluates a batch on the worker pool, one fitness per candidate in
  /// order.
  ///
  /// # Errors
  ///
  /// Returns [`SearchError::Cancelled`] if the cancel token is set before the
  /// batch completes. Completed results of the batch are discarded.
  pub fn evaluate_batch(
    &self,
    candidates: &[Candidate],
  ) -> Result<Vec<Fitness>, SearchError> {
    let Some(pool) = &self.pool else {
      return self.evaluate_chunk(candidates);
    };
    let chunk_size = (candidates.len() / pool.current_num_threads()).max(1);
    let chunks = pool.install(|| {
      candidates
        .par_chunks(chunk_size)
        .map(|chunk| self.evaluate_chunk(chunk))
        .collect::<Result<Vec<_>, _>>()
    })?;
    Ok(chunks.into_iter().flatten().collect())
  }

  /// Removes every cached auxiliary term from the workspaces and forgets all
  /// memoized fitness values. Use between unrelated runs.
  pub fn reset(&self) {
    for ws in self.workspaces.lock().iter_mut() {
      ws.cache.reset(ws.model.scope().problem_mut());
    }
    self.memo.lock().clear();
  }

  /// Stops the worker pool. Later batches are evaluated on the calling
  /// thread.
  pub fn shutdown(&mut self) {
    if self.pool.take().is_some() {
      log::debug!("evaluation pool shut down");
    }
  }

  fn evaluate_chunk(
    &self,
    chunk: &[Candidate],
  ) -> Result<Vec<Fitness>, SearchError> {
    self.with_workspace(|ws| {
      chunk
        .iter()
        .map(|candidate| {
          if self.cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
          }
          self.memoized(ws, candidate)
        })
        .collect()
    })
  }

  fn memoized(
    &self,
    ws: &mut Workspace,
    candidate: &Candidate,
  ) -> Result<Fitness, SearchError> {
    if let Some(fitness) = self.memo.lock().get(candidate) {
      return Ok(fitness.clone());
    }
    let fitness = self.evaluate_with(&mut ws.model, &mut ws.cache, candidate)?;
    self.memo.lock().put(candidate.clone(), fitness.clone());
    Ok(fitness)
  }

  /// Runs `f` on a free workspace, creating one from the template if all are
  /// taken.
  fn with_workspace<T>(&self, f: impl FnOnce(&mut Workspace) -> T) -> T {
    let taken = self.workspaces.lock().pop();
    let mut ws = taken.unwrap_or_else(|| Workspace::new(self.template.clone()));
    let result = f(&mut ws);
    self.workspaces.lock().push(ws);
    result
  }
}

impl Evaluator for FitnessEvaluator {
  fn evaluate(
    &self,
    candidates: &[Candidate],
  ) -> Result<Vec<Fitness>, SearchError> {
    self.evaluate_batch(candidates)
  }
}

impl std::fmt::Debug for FitnessEvaluator {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("FitnessEvaluator")
      .field("objectives", &self.objectives)
      .field("workspaces", &self.workspaces.lock().len())
      .field("memoized", &self.memo.lock().len())
      .field("simulations", &self.simulations())
      .finish_non_exhaustive()
  }
}
