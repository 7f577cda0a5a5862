//! Several populations evolving side by side.
//!
//! Each island is a [`HeuristicOptimization`] running on its own thread with
//! its own model copy, evaluator and random stream. The only thing islands
//! share is a [`MigrationChannel`]: after every generation an island offers
//! its best individual and, now and then, takes in a foreign one. Puts and
//! gets never block, so a full or empty channel only means no migration for
//! that generation.

use std::{sync::Arc, thread};

use crossbeam_queue::ArrayQueue;
use rand::{rngs::StdRng, Rng};
use uuid::Uuid;

use crate::{
  archive::BestSolutionArchive,
  config::OptimizationConfig,
  engine::{CancelToken, Individual, Migrator},
  error::SearchError,
  fitness::Sense,
  model::Model,
  objective::ObjectiveSet,
  optimization::{HeuristicOptimization, OptimizationResult, RunStatus},
  representation::Decoder,
  simulation::SimulationMethod,
};

/// A bounded FIFO of migrants shared by every island of a run.
#[derive(Debug)]
pub struct MigrationChannel {
  name: String,
  queue: ArrayQueue<Individual>,
}

impl MigrationChannel {
  /// Creates a channel holding up to `max_migrants` individuals, named
  /// uniquely for the run.
  pub fn new(max_migrants: usize) -> Self {
    Self {
      name: format!("strainga-migrants-{}", Uuid::new_v4()),
      queue: ArrayQueue::new(max_migrants.max(1)),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// Offers a migrant. Returns `false` if the channel was full and the
  /// migrant was dropped.
  pub fn put(&self, individual: Individual) -> bool {
    match self.queue.push(individual) {
      Ok(()) => true,
      Err(dropped) => {
        log::trace!("{}: full, dropped {:?}", self.name, dropped.candidate);
        false
      }
    }
  }

  /// Takes the oldest migrant, if any.
  pub fn get_nowait(&self) -> Option<Individual> {
    self.queue.pop()
  }

  pub fn capacity(&self) -> usize {
    self.queue.capacity()
  }

  pub fn len(&self) -> usize {
    self.queue.len()
  }

  pub fn is_empty(&self) -> bool {
    self.queue.is_empty()
  }
}

/// Connects one island to the channel.
///
/// With probability `rate` a waiting migrant replaces a random member of the
/// population. Then the best member is offered to the other islands.
#[derive(Debug)]
pub struct ChannelMigrator<'c> {
  channel: &'c MigrationChannel,
  island: usize,
  rate: f64,
  sense: Sense,
}

impl<'c> ChannelMigrator<'c> {
  pub fn new(
    channel: &'c MigrationChannel,
    island: usize,
    rate: f64,
    sense: Sense,
  ) -> Self {
    Self {
      channel,
      island,
      rate,
      sense,
    }
  }
}

impl Migrator for ChannelMigrator<'_> {
  fn migrate(&mut self, rng: &mut StdRng, population: &mut [Individual]) {
    if population.is_empty() {
      return;
    }
    if rng.gen_bool(self.rate) {
      if let Some(migrant) = self.channel.get_nowait() {
        let slot = rng.gen_range(0..population.len());
        log::trace!(
          "island {}: migrant {:?} replaces {:?}",
          self.island,
          migrant.candidate,
          population[slot].candidate
        );
        population[slot] = migrant;
      }
    }
    let best = population
      .iter()
      .min_by(|a, b| a.fitness.rank_cmp(&b.fitness, self.sense));
    if let Some(best) = best {
      self.channel.put(best.clone());
    }
  }
}

/// The merged outcome of every island.
#[derive(Debug, Clone)]
pub struct MultiIslandResult {
  /// Union of the island archives, bounded like each of them.
  pub archive: BestSolutionArchive,
  /// [`RunStatus::Cancelled`] if any island was cancelled.
  pub status: RunStatus,
  /// Per-island outcomes, in island order.
  pub islands: Vec<OptimizationResult>,
}

/// Cancels the sibling islands if the island thread fails or unwinds.
struct CancelOnFailure(CancelToken);

impl CancelOnFailure {
  fn check<T>(
    &self,
    island: usize,
    result: Result<T, SearchError>,
  ) -> Result<T, SearchError> {
    if let Err(err) = &result {
      log::warn!("island {island} failed, cancelling the others: {err}");
      self.0.cancel();
    }
    result
  }
}

impl Drop for CancelOnFailure {
  fn drop(&mut self) {
    if thread::panicking() {
      self.0.cancel();
    }
  }
}

/// Runs `number_of_islands` drivers in parallel and merges their archives.
///
/// Island `i` is seeded with `seed + i`. Cancelling the shared token stops
/// every island after its current generation; the archives of all finished
/// generations are still merged.
pub struct MultiIslandOptimization {
  model: Model,
  decoder: Arc<dyn Decoder>,
  simulation: Arc<dyn SimulationMethod>,
  objectives: Arc<ObjectiveSet>,
  config: OptimizationConfig,
  cancel: CancelToken,
  owns_cancel: bool,
}

impl MultiIslandOptimization {
  /// # Errors
  ///
  /// Same as [`HeuristicOptimization::new`].
  pub fn new(
    model: Model,
    decoder: impl Decoder + 'static,
    simulation: impl SimulationMethod + 'static,
    objectives: ObjectiveSet,
    config: OptimizationConfig,
  ) -> Result<Self, SearchError> {
    let this = Self {
      model,
      decoder: Arc::new(decoder),
      simulation: Arc::new(simulation),
      objectives: Arc::new(objectives),
      config,
      cancel: CancelToken::new(),
      owns_cancel: true,
    };
    this.island()?;
    Ok(this)
  }

  /// Replaces the coordinator's cancel token with a shared one, which is
  /// never reset.
  pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
    self.cancel = cancel;
    self.owns_cancel = false;
    self
  }

  /// A handle that cancels every island. The coordinator's own token is
  /// reset once all islands have stopped.
  pub fn cancel_token(&self) -> CancelToken {
    self.cancel.clone()
  }

  pub fn config(&self) -> &OptimizationConfig {
    &self.config
  }

  /// A driver for one island, sharing everything but the model.
  pub fn island(&self) -> Result<HeuristicOptimization, SearchError> {
    Ok(
      HeuristicOptimization::from_shared(
        self.model.clone(),
        self.decoder.clone(),
        self.simulation.clone(),
        self.objectives.clone(),
        self.config.clone(),
      )?
      .with_cancel_token(self.cancel.clone()),
    )
  }

  /// Runs every island to completion or cancellation.
  ///
  /// # Errors
  ///
  /// Returns [`SearchError::IslandPanicked`] if an island panicked, or the
  /// first error an island returned. Either way the other islands are
  /// cancelled as soon as the failing island stops.
  pub fn run(&self) -> Result<MultiIslandResult, SearchError> {
    let count = self.config.islands();
    let seed = self.config.seed.unwrap_or_else(rand::random);
    let channel = MigrationChannel::new(self.config.max_migrants);
    let sense = self.objectives.sense();
    log::info!(
      "launching {count} islands with base seed {seed} on {}",
      channel.name()
    );

    let drivers = (0..count)
      .map(|_| self.island())
      .collect::<Result<Vec<_>, _>>()?;

    let outcomes: Vec<thread::Result<Result<OptimizationResult, SearchError>>> =
      thread::scope(|s| {
        let handles: Vec<_> = drivers
          .into_iter()
          .enumerate()
          .map(|(i, mut driver)| {
            let channel = &channel;
            let guard = CancelOnFailure(self.cancel.clone());
            let rate = self.config.migration_rate;
            s.spawn(move || {
              let mut migrator = ChannelMigrator::new(channel, i, rate, sense);
              let result = driver.run_island(
                i,
                seed.wrapping_add(i as u64),
                Some(&mut migrator),
                Vec::new(),
              );
              guard.check(i, result)
            })
          })
          .collect();
        handles.into_iter().map(|h| h.join()).collect()
      });
    if self.owns_cancel {
      self.cancel.reset();
    }

    let mut islands = Vec::with_capacity(count);
    let mut error = None;
    for (i, outcome) in outcomes.into_iter().enumerate() {
      match outcome {
        Ok(Ok(result)) => islands.push(result),
        Ok(Err(err)) => {
          error.get_or_insert(err);
        }
        Err(_) => {
          log::warn!("island {i} panicked");
          return Err(SearchError::IslandPanicked(i));
        }
      }
    }
    if let Some(err) = error {
      return Err(err);
    }

    let mut archive =
      BestSolutionArchive::new(self.config.max_archive_size, sense);
    for island in &islands {
      archive.merge(island.archive.clone());
    }
    let status = if islands.iter().any(|r| r.status == RunStatus::Cancelled) {
      RunStatus::Cancelled
    } else {
      RunStatus::Completed
    };
    log::info!(
      "{count} islands {status:?}, merged archive holds {}",
      archive.len()
    );
    Ok(MultiIslandResult {
      archive,
      status,
      islands,
    })
  }
}

impl std::fmt::Debug for MultiIslandOptimization {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("MultiIslandOptimization")
      .field("model", &self.model.id())
      .field("objectives", &self.objectives)
      .field("config", &self.config)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use rand::SeedableRng;

  use super::*;
  use crate::{fitness::Fitness, representation::Candidate};

  fn ind<const N: usize>(c: [usize; N], f: f64) -> Individual {
    Individual::new(Candidate::from(c), Fitness::Single(f))
  }

  #[test]
  fn test_channel_is_bounded_fifo() {
    let channel = MigrationChannel::new(2);
    assert!(channel.name().starts_with("strainga-migrants-"));
    assert!(channel.put(ind([1], 1.0)));
    assert!(channel.put(ind([2], 2.0)));
    assert!(!channel.put(ind([3], 3.0)));
    assert_eq!(channel.len(), 2);
    assert_eq!(channel.get_nowait(), Some(ind([1], 1.0)));
    assert_eq!(channel.get_nowait(), Some(ind([2], 2.0)));
    assert_eq!(channel.get_nowait(), None);
  }

  #[test]
  fn test_channel_names_are_unique() {
    let (a, b) = (MigrationChannel::new(1), MigrationChannel::new(1));
    assert_ne!(a.name(), b.name());
  }

  #[test]
  fn test_migrator_offers_best() {
    let channel = MigrationChannel::new(1);
    let mut migrator = ChannelMigrator::new(&channel, 0, 0.0, Sense::Maximize);
    let mut population = vec![ind([1], 0.2), ind([2], 0.9), ind([3], 0.5)];
    migrator.migrate(&mut StdRng::seed_from_u64(0), &mut population);
    assert_eq!(channel.get_nowait(), Some(ind([2], 0.9)));
  }

  #[test]
  fn test_migrator_takes_in_migrant() {
    let channel = MigrationChannel::new(1);
    channel.put(ind([7], 5.0));
    let mut migrator = ChannelMigrator::new(&channel, 1, 1.0, Sense::Minimize);
    let mut population = vec![ind([1], 1.0), ind([2], 2.0)];
    migrator.migrate(&mut StdRng::seed_from_u64(3), &mut population);
    assert!(population.contains(&ind([7], 5.0)));
    // the migrant is the worst member, so someone else goes out
    let emigrant = channel.get_nowait().unwrap();
    assert_ne!(emigrant, ind([7], 5.0));
    assert!(population.contains(&emigrant));
  }

  #[test]
  fn test_empty_channel_is_a_no_op() {
    let channel = MigrationChannel::new(1);
    let mut migrator = ChannelMigrator::new(&channel, 0, 1.0, Sense::Maximize);
    let mut population = vec![ind([4], 1.0)];
    migrator.migrate(&mut StdRng::seed_from_u64(0), &mut population);
    assert_eq!(population, [ind([4], 1.0)]);
  }
}
