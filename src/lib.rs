//! **strainga** searches for genetic interventions that make an organism
//! produce more of what you want. Given a constraint-based metabolic model, it
//! evolves sets of reaction or gene knockouts, scores each set by simulating
//! the knocked-out model, and keeps the best and simplest designs it finds.
//!
//! Here's a [quick start example](#example) for the impatient.
//!
//! The crate does not ship a linear programming solver. You bring the
//! **simulation method**, usually a flux balance analysis on top of the solver
//! you already use, and the crate does the rest:
//! - A **representation** lists the reactions or genes the search may touch.
//!   A **candidate** is a set of unique indices into it, and a [`Decoder`]
//!   turns a candidate into the [`Target`]s to apply
//! - The [`FitnessEvaluator`] applies those targets inside a [`ModelScope`],
//!   simulates, scores the flux state with one or more
//!   [`ObjectiveFunction`]s and rolls the model back, whatever happened
//! - **Variation operators** breed new candidates: [`SetNPointCrossover`],
//!   [`SetMutation`] and [`SetIndel`] all keep indices unique and sizes within
//!   `max_size`
//! - The [`BestSolutionArchive`] keeps the best designs seen so far, preferring
//!   a subset over its supersets when both are equally fit
//! - A [`HeuristicOptimization`] runs one population, a
//!   [`MultiIslandOptimization`] runs several in parallel with migration
//!   between them
//! - A [`ResultTable`] re-simulates the archived designs and tabulates them
//!
//! # Simulation methods
//!
//! A [`SimulationMethod`] receives the scoped model, with the candidate's
//! targets already applied, and a [`ProblemCache`]. Anything the method adds to
//! the auxiliary problem should go through the cache: the first time a term is
//! added it is created, every later time it is only patched. That saves
//! rebuilding the same structure for every candidate.
//!
//! A method that can't solve the problem returns a [`SimulationError`]. The
//! evaluator never propagates it: the candidate simply gets the worst fitness
//! its objectives can have, 0 when maximizing and infinity when minimizing, and
//! the generation goes on.
//!
//! **Every hook is implemented for closures**, simulation methods included, so
//! a function with the right signature is all you need.
//!
//! # Engine and hooks
//!
//! The generational loop lives in [`Engine`] and knows nothing about
//! metabolism. It calls hooks: a [`Generator`], an [`Evaluator`], a
//! [`Selector`], a [`Variator`], a [`Replacer`], an [`Archiver`], a
//! [`Terminator`] and, optionally, a [`Migrator`] and [`Observer`]s. The
//! drivers assemble them from an [`OptimizationConfig`]:
//!
//! | Hook         | Provided by                                                   |
//! |:-------------|:--------------------------------------------------------------|
//! | generator    | [`RandomSubsetGenerator`]                                     |
//! | evaluator    | [`FitnessEvaluator`]                                          |
//! | selector     | [`TournamentSelector`]                                        |
//! | variator     | [`VariatorPipeline`]: crossover, then mutation, then indel    |
//! | replacer     | [`TruncationReplacer`] (GA) or [`NondominatedReplacer`] (NSGA-II) |
//! | archiver     | [`BestSolutionArchive`]                                       |
//! | terminator   | [`EvaluationTerminator`] and [`GenerationTerminator`]         |
//! | migrator     | [`ChannelMigrator`]                                           |
//! | observer     | [`LoggingObserver`] and your own                              |
//!
//! You can use the engine on its own with different hooks if the drivers
//! don't suit you.
//!
//! # Parallelization
//!
//! Each evaluator owns a [rayon] pool. A generation is split into contiguous
//! chunks, each chunk is evaluated on a private copy of the model, and the
//! generation only moves on once every chunk is done. Islands run on their own
//! threads and only share the [`MigrationChannel`], which never blocks.
//!
//! Results are reproducible for a given seed, number of islands and number of
//! evaluation threads. Migration timing depends on thread scheduling, so
//! multi-island runs generally are not.
//!
//! # Cancellation
//!
//! Every driver hands out a [`CancelToken`]. Once it is set, evaluators stop
//! at the next candidate, the unfinished generation is thrown away and the run
//! ends with [`RunStatus::Cancelled`] and the archive of every generation that
//! did finish.
//!
//! # Logging
//!
//! The crate logs through [log] and never installs a logger. Runs log at
//! `info`, generations and recovered simulation failures at `debug`, cache and
//! migration details at `trace`.
//!
//! # Example
//!
//! A linear pathway `R0 -> R1 -> R2` with a bypass `R3` around `R1`. The toy
//! simulation routes as much flux as possible to `EX_p` and wastes whatever
//! goes through the bypass, so the best single knockout is the bypass.
//! ```
//! # fn main() -> Result<(), strainga::SearchError> {
//! use strainga::{
//!   FluxState, Model, ModelScope, MultiIslandOptimization, ObjectiveSet,
//!   OptimizationConfig, ProblemCache, Reaction, ReactionKnockoutDecoder,
//!   Representation, SimulationError, TargetFlux,
//! };
//!
//! let mut model = Model::new("pathway");
//! model.add_reaction(Reaction::new("R0", 0.0, 10.0));
//! model.add_reaction(Reaction::new("R1", 0.0, 10.0));
//! model.add_reaction(Reaction::new("R2", 0.0, 10.0));
//! model.add_reaction(Reaction::new("R3", 0.0, 4.0));
//!
//! let simulate = |scope: &mut ModelScope<'_>, _: &mut ProblemCache| {
//!   let bound = |id: &str| scope.reaction(id).map_or(0.0, |r| r.upper_bound);
//!   if bound("R0") == 0.0 {
//!     return Err(SimulationError::Infeasible);
//!   }
//!   let through = bound("R0").min(bound("R1") + bound("R3"));
//!   let wasted = bound("R3").min(through);
//!   let product = (through - wasted).min(bound("R2"));
//!   Ok(FluxState::new([("EX_p", product)], through))
//! };
//!
//! let representation = Representation::reactions(&model, &["R0"]);
//! let config = OptimizationConfig::builder()
//!   .max_size(1)
//!   .population_size(6)
//!   .max_evaluations(Some(60))
//!   .number_of_islands(2)
//!   .seed(3)
//!   .build();
//! let search = MultiIslandOptimization::new(
//!   model,
//!   ReactionKnockoutDecoder::new(representation),
//!   simulate,
//!   ObjectiveSet::single(TargetFlux::new("EX_p")),
//!   config,
//! )?;
//!
//! let result = search.run()?;
//! let best = result.archive.best().unwrap();
//! assert_eq!(best.fitness.values(), [10.0]);
//! # Ok(())
//! # }
//! ```
//!
//! [`Target`]: crate::target::Target
//! [`ObjectiveFunction`]: crate::objective::ObjectiveFunction
//! [`SetNPointCrossover`]: crate::recombination::SetNPointCrossover
//! [`SetMutation`]: crate::mutation::SetMutation
//! [`SetIndel`]: crate::mutation::SetIndel
//! [`Generator`]: crate::engine::Generator
//! [`Evaluator`]: crate::engine::Evaluator
//! [`Selector`]: crate::engine::Selector
//! [`Replacer`]: crate::engine::Replacer
//! [`Archiver`]: crate::engine::Archiver
//! [`Terminator`]: crate::engine::Terminator
//! [`Migrator`]: crate::engine::Migrator
//! [`Observer`]: crate::engine::Observer
//! [`Variator`]: crate::variation::Variator
//! [`VariatorPipeline`]: crate::variation::VariatorPipeline
//! [`TournamentSelector`]: crate::selection::TournamentSelector
//! [`TruncationReplacer`]: crate::replacement::TruncationReplacer
//! [`NondominatedReplacer`]: crate::replacement::NondominatedReplacer
//! [`EvaluationTerminator`]: crate::termination::EvaluationTerminator
//! [`GenerationTerminator`]: crate::termination::GenerationTerminator
//! [`RandomSubsetGenerator`]: crate::optimization::RandomSubsetGenerator
//! [`LoggingObserver`]: crate::optimization::LoggingObserver
//! [`ChannelMigrator`]: crate::island::ChannelMigrator
//! [`MigrationChannel`]: crate::island::MigrationChannel
//! [rayon]: https://docs.rs/rayon
//! [log]: https://docs.rs/log

pub mod archive;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluation;
pub mod fitness;
pub mod island;
pub mod model;
pub mod mutation;
pub mod objective;
pub mod optimization;
pub mod problem;
pub mod recombination;
pub mod replacement;
pub mod representation;
pub mod results;
pub mod selection;
pub mod simulation;
pub mod target;
pub mod termination;
pub mod variation;

pub use archive::BestSolutionArchive;
pub use config::{HeuristicMethod, OptimizationConfig};
pub use engine::{CancelToken, Engine, EvolutionStats, Individual};
pub use error::{
  ConfigError, RepresentationError, SearchError, SimulationError, TargetError,
};
pub use evaluation::FitnessEvaluator;
pub use fitness::{Fitness, Sense};
pub use island::{MultiIslandOptimization, MultiIslandResult};
pub use model::{Gene, Model, ModelScope, Reaction};
pub use objective::{
  BiomassProductCoupledYield, NumberOfKnockouts, ObjectiveSet, ProductYield,
  TargetFlux,
};
pub use optimization::{HeuristicOptimization, OptimizationResult, RunStatus};
pub use problem::{Constraint, Problem, ProblemCache, Variable};
pub use representation::{
  Candidate, Decoded, Decoder, GeneKnockoutDecoder, ReactionKnockoutDecoder,
  Representation,
};
pub use results::{DesignRow, ReportColumn, ResultTable};
pub use simulation::{FluxState, SimulationMethod};
