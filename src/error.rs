//! Error types used throughout the crate.
//!
//! Failures fall into four groups: simulation failures, which the evaluator
//! recovers from locally, invalid configuration, cancellation, and target
//! errors. Only the first one is never seen by the caller.

use thiserror::Error;

/// A failure raised by a simulation method.
///
/// The evaluator converts every `SimulationError` into the worst fitness of
/// the configured objectives, so one bad candidate never aborts a generation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
  /// No flux distribution satisfies the constraints.
  #[error("problem is infeasible")]
  Infeasible,
  /// The objective can grow without bound.
  #[error("problem is unbounded")]
  Unbounded,
  /// The solver gave up for numerical reasons.
  #[error("numerical failure: {0}")]
  Numerical(String),
}

/// An invalid configuration, detected before any evaluation begins.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
  #[error("at least one objective function is required")]
  NoObjectives,
  #[error("objective functions disagree on the optimization sense")]
  MixedSenses,
  #[error(
    "the GA heuristic optimizes a single objective but {0} were supplied; \
     use the NSGA-II heuristic instead"
  )]
  MultipleObjectivesUnsupported(usize),
  #[error("the NSGA-II heuristic requires at least two objectives")]
  SingleObjectiveUnsupported,
  #[error("`{name}` must lie within [0, 1], got {value}")]
  RateOutOfRange { name: &'static str, value: f64 },
  #[error("`{0}` must be greater than zero")]
  Zero(&'static str),
  #[error("population size must be at least 2, got {0}")]
  PopulationTooSmall(usize),
  #[error("the representation is empty")]
  EmptyRepresentation,
  #[error("no termination condition was configured")]
  NoTermination,
}

/// An error raised while building or applying interventions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TargetError {
  #[error("unknown reaction `{0}`")]
  UnknownReaction(String),
  #[error("unknown gene `{0}`")]
  UnknownGene(String),
  /// Two interventions on the same entity that cannot be applied together.
  #[error("targets `{0}` and `{1}` cannot be applied together")]
  Incompatible(String, String),
}

/// An error in a representation or in a candidate that indexes into it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RepresentationError {
  #[error("identifier `{0}` appears more than once")]
  Duplicate(String),
  #[error("identifier `{0}` does not exist in the model")]
  Unknown(String),
  #[error("index {index} is out of range for a representation of length {len}")]
  OutOfRange { index: usize, len: usize },
}

/// The error returned by search drivers and the evolution engine.
#[derive(Debug, Error)]
pub enum SearchError {
  /// The run was interrupted. This is an expected control-flow signal, not a
  /// crash: pools are shut down before it reaches the caller.
  #[error("search was cancelled")]
  Cancelled,
  #[error(transparent)]
  Config(#[from] ConfigError),
  #[error(transparent)]
  Target(#[from] TargetError),
  #[error(transparent)]
  Representation(#[from] RepresentationError),
  #[error("failed to build the evaluation pool: {0}")]
  Pool(#[from] rayon::ThreadPoolBuildError),
  #[error("island {0} panicked")]
  IslandPanicked(usize),
}

impl SearchError {
  /// Returns `true` if the error is the cancellation signal.
  pub fn is_cancelled(&self) -> bool {
    matches!(self, SearchError::Cancelled)
  }
}
