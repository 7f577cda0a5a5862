//! The contract between the evaluator and a simulation method.
//!
//! This crate does not solve linear programs. A simulation method, usually a
//! flux balance analysis backed by some LP solver, is supplied by the user.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{error::SimulationError, model::ModelScope, problem::ProblemCache};

/// Fluxes computed by a simulation method.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FluxState {
  fluxes: IndexMap<String, f64>,
  objective_value: f64,
}

impl FluxState {
  pub fn new<I, S>(fluxes: I, objective_value: f64) -> Self
  where
    I: IntoIterator<Item = (S, f64)>,
    S: Into<String>,
  {
    Self {
      fluxes: fluxes.into_iter().map(|(id, v)| (id.into(), v)).collect(),
      objective_value,
    }
  }

  /// Flux through reaction `id`, if the simulation reported it.
  pub fn flux(&self, id: &str) -> Option<f64> {
    self.fluxes.get(id).copied()
  }

  pub fn objective_value(&self) -> f64 {
    self.objective_value
  }

  pub fn fluxes(&self) -> impl Iterator<Item = (&str, f64)> {
    self.fluxes.iter().map(|(k, v)| (k.as_str(), *v))
  }
}

/// Computes a flux state for a model with interventions applied.
///
/// Implementations receive the scope the evaluator opened, so any change they
/// make to bounds or the objective is rolled back with it, and the problem
/// cache, through which they add auxiliary terms to
/// [`ModelScope::problem_mut`].
///
/// Infeasible, unbounded or numerically failed problems must be reported as a
/// [`SimulationError`], never by panicking.
///
/// **Note that you always can implement this trait for a closure** of type
/// `Fn(&mut ModelScope<'_>, &mut ProblemCache) -> Result<FluxState, SimulationError>`.
pub trait SimulationMethod: Send + Sync {
  fn simulate(
    &self,
    scope: &mut ModelScope<'_>,
    cache: &mut ProblemCache,
  ) -> Result<FluxState, SimulationError>;
}

impl<F> SimulationMethod for F
where
  F: Fn(&mut ModelScope<'_>, &mut ProblemCache) -> Result<FluxState, SimulationError>
    + Send
    + Sync,
{
  fn simulate(
    &self,
    scope: &mut ModelScope<'_>,
    cache: &mut ProblemCache,
  ) -> Result<FluxState, SimulationError> {
    self(scope, cache)
  }
}
