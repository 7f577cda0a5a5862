//! Search configuration.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::{error::ConfigError, objective::ObjectiveSet};

/// The evolutionary heuristic driving each island.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
pub enum HeuristicMethod {
  /// A generational GA with elitist truncation. Single objective only.
  #[default]
  Ga,
  /// NSGA-II. Two or more objectives.
  Nsga2,
}

/// Every option of a heuristic optimization. Missing fields take their
/// defaults when deserialized.
///
/// # Examples
/// ```
/// # use strainga::OptimizationConfig;
/// let config = OptimizationConfig::builder()
///   .max_size(5)
///   .max_evaluations(Some(2_000))
///   .seed(42)
///   .build();
/// assert!(config.validate().is_ok());
/// ```
#[derive(TypedBuilder, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationConfig {
  /// Largest number of interventions in a design.
  #[builder(default = 9)]
  pub max_size: usize,
  /// If `false`, every design has exactly `max_size` interventions: initial
  /// designs are generated at that size and indel is left out of variation.
  #[builder(default = true)]
  pub variable_size: bool,
  #[builder(default = 0.1)]
  pub mutation_rate: f64,
  #[builder(default = 0.1)]
  pub indel_rate: f64,
  #[builder(default = 1.0)]
  pub crossover_rate: f64,
  #[builder(default = 1)]
  pub num_crossover_points: usize,
  #[builder(default = 100)]
  pub max_archive_size: usize,
  /// Capacity of the migration channel.
  #[builder(default = 1)]
  pub max_migrants: usize,
  /// Probability that an island pulls a migrant after a generation.
  #[builder(default = 0.5)]
  pub migration_rate: f64,
  /// Defaults to the size of the global worker pool.
  #[builder(default, setter(strip_option))]
  pub number_of_islands: Option<usize>,
  #[builder(default = 100)]
  pub population_size: usize,
  #[builder(default = 2)]
  pub tournament_size: usize,
  #[builder(default = Some(20_000))]
  pub max_evaluations: Option<usize>,
  #[builder(default)]
  pub max_generations: Option<usize>,
  /// Island `i` is seeded with `seed + i`. Fresh entropy if unset.
  #[builder(default, setter(strip_option))]
  pub seed: Option<u64>,
  /// Worker threads per evaluator. Defaults to rayon's choice.
  #[builder(default, setter(strip_option))]
  pub evaluation_threads: Option<usize>,
  /// Bound of the fitness memo of each evaluator.
  #[builder(default = 50_000)]
  pub memo_capacity: usize,
  #[builder(default)]
  pub heuristic_method: HeuristicMethod,
}

impl Default for OptimizationConfig {
  fn default() -> Self {
    Self::builder().build()
  }
}

impl OptimizationConfig {
  /// Checks every option on its own.
  ///
  /// # Errors
  ///
  /// Returns the first [`ConfigError`] found.
  pub fn validate(&self) -> Result<(), ConfigError> {
    for (name, value) in [
      ("mutation_rate", self.mutation_rate),
      ("indel_rate", self.indel_rate),
      ("crossover_rate", self.crossover_rate),
      ("migration_rate", self.migration_rate),
    ] {
      if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::RateOutOfRange { name, value });
      }
    }
    for (name, value) in [
      ("max_size", self.max_size),
      ("num_crossover_points", self.num_crossover_points),
      ("max_archive_size", self.max_archive_size),
      ("max_migrants", self.max_migrants),
      ("tournament_size", self.tournament_size),
      ("memo_capacity", self.memo_capacity),
      ("number_of_islands", self.number_of_islands.unwrap_or(1)),
      ("evaluation_threads", self.evaluation_threads.unwrap_or(1)),
    ] {
      if value == 0 {
        return Err(ConfigError::Zero(name));
      }
    }
    if self.population_size < 2 {
      return Err(ConfigError::PopulationTooSmall(self.population_size));
    }
    if self.max_evaluations.is_none() && self.max_generations.is_none() {
      return Err(ConfigError::NoTermination);
    }
    Ok(())
  }

  /// Checks that the heuristic can optimize `objectives`.
  ///
  /// # Errors
  ///
  /// Returns [`ConfigError::MultipleObjectivesUnsupported`] for a GA with
  /// several objectives and [`ConfigError::SingleObjectiveUnsupported`] for
  /// NSGA-II with one.
  pub fn check_objectives(
    &self,
    objectives: &ObjectiveSet,
  ) -> Result<(), ConfigError> {
    match (self.heuristic_method, objectives.len()) {
      (_, 0) => Err(ConfigError::NoObjectives),
      (HeuristicMethod::Ga, n) if n > 1 => {
        Err(ConfigError::MultipleObjectivesUnsupported(n))
      }
      (HeuristicMethod::Nsga2, 1) => Err(ConfigError::SingleObjectiveUnsupported),
      _ => Ok(()),
    }
  }

  /// Number of islands to launch.
  pub fn islands(&self) -> usize {
    self
      .number_of_islands
      .unwrap_or_else(rayon::current_num_threads)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::objective::{NumberOfKnockouts, TargetFlux};

  #[test]
  fn test_defaults() {
    let config = OptimizationConfig::default();
    assert_eq!(config.max_size, 9);
    assert!(config.variable_size);
    assert_eq!(config.mutation_rate, 0.1);
    assert_eq!(config.indel_rate, 0.1);
    assert_eq!(config.crossover_rate, 1.0);
    assert_eq!(config.num_crossover_points, 1);
    assert_eq!(config.max_archive_size, 100);
    assert_eq!(config.max_migrants, 1);
    assert_eq!(config.max_evaluations, Some(20_000));
    assert_eq!(config.heuristic_method, HeuristicMethod::Ga);
    assert!(config.validate().is_ok());
  }

  #[test]
  fn test_deserialize_partial() {
    let config: OptimizationConfig =
      serde_json::from_str(r#"{"max_size": 4, "heuristic_method": "Nsga2"}"#)
        .unwrap();
    assert_eq!(config.max_size, 4);
    assert_eq!(config.heuristic_method, HeuristicMethod::Nsga2);
    assert_eq!(config.population_size, 100);
  }

  #[test]
  fn test_invalid_options() {
    let config = OptimizationConfig::builder().mutation_rate(1.5).build();
    assert_eq!(
      config.validate(),
      Err(ConfigError::RateOutOfRange {
        name: "mutation_rate",
        value: 1.5
      })
    );
    let config = OptimizationConfig::builder().max_size(0).build();
    assert_eq!(config.validate(), Err(ConfigError::Zero("max_size")));
    let config = OptimizationConfig::builder().number_of_islands(0).build();
    assert_eq!(config.validate(), Err(ConfigError::Zero("number_of_islands")));
    let config = OptimizationConfig::builder().population_size(1).build();
    assert_eq!(config.validate(), Err(ConfigError::PopulationTooSmall(1)));
    let config = OptimizationConfig::builder().max_evaluations(None).build();
    assert_eq!(config.validate(), Err(ConfigError::NoTermination));
  }

  #[test]
  fn test_objective_count_must_match_heuristic() {
    let single = ObjectiveSet::single(TargetFlux::new("EX_p"));
    let multi = ObjectiveSet::new(vec![
      Box::new(TargetFlux::new("EX_p").minimize()),
      Box::new(NumberOfKnockouts),
    ])
    .unwrap();

    let ga = OptimizationConfig::default();
    assert!(ga.check_objectives(&single).is_ok());
    assert_eq!(
      ga.check_objectives(&multi),
      Err(ConfigError::MultipleObjectivesUnsupported(2))
    );

    let nsga = OptimizationConfig::builder()
      .heuristic_method(HeuristicMethod::Nsga2)
      .build();
    assert!(nsga.check_objectives(&multi).is_ok());
    assert_eq!(
      nsga.check_objectives(&single),
      Err(ConfigError::SingleObjectiveUnsupported)
    );
  }
}
