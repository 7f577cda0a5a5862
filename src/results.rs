//! Tabulating archived designs.

use std::fmt;

use indexmap::IndexMap;
use itertools::Itertools;
use serde::Serialize;

use crate::{
  engine::Individual,
  error::SearchError,
  evaluation::FitnessEvaluator,
  fitness::Fitness,
  simulation::FluxState,
  target::TargetSet,
};

/// A quantity read from the re-simulated flux state of each design.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum ReportColumn {
  /// The value of the model's own objective, usually the growth rate.
  ObjectiveValue,
  /// Flux through a reaction.
  Flux(String),
}

impl ReportColumn {
  pub fn name(&self) -> &str {
    match self {
      ReportColumn::ObjectiveValue => "objective_value",
      ReportColumn::Flux(id) => id,
    }
  }

  fn value(&self, flux: &FluxState) -> Option<f64> {
    match self {
      ReportColumn::ObjectiveValue => Some(flux.objective_value()),
      ReportColumn::Flux(id) => flux.flux(id),
    }
  }
}

/// One archived design.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DesignRow {
  /// The report targets of the design.
  pub targets: TargetSet,
  pub fitness: Fitness,
  /// Number of indices in the candidate.
  pub size: usize,
  /// Auxiliary values by column name. `None` means not computed, either
  /// because the re-simulation failed or the flux was not reported.
  pub values: IndexMap<String, Option<f64>>,
  /// Whether the re-simulation succeeded.
  pub feasible: bool,
}

/// Archived designs with their fitness and auxiliary values, one row each.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultTable {
  objectives: Vec<String>,
  columns: Vec<ReportColumn>,
  rows: Vec<DesignRow>,
}

impl ResultTable {
  /// Re-simulates every individual and collects one row per individual, in
  /// order. Designs whose re-simulation fails are kept, marked infeasible.
  ///
  /// # Errors
  ///
  /// Fails if a candidate cannot be decoded or its targets applied.
  pub fn assemble<'a>(
    individuals: impl IntoIterator<Item = &'a Individual>,
    evaluator: &FitnessEvaluator,
    columns: Vec<ReportColumn>,
  ) -> Result<Self, SearchError> {
    let rows = individuals
      .into_iter()
      .map(|individual| {
        let candidate = &individual.candidate;
        let targets = evaluator.decoder().decode(candidate)?.report;
        let values = evaluator.inspect(candidate, |_, flux, _| {
          columns
            .iter()
            .map(|c| (c.name().to_owned(), c.value(flux)))
            .collect::<IndexMap<_, _>>()
        })?;
        let feasible = values.is_some();
        if !feasible {
          log::debug!("re-simulation of {targets} failed");
        }
        Ok(DesignRow {
          targets,
          fitness: individual.fitness.clone(),
          size: candidate.len(),
          values: values.unwrap_or_else(|| {
            columns.iter().map(|c| (c.name().to_owned(), None)).collect()
          }),
          feasible,
        })
      })
      .collect::<Result<Vec<_>, SearchError>>()?;
    Ok(Self {
      objectives: evaluator.objectives().names().map(str::to_owned).collect(),
      columns,
      rows,
    })
  }

  /// Column names: targets, one per objective, size, then the auxiliary
  /// columns.
  pub fn header(&self) -> Vec<&str> {
    ["targets"]
      .into_iter()
      .chain(self.objectives.iter().map(String::as_str))
      .chain(["size"])
      .chain(self.columns.iter().map(ReportColumn::name))
      .collect()
  }

  pub fn columns(&self) -> &[ReportColumn] {
    &self.columns
  }

  pub fn rows(&self) -> &[DesignRow] {
    &self.rows
  }

  pub fn len(&self) -> usize {
    self.rows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }
}

/// Tab separated, one line per row. Values that were not computed print as
/// `NA`.
impl fmt::Display for ResultTable {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "{}", self.header().iter().join("\t"))?;
    for row in &self.rows {
      let values = row
        .values
        .values()
        .map(|v| v.map_or_else(|| "NA".to_owned(), |v| v.to_string()));
      let line = [row.targets.to_string()]
        .into_iter()
        .chain(row.fitness.values().iter().map(f64::to_string))
        .chain([row.size.to_string()])
        .chain(values)
        .join("\t");
      writeln!(f, "{line}")?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::{
    error::SimulationError,
    model::{Model, ModelScope, Reaction},
    objective::{ObjectiveSet, TargetFlux},
    problem::ProblemCache,
    representation::{Candidate, ReactionKnockoutDecoder, Representation},
  };

  /// Infeasible without `R0`. Reports `P` only.
  fn simulate(
    scope: &mut ModelScope<'_>,
    _: &mut ProblemCache,
  ) -> Result<FluxState, SimulationError> {
    if scope.reaction("R0").is_some_and(Reaction::is_blocked) {
      return Err(SimulationError::Infeasible);
    }
    let total = scope.reactions().map(|r| r.upper_bound).sum::<f64>();
    Ok(FluxState::new([("P", total)], 0.5))
  }

  fn evaluator() -> FitnessEvaluator {
    let mut model = Model::new("toy");
    for (id, ub) in [("R0", 1.0), ("R1", 2.0), ("R2", 4.0)] {
      model.add_reaction(Reaction::new(id, 0.0, ub));
    }
    let representation = Representation::reactions(&model, &[]);
    FitnessEvaluator::new(
      model,
      Arc::new(ReactionKnockoutDecoder::new(representation)),
      Arc::new(simulate),
      Arc::new(ObjectiveSet::single(TargetFlux::new("P"))),
      Some(1),
      8,
    )
    .unwrap()
  }

  fn table() -> ResultTable {
    let individuals = [
      Individual::new(Candidate::from([2]), Fitness::Single(3.0)),
      Individual::new(Candidate::from([0, 1]), Fitness::Single(0.0)),
    ];
    ResultTable::assemble(
      &individuals,
      &evaluator(),
      vec![
        ReportColumn::ObjectiveValue,
        ReportColumn::Flux("P".into()),
        ReportColumn::Flux("missing".into()),
      ],
    )
    .unwrap()
  }

  #[test]
  fn test_rows() {
    let table = table();
    assert_eq!(table.len(), 2);

    let row = &table.rows()[0];
    assert!(row.feasible);
    assert_eq!(row.size, 1);
    assert_eq!(row.targets.to_string(), "R2(ko)");
    assert_eq!(row.values["objective_value"], Some(0.5));
    assert_eq!(row.values["P"], Some(3.0));
    assert_eq!(row.values["missing"], None);
  }

  #[test]
  fn test_failed_resimulation_is_marked() {
    let table = table();
    let row = &table.rows()[1];
    assert!(!row.feasible);
    assert_eq!(row.size, 2);
    assert!(row.values.values().all(Option::is_none));
    assert_eq!(row.values.len(), 3);
  }

  #[test]
  fn test_display() {
    let rendered = table().to_string();
    let lines: Vec<_> = rendered.lines().collect();
    assert_eq!(lines[0], "targets\tP\tsize\tobjective_value\tP\tmissing");
    assert_eq!(lines[1], "R2(ko)\t3\t1\t0.5\t3\tNA");
    assert_eq!(lines[2], "R0(ko), R1(ko)\t0\t2\tNA\tNA\tNA");
  }
}
