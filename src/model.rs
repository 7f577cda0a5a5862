//! A minimal constraint-based metabolic model.
//!
//! The model owns its reactions and genes in insertion-ordered maps. Reactions
//! refer to genes by identifier only, and nothing refers back to the model, so
//! there are no ownership cycles to manage.
//!
//! All modifications made during an evaluation go through a [`ModelScope`],
//! which records every change and reverts it when dropped. Whatever happens
//! inside the scope, an early return, a `?` or a panic, the model comes out
//! exactly as it went in.

use std::ops::Deref;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{error::TargetError, problem::Problem};

/// A reaction with flux bounds and a gene-protein-reaction rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
  pub id: String,
  #[serde(default)]
  pub name: String,
  pub lower_bound: f64,
  pub upper_bound: f64,
  /// Rule in disjunctive normal form: the reaction is active while at least
  /// one complex has all of its genes functional. An empty rule means the
  /// reaction does not depend on any gene.
  #[serde(default)]
  pub gene_reaction_rule: Vec<Vec<String>>,
}

impl Reaction {
  pub fn new(id: impl Into<String>, lower_bound: f64, upper_bound: f64) -> Self {
    Self {
      id: id.into(),
      name: String::new(),
      lower_bound,
      upper_bound,
      gene_reaction_rule: Vec::new(),
    }
  }

  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = name.into();
    self
  }

  /// Sets the rule, one inner slice per complex.
  pub fn with_rule<I, C, G>(mut self, complexes: I) -> Self
  where
    I: IntoIterator<Item = C>,
    C: IntoIterator<Item = G>,
    G: Into<String>,
  {
    self.gene_reaction_rule = complexes
      .into_iter()
      .map(|c| c.into_iter().map(Into::into).collect())
      .collect();
    self
  }

  /// Genes mentioned in the rule, in order of first appearance.
  pub fn genes(&self) -> impl Iterator<Item = &str> {
    let mut seen = Vec::<&str>::new();
    self
      .gene_reaction_rule
      .iter()
      .flatten()
      .filter_map(move |g| {
        (!seen.contains(&g.as_str())).then(|| {
          seen.push(g.as_str());
          g.as_str()
        })
      })
  }

  /// Whether the rule holds when `functional` tells which genes still work.
  pub fn rule_satisfied(&self, functional: impl Fn(&str) -> bool) -> bool {
    self.gene_reaction_rule.is_empty()
      || self
        .gene_reaction_rule
        .iter()
        .any(|complex| complex.iter().all(|g| functional(g)))
  }

  pub fn is_blocked(&self) -> bool {
    self.lower_bound == 0.0 && self.upper_bound == 0.0
  }
}

/// A gene that may be knocked out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gene {
  pub id: String,
  #[serde(default)]
  pub name: String,
  pub functional: bool,
}

impl Gene {
  pub fn new(id: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      name: String::new(),
      functional: true,
    }
  }
}

/// A genome-scale metabolic model reduced to what strain design needs.
#[derive(Debug, Clone, Default)]
pub struct Model {
  id: String,
  reactions: IndexMap<String, Reaction>,
  genes: IndexMap<String, Gene>,
  objective: IndexMap<String, f64>,
  problem: Problem,
}

impl Model {
  pub fn new(id: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      ..Self::default()
    }
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  /// Adds a reaction, registering every gene its rule mentions. A reaction
  /// with the same identifier is replaced.
  pub fn add_reaction(&mut self, reaction: Reaction) {
    for gene in reaction.genes() {
      if !self.genes.contains_key(gene) {
        self.genes.insert(gene.to_owned(), Gene::new(gene));
      }
    }
    self.reactions.insert(reaction.id.clone(), reaction);
  }

  pub fn add_gene(&mut self, gene: Gene) {
    self.genes.insert(gene.id.clone(), gene);
  }

  /// Sets the linear objective outside of any scope. Use
  /// [`ModelScope::set_objective`] for reversible changes.
  pub fn set_objective<I, S>(&mut self, coefficients: I)
  where
    I: IntoIterator<Item = (S, f64)>,
    S: Into<String>,
  {
    self.objective = coefficients
      .into_iter()
      .map(|(id, c)| (id.into(), c))
      .collect();
  }

  pub fn reaction(&self, id: &str) -> Option<&Reaction> {
    self.reactions.get(id)
  }

  pub fn gene(&self, id: &str) -> Option<&Gene> {
    self.genes.get(id)
  }

  pub fn reactions(&self) -> impl Iterator<Item = &Reaction> {
    self.reactions.values()
  }

  pub fn genes(&self) -> impl Iterator<Item = &Gene> {
    self.genes.values()
  }

  pub fn objective(&self) -> &IndexMap<String, f64> {
    &self.objective
  }

  pub fn problem(&self) -> &Problem {
    &self.problem
  }

  /// Reactions that lose every complex when all of `genes` are knocked out.
  /// Reactions without a rule are never affected.
  pub fn knockout_reactions(&self, genes: &[&str]) -> Vec<String> {
    self
      .reactions
      .values()
      .filter(|r| !r.gene_reaction_rule.is_empty())
      .filter(|r| {
        !r.rule_satisfied(|g| {
          !genes.contains(&g) && self.genes.get(g).map_or(true, |g| g.functional)
        })
      })
      .map(|r| r.id.clone())
      .collect()
  }

  /// Opens a reversible modification of the model.
  pub fn scope(&mut self) -> ModelScope<'_> {
    ModelScope {
      model: self,
      log: Vec::new(),
    }
  }
}

/// A change recorded by a scope, holding the value to restore.
#[derive(Debug)]
enum Change {
  Bounds { id: String, lower: f64, upper: f64 },
  Functional { id: String, functional: bool },
  Objective(IndexMap<String, f64>),
}

/// A scoped, reversible modification of a [`Model`].
///
/// Dereferences to the model for reading. Every write goes through a method
/// that logs the previous value; the log is replayed backwards on drop.
/// Auxiliary problem terms are not logged: they belong to the
/// [`ProblemCache`](crate::problem::ProblemCache).
#[derive(Debug)]
pub struct ModelScope<'a> {
  model: &'a mut Model,
  log: Vec<Change>,
}

impl Deref for ModelScope<'_> {
  type Target = Model;

  fn deref(&self) -> &Self::Target {
    self.model
  }
}

impl ModelScope<'_> {
  pub fn set_bounds(
    &mut self,
    id: &str,
    lower: f64,
    upper: f64,
  ) -> Result<(), TargetError> {
    let reaction = self
      .model
      .reactions
      .get_mut(id)
      .ok_or_else(|| TargetError::UnknownReaction(id.to_owned()))?;
    self.log.push(Change::Bounds {
      id: id.to_owned(),
      lower: reaction.lower_bound,
      upper: reaction.upper_bound,
    });
    reaction.lower_bound = lower;
    reaction.upper_bound = upper;
    Ok(())
  }

  pub fn knock_out_reaction(&mut self, id: &str) -> Result<(), TargetError> {
    self.set_bounds(id, 0.0, 0.0)
  }

  /// Multiplies both bounds of a reaction by `fold_change`.
  pub fn scale_bounds(
    &mut self,
    id: &str,
    fold_change: f64,
  ) -> Result<(), TargetError> {
    let (lower, upper) = self
      .model
      .reaction(id)
      .map(|r| (r.lower_bound, r.upper_bound))
      .ok_or_else(|| TargetError::UnknownReaction(id.to_owned()))?;
    self.set_bounds(id, lower * fold_change, upper * fold_change)
  }

  /// Marks a gene as non-functional and blocks every reaction whose rule no
  /// longer holds.
  pub fn knock_out_gene(&mut self, id: &str) -> Result<(), TargetError> {
    let gene = self
      .model
      .genes
      .get_mut(id)
      .ok_or_else(|| TargetError::UnknownGene(id.to_owned()))?;
    if gene.functional {
      self.log.push(Change::Functional {
        id: id.to_owned(),
        functional: true,
      });
      gene.functional = false;
    }
    let genes = &self.model.genes;
    let blocked: Vec<String> = self
      .model
      .reactions
      .values()
      .filter(|r| r.genes().any(|g| g == id) && !r.is_blocked())
      .filter(|r| !r.rule_satisfied(|g| genes.get(g).map_or(true, |g| g.functional)))
      .map(|r| r.id.clone())
      .collect();
    for reaction in blocked {
      self.knock_out_reaction(&reaction)?;
    }
    Ok(())
  }

  pub fn set_objective(&mut self, objective: IndexMap<String, f64>) {
    let previous = std::mem::replace(&mut self.model.objective, objective);
    self.log.push(Change::Objective(previous));
  }

  /// Mutable access to the auxiliary problem for the problem cache.
  pub fn problem_mut(&mut self) -> &mut Problem {
    &mut self.model.problem
  }

  /// Number of changes that will be reverted on drop.
  pub fn changes(&self) -> usize {
    self.log.len()
  }
}

impl Drop for ModelScope<'_> {
  fn drop(&mut self) {
    while let Some(change) = self.log.pop() {
      match change {
        Change::Bounds { id, lower, upper } => {
          if let Some(reaction) = self.model.reactions.get_mut(&id) {
            reaction.lower_bound = lower;
            reaction.upper_bound = upper;
          }
        }
        Change::Functional { id, functional } => {
          if let Some(gene) = self.model.genes.get_mut(&id) {
            gene.functional = functional;
          }
        }
        Change::Objective(objective) => self.model.objective = objective,
      }
    }
  }
}
