//! Genetic interventions and sets of them.

use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{error::TargetError, model::ModelScope};

/// A single intervention on a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Target {
  /// Blocks a reaction by fixing both bounds to zero.
  ReactionKnockout(String),
  /// Removes a gene, blocking the reactions that depend on it.
  GeneKnockout(String),
  /// Scales the bounds of a reaction. A fold change above one is an
  /// up-regulation, below one a down-regulation.
  ReactionModulation { id: String, fold_change: f64 },
}

impl Target {
  /// Identifier of the reaction or gene the target acts on.
  pub fn id(&self) -> &str {
    match self {
      Target::ReactionKnockout(id)
      | Target::GeneKnockout(id)
      | Target::ReactionModulation { id, .. } => id,
    }
  }

  /// Applies the intervention inside a reversible scope.
  pub fn apply(&self, scope: &mut ModelScope<'_>) -> Result<(), TargetError> {
    match self {
      Target::ReactionKnockout(id) => scope.knock_out_reaction(id),
      Target::GeneKnockout(id) => scope.knock_out_gene(id),
      Target::ReactionModulation { id, fold_change } => {
        scope.scale_bounds(id, *fold_change)
      }
    }
  }

  fn acts_on_reaction(&self) -> bool {
    !matches!(self, Target::GeneKnockout(_))
  }

  /// Whether both targets can be applied to the same model.
  fn compatible_with(&self, other: &Target) -> bool {
    if self.id() != other.id()
      || self.acts_on_reaction() != other.acts_on_reaction()
    {
      return true;
    }
    match (self, other) {
      (Target::ReactionKnockout(_), Target::ReactionKnockout(_))
      | (Target::GeneKnockout(_), Target::GeneKnockout(_)) => true,
      (
        Target::ReactionModulation { fold_change: a, .. },
        Target::ReactionModulation { fold_change: b, .. },
      ) => a == b,
      _ => false,
    }
  }
}

impl fmt::Display for Target {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Target::ReactionKnockout(id) => write!(f, "{id}(ko)"),
      Target::GeneKnockout(id) => write!(f, "{id}(gene ko)"),
      Target::ReactionModulation { id, fold_change } => {
        write!(f, "{id}(x{fold_change})")
      }
    }
  }
}

/// An ordered set of mutually compatible targets.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TargetSet(Vec<Target>);

impl TargetSet {
  /// Combines targets, dropping exact duplicates.
  ///
  /// # Errors
  ///
  /// Returns [`TargetError::Incompatible`] if two targets act on the same
  /// reaction in ways that cannot be applied together.
  pub fn new(
    targets: impl IntoIterator<Item = Target>,
  ) -> Result<Self, TargetError> {
    let mut set = Self::default();
    for target in targets {
      set.push(target)?;
    }
    Ok(set)
  }

  /// Adds one target, see [`TargetSet::new`].
  pub fn push(&mut self, target: Target) -> Result<(), TargetError> {
    if let Some(conflict) = self.0.iter().find(|t| !t.compatible_with(&target))
    {
      return Err(TargetError::Incompatible(
        conflict.to_string(),
        target.to_string(),
      ));
    }
    if !self.0.contains(&target) {
      self.0.push(target);
    }
    Ok(())
  }

  /// Applies every target in order.
  pub fn apply(&self, scope: &mut ModelScope<'_>) -> Result<(), TargetError> {
    self.0.iter().try_for_each(|t| t.apply(scope))
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Target> {
    self.0.iter()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Number of knockouts, reactions and genes alike.
  pub fn knockouts(&self) -> usize {
    self
      .0
      .iter()
      .filter(|t| !matches!(t, Target::ReactionModulation { .. }))
      .count()
  }
}

impl<'a> IntoIterator for &'a TargetSet {
  type Item = &'a Target;
  type IntoIter = std::slice::Iter<'a, Target>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.iter()
  }
}

impl fmt::Display for TargetSet {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0.iter().join(", "))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{Model, Reaction};

  fn ko(id: &str) -> Target {
    Target::ReactionKnockout(id.into())
  }

  fn up(id: &str, fold_change: f64) -> Target {
    Target::ReactionModulation {
      id: id.into(),
      fold_change,
    }
  }

  #[test]
  fn test_duplicates_are_merged() {
    let set = TargetSet::new([ko("R1"), ko("R1"), ko("R2")]).unwrap();
    assert_eq!(set.len(), 2);
  }

  #[test]
  fn test_knockout_and_modulation_conflict() {
    let err = TargetSet::new([ko("R1"), up("R1", 2.0)]).unwrap_err();
    assert_eq!(
      err,
      TargetError::Incompatible("R1(ko)".into(), "R1(x2)".into())
    );
  }

  #[test]
  fn test_different_folds_conflict() {
    assert!(TargetSet::new([up("R1", 2.0), up("R1", 0.5)]).is_err());
    assert!(TargetSet::new([up("R1", 2.0), up("R1", 2.0)]).is_ok());
  }

  #[test]
  fn test_gene_and_reaction_with_same_id_are_compatible() {
    let set =
      TargetSet::new([Target::GeneKnockout("x".into()), ko("x")]).unwrap();
    assert_eq!(set.len(), 2);
    assert_eq!(set.knockouts(), 2);
  }

  #[test]
  fn test_apply() {
    let mut model = Model::new("m");
    model.add_reaction(Reaction::new("R1", 0.0, 10.0));
    model.add_reaction(Reaction::new("R2", -1.0, 4.0).with_rule([["g"]]));
    let set = TargetSet::new([up("R1", 0.5), Target::GeneKnockout("g".into())])
      .unwrap();
    let mut scope = model.scope();
    set.apply(&mut scope).unwrap();
    assert_eq!(scope.reaction("R1").unwrap().upper_bound, 5.0);
    assert!(scope.reaction("R2").unwrap().is_blocked());
  }

  #[test]
  fn test_display() {
    let set = TargetSet::new([ko("R1"), up("R2", 2.0)]).unwrap();
    assert_eq!(set.to_string(), "R1(ko), R2(x2)");
  }
}
