//! Candidate encoding and decoding.
//!
//! A search run fixes a [`Representation`], an ordered list of unique
//! reaction or gene identifiers. A [`Candidate`] is a set of indices into it.
//! A [`Decoder`] turns a candidate into concrete [`Target`]s.

use std::collections::BTreeSet;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::{
  error::{RepresentationError, SearchError},
  model::Model,
  target::{Target, TargetSet},
};

/// An ordered sequence of unique domain identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Representation(IndexSet<String>);

impl Representation {
  /// # Errors
  ///
  /// Returns [`RepresentationError::Duplicate`] if an identifier repeats.
  pub fn new<I, S>(ids: I) -> Result<Self, RepresentationError>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let mut set = IndexSet::new();
    for id in ids {
      let id = id.into();
      if set.contains(&id) {
        return Err(RepresentationError::Duplicate(id));
      }
      set.insert(id);
    }
    Ok(Self(set))
  }

  /// Every reaction of `model` except the ones listed in `exclude`.
  pub fn reactions(model: &Model, exclude: &[&str]) -> Self {
    Self(
      model
        .reactions()
        .map(|r| r.id.as_str())
        .filter(|id| !exclude.contains(id))
        .map(str::to_owned)
        .collect(),
    )
  }

  /// Every gene of `model` except the ones listed in `exclude`.
  pub fn genes(model: &Model, exclude: &[&str]) -> Self {
    Self(
      model
        .genes()
        .map(|g| g.id.as_str())
        .filter(|id| !exclude.contains(id))
        .map(str::to_owned)
        .collect(),
    )
  }

  pub fn get(&self, index: usize) -> Option<&str> {
    self.0.get_index(index).map(String::as_str)
  }

  pub fn index_of(&self, id: &str) -> Option<usize> {
    self.0.get_index_of(id)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.0.iter().map(String::as_str)
  }

  /// Encodes identifiers as a candidate.
  pub fn encode<'a>(
    &self,
    ids: impl IntoIterator<Item = &'a str>,
  ) -> Result<Candidate, RepresentationError> {
    ids
      .into_iter()
      .map(|id| {
        self
          .index_of(id)
          .ok_or_else(|| RepresentationError::Unknown(id.to_owned()))
      })
      .collect()
  }

  fn resolve(&self, index: usize) -> Result<&str, RepresentationError> {
    self.get(index).ok_or(RepresentationError::OutOfRange {
      index,
      len: self.len(),
    })
  }
}

/// A set of unique indices into a [`Representation`]. Order is irrelevant;
/// iteration is always ascending.
#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Default,
  Serialize,
  Deserialize,
)]
pub struct Candidate(BTreeSet<usize>);

impl Candidate {
  pub fn new(indices: impl IntoIterator<Item = usize>) -> Self {
    Self(indices.into_iter().collect())
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn contains(&self, index: usize) -> bool {
    self.0.contains(&index)
  }

  pub fn iter(&self) -> impl DoubleEndedIterator<Item = usize> + '_ {
    self.0.iter().copied()
  }

  pub fn is_subset(&self, other: &Candidate) -> bool {
    self.0.is_subset(&other.0)
  }

  /// Subset with a non-empty symmetric difference.
  pub fn is_strict_subset(&self, other: &Candidate) -> bool {
    self.len() < other.len() && self.is_subset(other)
  }

  pub(crate) fn insert(&mut self, index: usize) -> bool {
    self.0.insert(index)
  }

  pub(crate) fn remove(&mut self, index: usize) -> bool {
    self.0.remove(&index)
  }

  /// Whether every index lies below `len` and the size is within
  /// `1..=max_size`.
  pub fn is_valid(&self, len: usize, max_size: usize) -> bool {
    (1..=max_size).contains(&self.len())
      && self.0.last().map_or(true, |&i| i < len)
  }
}

impl FromIterator<usize> for Candidate {
  fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
    Self::new(iter)
  }
}

impl<const N: usize> From<[usize; N]> for Candidate {
  fn from(indices: [usize; N]) -> Self {
    Self::new(indices)
  }
}

/// The two target lists a candidate decodes to.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Decoded {
  /// Interventions applied to the model before simulating.
  pub simulation: TargetSet,
  /// The same interventions, possibly expanded, for reporting.
  pub report: TargetSet,
}

/// Turns candidates into targets.
///
/// Decoding must be a pure function of the representation and the candidate.
pub trait Decoder: Send + Sync {
  fn representation(&self) -> &Representation;

  /// # Errors
  ///
  /// Fails if an index is out of range or the decoded targets are
  /// incompatible with each other.
  fn decode(&self, candidate: &Candidate) -> Result<Decoded, SearchError>;
}

/// Decodes each index to a knockout of the reaction with that identifier.
#[derive(Debug, Clone)]
pub struct ReactionKnockoutDecoder {
  representation: Representation,
}

impl ReactionKnockoutDecoder {
  pub fn new(representation: Representation) -> Self {
    Self { representation }
  }
}

impl Decoder for ReactionKnockoutDecoder {
  fn representation(&self) -> &Representation {
    &self.representation
  }

  fn decode(&self, candidate: &Candidate) -> Result<Decoded, SearchError> {
    let targets = candidate
      .iter()
      .map(|i| {
        self
          .representation
          .resolve(i)
          .map(|id| Target::ReactionKnockout(id.to_owned()))
      })
      .collect::<Result<Vec<_>, _>>()?;
    let simulation = TargetSet::new(targets)?;
    Ok(Decoded {
      report: simulation.clone(),
      simulation,
    })
  }
}

/// Decodes each index to a gene knockout. The report targets also list the
/// reactions each gene knockout blocks, as found in the gene to reaction map
/// computed from the model at construction.
#[derive(Debug, Clone)]
pub struct GeneKnockoutDecoder {
  representation: Representation,
  gene_reactions: IndexMap<String, Vec<String>>,
}

impl GeneKnockoutDecoder {
  /// # Errors
  ///
  /// Returns [`RepresentationError::Unknown`] if a gene of the representation
  /// is not part of `model`.
  pub fn new(
    representation: Representation,
    model: &Model,
  ) -> Result<Self, RepresentationError> {
    let gene_reactions = representation
      .iter()
      .map(|gene| match model.gene(gene) {
        Some(_) => Ok((gene.to_owned(), model.knockout_reactions(&[gene]))),
        None => Err(RepresentationError::Unknown(gene.to_owned())),
      })
      .collect::<Result<_, _>>()?;
    Ok(Self {
      representation,
      gene_reactions,
    })
  }

  /// Reactions blocked by knocking out `gene` alone.
  pub fn reactions_of(&self, gene: &str) -> &[String] {
    self.gene_reactions.get(gene).map_or(&[], Vec::as_slice)
  }
}

impl Decoder for GeneKnockoutDecoder {
  fn representation(&self) -> &Representation {
    &self.representation
  }

  fn decode(&self, candidate: &Candidate) -> Result<Decoded, SearchError> {
    let genes = candidate
      .iter()
      .map(|i| self.representation.resolve(i))
      .collect::<Result<Vec<_>, _>>()?;
    let simulation = TargetSet::new(
      genes.iter().map(|&g| Target::GeneKnockout(g.to_owned())),
    )?;
    let mut report = simulation.clone();
    for gene in &genes {
      for reaction in self.reactions_of(gene) {
        report.push(Target::ReactionKnockout(reaction.clone()))?;
      }
    }
    Ok(Decoded { simulation, report })
  }
}
