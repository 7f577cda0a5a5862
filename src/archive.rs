//! A bounded archive of the best designs found so far.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{
  engine::{Archiver, Individual},
  fitness::{Fitness, Sense},
};

/// Keeps the best individuals seen during a search, best first.
///
/// An individual *improves* another if its candidate is a strict subset of
/// the other's and its fitness is at least as good. Among individuals with
/// equal fitness, improved ones are removed, so the archive prefers the
/// smallest intervention sets. Individuals of equal size and fitness whose
/// candidates differ are incomparable and both kept.
///
/// Individuals strictly worse than the tracked worst fitness are rejected
/// without comparison. The worst fitness comes from the first individual ever
/// added and is refreshed from the tail after every change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BestSolutionArchive {
  entries: Vec<Individual>,
  max_size: usize,
  sense: Sense,
  worst_fitness: Option<Fitness>,
}

impl BestSolutionArchive {
  pub fn new(max_size: usize, sense: Sense) -> Self {
    Self {
      entries: Vec::new(),
      max_size,
      sense,
      worst_fitness: None,
    }
  }

  /// Offers one individual. Returns `true` if it is in the archive afterwards.
  pub fn add(&mut self, individual: Individual) -> bool {
    if let Some(worst) = &self.worst_fitness {
      if individual.fitness.is_worse_than(worst, self.sense) {
        return false;
      }
    }

    let mut insert = true;
    let sense = self.sense;
    self.entries.retain(|entry| {
      if !insert || entry.fitness != individual.fitness {
        return true;
      }
      if entry.candidate == individual.candidate
        || improves(entry, &individual, sense)
      {
        insert = false;
        return true;
      }
      !improves(&individual, entry, sense)
    });

    if insert {
      let position = self
        .entries
        .partition_point(|entry| self.rank(entry, &individual).is_lt());
      log::trace!(
        "archiving {:?} with fitness {} at {position}",
        individual.candidate,
        individual.fitness
      );
      self.entries.insert(position, individual);
      self.entries.truncate(self.max_size);
      insert = position < self.max_size;
    }
    if let Some(last) = self.entries.last() {
      self.worst_fitness = Some(last.fitness.clone());
    }
    insert
  }

  /// Offers every individual of another archive, re-running the same
  /// comparisons across the union.
  pub fn merge(&mut self, other: BestSolutionArchive) {
    for individual in other.entries {
      self.add(individual);
    }
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Individual> {
    self.entries.iter()
  }

  pub fn best(&self) -> Option<&Individual> {
    self.entries.first()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn max_size(&self) -> usize {
    self.max_size
  }

  pub fn sense(&self) -> Sense {
    self.sense
  }

  pub fn worst_fitness(&self) -> Option<&Fitness> {
    self.worst_fitness.as_ref()
  }

  pub fn into_vec(self) -> Vec<Individual> {
    self.entries
  }

  /// Orders `a` before `b` if it ranks better: by fitness, then by size,
  /// then by the indices themselves.
  fn rank(&self, a: &Individual, b: &Individual) -> Ordering {
    a.fitness
      .rank_cmp(&b.fitness, self.sense)
      .then_with(|| a.candidate.len().cmp(&b.candidate.len()))
      .then_with(|| a.candidate.cmp(&b.candidate))
  }
}

/// Whether `a` improves `b`.
fn improves(a: &Individual, b: &Individual, sense: Sense) -> bool {
  a.candidate.is_strict_subset(&b.candidate)
    && a.fitness.at_least_as_good(&b.fitness, sense)
}

impl Archiver for BestSolutionArchive {
  fn archive(&mut self, population: &[Individual]) {
    for individual in population {
      self.add(individual.clone());
    }
  }
}

impl<'a> IntoIterator for &'a BestSolutionArchive {
  type Item = &'a Individual;
  type IntoIter = std::slice::Iter<'a, Individual>;

  fn into_iter(self) -> Self::IntoIter {
    self.entries.iter()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::representation::Candidate;

  fn ind<const N: usize>(c: [usize; N], f: f64) -> Individual {
    Individual::new(Candidate::from(c), Fitness::Single(f))
  }

  fn candidates(archive: &BestSolutionArchive) -> Vec<Candidate> {
    archive.iter().map(|i| i.candidate.clone()).collect()
  }

  #[test]
  fn test_bounded_archive_keeps_best() {
    let mut archive = BestSolutionArchive::new(1, Sense::Maximize);
    assert!(archive.add(ind([1], 0.1)));
    assert!(archive.add(ind([1, 2, 3], 0.45)));
    assert_eq!(candidates(&archive), [Candidate::from([1, 2, 3])]);
    assert_eq!(archive.worst_fitness(), Some(&Fitness::Single(0.45)));
  }

  #[test]
  fn test_adding_twice_is_idempotent() {
    let mut archive = BestSolutionArchive::new(10, Sense::Maximize);
    archive.add(ind([1, 2], 0.3));
    archive.add(ind([4], 0.5));
    let before = candidates(&archive);
    assert!(!archive.add(ind([1, 2], 0.3)));
    assert_eq!(candidates(&archive), before);
  }

  #[test]
  fn test_subset_with_equal_fitness_wins() {
    let mut archive = BestSolutionArchive::new(10, Sense::Maximize);
    archive.add(ind([1, 2, 3], 0.3));
    assert!(archive.add(ind([1, 3], 0.3)));
    assert_eq!(candidates(&archive), [Candidate::from([1, 3])]);

    // the superset arriving second is discarded
    assert!(!archive.add(ind([1, 3, 5], 0.3)));
    assert_eq!(archive.len(), 1);
  }

  #[test]
  fn test_equal_size_equal_fitness_are_both_kept() {
    let mut archive = BestSolutionArchive::new(10, Sense::Maximize);
    archive.add(ind([1, 2], 0.3));
    archive.add(ind([3, 4], 0.3));
    assert_eq!(archive.len(), 2);
  }

  #[test]
  fn test_ordering_is_best_first() {
    let mut archive = BestSolutionArchive::new(10, Sense::Minimize);
    archive.add(ind([5], 3.0));
    archive.add(ind([1, 2], 1.0));
    archive.add(ind([3], 1.0));
    archive.add(ind([4], 2.0));
    assert_eq!(
      candidates(&archive),
      [
        Candidate::from([3]),
        Candidate::from([1, 2]),
        Candidate::from([4]),
        Candidate::from([5])
      ]
    );
  }

  #[test]
  fn test_worse_than_worst_is_rejected() {
    let mut archive = BestSolutionArchive::new(10, Sense::Maximize);
    archive.add(ind([1], 0.5));
    assert!(!archive.add(ind([2], 0.2)));
    assert!(archive.add(ind([2], 0.5)));
  }

  #[test]
  fn test_multi_objective_pre_filter() {
    let mut archive = BestSolutionArchive::new(10, Sense::Maximize);
    let multi = |c: usize, f: [f64; 2]| {
      Individual::new(Candidate::from([c]), Fitness::Multi(f.to_vec()))
    };
    archive.add(multi(0, [1.0, 1.0]));
    // dominated by the worst entry
    assert!(!archive.add(multi(1, [0.5, 1.0])));
    // incomparable with it
    assert!(archive.add(multi(2, [2.0, 0.0])));
    assert_eq!(archive.len(), 2);
  }

  #[test]
  fn test_truncated_tail_is_not_reported_as_added() {
    let mut archive = BestSolutionArchive::new(1, Sense::Maximize);
    assert!(archive.add(ind([1], 0.5)));
    // same fitness, but ranks after the smaller design
    assert!(!archive.add(ind([2, 3], 0.5)));
    assert_eq!(candidates(&archive), [Candidate::from([1])]);
  }

  #[test]
  fn test_merge() {
    let mut a = BestSolutionArchive::new(10, Sense::Maximize);
    a.add(ind([1, 2], 0.7));
    let mut b = BestSolutionArchive::new(10, Sense::Maximize);
    b.add(ind([1], 0.7));
    b.add(ind([8, 9], 0.7));
    a.merge(b);
    assert_eq!(
      candidates(&a),
      [Candidate::from([1]), Candidate::from([8, 9])]
    );
  }

  #[test]
  fn test_archiver_hook() {
    let mut archive = BestSolutionArchive::new(2, Sense::Maximize);
    archive.archive(&[ind([1], 0.1), ind([2], 0.4), ind([3], 0.2)]);
    assert_eq!(
      candidates(&archive),
      [Candidate::from([2]), Candidate::from([3])]
    );
  }
}
