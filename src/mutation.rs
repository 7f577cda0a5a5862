//! Mutation operators for set genomes.
//!
//! Both operators return new candidates and keep every index unique and
//! within the representation.

use rand::{rngs::StdRng, seq::IteratorRandom, Rng};

use crate::{representation::Candidate, variation::Variator};

/// Changes a single candidate.
pub trait Mutation {
  fn mutate(&self, rng: &mut StdRng, candidate: &Candidate) -> Candidate;
}

macro_rules! mutation_variator_impl {
  ($($mutation:ty),*) => {
    $(
      impl Variator for $mutation {
        fn vary(
          &self,
          rng: &mut StdRng,
          candidates: Vec<Candidate>,
        ) -> Vec<Candidate> {
          candidates.iter().map(|c| self.mutate(rng, c)).collect()
        }
      }
    )*
  };
}

mutation_variator_impl! {SetMutation, SetIndel}

/// Replaces each index, with probability `rate`, by an index that is neither
/// in the original candidate nor already chosen. Sizes never change, and at a
/// rate of 1 the result is disjoint from the input whenever the
/// representation is large enough.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetMutation {
  rate: f64,
  len: usize,
}

impl SetMutation {
  /// `len` is the size of the representation.
  pub fn new(rate: f64, len: usize) -> Self {
    Self { rate, len }
  }
}

impl Mutation for SetMutation {
  fn mutate(&self, rng: &mut StdRng, candidate: &Candidate) -> Candidate {
    let mut mutant = Candidate::default();
    for index in candidate.iter() {
      if rng.gen_bool(self.rate) {
        let replacement = (0..self.len)
          .filter(|&i| !candidate.contains(i) && !mutant.contains(i))
          .choose(rng);
        if let Some(replacement) = replacement {
          mutant.insert(replacement);
          continue;
        }
      }
      mutant.insert(index);
    }
    mutant
  }
}

/// With probability `rate`, inserts one new index or deletes one existing
/// index, each with equal chance when both are possible. Insertion needs the
/// candidate to be below `max_size` with a free index left, deletion needs
/// more than one index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetIndel {
  rate: f64,
  max_size: usize,
  len: usize,
}

impl SetIndel {
  pub fn new(rate: f64, max_size: usize, len: usize) -> Self {
    Self {
      rate,
      max_size,
      len,
    }
  }
}

impl Mutation for SetIndel {
  fn mutate(&self, rng: &mut StdRng, candidate: &Candidate) -> Candidate {
    let mut mutant = candidate.clone();
    if !rng.gen_bool(self.rate) {
      return mutant;
    }

    let can_insert =
      candidate.len() < self.max_size && candidate.len() < self.len;
    let can_delete = candidate.len() > 1;
    let insert = match (can_insert, can_delete) {
      (true, true) => rng.gen_bool(0.5),
      (true, false) => true,
      (false, true) => false,
      (false, false) => return mutant,
    };

    if insert {
      let free = (0..self.len).filter(|&i| !candidate.contains(i)).choose(rng);
      if let Some(index) = free {
        mutant.insert(index);
      }
    } else if let Some(index) = candidate.iter().choose(rng) {
      mutant.remove(index);
    }
    mutant
  }
}

#[cfg(test)]
mod tests {
  use rand::SeedableRng;

  use super::*;

  #[test]
  fn test_full_rate_mutation_is_disjoint() {
    let candidate = Candidate::from([1, 3, 7]);
    let mutation = SetMutation::new(1.0, 10);
    let mutant = mutation.mutate(&mut StdRng::seed_from_u64(42), &candidate);
    assert_eq!(mutant.len(), 3);
    assert!(mutant.iter().all(|i| i < 10 && !candidate.contains(i)));
    // repeatable under the same seed
    assert_eq!(
      mutant,
      mutation.mutate(&mut StdRng::seed_from_u64(42), &candidate)
    );
  }

  #[test]
  fn test_zero_rate_mutation_is_identity() {
    let candidate = Candidate::from([0, 2]);
    let mutant =
      SetMutation::new(0.0, 5).mutate(&mut StdRng::seed_from_u64(0), &candidate);
    assert_eq!(mutant, candidate);
  }

  #[test]
  fn test_mutation_without_free_indices_keeps_candidate() {
    let candidate = Candidate::from([0, 1, 2]);
    let mutant =
      SetMutation::new(1.0, 3).mutate(&mut StdRng::seed_from_u64(0), &candidate);
    assert_eq!(mutant, candidate);
  }

  #[test]
  fn test_indel_changes_size_by_one() {
    let candidate = Candidate::from([2, 4]);
    let indel = SetIndel::new(1.0, 3, 10);
    for seed in 0..32 {
      let mutant = indel.mutate(&mut StdRng::seed_from_u64(seed), &candidate);
      assert!(mutant.len() == 1 || mutant.len() == 3);
      assert!(mutant.iter().all(|i| i < 10));
    }
  }

  #[test]
  fn test_indel_respects_bounds() {
    let indel = SetIndel::new(1.0, 2, 10);
    let mut rng = StdRng::seed_from_u64(1);
    // full candidates can only shrink, singletons can only grow
    assert_eq!(indel.mutate(&mut rng, &Candidate::from([1, 2])).len(), 1);
    assert_eq!(indel.mutate(&mut rng, &Candidate::from([5])).len(), 2);
    // nothing to do for a singleton that cannot grow
    let stuck = SetIndel::new(1.0, 1, 10);
    assert_eq!(
      stuck.mutate(&mut rng, &Candidate::from([5])),
      Candidate::from([5])
    );
  }

  #[test]
  fn test_mutation_as_variator() {
    let out = SetMutation::new(1.0, 4).vary(
      &mut StdRng::seed_from_u64(0),
      vec![Candidate::from([0]), Candidate::from([1, 2])],
    );
    assert_eq!(out.len(), 2);
    assert!(!out[0].contains(0));
    assert_eq!(out[1].len(), 2);
  }
}
