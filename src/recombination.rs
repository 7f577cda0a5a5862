//! Crossover over set genomes.

use rand::{rngs::StdRng, seq::index, Rng};

use crate::{representation::Candidate, variation::Variator};

/// Produces offspring from a pair of parents.
pub trait Recombination {
  /// Returns zero, one or two children. Parents are left untouched.
  fn recombine(
    &self,
    rng: &mut StdRng,
    mom: &Candidate,
    dad: &Candidate,
  ) -> Vec<Candidate>;
}

/// N-point crossover for unordered sets of indices.
///
/// The union of both parents is sorted and cut at up to `points` random
/// positions. Indices present in both parents go to both children. An index
/// present in one parent only goes to one child, and which one flips at every
/// cut. Children larger than `max_size` are downsampled, empty children are
/// dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetNPointCrossover {
  rate: f64,
  points: usize,
  max_size: usize,
}

impl SetNPointCrossover {
  pub fn new(rate: f64, points: usize, max_size: usize) -> Self {
    Self {
      rate,
      points,
      max_size,
    }
  }

  fn downsample(&self, rng: &mut StdRng, child: Candidate) -> Candidate {
    if child.len() <= self.max_size {
      return child;
    }
    let genes: Vec<usize> = child.iter().collect();
    index::sample(rng, genes.len(), self.max_size)
      .into_iter()
      .map(|i| genes[i])
      .collect()
  }
}

impl Recombination for SetNPointCrossover {
  fn recombine(
    &self,
    rng: &mut StdRng,
    mom: &Candidate,
    dad: &Candidate,
  ) -> Vec<Candidate> {
    if !rng.gen_bool(self.rate) {
      return vec![mom.clone(), dad.clone()];
    }

    let genes: Candidate = mom.iter().chain(dad.iter()).collect();
    let positions = genes.len().saturating_sub(1);
    let cuts = self.points.min(positions);
    let mut cut_points: Vec<usize> = index::sample(rng, positions, cuts)
      .into_iter()
      .map(|i| i + 1)
      .collect();
    cut_points.sort_unstable();

    let mut bro = Candidate::default();
    let mut sis = Candidate::default();
    let mut normal = true;
    for (i, gene) in genes.iter().enumerate() {
      if cut_points.binary_search(&i).is_ok() {
        normal = !normal;
      }
      match (mom.contains(gene), dad.contains(gene)) {
        (true, true) => {
          bro.insert(gene);
          sis.insert(gene);
        }
        (true, false) if normal => {
          bro.insert(gene);
        }
        (true, false) => {
          sis.insert(gene);
        }
        (false, _) if normal => {
          sis.insert(gene);
        }
        (false, _) => {
          bro.insert(gene);
        }
      }
    }

    [bro, sis]
      .into_iter()
      .filter(|child| !child.is_empty())
      .map(|child| self.downsample(rng, child))
      .collect()
  }
}

/// Pairs up consecutive candidates as parents. An odd one out is passed on
/// unchanged.
impl Variator for SetNPointCrossover {
  fn vary(&self, rng: &mut StdRng, candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates
      .chunks(2)
      .flat_map(|pair| match pair {
        [mom, dad] => self.recombine(rng, mom, dad),
        _ => pair.to_vec(),
      })
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use rand::SeedableRng;

  use super::*;

  #[test]
  fn test_children_reconstruct_membership() {
    let mom = Candidate::from([1, 2, 3]);
    let dad = Candidate::from([2, 3, 4]);
    let crossover = SetNPointCrossover::new(1.0, 1, 9);
    for seed in 0..32 {
      let mut rng = StdRng::seed_from_u64(seed);
      let children = crossover.recombine(&mut rng, &mom, &dad);
      assert_eq!(children.len(), 2);
      let (bro, sis) = (&children[0], &children[1]);
      // shared genes go to both children
      for gene in [2, 3] {
        assert!(bro.contains(gene) && sis.contains(gene));
      }
      // each parent-specific gene goes to exactly one child
      for gene in [1, 4] {
        assert!(bro.contains(gene) ^ sis.contains(gene));
      }
      let union: Candidate = bro.iter().chain(sis.iter()).collect();
      assert_eq!(union, Candidate::from([1, 2, 3, 4]));
    }
  }

  #[test]
  fn test_single_cut_scenario() {
    // any single cut over [1, 2, 3, 4] falls between the mom-only gene and
    // the dad-only gene, so both land in the first child
    let mom = Candidate::from([1, 2, 3]);
    let dad = Candidate::from([2, 3, 4]);
    let crossover = SetNPointCrossover::new(1.0, 1, 9);
    for seed in 0..16 {
      let children =
        crossover.recombine(&mut StdRng::seed_from_u64(seed), &mom, &dad);
      assert_eq!(
        children,
        [Candidate::from([1, 2, 3, 4]), Candidate::from([2, 3])]
      );
    }
  }

  #[test]
  fn test_rate_not_met_returns_parents() {
    let mom = Candidate::from([1]);
    let dad = Candidate::from([5, 6]);
    let crossover = SetNPointCrossover::new(0.0, 3, 9);
    let children =
      crossover.recombine(&mut StdRng::seed_from_u64(0), &mom, &dad);
    assert_eq!(children, [mom, dad]);
  }

  #[test]
  fn test_large_children_are_downsampled() {
    let mom = Candidate::from([0, 1, 2, 3]);
    let dad = Candidate::from([0, 1, 2, 3, 4]);
    let crossover = SetNPointCrossover::new(1.0, 1, 3);
    for seed in 0..16 {
      let children =
        crossover.recombine(&mut StdRng::seed_from_u64(seed), &mom, &dad);
      assert!(children.iter().all(|c| (1..=3).contains(&c.len())));
    }
  }

  #[test]
  fn test_identical_parents_single_gene() {
    let parent = Candidate::from([7]);
    let children = SetNPointCrossover::new(1.0, 2, 9).recombine(
      &mut StdRng::seed_from_u64(0),
      &parent,
      &parent,
    );
    assert_eq!(children, [parent.clone(), parent]);
  }

  #[test]
  fn test_variator_pairs_parents() {
    let crossover = SetNPointCrossover::new(1.0, 1, 9);
    let out = crossover.vary(
      &mut StdRng::seed_from_u64(0),
      vec![
        Candidate::from([1]),
        Candidate::from([1]),
        Candidate::from([9]),
      ],
    );
    assert_eq!(out.len(), 3);
    assert_eq!(out[2], Candidate::from([9]));
  }
}
