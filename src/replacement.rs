//! Survivor selection between generations.

use std::cmp::Ordering;

use crate::{
  engine::{Individual, Replacer},
  fitness::{ParetoDominance, Sense},
};

/// Keeps the best individuals among parents and offspring, ranked by
/// [`Fitness::rank_cmp`](crate::fitness::Fitness::rank_cmp). Parents win
/// ties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TruncationReplacer;

impl Replacer for TruncationReplacer {
  fn replace(
    &self,
    population: Vec<Individual>,
    offspring: Vec<Individual>,
    sense: Sense,
  ) -> Vec<Individual> {
    let size = population.len();
    let mut pool = population;
    pool.extend(offspring);
    pool.sort_by(|a, b| a.fitness.rank_cmp(&b.fitness, sense));
    pool.truncate(size);
    pool
  }
}

/// NSGA-II survivor selection: parents and offspring are sorted into
/// non-dominated fronts, whole fronts are kept while they fit, and the front
/// that does not fit is cut by crowding distance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NondominatedReplacer;

// index of an individual in the merged pool
type IndividualIndex = usize;
// number of individuals dominating an individual
type DominanceCounter = u32;
// crowding distance of an individual
type CrowdingDistance = f64;
// indices of individuals dominated by an individual
type DominanceList = Vec<IndividualIndex>;
// indices of individuals of a front
type Front = Vec<IndividualIndex>;

impl Replacer for NondominatedReplacer {
  fn replace(
    &self,
    population: Vec<Individual>,
    offspring: Vec<Individual>,
    sense: Sense,
  ) -> Vec<Individual> {
    let size = population.len();
    let mut pool = population;
    pool.extend(offspring);
    let selected = select_best(&pool, size, sense);

    let mut pool: Vec<_> = pool.into_iter().map(Some).collect();
    selected
      .into_iter()
      .filter_map(|idx| pool[idx].take())
      .collect()
  }
}

/// Returns the indices of the `size` best individuals, best fronts first.
fn select_best(
  pool: &[Individual],
  size: usize,
  sense: Sense,
) -> Vec<IndividualIndex> {
  let mut dominance_lists: Vec<DominanceList> = vec![Vec::new(); pool.len()];
  let mut dominance_counters: Vec<DominanceCounter> = vec![0; pool.len()];

  // for each unique pair of individuals `p` and `q`...
  for p_idx in 0..pool.len() {
    for q_idx in p_idx + 1..pool.len() {
      let p = pool[p_idx].fitness.values();
      let q = pool[q_idx].fitness.values();
      match p.dominance(q, sense) {
        Ordering::Less => {
          dominance_lists[p_idx].push(q_idx);
          dominance_counters[q_idx] += 1;
        }
        Ordering::Greater => {
          dominance_lists[q_idx].push(p_idx);
          dominance_counters[p_idx] += 1;
        }
        Ordering::Equal => {}
      }
    }
  }

  let mut front: Front = (0..pool.len())
    .filter(|&idx| dominance_counters[idx] == 0)
    .collect();
  let mut selected: Vec<IndividualIndex> = Vec::with_capacity(size);
  // until the next front no longer fits...
  while !front.is_empty() && selected.len() + front.len() <= size {
    let mut next_front = Vec::new();
    for &p_idx in &front {
      for &q_idx in &dominance_lists[p_idx] {
        dominance_counters[q_idx] -= 1;
        if dominance_counters[q_idx] == 0 {
          next_front.push(q_idx);
        }
      }
    }
    selected.append(&mut front);
    front = next_front;
  }

  // fill the rest with the least crowded members of the front that overflowed
  if selected.len() < size && !front.is_empty() {
    let distances = crowding_distances(pool, &mut front);
    front.sort_by(|&a, &b| distances[b].total_cmp(&distances[a]));
    front.truncate(size - selected.len());
    selected.append(&mut front);
  }

  selected
}

/// Crowding distances of the members of `front`, indexed like `pool`.
/// Boundary members of every objective get an infinite distance.
fn crowding_distances(
  pool: &[Individual],
  front: &mut Front,
) -> Vec<CrowdingDistance> {
  let mut distances: Vec<CrowdingDistance> = vec![0.0; pool.len()];
  let objectives = pool[front[0]].fitness.values().len();
  let value = |idx: IndividualIndex, o: usize| pool[idx].fitness.values()[o];

  for o in 0..objectives {
    front.sort_by(|&a, &b| value(a, o).total_cmp(&value(b, o)));
    let first = front[0];
    let last = front[front.len() - 1];
    distances[first] = f64::INFINITY;
    distances[last] = f64::INFINITY;

    let range = value(last, o) - value(first, o);
    if range <= 0.0 || !range.is_finite() {
      continue;
    }
    for window in front.windows(3) {
      let (prev, idx, next) = (window[0], window[1], window[2]);
      distances[idx] += (value(next, o) - value(prev, o)) / range;
    }
  }

  distances
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{fitness::Fitness, representation::Candidate};

  fn single(i: usize, f: f64) -> Individual {
    Individual::new(Candidate::from([i]), Fitness::Single(f))
  }

  fn multi(i: usize, f: [f64; 2]) -> Individual {
    Individual::new(Candidate::from([i]), Fitness::Multi(f.to_vec()))
  }

  fn ids(population: &[Individual]) -> Vec<usize> {
    population
      .iter()
      .map(|i| i.candidate.iter().next().unwrap())
      .collect()
  }

  #[test]
  fn test_truncation_keeps_best() {
    let parents = vec![single(0, 1.0), single(1, 3.0)];
    let offspring = vec![single(2, 2.0), single(3, 0.5)];
    let survivors =
      TruncationReplacer.replace(parents.clone(), offspring.clone(), Sense::Maximize);
    assert_eq!(ids(&survivors), [1, 2]);
    let survivors =
      TruncationReplacer.replace(parents, offspring, Sense::Minimize);
    assert_eq!(ids(&survivors), [3, 0]);
  }

  #[test]
  fn test_nondominated_keeps_first_front() {
    let parents = vec![
      multi(0, [1.0, 1.0]),
      multi(1, [4.0, 0.0]),
      multi(2, [0.0, 4.0]),
    ];
    let offspring = vec![
      multi(3, [2.0, 2.0]),
      multi(4, [0.5, 0.5]),
      multi(5, [0.1, 0.1]),
    ];
    let survivors =
      NondominatedReplacer.replace(parents, offspring, Sense::Maximize);
    let mut ids = ids(&survivors);
    ids.sort();
    assert_eq!(ids, [1, 2, 3]);
  }

  #[test]
  fn test_nondominated_cuts_front_by_crowding() {
    let parents = vec![
      multi(0, [0.0, 4.0]),
      multi(1, [1.0, 3.0]),
      multi(2, [1.1, 2.9]),
      multi(3, [4.0, 0.0]),
    ];
    let offspring = vec![multi(4, [0.0, 0.0])];
    let survivors = NondominatedReplacer.replace(
      parents[..3].to_vec(),
      [&parents[3..], &offspring[..]].concat(),
      Sense::Maximize,
    );
    let mut ids = ids(&survivors);
    ids.sort();
    // the two boundary members survive, then the less crowded of 1 and 2
    assert_eq!(ids.len(), 3);
    assert!(ids.contains(&0) && ids.contains(&3));
    assert!(!ids.contains(&4));
  }

  #[test]
  fn test_nondominated_minimize() {
    let parents = vec![multi(0, [1.0, 1.0]), multi(1, [2.0, 2.0])];
    let offspring = vec![multi(2, [0.0, 3.0])];
    let survivors =
      NondominatedReplacer.replace(parents, offspring, Sense::Minimize);
    let mut ids = ids(&survivors);
    ids.sort();
    assert_eq!(ids, [0, 2]);
  }
}
