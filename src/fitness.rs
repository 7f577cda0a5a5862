//! Fitness values and the comparisons the search relies on.

use std::{cmp::Ordering, fmt};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Whether larger or smaller fitness values are better.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
pub enum Sense {
  #[default]
  Maximize,
  Minimize,
}

impl Sense {
  /// Orders `a` before `b` if `a` is better.
  pub fn cmp(self, a: f64, b: f64) -> Ordering {
    match self {
      Sense::Maximize => b.total_cmp(&a),
      Sense::Minimize => a.total_cmp(&b),
    }
  }

  /// Whether `a` is at least as good as `b`.
  pub fn at_least_as_good(self, a: f64, b: f64) -> bool {
    match self {
      Sense::Maximize => a >= b,
      Sense::Minimize => a <= b,
    }
  }
}

/// The quality of an evaluated candidate: a single value, or one value per
/// objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Fitness {
  Single(f64),
  Multi(Vec<f64>),
}

impl Fitness {
  pub fn values(&self) -> &[f64] {
    match self {
      Fitness::Single(value) => std::slice::from_ref(value),
      Fitness::Multi(values) => values,
    }
  }

  pub fn is_multi(&self) -> bool {
    matches!(self, Fitness::Multi(_))
  }

  /// Returns `Less` if `self` dominates `other`, `Greater` if `other`
  /// dominates `self`, otherwise `Equal`.
  pub fn dominance(&self, other: &Self, sense: Sense) -> Ordering {
    self.values().dominance(other.values(), sense)
  }

  /// Whether every value of `self` is at least as good as its counterpart in
  /// `other`.
  pub fn at_least_as_good(&self, other: &Self, sense: Sense) -> bool {
    self
      .values()
      .iter()
      .zip(other.values())
      .all(|(a, b)| sense.at_least_as_good(*a, *b))
  }

  /// Whether `other` dominates `self`.
  pub fn is_worse_than(&self, other: &Self, sense: Sense) -> bool {
    self.dominance(other, sense) == Ordering::Greater
  }

  /// A total order with better fitness first. For vectors the sum of the
  /// values decides first, so a dominating vector always ranks ahead of the
  /// vectors it dominates; remaining ties go lexicographically.
  pub fn rank_cmp(&self, other: &Self, sense: Sense) -> Ordering {
    match (self, other) {
      (Fitness::Single(a), Fitness::Single(b)) => sense.cmp(*a, *b),
      _ => {
        let sum = |f: &Fitness| f.values().iter().sum::<f64>();
        sense.cmp(sum(self), sum(other)).then_with(|| {
          self
            .values()
            .iter()
            .zip(other.values())
            .map(|(a, b)| sense.cmp(*a, *b))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
        })
      }
    }
  }
}

impl fmt::Display for Fitness {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Fitness::Single(value) => write!(f, "{value:.5}"),
      Fitness::Multi(values) => {
        write!(f, "({})", values.iter().map(|v| format!("{v:.5}")).join(", "))
      }
    }
  }
}

/// Describes pareto dominance for slices of fitness values.
pub(crate) trait ParetoDominance {
  /// Returns `Less` if `self` dominates `other`, `Greater` if `other`
  /// dominates `self`, otherwise `Equal`.
  fn dominance(&self, other: &Self, sense: Sense) -> Ordering;
}

impl ParetoDominance for [f64] {
  fn dominance(&self, other: &Self, sense: Sense) -> Ordering {
    let mut ord = Ordering::Equal;
    for (a, b) in self.iter().zip(other) {
      match (ord, sense.cmp(*a, *b)) {
        (Ordering::Equal, next_ord) => ord = next_ord,
        (Ordering::Greater, Ordering::Less)
        | (Ordering::Less, Ordering::Greater) => return Ordering::Equal,
        _ => {}
      }
    }
    ord
  }
}

#[cfg(test)]
mod tests {
  use std::cmp::Ordering;

  use super::*;

  #[test]
  fn test_pareto_dominance() {
    use Sense::*;
    let d = |a: &[f64], b: &[f64], s| a.dominance(b, s);

    assert_eq!(d(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0], Maximize), Ordering::Equal);
    assert_eq!(d(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0], Maximize), Ordering::Equal);

    assert_eq!(d(&[10.0, 2.0, 3.0], &[1.0, 2.0, 3.0], Maximize), Ordering::Less);
    assert_eq!(d(&[1.0, 2.0, 3.0], &[1.0, 2.0, 30.0], Maximize), Ordering::Greater);

    assert_eq!(d(&[10.0, 2.0, 3.0], &[1.0, 2.0, 3.0], Minimize), Ordering::Greater);
    assert_eq!(d(&[1.0, 2.0, 3.0], &[1.0, 2.0, 30.0], Minimize), Ordering::Less);

    assert_eq!(d(&[], &[], Maximize), Ordering::Equal);
  }

  #[test]
  fn test_single_fitness_comparisons() {
    let low = Fitness::Single(0.1);
    let high = Fitness::Single(0.45);
    assert!(low.is_worse_than(&high, Sense::Maximize));
    assert!(high.is_worse_than(&low, Sense::Minimize));
    assert!(!low.is_worse_than(&low, Sense::Maximize));
    assert!(high.at_least_as_good(&low, Sense::Maximize));
    assert!(low.at_least_as_good(&low, Sense::Maximize));
    assert_eq!(high.rank_cmp(&low, Sense::Maximize), Ordering::Less);
    assert_eq!(high.rank_cmp(&low, Sense::Minimize), Ordering::Greater);
  }

  #[test]
  fn test_rank_respects_dominance() {
    let a = Fitness::Multi(vec![1.0, 2.0]);
    let b = Fitness::Multi(vec![1.0, 1.0]);
    let c = Fitness::Multi(vec![2.0, 0.5]);
    assert_eq!(a.dominance(&b, Sense::Maximize), Ordering::Less);
    assert_eq!(a.rank_cmp(&b, Sense::Maximize), Ordering::Less);
    assert_eq!(a.dominance(&c, Sense::Maximize), Ordering::Equal);
    assert_eq!(c.rank_cmp(&b, Sense::Maximize), Ordering::Less);
    assert_eq!(a.rank_cmp(&a, Sense::Maximize), Ordering::Equal);
  }

  #[test]
  fn test_display() {
    assert_eq!(Fitness::Single(0.5).to_string(), "0.50000");
    assert_eq!(
      Fitness::Multi(vec![1.0, 0.25]).to_string(),
      "(1.00000, 0.25000)"
    );
  }
}
