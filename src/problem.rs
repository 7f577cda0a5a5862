//! Auxiliary linear-program terms and the cache that owns them.
//!
//! Simulation methods often extend the base flux-balance problem with extra
//! variables and constraints (distance terms, flux sums, linearized
//! objectives). Rebuilding those for every candidate is wasteful, so a
//! [`ProblemCache`] creates each named term once and patches it on later
//! calls. The cache is the only party that adds terms to or removes terms from
//! a [`Problem`].

use indexmap::{IndexMap, IndexSet};

/// An auxiliary variable with its bounds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Variable {
  pub lower: f64,
  pub upper: f64,
}

impl Variable {
  pub fn new(lower: f64, upper: f64) -> Self {
    Self { lower, upper }
  }
}

/// An auxiliary linear constraint `lower <= sum(c_i * x_i) <= upper`, where
/// `x_i` are reaction fluxes or auxiliary variables referenced by name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Constraint {
  pub coefficients: IndexMap<String, f64>,
  pub lower: f64,
  pub upper: f64,
}

/// Auxiliary structure attached to a model's base problem.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Problem {
  variables: IndexMap<String, Variable>,
  constraints: IndexMap<String, Constraint>,
}

impl Problem {
  pub fn variable(&self, name: &str) -> Option<&Variable> {
    self.variables.get(name)
  }

  pub fn constraint(&self, name: &str) -> Option<&Constraint> {
    self.constraints.get(name)
  }

  pub fn variables(&self) -> impl Iterator<Item = (&str, &Variable)> {
    self.variables.iter().map(|(k, v)| (k.as_str(), v))
  }

  pub fn constraints(&self) -> impl Iterator<Item = (&str, &Constraint)> {
    self.constraints.iter().map(|(k, v)| (k.as_str(), v))
  }

  /// Number of auxiliary terms, variables and constraints combined.
  pub fn len(&self) -> usize {
    self.variables.len() + self.constraints.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// Undo record of a single cache operation inside a transaction.
#[derive(Debug, Clone)]
enum Undo {
  CreatedVariable(String),
  CreatedConstraint(String),
  UpdatedVariable(String, Variable),
  UpdatedConstraint(String, Constraint),
}

/// Memoizes auxiliary terms added to a [`Problem`].
///
/// The first call to [`add_variable`](ProblemCache::add_variable) or
/// [`add_constraint`](ProblemCache::add_constraint) for a given name invokes
/// `create`; every later call invokes `update` on the existing term instead.
/// Terms stay in the problem between calls, which is the point of the cache.
/// Use [`reset`](ProblemCache::reset) before reusing a model for an unrelated
/// run.
#[derive(Debug, Default)]
pub struct ProblemCache {
  variables: IndexSet<String>,
  constraints: IndexSet<String>,
  transaction: Option<Vec<Undo>>,
  creations: usize,
  updates: usize,
}

impl ProblemCache {
  pub fn new() -> Self {
    Self::default()
  }

  /// Creates variable `name` with `create` or patches it with `update` if the
  /// cache already put it into `problem`.
  pub fn add_variable<C, U>(
    &mut self,
    problem: &mut Problem,
    name: &str,
    create: C,
    update: U,
  ) where
    C: FnOnce() -> Variable,
    U: FnOnce(&mut Variable),
  {
    match problem.variables.get_mut(name) {
      Some(variable) if self.variables.contains(name) => {
        let previous = variable.clone();
        update(variable);
        self.updates += 1;
        self.record(Undo::UpdatedVariable(name.to_owned(), previous));
        log::trace!("updated cached variable `{name}`");
      }
      _ => {
        problem.variables.insert(name.to_owned(), create());
        self.variables.insert(name.to_owned());
        self.creations += 1;
        self.record(Undo::CreatedVariable(name.to_owned()));
        log::trace!("created cached variable `{name}`");
      }
    }
  }

  /// Creates constraint `name` with `create` or patches it with `update` if
  /// the cache already put it into `problem`.
  pub fn add_constraint<C, U>(
    &mut self,
    problem: &mut Problem,
    name: &str,
    create: C,
    update: U,
  ) where
    C: FnOnce() -> Constraint,
    U: FnOnce(&mut Constraint),
  {
    match problem.constraints.get_mut(name) {
      Some(constraint) if self.constraints.contains(name) => {
        let previous = constraint.clone();
        update(constraint);
        self.updates += 1;
        self.record(Undo::UpdatedConstraint(name.to_owned(), previous));
        log::trace!("updated cached constraint `{name}`");
      }
      _ => {
        problem.constraints.insert(name.to_owned(), create());
        self.constraints.insert(name.to_owned());
        self.creations += 1;
        self.record(Undo::CreatedConstraint(name.to_owned()));
        log::trace!("created cached constraint `{name}`");
      }
    }
  }

  /// Removes a cached term, whichever kind it is. Returns `false` if the
  /// cache does not own a term called `name`.
  pub fn remove(&mut self, problem: &mut Problem, name: &str) -> bool {
    let variable = self.variables.shift_remove(name);
    if variable {
      problem.variables.shift_remove(name);
    }
    let constraint = self.constraints.shift_remove(name);
    if constraint {
      problem.constraints.shift_remove(name);
    }
    variable || constraint
  }

  /// Starts recording operations so they can be undone with
  /// [`rollback`](ProblemCache::rollback). A transaction already in progress
  /// is committed first.
  pub fn begin_transaction(&mut self) {
    self.transaction = Some(Vec::new());
  }

  /// Keeps everything done since [`begin_transaction`].
  ///
  /// [`begin_transaction`]: ProblemCache::begin_transaction
  pub fn commit(&mut self) {
    self.transaction = None;
  }

  /// Undoes every creation and update since the transaction began, newest
  /// first. Does nothing outside of a transaction.
  pub fn rollback(&mut self, problem: &mut Problem) {
    let Some(log) = self.transaction.take() else {
      return;
    };
    for undo in log.into_iter().rev() {
      match undo {
        Undo::CreatedVariable(name) => {
          problem.variables.shift_remove(&name);
          self.variables.shift_remove(&name);
        }
        Undo::CreatedConstraint(name) => {
          problem.constraints.shift_remove(&name);
          self.constraints.shift_remove(&name);
        }
        Undo::UpdatedVariable(name, previous) => {
          if let Some(variable) = problem.variables.get_mut(&name) {
            *variable = previous;
          }
        }
        Undo::UpdatedConstraint(name, previous) => {
          if let Some(constraint) = problem.constraints.get_mut(&name) {
            *constraint = previous;
          }
        }
      }
    }
  }

  /// Removes every cached term from `problem` and forgets them.
  pub fn reset(&mut self, problem: &mut Problem) {
    for name in self.variables.drain(..) {
      problem.variables.shift_remove(&name);
    }
    for name in self.constraints.drain(..) {
      problem.constraints.shift_remove(&name);
    }
    self.transaction = None;
  }

  pub fn contains(&self, name: &str) -> bool {
    self.variables.contains(name) || self.constraints.contains(name)
  }

  pub fn len(&self) -> usize {
    self.variables.len() + self.constraints.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// How many terms were created from scratch over the cache's lifetime.
  pub fn creations(&self) -> usize {
    self.creations
  }

  /// How many times an existing term was patched instead of rebuilt.
  pub fn updates(&self) -> usize {
    self.updates
  }

  fn record(&mut self, undo: Undo) {
    if let Some(log) = self.transaction.as_mut() {
      log.push(undo);
    }
  }
}
