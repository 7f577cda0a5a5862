//! Objective functions turning a flux state into fitness.

use crate::{
  error::ConfigError,
  fitness::{Fitness, Sense},
  model::Model,
  simulation::FluxState,
  target::TargetSet,
};

/// Scores the simulated phenotype of a design.
///
/// The model passed to [`ObjectiveFunction::evaluate`] still has the design's
/// interventions applied.
pub trait ObjectiveFunction: Send + Sync {
  fn name(&self) -> &str;

  fn sense(&self) -> Sense {
    Sense::Maximize
  }

  fn evaluate(&self, model: &Model, flux: &FluxState, targets: &TargetSet)
    -> f64;

  /// The value given to designs that could not be simulated.
  fn worst_fitness(&self) -> f64 {
    match self.sense() {
      Sense::Maximize => 0.0,
      Sense::Minimize => f64::INFINITY,
    }
  }
}

fn uptake(flux: &FluxState, substrate: &str) -> f64 {
  flux.flux(substrate).unwrap_or(0.0).abs()
}

/// Product flux per unit of substrate uptake.
#[derive(Debug, Clone)]
pub struct ProductYield {
  name: String,
  product: String,
  substrate: String,
}

impl ProductYield {
  pub fn new(product: impl Into<String>, substrate: impl Into<String>) -> Self {
    let product = product.into();
    let substrate = substrate.into();
    Self {
      name: format!("product_yield = {product}/{substrate}"),
      product,
      substrate,
    }
  }
}

impl ObjectiveFunction for ProductYield {
  fn name(&self) -> &str {
    &self.name
  }

  fn evaluate(&self, _: &Model, flux: &FluxState, _: &TargetSet) -> f64 {
    let substrate = uptake(flux, &self.substrate);
    if substrate == 0.0 {
      return 0.0;
    }
    flux.flux(&self.product).unwrap_or(0.0) / substrate
  }
}

/// Biomass flux times product flux per unit of substrate uptake. Rewards
/// designs where production is coupled to growth.
#[derive(Debug, Clone)]
pub struct BiomassProductCoupledYield {
  name: String,
  biomass: String,
  product: String,
  substrate: String,
}

impl BiomassProductCoupledYield {
  pub fn new(
    biomass: impl Into<String>,
    product: impl Into<String>,
    substrate: impl Into<String>,
  ) -> Self {
    let biomass = biomass.into();
    let product = product.into();
    let substrate = substrate.into();
    Self {
      name: format!("bpcy = ({biomass} * {product})/{substrate}"),
      biomass,
      product,
      substrate,
    }
  }
}

impl ObjectiveFunction for BiomassProductCoupledYield {
  fn name(&self) -> &str {
    &self.name
  }

  fn evaluate(&self, _: &Model, flux: &FluxState, _: &TargetSet) -> f64 {
    let substrate = uptake(flux, &self.substrate);
    if substrate == 0.0 {
      return 0.0;
    }
    let biomass = flux.flux(&self.biomass).unwrap_or(0.0);
    let product = flux.flux(&self.product).unwrap_or(0.0);
    biomass * product / substrate
  }
}

/// The flux through a single reaction.
#[derive(Debug, Clone)]
pub struct TargetFlux {
  reaction: String,
  sense: Sense,
}

impl TargetFlux {
  pub fn new(reaction: impl Into<String>) -> Self {
    Self {
      reaction: reaction.into(),
      sense: Sense::Maximize,
    }
  }

  pub fn minimize(mut self) -> Self {
    self.sense = Sense::Minimize;
    self
  }
}

impl ObjectiveFunction for TargetFlux {
  fn name(&self) -> &str {
    &self.reaction
  }

  fn sense(&self) -> Sense {
    self.sense
  }

  fn evaluate(&self, _: &Model, flux: &FluxState, _: &TargetSet) -> f64 {
    flux.flux(&self.reaction).unwrap_or(0.0)
  }
}

/// Counts knockouts. Smaller designs are better.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberOfKnockouts;

impl ObjectiveFunction for NumberOfKnockouts {
  fn name(&self) -> &str {
    "number_of_knockouts"
  }

  fn sense(&self) -> Sense {
    Sense::Minimize
  }

  fn evaluate(&self, _: &Model, _: &FluxState, targets: &TargetSet) -> f64 {
    targets.knockouts() as f64
  }
}

/// One or more objectives sharing a sense.
pub struct ObjectiveSet {
  objectives: Vec<Box<dyn ObjectiveFunction>>,
  sense: Sense,
}

impl ObjectiveSet {
  /// # Errors
  ///
  /// Returns [`ConfigError::NoObjectives`] if `objectives` is empty and
  /// [`ConfigError::MixedSenses`] if they disagree on the sense.
  pub fn new(
    objectives: Vec<Box<dyn ObjectiveFunction>>,
  ) -> Result<Self, ConfigError> {
    let sense = objectives.first().ok_or(ConfigError::NoObjectives)?.sense();
    if objectives.iter().any(|o| o.sense() != sense) {
      return Err(ConfigError::MixedSenses);
    }
    Ok(Self { objectives, sense })
  }

  pub fn single(objective: impl ObjectiveFunction + 'static) -> Self {
    Self {
      sense: objective.sense(),
      objectives: vec![Box::new(objective)],
    }
  }

  pub fn len(&self) -> usize {
    self.objectives.len()
  }

  pub fn is_empty(&self) -> bool {
    self.objectives.is_empty()
  }

  pub fn is_multi(&self) -> bool {
    self.objectives.len() > 1
  }

  pub fn sense(&self) -> Sense {
    self.sense
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.objectives.iter().map(|o| o.name())
  }

  /// Evaluates every objective. A NaN is replaced by that objective's worst
  /// fitness.
  pub fn fitness(
    &self,
    model: &Model,
    flux: &FluxState,
    targets: &TargetSet,
  ) -> Fitness {
    self.collect(|o| {
      let value = o.evaluate(model, flux, targets);
      if value.is_nan() {
        o.worst_fitness()
      } else {
        value
      }
    })
  }

  pub fn worst_fitness(&self) -> Fitness {
    self.collect(|o| o.worst_fitness())
  }

  fn collect(&self, f: impl Fn(&dyn ObjectiveFunction) -> f64) -> Fitness {
    match self.objectives.as_slice() {
      [single] => Fitness::Single(f(single.as_ref())),
      many => Fitness::Multi(many.iter().map(|o| f(o.as_ref())).collect()),
    }
  }
}

impl std::fmt::Debug for ObjectiveSet {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ObjectiveSet")
      .field("objectives", &self.names().collect::<Vec<_>>())
      .field("sense", &self.sense)
      .finish()
  }
}
