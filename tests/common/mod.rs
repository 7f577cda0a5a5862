#![allow(dead_code)]

use strainga::{
  FluxState, Model, ModelScope, ProblemCache, Reaction, SimulationError,
  Variable,
};

pub const SUBSTRATE: &str = "EX_s";
pub const PRODUCT: &str = "EX_p";
pub const BIOMASS: &str = "BIOMASS";

pub fn init_logger() {
  let _ = env_logger::builder().is_test(true).try_init();
}

/// Substrate `s` is taken up through `EX_s` and converted to `a` by `R_a`.
/// `a` feeds growth first, then the byproduct `R_by`, then the product route
/// `R_p -> EX_p`.
///
/// Unmodified, 10 units of substrate yield 1 biomass, 6 byproduct and 3
/// product. Knocking out `R_by` sends its 6 units to the product.
pub fn pathway() -> Model {
  let mut model = Model::new("pathway");
  model.add_reaction(Reaction::new(SUBSTRATE, -10.0, 0.0));
  model.add_reaction(Reaction::new("R_a", 0.0, 1000.0).with_rule([["ga"]]));
  model.add_reaction(Reaction::new(BIOMASS, 0.0, 1.0));
  model.add_reaction(
    Reaction::new("R_by", 0.0, 6.0).with_rule([["gby1"], ["gby2"]]),
  );
  model.add_reaction(Reaction::new("R_p", 0.0, 1000.0).with_rule([["gp"]]));
  model.add_reaction(Reaction::new(PRODUCT, 0.0, 1000.0));
  model.add_reaction(Reaction::new("R_x", 0.0, 1000.0));
  model.set_objective([(BIOMASS, 1.0)]);
  model
}

fn upper(scope: &ModelScope<'_>, id: &str) -> f64 {
  scope.reaction(id).map_or(0.0, |r| r.upper_bound)
}

/// Routes flux through the pathway greedily, which is optimal for it.
/// Infeasible without growth.
pub fn simulate(
  scope: &mut ModelScope<'_>,
  cache: &mut ProblemCache,
) -> Result<FluxState, SimulationError> {
  let uptake_bound = scope.reaction(SUBSTRATE).map_or(0.0, |r| r.lower_bound);
  cache.add_variable(
    scope.problem_mut(),
    "uptake",
    || Variable::new(uptake_bound, 0.0),
    |v| v.lower = uptake_bound,
  );

  let a = (-uptake_bound).min(upper(scope, "R_a"));
  let growth = a.min(upper(scope, BIOMASS));
  if growth <= 0.0 {
    return Err(SimulationError::Infeasible);
  }
  let rest = a - growth;
  let byproduct = rest.min(upper(scope, "R_by"));
  let product = (rest - byproduct)
    .min(upper(scope, "R_p"))
    .min(upper(scope, PRODUCT));
  let uptake = growth + byproduct + product;

  Ok(FluxState::new(
    [
      (SUBSTRATE, -uptake),
      ("R_a", uptake),
      (BIOMASS, growth),
      ("R_by", byproduct),
      ("R_p", product),
      (PRODUCT, product),
      ("R_x", 0.0),
    ],
    growth,
  ))
}

/// Everything but the exchange and growth reactions.
pub fn reaction_targets(model: &Model) -> strainga::Representation {
  strainga::Representation::reactions(model, &[SUBSTRATE, BIOMASS])
}
