mod common;

use std::sync::Arc;

use common::{pathway, reaction_targets, simulate, PRODUCT, SUBSTRATE};
use strainga::{
  Candidate, Decoder, Fitness, FitnessEvaluator, GeneKnockoutDecoder, Model,
  ObjectiveSet, ProblemCache, ProductYield, ReactionKnockoutDecoder,
  Representation,
};

fn evaluator(model: &Model, decoder: Arc<dyn Decoder>) -> FitnessEvaluator {
  FitnessEvaluator::new(
    model.clone(),
    decoder,
    Arc::new(simulate),
    Arc::new(ObjectiveSet::single(ProductYield::new(PRODUCT, SUBSTRATE))),
    Some(2),
    1_000,
  )
  .unwrap()
}

fn reaction_evaluator(model: &Model) -> FitnessEvaluator {
  evaluator(
    model,
    Arc::new(ReactionKnockoutDecoder::new(reaction_targets(model))),
  )
}

fn snapshot(model: &Model) -> String {
  format!(
    "{:?} {:?} {:?}",
    model.reactions().collect::<Vec<_>>(),
    model.genes().collect::<Vec<_>>(),
    model.objective()
  )
}

#[test]
fn test_knocking_out_byproduct_triples_yield() {
  common::init_logger();
  let model = pathway();
  let evaluator = reaction_evaluator(&model);
  let representation = reaction_targets(&model);

  let wild_type = representation.encode(["R_x"]).unwrap();
  let byproduct = representation.encode(["R_by"]).unwrap();
  assert_eq!(
    evaluator.evaluate_one(&wild_type).unwrap(),
    Fitness::Single(0.3)
  );
  assert_eq!(
    evaluator.evaluate_one(&byproduct).unwrap(),
    Fitness::Single(0.9)
  );
}

#[test]
fn test_evaluate_one_is_deterministic() {
  let model = pathway();
  let evaluator = reaction_evaluator(&model);
  let candidate = Candidate::from([1, 4]);
  let first = evaluator.evaluate_one(&candidate).unwrap();
  let second = evaluator.evaluate_one(&candidate).unwrap();
  let bits = |f: &Fitness| f.values().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
  assert_eq!(bits(&first), bits(&second));
  assert_eq!(evaluator.simulations(), 1);
}

#[test]
fn test_lethal_knockout_gets_worst_fitness() {
  let model = pathway();
  let evaluator = reaction_evaluator(&model);
  // R_a feeds everything, growth included
  assert_eq!(
    evaluator.evaluate_one(&Candidate::from([0])).unwrap(),
    Fitness::Single(0.0)
  );
}

#[test]
fn test_model_is_restored_after_every_evaluation() {
  let mut model = pathway();
  let evaluator = reaction_evaluator(&model);
  let genes = Representation::genes(&model, &[]);
  let gene_evaluator = evaluator_for_genes(&model, genes);
  let before = snapshot(&model);
  let mut cache = ProblemCache::new();

  for candidate in [
    Candidate::from([1]),
    Candidate::from([0, 2]),
    Candidate::from([0, 1, 2, 3, 4]),
  ] {
    evaluator
      .evaluate_with(&mut model, &mut cache, &candidate)
      .unwrap();
    assert_eq!(snapshot(&model), before);
  }
  for candidate in [Candidate::from([1, 2]), Candidate::from([0])] {
    gene_evaluator
      .evaluate_with(&mut model, &mut cache, &candidate)
      .unwrap();
    assert_eq!(snapshot(&model), before);
  }

  // the uptake variable was created once and patched afterwards
  assert_eq!(cache.creations(), 1);
  assert!(cache.updates() >= 4);
}

fn evaluator_for_genes(model: &Model, genes: Representation) -> FitnessEvaluator {
  evaluator(
    model,
    Arc::new(GeneKnockoutDecoder::new(genes, model).unwrap()),
  )
}

#[test]
fn test_gene_knockouts_need_every_isozyme() {
  let model = pathway();
  let genes = Representation::genes(&model, &[]);
  let one = genes.encode(["gby1"]).unwrap();
  let both = genes.encode(["gby1", "gby2"]).unwrap();
  let evaluator = evaluator_for_genes(&model, genes);

  assert_eq!(evaluator.evaluate_one(&one).unwrap(), Fitness::Single(0.3));
  assert_eq!(evaluator.evaluate_one(&both).unwrap(), Fitness::Single(0.9));

  let decoded = evaluator.decoder().decode(&both).unwrap();
  assert_eq!(decoded.simulation.len(), 2);
  // neither gene blocks R_by alone, so the report adds nothing
  assert_eq!(decoded.report, decoded.simulation);
}

#[test]
fn test_batch_matches_single_evaluations() {
  let model = pathway();
  let batch_evaluator = reaction_evaluator(&model);
  let single_evaluator = reaction_evaluator(&model);
  let candidates: Vec<_> = (0..5)
    .flat_map(|i| (i..5).map(move |j| Candidate::from([i, j])))
    .collect();

  let batch = batch_evaluator.evaluate_batch(&candidates).unwrap();
  let single: Vec<_> = candidates
    .iter()
    .map(|c| single_evaluator.evaluate_one(c).unwrap())
    .collect();
  assert_eq!(batch, single);
}
