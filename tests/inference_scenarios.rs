//! End-to-end inference scenarios exercising the full stack — ontology,
//! imputation, and the reference-set evidence chain — together rather
//! than one unit at a time.

use std::collections::HashMap;

use rstest::rstest;

use phenoscoring::ontology::Ontology;
use phenoscoring::referenceset::{InferenceOutcome, ReferenceSet};
use phenoscoring::representation::Representation;

fn flat_ontology(ids: &[&str]) -> Ontology {
    let mut obo = String::new();
    for id in ids {
        obo.push_str(&format!("[Term]\nid: {id}\n\n"));
    }
    Ontology::from_obo(obo.as_bytes()).unwrap()
}

fn uniform_map(ids: &[&str], value: f64) -> HashMap<String, f64> {
    ids.iter().map(|id| (id.to_string(), value)).collect()
}

fn imputed(name: &str, seeds: &[(&str, f64)], onto: &Ontology, defaults: &HashMap<String, f64>) -> Representation {
    let mut rep = Representation::new(name);
    for (id, value) in seeds {
        rep.set(*id, *value);
    }
    rep.impute(onto, defaults, None).unwrap();
    rep
}

#[rstest]
fn true_positive_evidence_raises_the_matching_reference_above_its_prior() {
    let ids = ["Y:001", "Y:002", "Y:004", "Y:007"];
    let onto_ids = [
        "Y:004",
        "Y:001",
        "Y:002",
        "Y:007",
    ];
    let obo = "\
[Term]
id: Y:004

[Term]
id: Y:001
is_a: Y:004

[Term]
id: Y:002
is_a: Y:004

[Term]
id: Y:007
is_a: Y:002
";
    let onto = Ontology::from_obo(obo.as_bytes()).unwrap();
    let defaults = uniform_map(&onto_ids, 0.2);

    let ref_a = imputed("refA", &[("Y:002", 1.0)], &onto, &defaults);
    let ref_b = imputed("refB", &[("Y:001", 1.0)], &onto, &defaults);
    let null = imputed("null", &[], &onto, &defaults);

    let priors = HashMap::from([
        ("null".to_string(), 0.4),
        ("refA".to_string(), 0.3),
        ("refB".to_string(), 0.3),
    ]);
    let feature_ids: Vec<String> = ids.iter().map(|s| s.to_string()).collect();
    let mut refset = ReferenceSet::new(&priors, &feature_ids, Some(&defaults));
    refset.learn_obo(&onto).unwrap();
    refset.add(&ref_a).unwrap();
    refset.add(&ref_b).unwrap();
    refset.add(&null).unwrap();

    let mut model = Representation::unnamed();
    model.set("Y:002", 1.0);

    let scores = refset.inference(&model, None, 1.0).unwrap();
    // refA shares the model's positive feature directly; refB's matching
    // feature (Y:001) is untouched by the model, so it stays at its prior.
    assert!(scores["refA"] > 0.3);
    assert!((scores["refB"] - 0.3).abs() < 1e-9);
}

#[rstest]
fn mirrored_reference_profiles_score_identically_when_the_model_is_symmetric() {
    let ids = ["f1", "f2"];
    let onto = flat_ontology(&ids);
    let defaults = uniform_map(&ids, 0.2);

    let ref_a = imputed("refA", &[("f1", 0.9), ("f2", 0.02)], &onto, &defaults);
    let ref_b = imputed("refB", &[("f2", 0.9), ("f1", 0.02)], &onto, &defaults);
    let null = imputed("null", &[], &onto, &defaults);

    let priors = HashMap::from([
        ("null".to_string(), 0.4),
        ("refA".to_string(), 0.3),
        ("refB".to_string(), 0.3),
    ]);
    let feature_ids: Vec<String> = ids.iter().map(|s| s.to_string()).collect();
    let mut refset = ReferenceSet::new(&priors, &feature_ids, Some(&defaults));
    refset.learn_obo(&onto).unwrap();
    refset.add(&ref_a).unwrap();
    refset.add(&ref_b).unwrap();
    refset.add(&null).unwrap();

    let mut model = Representation::unnamed();
    model.set("f1", 0.5).set("f2", 0.5);

    let scores = refset.inference(&model, None, 1.0).unwrap();
    // refA is a true positive on f1 and a false positive on f2; refB is
    // the mirror image. Since refA/refB carry equal priors and the two
    // features are otherwise interchangeable, relabeling which feature
    // plays which role must not change the evaluated posterior.
    assert!((scores["refA"] - scores["refB"]).abs() < 1e-9);
}

#[rstest]
fn higher_prior_wins_a_tie_between_otherwise_identical_references() {
    let ids = ["f"];
    let onto = flat_ontology(&ids);
    let defaults = uniform_map(&ids, 0.2);

    let ref_a = imputed("refA", &[("f", 0.9)], &onto, &defaults);
    let ref_b = imputed("refB", &[("f", 0.9)], &onto, &defaults);
    let null = imputed("null", &[], &onto, &defaults);

    let priors = HashMap::from([
        ("null".to_string(), 0.85),
        ("refA".to_string(), 0.05),
        ("refB".to_string(), 0.10),
    ]);
    let feature_ids: Vec<String> = ids.iter().map(|s| s.to_string()).collect();
    let mut refset = ReferenceSet::new(&priors, &feature_ids, Some(&defaults));
    refset.learn_obo(&onto).unwrap();
    refset.add(&ref_a).unwrap();
    refset.add(&ref_b).unwrap();
    refset.add(&null).unwrap();

    let mut model = Representation::unnamed();
    model.set("f", 0.9);

    let scores = refset.inference(&model, None, 1.0).unwrap();
    // Both references produce the same evidence chain (identical profile,
    // identical model), so the outcome is driven purely by which prior
    // started higher.
    assert!(scores["refA"] < scores["refB"]);
}

#[rstest]
fn stronger_negative_evidence_raises_the_posterior_more_than_weaker_negative_evidence() {
    let ids = ["f"];
    let onto = flat_ontology(&ids);
    let defaults = uniform_map(&ids, 0.2);

    let ref_a = imputed("refA", &[("f", 0.1)], &onto, &defaults);
    let ref_b = imputed("refB", &[("f", 0.001)], &onto, &defaults);
    let null = imputed("null", &[], &onto, &defaults);

    let priors = HashMap::from([
        ("null".to_string(), 0.4),
        ("refA".to_string(), 0.3),
        ("refB".to_string(), 0.3),
    ]);
    let feature_ids: Vec<String> = ids.iter().map(|s| s.to_string()).collect();
    let mut refset = ReferenceSet::new(&priors, &feature_ids, Some(&defaults));
    refset.learn_obo(&onto).unwrap();
    refset.add(&ref_a).unwrap();
    refset.add(&ref_b).unwrap();
    refset.add(&null).unwrap();

    let mut model = Representation::unnamed();
    model.set("f", 0.01);

    let scores = refset.inference(&model, None, 1.0).unwrap();
    assert!(scores["refA"] > 0.3);
    assert!(scores["refB"] > scores["refA"]);
}

#[rstest]
fn false_positive_handling_prefers_the_nearer_positive_ancestor() {
    let obo = "\
[Term]
id: Y:004

[Term]
id: Y:001
is_a: Y:004

[Term]
id: Y:002
is_a: Y:001

[Term]
id: Y:007
is_a: Y:002
";
    let onto = Ontology::from_obo(obo.as_bytes()).unwrap();
    let ids = ["Y:001", "Y:002", "Y:004", "Y:007"];
    let defaults = uniform_map(&ids, 0.1);

    // refNear: the immediate parent (Y:002) is positive, one step above
    // the false-positive feature.
    let ref_near = imputed("refNear", &[("Y:002", 0.8), ("Y:007", 0.02)], &onto, &defaults);
    // refFar: Y:002 sits exactly at background (not positive), so the
    // search must continue up to the grandparent (Y:001), two steps away.
    let ref_far = imputed("refFar", &[("Y:001", 0.8), ("Y:007", 0.02)], &onto, &defaults);
    let null = imputed("null", &[], &onto, &defaults);

    let priors = HashMap::from([
        ("null".to_string(), 0.4),
        ("refNear".to_string(), 0.3),
        ("refFar".to_string(), 0.3),
    ]);
    let feature_ids: Vec<String> = ids.iter().map(|s| s.to_string()).collect();
    let mut refset = ReferenceSet::new(&priors, &feature_ids, Some(&defaults));
    refset.learn_obo(&onto).unwrap();
    refset.add(&ref_near).unwrap();
    refset.add(&ref_far).unwrap();
    refset.add(&null).unwrap();

    let mut model = Representation::unnamed();
    model.set("Y:007", 0.9);

    let near_ancestor = find_ancestor(&refset, &model, "refNear");
    let far_ancestor = find_ancestor(&refset, &model, "refFar");

    assert_eq!(near_ancestor.as_deref(), Some("Y:002"));
    assert_eq!(far_ancestor.as_deref(), Some("Y:001"));
}

fn find_ancestor(refset: &ReferenceSet, model: &Representation, target: &str) -> Option<String> {
    let outcome = refset.inference_chain(model, target, 0.8, true).unwrap();
    let InferenceOutcome::Verbose(chain) = outcome else {
        panic!("verbose inference_chain must return a verbose outcome");
    };
    chain
        .annotations
        .iter()
        .find(|a| a.feature == "Y:007")
        .and_then(|a| a.ancestor_feature.clone())
}
