use std::collections::HashMap;

use super::error::ReferenceSetError;
use super::reference_set::ReferenceSet;

/// One derived specificity row: how strongly `reference` expresses
/// `phenotype` (`value`) and how specific that expression is relative to
/// the reference's nearest neighbors (`specific`).
#[derive(Debug, Clone, PartialEq)]
pub struct SpecificPhenotype {
    pub reference: String,
    pub phenotype: String,
    pub value: f64,
    pub specific: f64,
}

/// One `(reference, neighbor, rank)` entry, rank running `1..=k`, as
/// persisted to the `reference_neighbors` table.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceNeighbor {
    pub reference: String,
    pub neighbor: String,
    pub rank: u32,
}

/// The full output of a specificity build: every `(reference, phenotype)`
/// row surviving the compactness rule, plus the neighbor lists recorded
/// along the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecificityResult {
    pub phenotypes: Vec<SpecificPhenotype>,
    pub neighbors: Vec<ReferenceNeighbor>,
}

fn round7(x: f64) -> f64 {
    (x * 1e7).round() / 1e7
}

/// Derive specificity profiles for every reference in `refset`
/// (including `"null"`, which is always included in full and never
/// trimmed by the compactness rule), using a `k`-nearest-neighbor
/// average as the "expected" profile for each non-null reference.
///
/// Before scoring non-null references, features with near-constant
/// value across all references (range `<= 1e-16`) are dropped; this
/// both shrinks the persisted output and excludes features that carry
/// no discriminating information between references. The null
/// reference is always scored against the full, unslimmed feature set.
pub fn derive_specificity(
    refset: &ReferenceSet,
    phenotype_priors: &HashMap<String, f64>,
    k: usize,
) -> Result<SpecificityResult, ReferenceSetError> {
    let mut phenotypes = Vec::new();
    let mut neighbors_out = Vec::new();

    let nulldata = refset.get_data("null")?;
    let nulldata: HashMap<String, f64> = nulldata
        .into_iter()
        .map(|(feature, value)| (feature, round7(value)))
        .collect();
    let priors: HashMap<String, f64> = phenotype_priors
        .iter()
        .map(|(k, v)| (k.clone(), round7(*v)))
        .collect();

    for (phenotype, &null_val) in &nulldata {
        let prior_val = priors.get(phenotype).copied().unwrap_or(null_val);
        phenotypes.push(SpecificPhenotype {
            reference: "null".to_string(),
            phenotype: phenotype.clone(),
            value: null_val,
            specific: prior_val,
        });
    }

    // slim() ranges over every reference including "null", matching the
    // original's slim_refset; this is a deliberate divergence from a literal
    // "non-null references" reading of the compactness rule.
    let slimmed = refset.slim();
    for reference in refset.names() {
        if reference == "null" {
            continue;
        }
        let refdata = slimmed.get_data(reference)?;
        let neighbors = slimmed.nearest_neighbors(reference, k)?;
        for (rank, neighbor) in neighbors.iter().enumerate() {
            neighbors_out.push(ReferenceNeighbor {
                reference: reference.clone(),
                neighbor: neighbor.clone(),
                rank: (rank + 1) as u32,
            });
        }
        let neidata = slimmed.get_average(&neighbors)?;

        for (phenotype, &raw_self_val) in &refdata {
            let self_val = round7(raw_self_val);
            let nei_val = round7(neidata[phenotype]);
            let null_val = nulldata[phenotype];
            let prior_val = priors.get(phenotype).copied().unwrap_or(null_val);

            let specific_val = if self_val < prior_val {
                (prior_val + (self_val - nei_val).min(0.0)).max(self_val)
            } else {
                (self_val - nei_val).max(prior_val)
            };

            if self_val == null_val && specific_val == prior_val {
                continue;
            }

            phenotypes.push(SpecificPhenotype {
                reference: reference.clone(),
                phenotype: phenotype.clone(),
                value: self_val,
                specific: specific_val,
            });
        }
    }

    Ok(SpecificityResult { phenotypes, neighbors: neighbors_out })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::representation::Representation;

    fn sample_refset() -> ReferenceSet {
        let priors = HashMap::from([
            ("null".to_string(), 0.4),
            ("a".to_string(), 0.3),
            ("b".to_string(), 0.3),
        ]);
        let ids = vec!["f1".to_string(), "f2".to_string()];
        let mut rs = ReferenceSet::new(&priors, &ids, None);

        let mut null = Representation::new("null");
        null.set("f1", 0.1).set("f2", 0.1);
        rs.add(&null).unwrap();

        let mut a = Representation::new("a");
        a.set("f1", 0.9).set("f2", 0.1);
        rs.add(&a).unwrap();

        let mut b = Representation::new("b");
        b.set("f1", 0.15).set("f2", 0.1);
        rs.add(&b).unwrap();

        rs.prep();
        rs
    }

    #[test]
    fn null_reference_always_present_in_full() {
        let rs = sample_refset();
        let priors = HashMap::from([("f1".to_string(), 0.1), ("f2".to_string(), 0.1)]);
        let result = derive_specificity(&rs, &priors, 1).unwrap();
        let null_rows: Vec<_> = result
            .phenotypes
            .iter()
            .filter(|r| r.reference == "null")
            .collect();
        assert_eq!(null_rows.len(), 2);
    }

    #[test]
    fn compactness_rule_omits_uninformative_rows() {
        let rs = sample_refset();
        // f2 is constant (0.1) across all references, so it's slimmed away
        // before the non-null pass and never produces a row for "a"/"b".
        let priors = HashMap::from([("f1".to_string(), 0.1), ("f2".to_string(), 0.1)]);
        let result = derive_specificity(&rs, &priors, 1).unwrap();
        assert!(!result
            .phenotypes
            .iter()
            .any(|r| r.reference != "null" && r.phenotype == "f2"));
    }

    #[test]
    fn neighbors_are_ranked_starting_at_one() {
        let rs = sample_refset();
        let priors = HashMap::from([("f1".to_string(), 0.1), ("f2".to_string(), 0.1)]);
        let result = derive_specificity(&rs, &priors, 1).unwrap();
        let a_neighbors: Vec<_> = result
            .neighbors
            .iter()
            .filter(|n| n.reference == "a")
            .collect();
        assert_eq!(a_neighbors.len(), 1);
        assert_eq!(a_neighbors[0].rank, 1);
        assert_eq!(a_neighbors[0].neighbor, "b");
    }
}
