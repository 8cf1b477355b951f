use std::collections::HashMap;

use crate::ontology::{Ontology, OntologyError};

/// A named mapping from ontology term id to a probability in `[0, 1]`.
///
/// May be sparse (only explicitly-set features, as used for model
/// observations) or complete (every ontology feature carries a value, as
/// used for reference columns after [`Representation::impute`]).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Representation {
    data: HashMap<String, f64>,
    pub name: Option<String>,
}

impl Representation {
    pub fn new(name: impl Into<String>) -> Self {
        Representation {
            data: HashMap::new(),
            name: Some(name.into()),
        }
    }

    pub fn unnamed() -> Self {
        Representation {
            data: HashMap::new(),
            name: None,
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: f64) -> &mut Self {
        self.data.insert(key.into(), value);
        self
    }

    pub fn has(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.data.get(key).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.data.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.data.values().sum()
    }

    /// Merge `defaults` under the existing data: keys already present in
    /// `self` are left untouched.
    pub fn defaults(&mut self, defaults: &HashMap<String, f64>) -> &mut Self {
        for (key, value) in defaults {
            self.data.entry(key.clone()).or_insert(*value);
        }
        self
    }

    /// Propagate evidence up and down the ontology DAG so that the
    /// representation carries a value for every feature in `defaults`.
    ///
    /// Two phases: an upward complement-product raising every ancestor of
    /// a positive seed, then a downward min-flood lowering every
    /// descendant of a negative seed.
    pub fn impute(
        &mut self,
        ontology: &Ontology,
        defaults: &HashMap<String, f64>,
        seeds: Option<Vec<String>>,
    ) -> Result<&mut Self, OntologyError> {
        // Keys explicitly present before merging defaults determine the
        // default seed order; keys that only exist because of the merge sit
        // exactly at their default value and are inert as seeds either way.
        let explicit_keys: Vec<String> = self.data.keys().cloned().collect();

        self.defaults(defaults);
        let original: HashMap<String, f64> = self.data.clone();

        let seeds: Vec<String> = match seeds {
            Some(s) => s,
            None => {
                let mut pairs: Vec<(f64, String)> = explicit_keys
                    .into_iter()
                    .map(|k| (original[&k], k))
                    .collect();
                pairs.sort_by(|a, b| a.partial_cmp(b).expect("representation values are finite"));
                pairs.into_iter().map(|(_, k)| k).collect()
            }
        };

        self.propagate_up(ontology, defaults, &original, &seeds)?;
        self.propagate_down(ontology, defaults, &original, &seeds)?;

        Ok(self)
    }

    fn propagate_up(
        &mut self,
        ontology: &Ontology,
        defaults: &HashMap<String, f64>,
        original: &HashMap<String, f64>,
        seeds: &[String],
    ) -> Result<(), OntologyError> {
        // accumulated complement products; absence means "untouched".
        let mut touched: HashMap<String, f64> = HashMap::new();

        for seed in seeds {
            let Some(&default_val) = defaults.get(seed) else {
                continue;
            };
            let seed_val = original[seed];
            if seed_val <= default_val {
                continue;
            }
            let factor = 1.0 - seed_val;

            // the seed's own factor starts at 1 (not mixed with its default).
            let entry = touched.entry(seed.clone()).or_insert(1.0);
            *entry *= factor;

            for ancestor in ontology.ancestors(seed)? {
                let default_anc = defaults
                    .get(&ancestor)
                    .copied()
                    .unwrap_or_else(|| original.get(&ancestor).copied().unwrap_or(0.0));
                let entry = touched
                    .entry(ancestor)
                    .or_insert_with(|| 1.0 - default_anc);
                *entry *= factor;
            }
        }

        for (key, value) in original {
            let final_value = match touched.get(key) {
                Some(product) => 1.0 - product,
                None => *value,
            };
            self.data.insert(key.clone(), final_value);
        }

        Ok(())
    }

    fn propagate_down(
        &mut self,
        ontology: &Ontology,
        defaults: &HashMap<String, f64>,
        original: &HashMap<String, f64>,
        seeds: &[String],
    ) -> Result<(), OntologyError> {
        for seed in seeds {
            let Some(&default_val) = defaults.get(seed) else {
                continue;
            };
            let seed_val = original[seed];
            if seed_val >= default_val {
                continue;
            }

            if self.data[seed] <= default_val {
                self.data.insert(seed.clone(), seed_val);
            }

            for descendant in ontology.descendants(seed)? {
                let default_desc = defaults.get(&descendant).copied().unwrap_or(0.0);
                let current = self.data[&descendant];
                if current <= default_desc && seed_val < current {
                    self.data.insert(descendant.clone(), seed_val);
                }
            }
        }

        Ok(())
    }

    /// Approximate equality, matching the tolerance semantics used by the
    /// test suite and by the original implementation's `equal()`.
    pub fn approx_eq(&self, other: &Representation, rel_tol: f64, abs_tol: f64) -> bool {
        if self.name != other.name || self.data.len() != other.data.len() {
            return false;
        }
        for (key, value) in &self.data {
            let Some(other_value) = other.data.get(key) else {
                return false;
            };
            let diff = (value - other_value).abs();
            let tol = abs_tol.max(rel_tol * value.abs().max(other_value.abs()));
            if diff > tol {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_ontology() -> Ontology {
        // root -> mid -> leaf, plus a sibling of mid
        let obo = "\
[Term]
id: root

[Term]
id: mid
is_a: root

[Term]
id: leaf
is_a: mid

[Term]
id: sibling
is_a: root

";
        Ontology::from_obo(obo.as_bytes()).unwrap()
    }

    fn defaults() -> HashMap<String, f64> {
        HashMap::from([
            ("root".to_string(), 0.2),
            ("mid".to_string(), 0.2),
            ("leaf".to_string(), 0.2),
            ("sibling".to_string(), 0.2),
        ])
    }

    #[test]
    fn upward_seed_keeps_its_own_value() {
        let onto = chain_ontology();
        let mut repr = Representation::unnamed();
        repr.set("leaf", 0.9);
        repr.impute(&onto, &defaults(), None).unwrap();
        assert!((repr.get("leaf").unwrap() - 0.9).abs() < 1e-12);
    }

    #[test]
    fn upward_seed_raises_ancestors_above_default() {
        let onto = chain_ontology();
        let mut repr = Representation::unnamed();
        repr.set("leaf", 0.9);
        repr.impute(&onto, &defaults(), None).unwrap();
        // mid = 1 - (1-default(mid))*(1-0.9) = 1 - 0.8*0.1 = 0.92
        assert!((repr.get("mid").unwrap() - 0.92).abs() < 1e-9);
        assert!(repr.get("root").unwrap() >= 0.2);
        assert!(repr.get("sibling").unwrap() == 0.2);
    }

    #[test]
    fn downward_seed_floods_descendants_with_min() {
        let onto = chain_ontology();
        let mut repr = Representation::unnamed();
        repr.set("mid", 0.01);
        repr.impute(&onto, &defaults(), None).unwrap();
        assert!((repr.get("mid").unwrap() - 0.01).abs() < 1e-12);
        assert!((repr.get("leaf").unwrap() - 0.01).abs() < 1e-12);
        // root is an ancestor, not a descendant: untouched by downward flood
        assert!((repr.get("root").unwrap() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn impute_is_complete_and_in_range() {
        let onto = chain_ontology();
        let mut repr = Representation::unnamed();
        repr.set("leaf", 0.9);
        repr.impute(&onto, &defaults(), None).unwrap();
        for id in ["root", "mid", "leaf", "sibling"] {
            let v = repr.get(id).unwrap();
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn impute_is_idempotent_with_original_seeds() {
        let onto = chain_ontology();
        let mut repr = Representation::unnamed();
        repr.set("leaf", 0.9);
        let seeds = vec!["leaf".to_string()];
        repr.impute(&onto, &defaults(), Some(seeds.clone())).unwrap();
        let once = repr.clone();
        repr.impute(&onto, &defaults(), Some(seeds)).unwrap();
        assert!(once.approx_eq(&repr, 1e-9, 1e-12));
    }

    #[test]
    fn round_trip_seed_keys_preserved() {
        let onto = chain_ontology();
        let mut repr = Representation::unnamed();
        repr.set("leaf", 0.9);
        let original_leaf = repr.get("leaf").unwrap();
        repr.impute(&onto, &defaults(), None).unwrap();
        assert!((repr.get("leaf").unwrap() - original_leaf).abs() < 1e-12);
    }
}
