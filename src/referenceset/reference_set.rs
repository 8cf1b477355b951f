use std::cell::RefCell;
use std::collections::HashMap;

use log::debug;

use crate::evidence::{estimate_update, InferenceChain, InferenceDatum, LeanInferenceChain};
use crate::ontology::Ontology;
use crate::representation::Representation;

use super::comparison_code::{comparison_code, ComparisonCode};
use super::distance::{nearest_neighbors as distance_nearest_neighbors, neighbor_average, vec_norm};
use super::error::ReferenceSetError;

/// Per-datum audit trail attached to one evidence item in a
/// [`VerboseInferenceChain`].
#[derive(Debug, Clone)]
pub struct DatumAnnotation {
    pub feature: String,
    pub reference: f64,
    pub background: f64,
    pub model: f64,
    pub result: ComparisonCode,
    pub ancestor_feature: Option<String>,
    pub ancestor_bg: Option<f64>,
    pub ancestor_value: Option<f64>,
}

/// A full evidence chain plus per-datum annotations, for audit and
/// persistence. See [`ReferenceSet::inference_chain`].
#[derive(Debug, Clone)]
pub struct VerboseInferenceChain {
    pub chain: InferenceChain,
    pub reference: String,
    pub model: String,
    pub annotations: Vec<DatumAnnotation>,
}

impl VerboseInferenceChain {
    pub fn evaluate(&mut self) -> f64 {
        self.chain.evaluate()
    }
}

/// Either a verbose or a lean evidence chain, returned by
/// [`ReferenceSet::inference_chain`] depending on the `verbose` argument.
pub enum InferenceOutcome {
    Lean(LeanInferenceChain),
    Verbose(Box<VerboseInferenceChain>),
}

impl InferenceOutcome {
    pub fn evaluate(&mut self) -> f64 {
        match self {
            InferenceOutcome::Lean(chain) => chain.evaluate(),
            InferenceOutcome::Verbose(chain) => chain.evaluate(),
        }
    }
}

struct FeatureOutcome {
    tpr: f64,
    fpr: f64,
    alpha: f64,
    ancestor_feature: Option<usize>,
    ancestor_bg: Option<f64>,
    ancestor_value: Option<f64>,
}

/// A dense [features x references] matrix of imputed probabilities, with
/// feature/reference priors and the inference machinery that compares a
/// model representation against every reference column.
///
/// Columns are added one representation at a time via [`Self::add`]; the
/// matrix shape (row and column universes) is fixed at construction.
pub struct ReferenceSet {
    rows: HashMap<String, usize>,
    row_names: Vec<String>,
    row_priors: Vec<f64>,

    columns: HashMap<String, usize>,
    column_names: Vec<String>,
    column_priors: Vec<f64>,

    /// data[reference_index][feature_index]
    data: Vec<Vec<f64>>,

    parents: Option<Vec<Vec<usize>>>,

    ancestor_cache: RefCell<HashMap<usize, Option<usize>>>,
}

impl ReferenceSet {
    /// Build an empty reference set over a fixed feature universe (`ids`,
    /// with optional `row_priors`) and a fixed set of references (`priors`,
    /// mapping reference name to its prior probability).
    pub fn new(
        priors: &HashMap<String, f64>,
        ids: &[String],
        row_priors: Option<&HashMap<String, f64>>,
    ) -> Self {
        let mut rows = HashMap::new();
        let mut row_priors_vec = vec![1.0; ids.len()];
        for (index, feature) in ids.iter().enumerate() {
            rows.insert(feature.clone(), index);
            if let Some(given) = row_priors {
                row_priors_vec[index] = given.get(feature).copied().unwrap_or(1.0);
            }
        }

        let mut columns = HashMap::new();
        let mut column_names = Vec::with_capacity(priors.len());
        let mut column_priors = Vec::with_capacity(priors.len());
        for name in priors.keys() {
            columns.insert(name.clone(), column_names.len());
            column_names.push(name.clone());
            column_priors.push(priors[name]);
        }

        let data = vec![vec![0.0; rows.len()]; columns.len()];

        ReferenceSet {
            rows,
            row_names: ids.to_vec(),
            row_priors: row_priors_vec,
            columns,
            column_names,
            column_priors,
            data,
            parents: None,
            ancestor_cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn n_features(&self) -> usize {
        self.row_names.len()
    }

    pub fn n_references(&self) -> usize {
        self.column_names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.column_names
    }

    pub fn feature_names(&self) -> &[String] {
        &self.row_names
    }

    pub fn feature_prior(&self, feature: &str) -> Option<f64> {
        self.rows.get(feature).map(|&i| self.row_priors[i])
    }

    pub fn reference_prior(&self, reference: &str) -> Option<f64> {
        self.columns.get(reference).map(|&i| self.column_priors[i])
    }

    /// Extract the `parent_of`-inverse, i.e. `is_a` parent indexes, for
    /// every feature, used later by the false-positive ancestor search.
    pub fn learn_obo(&mut self, ontology: &Ontology) -> Result<(), ReferenceSetError> {
        let mut parents = Vec::with_capacity(self.row_names.len());
        for feature in &self.row_names {
            let parent_names = ontology.parents(feature)?;
            let parent_indexes: Vec<usize> = parent_names
                .iter()
                .filter_map(|p| self.rows.get(p).copied())
                .collect();
            parents.push(parent_indexes);
        }
        self.parents = Some(parents);
        self.ancestor_cache.borrow_mut().clear();
        Ok(())
    }

    /// Copy every explicitly-set value from `representation` into the
    /// matching column. The representation must carry the name of an
    /// existing column.
    pub fn add(&mut self, representation: &Representation) -> Result<(), ReferenceSetError> {
        let name = representation
            .name
            .as_deref()
            .ok_or(ReferenceSetError::UnnamedRepresentation)?;
        let refindex = *self
            .columns
            .get(name)
            .ok_or_else(|| ReferenceSetError::IncompatibleRepresentation(name.to_string()))?;

        for (key, value) in representation.iter() {
            let Some(&rowindex) = self.rows.get(key) else {
                return Err(ReferenceSetError::UnknownFeature(key.to_string()));
            };
            self.data[refindex][rowindex] = value;
        }
        Ok(())
    }

    pub fn get(&self, feature: &str, reference: &str) -> Result<f64, ReferenceSetError> {
        let rowindex = *self
            .rows
            .get(feature)
            .ok_or_else(|| ReferenceSetError::UnknownFeature(feature.to_string()))?;
        let colindex = *self
            .columns
            .get(reference)
            .ok_or_else(|| ReferenceSetError::UnknownReference(reference.to_string()))?;
        Ok(self.data[colindex][rowindex])
    }

    pub fn get_data(&self, reference: &str) -> Result<HashMap<String, f64>, ReferenceSetError> {
        let colindex = *self
            .columns
            .get(reference)
            .ok_or_else(|| ReferenceSetError::UnknownReference(reference.to_string()))?;
        let refdata = &self.data[colindex];
        Ok(self
            .rows
            .iter()
            .map(|(feature, &index)| (feature.clone(), refdata[index]))
            .collect())
    }

    pub fn get_representation(
        &self,
        reference: &str,
    ) -> Result<Representation, ReferenceSetError> {
        let mut repr = Representation::new(reference);
        for (feature, value) in self.get_data(reference)? {
            repr.set(feature, value);
        }
        Ok(repr)
    }

    /// (re-)compute feature priors from the weighted column sums, with a
    /// non-zero floor so unseen features don't collapse evidence to zero.
    pub fn prep(&mut self) -> &mut Self {
        let denominator: f64 = self.column_priors.iter().sum();
        let null_feature_prior = 1.0 / denominator.max(self.rows.len() as f64);

        let mut new_priors = vec![0.0; self.rows.len()];
        for rowindex in 0..self.rows.len() {
            let mut numerator = 0.0;
            for (colindex, &colprior) in self.column_priors.iter().enumerate() {
                numerator += self.data[colindex][rowindex] * colprior;
            }
            if numerator == 0.0 {
                numerator = null_feature_prior;
            }
            new_priors[rowindex] = numerator / denominator;
        }
        self.row_priors = new_priors;
        self
    }

    /// Min/max observed value for `feature` across all references.
    pub fn range(&self, feature: &str) -> Result<(f64, f64), ReferenceSetError> {
        let rowindex = *self
            .rows
            .get(feature)
            .ok_or_else(|| ReferenceSetError::UnknownFeature(feature.to_string()))?;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for refdata in &self.data {
            let v = refdata[rowindex];
            min = min.min(v);
            max = max.max(v);
        }
        Ok((min, max))
    }

    fn column_norms(&self) -> Vec<f64> {
        self.data.iter().map(|col| vec_norm(col)).collect()
    }

    /// Names of the `k` nearest references to `source` by cosine distance
    /// over the feature columns, excluding `source` itself.
    pub fn nearest_neighbors(&self, source: &str, k: usize) -> Result<Vec<String>, ReferenceSetError> {
        let source_index = *self
            .columns
            .get(source)
            .ok_or_else(|| ReferenceSetError::UnknownReference(source.to_string()))?;
        let norms = self.column_norms();
        let indexes = distance_nearest_neighbors(source_index, &self.data, &norms, k);
        Ok(indexes.into_iter().map(|i| self.column_names[i].clone()).collect())
    }

    /// Prior-weighted average profile over `references`.
    pub fn get_average(&self, references: &[String]) -> Result<HashMap<String, f64>, ReferenceSetError> {
        let indexes: Vec<usize> = references
            .iter()
            .map(|r| {
                self.columns
                    .get(r)
                    .copied()
                    .ok_or_else(|| ReferenceSetError::UnknownReference(r.clone()))
            })
            .collect::<Result<_, _>>()?;
        let averaged = neighbor_average(&self.data, &self.column_priors, &indexes);
        Ok(self
            .rows
            .iter()
            .map(|(feature, &index)| (feature.clone(), averaged[index]))
            .collect())
    }

    /// A copy of this reference set restricted to features whose range
    /// across all references exceeds `1e-16`, matching the original
    /// implementation's pruning of uninformative (constant) features.
    pub fn slim(&self) -> Self {
        let keep: Vec<String> = self
            .row_names
            .iter()
            .filter(|feature| {
                let (min, max) = self.range(feature).expect("feature is in this set");
                max - min > 1e-16
            })
            .cloned()
            .collect();

        let dropped = self.row_names.len() - keep.len();
        if dropped > 0 {
            debug!(
                "slim: dropped {dropped} near-constant feature(s) out of {}",
                self.row_names.len()
            );
        }

        let mut rows = HashMap::new();
        let mut row_priors = Vec::with_capacity(keep.len());
        for (index, feature) in keep.iter().enumerate() {
            rows.insert(feature.clone(), index);
            row_priors.push(self.row_priors[self.rows[feature]]);
        }

        let data: Vec<Vec<f64>> = self
            .data
            .iter()
            .map(|refdata| {
                keep.iter()
                    .map(|feature| refdata[self.rows[feature]])
                    .collect()
            })
            .collect();

        ReferenceSet {
            rows,
            row_names: keep,
            row_priors,
            columns: self.columns.clone(),
            column_names: self.column_names.clone(),
            column_priors: self.column_priors.clone(),
            data,
            parents: None,
            ancestor_cache: RefCell::new(HashMap::new()),
        }
    }

    fn find_positive_ancestor(&self, refdata: &[f64], seedindex: usize) -> (Option<usize>, f64) {
        let seedval = refdata[seedindex];
        let prior = self.row_priors[seedindex];
        if seedval > prior {
            return (Some(seedindex), -seedval / prior);
        }

        let parents = self
            .parents
            .as_ref()
            .expect("learn_obo must be called before inference")
            .get(seedindex)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        match parents.len() {
            0 => (None, 0.0),
            1 => self.find_positive_ancestor(refdata, parents[0]),
            2 => {
                let r0 = self.find_positive_ancestor(refdata, parents[0]);
                let r1 = self.find_positive_ancestor(refdata, parents[1]);
                if r1.1 < r0.1 {
                    r1
                } else {
                    r0
                }
            }
            _ => parents
                .iter()
                .map(|&p| self.find_positive_ancestor(refdata, p))
                .min_by(|a, b| a.1.partial_cmp(&b.1).expect("enrichment scores are finite"))
                .expect("parents is non-empty"),
        }
    }

    fn positive_ancestor(&self, refindex: usize, seedindex: usize) -> Option<usize> {
        let key = (self.row_names.len() * refindex) + seedindex;
        if let Some(hit) = self.ancestor_cache.borrow().get(&key) {
            return *hit;
        }
        let refdata = &self.data[refindex];
        let result = self.find_positive_ancestor(refdata, seedindex).0;
        self.ancestor_cache.borrow_mut().insert(key, result);
        result
    }

    fn feature_outcome(
        &self,
        refindex: usize,
        ifeature: usize,
        bg: f64,
        ref_val: f64,
        model_val: f64,
        fp_penalty: f64,
    ) -> FeatureOutcome {
        if model_val > bg && ref_val > bg {
            // True positive
            FeatureOutcome {
                tpr: model_val,
                fpr: bg,
                alpha: (ref_val - bg) / (1.0 - bg),
                ancestor_feature: None,
                ancestor_bg: None,
                ancestor_value: None,
            }
        } else if model_val > bg && ref_val < bg {
            // False positive
            let iancestor = self.positive_ancestor(refindex, ifeature);
            let (ancestor_bg, ancestor_val) = match iancestor {
                None => (1.0, 1.0),
                Some(i) => (self.row_priors[i], self.data[refindex][i]),
            };

            let beta = ((fp_penalty * (ancestor_bg / bg).log10())).tanh();
            let ancestor_estimate = estimate_update(ancestor_bg, bg, model_val);
            let tpr0 = ancestor_estimate * (1.0 - beta) + ancestor_bg * beta;
            let fpr0 = ancestor_bg;

            let tpr = tpr0 * (1.0 - model_val);
            let fpr = fpr0 * (1.0 - bg);
            let alpha = if ancestor_val > bg {
                (ancestor_val - bg) / (1.0 - bg)
            } else {
                0.0
            };

            FeatureOutcome {
                tpr,
                fpr,
                alpha,
                ancestor_feature: iancestor,
                ancestor_bg: Some(ancestor_bg),
                ancestor_value: Some(ancestor_val),
            }
        } else if model_val < bg && ref_val > bg {
            // False negative
            FeatureOutcome {
                tpr: 1.0 - bg,
                fpr: 1.0 - model_val,
                alpha: (ref_val - bg) / (1.0 - bg),
                ancestor_feature: None,
                ancestor_bg: None,
                ancestor_value: None,
            }
        } else {
            // True negative (model_val < bg && ref_val < bg)
            FeatureOutcome {
                tpr: 1.0 - model_val,
                fpr: 1.0 - bg,
                alpha: (bg - ref_val) / bg,
                ancestor_feature: None,
                ancestor_bg: None,
                ancestor_value: None,
            }
        }
    }

    /// Build an evidence chain comparing `model` against reference
    /// `target`. `verbose` selects a [`VerboseInferenceChain`] (with
    /// per-feature annotations, for audit and persistence) or a
    /// [`LeanInferenceChain`] (evaluation only, used by the hot scoring
    /// path); see [`Self::inference`].
    pub fn inference_chain(
        &self,
        model: &Representation,
        target: &str,
        fp_penalty: f64,
        verbose: bool,
    ) -> Result<InferenceOutcome, ReferenceSetError> {
        let refindex = *self
            .columns
            .get(target)
            .ok_or_else(|| ReferenceSetError::UnknownReference(target.to_string()))?;
        let prior = self.column_priors[refindex];

        if verbose {
            let mut chain = InferenceChain::new(prior);
            let mut annotations = Vec::new();
            for (feature, model_val) in model.iter() {
                let Some(&ifeature) = self.rows.get(feature) else {
                    return Err(ReferenceSetError::UnknownFeature(feature.to_string()));
                };
                let ref_val = self.data[refindex][ifeature];
                let bg = self.row_priors[ifeature];

                let (tpr, fpr, ancestor_feature, ancestor_bg, ancestor_value) =
                    if model_val == bg || ref_val == bg {
                        (bg, bg, None, None, None)
                    } else {
                        let outcome =
                            self.feature_outcome(refindex, ifeature, bg, ref_val, model_val, fp_penalty);
                        let tpr = outcome.alpha * outcome.tpr + (1.0 - outcome.alpha) * outcome.fpr;
                        (
                            tpr,
                            outcome.fpr,
                            outcome.ancestor_feature,
                            outcome.ancestor_bg,
                            outcome.ancestor_value,
                        )
                    };

                chain.add(InferenceDatum::new(tpr, fpr));
                annotations.push(DatumAnnotation {
                    feature: feature.to_string(),
                    reference: ref_val,
                    background: bg,
                    model: model_val,
                    result: comparison_code(model_val, ref_val, bg),
                    ancestor_feature: ancestor_feature.map(|i| self.row_names[i].clone()),
                    ancestor_bg,
                    ancestor_value,
                });
            }
            Ok(InferenceOutcome::Verbose(Box::new(VerboseInferenceChain {
                chain,
                reference: target.to_string(),
                model: model.name.clone().unwrap_or_default(),
                annotations,
            })))
        } else {
            let mut chain = LeanInferenceChain::new(prior);
            for (feature, model_val) in model.iter() {
                let Some(&ifeature) = self.rows.get(feature) else {
                    return Err(ReferenceSetError::UnknownFeature(feature.to_string()));
                };
                let ref_val = self.data[refindex][ifeature];
                let bg = self.row_priors[ifeature];

                if model_val == bg || ref_val == bg {
                    continue;
                }

                let outcome =
                    self.feature_outcome(refindex, ifeature, bg, ref_val, model_val, fp_penalty);
                let tpr = outcome.alpha * outcome.tpr + (1.0 - outcome.alpha) * outcome.fpr;
                chain.add(tpr, outcome.fpr);
            }
            Ok(InferenceOutcome::Lean(chain))
        }
    }

    /// Score `model` against every reference in `targets` (or every
    /// reference, if `None`), returning the evaluated posterior for each.
    pub fn inference(
        &self,
        model: &Representation,
        targets: Option<&[String]>,
        fp_penalty: f64,
    ) -> Result<HashMap<String, f64>, ReferenceSetError> {
        let owned_targets;
        let targets: &[String] = match targets {
            Some(t) => t,
            None => {
                owned_targets = self.column_names.clone();
                &owned_targets
            }
        };

        let mut result = HashMap::with_capacity(targets.len());
        for reference in targets {
            let mut chain = self.inference_chain(model, reference, fp_penalty, false)?;
            result.insert(reference.clone(), chain.evaluate());
        }
        Ok(result)
    }
}
