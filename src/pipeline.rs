//! Orchestrates one ingest/build/compute run against a [`Store`], the way
//! the original command-line tool chained its `build`, `update`, and
//! `compute` actions one at a time against a shared database.

use std::collections::HashMap;
use std::io::Read;

use log::{debug, info, warn};

use crate::config::PhenoscoringConfig;
use crate::error::PhenoscoringError;
use crate::evidence::LeanInferenceChain;
use crate::ingest::{
    read_concise_reference_phenotypes, read_model_descriptions, read_model_phenotypes,
    read_phenotype_frequencies,
};
use crate::ontology::Ontology;
use crate::persistence::{
    composite_key, ModelDescriptionRow, ModelPhenotypeRow, ModelScoreRow, PhenotypeFrequencyRow,
    ReferenceCompletePhenotypeRow, ReferenceConcisePhenotypeRow, ReferenceNeighborRow,
    ReferencePriorRow, Store, Table,
};
use crate::referenceset::{derive_specificity, ReferenceSet};
use crate::representation::Representation;
use crate::scheduler::{plan, run_packets};

const NULL_REFERENCE: &str = "null";

/// Ties a [`PhenoscoringConfig`] to a [`Store`] and drives the ingest,
/// reference-build, and compute stages against it.
pub struct Pipeline<'a, S: Store> {
    config: &'a PhenoscoringConfig,
    store: &'a S,
}

impl<'a, S: Store> Pipeline<'a, S> {
    pub fn new(config: &'a PhenoscoringConfig, store: &'a S) -> Self {
        Pipeline { config, store }
    }

    // --- ingest -------------------------------------------------------

    pub fn ingest_reference_phenotypes(&self, reader: impl Read) -> Result<usize, PhenoscoringError> {
        let records = read_concise_reference_phenotypes(reader)?;
        let rows: Vec<(String, ReferenceConcisePhenotypeRow)> = records
            .into_iter()
            .map(|r| {
                let key = composite_key(&[&r.id, &r.phenotype]);
                (
                    key,
                    ReferenceConcisePhenotypeRow {
                        id: r.id,
                        phenotype: r.phenotype,
                        value: r.value,
                    },
                )
            })
            .collect();
        let count = rows.len();
        self.store.put_batch(Table::ReferenceConcisePhenotype, &rows)?;
        info!("ingested {count} reference phenotype observations");
        Ok(count)
    }

    pub fn ingest_phenotype_frequencies(&self, reader: impl Read) -> Result<usize, PhenoscoringError> {
        let records = read_phenotype_frequencies(reader)?;
        let rows: Vec<(String, PhenotypeFrequencyRow)> = records
            .into_iter()
            .map(|r| {
                (
                    r.phenotype.clone(),
                    PhenotypeFrequencyRow {
                        phenotype: r.phenotype,
                        frequency: r.frequency,
                    },
                )
            })
            .collect();
        let count = rows.len();
        self.store.put_batch(Table::PhenotypeFrequency, &rows)?;
        info!("ingested {count} phenotype frequencies");
        Ok(count)
    }

    pub fn ingest_model_descriptions(&self, reader: impl Read) -> Result<usize, PhenoscoringError> {
        let records = read_model_descriptions(reader)?;
        let rows: Vec<(String, ModelDescriptionRow)> = records
            .into_iter()
            .map(|r| {
                (
                    r.id.clone(),
                    ModelDescriptionRow {
                        id: r.id,
                        category: r.category,
                        description: r.description,
                        timestamp: r.timestamp,
                    },
                )
            })
            .collect();
        let count = rows.len();
        self.store.put_batch(Table::ModelDescription, &rows)?;
        info!("ingested {count} model descriptions");
        Ok(count)
    }

    pub fn ingest_model_phenotypes(&self, reader: impl Read) -> Result<usize, PhenoscoringError> {
        let records = read_model_phenotypes(reader)?;
        let rows: Vec<(String, ModelPhenotypeRow)> = records
            .into_iter()
            .map(|r| {
                let key = composite_key(&[&r.id, &r.phenotype, &r.timestamp]);
                (
                    key,
                    ModelPhenotypeRow {
                        id: r.id,
                        phenotype: r.phenotype,
                        timestamp: r.timestamp,
                        value: r.value,
                        tpr: r.tpr,
                        fpr: r.fpr,
                    },
                )
            })
            .collect();
        let count = rows.len();
        self.store.put_batch(Table::ModelPhenotype, &rows)?;
        info!("ingested {count} model phenotype observations");
        Ok(count)
    }

    // --- reference build ------------------------------------------------

    /// Impute every ingested reference to a complete profile, derive
    /// specificity against its k nearest neighbors, and persist priors,
    /// complete phenotypes, and ranked neighbor lists.
    pub fn build_references(&self, ontology: &Ontology) -> Result<usize, PhenoscoringError> {
        let feature_priors = self.phenotype_priors(ontology)?;
        let feature_ids = ontology.ids(false);

        let concise: Vec<(String, ReferenceConcisePhenotypeRow)> =
            self.store.scan_all(Table::ReferenceConcisePhenotype)?;
        let mut by_reference: HashMap<String, Vec<(String, f64)>> = HashMap::new();
        for (_, row) in concise {
            by_reference.entry(row.id).or_default().push((row.phenotype, row.value));
        }
        by_reference.entry(NULL_REFERENCE.to_string()).or_default();

        let mut reference_ids: Vec<String> = by_reference.keys().cloned().collect();
        reference_ids.sort();

        let reference_priors = self.reference_priors(&reference_ids);
        self.persist_reference_priors(&reference_priors)?;

        let missing_factor = self.config.reference_missing_factor.min(1.0);
        let mut refset = ReferenceSet::new(&reference_priors, &feature_ids, Some(&feature_priors));
        refset.learn_obo(ontology)?;

        for reference in &reference_ids {
            let mut representation = Representation::new(reference.clone());
            for (phenotype, value) in &by_reference[reference] {
                representation.set(phenotype.clone(), *value);
            }
            representation.impute(ontology, &feature_priors, None)?;
            apply_missing_factor(&mut representation, &feature_priors, reference, missing_factor);
            refset.add(&representation)?;
        }
        refset.prep();

        let specificity =
            derive_specificity(&refset, &feature_priors, self.config.reference_neighbors_k)?;

        let complete_rows: Vec<(String, ReferenceCompletePhenotypeRow)> = specificity
            .phenotypes
            .iter()
            .map(|p| {
                let key = composite_key(&[&p.reference, &p.phenotype]);
                (
                    key,
                    ReferenceCompletePhenotypeRow {
                        id: p.reference.clone(),
                        phenotype: p.phenotype.clone(),
                        value: p.value,
                        specific_value: p.specific,
                    },
                )
            })
            .collect();
        let neighbor_rows: Vec<(String, ReferenceNeighborRow)> = specificity
            .neighbors
            .iter()
            .map(|n| {
                let key = composite_key(&[&n.reference, &format!("{:04}", n.rank)]);
                (
                    key,
                    ReferenceNeighborRow {
                        id: n.reference.clone(),
                        neighbor: n.neighbor.clone(),
                        rank: n.rank,
                    },
                )
            })
            .collect();

        info!(
            "built {} references, {} complete phenotype rows, {} neighbor rows",
            reference_ids.len(),
            complete_rows.len(),
            neighbor_rows.len()
        );
        self.store.put_batch(Table::ReferenceCompletePhenotype, &complete_rows)?;
        self.store.put_batch(Table::ReferenceNeighbors, &neighbor_rows)?;

        Ok(reference_ids.len())
    }

    /// Priors for every reference encountered, the `"null"` reference
    /// included. Each non-null reference gets [`PhenoscoringConfig::prior`];
    /// if that would push the total past 1.0, every non-null prior is
    /// rescaled down to leave room for `"null"` at its configured prior.
    fn reference_priors(&self, reference_ids: &[String]) -> HashMap<String, f64> {
        let base_prior = self.config.prior;
        let non_null: Vec<&String> =
            reference_ids.iter().filter(|id| id.as_str() != NULL_REFERENCE).collect();
        let total = base_prior * non_null.len() as f64;

        let per_reference = if total >= 1.0 && !non_null.is_empty() {
            let scaled = (1.0 - base_prior) / non_null.len() as f64;
            warn!(
                "{} references at prior {base_prior} sum to {total:.6}, which is >= 1.0; \
                 rescaling each to {scaled:.6} to leave room for the null reference",
                non_null.len()
            );
            scaled
        } else {
            base_prior
        };

        let mut priors: HashMap<String, f64> =
            non_null.iter().map(|id| ((*id).clone(), per_reference)).collect();
        let null_prior = (1.0 - per_reference * non_null.len() as f64).max(base_prior);
        priors.insert(NULL_REFERENCE.to_string(), null_prior);
        priors
    }

    fn persist_reference_priors(&self, priors: &HashMap<String, f64>) -> Result<(), PhenoscoringError> {
        let rows: Vec<(String, ReferencePriorRow)> = priors
            .iter()
            .map(|(id, value)| (id.clone(), ReferencePriorRow { id: id.clone(), value: *value }))
            .collect();
        self.store.put_batch(Table::ReferencePriors, &rows)?;
        Ok(())
    }

    /// Background prior for every valid ontology term: [`PhenoscoringConfig::prior`]
    /// by default, overridden by any ingested phenotype frequency.
    fn phenotype_priors(&self, ontology: &Ontology) -> Result<HashMap<String, f64>, PhenoscoringError> {
        let mut priors: HashMap<String, f64> =
            ontology.ids(false).into_iter().map(|id| (id, self.config.prior)).collect();
        let rows: Vec<(String, PhenotypeFrequencyRow)> = self.store.scan_all(Table::PhenotypeFrequency)?;
        for (_, row) in rows {
            priors.insert(row.phenotype, row.frequency);
        }
        Ok(priors)
    }

    // --- model representations ------------------------------------------

    /// Build one [`Representation`] per model from its raw phenotype
    /// observations, canonicalizing obsolete phenotype ids and merging
    /// repeated observations of the same phenotype through a
    /// [`LeanInferenceChain`] seeded at an uninformative prior.
    ///
    /// An observation naming a phenotype with no current term and no
    /// replacement (a stale phenotype) is dropped and logged at debug
    /// level rather than failing the whole build.
    pub fn model_representations(
        &self,
        ontology: &Ontology,
    ) -> Result<HashMap<String, Representation>, PhenoscoringError> {
        let rows: Vec<(String, ModelPhenotypeRow)> = self.store.scan_all(Table::ModelPhenotype)?;

        let mut observations: HashMap<(String, String), Vec<(f64, f64, f64)>> = HashMap::new();
        let mut stale = 0usize;
        for (_, row) in rows {
            let Some(canonical) = self.canonicalize_phenotype(ontology, &row.phenotype)? else {
                stale += 1;
                debug!(
                    "dropping stale phenotype '{}' observed for model '{}'",
                    row.phenotype, row.id
                );
                continue;
            };
            observations.entry((row.id, canonical)).or_default().push((row.value, row.tpr, row.fpr));
        }
        if stale > 0 {
            debug!("dropped {stale} stale phenotype observations while building model representations");
        }

        let mut models: HashMap<String, Representation> = HashMap::new();
        for ((model_id, phenotype), datapoints) in observations {
            let mut chain = LeanInferenceChain::new(0.5);
            for (value, tpr, fpr) in datapoints {
                if value >= 0.5 {
                    chain.add(tpr, fpr);
                } else {
                    chain.add(1.0 - fpr, 1.0 - tpr);
                }
            }
            let merged = chain.evaluate();
            models
                .entry(model_id.clone())
                .or_insert_with(|| Representation::new(model_id))
                .set(phenotype, merged);
        }

        info!("built {} model representations", models.len());
        Ok(models)
    }

    /// Resolve a raw phenotype id to a currently-valid ontology term:
    /// directly, through an alt-id, or (for an obsolete term) through its
    /// `replaced_by` successor. `None` means the ontology doesn't
    /// recognize the id at all, or it names an obsolete term with no
    /// valid replacement.
    fn canonicalize_phenotype(
        &self,
        ontology: &Ontology,
        phenotype: &str,
    ) -> Result<Option<String>, PhenoscoringError> {
        let Some(canonical) = ontology.canonical(phenotype) else {
            return Ok(None);
        };
        if ontology.valid(&canonical) {
            return Ok(Some(canonical));
        }
        match ontology.replaced_by(&canonical)? {
            Some(replacement) if ontology.valid(&replacement) => Ok(Some(replacement)),
            _ => Ok(None),
        }
    }

    // --- compute ---------------------------------------------------------

    /// Reconstruct the general and specific reference sets from persisted
    /// priors and complete phenotypes, restoring rows the compactness
    /// rule omitted back to their `"null"` baseline.
    fn load_reference_sets(
        &self,
        ontology: &Ontology,
    ) -> Result<(ReferenceSet, ReferenceSet), PhenoscoringError> {
        let prior_rows: Vec<(String, ReferencePriorRow)> = self.store.scan_all(Table::ReferencePriors)?;
        let priors: HashMap<String, f64> =
            prior_rows.into_iter().map(|(_, row)| (row.id, row.value)).collect();

        let feature_priors = self.phenotype_priors(ontology)?;
        let feature_ids = ontology.ids(false);

        let complete_rows: Vec<(String, ReferenceCompletePhenotypeRow)> =
            self.store.scan_all(Table::ReferenceCompletePhenotype)?;
        let mut by_reference: HashMap<String, Vec<(String, f64, f64)>> = HashMap::new();
        for (_, row) in complete_rows {
            by_reference.entry(row.id).or_default().push((row.phenotype, row.value, row.specific_value));
        }

        let null_rows = by_reference.get(NULL_REFERENCE).cloned().unwrap_or_default();
        let null_general: HashMap<String, f64> =
            null_rows.iter().map(|(p, v, _)| (p.clone(), *v)).collect();
        let null_specific: HashMap<String, f64> =
            null_rows.iter().map(|(p, _, s)| (p.clone(), *s)).collect();

        let mut general_refset = ReferenceSet::new(&priors, &feature_ids, Some(&feature_priors));
        let mut specific_refset = ReferenceSet::new(&priors, &feature_ids, Some(&feature_priors));
        general_refset.learn_obo(ontology)?;
        specific_refset.learn_obo(ontology)?;

        let mut reference_ids: Vec<&String> = priors.keys().collect();
        reference_ids.sort();

        for reference in reference_ids {
            let mut general = Representation::new(reference.clone());
            general.defaults(&null_general);
            let mut specific = Representation::new(reference.clone());
            specific.defaults(&null_specific);

            if let Some(rows) = by_reference.get(reference) {
                for (phenotype, value, specific_value) in rows {
                    general.set(phenotype.clone(), *value);
                    specific.set(phenotype.clone(), *specific_value);
                }
            }

            general_refset.add(&general)?;
            specific_refset.add(&specific)?;
        }
        general_refset.prep();
        specific_refset.prep();

        Ok((general_refset, specific_refset))
    }

    /// Score every model against every reference using the scheduler's
    /// packet partitioning, persisting the rows that clear
    /// `min_inference`/`min_enrichment`.
    pub fn compute(&self, ontology: &Ontology, timestamp: &str) -> Result<usize, PhenoscoringError> {
        let (general, specific) = self.load_reference_sets(ontology)?;
        let models = self.model_representations(ontology)?;

        let references = general.names().to_vec();
        let model_ids: Vec<String> = models.keys().cloned().collect();

        let packets = plan(&references, &model_ids, self.config.partition_size);
        info!(
            "scheduling {} packets over {} references x {} models",
            packets.len(),
            references.len(),
            model_ids.len()
        );

        let rows = run_packets(
            packets,
            &general,
            &specific,
            &models,
            self.config.fp_penalty,
            self.config.min_inference,
            self.config.min_enrichment,
            timestamp,
            self.config.cores,
        )?;

        let persisted: Vec<(String, ModelScoreRow)> = rows
            .into_iter()
            .map(|row| (composite_key(&[&row.model, &row.reference, &row.timestamp]), row))
            .collect();
        info!("persisting {} model score rows", persisted.len());
        self.store.put_batch(Table::ModelScore, &persisted)?;

        Ok(persisted.len())
    }
}

/// Penalize every feature value still sitting at its imputed prior
/// (never explicitly observed) by `missing_factor`, matching the
/// original reference-build step that discounts evidence-free features.
fn apply_missing_factor(
    representation: &mut Representation,
    feature_priors: &HashMap<String, f64>,
    reference: &str,
    missing_factor: f64,
) {
    if missing_factor >= 1.0 {
        return;
    }
    for (feature, &prior) in feature_priors {
        if representation.get(feature) == Some(prior) && (prior < 1.0 || reference == NULL_REFERENCE) {
            representation.set(feature.clone(), prior * missing_factor);
        }
    }
}
