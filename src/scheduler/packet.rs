use std::collections::HashMap;

use thiserror::Error;

use crate::persistence::ModelScoreRow;
use crate::referenceset::{ReferenceSet, ReferenceSetError};
use crate::representation::Representation;

use super::plan::PacketPlan;

#[derive(Debug, Error)]
pub enum PacketError {
    #[error(transparent)]
    ReferenceSet(#[from] ReferenceSetError),

    #[error("reference '{0}' has no known prior")]
    MissingReferencePrior(String),
}

/// A self-contained unit of scoring work: score every model in
/// `plan.models` against every reference in `plan.references`, using
/// both a "general" and a "specific" reference set, and keep only rows
/// that pass the persistence thresholds.
///
/// Thresholds and the false-positive penalty are captured by value at
/// construction so a packet can run independently of
/// [`crate::config::PhenoscoringConfig`] (useful for running packets
/// concurrently without sharing config access across threads).
pub struct ComputePacket<'a> {
    pub plan: PacketPlan,
    general_refset: &'a ReferenceSet,
    specific_refset: &'a ReferenceSet,
    models: &'a HashMap<String, Representation>,
    fp_penalty: f64,
    min_inference: f64,
    min_enrichment: f64,
    timestamp: String,
}

impl<'a> ComputePacket<'a> {
    pub fn new(
        plan: PacketPlan,
        general_refset: &'a ReferenceSet,
        specific_refset: &'a ReferenceSet,
        models: &'a HashMap<String, Representation>,
        fp_penalty: f64,
        min_inference: f64,
        min_enrichment: f64,
        timestamp: impl Into<String>,
    ) -> Self {
        ComputePacket {
            plan,
            general_refset,
            specific_refset,
            models,
            fp_penalty,
            min_inference,
            min_enrichment,
            timestamp: timestamp.into(),
        }
    }

    /// Run inference for this packet's model/reference slice, returning
    /// only the score rows that clear `min_inference` or `min_enrichment`.
    pub fn run(&self) -> Result<Vec<ModelScoreRow>, PacketError> {
        let references: Vec<String> = self.plan.references.iter().cloned().collect();
        let mut rows = Vec::new();

        for model_id in &self.plan.models {
            let Some(model) = self.models.get(model_id) else {
                continue;
            };
            let general = self
                .general_refset
                .inference(model, Some(&references), self.fp_penalty)?;
            let specific = self
                .specific_refset
                .inference(model, Some(&references), self.fp_penalty)?;

            for reference in &references {
                let g = general[reference];
                let s = specific[reference];
                let bg = self
                    .general_refset
                    .reference_prior(reference)
                    .ok_or_else(|| PacketError::MissingReferencePrior(reference.clone()))?;

                let passes_absolute = g > self.min_inference;
                let passes_ratio = (g / bg) > self.min_enrichment;
                if !passes_absolute && !passes_ratio {
                    continue;
                }

                rows.push(ModelScoreRow {
                    model: model_id.clone(),
                    reference: reference.clone(),
                    timestamp: self.timestamp.clone(),
                    general: g,
                    specific: s,
                });
            }
        }

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn build_refset() -> ReferenceSet {
        let priors = HashMap::from([("refA".to_string(), 0.5), ("refB".to_string(), 0.5)]);
        let ids = vec!["f1".to_string()];
        let mut rs = ReferenceSet::new(&priors, &ids, None);
        let mut a = Representation::new("refA");
        a.set("f1", 0.9);
        rs.add(&a).unwrap();
        let mut b = Representation::new("refB");
        b.set("f1", 0.1);
        rs.add(&b).unwrap();
        rs.prep();
        rs
    }

    #[test]
    fn packet_keeps_only_rows_above_threshold() {
        let general = build_refset();
        let specific = build_refset();
        let mut model = Representation::unnamed();
        model.set("f1", 0.9);
        let models = HashMap::from([("m1".to_string(), model)]);

        let plan = PacketPlan {
            label: "test".to_string(),
            references: HashSet::from(["refA".to_string(), "refB".to_string()]),
            models: HashSet::from(["m1".to_string()]),
        };

        let packet = ComputePacket::new(plan, &general, &specific, &models, 0.8, 0.9, f64::INFINITY, "t0");
        let rows = packet.run().unwrap();
        // only refA should pass a very high min_inference threshold
        assert!(rows.iter().all(|r| r.reference == "refA"));
    }
}
