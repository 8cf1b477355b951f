use serde::{Deserialize, Serialize};

/// One row of the `model_description` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptionRow {
    pub id: String,
    pub category: String,
    pub description: String,
    pub timestamp: String,
}

/// One row of the `model_phenotype` table: a single observed phenotype
/// for a model, with the sensitivity/specificity of the assay that
/// produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPhenotypeRow {
    pub id: String,
    pub phenotype: String,
    pub timestamp: String,
    pub value: f64,
    pub tpr: f64,
    pub fpr: f64,
}

/// One row of the `model_score` table: the general/specific posteriors
/// for a model against one reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelScoreRow {
    pub model: String,
    pub reference: String,
    pub timestamp: String,
    pub general: f64,
    pub specific: f64,
}

/// One row of the `reference_neighbors` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceNeighborRow {
    pub id: String,
    pub neighbor: String,
    pub rank: u32,
}

/// One row of the `reference_priors` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencePriorRow {
    pub id: String,
    pub value: f64,
}

/// One row of the `reference_concise_phenotype` table: raw, as-ingested
/// reference phenotype data, prior to imputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceConcisePhenotypeRow {
    pub id: String,
    pub phenotype: String,
    pub value: f64,
}

/// One row of the `reference_complete_phenotype` table: the imputed
/// value plus the derived specificity value for one reference/phenotype
/// pair (see [`crate::referenceset::derive_specificity`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceCompletePhenotypeRow {
    pub id: String,
    pub phenotype: String,
    pub value: f64,
    pub specific_value: f64,
}

/// One row of the `phenotype_frequency` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhenotypeFrequencyRow {
    pub phenotype: String,
    pub frequency: f64,
}
