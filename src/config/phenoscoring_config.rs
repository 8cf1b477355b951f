use serde::{Deserialize, Serialize};

fn default_reference_neighbors_k() -> usize {
    5
}

fn default_fp_penalty() -> f64 {
    0.8
}

fn default_prior() -> f64 {
    0.001
}

fn default_min_inference() -> f64 {
    0.001
}

fn default_min_enrichment() -> f64 {
    100.0
}

fn default_cores() -> usize {
    1
}

fn default_partition_size() -> usize {
    512
}

fn default_reference_missing_factor() -> f64 {
    1.0
}

/// Settings controlling one Phenoscoring run: where the data lives, and
/// the thresholds/weights that shape inference and persistence.
///
/// Defaults mirror the original implementation's `PhenoscoringConfig`
/// class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhenoscoringConfig {
    /// Path to the persistence database.
    pub db: String,
    /// Path to the ontology OBO file.
    pub obo: String,
    /// Path to the phenotype background-frequency TSV file.
    pub phenotype_frequencies: String,

    /// Number of nearest neighbors used when deriving specificity profiles.
    #[serde(default = "default_reference_neighbors_k")]
    pub reference_neighbors_k: usize,

    /// Weight applied to the ancestor-enrichment term in false-positive
    /// evidence (`beta = tanh(fp_penalty * log10(ancestor_bg / bg))`).
    #[serde(default = "default_fp_penalty")]
    pub fp_penalty: f64,

    /// Default prior probability assigned to a reference that has no
    /// other information (and to the implicit `null` reference).
    #[serde(default = "default_prior")]
    pub prior: f64,

    /// Minimum `general` inference score required to persist a model
    /// score row.
    #[serde(default = "default_min_inference")]
    pub min_inference: f64,

    /// Minimum `general / reference_prior` ratio required to persist a
    /// model score row, as an alternative to `min_inference`.
    #[serde(default = "default_min_enrichment")]
    pub min_enrichment: f64,

    /// Number of worker threads used by the scheduler's thread pool.
    #[serde(default = "default_cores")]
    pub cores: usize,

    /// Maximum number of references or models grouped into one packet.
    #[serde(default = "default_partition_size")]
    pub partition_size: usize,

    /// Multiplier (in `[0, 1]`) applied to a reference's feature value
    /// when that value was never explicitly observed, penalizing
    /// references built mostly from imputation.
    #[serde(default = "default_reference_missing_factor")]
    pub reference_missing_factor: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_implementation() {
        let json = r#"{"db":"d","obo":"o","phenotype_frequencies":"f"}"#;
        let config: PhenoscoringConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.reference_neighbors_k, 5);
        assert_eq!(config.fp_penalty, 0.8);
        assert_eq!(config.prior, 0.001);
        assert_eq!(config.min_inference, 0.001);
        assert_eq!(config.min_enrichment, 100.0);
        assert_eq!(config.cores, 1);
        assert_eq!(config.partition_size, 512);
        assert_eq!(config.reference_missing_factor, 1.0);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let json = r#"{"db":"d","obo":"o","phenotype_frequencies":"f","cores":8}"#;
        let config: PhenoscoringConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.cores, 8);
    }
}
