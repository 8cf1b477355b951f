//! TSV readers for the four flat-file formats Phenoscoring ingests:
//! concise reference phenotypes, model descriptions, model phenotype
//! observations, and phenotype background frequencies.
//!
//! All four are tab-delimited with a header row, matching the format the
//! original Python tooling consumed via `csv.DictReader`.

use std::io::Read;

use serde::Deserialize;

use super::error::IngestError;

fn tsv_reader(reader: impl Read) -> csv::Reader<impl Read> {
    csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .trim(csv::Trim::Fields)
        .from_reader(reader)
}

/// One row of a concise (raw, not-yet-imputed) reference phenotype file:
/// `id`, `phenotype`, `value`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConciseReferencePhenotypeRecord {
    pub id: String,
    pub phenotype: String,
    pub value: f64,
}

pub fn read_concise_reference_phenotypes(
    reader: impl Read,
) -> Result<Vec<ConciseReferencePhenotypeRecord>, IngestError> {
    let mut rdr = tsv_reader(reader);
    rdr.deserialize()
        .map(|row| row.map_err(IngestError::from))
        .collect()
}

/// One row of a model description file: `id`, `category`, `description`,
/// `timestamp`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelDescriptionRecord {
    pub id: String,
    pub category: String,
    pub description: String,
    pub timestamp: String,
}

pub fn read_model_descriptions(
    reader: impl Read,
) -> Result<Vec<ModelDescriptionRecord>, IngestError> {
    let mut rdr = tsv_reader(reader);
    rdr.deserialize()
        .map(|row| row.map_err(IngestError::from))
        .collect()
}

/// One row of a model phenotype observation file: `id`, `phenotype`,
/// `value`, `TPR`, `FPR`, `timestamp`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelPhenotypeRecord {
    pub id: String,
    pub phenotype: String,
    pub value: f64,
    #[serde(rename = "TPR")]
    pub tpr: f64,
    #[serde(rename = "FPR")]
    pub fpr: f64,
    pub timestamp: String,
}

pub fn read_model_phenotypes(reader: impl Read) -> Result<Vec<ModelPhenotypeRecord>, IngestError> {
    let mut rdr = tsv_reader(reader);
    rdr.deserialize()
        .map(|row| row.map_err(IngestError::from))
        .collect()
}

/// One row of a phenotype background frequency file: `phenotype`,
/// `frequency`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PhenotypeFrequencyRecord {
    pub phenotype: String,
    pub frequency: f64,
}

pub fn read_phenotype_frequencies(
    reader: impl Read,
) -> Result<Vec<PhenotypeFrequencyRecord>, IngestError> {
    let mut rdr = tsv_reader(reader);
    rdr.deserialize()
        .map(|row| row.map_err(IngestError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_concise_reference_phenotypes() {
        let data = "id\tphenotype\tvalue\nrefA\tHP:0001\t0.9\n";
        let rows = read_concise_reference_phenotypes(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "refA");
        assert_eq!(rows[0].value, 0.9);
    }

    #[test]
    fn reads_model_descriptions() {
        let data = "id\tcategory\tdescription\ttimestamp\nm1\tmouse\t{}\t2024-01-01\n";
        let rows = read_model_descriptions(data.as_bytes()).unwrap();
        assert_eq!(rows[0].category, "mouse");
    }

    #[test]
    fn reads_model_phenotypes_with_tpr_fpr_header_casing() {
        let data = "id\tphenotype\tvalue\tTPR\tFPR\ttimestamp\nm1\tHP:0001\t1.0\t0.8\t0.05\t2024-01-01\n";
        let rows = read_model_phenotypes(data.as_bytes()).unwrap();
        assert_eq!(rows[0].tpr, 0.8);
        assert_eq!(rows[0].fpr, 0.05);
    }

    #[test]
    fn reads_phenotype_frequencies() {
        let data = "phenotype\tfrequency\nHP:0001\t0.02\n";
        let rows = read_phenotype_frequencies(data.as_bytes()).unwrap();
        assert_eq!(rows[0].phenotype, "HP:0001");
        assert_eq!(rows[0].frequency, 0.02);
    }

    #[test]
    fn missing_column_is_a_csv_error() {
        let data = "id\tphenotype\nrefA\tHP:0001\n";
        let err = read_concise_reference_phenotypes(data.as_bytes()).unwrap_err();
        assert!(matches!(err, IngestError::Csv(_)));
    }
}
