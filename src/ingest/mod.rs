mod error;
mod readers;

pub use error::IngestError;
pub use readers::{
    read_concise_reference_phenotypes, read_model_descriptions, read_model_phenotypes,
    read_phenotype_frequencies, ConciseReferencePhenotypeRecord, ModelDescriptionRecord,
    ModelPhenotypeRecord, PhenotypeFrequencyRecord,
};
