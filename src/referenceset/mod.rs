mod comparison_code;
mod distance;
mod error;
mod reference_set;
mod specificity;

pub use comparison_code::{comparison_code, ComparisonCode};
pub use error::ReferenceSetError;
pub use reference_set::{DatumAnnotation, InferenceOutcome, ReferenceSet, VerboseInferenceChain};
pub use specificity::{derive_specificity, ReferenceNeighbor, SpecificPhenotype, SpecificityResult};
