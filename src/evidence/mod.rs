mod chain;
mod math;

pub use chain::{InferenceChain, InferenceDatum, LeanInferenceChain};
pub use math::{estimate_update, estimate_update_ratio, evidence_update, update_single, update_single_ratio};
