use serde::{Deserialize, Serialize};

use super::math::evidence_update;

/// One `(tpr, fpr)` contribution to an inference chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InferenceDatum {
    pub tpr: f64,
    pub fpr: f64,
}

impl InferenceDatum {
    pub fn new(tpr: f64, fpr: f64) -> Self {
        InferenceDatum { tpr, fpr }
    }

    fn rounded(&self, decimal_places: i32) -> Self {
        let scale = 10f64.powi(decimal_places);
        InferenceDatum {
            tpr: (self.tpr * scale).round() / scale,
            fpr: (self.fpr * scale).round() / scale,
        }
    }
}

/// A verbose evidence chain: keeps every datum alongside the computed
/// posterior, suitable for persistence and audit.
///
/// See [`LeanInferenceChain`] for a variant that drops the per-datum
/// bookkeeping once the posterior is no longer needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceChain {
    pub prior: f64,
    pub data: Vec<InferenceDatum>,
    pub posterior: Option<f64>,
}

impl InferenceChain {
    pub fn new(prior: f64) -> Self {
        InferenceChain {
            prior,
            data: Vec::new(),
            posterior: None,
        }
    }

    pub fn add(&mut self, datum: InferenceDatum) -> &mut Self {
        self.data.push(datum);
        self
    }

    pub fn evaluate(&mut self) -> f64 {
        let tpr: Vec<f64> = self.data.iter().map(|d| d.tpr).collect();
        let fpr: Vec<f64> = self.data.iter().map(|d| d.fpr).collect();
        let posterior = evidence_update(self.prior, &tpr, &fpr);
        self.posterior = Some(posterior);
        posterior
    }

    /// A copy with every numeric field rounded, and `data` dropped if
    /// `with_data` is false; used when serializing for persistence.
    pub fn rounded(&self, decimal_places: i32, with_data: bool) -> InferenceChain {
        let scale = 10f64.powi(decimal_places);
        InferenceChain {
            prior: (self.prior * scale).round() / scale,
            data: if with_data {
                self.data.iter().map(|d| d.rounded(decimal_places)).collect()
            } else {
                Vec::new()
            },
            posterior: self
                .posterior
                .map(|p| (p * scale).round() / scale),
        }
    }
}

/// A minimal evidence chain that tracks only the `tpr`/`fpr` lists needed
/// to evaluate a posterior, without per-datum bookkeeping. Preferred for
/// the hot inference loop (see the scheduler, which evaluates one of
/// these per reference/model/feature triple).
#[derive(Debug, Clone)]
pub struct LeanInferenceChain {
    pub prior: f64,
    tpr: Vec<f64>,
    fpr: Vec<f64>,
}

impl LeanInferenceChain {
    pub fn new(prior: f64) -> Self {
        LeanInferenceChain {
            prior,
            tpr: Vec::new(),
            fpr: Vec::new(),
        }
    }

    /// Equal `tpr`/`fpr` pairs are no-ops and are not recorded, matching
    /// [`super::math::update_single`]'s identity case.
    pub fn add(&mut self, tpr: f64, fpr: f64) -> &mut Self {
        if tpr != fpr {
            self.tpr.push(tpr);
            self.fpr.push(fpr);
        }
        self
    }

    pub fn evaluate(&self) -> f64 {
        evidence_update(self.prior, &self.tpr, &self.fpr)
    }
}
