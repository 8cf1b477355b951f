use thiserror::Error;

use crate::ingest::IngestError;
use crate::ontology::OntologyError;
use crate::persistence::PersistenceError;
use crate::referenceset::ReferenceSetError;
use crate::scheduler::RunnerError;

/// Errors that can surface from a build, update, or compute run. Wraps
/// every per-module error via `#[from]`, so `?` composes across module
/// boundaries without manual conversion.
#[derive(Debug, Error)]
pub enum PhenoscoringError {
    #[error("ontology error: {0}")]
    Ontology(#[from] OntologyError),

    #[error("ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("reference set error: {0}")]
    ReferenceSet(#[from] ReferenceSetError),

    #[error("scheduler error: {0}")]
    Scheduler(#[from] RunnerError),

    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown model '{0}'")]
    UnknownModel(String),
}
