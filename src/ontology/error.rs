use thiserror::Error;

/// Errors raised while parsing or querying an [`crate::ontology::Ontology`].
#[derive(Debug, Error)]
pub enum OntologyError {
    #[error("unknown term '{0}'")]
    UnknownTerm(String),

    #[error("malformed ontology record: {0}")]
    InvalidOntologyRecord(String),

    #[error("'replaced_by' on non-obsolete term '{0}'")]
    InvalidObsoleteReplacement(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
