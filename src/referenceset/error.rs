use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReferenceSetError {
    #[error("unknown reference '{0}'")]
    UnknownReference(String),

    #[error("unknown feature '{0}'")]
    UnknownFeature(String),

    #[error("representation '{0}' is not compatible with this reference set")]
    IncompatibleRepresentation(String),

    #[error("representation has no name")]
    UnnamedRepresentation,

    #[error(transparent)]
    Ontology(#[from] crate::ontology::OntologyError),
}
