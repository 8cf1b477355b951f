mod error;
mod ontology;
mod parser;
mod term;

pub use error::OntologyError;
pub use ontology::Ontology;
pub use parser::parse_obo;
pub use term::{RelationKind, Term};
