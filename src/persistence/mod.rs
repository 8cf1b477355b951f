mod error;
mod row;
mod store;

pub use error::PersistenceError;
pub use row::{
    ModelDescriptionRow, ModelPhenotypeRow, ModelScoreRow, PhenotypeFrequencyRow,
    ReferenceCompletePhenotypeRow, ReferenceConcisePhenotypeRow, ReferenceNeighborRow,
    ReferencePriorRow,
};
pub use store::{composite_key, RedbStore, Store, Table};
