use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error(transparent)]
    Database(#[from] redb::DatabaseError),

    #[error(transparent)]
    Transaction(#[from] redb::TransactionError),

    #[error(transparent)]
    Table(#[from] redb::TableError),

    #[error(transparent)]
    Storage(#[from] redb::StorageError),

    #[error(transparent)]
    Commit(#[from] redb::CommitError),

    #[error("failed to (de)serialize row: {0}")]
    Encoding(#[from] serde_json::Error),
}
