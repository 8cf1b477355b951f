use std::path::Path;

use redb::{Database, ReadableDatabase, TableDefinition};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::PersistenceError;

/// One of the eight tables in a Phenoscoring database. Each variant maps
/// to its own `redb` table, keyed by an ordered composite string built
/// from the row's natural identifying fields (see `row.rs` callers for
/// how each key is assembled) and valued by the row JSON-encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    ModelDescription,
    ModelPhenotype,
    ModelScore,
    ReferenceNeighbors,
    ReferencePriors,
    ReferenceConcisePhenotype,
    ReferenceCompletePhenotype,
    PhenotypeFrequency,
}

impl Table {
    fn definition(self) -> TableDefinition<'static, &'static str, &'static [u8]> {
        match self {
            Table::ModelDescription => TableDefinition::new("model_description"),
            Table::ModelPhenotype => TableDefinition::new("model_phenotype"),
            Table::ModelScore => TableDefinition::new("model_score"),
            Table::ReferenceNeighbors => TableDefinition::new("reference_neighbors"),
            Table::ReferencePriors => TableDefinition::new("reference_priors"),
            Table::ReferenceConcisePhenotype => TableDefinition::new("reference_concise_phenotype"),
            Table::ReferenceCompletePhenotype => {
                TableDefinition::new("reference_complete_phenotype")
            }
            Table::PhenotypeFrequency => TableDefinition::new("phenotype_frequency"),
        }
    }

    const ALL: [Table; 8] = [
        Table::ModelDescription,
        Table::ModelPhenotype,
        Table::ModelScore,
        Table::ReferenceNeighbors,
        Table::ReferencePriors,
        Table::ReferenceConcisePhenotype,
        Table::ReferenceCompletePhenotype,
        Table::PhenotypeFrequency,
    ];
}

/// Build an ordered composite key by joining `parts` on a NUL byte,
/// which sorts before every printable character so rows group correctly
/// under a common prefix (e.g. every phenotype for one reference).
pub fn composite_key(parts: &[&str]) -> String {
    parts.join("\u{0}")
}

/// Abstract ordered key/value access to the eight Phenoscoring tables.
///
/// A single `put`/`scan` pair of methods, generic over the row type,
/// stands in for eight repetitive per-table methods: callers pick the
/// `Table` and supply an already-encoded composite key (see
/// [`composite_key`]).
pub trait Store {
    fn put<T: Serialize>(&self, table: Table, key: &str, row: &T) -> Result<(), PersistenceError>;

    fn put_batch<T: Serialize>(
        &self,
        table: Table,
        rows: &[(String, T)],
    ) -> Result<(), PersistenceError>;

    fn scan<T: DeserializeOwned>(
        &self,
        table: Table,
        prefix: &str,
    ) -> Result<Vec<(String, T)>, PersistenceError>;

    fn scan_all<T: DeserializeOwned>(&self, table: Table) -> Result<Vec<(String, T)>, PersistenceError> {
        self.scan(table, "")
    }
}

/// A `Store` backed by an on-disk `redb` database.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let db = Database::create(path)?;
        let write_txn = db.begin_write()?;
        for table in Table::ALL {
            write_txn.open_table(table.definition())?;
        }
        write_txn.commit()?;
        Ok(RedbStore { db })
    }
}

impl Store for RedbStore {
    fn put<T: Serialize>(&self, table: Table, key: &str, row: &T) -> Result<(), PersistenceError> {
        let encoded = serde_json::to_vec(row)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut handle = write_txn.open_table(table.definition())?;
            handle.insert(key, encoded.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn put_batch<T: Serialize>(
        &self,
        table: Table,
        rows: &[(String, T)],
    ) -> Result<(), PersistenceError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut handle = write_txn.open_table(table.definition())?;
            for (key, row) in rows {
                let encoded = serde_json::to_vec(row)?;
                handle.insert(key.as_str(), encoded.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    fn scan<T: DeserializeOwned>(
        &self,
        table: Table,
        prefix: &str,
    ) -> Result<Vec<(String, T)>, PersistenceError> {
        let read_txn = self.db.begin_read()?;
        let handle = read_txn.open_table(table.definition())?;
        let mut result = Vec::new();
        for entry in handle.iter()? {
            let (key, value) = entry?;
            let key = key.value();
            if !key.starts_with(prefix) {
                continue;
            }
            let row: T = serde_json::from_slice(value.value())?;
            result.push((key.to_string(), row));
        }
        Ok(result)
    }
}
