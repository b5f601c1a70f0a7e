use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{Error, Result},
    sql::{
        schema::Table,
        types::{Row, Value},
    },
    storage::engine::Engine as StorageEngine,
};

use super::{Engine, Transaction};

/// Key-value store backed SQL engine
pub struct KVEngine<E: StorageEngine> {
    pub kv: Arc<Mutex<E>>,
}

impl<E: StorageEngine> Clone for KVEngine<E> {
    fn clone(&self) -> Self {
        Self {
            kv: self.kv.clone(),
        }
    }
}

impl<E: StorageEngine> KVEngine<E> {
    pub fn new(engine: E) -> Self {
        Self {
            kv: Arc::new(Mutex::new(engine)),
        }
    }
}

impl<E: StorageEngine + 'static> Engine for KVEngine<E> {
    type Transaction = KVTransaction<E>;

    fn begin(&self) -> Result<Self::Transaction> {
        Ok(KVTransaction::new(self.kv.clone()))
    }
}

/// Key-value transaction
///
/// Writes are buffered locally and applied to the shared storage engine
/// on commit; rollback drops them. Reads see the transaction's own writes.
pub struct KVTransaction<E: StorageEngine> {
    kv: Arc<Mutex<E>>,
    pending: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl<E: StorageEngine> KVTransaction<E> {
    pub fn new(kv: Arc<Mutex<E>>) -> Self {
        Self {
            kv,
            pending: BTreeMap::new(),
        }
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(value) = self.pending.get(key) {
            return Ok(Some(value.clone()));
        }
        self.kv.lock()?.get(key)
    }

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.pending.insert(key, value);
    }

    /// Prefix scan over committed data merged with pending writes
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        let mut merged = BTreeMap::new();
        {
            let engine = self.kv.lock()?;
            for item in engine.scan_prefix(prefix) {
                let (key, value) = item?;
                merged.insert(key, value);
            }
        }
        for (key, value) in self.pending.range(prefix.to_vec()..) {
            if !key.starts_with(prefix) {
                break;
            }
            merged.insert(key.clone(), value.clone());
        }
        Ok(merged.into_values().collect())
    }
}

impl<E: StorageEngine> Transaction for KVTransaction<E> {
    fn commit(self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let mut engine = self.kv.lock()?;
        debug!(writes = self.pending.len(), "committing transaction");
        for (key, value) in self.pending {
            engine.set(key, value)?;
        }
        Ok(())
    }

    fn rollback(self) -> Result<()> {
        if !self.pending.is_empty() {
            debug!(writes = self.pending.len(), "discarding transaction writes");
        }
        Ok(())
    }

    fn create_row(&mut self, table_name: &str, row: Row) -> Result<()> {
        let table = self.must_get_table(table_name)?;
        table.validate_row(&row)?;

        // Store row data: key = table_name + primary key value, value = serialized row
        let id = Key::Row(table_name.to_string(), table.get_primary_key(&row)?);
        let key = bincode::serialize(&id)?;
        if self.get(&key)?.is_some() {
            return Err(Error::Internal(format!(
                "duplicate primary key {} in table {}",
                table.get_primary_key(&row)?,
                table_name
            )));
        }
        self.set(key, bincode::serialize(&row)?);
        Ok(())
    }

    fn scan_table(&self, table_name: &str) -> Result<Vec<Row>> {
        // Use prefix scan to find all rows in the table
        let prefix = KeyPrefix::Row(table_name.to_string());
        self.scan_prefix(&bincode::serialize(&prefix)?)?
            .iter()
            .map(|value| Ok(bincode::deserialize(value)?))
            .collect()
    }

    fn create_table(&mut self, table: Table) -> Result<()> {
        if self.get_table(&table.name)?.is_some() {
            return Err(Error::Internal(format!(
                "table {} already exists",
                table.name
            )));
        }
        table.validate()?;

        // Store table schema: key = table name, value = serialized table schema
        let key = Key::Table(table.name.clone());
        self.set(bincode::serialize(&key)?, bincode::serialize(&table)?);
        Ok(())
    }

    fn get_table(&self, table_name: &str) -> Result<Option<Table>> {
        let key = Key::Table(table_name.to_string());
        Ok(self
            .get(&bincode::serialize(&key)?)?
            .map(|v| bincode::deserialize(&v))
            .transpose()?)
    }
}

/// Key types for KV storage operations
#[derive(Debug, Serialize, Deserialize)]
enum Key {
    Row(String, Value),
    Table(String),
}

/// Key prefix types for prefix scanning
///
/// In bincode, enums are serialized as [variant_index][variant_data...].
/// Variant indices start from 0 in definition order and match [`Key`].
#[derive(Debug, Serialize, Deserialize)]
enum KeyPrefix {
    Row(String),
}

#[cfg(test)]
mod tests {
    use super::KVEngine;
    use crate::{
        error::{Error, Result},
        sql::{
            engine::{Engine, Transaction},
            schema::{Column, Table},
            types::{DataType, Value},
        },
        storage::{engine::Engine as _, memory::MemoryEngine},
    };

    fn table(name: &str) -> Table {
        Table {
            name: name.into(),
            columns: vec![
                Column::new("id", DataType::Integer).primary_key(),
                Column::new("name", DataType::String),
            ],
        }
    }

    fn row(id: i64, name: &str) -> Vec<Value> {
        vec![Value::Integer(id), Value::String(name.into())]
    }

    #[test]
    fn test_commit_makes_rows_visible() -> Result<()> {
        let engine = KVEngine::new(MemoryEngine::new());

        let mut txn = engine.begin()?;
        txn.create_table(table("bar"))?;
        txn.create_table(table("bars"))?;
        txn.create_row("bars", row(1, "Chuao"))?;
        txn.create_row("bars", row(2, "Kokoa Kamili"))?;
        txn.create_row("bar", row(1, "other"))?;
        // Own writes are visible before commit
        assert_eq!(txn.scan_table("bars")?.len(), 2);
        txn.commit()?;

        let txn = engine.begin()?;
        assert_eq!(txn.scan_table("bars")?, vec![row(1, "Chuao"), row(2, "Kokoa Kamili")]);
        assert_eq!(txn.scan_table("bar")?, vec![row(1, "other")]);
        assert!(txn.get_table("countries")?.is_none());
        Ok(())
    }

    #[test]
    fn test_rollback_discards_writes() -> Result<()> {
        let engine = KVEngine::new(MemoryEngine::new());

        let mut txn = engine.begin()?;
        txn.create_table(table("bars"))?;
        txn.create_row("bars", row(1, "Chuao"))?;
        txn.rollback()?;

        let txn = engine.begin()?;
        assert!(txn.get_table("bars")?.is_none());
        assert!(engine.kv.lock()?.scan(..).next().is_none());
        Ok(())
    }

    #[test]
    fn test_create_row_checks() -> Result<()> {
        let engine = KVEngine::new(MemoryEngine::new());
        let mut txn = engine.begin()?;
        assert!(txn.create_row("bars", row(1, "Chuao")).is_err());

        txn.create_table(table("bars"))?;
        assert!(txn.create_table(table("bars")).is_err());

        txn.create_row("bars", row(1, "Chuao"))?;
        assert!(matches!(
            txn.create_row("bars", row(1, "again")),
            Err(Error::Internal(_))
        ));
        assert!(txn.create_row("bars", vec![Value::Integer(2), Value::Null]).is_err());
        Ok(())
    }
}
