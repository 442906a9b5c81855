//! In-process backends for development and tests

use crate::error::StorageError;
use crate::storage::table::{Cell, Table};
use crate::storage::{ObjectStore, RecordTable};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
}

pub struct MemoryObjectStore {
    bucket: String,
    objects: Mutex<HashMap<String, StoredObject>>,
    /// Reject every write, to exercise failure paths
    fail_writes: bool,
}

impl MemoryObjectStore {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            objects: Mutex::new(HashMap::new()),
            fail_writes: false,
        }
    }

    pub fn failing(bucket: &str) -> Self {
        Self {
            fail_writes: true,
            ..Self::new(bucket)
        }
    }

    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().await.get(key).cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn ensure_bucket(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn put(&self, key: &str, body: &[u8], content_type: &str) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::ObjectStore(format!("write to {} rejected", key)));
        }
        self.objects.lock().await.insert(
            key.to_string(),
            StoredObject {
                body: body.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryRecordTable {
    tables: Mutex<HashMap<String, Table>>,
    fail_writes: bool,
}

impl MemoryRecordTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub async fn snapshot(&self, name: &str) -> Option<Table> {
        self.tables.lock().await.get(name).cloned()
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Database("database unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordTable for MemoryRecordTable {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.check_writable()
    }

    async fn replace(&self, name: &str, data: &Table) -> Result<(), StorageError> {
        self.check_writable()?;
        self.tables
            .lock()
            .await
            .insert(name.to_string(), data.clone());
        Ok(())
    }

    async fn append(&self, name: &str, data: &Table) -> Result<(), StorageError> {
        self.check_writable()?;
        let mut tables = self.tables.lock().await;
        let Some(existing) = tables.get_mut(name) else {
            tables.insert(name.to_string(), data.clone());
            return Ok(());
        };

        // map incoming columns onto the existing layout by name
        let positions = data
            .columns
            .iter()
            .map(|column| {
                existing.column_index(&column.name).ok_or_else(|| {
                    StorageError::Database(format!(
                        "column {:?} of relation {:?} does not exist",
                        column.name, name
                    ))
                })
            })
            .collect::<Result<Vec<usize>, _>>()?;

        for row in &data.rows {
            let mut cells = vec![Cell::Null; existing.columns.len()];
            for (cell, &position) in row.iter().zip(&positions) {
                cells[position] = cell.clone();
            }
            existing.rows.push(cells);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::table::{Column, ColumnType};

    fn table(names: &[&str], rows: Vec<Vec<Cell>>) -> Table {
        Table {
            columns: names
                .iter()
                .map(|n| Column {
                    name: n.to_string(),
                    ty: ColumnType::Integer,
                })
                .collect(),
            rows,
        }
    }

    #[tokio::test]
    async fn test_object_put_and_get() {
        let store = MemoryObjectStore::new("bucket");
        store.put("a.csv", b"x,y\n", "text/csv").await.unwrap();

        let object = store.get("a.csv").await.unwrap();
        assert_eq!(object.body, b"x,y\n");
        assert_eq!(object.content_type, "text/csv");
        assert_eq!(store.keys().await, vec!["a.csv"]);
    }

    #[tokio::test]
    async fn test_failing_object_store() {
        let store = MemoryObjectStore::failing("bucket");
        assert!(store.put("a", b"", "text/plain").await.is_err());
    }

    #[tokio::test]
    async fn test_replace_overwrites() {
        let db = MemoryRecordTable::new();
        db.replace("t", &table(&["a"], vec![vec![Cell::Int(1)], vec![Cell::Int(2)]]))
            .await
            .unwrap();
        db.replace("t", &table(&["b"], vec![vec![Cell::Int(3)]]))
            .await
            .unwrap();

        let snapshot = db.snapshot("t").await.unwrap();
        assert_eq!(snapshot.column_names(), vec!["b"]);
        assert_eq!(snapshot.row_count(), 1);
    }

    #[tokio::test]
    async fn test_append_creates_then_aligns_columns() {
        let db = MemoryRecordTable::new();
        db.append("t", &table(&["a", "b"], vec![vec![Cell::Int(1), Cell::Int(2)]]))
            .await
            .unwrap();
        db.append("t", &table(&["b"], vec![vec![Cell::Int(5)]]))
            .await
            .unwrap();

        let snapshot = db.snapshot("t").await.unwrap();
        assert_eq!(snapshot.rows[1], vec![Cell::Null, Cell::Int(5)]);
        assert!(db
            .append("t", &table(&["c"], vec![vec![Cell::Int(0)]]))
            .await
            .is_err());
    }
}
