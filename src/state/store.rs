//! Cursor store implementation
//!
//! Provides file-based cursor persistence with atomic writes.

use super::types::CursorTable;
use crate::error::{Error, Result};
use crate::protocol::Cursor;
use crate::types::PartitionId;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Store for persisting and loading the cursor table
#[derive(Debug, Clone)]
pub struct CursorStore {
    /// Path to the state file (empty for in-memory)
    path: PathBuf,
    /// Current table (cached)
    table: Arc<RwLock<CursorTable>>,
}

impl CursorStore {
    /// Create a store backed by `path` without reading it
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            table: Arc::new(RwLock::new(CursorTable::new())),
        }
    }

    /// Create an in-memory store (no file persistence)
    pub fn in_memory() -> Self {
        Self::new(PathBuf::new())
    }

    /// Create a store from a file, loading the existing table if present
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let table = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| Error::state(format!("Failed to read state file: {e}")))?;
            parse_table(&contents)?
        } else {
            CursorTable::new()
        };

        Ok(Self {
            path,
            table: Arc::new(RwLock::new(table)),
        })
    }

    /// Create an in-memory store from a JSON table
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self {
            path: PathBuf::new(),
            table: Arc::new(RwLock::new(parse_table(json)?)),
        })
    }

    /// Reload the table from file
    pub async fn load(&self) -> Result<()> {
        if self.is_in_memory() || !self.path.exists() {
            return Ok(());
        }

        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::state(format!("Failed to read state file: {e}")))?;
        let loaded = parse_table(&contents)?;

        *self.table.write().await = loaded;
        Ok(())
    }

    /// Save the current table to file
    pub async fn save(&self) -> Result<()> {
        let table = self.table.read().await;
        self.persist(&table).await
    }

    /// Cursor of a partition, `FIRST_CURSOR` if never advanced
    pub async fn cursor(&self, partition: PartitionId) -> String {
        self.table.read().await.cursor(partition).to_string()
    }

    /// Cursors of the given partitions
    pub async fn cursors_for(&self, partitions: &[PartitionId]) -> Vec<Cursor> {
        self.table.read().await.cursors_for(partitions)
    }

    /// Copy of the current table
    pub async fn snapshot(&self) -> CursorTable {
        self.table.read().await.clone()
    }

    /// Check if a partition reached `LAST_CURSOR`
    pub async fn is_exhausted(&self, partition: PartitionId) -> bool {
        self.table.read().await.is_exhausted(partition)
    }

    /// Advance every given partition at once and persist.
    ///
    /// Either all checkpoints are applied and saved or the table is left as
    /// it was.
    pub async fn apply_checkpoints(&self, checkpoints: &[Cursor]) -> Result<()> {
        if checkpoints.is_empty() {
            return Ok(());
        }

        let mut table = self.table.write().await;
        let previous = table.clone();
        for cursor in checkpoints {
            table.set(cursor.partition, cursor.token.clone());
        }
        table.updated_at = Some(Utc::now());

        if let Err(e) = self.persist(&table).await {
            warn!(error = %e, "Failed to persist cursors, rolling back");
            *table = previous;
            return Err(e);
        }

        debug!(partitions = checkpoints.len(), "Cursors advanced");
        Ok(())
    }

    /// Forget every cursor
    pub async fn reset(&self) -> Result<()> {
        let mut table = self.table.write().await;
        let previous = std::mem::take(&mut *table);
        if let Err(e) = self.persist(&table).await {
            *table = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Export the table as pretty-printed JSON
    pub async fn to_json_pretty(&self) -> Result<String> {
        let table = self.table.read().await;
        serde_json::to_string_pretty(&*table)
            .map_err(|e| Error::state(format!("Failed to serialize state: {e}")))
    }

    /// Get the state file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if using in-memory mode
    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str().is_empty()
    }

    async fn persist(&self, table: &CursorTable) -> Result<()> {
        if self.is_in_memory() {
            return Ok(());
        }

        let contents = serde_json::to_string_pretty(table)
            .map_err(|e| Error::state(format!("Failed to serialize state: {e}")))?;

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents)
            .await
            .map_err(|e| Error::state(format!("Failed to write state file: {e}")))?;

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| Error::state(format!("Failed to rename state file: {e}")))?;

        Ok(())
    }
}

fn parse_table(contents: &str) -> Result<CursorTable> {
    serde_json::from_str(contents)
        .map_err(|e| Error::state(format!("Failed to parse state file: {e}")))
}
