//! Persisted rotation pointer.
//!
//! The stored document is tiny (`{"index": n}`) and only the ledger reads or
//! writes it. Three backends: a JSON file (the default), a libSQL table, and
//! an in-process store used by tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use libsql::{Connection, Database as LibSqlDatabase, params};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::StoreError;

/// On-disk shape of the rotation pointer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct StoredPointer {
    index: i64,
}

/// Backend for the rotation pointer.
#[async_trait]
pub trait RotationStore: Send + Sync {
    /// Load the stored pointer. `Ok(None)` when nothing was ever saved.
    async fn load(&self) -> Result<Option<i64>, StoreError>;

    /// Persist a new pointer value.
    async fn save(&self, index: usize) -> Result<(), StoreError>;
}

// ── JSON file ───────────────────────────────────────────────────────

/// Rotation pointer stored as a JSON file.
pub struct FileRotationStore {
    path: PathBuf,
}

impl FileRotationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "prompt_state.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl RotationStore for FileRotationStore {
    async fn load(&self) -> Result<Option<i64>, StoreError> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let pointer: StoredPointer = serde_json::from_str(&raw)
            .map_err(|e| StoreError::Corrupt(format!("{}: {e}", self.path.display())))?;
        Ok(Some(pointer.index))
    }

    async fn save(&self, index: usize) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_string(&StoredPointer {
            index: index as i64,
        })
        .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        // Write-then-rename so a crash never leaves a half-written pointer.
        let tmp = self.temp_path();
        fs::write(&tmp, body).await?;
        fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), index, "Rotation pointer saved");
        Ok(())
    }
}

// ── libSQL ──────────────────────────────────────────────────────────

/// Rotation pointer stored as a single row in a libSQL database.
pub struct LibSqlRotationStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlRotationStore {
    /// Open (or create) a local database file.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Database(format!("Failed to open libSQL database: {e}")))?;
        let store = Self::from_database(db).await?;
        info!(path = %path.display(), "Rotation database opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                StoreError::Database(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, StoreError> {
        let conn = db
            .connect()
            .map_err(|e| StoreError::Database(format!("Failed to create connection: {e}")))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS rotation_state (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                idx TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            (),
        )
        .await
        .map_err(|e| StoreError::Database(format!("init rotation_state: {e}")))?;

        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    /// Overwrite the raw stored value. Used to exercise corrupt-state handling.
    pub async fn write_raw(&self, raw: &str) -> Result<(), StoreError> {
        self.conn
            .execute(
                "INSERT INTO rotation_state (id, idx, updated_at) VALUES (1, ?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET idx = excluded.idx, updated_at = excluded.updated_at",
                params![raw.to_string(), chrono::Utc::now().to_rfc3339()],
            )
            .await
            .map_err(|e| StoreError::Database(format!("save rotation_state: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl RotationStore for LibSqlRotationStore {
    async fn load(&self) -> Result<Option<i64>, StoreError> {
        let mut rows = self
            .conn
            .query("SELECT idx FROM rotation_state WHERE id = 1", ())
            .await
            .map_err(|e| StoreError::Database(format!("load rotation_state: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let raw: String = row
                    .get(0)
                    .map_err(|e| StoreError::Corrupt(format!("rotation_state row: {e}")))?;
                raw.trim()
                    .parse::<i64>()
                    .map(Some)
                    .map_err(|e| StoreError::Corrupt(format!("rotation_state idx '{raw}': {e}")))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Database(format!("load rotation_state: {e}"))),
        }
    }

    async fn save(&self, index: usize) -> Result<(), StoreError> {
        self.write_raw(&index.to_string()).await?;
        debug!(index, "Rotation pointer saved to database");
        Ok(())
    }
}

// ── In-memory ───────────────────────────────────────────────────────

/// In-process store. Holds the raw document so tests can plant corrupt data.
#[derive(Default)]
pub struct MemoryRotationStore {
    raw: Mutex<Option<String>>,
    fail_saves: bool,
}

impl MemoryRotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a raw stored document (may be invalid JSON).
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Mutex::new(Some(raw.into())),
            fail_saves: false,
        }
    }

    /// A store whose saves always fail.
    pub fn failing() -> Self {
        Self {
            raw: Mutex::new(None),
            fail_saves: true,
        }
    }

    /// Current raw document.
    pub async fn raw(&self) -> Option<String> {
        self.raw.lock().await.clone()
    }
}

#[async_trait]
impl RotationStore for MemoryRotationStore {
    async fn load(&self) -> Result<Option<i64>, StoreError> {
        match self.raw.lock().await.as_deref() {
            None => Ok(None),
            Some(raw) => serde_json::from_str::<StoredPointer>(raw)
                .map(|p| Some(p.index))
                .map_err(|e| StoreError::Corrupt(e.to_string())),
        }
    }

    async fn save(&self, index: usize) -> Result<(), StoreError> {
        if self.fail_saves {
            return Err(StoreError::Io(std::io::Error::other("store is read-only")));
        }
        let body = serde_json::to_string(&StoredPointer {
            index: index as i64,
        })
        .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        *self.raw.lock().await = Some(body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_store_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRotationStore::new(dir.path().join("prompt_state.json"));
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn file_store_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/state/prompt_state.json");
        let store = FileRotationStore::new(&path);

        store.save(7).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(7));

        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw, r#"{"index":7}"#);
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn file_store_non_numeric_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt_state.json");
        std::fs::write(&path, r#"{"index": "three"}"#).unwrap();

        let store = FileRotationStore::new(&path);
        assert!(matches!(store.load().await, Err(StoreError::Corrupt(_))));
    }

    #[tokio::test]
    async fn file_store_garbage_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt_state.json");
        std::fs::write(&path, "not json at all").unwrap();

        let store = FileRotationStore::new(&path);
        assert!(matches!(store.load().await, Err(StoreError::Corrupt(_))));
    }

    #[tokio::test]
    async fn libsql_store_roundtrip() {
        let store = LibSqlRotationStore::new_memory().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);

        store.save(3).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(3));

        store.save(4).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(4));
    }

    #[tokio::test]
    async fn libsql_store_corrupt_value() {
        let store = LibSqlRotationStore::new_memory().await.unwrap();
        store.write_raw("banana").await.unwrap();
        assert!(matches!(store.load().await, Err(StoreError::Corrupt(_))));
    }

    #[tokio::test]
    async fn libsql_store_local_file_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.db");
        {
            let store = LibSqlRotationStore::new_local(&path).await.unwrap();
            store.save(5).await.unwrap();
        }
        let reopened = LibSqlRotationStore::new_local(&path).await.unwrap();
        assert_eq!(reopened.load().await.unwrap(), Some(5));
    }

    #[tokio::test]
    async fn memory_store_failing_save() {
        let store = MemoryRotationStore::failing();
        assert!(store.save(1).await.is_err());
        assert_eq!(store.load().await.unwrap(), None);
    }
}
