use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::warn;

use crate::error::AppError;
use crate::models::BlobEntry;
use crate::tabular::validate_csv_filename;

/// Keyed CSV documents stored in the `csv_files` table. The blob store is
/// the canonical serialized form; the data directory is a sink derived
/// from it.
#[derive(Clone)]
pub struct BlobStore {
    db: SqlitePool,
}

#[derive(Debug, Default, Serialize)]
pub struct MaterializeStats {
    pub written: usize,
    pub failed: usize,
}

impl BlobStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn put(&self, filename: &str, content: &[u8]) -> Result<(), AppError> {
        validate_csv_filename(filename)?;
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO csv_files (filename, content, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(filename) DO UPDATE SET content = excluded.content, updated_at = excluded.updated_at",
        )
        .bind(filename)
        .bind(content)
        .bind(now)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    pub async fn get(&self, filename: &str) -> Result<Vec<u8>, AppError> {
        self.try_get(filename).await?.ok_or(AppError::NotFound)
    }

    /// `None` when the key is absent; importers treat that as "skip the
    /// whole table".
    pub async fn try_get(&self, filename: &str) -> Result<Option<Vec<u8>>, AppError> {
        let row: Option<(Vec<u8>,)> =
            sqlx::query_as("SELECT content FROM csv_files WHERE filename = ?")
                .bind(filename)
                .fetch_optional(&self.db)
                .await?;
        Ok(row.map(|(content,)| content))
    }

    pub async fn list(&self) -> Result<Vec<BlobEntry>, AppError> {
        let entries = sqlx::query_as::<_, BlobEntry>(
            "SELECT filename, LENGTH(content) AS size, updated_at \
             FROM csv_files ORDER BY filename",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(entries)
    }

    /// Writes every stored document into the data directory. Best effort:
    /// a file that cannot be written is logged and counted, the sweep
    /// continues.
    pub async fn materialize_all(&self, data_dir: &Path) -> Result<MaterializeStats, AppError> {
        let rows: Vec<(String, Vec<u8>)> =
            sqlx::query_as("SELECT filename, content FROM csv_files ORDER BY filename")
                .fetch_all(&self.db)
                .await?;

        let mut stats = MaterializeStats::default();
        for (filename, content) in rows {
            let path = data_dir.join(&filename);
            match tokio::fs::write(&path, &content).await {
                Ok(()) => stats.written += 1,
                Err(e) => {
                    warn!("failed to materialize {}: {}", filename, e);
                    stats.failed += 1;
                }
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::SqlitePool;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite://:memory:")
            .await
            .expect("Failed to create test db");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        pool
    }

    #[tokio::test]
    async fn test_put_get_and_list() {
        let pool = setup_test_db().await;
        let store = BlobStore::new(pool);

        store.put("rooms.csv", b"room_name,capacity\n").await.expect("put failed");
        store.put("b.csv", b"x\n").await.expect("put failed");

        let content = store.get("rooms.csv").await.expect("get failed");
        assert_eq!(content, b"room_name,capacity\n");

        let entries = store.list().await.expect("list failed");
        assert_eq!(entries.len(), 2);
        // Ordered by filename.
        assert_eq!(entries[0].filename, "b.csv");
        assert_eq!(entries[1].filename, "rooms.csv");
        assert_eq!(entries[1].size, b"room_name,capacity\n".len() as i64);
    }

    #[tokio::test]
    async fn test_put_overwrites_by_filename() {
        let pool = setup_test_db().await;
        let store = BlobStore::new(pool);

        store.put("rooms.csv", b"old").await.expect("put failed");
        store.put("rooms.csv", b"new").await.expect("put failed");

        let content = store.get("rooms.csv").await.expect("get failed");
        assert_eq!(content, b"new");

        let entries = store.list().await.expect("list failed");
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let pool = setup_test_db().await;
        let store = BlobStore::new(pool);

        let err = store.get("absent.csv").await.expect_err("expected an error");
        assert!(matches!(err, AppError::NotFound));

        let missing = store.try_get("absent.csv").await.expect("try_get failed");
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_put_rejects_unsafe_filenames() {
        let pool = setup_test_db().await;
        let store = BlobStore::new(pool);

        for bad in ["../rooms.csv", "a/b.csv", "rooms.txt", ""] {
            let err = store.put(bad, b"x").await.expect_err("expected an error");
            assert!(matches!(err, AppError::Validation(_)), "accepted: {}", bad);
        }
    }

    #[tokio::test]
    async fn test_materialize_all_is_best_effort() {
        let pool = setup_test_db().await;
        let store = BlobStore::new(pool);
        let dir = tempfile::tempdir().expect("tempdir failed");

        store.put("good.csv", b"a,b\n1,2\n").await.expect("put failed");
        store.put("blocked.csv", b"x\n").await.expect("put failed");

        // A directory squatting on the target name makes that write fail.
        std::fs::create_dir(dir.path().join("blocked.csv")).expect("mkdir failed");

        let stats = store.materialize_all(dir.path()).await.expect("materialize failed");
        assert_eq!(stats.written, 1);
        assert_eq!(stats.failed, 1);

        let on_disk = std::fs::read(dir.path().join("good.csv")).expect("read failed");
        assert_eq!(on_disk, b"a,b\n1,2\n");
    }

    #[tokio::test]
    async fn test_materialize_empty_store() {
        let pool = setup_test_db().await;
        let store = BlobStore::new(pool);
        let dir = tempfile::tempdir().expect("tempdir failed");

        let stats = store.materialize_all(dir.path()).await.expect("materialize failed");
        assert_eq!(stats.written, 0);
        assert_eq!(stats.failed, 0);
    }
}
