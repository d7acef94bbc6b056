use sqlx::SqlitePool;

use crate::models::{Version, VersionMeta};

pub async fn insert_version(
    db: &SqlitePool,
    version: &Version,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO schedule_versions (id, name, description, csv_content, artifact, created_by, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&version.id)
    .bind(&version.name)
    .bind(&version.description)
    .bind(&version.csv_content)
    .bind(&version.artifact)
    .bind(&version.created_by)
    .bind(&version.created_at)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn find_version_by_id(
    db: &SqlitePool,
    id: &str,
) -> Result<Option<Version>, sqlx::Error> {
    sqlx::query_as::<_, Version>(
        "SELECT id, name, description, csv_content, artifact, created_by, created_at \
         FROM schedule_versions WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

/// Newest first. Blob columns are not selected here.
pub async fn list_versions(db: &SqlitePool) -> Result<Vec<VersionMeta>, sqlx::Error> {
    sqlx::query_as::<_, VersionMeta>(
        "SELECT id, name, description, created_by, created_at, artifact IS NOT NULL AS has_artifact \
         FROM schedule_versions ORDER BY created_at DESC, rowid DESC",
    )
    .fetch_all(db)
    .await
}
