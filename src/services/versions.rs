use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{BlobStore, version_store};
use crate::error::AppError;
use crate::models::{Version, VersionMeta};
use crate::render::ArtifactRenderer;
use crate::services::SOLVER_RESULTS_FILE;

/// Named snapshots of the solver artifact, with optional rendered form.
pub struct VersionService {
    db: SqlitePool,
    blobs: BlobStore,
    renderer: Arc<dyn ArtifactRenderer>,
    data_dir: PathBuf,
}

impl VersionService {
    pub fn new(db: SqlitePool, renderer: Arc<dyn ArtifactRenderer>, data_dir: PathBuf) -> Self {
        let blobs = BlobStore::new(db.clone());
        Self { db, blobs, renderer, data_dir }
    }

    /// Snapshots the current solver artifact from the data directory.
    /// A render failure only costs the attachment, never the snapshot.
    pub async fn save(
        &self,
        name: &str,
        description: &str,
        created_by: Option<&str>,
    ) -> Result<VersionMeta, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("version name must not be empty".to_string()));
        }

        let path = self.data_dir.join(SOLVER_RESULTS_FILE);
        let csv_content = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(AppError::NotFound),
            Err(e) => return Err(e.into()),
        };

        let artifact = match self.renderer.render(&csv_content).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("Artifact render failed, saving version without it: {}", e);
                None
            }
        };

        let version = Version {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: description.trim().to_string(),
            csv_content,
            artifact,
            created_by: created_by.map(str::to_string),
            created_at: Utc::now().to_rfc3339(),
        };
        version_store::insert_version(&self.db, &version).await?;
        info!("Saved schedule version '{}' ({})", version.name, version.id);

        Ok(VersionMeta {
            has_artifact: version.artifact.is_some(),
            id: version.id,
            name: version.name,
            description: version.description,
            created_by: version.created_by,
            created_at: version.created_at,
        })
    }

    pub async fn list(&self) -> Result<Vec<VersionMeta>, AppError> {
        Ok(version_store::list_versions(&self.db).await?)
    }

    /// Rollback: the stored CSV becomes the current solver artifact in
    /// both the data directory and the blob store.
    pub async fn restore(&self, id: &str) -> Result<(), AppError> {
        let version = version_store::find_version_by_id(&self.db, id)
            .await?
            .ok_or(AppError::NotFound)?;

        tokio::fs::write(self.data_dir.join(SOLVER_RESULTS_FILE), &version.csv_content).await?;
        self.blobs.put(SOLVER_RESULTS_FILE, &version.csv_content).await?;
        info!("Restored schedule version '{}' ({})", version.name, id);
        Ok(())
    }

    /// The rendered artifact for download. `NotFound` when the version is
    /// unknown or was saved without one.
    pub async fn artifact(&self, id: &str) -> Result<(String, Vec<u8>), AppError> {
        let version = version_store::find_version_by_id(&self.db, id)
            .await?
            .ok_or(AppError::NotFound)?;
        let artifact = version.artifact.ok_or(AppError::NotFound)?;
        Ok((version.name, artifact))
    }
}
