use std::path::PathBuf;
use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::sync::Mutex;

use crate::render::ArtifactRenderer;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub renderer: Arc<dyn ArtifactRenderer>,
    pub data_dir: PathBuf,
    /// Serializes destructive imports so concurrent callers cannot
    /// interleave table replaces.
    pub import_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(db: SqlitePool, renderer: Arc<dyn ArtifactRenderer>, data_dir: PathBuf) -> Self {
        Self {
            db,
            renderer,
            data_dir,
            import_lock: Arc::new(Mutex::new(())),
        }
    }
}
