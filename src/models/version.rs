use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An immutable snapshot of the solver artifact. Rows are only ever
/// inserted and read, never updated.
#[derive(Debug, Clone, FromRow)]
pub struct Version {
    pub id: String,
    pub name: String,
    pub description: String,
    pub csv_content: Vec<u8>,
    pub artifact: Option<Vec<u8>>,
    pub created_by: Option<String>,
    pub created_at: String,
}

/// Listing view: blobs stay in the store, only their presence is reported.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VersionMeta {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_by: Option<String>,
    pub created_at: String,
    pub has_artifact: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveVersionRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_by: Option<String>,
}
