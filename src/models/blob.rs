use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BlobEntry {
    pub filename: String,
    pub size: i64,
    pub updated_at: String,
}
