use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Room {
    pub id: String,
    pub room_name: String,
    pub capacity: i32,
    pub room_type: Option<String>,
    pub equipment: Option<String>,
    pub accessibility: bool,
    pub primary_dept: Option<String>,
}
