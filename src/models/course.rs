use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: String,
    pub code: String,
    pub title: String,
    pub course_level: i32,
    pub credit_hours: i32,
    pub semester: String,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Section {
    pub id: String,
    pub course_id: String,
    pub lecturer_id: Option<String>,
    pub room_id: Option<String>,
    pub assigned_day: Option<String>,
    pub assigned_time: Option<String>,
}

/// One exported timetable line: a section left-joined to its course,
/// lecturer and room. Missing references stay `None` here and export as
/// empty fields.
#[derive(Debug, Clone, FromRow)]
pub struct ScheduleRow {
    pub code: String,
    pub title: String,
    pub lecturer_name: Option<String>,
    pub room_name: Option<String>,
    pub assigned_day: Option<String>,
    pub assigned_time: Option<String>,
    pub semester: String,
    pub category: String,
    pub course_level: i32,
    pub credit_hours: i32,
}
