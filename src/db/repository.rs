use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{Course, Lecturer, Room, ScheduleRow, Section};

pub async fn fetch_rooms(db: &SqlitePool) -> Result<Vec<Room>, sqlx::Error> {
    sqlx::query_as::<_, Room>(
        "SELECT id, room_name, capacity, room_type, equipment, accessibility, primary_dept \
         FROM rooms ORDER BY room_name",
    )
    .fetch_all(db)
    .await
}

pub async fn fetch_lecturers(db: &SqlitePool) -> Result<Vec<Lecturer>, sqlx::Error> {
    sqlx::query_as::<_, Lecturer>("SELECT id, name, availability FROM lecturers ORDER BY name")
        .fetch_all(db)
        .await
}

pub async fn fetch_courses(db: &SqlitePool) -> Result<Vec<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(
        "SELECT id, code, title, course_level, credit_hours, semester, category \
         FROM courses ORDER BY code",
    )
    .fetch_all(db)
    .await
}

pub async fn fetch_sections(db: &SqlitePool) -> Result<Vec<Section>, sqlx::Error> {
    sqlx::query_as::<_, Section>(
        "SELECT id, course_id, lecturer_id, room_id, assigned_day, assigned_time \
         FROM sections ORDER BY rowid",
    )
    .fetch_all(db)
    .await
}

/// Export view: every section with its course, lecturer and room
/// left-joined, in stable course-code order.
pub async fn fetch_schedule_rows(db: &SqlitePool) -> Result<Vec<ScheduleRow>, sqlx::Error> {
    sqlx::query_as::<_, ScheduleRow>(
        r#"
        SELECT
            c.code AS code,
            c.title AS title,
            l.name AS lecturer_name,
            r.room_name AS room_name,
            s.assigned_day AS assigned_day,
            s.assigned_time AS assigned_time,
            c.semester AS semester,
            c.category AS category,
            c.course_level AS course_level,
            c.credit_hours AS credit_hours
        FROM sections s
        JOIN courses c ON c.id = s.course_id
        LEFT JOIN lecturers l ON l.id = s.lecturer_id
        LEFT JOIN rooms r ON r.id = s.room_id
        ORDER BY c.code, s.rowid
        "#,
    )
    .fetch_all(db)
    .await
}

/// Upsert keyed on the lecturer name. An existing lecturer keeps its id,
/// only the availability is replaced.
pub async fn upsert_lecturer(
    db: &SqlitePool,
    name: &str,
    availability: &str,
) -> Result<(), sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO lecturers (id, name, availability) VALUES (?, ?, ?) \
         ON CONFLICT(name) DO UPDATE SET availability = excluded.availability",
    )
    .bind(id)
    .bind(name)
    .bind(availability)
    .execute(db)
    .await?;
    Ok(())
}
