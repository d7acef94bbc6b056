use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{BlobStore, repository};
use crate::error::AppError;
use crate::models::encode_availability;
use crate::services::{AVAILABILITY_FILE, COURSES_FILE, ROOMS_FILE};
use crate::tabular::{Table, join_key};

/// Rebuilds the relational store from the stored CSV documents. Each
/// destructive table replace runs in its own transaction, and all
/// destructive work is serialized behind the shared import lock.
pub struct ImportService {
    db: SqlitePool,
    blobs: BlobStore,
    lock: Arc<Mutex<()>>,
}

#[derive(Debug, Default, Serialize)]
pub struct ImportStats {
    pub rooms: usize,
    pub lecturers: usize,
    pub courses: usize,
    pub sections: usize,
    pub skipped_rows: usize,
    pub skipped_sections: usize,
    pub missing_files: usize,
}

#[derive(Debug, Default, Serialize)]
pub struct ApplyStats {
    pub updated: usize,
    pub skipped: usize,
}

impl ImportService {
    pub fn new(db: SqlitePool, lock: Arc<Mutex<()>>) -> Self {
        let blobs = BlobStore::new(db.clone());
        Self { db, blobs, lock }
    }

    /// Imports all three documents from the blob store. A document that
    /// is not stored leaves its table untouched.
    pub async fn import_all(&self) -> Result<ImportStats, AppError> {
        let _guard = self.lock.lock().await;
        info!("Starting import from stored documents...");
        let mut stats = ImportStats::default();

        match self.blobs.try_get(ROOMS_FILE).await? {
            Some(bytes) => {
                let table = Table::from_bytes(&bytes)?;
                let (inserted, skipped) = self.replace_rooms(&table).await?;
                stats.rooms = inserted;
                stats.skipped_rows += skipped;
                info!("Replaced rooms: {} inserted, {} rows skipped", inserted, skipped);
            }
            None => {
                warn!("{} not stored, rooms left untouched", ROOMS_FILE);
                stats.missing_files += 1;
            }
        }

        match self.blobs.try_get(AVAILABILITY_FILE).await? {
            Some(bytes) => {
                let table = Table::from_bytes(&bytes)?;
                let (upserted, skipped) = self.upsert_lecturers(&table).await?;
                stats.lecturers = upserted;
                stats.skipped_rows += skipped;
                info!("Upserted {} lecturers, {} rows skipped", upserted, skipped);
            }
            None => {
                warn!("{} not stored, lecturers left untouched", AVAILABILITY_FILE);
                stats.missing_files += 1;
            }
        }

        match self.blobs.try_get(COURSES_FILE).await? {
            Some(bytes) => {
                let table = Table::from_bytes(&bytes)?;
                let outcome = self.replace_courses(&table).await?;
                stats.courses = outcome.courses;
                stats.sections = outcome.sections;
                stats.skipped_rows += outcome.skipped_rows;
                stats.skipped_sections = outcome.skipped_sections;
                info!(
                    "Replaced courses: {} courses, {} sections, {} sections skipped",
                    outcome.courses, outcome.sections, outcome.skipped_sections
                );
            }
            None => {
                warn!("{} not stored, courses left untouched", COURSES_FILE);
                stats.missing_files += 1;
            }
        }

        info!("Import completed: {:?}", stats);
        Ok(stats)
    }

    /// Runs the single import step matching one stored document, so a
    /// freshly saved file is reflected immediately. `None` for filenames
    /// the importer does not recognize.
    pub async fn import_table(&self, filename: &str) -> Result<Option<ImportStats>, AppError> {
        let mut stats = ImportStats::default();
        match filename {
            ROOMS_FILE => {
                let _guard = self.lock.lock().await;
                let bytes = self.blobs.get(ROOMS_FILE).await?;
                let table = Table::from_bytes(&bytes)?;
                let (inserted, skipped) = self.replace_rooms(&table).await?;
                stats.rooms = inserted;
                stats.skipped_rows = skipped;
            }
            AVAILABILITY_FILE => {
                let bytes = self.blobs.get(AVAILABILITY_FILE).await?;
                let table = Table::from_bytes(&bytes)?;
                let (upserted, skipped) = self.upsert_lecturers(&table).await?;
                stats.lecturers = upserted;
                stats.skipped_rows = skipped;
            }
            COURSES_FILE => {
                let _guard = self.lock.lock().await;
                let bytes = self.blobs.get(COURSES_FILE).await?;
                let table = Table::from_bytes(&bytes)?;
                let outcome = self.replace_courses(&table).await?;
                stats.courses = outcome.courses;
                stats.sections = outcome.sections;
                stats.skipped_rows = outcome.skipped_rows;
                stats.skipped_sections = outcome.skipped_sections;
            }
            _ => return Ok(None),
        }
        Ok(Some(stats))
    }

    /// Destructive replace. Section room references are detached first so
    /// the rebuilt room set starts clean.
    async fn replace_rooms(&self, table: &Table) -> Result<(usize, usize), AppError> {
        let name_col = table
            .column_or("room_name", 0)
            .ok_or_else(|| AppError::Validation(format!("{} has no room_name column", ROOMS_FILE)))?;
        let capacity_col = table.column_or("capacity", 1);

        let mut tx = self.db.begin().await?;
        sqlx::query("UPDATE sections SET room_id = NULL").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM rooms").execute(&mut *tx).await?;

        let mut inserted = 0;
        let mut skipped = 0;
        for row in table.rows() {
            let name = row.get(name_col);
            if name.is_empty() {
                skipped += 1;
                continue;
            }
            let capacity: i32 = row.get_opt(capacity_col).parse().unwrap_or(50);
            sqlx::query("INSERT INTO rooms (id, room_name, capacity) VALUES (?, ?, ?)")
                .bind(Uuid::new_v4().to_string())
                .bind(name)
                .bind(capacity)
                .execute(&mut *tx)
                .await?;
            inserted += 1;
        }

        tx.commit().await?;
        Ok((inserted, skipped))
    }

    /// Lecturers are never purged: rows are upserted by name, so ids stay
    /// stable across repeated imports.
    async fn upsert_lecturers(&self, table: &Table) -> Result<(usize, usize), AppError> {
        let name_col = table.column_or("lecturer_name", 0).ok_or_else(|| {
            AppError::Validation(format!("{} has no lecturer_name column", AVAILABILITY_FILE))
        })?;
        let day_cols = [
            table.column_or("mon", 1),
            table.column_or("tue", 2),
            table.column_or("wed", 3),
            table.column_or("thu", 4),
            table.column_or("fri", 5),
        ];

        let mut upserted = 0;
        let mut skipped = 0;
        for row in table.rows() {
            let name = row.get(name_col);
            if name.is_empty() {
                skipped += 1;
                continue;
            }
            let mut flags = [false; 5];
            for (day, col) in day_cols.iter().enumerate() {
                flags[day] = row.get_opt(*col) == "1";
            }
            repository::upsert_lecturer(&self.db, name, &encode_availability(&flags)).await?;
            upserted += 1;
        }
        Ok((upserted, skipped))
    }

    /// Destructive replace of courses and sections. The course row is
    /// always inserted; the section only when its lecturer resolves.
    async fn replace_courses(&self, table: &Table) -> Result<CourseImportOutcome, AppError> {
        let code_col = table.column_or("course_code", 0).ok_or_else(|| {
            AppError::Validation(format!("{} has no course_code column", COURSES_FILE))
        })?;
        let title_col = table.column_or("course_title", 1);
        let lecturer_col = table.column_or("lecturer_name", 2);
        let semester_col = table.column_or("semester", 3);
        let day_col = table.column_or("day", 4);
        let time_col = table.column_or("start_time", 5);
        let room_col = table.column_or("room_name", 7);
        let category_col = table.column_or("source_type", 8);
        let level_col = table.column_or("course_level", 9);
        let credits_col = table.column_or("credit_hours", 10);

        let lecturer_ids = key_map(
            repository::fetch_lecturers(&self.db)
                .await?
                .into_iter()
                .map(|l| (l.name, l.id)),
        );
        let room_ids = key_map(
            repository::fetch_rooms(&self.db)
                .await?
                .into_iter()
                .map(|r| (r.room_name, r.id)),
        );

        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM sections").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM courses").execute(&mut *tx).await?;

        let mut outcome = CourseImportOutcome::default();
        for row in table.rows() {
            let code = row.get(code_col);
            if code.is_empty() {
                outcome.skipped_rows += 1;
                continue;
            }

            let course_id = Uuid::new_v4().to_string();
            let level: i32 = row.get_opt(level_col).parse().unwrap_or(100);
            let credits: i32 = row.get_opt(credits_col).parse().unwrap_or(3);
            let semester = non_empty_or(row.get_opt(semester_col), "1");
            let category = non_empty_or(row.get_opt(category_col), "Departmental");

            sqlx::query(
                "INSERT INTO courses (id, code, title, course_level, credit_hours, semester, category) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&course_id)
            .bind(code)
            .bind(row.get_opt(title_col))
            .bind(level)
            .bind(credits)
            .bind(semester)
            .bind(category)
            .execute(&mut *tx)
            .await?;
            outcome.courses += 1;

            let lecturer_name = row.get_opt(lecturer_col);
            let Some(lecturer_id) = lecturer_ids.get(&join_key(lecturer_name)) else {
                warn!("No lecturer '{}' for course {}, section skipped", lecturer_name, code);
                outcome.skipped_sections += 1;
                continue;
            };

            let room_id = room_ids.get(&join_key(row.get_opt(room_col)));
            sqlx::query(
                "INSERT INTO sections (id, course_id, lecturer_id, room_id, assigned_day, assigned_time) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&course_id)
            .bind(lecturer_id.as_str())
            .bind(room_id.map(String::as_str))
            .bind(opt_non_empty(row.get_opt(day_col)))
            .bind(opt_non_empty(row.get_opt(time_col)))
            .execute(&mut *tx)
            .await?;
            outcome.sections += 1;
        }

        tx.commit().await?;
        Ok(outcome)
    }

    /// In-place assignment update from a solver artifact. Never deletes;
    /// a row whose course, lecturer or room does not resolve is skipped.
    /// Re-applying the same artifact leaves the store unchanged.
    pub async fn apply_solver_results(&self, filename: &str) -> Result<ApplyStats, AppError> {
        let bytes = self.blobs.get(filename).await?;
        let table = Table::from_bytes(&bytes)?;

        let code_col = table.column_or("course_code", 0);
        let lecturer_col = table.column_or("lecturer_name", 3);
        let room_col = table.column_or("room_name", 4);
        let day_col = table.column_or("day", 5);
        let time_col = table.column_or("time", 6);

        let course_ids = key_map(
            repository::fetch_courses(&self.db)
                .await?
                .into_iter()
                .map(|c| (c.code, c.id)),
        );
        let lecturer_ids = key_map(
            repository::fetch_lecturers(&self.db)
                .await?
                .into_iter()
                .map(|l| (l.name, l.id)),
        );
        let room_ids = key_map(
            repository::fetch_rooms(&self.db)
                .await?
                .into_iter()
                .map(|r| (r.room_name, r.id)),
        );

        let mut stats = ApplyStats::default();
        for row in table.rows() {
            let code = row.get_opt(code_col);
            let lecturer = row.get_opt(lecturer_col);
            let room = row.get_opt(room_col);

            let (Some(course_id), Some(lecturer_id), Some(room_id)) = (
                course_ids.get(&join_key(code)),
                lecturer_ids.get(&join_key(lecturer)),
                room_ids.get(&join_key(room)),
            ) else {
                warn!(
                    "Unresolved reference in {} (course '{}', lecturer '{}', room '{}'), row skipped",
                    filename, code, lecturer, room
                );
                stats.skipped += 1;
                continue;
            };

            let result = sqlx::query(
                "UPDATE sections SET room_id = ?, assigned_day = ?, assigned_time = ? \
                 WHERE course_id = ? AND lecturer_id = ?",
            )
            .bind(room_id.as_str())
            .bind(opt_non_empty(row.get_opt(day_col)))
            .bind(opt_non_empty(row.get_opt(time_col)))
            .bind(course_id.as_str())
            .bind(lecturer_id.as_str())
            .execute(&self.db)
            .await?;
            stats.updated += result.rows_affected() as usize;
        }

        info!(
            "Applied solver results from {}: {} section updates, {} rows skipped",
            filename, stats.updated, stats.skipped
        );
        Ok(stats)
    }
}

#[derive(Debug, Default)]
struct CourseImportOutcome {
    courses: usize,
    sections: usize,
    skipped_rows: usize,
    skipped_sections: usize,
}

/// Name-to-id lookup keyed by `join_key`. The first occurrence of a key
/// wins, matching single-row lookup semantics on duplicate names.
fn key_map<I>(pairs: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut map = HashMap::new();
    for (name, id) in pairs {
        map.entry(join_key(&name)).or_insert(id);
    }
    map
}

fn non_empty_or(value: &str, default: &str) -> String {
    if value.is_empty() { default.to_string() } else { value.to_string() }
}

fn opt_non_empty(value: &str) -> Option<String> {
    if value.is_empty() { None } else { Some(value.to_string()) }
}
