use std::path::PathBuf;

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::db::{BlobStore, repository};
use crate::error::AppError;
use crate::services::{AVAILABILITY_FILE, COURSES_FILE, ROOMS_FILE};
use crate::tabular::write_csv;

const ROOMS_HEADER: [&str; 2] = ["room_name", "capacity"];
const AVAILABILITY_HEADER: [&str; 6] = ["lecturer_name", "Mon", "Tue", "Wed", "Thu", "Fri"];
const COURSES_HEADER: [&str; 11] = [
    "course_code",
    "course_title",
    "lecturer_name",
    "Semester",
    "day",
    "start_time",
    "end_time",
    "room_name",
    "source_type",
    "course_level",
    "credit_hours",
];

/// Projects the relational store into the canonical CSV documents. Export
/// is total: row content can never fail it, only store or sink I/O can.
pub struct ExportService {
    db: SqlitePool,
    blobs: BlobStore,
    data_dir: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct ExportStats {
    pub rooms: usize,
    pub lecturers: usize,
    pub courses: usize,
    pub materialized: usize,
    pub failed_materialize: usize,
}

impl ExportService {
    pub fn new(db: SqlitePool, data_dir: PathBuf) -> Self {
        let blobs = BlobStore::new(db.clone());
        Self { db, blobs, data_dir }
    }

    pub async fn export_all(&self) -> Result<ExportStats, AppError> {
        info!("Starting export...");

        let materialize = self.blobs.materialize_all(&self.data_dir).await?;
        info!(
            "Materialized {} stored documents ({} failed)",
            materialize.written, materialize.failed
        );

        let rooms = self.export_rooms().await?;
        info!("Exported {} rooms", rooms);

        let lecturers = self.export_lecturer_availability().await?;
        info!("Exported {} lecturer availability rows", lecturers);

        let courses = self.export_departmental_courses().await?;
        info!("Exported {} schedule rows", courses);

        Ok(ExportStats {
            rooms,
            lecturers,
            courses,
            materialized: materialize.written,
            failed_materialize: materialize.failed,
        })
    }

    async fn export_rooms(&self) -> Result<usize, AppError> {
        let rooms = repository::fetch_rooms(&self.db).await?;
        let rows: Vec<Vec<String>> = rooms
            .iter()
            .map(|r| vec![r.room_name.clone(), r.capacity.to_string()])
            .collect();
        self.write_document(ROOMS_FILE, &ROOMS_HEADER, &rows).await?;
        Ok(rows.len())
    }

    async fn export_lecturer_availability(&self) -> Result<usize, AppError> {
        let lecturers = repository::fetch_lecturers(&self.db).await?;
        let rows: Vec<Vec<String>> = lecturers
            .iter()
            .map(|l| {
                let days = l.available_days();
                let mut row = Vec::with_capacity(6);
                row.push(l.name.clone());
                for day in 0..5 {
                    row.push(if days.contains(&day) { "1" } else { "0" }.to_string());
                }
                row
            })
            .collect();
        self.write_document(AVAILABILITY_FILE, &AVAILABILITY_HEADER, &rows).await?;
        Ok(rows.len())
    }

    /// Left join on lecturer and room: unassigned references export as
    /// empty fields, never as an error.
    async fn export_departmental_courses(&self) -> Result<usize, AppError> {
        let schedule = repository::fetch_schedule_rows(&self.db).await?;
        let rows: Vec<Vec<String>> = schedule
            .iter()
            .map(|s| {
                vec![
                    s.code.clone(),
                    s.title.clone(),
                    s.lecturer_name.clone().unwrap_or_default(),
                    s.semester.clone(),
                    s.assigned_day.clone().unwrap_or_default(),
                    s.assigned_time.clone().unwrap_or_default(),
                    // end_time is never stored relationally
                    String::new(),
                    s.room_name.clone().unwrap_or_default(),
                    s.category.clone(),
                    s.course_level.to_string(),
                    s.credit_hours.to_string(),
                ]
            })
            .collect();
        self.write_document(COURSES_FILE, &COURSES_HEADER, &rows).await?;
        Ok(rows.len())
    }

    /// Every exported document lands in both stores: the data directory
    /// for the solving process and the blob store as canonical copy.
    async fn write_document(
        &self,
        filename: &str,
        headers: &[&str],
        rows: &[Vec<String>],
    ) -> Result<(), AppError> {
        let bytes = write_csv(headers, rows)?;
        tokio::fs::write(self.data_dir.join(filename), &bytes).await?;
        self.blobs.put(filename, &bytes).await?;
        Ok(())
    }
}
