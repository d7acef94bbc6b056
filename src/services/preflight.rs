use std::collections::{HashMap, HashSet};

use serde::Serialize;
use sqlx::SqlitePool;

use crate::db::repository;
use crate::error::AppError;
use crate::models::decode_availability;
use crate::services::{COURSES_FILE, ROOMS_FILE};
use crate::tabular::join_key;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    DuplicateCourseCode,
    SectionWithoutLecturer,
    SectionWithoutRoom,
    UnscheduledSection,
    CorruptAvailability,
    NoAvailableDays,
    BadCapacity,
    MissingCoreFile,
}

#[derive(Debug, Serialize)]
pub struct PreflightFinding {
    pub kind: FindingKind,
    pub subject: String,
    pub detail: String,
}

#[derive(Debug, Serialize)]
pub struct PreflightReport {
    pub rooms: i64,
    pub lecturers: i64,
    pub courses: i64,
    pub sections: i64,
    pub findings: Vec<PreflightFinding>,
}

/// Read-only sweep over the relational store. Findings are reported,
/// never enforced; in particular duplicate course codes are legal data
/// that the rest of the engine handles.
pub async fn run(db: &SqlitePool) -> Result<PreflightReport, AppError> {
    let mut findings = Vec::new();

    let courses = repository::fetch_courses(db).await?;
    let mut counts: HashMap<String, usize> = HashMap::new();
    for course in &courses {
        *counts.entry(join_key(&course.code)).or_insert(0) += 1;
    }
    let mut reported: HashSet<String> = HashSet::new();
    for course in &courses {
        let key = join_key(&course.code);
        if counts[&key] > 1 && reported.insert(key.clone()) {
            findings.push(PreflightFinding {
                kind: FindingKind::DuplicateCourseCode,
                subject: course.code.clone(),
                detail: format!("{} courses share this code", counts[&key]),
            });
        }
    }

    type SectionHealth = (String, Option<String>, Option<String>, Option<String>, Option<String>);
    let rows: Vec<SectionHealth> = sqlx::query_as(
        "SELECT c.code, s.lecturer_id, s.room_id, s.assigned_day, s.assigned_time \
         FROM sections s JOIN courses c ON c.id = s.course_id \
         ORDER BY c.code, s.rowid",
    )
    .fetch_all(db)
    .await?;
    for (code, lecturer_id, room_id, assigned_day, assigned_time) in rows {
        if lecturer_id.is_none() {
            findings.push(PreflightFinding {
                kind: FindingKind::SectionWithoutLecturer,
                subject: code.clone(),
                detail: "section has no lecturer".to_string(),
            });
        }
        if room_id.is_none() {
            findings.push(PreflightFinding {
                kind: FindingKind::SectionWithoutRoom,
                subject: code.clone(),
                detail: "section has no room".to_string(),
            });
        }
        let day_missing = assigned_day.as_deref().unwrap_or("").is_empty();
        let time_missing = assigned_time.as_deref().unwrap_or("").is_empty();
        if day_missing || time_missing {
            findings.push(PreflightFinding {
                kind: FindingKind::UnscheduledSection,
                subject: code,
                detail: "section has no assigned day or time".to_string(),
            });
        }
    }

    for lecturer in repository::fetch_lecturers(db).await? {
        if let Some(raw) = lecturer.availability.as_deref() {
            let valid = matches!(
                serde_json::from_str::<serde_json::Value>(raw),
                Ok(serde_json::Value::Array(_))
            );
            if !valid {
                findings.push(PreflightFinding {
                    kind: FindingKind::CorruptAvailability,
                    subject: lecturer.name,
                    detail: "availability is not a JSON array, exports fail open".to_string(),
                });
                continue;
            }
        }
        // An empty set is a real answer meaning "no day works", which
        // leaves the solver nothing to assign.
        if decode_availability(lecturer.availability.as_deref()).is_empty() {
            findings.push(PreflightFinding {
                kind: FindingKind::NoAvailableDays,
                subject: lecturer.name,
                detail: "lecturer has no available days".to_string(),
            });
        }
    }

    for room in repository::fetch_rooms(db).await? {
        if room.capacity < 1 {
            findings.push(PreflightFinding {
                kind: FindingKind::BadCapacity,
                subject: room.room_name,
                detail: format!("capacity is {}", room.capacity),
            });
        }
    }

    // The solving process cannot start without these two documents.
    for filename in [ROOMS_FILE, COURSES_FILE] {
        let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM csv_files WHERE filename = ?")
            .bind(filename)
            .fetch_one(db)
            .await?;
        if stored == 0 {
            findings.push(PreflightFinding {
                kind: FindingKind::MissingCoreFile,
                subject: filename.to_string(),
                detail: "core document missing from the blob store".to_string(),
            });
        }
    }

    Ok(PreflightReport {
        rooms: count(db, "rooms").await?,
        lecturers: count(db, "lecturers").await?,
        courses: courses.len() as i64,
        sections: count(db, "sections").await?,
        findings,
    })
}

async fn count(db: &SqlitePool, table: &str) -> Result<i64, AppError> {
    // Table names come from the fixed call sites above, never from input.
    let sql = format!("SELECT COUNT(*) FROM {}", table);
    let n: i64 = sqlx::query_scalar(&sql).fetch_one(db).await?;
    Ok(n)
}
