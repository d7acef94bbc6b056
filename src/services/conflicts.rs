use std::collections::HashMap;

use serde::Serialize;
use sqlx::SqlitePool;

use crate::db::BlobStore;
use crate::error::AppError;
use crate::tabular::{Row, Table, join_key};

/// Placeholder values that never count as a double booking. Compared
/// through `join_key`, so matching is case-insensitive.
const ROOM_SENTINELS: [&str; 2] = ["", "unassigned"];
const LECTURER_SENTINELS: [&str; 2] = ["", "tbd"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    Room,
    Lecturer,
}

#[derive(Debug, Clone, Serialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub day: String,
    pub time: String,
    pub resource: String,
    pub first_course: String,
    pub second_course: String,
}

#[derive(Debug, Serialize)]
pub struct ConflictReport {
    pub conflicts: Vec<Conflict>,
    pub rows_scanned: usize,
}

struct Cols {
    code: Option<usize>,
    title: Option<usize>,
    day: usize,
    time: usize,
}

/// Scans a parsed timetable for double bookings. Rows are grouped by
/// normalized day and time slot; within a slot, the first row holding a
/// room or lecturer wins and every later row on the same resource is
/// reported against it, so k colliding rows produce k-1 conflicts.
///
/// Groups come out in first-encounter order. A document without day or
/// time columns yields an empty report rather than an error.
pub fn detect(table: &Table) -> ConflictReport {
    let rows_scanned = table.row_count();

    let (Some(day), Some(time)) = (table.column_or("day", 5), table.column_or("time", 6)) else {
        return ConflictReport { conflicts: Vec::new(), rows_scanned };
    };

    let cols = Cols {
        code: table.column_or("course_code", 0),
        title: table.column_or("course_title", 1),
        day,
        time,
    };
    let lecturer_col = table.column_or("lecturer_name", 3);
    let room_col = table.column_or("room_name", 4);

    let mut group_order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<Row<'_>>> = HashMap::new();
    for row in table.rows() {
        let key = format!("{}|{}", join_key(row.get(cols.day)), join_key(row.get(cols.time)));
        if !groups.contains_key(&key) {
            group_order.push(key.clone());
        }
        groups.entry(key).or_default().push(row);
    }

    let mut conflicts = Vec::new();
    for key in &group_order {
        let rows = &groups[key];
        scan_resource(rows, room_col, &ROOM_SENTINELS, ConflictKind::Room, &cols, &mut conflicts);
        scan_resource(rows, lecturer_col, &LECTURER_SENTINELS, ConflictKind::Lecturer, &cols, &mut conflicts);
    }

    ConflictReport { conflicts, rows_scanned }
}

fn scan_resource(
    rows: &[Row<'_>],
    resource_col: Option<usize>,
    sentinels: &[&str],
    kind: ConflictKind,
    cols: &Cols,
    out: &mut Vec<Conflict>,
) {
    let mut holders: HashMap<String, String> = HashMap::new();
    for row in rows {
        let resource = row.get_opt(resource_col);
        let resource_key = join_key(resource);
        if sentinels.contains(&resource_key.as_str()) {
            continue;
        }

        let course = course_label(row, cols);
        match holders.get(&resource_key) {
            Some(first) => out.push(Conflict {
                kind,
                day: row.get(cols.day).to_string(),
                time: row.get(cols.time).to_string(),
                resource: resource.to_string(),
                first_course: first.clone(),
                second_course: course,
            }),
            None => {
                holders.insert(resource_key, course);
            }
        }
    }
}

fn course_label(row: &Row<'_>, cols: &Cols) -> String {
    let code = row.get_opt(cols.code);
    if code.is_empty() {
        row.get_opt(cols.title).to_string()
    } else {
        code.to_string()
    }
}

/// Blob-backed entry point: fetches the named artifact, parses it and
/// runs the detector. Missing artifact is `NotFound`.
pub struct ConflictService {
    blobs: BlobStore,
}

impl ConflictService {
    pub fn new(db: SqlitePool) -> Self {
        Self { blobs: BlobStore::new(db) }
    }

    pub async fn check(&self, filename: &str) -> Result<ConflictReport, AppError> {
        let bytes = self.blobs.get(filename).await?;
        let table = Table::from_bytes(&bytes)?;
        Ok(detect(&table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Course Code,Course Title,Credit Hrs,Lecturer Name,Room Name,Day,Time\n";

    fn parse(rows: &str) -> Table {
        let csv = format!("{}{}", HEADER, rows);
        Table::from_bytes(csv.as_bytes()).expect("parse failed")
    }

    #[test]
    fn test_room_clash_in_same_slot() {
        let table = parse(
            "CS101,Intro,3,Dr. Ada,Lab A,Monday,8:00-10:00\n\
             MA201,Calc,3,Dr. Bob,Lab A,Monday,8:00-10:00\n",
        );
        let report = detect(&table);

        assert_eq!(report.rows_scanned, 2);
        assert_eq!(report.conflicts.len(), 1);
        let c = &report.conflicts[0];
        assert_eq!(c.kind, ConflictKind::Room);
        assert_eq!(c.resource, "Lab A");
        assert_eq!(c.first_course, "CS101");
        assert_eq!(c.second_course, "MA201");
        assert_eq!(c.day, "Monday");
    }

    #[test]
    fn test_k_rows_give_k_minus_one_conflicts_against_holder() {
        let table = parse(
            "CS101,A,3,L1,Lab A,Mon,8:00\n\
             MA201,B,3,L2,Lab A,Mon,8:00\n\
             PH301,C,3,L3,Lab A,Mon,8:00\n",
        );
        let report = detect(&table);

        let rooms: Vec<_> = report
            .conflicts
            .iter()
            .filter(|c| c.kind == ConflictKind::Room)
            .collect();
        assert_eq!(rooms.len(), 2);
        assert!(rooms.iter().all(|c| c.first_course == "CS101"));
        assert_eq!(rooms[0].second_course, "MA201");
        assert_eq!(rooms[1].second_course, "PH301");
    }

    #[test]
    fn test_different_slots_do_not_clash() {
        let table = parse(
            "CS101,A,3,Dr. Ada,Lab A,Monday,8:00\n\
             MA201,B,3,Dr. Ada,Lab A,Tuesday,8:00\n\
             PH301,C,3,Dr. Ada,Lab A,Monday,10:00\n",
        );
        let report = detect(&table);
        assert!(report.conflicts.is_empty());
    }

    #[test]
    fn test_sentinel_resources_are_skipped() {
        let table = parse(
            "CS101,A,3,TBD,Unassigned,Mon,8:00\n\
             MA201,B,3,tbd,UNASSIGNED,Mon,8:00\n\
             PH301,C,3,,,Mon,8:00\n",
        );
        let report = detect(&table);
        assert!(report.conflicts.is_empty());
    }

    #[test]
    fn test_lecturer_clash_and_double_report() {
        // Same lecturer and same room: the second row is reported twice,
        // once per resource kind.
        let table = parse(
            "CS101,A,3,Dr. Ada,Lab A,Mon,8:00\n\
             MA201,B,3,Dr. Ada,Lab A,Mon,8:00\n",
        );
        let report = detect(&table);

        assert_eq!(report.conflicts.len(), 2);
        assert_eq!(report.conflicts[0].kind, ConflictKind::Room);
        assert_eq!(report.conflicts[1].kind, ConflictKind::Lecturer);
        assert_eq!(report.conflicts[1].resource, "Dr. Ada");
    }

    #[test]
    fn test_lecturer_match_is_case_insensitive() {
        let table = parse(
            "CS101,A,3,Dr. Ada,Lab A,Mon,8:00\n\
             MA201,B,3,DR. ADA,Lab B,Mon,8:00\n",
        );
        let report = detect(&table);

        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.conflicts[0].kind, ConflictKind::Lecturer);
        assert_eq!(report.conflicts[0].first_course, "CS101");
    }

    #[test]
    fn test_groups_reported_in_encounter_order() {
        let table = parse(
            "CS101,A,3,L1,Lab A,Tuesday,8:00\n\
             MA201,B,3,L2,Lab B,Monday,8:00\n\
             CS102,C,3,L1b,Lab A,Tuesday,8:00\n\
             MA202,D,3,L2b,Lab B,Monday,8:00\n",
        );
        let report = detect(&table);

        assert_eq!(report.conflicts.len(), 2);
        // Tuesday was seen first, so its clash is reported first.
        assert_eq!(report.conflicts[0].day, "Tuesday");
        assert_eq!(report.conflicts[1].day, "Monday");
    }

    #[test]
    fn test_positional_fallback_without_known_headers() {
        // Seven unrecognized header names: positions 0/3/4/5/6 still apply.
        let csv = "c0,c1,c2,c3,c4,c5,c6\n\
                   CS101,A,3,L1,Lab A,Mon,8:00\n\
                   MA201,B,3,L2,Lab A,Mon,8:00\n";
        let table = Table::from_bytes(csv.as_bytes()).expect("parse failed");
        let report = detect(&table);

        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.conflicts[0].resource, "Lab A");
    }

    #[test]
    fn test_narrow_document_yields_empty_report() {
        let csv = "a,b\n1,2\n3,4\n";
        let table = Table::from_bytes(csv.as_bytes()).expect("parse failed");
        let report = detect(&table);

        assert!(report.conflicts.is_empty());
        assert_eq!(report.rows_scanned, 2);
    }

    #[test]
    fn test_empty_document_yields_empty_report() {
        let table = parse("");
        let report = detect(&table);
        assert!(report.conflicts.is_empty());
        assert_eq!(report.rows_scanned, 0);
    }

    #[test]
    fn test_blank_course_code_falls_back_to_title() {
        let table = parse(
            ",Algebra,3,L1,Lab A,Mon,8:00\n\
             CS101,B,3,L2,Lab A,Mon,8:00\n",
        );
        let report = detect(&table);

        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.conflicts[0].first_course, "Algebra");
    }
}
