use std::io::Read;

use csv::{ReaderBuilder, StringRecord, Writer};

use crate::error::AppError;

/// Normalizes a header cell for name-based column lookup:
/// trimmed, ASCII-lowercased, spaces to underscores.
fn normalize_header(raw: &str) -> String {
    raw.trim().to_ascii_lowercase().replace(' ', "_")
}

/// Normalizes a value for cross-store identity matching. Every
/// name-based join (lecturers, rooms, course codes) goes through this.
pub fn join_key(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

/// Rejects keys that could escape the blob namespace or the data
/// directory when materialized.
pub fn validate_csv_filename(filename: &str) -> Result<(), AppError> {
    if filename.trim().is_empty() {
        return Err(AppError::Validation("filename must not be empty".to_string()));
    }
    if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
        return Err(AppError::Validation(format!("unsafe filename: {}", filename)));
    }
    if !filename.ends_with(".csv") {
        return Err(AppError::Validation(format!("expected a .csv filename: {}", filename)));
    }
    Ok(())
}

/// A parsed tabular document: one normalized header row plus data rows.
/// Blank rows are dropped at parse time.
pub struct Table {
    headers: Vec<String>,
    records: Vec<StringRecord>,
}

impl Table {
    pub fn from_reader<R: Read>(reader: R) -> Result<Table, AppError> {
        let mut csv_reader = ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = csv_reader.headers()?.iter().map(normalize_header).collect();

        let mut records = Vec::new();
        let mut record = StringRecord::new();
        while csv_reader.read_record(&mut record)? {
            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            records.push(record.clone());
        }

        Ok(Table { headers, records })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Table, AppError> {
        Table::from_reader(bytes)
    }

    /// Header-driven column lookup. Tolerates reordered and extra columns.
    pub fn column(&self, name: &str) -> Option<usize> {
        let wanted = normalize_header(name);
        self.headers.iter().position(|h| *h == wanted)
    }

    /// Header lookup first; when the header is absent, falls back to the
    /// fixed position known from the writer, provided the document is wide
    /// enough to cover it.
    pub fn column_or(&self, name: &str, fallback: usize) -> Option<usize> {
        self.column(name).or_else(|| {
            if fallback < self.headers.len() {
                Some(fallback)
            } else {
                None
            }
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.records.iter().map(Row)
    }

    pub fn row_count(&self) -> usize {
        self.records.len()
    }
}

#[derive(Clone, Copy)]
pub struct Row<'a>(&'a StringRecord);

impl<'a> Row<'a> {
    /// Trimmed cell value; `""` when the row is too short.
    pub fn get(&self, idx: usize) -> &'a str {
        self.0.get(idx).map(str::trim).unwrap_or("")
    }

    /// Cell addressed by an optional column index, as returned by
    /// `Table::column`. `""` when the column is unresolved.
    pub fn get_opt(&self, idx: Option<usize>) -> &'a str {
        idx.map(|i| self.get(i)).unwrap_or("")
    }
}

/// Serializes a header row plus data rows to CSV bytes.
pub fn write_csv(headers: &[&str], rows: &[Vec<String>]) -> Result<Vec<u8>, AppError> {
    let mut buf = Vec::new();
    {
        let mut writer = Writer::from_writer(&mut buf);
        writer.write_record(headers)?;
        for row in rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_lookup_survives_reordering() {
        let csv = "capacity, Room Name \n40,Lab A\n";
        let table = Table::from_bytes(csv.as_bytes()).expect("parse failed");

        let name_col = table.column("room_name").expect("room_name not found");
        let cap_col = table.column("capacity").expect("capacity not found");

        let row = table.rows().next().expect("no rows");
        assert_eq!(row.get(name_col), "Lab A");
        assert_eq!(row.get(cap_col), "40");
    }

    #[test]
    fn test_positional_fallback_when_header_missing() {
        let csv = "a,b,c\nx,y,z\n";
        let table = Table::from_bytes(csv.as_bytes()).expect("parse failed");

        // Unknown header, position 1 is covered.
        assert_eq!(table.column_or("lecturer_name", 1), Some(1));
        // Unknown header, position 5 is out of range.
        assert_eq!(table.column_or("day", 5), None);
    }

    #[test]
    fn test_header_match_wins_over_fallback() {
        let csv = "day,time,course_code\nMon,8:00,CS101\n";
        let table = Table::from_bytes(csv.as_bytes()).expect("parse failed");

        // The writer puts course_code at 0, but this document names it at 2.
        assert_eq!(table.column_or("course_code", 0), Some(2));
    }

    #[test]
    fn test_blank_rows_dropped_and_cells_trimmed() {
        let csv = "room_name,capacity\n Lab A ,40\n,\n  ,  \nLab B,\n";
        let table = Table::from_bytes(csv.as_bytes()).expect("parse failed");

        assert_eq!(table.row_count(), 2);
        let rows: Vec<_> = table.rows().collect();
        assert_eq!(rows[0].get(0), "Lab A");
        assert_eq!(rows[1].get(1), "");
        // Out-of-range access is empty, not a panic.
        assert_eq!(rows[1].get(9), "");
    }

    #[test]
    fn test_short_rows_tolerated_by_flexible_parse() {
        let csv = "a,b,c\nonly_one\n1,2,3\n";
        let table = Table::from_bytes(csv.as_bytes()).expect("parse failed");

        assert_eq!(table.row_count(), 2);
        let rows: Vec<_> = table.rows().collect();
        assert_eq!(rows[0].get(0), "only_one");
        assert_eq!(rows[0].get(2), "");
    }

    #[test]
    fn test_join_key_folds_case_and_whitespace() {
        assert_eq!(join_key("  Dr. ADA Lovelace "), "dr. ada lovelace");
        assert_eq!(join_key("CS101"), "cs101");
        assert_eq!(join_key(""), "");
    }

    #[test]
    fn test_filename_validation() {
        assert!(validate_csv_filename("rooms.csv").is_ok());
        assert!(validate_csv_filename("schedule_results.csv").is_ok());
        assert!(validate_csv_filename("").is_err());
        assert!(validate_csv_filename("   ").is_err());
        assert!(validate_csv_filename("../etc/passwd.csv").is_err());
        assert!(validate_csv_filename("dir/rooms.csv").is_err());
        assert!(validate_csv_filename("rooms.txt").is_err());
    }

    #[test]
    fn test_write_csv_parses_back() {
        let rows = vec![
            vec!["Lab A".to_string(), "40".to_string()],
            vec!["Hall, West".to_string(), "200".to_string()],
        ];
        let bytes = write_csv(&["room_name", "capacity"], &rows).expect("write failed");

        let table = Table::from_bytes(&bytes).expect("parse failed");
        assert_eq!(table.row_count(), 2);
        let parsed: Vec<_> = table.rows().collect();
        assert_eq!(parsed[0].get(0), "Lab A");
        // Embedded comma survives quoting.
        assert_eq!(parsed[1].get(0), "Hall, West");
        assert_eq!(table.column("capacity"), Some(1));
    }
}
