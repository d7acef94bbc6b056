use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Lecturer {
    pub id: String,
    pub name: String,
    /// JSON array of weekday indices (0 = Monday .. 4 = Friday).
    pub availability: Option<String>,
}

impl Lecturer {
    pub fn available_days(&self) -> Vec<usize> {
        decode_availability(self.availability.as_deref())
    }
}

/// Decodes a stored availability value, failing open: NULL, corrupt JSON
/// or a non-array all read as a full teaching week. An empty array means
/// no available days. Indices outside the weekday range are ignored.
pub fn decode_availability(raw: Option<&str>) -> Vec<usize> {
    let full_week: Vec<usize> = (0..5).collect();
    let Some(raw) = raw else {
        return full_week;
    };
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_u64())
            .filter(|day| *day < 5)
            .map(|day| day as usize)
            .collect(),
        _ => full_week,
    }
}

/// Encodes day flags (Monday first) back to the stored JSON form.
pub fn encode_availability(day_flags: &[bool; 5]) -> String {
    let days: Vec<usize> = day_flags
        .iter()
        .enumerate()
        .filter(|(_, set)| **set)
        .map(|(day, _)| day)
        .collect();
    serde_json::to_string(&days).unwrap_or_else(|_| "[0,1,2,3,4]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_fails_open() {
        assert_eq!(decode_availability(None), vec![0, 1, 2, 3, 4]);
        assert_eq!(decode_availability(Some("not json")), vec![0, 1, 2, 3, 4]);
        assert_eq!(decode_availability(Some("{\"mon\":1}")), vec![0, 1, 2, 3, 4]);
        assert_eq!(decode_availability(Some("42")), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_decode_valid_arrays() {
        assert_eq!(decode_availability(Some("[0,2,4]")), vec![0, 2, 4]);
        // Empty array is a real answer, not a decode failure.
        assert_eq!(decode_availability(Some("[]")), Vec::<usize>::new());
        // Out-of-range and non-integer entries are dropped.
        assert_eq!(decode_availability(Some("[1,7,-2,\"x\"]")), vec![1]);
    }

    #[test]
    fn test_encode_round_trips_through_decode() {
        let encoded = encode_availability(&[true, false, true, false, false]);
        assert_eq!(decode_availability(Some(&encoded)), vec![0, 2]);

        let none = encode_availability(&[false; 5]);
        assert_eq!(decode_availability(Some(&none)), Vec::<usize>::new());
    }
}
