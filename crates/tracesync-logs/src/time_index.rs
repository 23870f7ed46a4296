use std::sync::Arc;

use tracesync_types::Record;

use crate::error::StoreError;

/// A sequence sorted by non-decreasing timestamp
pub trait TimeOrdered {
    fn len(&self) -> usize;
    fn timestamp_at(&self, index: usize) -> i64;
}

impl TimeOrdered for [Arc<Record>] {
    fn len(&self) -> usize {
        <[Arc<Record>]>::len(self)
    }

    fn timestamp_at(&self, index: usize) -> i64 {
        self[index].timestamp()
    }
}

impl TimeOrdered for [i64] {
    fn len(&self) -> usize {
        <[i64]>::len(self)
    }

    fn timestamp_at(&self, index: usize) -> i64 {
        self[index]
    }
}

/// Subset of the store selected by a filtered view
///
/// `rows` holds ascending store indices, so the timestamps stay ordered.
pub struct FilteredRows<'a> {
    pub records: &'a [Arc<Record>],
    pub rows: &'a [usize],
}

impl TimeOrdered for FilteredRows<'_> {
    fn len(&self) -> usize {
        self.rows.len()
    }

    fn timestamp_at(&self, index: usize) -> i64 {
        self.records[self.rows[index]].timestamp()
    }
}

/// Index of the last element whose timestamp is at or before `target`
///
/// Targets before the first element clamp to 0; targets past the end land on the
/// last element. Fails only on an empty sequence.
pub fn nearest_index<T>(sequence: &T, target: i64) -> Result<usize, StoreError>
where
    T: TimeOrdered + ?Sized,
{
    let len = sequence.len();
    if len == 0 {
        return Err(StoreError::EmptyStore);
    }

    // First index with a timestamp strictly after the target
    let mut left = 0;
    let mut right = len;
    while left < right {
        let middle = left + (right - left) / 2;
        if sequence.timestamp_at(middle) <= target {
            left = middle + 1;
        } else {
            right = middle;
        }
    }

    Ok(left.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_index() {
        let timestamps: &[i64] = &[10, 20, 20, 35];
        assert_eq!(nearest_index(timestamps, 21), Ok(2));
        assert_eq!(nearest_index(timestamps, 5), Ok(0));
        assert_eq!(nearest_index(timestamps, 100), Ok(3));
        assert_eq!(nearest_index(timestamps, 20), Ok(2));
        assert_eq!(nearest_index(timestamps, 10), Ok(0));
        assert_eq!(nearest_index(timestamps, 34), Ok(2));
        assert_eq!(nearest_index(timestamps, 35), Ok(3));
    }

    #[test]
    fn test_empty_sequence() {
        let timestamps: &[i64] = &[];
        assert_eq!(nearest_index(timestamps, 1), Err(StoreError::EmptyStore));
    }

    #[test]
    fn test_single_element() {
        let timestamps: &[i64] = &[7];
        assert_eq!(nearest_index(timestamps, i64::MIN), Ok(0));
        assert_eq!(nearest_index(timestamps, i64::MAX), Ok(0));
    }

    #[test]
    fn test_records() {
        let records: Vec<Arc<Record>> = [10, 20, 20, 35]
            .into_iter()
            .map(|ts| Arc::new(Record::new("2", "core", ts, "")))
            .collect();
        assert_eq!(nearest_index(records.as_slice(), 21), Ok(2));
    }

    #[test]
    fn test_filtered_rows() {
        let records: Vec<Arc<Record>> = [10, 15, 20, 25, 30]
            .into_iter()
            .map(|ts| Arc::new(Record::new("2", "core", ts, "")))
            .collect();
        let rows = FilteredRows {
            records: &records,
            rows: &[0, 2, 4],
        };
        assert_eq!(nearest_index(&rows, 24), Ok(1));
        assert_eq!(nearest_index(&rows, 9), Ok(0));
        assert_eq!(nearest_index(&rows, 31), Ok(2));

        let none = FilteredRows {
            records: &records,
            rows: &[],
        };
        assert_eq!(nearest_index(&none, 20), Err(StoreError::EmptyStore));
    }
}
