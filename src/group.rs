use crate::models::{ReportRow, StudentGroup};

/// Splits rows into runs that share a `primary_key` value.
pub fn group(rows: &[ReportRow], primary_key: &str) -> Vec<StudentGroup> {
    let mut groups = Vec::new();
    let mut current = StudentGroup {
        key: rows.first().map(|row| row.text(primary_key)).unwrap_or_default(),
        rows: Vec::new(),
    };

    for row in rows {
        let key = row.text(primary_key);
        if key != current.key {
            let next = StudentGroup {
                key,
                rows: Vec::new(),
            };
            groups.push(std::mem::replace(&mut current, next));
        }
        current.rows.push(row.clone());
    }
    groups.push(current);

    tracing::debug!(groups = groups.len(), "rows grouped by {primary_key}");
    groups
}
