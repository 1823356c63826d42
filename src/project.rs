use crate::config::{GradingConfig, ReportSettings};
use crate::error::{ReportError, Result};
use crate::models::{ReportRow, StudentRecord};

pub fn report_columns(settings: &ReportSettings) -> Vec<String> {
    let mut columns = settings.columns.clone();
    for (enabled, derived) in [
        (settings.include_total_marks, "Total"),
        (settings.include_overall_grade, "Grade"),
    ] {
        if enabled && !columns.iter().any(|column| column == derived) {
            columns.push(derived.to_string());
        }
    }
    columns
}

/// Narrows graded records to exactly the report columns, in report order.
pub fn project(config: &GradingConfig, records: &[StudentRecord]) -> Result<Vec<ReportRow>> {
    let columns = report_columns(&config.report);

    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            columns
                .iter()
                .map(|column| {
                    record
                        .get(column)
                        .cloned()
                        .map(|cell| (column.as_str(), cell))
                        .ok_or_else(|| ReportError::MissingColumn {
                            row: index + 1,
                            column: column.clone(),
                        })
                })
                .collect::<Result<ReportRow>>()
        })
        .collect()
}
