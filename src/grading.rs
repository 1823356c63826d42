use crate::config::{GradeThresholds, GradingConfig};
use crate::error::{ReportError, Result};
use crate::models::{Cell, Grade, StudentRecord};
use crate::validate::parse_number;

/// Replaces each graded column with its weighted contribution and appends
/// `Total` and `Grade`. Rows come back in input order.
pub fn grade(config: &GradingConfig, records: &[StudentRecord]) -> Result<Vec<StudentRecord>> {
    let graded = records
        .iter()
        .enumerate()
        .map(|(index, record)| grade_record(config, index + 1, record))
        .collect::<Result<Vec<_>>>()?;

    tracing::info!(rows = graded.len(), "rows graded");
    Ok(graded)
}

fn grade_record(config: &GradingConfig, row: usize, record: &StudentRecord) -> Result<StudentRecord> {
    let mut graded = record.clone();
    let mut total = 0.0;

    for (column, weight) in &config.weights {
        let raw = record.text(column);
        let value = if raw.is_empty() && config.report.treat_missing_as_zero {
            0.0
        } else {
            parse_number(&raw).ok_or_else(|| ReportError::Format {
                row,
                column: column.clone(),
                value: raw.clone(),
                message: if raw.is_empty() {
                    "is missing".to_string()
                } else {
                    "is not a number".to_string()
                },
            })?
        };

        // Validation guarantees every weighted column has a maximum.
        let maximum = config.total_marks.get(column).copied().unwrap_or(1);
        let weighted = value / f64::from(maximum) * weight;
        graded.set(column, Cell::Number(weighted));
        total += weighted;
    }

    graded.set("Total", Cell::Number(total));
    graded.set("Grade", Cell::Grade(classify(&config.thresholds, total)));
    Ok(graded)
}

/// First band from the top whose threshold `total` reaches, else `F`.
pub fn classify(thresholds: &GradeThresholds, total: f64) -> Grade {
    thresholds
        .iter()
        .find(|(_, minimum)| total >= *minimum)
        .map(|(grade, _)| grade)
        .unwrap_or(Grade::F)
}
