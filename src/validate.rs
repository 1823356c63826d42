use std::collections::BTreeMap;

use crate::config::{
    parse_bool, split_columns, ConfigSource, DisplaySettings, GradeThresholds, GradingConfig,
    ReportSettings, Section, GRADE_THRESHOLDS, REPORT_SETTINGS, REQUIRED_SECTIONS, TOTAL_MARKS,
    WEIGHTS,
};
use crate::dataset::Dataset;
use crate::error::{ReportError, Result};
use crate::models::{Grade, StudentRecord};

pub fn validate(source: &ConfigSource, dataset: &Dataset) -> Result<GradingConfig> {
    let config = config(source)?;
    self::dataset(&config, dataset)?;
    Ok(config)
}

/// Builds the typed configuration, checking sections in a fixed order.
pub fn config(source: &ConfigSource) -> Result<GradingConfig> {
    let file = source.file.as_str();

    for name in REQUIRED_SECTIONS {
        if source.section(name).is_none() {
            return Err(ReportError::config(
                file,
                name,
                None,
                "required section is missing",
            ));
        }
    }
    let section = |name: &str| source.section(name).cloned().unwrap_or_default();

    let total_marks = total_marks(file, &section(TOTAL_MARKS))?;
    let weights = weights(file, &section(WEIGHTS), &total_marks)?;
    let thresholds = thresholds(file, &section(GRADE_THRESHOLDS))?;
    let report = report_settings(file, &section(REPORT_SETTINGS), &total_marks)?;

    for (upper, lower) in thresholds.inversions() {
        tracing::warn!(
            file,
            "threshold for {lower} is above {upper}; the first band from the top still wins"
        );
    }

    tracing::debug!(file, graded = total_marks.len(), "configuration accepted");
    Ok(GradingConfig {
        total_marks,
        weights,
        thresholds,
        report,
    })
}

fn total_marks(file: &str, section: &Section) -> Result<BTreeMap<String, u32>> {
    if section.is_empty() {
        return Err(ReportError::config(
            file,
            TOTAL_MARKS,
            None,
            "at least one graded column is required",
        ));
    }

    section
        .iter()
        .map(|(column, raw)| match raw.trim().parse::<u32>() {
            Ok(value) if value >= 1 => Ok((column.clone(), value)),
            _ => Err(ReportError::config(
                file,
                TOTAL_MARKS,
                Some(column),
                format!("`{raw}` is not a positive integer"),
            )),
        })
        .collect()
}

fn weights(
    file: &str,
    section: &Section,
    total_marks: &BTreeMap<String, u32>,
) -> Result<BTreeMap<String, f64>> {
    if let Some(column) = total_marks.keys().find(|column| !section.contains_key(*column)) {
        return Err(ReportError::config(
            file,
            WEIGHTS,
            Some(column),
            format!("`{column}` is listed in [{TOTAL_MARKS}] but has no weight"),
        ));
    }
    if let Some(column) = section.keys().find(|column| !total_marks.contains_key(*column)) {
        return Err(ReportError::config(
            file,
            WEIGHTS,
            Some(column),
            format!("`{column}` has a weight but is not listed in [{TOTAL_MARKS}]"),
        ));
    }

    section
        .iter()
        .map(|(column, raw)| {
            parse_number(raw)
                .map(|weight| (column.clone(), weight))
                .ok_or_else(|| {
                    ReportError::config(
                        file,
                        WEIGHTS,
                        Some(column),
                        format!("`{raw}` is not a number"),
                    )
                })
        })
        .collect()
}

fn thresholds(file: &str, section: &Section) -> Result<GradeThresholds> {
    if let Some(grade) = Grade::ALL
        .into_iter()
        .find(|grade| !section.contains_key(grade.label()))
    {
        return Err(ReportError::config(
            file,
            GRADE_THRESHOLDS,
            Some(grade.label()),
            "grade label is missing",
        ));
    }

    let bands = Grade::BANDS
        .into_iter()
        .map(|grade| {
            let raw = &section[grade.label()];
            parse_number(raw).map(|value| (grade, value)).ok_or_else(|| {
                ReportError::config(
                    file,
                    GRADE_THRESHOLDS,
                    Some(grade.label()),
                    format!("`{raw}` is not a number"),
                )
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(GradeThresholds::new(bands))
}

fn report_settings(
    file: &str,
    section: &Section,
    total_marks: &BTreeMap<String, u32>,
) -> Result<ReportSettings> {
    let required = |key: &str| {
        section.get(key).ok_or_else(|| {
            ReportError::config(file, REPORT_SETTINGS, Some(key), "required key is missing")
        })
    };
    let flag = |key: &str, raw: &str| {
        parse_bool(raw).ok_or_else(|| {
            ReportError::config(
                file,
                REPORT_SETTINGS,
                Some(key),
                format!("`{raw}` is not a boolean"),
            )
        })
    };
    let optional_flag = |key: &str| match section.get(key) {
        Some(raw) => flag(key, raw.as_str()),
        None => Ok(true),
    };

    let title = required("reportTitle")?.clone();
    let treat_missing_as_zero = flag(
        "treatMissingAsZero",
        required("treatMissingAsZero")?.as_str(),
    )?;
    let columns = split_columns(required("columns")?);

    if let Some(column) = total_marks.keys().find(|column| !columns.contains(*column)) {
        return Err(ReportError::config(
            file,
            REPORT_SETTINGS,
            Some("columns"),
            format!("graded column `{column}` is not listed"),
        ));
    }

    let include_total_marks = optional_flag("includeTotalMarks")?;
    let include_overall_grade = optional_flag("includeOverallGrade")?;

    let listed = |key: &str| -> Result<Option<String>> {
        match section.get(key).map(|raw| raw.trim()) {
            None | Some("") => Ok(None),
            Some(column) if columns.iter().any(|listed| listed == column) => {
                Ok(Some(column.to_string()))
            }
            Some(column) => Err(ReportError::config(
                file,
                REPORT_SETTINGS,
                Some(key),
                format!("`{column}` is not one of the report columns"),
            )),
        }
    };
    let primary_key = match listed("primaryKey")? {
        Some(column) => column,
        None => columns.first().cloned().unwrap_or_default(),
    };
    let secondary_key = listed("secondaryKey")?;

    let display = DisplaySettings {
        pass_color: section.get("passColor").cloned(),
        fail_color: section.get("failColor").cloned(),
    };

    Ok(ReportSettings {
        title,
        treat_missing_as_zero,
        columns,
        include_total_marks,
        include_overall_grade,
        primary_key,
        secondary_key,
        display,
    })
}

/// Checks the header row, then every graded value, row by row.
pub fn dataset(config: &GradingConfig, dataset: &Dataset) -> Result<()> {
    let file = dataset.file.as_str();

    if dataset.is_headerless() {
        return Err(ReportError::Header {
            file: file.to_string(),
            message: "dataset has no header row".to_string(),
        });
    }
    if let Some(column) = config
        .total_marks
        .keys()
        .find(|column| !dataset.headers.contains(*column))
    {
        return Err(ReportError::Header {
            file: file.to_string(),
            message: format!("graded column `{column}` is missing from the header row"),
        });
    }

    for (index, record) in dataset.records.iter().enumerate() {
        let row = index + 1;
        for (column, &maximum) in &config.total_marks {
            let raw = record.text(column);
            if raw.is_empty() {
                continue;
            }

            let failure = |message: String| ReportError::Data {
                file: file.to_string(),
                row,
                identity: identity(config, record),
                column: column.clone(),
                value: raw.clone(),
                message,
            };
            let value = parse_number(&raw).ok_or_else(|| failure("is not a number".into()))?;
            if value > f64::from(maximum) {
                return Err(failure(format!("exceeds the maximum of {maximum}")));
            }
        }
    }

    tracing::debug!(file, rows = dataset.records.len(), "dataset accepted");
    Ok(())
}

pub fn identity(config: &GradingConfig, record: &StudentRecord) -> String {
    let settings = &config.report;
    let parts: Vec<String> = std::iter::once(&settings.primary_key)
        .chain(settings.secondary_key.as_ref())
        .filter_map(|column| {
            let value = record.text(column);
            (!value.is_empty()).then(|| format!("{column}={value}"))
        })
        .collect();

    if parts.is_empty() {
        "unidentified student".to_string()
    } else {
        parts.join(", ")
    }
}

pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[TotalMarks]
hw = 10
exam = 100

[Weights]
hw = 50
exam = 50

[GradeThresholds]
"A+" = 95
A = 85
"B+" = 75
B = 65
"C+" = 55
C = 45
D = 35
F = 0

[ReportSettings]
reportTitle = "Term Report"
treatMissingAsZero = false
columns = "id, name, subject, hw, exam"
primaryKey = "id"
secondaryKey = "name"
"#;

    fn source(text: &str) -> ConfigSource {
        ConfigSource::parse("grading.toml", text).unwrap()
    }

    fn without_line(needle: &str) -> String {
        CONFIG
            .lines()
            .filter(|line| !line.starts_with(needle))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn load(text: &str) -> Dataset {
        Dataset::from_reader("marks.csv", text.as_bytes()).unwrap()
    }

    #[test]
    fn accepts_a_complete_configuration() {
        let config = config(&source(CONFIG)).unwrap();
        assert_eq!(config.total_marks["hw"], 10);
        assert_eq!(config.weights["exam"], 50.0);
        assert_eq!(config.report.columns.len(), 5);
        assert_eq!(config.report.primary_key, "id");
        assert_eq!(config.report.secondary_key.as_deref(), Some("name"));
        assert!(config.report.include_total_marks);
        assert!(config.report.include_overall_grade);
    }

    #[test]
    fn missing_section_is_named() {
        let text = CONFIG.replace("[Weights]", "[Weighting]");
        let err = config(&source(&text)).unwrap_err();
        assert!(err.to_string().contains("[Weights]"), "{err}");
    }

    #[test]
    fn total_marks_must_be_positive_integers() {
        let err = config(&source(&CONFIG.replace("hw = 10", "hw = 0"))).unwrap_err();
        assert!(err.to_string().contains("[TotalMarks] hw"), "{err}");

        let err = config(&source(&CONFIG.replace("hw = 10", "hw = 9.5"))).unwrap_err();
        assert!(err.to_string().contains("not a positive integer"), "{err}");
    }

    #[test]
    fn weight_missing_for_graded_column() {
        let text = CONFIG.replacen("hw = 50\n", "", 1);
        let err = config(&source(&text)).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("[Weights] hw"), "{message}");
        assert!(message.contains("has no weight"), "{message}");
    }

    #[test]
    fn weight_for_unknown_column() {
        let text = CONFIG.replace("exam = 50", "exam = 50\nquiz = 5");
        let err = config(&source(&text)).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("[Weights] quiz"), "{message}");
        assert!(message.contains("not listed in [TotalMarks]"), "{message}");
    }

    #[test]
    fn every_grade_label_is_required() {
        let err = config(&source(&without_line("\"C+\""))).unwrap_err();
        assert!(err.to_string().contains("[GradeThresholds] C+"), "{err}");

        let err = config(&source(&without_line("F ="))).unwrap_err();
        assert!(err.to_string().contains("[GradeThresholds] F"), "{err}");
    }

    #[test]
    fn report_settings_keys_are_required() {
        for key in ["reportTitle", "treatMissingAsZero", "columns"] {
            let err = config(&source(&without_line(key))).unwrap_err();
            assert!(
                err.to_string().contains(&format!("[ReportSettings] {key}")),
                "{err}"
            );
        }
    }

    #[test]
    fn columns_must_cover_graded_columns() {
        let text = CONFIG.replace("name, subject, hw, exam", "name, subject, hw");
        let err = config(&source(&text)).unwrap_err();
        assert!(err.to_string().contains("`exam` is not listed"), "{err}");
    }

    #[test]
    fn primary_key_defaults_to_first_column() {
        let config = config(&source(&without_line("primaryKey"))).unwrap();
        assert_eq!(config.report.primary_key, "id");
    }

    #[test]
    fn non_monotonic_thresholds_are_accepted() {
        let config = config(&source(&CONFIG.replace("A = 85", "A = 99"))).unwrap();
        assert_eq!(
            config.thresholds.inversions(),
            vec![(Grade::APlus, Grade::A)]
        );
    }

    #[test]
    fn header_must_contain_graded_columns() {
        let config = config(&source(CONFIG)).unwrap();
        let err = dataset_check(&config, "id,name,hw\n1,Avery,8\n");
        assert!(err.contains("`exam` is missing from the header row"), "{err}");
    }

    #[test]
    fn empty_file_has_no_header() {
        let config = config(&source(CONFIG)).unwrap();
        let err = dataset_check(&config, "");
        assert!(err.contains("no header row"), "{err}");
    }

    #[test]
    fn value_above_maximum_cites_row_column_value_and_maximum() {
        let config = config(&source(CONFIG)).unwrap();
        let err = dataset_check(
            &config,
            "id,name,subject,hw,exam\n1,Avery,Math,8,70\n2,Jules,Math,12,80\n",
        );
        assert!(err.contains("row 2"), "{err}");
        assert!(err.contains("id=2, name=Jules"), "{err}");
        assert!(err.contains("`hw`"), "{err}");
        assert!(err.contains("`12`"), "{err}");
        assert!(err.contains("maximum of 10"), "{err}");
    }

    #[test]
    fn non_numeric_value_is_rejected() {
        let config = config(&source(CONFIG)).unwrap();
        let err = dataset_check(&config, "id,name,subject,hw,exam\n1,Avery,Math,eight,70\n");
        assert!(err.contains("row 1"), "{err}");
        assert!(err.contains("is not a number"), "{err}");
    }

    #[test]
    fn empty_values_are_skipped_whatever_the_missing_policy() {
        for policy in ["false", "true"] {
            let text = CONFIG.replace(
                "treatMissingAsZero = false",
                &format!("treatMissingAsZero = {policy}"),
            );
            let config = config(&source(&text)).unwrap();
            let data = load("id,name,subject,hw,exam\n1,Avery,Math,,70\n");
            assert!(super::dataset(&config, &data).is_ok());
        }
    }

    fn dataset_check(config: &GradingConfig, text: &str) -> String {
        super::dataset(config, &load(text))
            .unwrap_err()
            .to_string()
    }
}
