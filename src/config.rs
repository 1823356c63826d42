use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{ReportError, Result};
use crate::models::Grade;

pub const TOTAL_MARKS: &str = "TotalMarks";
pub const WEIGHTS: &str = "Weights";
pub const GRADE_THRESHOLDS: &str = "GradeThresholds";
pub const REPORT_SETTINGS: &str = "ReportSettings";

pub const REQUIRED_SECTIONS: [&str; 4] = [TOTAL_MARKS, WEIGHTS, GRADE_THRESHOLDS, REPORT_SETTINGS];

pub type Section = BTreeMap<String, String>;

#[derive(Debug, Clone, Default)]
pub struct ConfigSource {
    pub file: String,
    pub sections: BTreeMap<String, Section>,
}

#[derive(Deserialize)]
#[serde(transparent)]
struct RawFile(BTreeMap<String, BTreeMap<String, toml::Value>>);

impl ConfigSource {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ReportError::io(path, source))?;
        Self::parse(&path.display().to_string(), &text)
    }

    pub fn parse(file: &str, text: &str) -> Result<Self> {
        let RawFile(raw) = toml::from_str(text).map_err(|source| ReportError::ConfigSyntax {
            file: file.to_string(),
            source,
        })?;

        let mut sections = BTreeMap::new();
        for (name, entries) in raw {
            let mut section = Section::new();
            for (key, value) in entries {
                let text = value_text(&value).ok_or_else(|| {
                    ReportError::config(
                        file,
                        &name,
                        Some(&key),
                        format!("expected a string, number or boolean, found {}", value.type_str()),
                    )
                })?;
                section.insert(key, text);
            }
            sections.insert(name, section);
        }

        Ok(Self {
            file: file.to_string(),
            sections,
        })
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }
}

fn value_text(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(text) => Some(text.clone()),
        toml::Value::Integer(number) => Some(number.to_string()),
        toml::Value::Float(number) => Some(number.to_string()),
        toml::Value::Boolean(flag) => Some(flag.to_string()),
        toml::Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .map(|items| items.join(", ")),
        _ => None,
    }
}

/// Minimum totals for every band above `F`, highest band first.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeThresholds {
    bands: Vec<(Grade, f64)>,
}

impl GradeThresholds {
    /// `bands` must follow [`Grade::BANDS`] order.
    pub fn new(bands: Vec<(Grade, f64)>) -> Self {
        Self { bands }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Grade, f64)> + '_ {
        self.bands.iter().copied()
    }

    pub fn inversions(&self) -> Vec<(Grade, Grade)> {
        self.bands
            .windows(2)
            .filter(|pair| pair[1].1 > pair[0].1)
            .map(|pair| (pair[0].0, pair[1].0))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplaySettings {
    pub pass_color: Option<String>,
    pub fail_color: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportSettings {
    pub title: String,
    pub treat_missing_as_zero: bool,
    pub columns: Vec<String>,
    pub include_total_marks: bool,
    pub include_overall_grade: bool,
    pub primary_key: String,
    pub secondary_key: Option<String>,
    pub display: DisplaySettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradingConfig {
    pub total_marks: BTreeMap<String, u32>,
    pub weights: BTreeMap<String, f64>,
    pub thresholds: GradeThresholds,
    pub report: ReportSettings,
}

pub fn split_columns(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|column| !column.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}
