use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReportError>;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("{file}: could not parse configuration: {source}")]
    ConfigSyntax {
        file: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("{file}: [{section}]{}: {message}", key_label(.key.as_deref()))]
    Config {
        file: String,
        section: String,
        key: Option<String>,
        message: String,
    },

    #[error("{file}: {message}")]
    Header { file: String, message: String },

    #[error("{file}: row {row} ({identity}): column `{column}` value `{value}` {message}")]
    Data {
        file: String,
        row: usize,
        identity: String,
        column: String,
        value: String,
        message: String,
    },

    #[error("row {row}: column `{column}` value `{value}` {message}")]
    Format {
        row: usize,
        column: String,
        value: String,
        message: String,
    },

    #[error(
        "cannot pair {datasets} dataset(s) with {configs} configuration(s): \
         pass one configuration for all datasets or one per dataset"
    )]
    Arity { datasets: usize, configs: usize },

    #[error(
        "{} and {} would both write outputs named `{stem}`; rename one dataset",
        .first.display(),
        .second.display()
    )]
    OutputClash {
        stem: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("row {row}: report column `{column}` is missing from the graded record")]
    MissingColumn { row: usize, column: String },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{file}: {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },
}

impl ReportError {
    pub fn config(
        file: &str,
        section: &str,
        key: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        ReportError::Config {
            file: file.to_string(),
            section: section.to_string(),
            key: key.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReportError::Io {
            path: path.into(),
            source,
        }
    }
}

fn key_label(key: Option<&str>) -> String {
    key.map(|k| format!(" {k}")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_message_names_file_section_and_key() {
        let err = ReportError::config("grading.toml", "Weights", Some("hw"), "missing");
        assert_eq!(err.to_string(), "grading.toml: [Weights] hw: missing");
    }

    #[test]
    fn config_message_without_key() {
        let err = ReportError::config("grading.toml", "TotalMarks", None, "section is empty");
        assert_eq!(err.to_string(), "grading.toml: [TotalMarks]: section is empty");
    }

    #[test]
    fn arity_message_reports_both_counts() {
        let err = ReportError::Arity {
            datasets: 3,
            configs: 2,
        };
        let message = err.to_string();
        assert!(message.contains("3 dataset(s)"));
        assert!(message.contains("2 configuration(s)"));
    }
}
