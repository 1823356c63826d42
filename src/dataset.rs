use std::io::Read;
use std::path::Path;

use crate::error::{ReportError, Result};
use crate::models::{Cell, StudentRecord};

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub file: String,
    pub headers: Vec<String>,
    pub records: Vec<StudentRecord>,
}

impl Dataset {
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|source| ReportError::io(path, source))?;
        Self::from_reader(&path.display().to_string(), file)
    }

    pub fn from_reader<R: Read>(file: &str, reader: R) -> Result<Self> {
        let csv_error = |source| ReportError::Csv {
            file: file.to_string(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()
            .map_err(csv_error)?
            .iter()
            .map(str::to_string)
            .collect();

        let mut records = Vec::new();
        for result in reader.records() {
            let row = result.map_err(csv_error)?;
            let record = headers
                .iter()
                .zip(row.iter())
                .map(|(column, value)| (column.as_str(), Cell::Text(value.to_string())))
                .collect();
            records.push(record);
        }

        tracing::debug!(file, rows = records.len(), "dataset loaded");
        Ok(Self {
            file: file.to_string(),
            headers,
            records,
        })
    }

    pub fn is_headerless(&self) -> bool {
        self.headers.iter().all(|header| header.is_empty())
    }
}
