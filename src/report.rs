use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::config::GradingConfig;
use crate::error::{ReportError, Result};
use crate::models::{ReportRow, StudentGroup};

pub fn write_table<W: std::io::Write>(
    columns: &[String],
    rows: &[ReportRow],
    writer: W,
) -> csv::Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(columns)?;
    for row in rows {
        writer.write_record(columns.iter().map(|column| row.text(column)))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_table_file(path: &Path, columns: &[String], rows: &[ReportRow]) -> Result<()> {
    let file = std::fs::File::create(path).map_err(|source| ReportError::io(path, source))?;
    write_table(columns, rows, file).map_err(|source| ReportError::Csv {
        file: path.display().to_string(),
        source,
    })?;
    tracing::info!(path = %path.display(), rows = rows.len(), "table written");
    Ok(())
}

pub fn render_student(config: &GradingConfig, group: &StudentGroup, generated: NaiveDate) -> String {
    let settings = &config.report;
    let mut output = String::new();

    let _ = writeln!(output, "# {}", settings.title);
    let _ = writeln!(output, "Generated on {generated}");
    let _ = writeln!(output);

    if let Some(first) = group.rows.first() {
        let identity = std::iter::once(&settings.primary_key).chain(settings.secondary_key.as_ref());
        for column in identity {
            let _ = writeln!(output, "**{}:** {}  ", column, escape(&first.text(column)));
        }
        let _ = writeln!(output);

        let header: Vec<String> = first.columns().map(escape).collect();
        let _ = writeln!(output, "| {} |", header.join(" | "));
        let _ = writeln!(output, "|{}", " --- |".repeat(header.len()));
        for row in &group.rows {
            let cells: Vec<String> = row.cells().map(|cell| escape(&cell.to_string())).collect();
            let _ = writeln!(output, "| {} |", cells.join(" | "));
        }
    }

    if settings.include_overall_grade {
        let (verdict, color) = if group.has_failure() {
            ("FAIL", settings.display.fail_color.as_deref())
        } else {
            ("PASS", settings.display.pass_color.as_deref())
        };
        let _ = writeln!(output);
        match color {
            Some(color) => {
                let _ = writeln!(
                    output,
                    "<p style=\"color: {color}\"><strong>Result: {verdict}</strong></p>"
                );
            }
            None => {
                let _ = writeln!(output, "**Result: {verdict}**");
            }
        }
    }

    output
}

/// One report card per non-empty group. Returns the number of files written.
pub fn write_student_documents(
    config: &GradingConfig,
    groups: &[StudentGroup],
    out_dir: &Path,
    generated: NaiveDate,
) -> Result<usize> {
    let names = document_names(groups);
    if names.is_empty() {
        tracing::warn!("no student rows; skipping documents");
        return Ok(0);
    }

    std::fs::create_dir_all(out_dir).map_err(|source| ReportError::io(out_dir, source))?;
    for (group, name) in &names {
        let path = out_dir.join(format!("{name}.md"));
        write_file(&path, &render_student(config, group, generated))?;
        tracing::debug!(path = %path.display(), "student document written");
    }

    tracing::info!(dir = %out_dir.display(), documents = names.len(), "student documents written");
    Ok(names.len())
}

/// Renders each non-empty group into `staging`, then merges the staged
/// documents in group order into `out`. `staging` belongs to the caller.
pub fn write_combined_document(
    config: &GradingConfig,
    groups: &[StudentGroup],
    staging: &Path,
    out: &Path,
    generated: NaiveDate,
) -> Result<usize> {
    let names = document_names(groups);
    if names.is_empty() {
        tracing::warn!("no student rows; skipping combined document");
        return Ok(0);
    }

    let mut staged: Vec<PathBuf> = Vec::with_capacity(names.len());
    for (index, (group, name)) in names.iter().enumerate() {
        let path = staging.join(format!("{:04}-{name}.md", index + 1));
        write_file(&path, &render_student(config, group, generated))?;
        staged.push(path);
    }
    tracing::debug!(staging = %staging.display(), documents = staged.len(), "documents staged");

    let mut parts = Vec::with_capacity(staged.len());
    for path in &staged {
        parts.push(std::fs::read_to_string(path).map_err(|source| ReportError::io(path, source))?);
    }
    write_file(out, &parts.join("\n---\n\n"))?;

    tracing::info!(path = %out.display(), documents = staged.len(), "combined document written");
    Ok(staged.len())
}

fn document_names(groups: &[StudentGroup]) -> Vec<(&StudentGroup, String)> {
    let mut issued: HashSet<String> = HashSet::new();
    groups
        .iter()
        .filter(|group| !group.is_empty())
        .map(|group| {
            let mut base = slug::slugify(&group.key);
            if base.is_empty() {
                base = "student".to_string();
            }
            let mut stem = base.clone();
            let mut suffix = 1;
            while issued.contains(&stem) {
                suffix += 1;
                stem = format!("{base}-{suffix}");
            }
            issued.insert(stem.clone());
            (group, stem)
        })
        .collect()
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).map_err(|source| ReportError::io(path, source))
}

fn escape(text: &str) -> String {
    text.replace('|', "\\|")
}
