use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::config::{ConfigSource, GradingConfig};
use crate::dataset::Dataset;
use crate::error::ReportError;
use crate::models::ReportRow;
use crate::{grading, project, validate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub dataset: PathBuf,
    pub config: PathBuf,
}

impl Job {
    pub fn stem(&self) -> String {
        self.dataset
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "report".to_string())
    }
}

#[derive(Debug, Clone)]
pub struct Prepared {
    pub config: GradingConfig,
    pub columns: Vec<String>,
    pub rows: Vec<ReportRow>,
}

/// One configuration for every dataset, or one configuration per dataset.
pub fn pair_inputs(datasets: &[PathBuf], configs: &[PathBuf]) -> Result<Vec<Job>, ReportError> {
    let arity = || ReportError::Arity {
        datasets: datasets.len(),
        configs: configs.len(),
    };

    match configs {
        _ if datasets.is_empty() => Err(arity()),
        [config] => Ok(datasets
            .iter()
            .map(|dataset| Job {
                dataset: dataset.clone(),
                config: config.clone(),
            })
            .collect()),
        _ if configs.len() == datasets.len() => Ok(datasets
            .iter()
            .zip(configs)
            .map(|(dataset, config)| Job {
                dataset: dataset.clone(),
                config: config.clone(),
            })
            .collect()),
        _ => Err(arity()),
    }
}

/// Rejects jobs whose outputs would land on the same file names.
pub fn check_output_names(jobs: &[Job]) -> Result<(), ReportError> {
    let mut issued: HashMap<String, &Path> = HashMap::new();
    for job in jobs {
        let stem = job.stem();
        if let Some(first) = issued.get(&stem) {
            return Err(ReportError::OutputClash {
                stem,
                first: first.to_path_buf(),
                second: job.dataset.clone(),
            });
        }
        issued.insert(stem, &job.dataset);
    }
    Ok(())
}

pub fn check(job: &Job) -> anyhow::Result<GradingConfig> {
    let (source, dataset) = load(job)?;
    let config = validate::validate(&source, &dataset)
        .with_context(|| format!("validation failed for {}", job.dataset.display()))?;
    Ok(config)
}

/// Validates, grades and projects one job.
pub fn prepare(job: &Job) -> anyhow::Result<Prepared> {
    let (source, dataset) = load(job)?;
    let config = validate::validate(&source, &dataset)
        .with_context(|| format!("validation failed for {}", job.dataset.display()))?;

    let graded = grading::grade(&config, &dataset.records)
        .with_context(|| format!("grading failed for {}", job.dataset.display()))?;
    let rows = project::project(&config, &graded)
        .with_context(|| format!("building report rows for {}", job.dataset.display()))?;
    let columns = project::report_columns(&config.report);

    Ok(Prepared {
        config,
        columns,
        rows,
    })
}

fn load(job: &Job) -> anyhow::Result<(ConfigSource, Dataset)> {
    tracing::info!(
        dataset = %job.dataset.display(),
        config = %job.config.display(),
        "processing"
    );
    let source = ConfigSource::load(&job.config).context("failed to read configuration")?;
    let dataset = Dataset::load(&job.dataset).context("failed to read dataset")?;
    Ok((source, dataset))
}

pub fn output_path(out_dir: &Path, job: &Job, suffix: &str) -> PathBuf {
    out_dir.join(format!("{}{suffix}", job.stem()))
}
