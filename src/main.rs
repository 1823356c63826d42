use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod config;
mod dataset;
mod error;
mod grading;
mod group;
mod models;
mod pipeline;
mod project;
mod report;
mod validate;

#[derive(Parser)]
#[command(name = "grade-report")]
#[command(about = "Weighted grade reports for Group Scholar cohorts", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Inputs {
    /// Dataset CSV file (repeatable)
    #[arg(long = "data", required = true)]
    data: Vec<PathBuf>,
    /// Grading configuration: one for all datasets or one per dataset
    #[arg(long = "config", required = true)]
    config: Vec<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// One report card per student
    PerStudent,
    /// All report cards merged into one document
    Combined,
}

#[derive(Subcommand)]
enum Commands {
    /// Check datasets against their grading configuration
    Validate {
        #[command(flatten)]
        inputs: Inputs,
    },
    /// Write graded CSV reports
    Csv {
        #[command(flatten)]
        inputs: Inputs,
        #[arg(long, default_value = "reports")]
        out_dir: PathBuf,
    },
    /// Write markdown report cards
    Documents {
        #[command(flatten)]
        inputs: Inputs,
        #[arg(long, value_enum, default_value_t = Mode::PerStudent)]
        mode: Mode,
        #[arg(long, default_value = "reports")]
        out_dir: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Validate { inputs } => {
            for job in pipeline::pair_inputs(&inputs.data, &inputs.config)? {
                pipeline::check(&job)?;
                println!(
                    "OK {} ({})",
                    job.dataset.display(),
                    job.config.display()
                );
            }
        }
        Commands::Csv { inputs, out_dir } => {
            let jobs = pipeline::pair_inputs(&inputs.data, &inputs.config)?;
            pipeline::check_output_names(&jobs)?;
            create_out_dir(&out_dir)?;
            for job in jobs {
                let prepared = pipeline::prepare(&job)?;
                let out = pipeline::output_path(&out_dir, &job, "_report.csv");
                report::write_table_file(&out, &prepared.columns, &prepared.rows)?;
                println!("Report written to {}.", out.display());
            }
        }
        Commands::Documents {
            inputs,
            mode,
            out_dir,
        } => {
            let jobs = pipeline::pair_inputs(&inputs.data, &inputs.config)?;
            pipeline::check_output_names(&jobs)?;
            create_out_dir(&out_dir)?;
            let today = Utc::now().date_naive();

            for job in jobs {
                let prepared = pipeline::prepare(&job)?;
                let groups = group::group(&prepared.rows, &prepared.config.report.primary_key);

                match mode {
                    Mode::PerStudent => {
                        let dir = out_dir.join(job.stem());
                        let written =
                            report::write_student_documents(&prepared.config, &groups, &dir, today)?;
                        println!("{written} report cards written to {}.", dir.display());
                    }
                    Mode::Combined => {
                        let staging = tempfile::Builder::new()
                            .prefix("grade-report-staging-")
                            .tempdir()
                            .context("failed to create staging directory")?;
                        let out = pipeline::output_path(&out_dir, &job, "_combined.md");
                        let written = report::write_combined_document(
                            &prepared.config,
                            &groups,
                            staging.path(),
                            &out,
                            today,
                        )?;
                        if written == 0 {
                            println!("No student rows in {}.", job.dataset.display());
                        } else {
                            println!("{written} report cards merged into {}.", out.display());
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

fn create_out_dir(out_dir: &std::path::Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))
}
