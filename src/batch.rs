//! Batch mode: many independent thumbnails from one job file.
//!
//! ```toml
//! [[job]]
//! background = "photos/desk.jpg"
//! title = "Python Tutorial for Beginners"
//! icons = ["logos/python.png", "https://example.com/vscode.png"]
//! output = "out/python.png"
//! layers = true            # optional, default false
//! ```
//!
//! Relative local paths and outputs are resolved against the job file's
//! directory. Jobs run in parallel on the rayon pool; a failing job is
//! reported and the others carry on.

use rayon::prelude::*;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

use crate::imaging::{Fetcher, SourceError};
use crate::pipeline::{Engine, EngineError, OutputSink, RenderReport};
use crate::types::ImageSource;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("job file parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("job {index}: {source}")]
    Source { index: usize, source: SourceError },
    #[error("job file contains no [[job]] entries")]
    NoJobs,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
struct JobSpec {
    background: String,
    title: String,
    #[serde(default)]
    icons: Vec<String>,
    output: PathBuf,
    #[serde(default)]
    layers: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct JobFile {
    #[serde(default)]
    job: Vec<JobSpec>,
}

/// One ready-to-run request.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub background: ImageSource,
    pub title: String,
    pub icons: Vec<ImageSource>,
    pub output: PathBuf,
    pub layers: bool,
}

impl Job {
    pub fn sink(&self) -> OutputSink {
        OutputSink::Png {
            path: self.output.clone(),
            layers: self.layers,
        }
    }
}

/// Outcome of one job.
#[derive(Debug)]
pub struct JobOutcome {
    pub index: usize,
    pub output: PathBuf,
    pub result: Result<RenderReport, EngineError>,
}

/// Progress for the CLI printer.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    JobFinished {
        index: usize,
        output: PathBuf,
        dropped_icons: usize,
    },
    JobFailed {
        index: usize,
        output: PathBuf,
        error: String,
    },
}

/// Read and parse a job file.
pub fn load_jobs(path: &Path) -> Result<Vec<Job>, BatchError> {
    let content = std::fs::read_to_string(path)?;
    let base = path.parent().unwrap_or(Path::new(""));
    parse_jobs(&content, base)
}

/// Parse job file `content`, resolving relative paths against `base`.
pub fn parse_jobs(content: &str, base: &Path) -> Result<Vec<Job>, BatchError> {
    let file: JobFile = toml::from_str(content)?;
    if file.job.is_empty() {
        return Err(BatchError::NoJobs);
    }
    file.job
        .into_iter()
        .enumerate()
        .map(|(index, spec)| {
            let source = |s: &str| -> Result<ImageSource, BatchError> {
                let parsed: ImageSource = s.parse().map_err(|source| BatchError::Source { index, source })?;
                Ok(match parsed {
                    ImageSource::LocalPath(p) if p.is_relative() => ImageSource::LocalPath(base.join(p)),
                    other => other,
                })
            };
            Ok(Job {
                background: source(&spec.background)?,
                icons: spec.icons.iter().map(|s| source(s)).collect::<Result<_, _>>()?,
                title: spec.title,
                output: if spec.output.is_relative() {
                    base.join(&spec.output)
                } else {
                    spec.output
                },
                layers: spec.layers,
            })
        })
        .collect()
}

/// Run every job on the current rayon pool. Results come back in job order.
pub fn run_jobs<F: Fetcher>(
    engine: &Engine<F>,
    jobs: &[Job],
    events: Option<Sender<BatchEvent>>,
) -> Vec<JobOutcome> {
    jobs.par_iter()
        .enumerate()
        .map(|(index, job)| {
            let result = engine
                .generate(&job.background, &job.title, &job.icons, &job.sink(), None)
                .map(|artifacts| artifacts.report);
            let event = match &result {
                Ok(report) => BatchEvent::JobFinished {
                    index,
                    output: job.output.clone(),
                    dropped_icons: report.dropped_icons.len(),
                },
                Err(e) => {
                    tracing::warn!(index, output = %job.output.display(), error = %e, "job failed");
                    BatchEvent::JobFailed {
                        index,
                        output: job.output.clone(),
                        error: e.to_string(),
                    }
                }
            };
            if let Some(tx) = &events {
                tx.send(event).ok();
            }
            JobOutcome {
                index,
                output: job.output.clone(),
                result,
            }
        })
        .collect()
}
