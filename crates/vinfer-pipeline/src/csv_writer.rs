//! Per-video CSV result files.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info};
use vinfer_models::InferenceResult;

use crate::error::PipelineResult;

pub const CSV_HEADER: [&str; 7] = [
    "timestamp",
    "video_name",
    "model_name",
    "model_path",
    "status",
    "response",
    "error_message",
];

const RESULTS_SUFFIX: &str = "_results.csv";

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    timestamp: String,
    video_name: &'a str,
    model_name: &'a str,
    model_path: &'a str,
    status: &'static str,
    response: &'a str,
    error_message: &'a str,
}

impl<'a> From<&'a InferenceResult> for CsvRow<'a> {
    fn from(result: &'a InferenceResult) -> Self {
        Self {
            timestamp: result.timestamp_string(),
            video_name: &result.video_name,
            model_name: &result.model_name,
            model_path: &result.model_path,
            status: result.status.as_str(),
            response: &result.response_text,
            error_message: &result.error_message,
        }
    }
}

/// Row counts found in the results directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultsOverview {
    /// `(file name, data rows)` sorted by file name
    pub files: Vec<(String, usize)>,
    pub total_rows: usize,
}

/// Appends results to one `{video_key}_results.csv` file per video.
#[derive(Debug, Clone)]
pub struct ResultWriter {
    results_dir: PathBuf,
}

impl ResultWriter {
    /// Create the writer, creating `results_dir` if needed.
    pub fn new(results_dir: impl Into<PathBuf>) -> PipelineResult<Self> {
        let results_dir = results_dir.into();
        fs::create_dir_all(&results_dir)?;
        Ok(Self { results_dir })
    }

    /// Directory holding the CSV files.
    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// CSV path for a video, e.g. `results/a_mp4_results.csv` for `a.mp4`.
    ///
    /// The whole file name is kept so `a.mp4` and `a.avi` get separate files.
    pub fn csv_path(&self, video_name: &str) -> PathBuf {
        let key = video_name.replace('.', "_");
        self.results_dir.join(format!("{}{}", key, RESULTS_SUFFIX))
    }

    /// Append one row, writing the header first if the file is new or empty.
    pub fn append(&self, result: &InferenceResult) -> PipelineResult<PathBuf> {
        let path = self.csv_path(&result.video_name);
        let needs_header = fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            writer.write_record(CSV_HEADER)?;
            info!("Created new CSV file: {}", path.display());
        }
        writer.serialize(CsvRow::from(result))?;
        writer.flush()?;

        info!("Result saved to {}", path.display());
        Ok(path)
    }

    /// Count data rows in every `*_results.csv` file of the results directory.
    pub fn summarize(&self) -> PipelineResult<ResultsOverview> {
        let mut overview = ResultsOverview::default();

        for entry in fs::read_dir(&self.results_dir)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !name.ends_with(RESULTS_SUFFIX) || !path.is_file() {
                continue;
            }

            match count_rows(&path) {
                Ok(rows) => {
                    overview.total_rows += rows;
                    overview.files.push((name.to_string(), rows));
                }
                Err(e) => error!("Error reading {}: {}", path.display(), e),
            }
        }

        overview.files.sort();
        Ok(overview)
    }
}

fn count_rows(path: &Path) -> PipelineResult<usize> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = 0;
    for record in reader.records() {
        record?;
        rows += 1;
    }
    Ok(rows)
}
