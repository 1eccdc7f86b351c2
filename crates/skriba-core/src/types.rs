use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Timestamp format used in result records and the run summary.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A time-bounded span of recognized speech.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Successful transcription of a single audio file.
#[derive(Debug, Clone)]
pub struct Transcription {
    pub filename: String,
    /// Maximum segment end-time in seconds; 0 when nothing was recognized.
    pub duration: f64,
    pub language: String,
    pub language_probability: f64,
    pub transcription: String,
    pub segments: Vec<Segment>,
    /// Inference time reported by the model invocation itself.
    pub processing_time: f64,
    pub timestamp: String,
    pub model: String,
    pub device: String,
}

/// Failed transcription of a single audio file.
#[derive(Debug, Clone)]
pub struct TranscriptionError {
    pub filename: String,
    pub error: String,
    pub timestamp: String,
}

/// Result of transcribing one file: exactly one of the two variants.
#[derive(Debug, Clone)]
pub enum TranscriptionOutcome {
    Success(Transcription),
    Error(TranscriptionError),
}

impl TranscriptionOutcome {
    pub fn filename(&self) -> &str {
        match self {
            TranscriptionOutcome::Success(t) => &t.filename,
            TranscriptionOutcome::Error(e) => &e.filename,
        }
    }

    pub fn timestamp(&self) -> &str {
        match self {
            TranscriptionOutcome::Success(t) => &t.timestamp,
            TranscriptionOutcome::Error(e) => &e.timestamp,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TranscriptionOutcome::Success(_))
    }
}

/// One file's outcome paired with the wall-clock seconds the pipeline spent
/// on it. The model-reported time stays on the `Transcription` record; rows
/// and stats use this one.
#[derive(Debug, Clone)]
pub struct ProcessedFile {
    pub outcome: TranscriptionOutcome,
    pub processing_time: f64,
}

/// Per-folder accumulator, bumped once per processed file.
#[derive(Debug, Clone, Default)]
pub struct FolderStats {
    pub file_count: usize,
    pub audio_duration: f64,
    pub processing_time: f64,
    pub success_count: usize,
    pub error_count: usize,
}

/// Run-wide accumulator bracketing a whole pipeline run.
#[derive(Debug, Default)]
pub struct RunStats {
    pub total_files_processed: usize,
    pub successful_files: usize,
    pub files_with_errors: usize,
    pub total_audio_duration: f64,
    pub total_processing_time: f64,
    /// Keyed by folder name; BTreeMap keeps master-log rows alphabetical.
    pub folders: BTreeMap<String, FolderStats>,
    pub start_time: Option<DateTime<Local>>,
    pub end_time: Option<DateTime<Local>>,
}

impl RunStats {
    /// Fold one processed file into the run and folder accumulators.
    pub fn record(&mut self, folder_name: &str, processed: &ProcessedFile) {
        self.total_files_processed += 1;
        self.total_processing_time += processed.processing_time;

        let folder = self.folders.entry(folder_name.to_string()).or_default();
        folder.file_count += 1;
        folder.processing_time += processed.processing_time;

        match &processed.outcome {
            TranscriptionOutcome::Success(t) => {
                self.successful_files += 1;
                self.total_audio_duration += t.duration;
                folder.success_count += 1;
                folder.audio_duration += t.duration;
            }
            TranscriptionOutcome::Error(_) => {
                self.files_with_errors += 1;
                folder.error_count += 1;
            }
        }
    }
}
