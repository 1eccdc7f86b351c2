use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkribaError {
    #[error("Model download failed for {url}: {reason}")]
    ModelDownloadFailed { url: String, reason: String },

    #[error("Failed to load model {model_path}: {reason}")]
    ModelLoadFailed { model_path: PathBuf, reason: String },

    #[error("Audio decoding failed for {audio_path}: {reason}")]
    AudioDecodeFailed { audio_path: PathBuf, reason: String },

    #[error("Transcription failed for {audio_path}: {reason}")]
    TranscriptionFailed { audio_path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("WAV read error: {0}")]
    WavError(#[from] hound::Error),
}

pub type Result<T> = std::result::Result<T, SkribaError>;
