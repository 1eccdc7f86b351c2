//! Skriba Core Library
//!
//! Core functionality for batch-transcribing folders of audio files with
//! whisper.cpp and writing per-folder CSVs, a master log, and a run summary.

pub mod device;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod transcriber;
pub mod types;
pub mod whisper;

// Re-export commonly used items at crate root
pub use device::{ComputeType, Device, check_gpu, cuda_available};
pub use error::{Result, SkribaError};
pub use model::{ModelSize, ensure_model, model_file_name};
pub use pipeline::Pipeline;
pub use transcriber::{ModelOutput, SpeechModel, Transcriber};
pub use types::{
    FolderStats, ProcessedFile, RunStats, Segment, Transcription, TranscriptionError,
    TranscriptionOutcome,
};
pub use whisper::WhisperSpeechModel;
