use std::path::Path;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Local;

use crate::{
    device::{ComputeType, Device},
    error::Result,
    model::{ModelSize, ensure_model},
    types::{Segment, TIMESTAMP_FORMAT, Transcription, TranscriptionError, TranscriptionOutcome},
    whisper::WhisperSpeechModel,
};

/// Raw output of one model invocation: ordered segments plus what the model
/// reports about the audio's language.
#[derive(Debug, Clone)]
pub struct ModelOutput {
    pub segments: Vec<Segment>,
    pub language: String,
    pub language_probability: f64,
}

/// The single call contract this crate consumes from a recognition model.
#[async_trait]
pub trait SpeechModel: Send {
    async fn transcribe(&mut self, audio_path: &Path) -> Result<ModelOutput>;
}

/// Wraps the recognition model: loads it lazily and normalizes every
/// invocation into a `TranscriptionOutcome`.
pub struct Transcriber {
    model_size: ModelSize,
    device: Device,
    compute_type: ComputeType,
    model: Option<Box<dyn SpeechModel>>,
}

impl Transcriber {
    pub fn new(model_size: ModelSize, device: Device, compute_type: Option<ComputeType>) -> Self {
        let compute_type = compute_type.unwrap_or_else(|| ComputeType::default_for(device));
        Self {
            model_size,
            device,
            compute_type,
            model: None,
        }
    }

    /// Construct around an already-loaded model. Tests inject mocks here.
    pub fn with_model(model_size: ModelSize, device: Device, model: Box<dyn SpeechModel>) -> Self {
        Self {
            model_size,
            device,
            compute_type: ComputeType::default_for(device),
            model: Some(model),
        }
    }

    pub fn model_size(&self) -> ModelSize {
        self.model_size
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn compute_type(&self) -> ComputeType {
        self.compute_type
    }

    /// Load the recognition model. Idempotent: a second call is a no-op.
    ///
    /// The model stays resident until the process exits; there is no unload.
    pub async fn load_model(&mut self) -> Result<()> {
        if self.model.is_some() {
            return Ok(());
        }

        log::info!(
            "Loading {} model on {} with {}...",
            self.model_size.as_str(),
            self.device.as_str(),
            self.compute_type.as_str()
        );
        let load_start = Instant::now();

        let model_path = ensure_model(self.model_size, self.compute_type).await?;
        let model = WhisperSpeechModel::load(&model_path, self.device)?;
        self.model = Some(Box::new(model));

        log::info!(
            "Model loaded in {:.2} seconds",
            load_start.elapsed().as_secs_f64()
        );
        Ok(())
    }

    /// Transcribe one audio file.
    ///
    /// Model-invocation failures are captured in the returned outcome and
    /// never propagate; only a failure to load the model itself is `Err`.
    pub async fn transcribe(&mut self, audio_path: &Path) -> Result<TranscriptionOutcome> {
        self.load_model().await?;
        let model = self.model.as_mut().expect("load_model sets the model");

        let filename = audio_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        log::info!("Transcribing: {}", audio_path.display());

        let transcribe_start = Instant::now();
        match model.transcribe(audio_path).await {
            Ok(output) => {
                let processing_time = transcribe_start.elapsed().as_secs_f64();
                Ok(TranscriptionOutcome::Success(build_transcription(
                    filename,
                    output,
                    processing_time,
                    self.model_size,
                    self.device,
                )))
            }
            Err(err) => {
                log::error!("ERROR during transcription: {err}");
                Ok(TranscriptionOutcome::Error(TranscriptionError {
                    filename,
                    error: err.to_string(),
                    timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
                }))
            }
        }
    }
}

fn build_transcription(
    filename: String,
    output: ModelOutput,
    processing_time: f64,
    model_size: ModelSize,
    device: Device,
) -> Transcription {
    let ModelOutput {
        segments,
        language,
        language_probability,
    } = output;

    // Duration is the furthest segment end, not the file's true length.
    let duration = segments.iter().fold(0.0_f64, |max, s| max.max(s.end));

    let mut full_text = String::new();
    for segment in &segments {
        full_text.push_str(&segment.text);
        full_text.push(' ');
    }

    Transcription {
        filename,
        duration,
        language,
        language_probability,
        transcription: full_text.trim().to_string(),
        segments,
        processing_time,
        timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
        model: model_size.as_str().to_string(),
        device: device.as_str().to_string(),
    }
}
