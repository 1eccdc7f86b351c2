use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::{
    device::Device,
    error::{Result, SkribaError},
    transcriber::{ModelOutput, SpeechModel},
    types::Segment,
};

/// Recognition model backed by whisper.cpp via whisper-rs.
pub struct WhisperSpeechModel {
    ctx: WhisperContext,
    n_threads: i32,
}

impl WhisperSpeechModel {
    /// Load a ggml model file. GPU offload is enabled on cuda.
    pub fn load(model_path: &Path, device: Device) -> Result<Self> {
        let use_gpu = device == Device::Cuda;
        let ctx_params = WhisperContextParameters {
            use_gpu,
            flash_attn: use_gpu,
            ..Default::default()
        };

        let model_path_str = model_path
            .to_str()
            .ok_or_else(|| SkribaError::ModelLoadFailed {
                model_path: model_path.to_path_buf(),
                reason: "model path is not valid UTF-8".to_string(),
            })?;

        let ctx = WhisperContext::new_with_params(model_path_str, ctx_params).map_err(|e| {
            SkribaError::ModelLoadFailed {
                model_path: model_path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            ctx,
            n_threads: available_threads(),
        })
    }
}

#[async_trait]
impl SpeechModel for WhisperSpeechModel {
    async fn transcribe(&mut self, audio_path: &Path) -> Result<ModelOutput> {
        let samples = decode_audio(audio_path).await?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 5 });
        params.set_language(Some("auto"));
        params.set_translate(false);
        params.set_token_timestamps(true);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_n_threads(self.n_threads);

        let mut state =
            self.ctx
                .create_state()
                .map_err(|e| SkribaError::TranscriptionFailed {
                    audio_path: audio_path.to_path_buf(),
                    reason: format!("failed to create inference state: {e}"),
                })?;
        state
            .full(params, &samples)
            .map_err(|e| SkribaError::TranscriptionFailed {
                audio_path: audio_path.to_path_buf(),
                reason: format!("inference failed: {e}"),
            })?;

        let mut segments: Vec<Segment> = Vec::new();
        let mut prob_sum = 0.0_f64;
        let mut token_count = 0_usize;

        let num_segments = state.full_n_segments();
        for seg_idx in 0..num_segments {
            let segment = match state.get_segment(seg_idx) {
                Some(s) => s,
                None => continue,
            };
            let text = match segment.to_str() {
                Ok(s) => s,
                Err(_) => continue,
            };

            let n_tokens = segment.n_tokens();
            for tok_idx in 0..n_tokens {
                let token = match segment.get_token(tok_idx) {
                    Some(t) => t,
                    None => continue,
                };
                prob_sum += token.token_probability() as f64;
                token_count += 1;
            }

            // Timestamps are in centiseconds (10ms units)
            segments.push(Segment {
                start: segment.start_timestamp() as f64 / 100.0,
                end: segment.end_timestamp() as f64 / 100.0,
                text: text.to_string(),
            });
        }

        let language_index = state.full_lang_id_from_state();
        let language = whisper_rs::get_lang_str(language_index)
            .unwrap_or("unknown")
            .to_string();
        let language_probability = if token_count > 0 {
            prob_sum / token_count as f64
        } else {
            0.0
        };

        Ok(ModelOutput {
            segments,
            language,
            language_probability,
        })
    }
}

/// Decode any supported container to 16 kHz mono s16 samples using ffmpeg.
async fn decode_audio(audio_path: &Path) -> Result<Vec<f32>> {
    let scratch = tempfile::tempdir()?;
    let wav_path = scratch.path().join("audio.wav");

    let output = Command::new("ffmpeg")
        .arg("-y")
        .arg("-i")
        .arg(audio_path)
        .arg("-ar")
        .arg("16000")
        .arg("-ac")
        .arg("1")
        .arg("-acodec")
        .arg("pcm_s16le")
        .arg(&wav_path)
        .output()
        .await?;

    if !output.status.success() {
        return Err(SkribaError::AudioDecodeFailed {
            audio_path: audio_path.to_path_buf(),
            reason: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    let mut reader = hound::WavReader::open(&wav_path)?;
    let samples: std::result::Result<Vec<f32>, hound::Error> = reader
        .samples::<i16>()
        .map(|sample| sample.map(|s| s as f32 / i16::MAX as f32))
        .collect();

    Ok(samples?)
}

fn available_threads() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(4) as i32
}
