use std::path::PathBuf;

use tokio::{fs, process::Command};

use crate::{
    device::ComputeType,
    error::{Result, SkribaError},
};

pub const MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// Size of the recognition model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelSize {
    #[default]
    Tiny,
    Base,
    Small,
    Medium,
    LargeV1,
    LargeV2,
    LargeV3,
    LargeV3Turbo,
}

impl ModelSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelSize::Tiny => "tiny",
            ModelSize::Base => "base",
            ModelSize::Small => "small",
            ModelSize::Medium => "medium",
            ModelSize::LargeV1 => "large-v1",
            ModelSize::LargeV2 => "large-v2",
            ModelSize::LargeV3 => "large-v3",
            ModelSize::LargeV3Turbo => "large-v3-turbo",
        }
    }
}

/// ggml file name for a model size at a given precision.
pub fn model_file_name(size: ModelSize, compute: ComputeType) -> String {
    format!("ggml-{}{}.bin", size.as_str(), compute.file_suffix())
}

fn model_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("skriba")
        .join("models")
}

/// Download the ggml model into the cache directory unless already present.
pub async fn ensure_model(size: ModelSize, compute: ComputeType) -> Result<PathBuf> {
    let file_name = model_file_name(size, compute);
    let download_url = format!("{}/{}", MODEL_BASE_URL, file_name);
    let model_dir = model_cache_dir();

    if !model_dir.exists() {
        fs::create_dir_all(&model_dir).await?;
    }

    let model_path = model_dir.join(&file_name);
    if !model_path.exists() {
        log::info!("Downloading model {file_name}...");
        let output = Command::new("curl")
            .arg("-L")
            .arg(&download_url)
            .arg("-o")
            .arg(&model_path)
            .output()
            .await?;

        if !output.status.success() {
            return Err(SkribaError::ModelDownloadFailed {
                url: download_url,
                reason: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }
    }

    Ok(model_path)
}
