use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use console::style;

use skriba_core::{
    ComputeType, Device, ModelSize, Pipeline, Transcriber, check_gpu, cuda_available,
};

/// CLI wrapper for ModelSize enum (needed for clap ValueEnum)
#[derive(Clone, Copy, Default, ValueEnum)]
enum CliModelSize {
    #[default]
    Tiny,
    Base,
    Small,
    Medium,
    #[value(name = "large-v1")]
    LargeV1,
    #[value(name = "large-v2")]
    LargeV2,
    #[value(name = "large-v3")]
    LargeV3,
    #[value(name = "large-v3-turbo")]
    LargeV3Turbo,
}

impl From<CliModelSize> for ModelSize {
    fn from(cli: CliModelSize) -> Self {
        match cli {
            CliModelSize::Tiny => ModelSize::Tiny,
            CliModelSize::Base => ModelSize::Base,
            CliModelSize::Small => ModelSize::Small,
            CliModelSize::Medium => ModelSize::Medium,
            CliModelSize::LargeV1 => ModelSize::LargeV1,
            CliModelSize::LargeV2 => ModelSize::LargeV2,
            CliModelSize::LargeV3 => ModelSize::LargeV3,
            CliModelSize::LargeV3Turbo => ModelSize::LargeV3Turbo,
        }
    }
}

/// CLI wrapper for Device enum (needed for clap ValueEnum)
#[derive(Clone, Copy, ValueEnum)]
enum CliDevice {
    Cuda,
    Cpu,
}

impl From<CliDevice> for Device {
    fn from(cli: CliDevice) -> Self {
        match cli {
            CliDevice::Cuda => Device::Cuda,
            CliDevice::Cpu => Device::Cpu,
        }
    }
}

/// CLI wrapper for ComputeType enum (needed for clap ValueEnum)
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, ValueEnum)]
enum CliComputeType {
    F16,
    #[value(name = "q5_0")]
    Q5_0,
    #[value(name = "q8_0")]
    Q8_0,
}

impl From<CliComputeType> for ComputeType {
    fn from(cli: CliComputeType) -> Self {
        match cli {
            CliComputeType::F16 => ComputeType::F16,
            CliComputeType::Q5_0 => ComputeType::Q5_0,
            CliComputeType::Q8_0 => ComputeType::Q8_0,
        }
    }
}

#[derive(Parser)]
#[command(name = "skriba")]
#[command(about = "Batch-transcribe per-person audio folders and write CSV transcription reports")]
struct Cli {
    /// Input directory containing person folders with audio files
    #[arg(long)]
    input: PathBuf,

    /// Output directory where transcription CSVs will be stored
    #[arg(long)]
    output: PathBuf,

    /// Model size
    #[arg(long, default_value = "tiny")]
    model: CliModelSize,

    /// Device to use for inference (default: auto-detect)
    #[arg(long)]
    device: Option<CliDevice>,

    /// Model precision (default: f16 on cuda, q5_0 on cpu)
    #[arg(long)]
    compute_type: Option<CliComputeType>,

    /// Skip the GPU availability check
    #[arg(long)]
    skip_gpu_check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    println!(
        "\n{}  {}\n",
        style("skriba").cyan().bold(),
        style("Batch Transcriber").dim()
    );

    // Fail fast, before any model work
    if !cli.input.exists() {
        eprintln!(
            "{} Input directory '{}' does not exist",
            style("Error:").red().bold(),
            cli.input.display()
        );
        std::process::exit(1);
    }

    let device = if !cli.skip_gpu_check {
        let gpu_available = check_gpu().await;
        match cli.device {
            Some(device) => device.into(),
            None => {
                let device = if gpu_available {
                    Device::Cuda
                } else {
                    Device::Cpu
                };
                println!("Auto-selected device: {}", device.as_str());
                device
            }
        }
    } else {
        match cli.device {
            Some(device) => device.into(),
            None => {
                let device = if cuda_available().await {
                    Device::Cuda
                } else {
                    Device::Cpu
                };
                println!("Auto-selected device: {}", device.as_str());
                device
            }
        }
    };

    let transcriber = Transcriber::new(cli.model.into(), device, cli.compute_type.map(Into::into));
    let mut pipeline = Pipeline::new(cli.input, cli.output, transcriber);
    pipeline.run().await?;

    Ok(())
}
