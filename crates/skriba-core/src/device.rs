use tokio::process::Command;

/// Inference device for the recognition model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cuda,
    Cpu,
}

impl Device {
    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Cuda => "cuda",
            Device::Cpu => "cpu",
        }
    }
}

/// Numeric precision of the model file. whisper.cpp bakes precision into the
/// ggml file, so this selects which variant gets downloaded and loaded.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeType {
    F16,
    Q5_0,
    Q8_0,
}

impl ComputeType {
    /// f16 on GPU, q5_0 on CPU.
    pub fn default_for(device: Device) -> Self {
        match device {
            Device::Cuda => ComputeType::F16,
            Device::Cpu => ComputeType::Q5_0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComputeType::F16 => "f16",
            ComputeType::Q5_0 => "q5_0",
            ComputeType::Q8_0 => "q8_0",
        }
    }

    /// Suffix of the ggml model file this precision selects.
    pub fn file_suffix(&self) -> &'static str {
        match self {
            ComputeType::F16 => "",
            ComputeType::Q5_0 => "-q5_0",
            ComputeType::Q8_0 => "-q8_0",
        }
    }
}

/// Check GPU availability and report hardware details.
///
/// Absence of a usable GPU is a normal, reported outcome, not an error.
pub async fn check_gpu() -> bool {
    println!("\n===== GPU INFORMATION =====");

    let output = Command::new("nvidia-smi")
        .arg("--query-gpu=name,memory.total,memory.used")
        .arg("--format=csv,noheader")
        .output()
        .await;

    match output {
        Ok(out) if out.status.success() => {
            let stdout = String::from_utf8_lossy(&out.stdout);
            let gpus: Vec<&str> = stdout.lines().filter(|l| !l.trim().is_empty()).collect();
            if gpus.is_empty() {
                println!("No CUDA-capable GPU detected!");
                return false;
            }
            println!("CUDA available: true");
            println!("CUDA device count: {}", gpus.len());
            for (index, line) in gpus.iter().enumerate() {
                let mut fields = line.split(',').map(str::trim);
                let name = fields.next().unwrap_or("unknown");
                let total = fields.next().unwrap_or("?");
                let used = fields.next().unwrap_or("?");
                println!("CUDA device {index}: {name} (memory: {used} used / {total} total)");
            }
            true
        }
        _ => {
            println!("No CUDA-capable GPU detected!");
            false
        }
    }
}

/// Quiet availability probe for when the diagnostic check is skipped.
pub async fn cuda_available() -> bool {
    Command::new("nvidia-smi")
        .arg("-L")
        .output()
        .await
        .map(|out| out.status.success())
        .unwrap_or(false)
}
