use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::fs;

use crate::{
    error::Result,
    transcriber::Transcriber,
    types::{ProcessedFile, RunStats, TIMESTAMP_FORMAT, TranscriptionOutcome},
};

/// Audio extensions considered for transcription (case-insensitive).
pub const SUPPORTED_EXTENSIONS: [&str; 6] = [".wav", ".opus", ".mp3", ".m4a", ".ogg", ".flac"];

const SUCCESS_FIELDS: [&str; 10] = [
    "filename",
    "transcription",
    "language",
    "language_probability",
    "duration",
    "timestamp",
    "processing_time",
    "model",
    "device",
    "segments",
];

const ERROR_FIELDS: [&str; 5] = [
    "filename",
    "transcription",
    "error",
    "processing_time",
    "timestamp",
];

/// Walks `input/<person>/` folders, transcribes every matching audio file,
/// and writes per-folder CSVs, a master log, and a run summary.
pub struct Pipeline {
    input_dir: PathBuf,
    output_dir: PathBuf,
    transcriber: Transcriber,
    stats: RunStats,
}

impl Pipeline {
    pub fn new(input_dir: PathBuf, output_dir: PathBuf, transcriber: Transcriber) -> Self {
        Self {
            input_dir,
            output_dir,
            transcriber,
            stats: RunStats::default(),
        }
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Transcribe one file and fold it into the run/folder accumulators.
    ///
    /// The wall-clock time measured here is what reaches CSV rows and stats;
    /// the model's own reported time stays on the `Transcription` record.
    pub async fn process_file(
        &mut self,
        audio_path: &Path,
        folder_name: &str,
    ) -> Result<ProcessedFile> {
        log::info!("Processing file: {}", audio_path.display());

        let file_start = Instant::now();
        let outcome = self.transcriber.transcribe(audio_path).await?;
        let processing_time = file_start.elapsed().as_secs_f64();

        if let TranscriptionOutcome::Error(e) = &outcome {
            log::error!("Error processing {}: {}", e.filename, e.error);
        }
        log::info!(
            "Finished processing {} in {processing_time:.2}s",
            outcome.filename()
        );

        let processed = ProcessedFile {
            outcome,
            processing_time,
        };
        self.stats.record(folder_name, &processed);
        Ok(processed)
    }

    /// Transcribe every audio file directly inside one person's folder and
    /// write the folder CSV when anything matched. Folders with no matching
    /// files produce no CSV.
    pub async fn process_person_folder(
        &mut self,
        person_folder: &Path,
        progress: &ProgressBar,
    ) -> Result<()> {
        let folder_name = person_folder
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        log::info!("Processing folder: {folder_name}");

        let person_output_dir = self.output_dir.join(&folder_name);
        create_directory(&person_output_dir).await?;

        let mut results: Vec<ProcessedFile> = Vec::new();
        let mut entries = fs::read_dir(person_folder).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if !entry.file_type().await?.is_file() || !is_audio_file(&file_name) {
                continue;
            }
            progress.set_message(file_name);
            let processed = self.process_file(&entry.path(), &folder_name).await?;
            results.push(processed);
            progress.inc(1);
        }

        if !results.is_empty() {
            let csv_path = person_output_dir.join(format!("{folder_name}_transcriptions.csv"));
            self.write_folder_csv(&csv_path, &results).await?;
            log::info!("Created transcriptions CSV at {}", csv_path.display());
        }

        Ok(())
    }

    /// Write one folder's CSV.
    ///
    /// The schema is fixed per folder in a first pass: success-shaped as soon
    /// as any result succeeded, error-shaped otherwise. Every row is then
    /// emitted in that schema; an error row inside a success-shaped CSV keeps
    /// the success-only columns blank and its error message is dropped, since
    /// that schema has no error column.
    async fn write_folder_csv(&self, csv_path: &Path, results: &[ProcessedFile]) -> Result<()> {
        let has_success = results.iter().any(|r| r.outcome.is_success());
        let fields: &[&str] = if has_success {
            &SUCCESS_FIELDS
        } else {
            &ERROR_FIELDS
        };

        let mut writer = csv::Writer::from_writer(vec![]);
        writer.write_record(fields)?;
        for processed in results {
            let row = if has_success {
                success_shaped_row(processed)?
            } else {
                error_shaped_row(processed)
            };
            writer.write_record(&row)?;
        }

        let data = writer
            .into_inner()
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        fs::write(csv_path, data).await?;
        Ok(())
    }

    /// One pass over all immediate subdirectories; used only for progress
    /// display.
    async fn count_audio_files(&self) -> Result<usize> {
        let mut total = 0;
        let mut dirs = fs::read_dir(&self.input_dir).await?;
        while let Some(dir_entry) = dirs.next_entry().await? {
            if !dir_entry.file_type().await?.is_dir() {
                continue;
            }
            let mut files = fs::read_dir(dir_entry.path()).await?;
            while let Some(file_entry) = files.next_entry().await? {
                let name = file_entry.file_name().to_string_lossy().into_owned();
                if file_entry.file_type().await?.is_file() && is_audio_file(&name) {
                    total += 1;
                }
            }
        }
        Ok(total)
    }

    /// Write the cross-folder summary CSV, one row per folder, alphabetical.
    pub async fn write_master_log(&self) -> Result<()> {
        let master_log_path = self.output_dir.join("master_transcription_log.csv");

        let mut writer = csv::Writer::from_writer(vec![]);
        writer.write_record([
            "folder_name",
            "files_processed",
            "successful_files",
            "files_with_errors",
            "total_audio_duration_sec",
            "processing_time_sec",
            "real_time_factor",
            "average_time_per_file_sec",
        ])?;

        for (folder_name, folder) in &self.stats.folders {
            let rtf = if folder.audio_duration > 0.0 {
                folder.processing_time / folder.audio_duration
            } else {
                0.0
            };
            let avg_time = if folder.file_count > 0 {
                folder.processing_time / folder.file_count as f64
            } else {
                0.0
            };

            writer.write_record(vec![
                folder_name.clone(),
                folder.file_count.to_string(),
                folder.success_count.to_string(),
                folder.error_count.to_string(),
                format!("{:.2}", folder.audio_duration),
                format!("{:.2}", folder.processing_time),
                format!("{rtf:.4}"),
                format!("{avg_time:.2}"),
            ])?;
        }

        let data = writer
            .into_inner()
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        fs::write(&master_log_path, data).await?;
        log::info!("Wrote master log to {}", master_log_path.display());
        Ok(())
    }

    /// Write run-wide totals to a human-readable text file.
    pub async fn write_summary_stats(&self) -> Result<()> {
        let stats_path = self.output_dir.join("transcription_summary.txt");
        fs::write(&stats_path, self.render_summary()).await?;
        log::info!("Wrote summary statistics to {}", stats_path.display());
        Ok(())
    }

    fn render_summary(&self) -> String {
        let banner = "=".repeat(50);
        let mut out = String::new();
        out.push_str(&banner);
        out.push('\n');
        out.push_str("TRANSCRIPTION PIPELINE SUMMARY\n");
        out.push_str(&banner);
        out.push('\n');
        if let Some(start) = self.stats.start_time {
            out.push_str(&format!("Start Time: {}\n", start.format(TIMESTAMP_FORMAT)));
        }
        if let Some(end) = self.stats.end_time {
            out.push_str(&format!("End Time: {}\n", end.format(TIMESTAMP_FORMAT)));
        }
        if let (Some(start), Some(end)) = (self.stats.start_time, self.stats.end_time) {
            let total = (end - start).num_milliseconds() as f64 / 1000.0;
            out.push_str(&format!("Total Pipeline Duration: {total:.2}s\n"));
        }
        out.push_str(&format!(
            "Folders Processed: {}\n",
            self.stats.folders.len()
        ));
        out.push_str(&format!(
            "Total Files Processed: {}\n",
            self.stats.total_files_processed
        ));
        out.push_str(&format!(
            "Successful Files: {}\n",
            self.stats.successful_files
        ));
        out.push_str(&format!(
            "Files With Errors: {}\n",
            self.stats.files_with_errors
        ));
        if self.stats.total_files_processed > 0 {
            let avg = self.stats.total_processing_time / self.stats.total_files_processed as f64;
            out.push_str(&format!("Average Processing Time Per File: {avg:.2}s\n"));
        }
        if self.stats.total_audio_duration > 0.0 {
            let rtf = self.stats.total_processing_time / self.stats.total_audio_duration;
            out.push_str(&format!(
                "Overall Real-time Factor: {rtf:.4}x (lower is better)\n"
            ));
        }
        out.push_str(&banner);
        out.push('\n');
        out
    }

    fn log_summary(&self) {
        for line in self.render_summary().lines() {
            log::info!("{line}");
        }
    }

    /// Run the complete transcription pipeline.
    pub async fn run(&mut self) -> Result<()> {
        self.stats.start_time = Some(Local::now());

        log::info!("Starting transcription pipeline");
        log::info!("Input directory: {}", self.input_dir.display());
        log::info!("Output directory: {}", self.output_dir.display());

        create_directory(&self.output_dir).await?;
        self.transcriber.load_model().await?;

        let total_files = self.count_audio_files().await?;
        let progress = ProgressBar::new(total_files as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("=> "),
        );

        let mut folders_processed = 0;
        let mut folders = fs::read_dir(&self.input_dir).await?;
        while let Some(entry) = folders.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            folders_processed += 1;
            self.process_person_folder(&entry.path(), &progress).await?;
        }
        progress.finish_and_clear();

        self.stats.end_time = Some(Local::now());

        self.log_summary();
        self.write_summary_stats().await?;
        self.write_master_log().await?;

        log::info!(
            "Transcription pipeline completed! Processed {} files across {} folders.",
            self.stats.total_files_processed,
            folders_processed
        );
        Ok(())
    }
}

async fn create_directory(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).await?;
        log::info!("Created directory: {}", path.display());
    }
    Ok(())
}

fn is_audio_file(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    SUPPORTED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

fn success_shaped_row(processed: &ProcessedFile) -> Result<Vec<String>> {
    let processing_time = format!("{:.2}", processed.processing_time);
    match &processed.outcome {
        TranscriptionOutcome::Success(t) => {
            let segments_json = if t.segments.is_empty() {
                String::new()
            } else {
                serde_json::to_string(&t.segments)?
            };
            Ok(vec![
                t.filename.clone(),
                t.transcription.clone(),
                t.language.clone(),
                format!("{:.4}", t.language_probability),
                format!("{:.2}", t.duration),
                t.timestamp.clone(),
                processing_time,
                t.model.clone(),
                t.device.clone(),
                segments_json,
            ])
        }
        TranscriptionOutcome::Error(e) => Ok(vec![
            e.filename.clone(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            e.timestamp.clone(),
            processing_time,
            String::new(),
            String::new(),
            String::new(),
        ]),
    }
}

fn error_shaped_row(processed: &ProcessedFile) -> Vec<String> {
    let processing_time = format!("{:.2}", processed.processing_time);
    match &processed.outcome {
        TranscriptionOutcome::Error(e) => vec![
            e.filename.clone(),
            String::new(),
            e.error.clone(),
            processing_time,
            e.timestamp.clone(),
        ],
        // A folder holding any success is success-shaped, so this arm only
        // exists to keep the row total.
        TranscriptionOutcome::Success(t) => vec![
            t.filename.clone(),
            t.transcription.clone(),
            String::new(),
            processing_time,
            t.timestamp.clone(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Device;
    use crate::model::ModelSize;
    use crate::types::{ProcessedFile, Transcription, TranscriptionError};

    #[test]
    fn extension_match_is_case_insensitive() {
        assert!(is_audio_file("speech.wav"));
        assert!(is_audio_file("SPEECH.WAV"));
        assert!(is_audio_file("clip.Opus"));
        assert!(is_audio_file("take2.m4a"));
        assert!(!is_audio_file("notes.txt"));
        assert!(!is_audio_file("wav"));
        assert!(!is_audio_file("archive.wav.gz"));
    }

    fn empty_pipeline() -> Pipeline {
        Pipeline::new(
            PathBuf::from("in"),
            PathBuf::from("out"),
            Transcriber::new(ModelSize::Tiny, Device::Cpu, None),
        )
    }

    fn success(duration: f64, processing_time: f64) -> ProcessedFile {
        ProcessedFile {
            outcome: TranscriptionOutcome::Success(Transcription {
                filename: "a.wav".to_string(),
                duration,
                language: "en".to_string(),
                language_probability: 0.9,
                transcription: "hello".to_string(),
                segments: vec![],
                processing_time,
                timestamp: "2026-01-01 00:00:00".to_string(),
                model: "tiny".to_string(),
                device: "cpu".to_string(),
            }),
            processing_time,
        }
    }

    fn failure(processing_time: f64) -> ProcessedFile {
        ProcessedFile {
            outcome: TranscriptionOutcome::Error(TranscriptionError {
                filename: "b.wav".to_string(),
                error: "boom".to_string(),
                timestamp: "2026-01-01 00:00:00".to_string(),
            }),
            processing_time,
        }
    }

    #[test]
    fn summary_omits_ratios_for_an_empty_run() {
        let pipeline = empty_pipeline();
        let summary = pipeline.render_summary();
        assert!(summary.contains("Total Files Processed: 0"));
        assert!(!summary.contains("Average Processing Time Per File"));
        assert!(!summary.contains("Overall Real-time Factor"));
    }

    #[test]
    fn summary_includes_ratios_when_denominators_are_nonzero() {
        let mut pipeline = empty_pipeline();
        pipeline.stats.record("alice", &success(10.0, 2.0));
        let summary = pipeline.render_summary();
        assert!(summary.contains("Average Processing Time Per File: 2.00s"));
        assert!(summary.contains("Overall Real-time Factor: 0.2000x"));
    }

    #[test]
    fn error_rows_in_a_success_shaped_csv_blank_the_success_fields() {
        let row = success_shaped_row(&failure(1.5)).unwrap();
        assert_eq!(row.len(), SUCCESS_FIELDS.len());
        assert_eq!(row[0], "b.wav");
        // transcription..duration stay blank, the error message is dropped
        assert_eq!(&row[1..5], ["", "", "", ""]);
        assert_eq!(row[6], "1.50");
        assert_eq!(&row[7..10], ["", "", ""]);
    }

    #[test]
    fn error_shaped_rows_carry_the_error_message() {
        let row = error_shaped_row(&failure(0.25));
        assert_eq!(row, vec!["b.wav", "", "boom", "0.25", "2026-01-01 00:00:00"]);
    }
}
