use std::path::{Path, PathBuf};

use async_trait::async_trait;
use skriba_core::{
    Device, ModelOutput, ModelSize, Pipeline, Result, Segment, SkribaError, SpeechModel,
    Transcriber,
};
use tempfile::TempDir;
use tokio::fs;

const SUCCESS_HEADER: &str = "filename,transcription,language,language_probability,duration,timestamp,processing_time,model,device,segments";
const ERROR_HEADER: &str = "filename,transcription,error,processing_time,timestamp";
const MASTER_HEADER: &str = "folder_name,files_processed,successful_files,files_with_errors,total_audio_duration_sec,processing_time_sec,real_time_factor,average_time_per_file_sec";

/// Files whose name contains "bad" fail; everything else yields two fixed
/// segments ("hi" 0-1s, "there" 1-2.5s).
struct ScriptedModel;

#[async_trait]
impl SpeechModel for ScriptedModel {
    async fn transcribe(&mut self, audio_path: &Path) -> Result<ModelOutput> {
        let name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if name.contains("bad") {
            return Err(SkribaError::TranscriptionFailed {
                audio_path: audio_path.to_path_buf(),
                reason: "corrupt stream".to_string(),
            });
        }
        Ok(ModelOutput {
            segments: vec![
                Segment {
                    start: 0.0,
                    end: 1.0,
                    text: "hi".to_string(),
                },
                Segment {
                    start: 1.0,
                    end: 2.5,
                    text: "there".to_string(),
                },
            ],
            language: "en".to_string(),
            language_probability: 0.97,
        })
    }
}

fn pipeline_over(input: &Path, output: &Path) -> Pipeline {
    let transcriber =
        Transcriber::with_model(ModelSize::Tiny, Device::Cpu, Box::new(ScriptedModel));
    Pipeline::new(input.to_path_buf(), output.to_path_buf(), transcriber)
}

async fn write_file(path: &PathBuf, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).await.unwrap();
    fs::write(path, contents).await.unwrap();
}

#[tokio::test]
async fn one_person_folder_end_to_end() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input");
    let output = dir.path().join("output");
    write_file(&input.join("alice").join("a.wav"), "").await;
    write_file(&input.join("alice").join("notes.txt"), "not audio").await;

    let mut pipeline = pipeline_over(&input, &output);
    pipeline.run().await.unwrap();

    let csv = fs::read_to_string(output.join("alice").join("alice_transcriptions.csv"))
        .await
        .unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next().unwrap(), SUCCESS_HEADER);
    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len(), 1, "notes.txt must be ignored");
    assert!(rows[0].starts_with("a.wav,hi there,en,0.9700,2.50,"));
    assert!(rows[0].contains(r#"""text"":""hi"""#), "segments column is JSON");

    let master = fs::read_to_string(output.join("master_transcription_log.csv"))
        .await
        .unwrap();
    let master_rows: Vec<&str> = master.lines().collect();
    assert_eq!(master_rows[0], MASTER_HEADER);
    assert_eq!(master_rows.len(), 2);
    assert!(master_rows[1].starts_with("alice,1,1,0,2.50,"));

    let summary = fs::read_to_string(output.join("transcription_summary.txt"))
        .await
        .unwrap();
    assert!(summary.contains("Folders Processed: 1"));
    assert!(summary.contains("Total Files Processed: 1"));
    assert!(summary.contains("Successful Files: 1"));
    assert!(summary.contains("Files With Errors: 0"));
}

#[tokio::test]
async fn folders_without_matching_files_produce_no_csv() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input");
    let output = dir.path().join("output");
    write_file(&input.join("bob").join("readme.md"), "no audio here").await;

    let mut pipeline = pipeline_over(&input, &output);
    pipeline.run().await.unwrap();

    assert!(
        !output
            .join("bob")
            .join("bob_transcriptions.csv")
            .exists()
    );

    // And no master-log row either: the folder never produced a result.
    let master = fs::read_to_string(output.join("master_transcription_log.csv"))
        .await
        .unwrap();
    assert_eq!(master.lines().count(), 1);
}

#[tokio::test]
async fn all_error_folder_uses_the_error_shaped_schema() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input");
    let output = dir.path().join("output");
    write_file(&input.join("carol").join("bad_one.wav"), "").await;
    write_file(&input.join("carol").join("bad_two.mp3"), "").await;

    let mut pipeline = pipeline_over(&input, &output);
    pipeline.run().await.unwrap();

    let csv = fs::read_to_string(output.join("carol").join("carol_transcriptions.csv"))
        .await
        .unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next().unwrap(), ERROR_HEADER);
    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len(), 2);
    for row in &rows {
        assert!(row.contains("corrupt stream"));
    }

    let stats = pipeline.stats();
    assert_eq!(stats.total_files_processed, 2);
    assert_eq!(stats.successful_files, 0);
    assert_eq!(stats.files_with_errors, 2);
}

#[tokio::test]
async fn mixed_folder_is_success_shaped_and_blanks_error_rows() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input");
    let output = dir.path().join("output");
    write_file(&input.join("dave").join("a.wav"), "").await;
    write_file(&input.join("dave").join("bad_take.wav"), "").await;

    let mut pipeline = pipeline_over(&input, &output);
    pipeline.run().await.unwrap();

    let csv = fs::read_to_string(output.join("dave").join("dave_transcriptions.csv"))
        .await
        .unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next().unwrap(), SUCCESS_HEADER);
    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len(), 2);

    let good = rows
        .iter()
        .find(|r| r.starts_with("a.wav,"))
        .expect("success row present");
    assert!(good.starts_with("a.wav,hi there,en,0.9700,2.50,"));

    let bad = rows
        .iter()
        .find(|r| r.starts_with("bad_take.wav,"))
        .expect("error row present");
    // Success-only fields stay blank and the error message is dropped.
    assert!(bad.starts_with("bad_take.wav,,,,,"));
    assert!(!bad.contains("corrupt stream"));
    assert!(bad.ends_with(",,,"));

    let stats = pipeline.stats();
    assert_eq!(
        stats.total_files_processed,
        stats.successful_files + stats.files_with_errors
    );
    let folder_total: usize = stats.folders.values().map(|f| f.file_count).sum();
    assert_eq!(folder_total, stats.total_files_processed);
}

#[tokio::test]
async fn master_log_is_alphabetical_and_guards_zero_denominators() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input");
    let output = dir.path().join("output");
    write_file(&input.join("zeta").join("bad.wav"), "").await;
    write_file(&input.join("alpha").join("a.flac"), "").await;

    let mut pipeline = pipeline_over(&input, &output);
    pipeline.run().await.unwrap();

    let master = fs::read_to_string(output.join("master_transcription_log.csv"))
        .await
        .unwrap();
    let rows: Vec<&str> = master.lines().skip(1).collect();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].starts_with("alpha,"));
    assert!(rows[1].starts_with("zeta,"));

    // zeta has no successful audio, so rtf reads 0.0000 rather than NaN.
    let zeta_fields: Vec<&str> = rows[1].split(',').collect();
    assert_eq!(zeta_fields[1], "1");
    assert_eq!(zeta_fields[2], "0");
    assert_eq!(zeta_fields[3], "1");
    assert_eq!(zeta_fields[4], "0.00");
    assert_eq!(zeta_fields[6], "0.0000");
}
