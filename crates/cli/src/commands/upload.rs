use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use serde::Serialize;

use imgstore_core::object::content_type_from_name;
use imgstore_core::{BatchItemResult, BatchSummary, ImageUpload};

use crate::config::AppConfig;
use crate::progress;

#[derive(Args)]
pub struct UploadArgs {
    /// Image files to upload
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Content type to declare for every file (default: guessed from extension)
    #[arg(long)]
    content_type: Option<String>,

    /// Print the batch report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct BatchReport<'a> {
    #[serde(flatten)]
    summary: BatchSummary,
    results: &'a [BatchItemResult],
}

fn read_upload(path: &Path, content_type: Option<&str>) -> Result<ImageUpload> {
    let data = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let original_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string);
    let content_type = content_type
        .map(str::to_string)
        .or_else(|| original_name.as_deref().map(content_type_from_name));
    Ok(ImageUpload {
        original_name,
        content_type,
        data: data.into(),
    })
}

pub async fn run(args: UploadArgs) -> Result<()> {
    let config = AppConfig::load()?;
    let store = config.open_store()?;

    if let [path] = args.files.as_slice() {
        let upload = read_upload(path, args.content_type.as_deref())?;
        let stored = store.upload(&upload).await?;
        println!("{stored}");
        return Ok(());
    }

    let pb = progress::file_bar(args.files.len() as u64);
    let mut uploads = Vec::with_capacity(args.files.len());
    for path in &args.files {
        pb.set_message(path.display().to_string());
        uploads.push(read_upload(path, args.content_type.as_deref())?);
        pb.inc(1);
    }
    pb.finish_and_clear();

    let spinner = progress::spinner(format!("Uploading {} files...", uploads.len()));
    let results = store.upload_multiple(&uploads).await;
    spinner.finish_and_clear();

    let summary = BatchSummary::from_uploads(&results);
    if args.json {
        let report = BatchReport {
            summary,
            results: &results,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for result in &results {
            let original = result.original_name.as_deref().unwrap_or("-");
            match (result.stored_name(), result.error()) {
                (Some(stored), _) => println!("{} {original} -> {stored}", style("ok").green()),
                (None, Some(error)) => println!("{} {original}: {error}", style("failed").red()),
                (None, None) => {}
            }
        }
        println!(
            "\n{} files: {} uploaded, {} failed",
            summary.total, summary.succeeded, summary.failed
        );
    }

    if summary.succeeded == 0 {
        anyhow::bail!("no files were uploaded");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_is_guessed_unless_given() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cat.png");
        std::fs::write(&path, b"\x89PNG").unwrap();

        let guessed = read_upload(&path, None).unwrap();
        assert_eq!(guessed.original_name.as_deref(), Some("cat.png"));
        assert_eq!(guessed.content_type.as_deref(), Some("image/png"));
        assert_eq!(guessed.extension(), ".png");
        assert!(guessed.validate().is_ok());

        let forced = read_upload(&path, Some("text/plain")).unwrap();
        assert_eq!(forced.content_type.as_deref(), Some("text/plain"));
        assert!(forced.validate().is_err());
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_upload(&dir.path().join("nope.png"), None).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
