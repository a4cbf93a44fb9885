use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use futures::{StreamExt, stream};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};

use crate::{
    config::Config,
    error::{Error, Result},
    pipeline::MinificationPipeline,
};

/// Bar of the batch currently running, log output is printed around it
static ACTIVE_PROGRESS: Mutex<Option<ProgressBar>> = Mutex::new(None);

/// Run `f` with the active progress bar (if any) cleared from the terminal
pub fn suspend_progress<R>(f: impl FnOnce() -> R) -> R {
    let bar = ACTIVE_PROGRESS.lock().ok().and_then(|bar| bar.clone());
    match bar {
        Some(bar) => bar.suspend(f),
        None => f(),
    }
}

fn set_active_progress(bar: Option<ProgressBar>) {
    if let Ok(mut active) = ACTIVE_PROGRESS.lock() {
        *active = bar;
    }
}

/// What happened to a single input file
#[derive(Debug)]
pub enum FileOutcome {
    Written {
        name: String,
        original_len: usize,
        minified_len: usize,
    },
    /// Target already existed and overwriting is off
    Skipped { name: String },
    Failed { name: String, error: Error },
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub written: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<(String, Error)>,
    pub original_bytes: usize,
    pub minified_bytes: usize,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Written {
                name,
                original_len,
                minified_len,
            } => {
                self.original_bytes += original_len;
                self.minified_bytes += minified_len;
                self.written.push(name);
            }
            FileOutcome::Skipped { name } => self.skipped.push(name),
            FileOutcome::Failed { name, error } => self.failed.push((name, error)),
        }
    }
}

/// Files directly inside `dir` ending in `.{extension}`, sorted by path
pub fn discover(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let dir_str = dir.to_str().ok_or_else(|| {
        Error::Configuration(format!("source directory {} is not valid UTF-8", dir.display()))
    })?;
    let pattern = format!(
        "{}/*.{}",
        glob::Pattern::escape(dir_str),
        glob::Pattern::escape(extension)
    );
    let paths = glob::glob(&pattern)
        .map_err(|e| Error::Configuration(format!("invalid file pattern {pattern}: {e}")))?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => warn!("Unable to read {}: {}", e.path().display(), e.error()),
        }
    }
    files.sort();
    Ok(files)
}

/// Minify every matching file of the source directory into the target directory.
///
/// Only a bad setup fails the run as a whole. Problems with a single file
/// are collected in the report and the remaining files are still processed.
pub async fn run(config: &Config) -> Result<BatchReport> {
    let now = Instant::now();

    if !config.source_dir.is_dir() {
        return Err(Error::Configuration(format!(
            "Source directory does not exist: {}",
            config.source_dir.display()
        )));
    }
    fs::create_dir_all(&config.target_dir).map_err(|e| Error::io(&config.target_dir, e))?;

    let files = discover(&config.source_dir, &config.extension)?;
    if files.is_empty() {
        warn!(
            "No *.{} files found in {}",
            config.extension,
            config.source_dir.display()
        );
    }

    let pipeline = Arc::new(MinificationPipeline::new(config.pipeline));
    let progress = progress_bar(files.len() as u64);
    set_active_progress(Some(progress.clone()));

    let mut outcomes = stream::iter(files)
        .map(|path| {
            let pipeline = pipeline.clone();
            let target_dir = config.target_dir.clone();
            let overwrite = config.overwrite;
            let name = file_name(&path);
            async move {
                let worker = tokio::task::spawn_blocking(move || {
                    process_file(&pipeline, &path, &target_dir, overwrite)
                });
                match worker.await {
                    Ok(outcome) => outcome,
                    Err(e) => FileOutcome::Failed {
                        name,
                        error: Error::Worker(e.to_string()),
                    },
                }
            }
        })
        .buffer_unordered(config.jobs);

    let mut report = BatchReport::default();
    while let Some(outcome) = outcomes.next().await {
        progress.inc(1);
        if let FileOutcome::Failed { name, error } = &outcome {
            match error.stage() {
                Some(stage) => error!("Failed to minify {name} ({stage} stage): {error}"),
                None => error!("Failed to minify {name}: {error}"),
            }
        }
        report.record(outcome);
    }
    set_active_progress(None);
    progress.finish_and_clear();

    report.written.sort();
    report.skipped.sort();
    report.failed.sort_by(|a, b| a.0.cmp(&b.0));
    report.elapsed = now.elapsed();
    Ok(report)
}

/// Read, minify and write one file. Nothing is written unless every stage succeeded.
pub fn process_file(
    pipeline: &MinificationPipeline,
    path: &Path,
    target_dir: &Path,
    overwrite: bool,
) -> FileOutcome {
    let name = file_name(path);
    let target = target_dir.join(&name);

    if !overwrite && target.exists() {
        debug!("Skipping {name}, {} already exists", target.display());
        return FileOutcome::Skipped { name };
    }

    info!("Minifying file: {name}");
    let result = fs::read_to_string(path)
        .map_err(|e| Error::io(path, e))
        .and_then(|source| {
            let minified = pipeline.process(&source)?;
            fs::write(&target, &minified).map_err(|e| Error::io(&target, e))?;
            Ok((source.len(), minified.len()))
        });

    match result {
        Ok((original_len, minified_len)) => FileOutcome::Written {
            name,
            original_len,
            minified_len,
        },
        Err(error) => FileOutcome::Failed { name, error },
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn progress_bar(len: u64) -> ProgressBar {
    let bar = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}") {
        bar.set_style(style);
    }
    bar
}
