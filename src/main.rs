use crate::config::{Config, Settings};
use anyhow::Context;
use clap::Parser;
use log::{error, info, warn};
use std::{path::PathBuf, process::exit};

mod batch;
mod config;
mod error;
mod html;
mod pipeline;

#[derive(Parser, Debug)]
#[command(name("htmlmin"), version, about)]
struct Args {
    /// Directory containing the templates to minify
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// Directory where the minified templates are written
    #[arg(short, long)]
    target_dir: Option<PathBuf>,

    /// TOML config file, defaults to htmlmin.toml if present
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep target files that already exist
    #[arg(long, default_value_t = false)]
    no_overwrite: bool,

    /// Minify inline <script> blocks
    #[arg(long, default_value_t = false)]
    minify_inline_scripts: bool,

    /// Minify inline <style> blocks
    #[arg(long, default_value_t = false)]
    minify_inline_styles: bool,

    /// Extension of the files to minify
    #[arg(long)]
    extension: Option<String>,

    /// Number of files processed at the same time
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Print debug output
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn settings(&self) -> Settings {
        Settings {
            source_directory: self.source_dir.clone(),
            target_directory: self.target_dir.clone(),
            overwrite: self.no_overwrite.then_some(false),
            minify_inline_scripts: self.minify_inline_scripts.then_some(true),
            minify_inline_styles: self.minify_inline_styles.then_some(true),
            extension: self.extension.clone(),
            jobs: self.jobs,
        }
    }

    fn log_level(&self) -> Option<log::LevelFilter> {
        if self.verbose {
            Some(log::LevelFilter::Debug)
        } else if self.quiet {
            Some(log::LevelFilter::Warn)
        } else {
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    HtmlminLogger::init(args.log_level());

    let file_settings = match Settings::load(args.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            error!("{e}");
            exit(1);
        }
    };
    let config = match Config::resolve(args.settings().or(file_settings)) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            exit(1);
        }
    };

    info!(
        "Minifying {} into {}",
        config.source_dir.display(),
        config.target_dir.display()
    );
    let report = batch::run(&config)
        .await
        .context("HTML minification aborted")?;

    info!(
        "Minified {} file(s) in {:.2}s, {} -> {} bytes",
        report.written.len(),
        report.elapsed.as_secs_f64(),
        report.original_bytes,
        report.minified_bytes
    );
    if !report.skipped.is_empty() {
        warn!(
            "Skipped {} existing file(s), pass without --no-overwrite to replace them",
            report.skipped.len()
        );
    }
    if !report.is_success() {
        error!("{} file(s) failed", report.failed.len());
        exit(1);
    }

    Ok(())
}

struct HtmlminLogger;

impl log::Log for HtmlminLogger {
    fn enabled(&self, _: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        use log::Level;
        use owo_colors::OwoColorize;
        let header = match record.level() {
            Level::Warn => "[warn]".yellow().bold().to_string(),
            Level::Error => "[error]".red().bold().to_string(),
            Level::Info => "[info]".bright_blue().bold().to_string(),
            Level::Debug | Level::Trace => "[debug]".bright_purple().bold().to_string(),
        };
        batch::suspend_progress(|| println!("{} {}", header, record.args()));
    }

    fn flush(&self) {}
}

static LOGGER: HtmlminLogger = HtmlminLogger;
impl HtmlminLogger {
    pub fn init(level: Option<log::LevelFilter>) {
        log::set_logger(&LOGGER).expect("Failed to initialize logger");
        log::set_max_level(level.unwrap_or(if cfg!(debug_assertions) {
            log::LevelFilter::Trace
        } else {
            log::LevelFilter::Info
        }));
    }
}
