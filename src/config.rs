use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{
    error::{Error, Result},
    pipeline::PipelineOptions,
};

/// Looked up in the working directory when no config file is given
pub const DEFAULT_CONFIG_FILE: &str = "htmlmin.toml";

/// One layer of settings, every field optional. Layers are stacked with
/// [`Settings::or`] and resolved into a [`Config`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub source_directory: Option<PathBuf>,
    pub target_directory: Option<PathBuf>,
    pub overwrite: Option<bool>,
    pub minify_inline_scripts: Option<bool>,
    pub minify_inline_styles: Option<bool>,
    pub extension: Option<String>,
    pub jobs: Option<usize>,
}

impl Settings {
    /// Fill unset fields of `self` from `fallback`
    pub fn or(self, fallback: Settings) -> Settings {
        Settings {
            source_directory: self.source_directory.or(fallback.source_directory),
            target_directory: self.target_directory.or(fallback.target_directory),
            overwrite: self.overwrite.or(fallback.overwrite),
            minify_inline_scripts: self.minify_inline_scripts.or(fallback.minify_inline_scripts),
            minify_inline_styles: self.minify_inline_styles.or(fallback.minify_inline_styles),
            extension: self.extension.or(fallback.extension),
            jobs: self.jobs.or(fallback.jobs),
        }
    }

    pub fn parse(text: &str) -> Result<Settings> {
        toml::from_str(text).map_err(|e| Error::Configuration(format!("invalid config: {e}")))
    }

    /// Read settings from `path`, or from [`DEFAULT_CONFIG_FILE`] if it exists.
    /// An explicitly given file must exist.
    pub fn load(path: Option<&Path>) -> Result<Settings> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Settings::default());
                }
                default
            }
        };
        let text = fs::read_to_string(&path).map_err(|e| {
            Error::Configuration(format!("unable to read {}: {e}", path.display()))
        })?;
        Self::parse(&text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub source_dir: PathBuf,
    pub target_dir: PathBuf,
    /// Replace target files that already exist
    pub overwrite: bool,
    pub pipeline: PipelineOptions,
    /// Extension of the files to pick up, without the dot
    pub extension: String,
    /// Files processed at the same time
    pub jobs: usize,
}

impl Config {
    pub fn resolve(settings: Settings) -> Result<Config> {
        let jobs = settings.jobs.unwrap_or_else(default_jobs);
        if jobs == 0 {
            return Err(Error::Configuration("jobs must be at least 1".into()));
        }
        let extension = settings
            .extension
            .map(|ext| ext.trim_start_matches('.').to_string())
            .unwrap_or_else(|| "html".into());
        if extension.is_empty() {
            return Err(Error::Configuration("extension must not be empty".into()));
        }

        Ok(Config {
            source_dir: settings
                .source_directory
                .unwrap_or_else(|| PathBuf::from("src/main/resources/templates")),
            target_dir: settings
                .target_directory
                .unwrap_or_else(|| PathBuf::from("target/minified")),
            overwrite: settings.overwrite.unwrap_or(true),
            pipeline: PipelineOptions {
                minify_inline_scripts: settings.minify_inline_scripts.unwrap_or(false),
                minify_inline_styles: settings.minify_inline_styles.unwrap_or(false),
            },
            extension,
            jobs,
        })
    }
}

fn default_jobs() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}
