//! Run configuration: optional JSON file, CLI overrides, environment fallback.
//!
//! Everything is resolved once at startup into an [`EnrichConfig`] value that
//! is passed down explicitly; nothing below `main` reads the environment.
use crate::cli::RunArgs;
use crate::lookup::GeminiSettings;
use crate::policy::OverwritePolicy;
use crate::store::is_workbook;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Current schema version for the config file.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;
/// Environment variable consulted last for the API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Low temperature keeps answers factual.
pub const DEFAULT_TEMPERATURE: f32 = 0.1;
pub const DEFAULT_DELAY_MS: u64 = 2000;
pub const DEFAULT_CHECKPOINT_EVERY: usize = 5;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Zero-based row slice: `start` inclusive, `end` exclusive (open when `None`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RowRange {
    #[serde(default)]
    pub start: usize,
    #[serde(default)]
    pub end: Option<usize>,
}

impl RowRange {
    pub fn new(start: usize, end: Option<usize>) -> Self {
        Self { start, end }
    }

    /// Concrete index range for a table of `total` rows.
    pub fn clamp(&self, total: usize) -> Range<usize> {
        let end = self.end.unwrap_or(total).min(total);
        self.start.min(end)..end
    }
}

impl FromStr for RowRange {
    type Err = String;

    /// Accepts `START..END`, `START..`, `..END`, and `..`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (start, end) = raw
            .trim()
            .split_once("..")
            .ok_or_else(|| format!("expected START..END, got {raw:?}"))?;
        let parse = |part: &str, label: &str| -> Result<Option<usize>, String> {
            let part = part.trim();
            if part.is_empty() {
                return Ok(None);
            }
            part.parse::<usize>()
                .map(Some)
                .map_err(|_| format!("invalid {label} row {part:?} in {raw:?}"))
        };
        let range = RowRange::new(parse(start, "start")?.unwrap_or(0), parse(end, "end")?);
        if range.end.is_some_and(|end| end < range.start) {
            return Err(format!("row range {raw:?} ends before it starts"));
        }
        Ok(range)
    }
}

impl std::fmt::Display for RowRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.end {
            Some(end) => write!(f, "{}..{}", self.start, end),
            None => write!(f, "{}..", self.start),
        }
    }
}

fn current_schema_version() -> u32 {
    CONFIG_SCHEMA_VERSION
}

/// On-disk config. Every field is optional; CLI flags take precedence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default = "current_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub input: Option<PathBuf>,
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub rows: Option<RowRange>,
    #[serde(default)]
    pub overwrite: Option<OverwritePolicy>,
    #[serde(default)]
    pub checkpoint_every: Option<usize>,
    #[serde(default)]
    pub delay_ms: Option<u64>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub lookup_log: Option<PathBuf>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            schema_version: CONFIG_SCHEMA_VERSION,
            input: None,
            output: None,
            rows: None,
            overwrite: None,
            checkpoint_every: None,
            delay_ms: None,
            model: None,
            temperature: None,
            endpoint: None,
            timeout_secs: None,
            api_key: None,
            lookup_log: None,
        }
    }
}

/// Fully resolved settings for one `run`.
#[derive(Debug, Clone)]
pub struct EnrichConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub rows: RowRange,
    pub overwrite: OverwritePolicy,
    pub checkpoint_every: usize,
    pub delay: Duration,
    pub lookup_log: Option<PathBuf>,
    /// Ignore an existing output and load the input instead.
    pub restart: bool,
    pub gemini: GeminiSettings,
}

impl EnrichConfig {
    /// Table a run starts from: the output of an earlier run when one exists,
    /// so rows it resolved are skipped, otherwise the input.
    pub fn working_table(&self) -> &Path {
        if !self.restart && self.output.is_file() {
            &self.output
        } else {
            &self.input
        }
    }
}

/// `<config dir>/cenrich/config.json`, used when `--config` is not given.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("cenrich").join("config.json"))
}

/// Load and schema-check a config file.
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: ConfigFile = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported config schema_version {} (expected {})",
            config.schema_version,
            CONFIG_SCHEMA_VERSION
        ));
    }
    Ok(config)
}

/// Explicit path must exist; the default location is optional.
pub fn resolve_config_file(explicit: Option<&Path>) -> Result<ConfigFile> {
    if let Some(path) = explicit {
        return load_config_file(path);
    }
    match default_config_path().filter(|path| path.is_file()) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "using default config file");
            load_config_file(&path)
        }
        None => Ok(ConfigFile::default()),
    }
}

/// Resolve the API key: flag, then config file, then `env_value`.
pub fn resolve_api_key(
    flag: Option<&str>,
    file: &ConfigFile,
    env_value: Option<String>,
) -> Result<String> {
    flag.map(str::to_string)
        .or_else(|| file.api_key.clone())
        .or(env_value)
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .ok_or_else(|| {
            anyhow!("no API key: pass --api-key, set \"api_key\" in the config file, or export {API_KEY_ENV}")
        })
}

/// Connection settings shared by `run` and `models`.
pub fn gemini_settings(
    file: &ConfigFile,
    api_key: String,
    model: Option<&str>,
    temperature: Option<f32>,
) -> GeminiSettings {
    GeminiSettings {
        api_key,
        model: model
            .map(str::to_string)
            .or_else(|| file.model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        endpoint: file
            .endpoint
            .clone()
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        temperature: temperature
            .or(file.temperature)
            .unwrap_or(DEFAULT_TEMPERATURE),
        timeout: Duration::from_secs(file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
    }
}

/// `companies.xlsx` -> `companies_enriched.csv` next to the input.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "companies".to_string());
    input.with_file_name(format!("{stem}_enriched.csv"))
}

/// Merge CLI flags over the config file and validate the result.
pub fn build_run_config(
    args: &RunArgs,
    file: &ConfigFile,
    env_api_key: Option<String>,
) -> Result<EnrichConfig> {
    let input = args
        .input
        .clone()
        .or_else(|| file.input.clone())
        .ok_or_else(|| anyhow!("no input dataset: pass --input or set \"input\" in the config file"))?;
    let output = args
        .output
        .clone()
        .or_else(|| file.output.clone())
        .unwrap_or_else(|| default_output_path(&input));
    let api_key = resolve_api_key(args.api_key.as_deref(), file, env_api_key)?;

    let config = EnrichConfig {
        rows: args.rows.or(file.rows).unwrap_or_default(),
        overwrite: args.overwrite.or(file.overwrite).unwrap_or_default(),
        checkpoint_every: args
            .checkpoint_every
            .or(file.checkpoint_every)
            .unwrap_or(DEFAULT_CHECKPOINT_EVERY),
        delay: Duration::from_millis(args.delay_ms.or(file.delay_ms).unwrap_or(DEFAULT_DELAY_MS)),
        lookup_log: args.lookup_log.clone().or_else(|| file.lookup_log.clone()),
        restart: args.restart,
        gemini: gemini_settings(file, api_key, args.model.as_deref(), args.temperature),
        input,
        output,
    };
    validate_config(&config)?;
    Ok(config)
}

/// Startup invariants; any failure aborts before the table is touched.
pub fn validate_config(config: &EnrichConfig) -> Result<()> {
    if same_file(&config.input, &config.output) {
        return Err(anyhow!(
            "output {} must differ from the input dataset",
            config.output.display()
        ));
    }
    if is_workbook(&config.output) {
        return Err(anyhow!(
            "output {} must be a .csv file; workbooks are read-only",
            config.output.display()
        ));
    }
    if config.checkpoint_every == 0 {
        return Err(anyhow!("checkpoint_every must be at least 1"));
    }
    if let Some(end) = config.rows.end {
        if end <= config.rows.start {
            return Err(anyhow!("row range {} is empty", config.rows));
        }
    }
    if config.gemini.model.trim().is_empty() {
        return Err(anyhow!("model must be non-empty"));
    }
    let temperature = config.gemini.temperature;
    if !(0.0..=2.0).contains(&temperature) {
        return Err(anyhow!(
            "temperature must be between 0.0 and 2.0 (got {temperature})"
        ));
    }
    if config.gemini.endpoint.trim().is_empty() {
        return Err(anyhow!("endpoint must be non-empty"));
    }
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
