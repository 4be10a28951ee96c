#![forbid(unsafe_code)]

//! Runtime settings for the collector.
//!
//! Values are resolved in three layers: CLI overrides win over process
//! environment variables, which win over the `.env` file in the working
//! directory. Anything left unset falls back to a built-in default.

use anyhow::{Context, Result};
use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub const DEFAULT_ENV_PATH: &str = ".env";
pub const DEFAULT_OUTPUT_DIR: &str = "data";
pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
pub const DEFAULT_RATE_LIMIT_PAUSE_SECS: u64 = 60;
pub const DEFAULT_KEY_ROTATION_PAUSE_MS: u64 = 1000;
pub const DEFAULT_PAGE_PAUSE_MS: u64 = 100;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Blocking pauses applied by the collection loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Wait after the API answered 429.
    pub rate_limit: Duration,
    /// Wait after switching to the next API key.
    pub key_rotation: Duration,
    /// Wait between two continuation pages.
    pub page: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            rate_limit: Duration::from_secs(DEFAULT_RATE_LIMIT_PAUSE_SECS),
            key_rotation: Duration::from_millis(DEFAULT_KEY_ROTATION_PAUSE_MS),
            page: Duration::from_millis(DEFAULT_PAGE_PAUSE_MS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub output_dir: PathBuf,
    pub api_base_url: String,
    pub http_timeout: Duration,
    pub pacing: Pacing,
}

#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub output_dir: Option<PathBuf>,
    pub env_path: Option<PathBuf>,
}

pub fn resolve_settings(overrides: SettingsOverrides) -> Result<Settings> {
    let env_path = overrides
        .env_path
        .as_deref()
        .unwrap_or_else(|| Path::new(DEFAULT_ENV_PATH));
    let source = SettingSource {
        file_vars: read_env_file(env_path)?,
        process_var: non_blank_process_var,
    };
    Ok(build_settings(&source, overrides))
}

/// Process environment first, `.env` values second.
struct SettingSource<F> {
    file_vars: HashMap<String, String>,
    process_var: F,
}

impl<F: Fn(&str) -> Option<String>> SettingSource<F> {
    fn get(&self, name: &str) -> Option<String> {
        (self.process_var)(name).or_else(|| self.file_vars.get(name).cloned())
    }

    /// Unparsable or negative values fall back to `default`.
    fn number(&self, name: &str, default: u64) -> u64 {
        self.get(name)
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(default)
    }
}

fn build_settings<F>(source: &SettingSource<F>, overrides: SettingsOverrides) -> Settings
where
    F: Fn(&str) -> Option<String>,
{
    let output_dir = overrides
        .output_dir
        .or_else(|| source.get("OUTPUT_DIR").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
    let api_base_url = source
        .get("YOUTUBE_API_BASE_URL")
        .map(|url| url.trim_end_matches('/').to_string())
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

    let secs = |name, default| Duration::from_secs(source.number(name, default));
    let millis = |name, default| Duration::from_millis(source.number(name, default));

    Settings {
        output_dir,
        api_base_url,
        http_timeout: secs("HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS),
        pacing: Pacing {
            rate_limit: secs("RATE_LIMIT_PAUSE_SECS", DEFAULT_RATE_LIMIT_PAUSE_SECS),
            key_rotation: millis("KEY_ROTATION_PAUSE_MS", DEFAULT_KEY_ROTATION_PAUSE_MS),
            page: millis("PAGE_PAUSE_MS", DEFAULT_PAGE_PAUSE_MS),
        },
    }
}

fn non_blank_process_var(name: &str) -> Option<String> {
    let value = env::var(name).ok()?;
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Reads `KEY=value` pairs. A missing file is the same as an empty one.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(content.lines().filter_map(parse_env_line).collect())
}

/// `export` prefixes, comments and one level of matching quotes are handled.
fn parse_env_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").unwrap_or(line);
    let (name, value) = line.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), unquote(value.trim()).to_string()))
}

fn unquote(value: &str) -> &str {
    ['"', '\'']
        .into_iter()
        .find_map(|quote| value.strip_prefix(quote)?.strip_suffix(quote))
        .unwrap_or(value)
}
