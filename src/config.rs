//! Runtime configuration
//!
//! Loads `config.yml` (current or parent directory), then applies environment
//! overrides. A `.env` file is read first via dotenvy. Missing file means
//! built-in defaults.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, FixedOffset};
use serde::Deserialize;
use tracing::warn;

use crate::analysis::{AnalysisParams, DEFAULT_INITIATION_GAP_MINUTES, DEFAULT_MAX_RESPONSE_GAP_HOURS};
use crate::parser::window::{window_from_days, MAX_WINDOW_DAYS};
use crate::parser::{ParseOptions, DEFAULT_WINDOW_DAYS};
use crate::{Error, Result};

pub const CONFIG_FILE: &str = "config.yml";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_OPENAI_MAX_TOKENS: u32 = 1000;
/// Tail of the conversation sent to the model.
pub const DEFAULT_RECENT_MESSAGES: usize = 50;
pub const DEFAULT_HISTORY_PATH: &str = ".chat_temperature/history.json";
pub const DEFAULT_HISTORY_MAX_ENTRIES: usize = 10;
pub const DEFAULT_OUTPUT_DIR: &str = "reports";
/// One year.
pub const MAX_INITIATION_GAP_MINUTES: i64 = 525_600;
/// One year.
pub const MAX_RESPONSE_GAP_HOURS: i64 = 8_760;

pub const ENV_WINDOW_DAYS: &str = "CHAT_TEMPERATURE_WINDOW_DAYS";
pub const ENV_INITIATION_GAP: &str = "CHAT_TEMPERATURE_INITIATION_GAP_MINUTES";
pub const ENV_HISTORY_PATH: &str = "CHAT_TEMPERATURE_HISTORY_PATH";
pub const ENV_OPENAI_MODEL: &str = "OPENAI_MODEL";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_PROMPTS_DIR: &str = "PROMPTS_DIR";

/// YAML config structures
#[derive(Debug, Default, Deserialize)]
struct YamlConfig {
    analysis: Option<AnalysisYaml>,
    openai: Option<OpenAIYaml>,
    history: Option<HistoryYaml>,
    output: Option<OutputYaml>,
    prompts_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AnalysisYaml {
    window_days: Option<i64>,
    initiation_gap_minutes: Option<i64>,
    max_response_gap_hours: Option<i64>,
    /// e.g. "+09:00"; local offset when absent.
    utc_offset: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAIYaml {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    recent_messages: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct HistoryYaml {
    path: Option<String>,
    max_entries: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct OutputYaml {
    dir: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSettings {
    pub window_days: i64,
    pub initiation_gap_minutes: i64,
    pub max_response_gap_hours: i64,
    pub utc_offset: Option<FixedOffset>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenAISettings {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub recent_messages: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistorySettings {
    pub path: PathBuf,
    pub max_entries: usize,
}

/// Main configuration struct
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub analysis: AnalysisSettings,
    pub openai: OpenAISettings,
    pub history: HistorySettings,
    pub output_dir: PathBuf,
    pub prompts_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Load configuration from config.yml or use defaults.
    /// Environment variables take precedence over config.yml values.
    pub fn new() -> Self {
        Self::load_from_file(CONFIG_FILE)
            .or_else(|_| Self::load_from_file(Path::new("..").join(CONFIG_FILE)))
            .unwrap_or_else(|_| {
                Self::load_dotenv();
                let mut config = Self::defaults();
                config.apply_env_overrides();
                config
            })
    }

    /// Built-in defaults, no file or environment involved.
    pub fn defaults() -> Self {
        Self {
            analysis: AnalysisSettings {
                window_days: DEFAULT_WINDOW_DAYS,
                initiation_gap_minutes: DEFAULT_INITIATION_GAP_MINUTES,
                max_response_gap_hours: DEFAULT_MAX_RESPONSE_GAP_HOURS,
                utc_offset: None,
            },
            openai: OpenAISettings {
                api_key: None,
                base_url: None,
                model: DEFAULT_OPENAI_MODEL.to_string(),
                temperature: DEFAULT_OPENAI_TEMPERATURE,
                max_tokens: DEFAULT_OPENAI_MAX_TOKENS,
                recent_messages: DEFAULT_RECENT_MESSAGES,
            },
            history: HistorySettings {
                path: PathBuf::from(DEFAULT_HISTORY_PATH),
                max_entries: DEFAULT_HISTORY_MAX_ENTRIES,
            },
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            prompts_dir: None,
        }
    }

    fn load_dotenv() {
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_filename("../.env");
        }
    }

    /// Load configuration from a specific file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_dotenv();

        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let mut config = Self::from_yaml_str(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse YAML on top of the defaults. `${VAR}` placeholders are resolved.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let yaml: YamlConfig = if content.trim().is_empty() {
            YamlConfig::default()
        } else {
            serde_yaml::from_str(content)
                .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?
        };

        let mut config = Self::defaults();

        let analysis = yaml.analysis.unwrap_or_default();
        if let Some(days) = analysis.window_days {
            config.analysis.window_days = in_range("analysis.window_days", days, MAX_WINDOW_DAYS)?;
        }
        if let Some(minutes) = analysis.initiation_gap_minutes {
            config.analysis.initiation_gap_minutes = in_range(
                "analysis.initiation_gap_minutes",
                minutes,
                MAX_INITIATION_GAP_MINUTES,
            )?;
        }
        if let Some(hours) = analysis.max_response_gap_hours {
            config.analysis.max_response_gap_hours = in_range(
                "analysis.max_response_gap_hours",
                hours,
                MAX_RESPONSE_GAP_HOURS,
            )?;
        }
        if let Some(offset) = analysis.utc_offset {
            config.analysis.utc_offset = Some(parse_utc_offset(&offset)?);
        }

        let openai = yaml.openai.unwrap_or_default();
        config.openai.api_key = resolve_env_string(openai.api_key).filter(|k| !k.is_empty());
        config.openai.base_url = resolve_env_string(openai.base_url).filter(|u| !u.is_empty());
        if let Some(model) = resolve_env_string(openai.model).filter(|m| !m.is_empty()) {
            config.openai.model = model;
        }
        if let Some(temperature) = openai.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(Error::ConfigError(format!(
                    "openai.temperature must be within 0..=2, got {}",
                    temperature
                )));
            }
            config.openai.temperature = temperature;
        }
        if let Some(max_tokens) = openai.max_tokens {
            config.openai.max_tokens = max_tokens;
        }
        if let Some(recent) = openai.recent_messages {
            config.openai.recent_messages = recent.max(1);
        }

        let history = yaml.history.unwrap_or_default();
        if let Some(path) = resolve_env_string(history.path).filter(|p| !p.is_empty()) {
            config.history.path = PathBuf::from(path);
        }
        if let Some(max_entries) = history.max_entries {
            config.history.max_entries = max_entries.max(1);
        }

        if let Some(dir) = yaml.output.and_then(|o| o.dir) {
            config.output_dir = PathBuf::from(dir);
        }
        config.prompts_dir = yaml.prompts_dir.map(PathBuf::from);

        Ok(config)
    }

    /// Environment variables win over file values. Invalid numbers are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Some(days) = env_bounded_i64(ENV_WINDOW_DAYS, MAX_WINDOW_DAYS) {
            self.analysis.window_days = days;
        }
        if let Some(minutes) = env_bounded_i64(ENV_INITIATION_GAP, MAX_INITIATION_GAP_MINUTES) {
            self.analysis.initiation_gap_minutes = minutes;
        }
        if let Some(model) = env_non_empty(ENV_OPENAI_MODEL) {
            self.openai.model = model;
        }
        if let Some(key) = env_non_empty(ENV_OPENAI_API_KEY) {
            self.openai.api_key = Some(key);
        }
        if let Some(path) = env_non_empty(ENV_HISTORY_PATH) {
            self.history.path = PathBuf::from(path);
        }
        if let Some(dir) = env_non_empty(ENV_PROMPTS_DIR) {
            self.prompts_dir = Some(PathBuf::from(dir));
        }
    }

    /// Parser options for "now", honoring the configured window and offset.
    pub fn parse_options(&self) -> ParseOptions {
        let options = ParseOptions::default().with_window_days(self.analysis.window_days);
        match self.analysis.utc_offset {
            Some(offset) => options.with_utc_offset(offset),
            None => options,
        }
    }

    /// [`Self::parse_options`] with an optional window override. The window
    /// must be within `1..=MAX_WINDOW_DAYS`.
    pub fn parse_options_with_window(&self, window_days: Option<i64>) -> Result<ParseOptions> {
        let mut options = self.parse_options();
        options.window = window_from_days(window_days.unwrap_or(self.analysis.window_days))?;
        Ok(options)
    }

    /// Out-of-range values saturate instead of overflowing.
    pub fn analysis_params(&self) -> AnalysisParams {
        let saturate = |d: Option<Duration>| d.unwrap_or(Duration::MAX);
        AnalysisParams {
            initiation_gap: saturate(Duration::try_minutes(self.analysis.initiation_gap_minutes)),
            max_response_gap: saturate(Duration::try_hours(self.analysis.max_response_gap_hours)),
        }
    }
}

fn in_range(name: &str, value: i64, max: i64) -> Result<i64> {
    if !(1..=max).contains(&value) {
        return Err(Error::ConfigError(format!(
            "{} must be between 1 and {}, got {}",
            name, max, value
        )));
    }
    Ok(value)
}

/// Accepts "+09:00", "-05:30" or "Z".
pub fn parse_utc_offset(value: &str) -> Result<FixedOffset> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0)
            .ok_or_else(|| Error::ConfigError("invalid UTC offset".to_string()));
    }
    value
        .parse::<FixedOffset>()
        .map_err(|e| Error::ConfigError(format!("Invalid UTC offset '{}': {}", value, e)))
}

/// If the YAML value looks like `${VAR}`, take it from the environment.
fn resolve_env_string(value: Option<String>) -> Option<String> {
    let value = value?;
    match value
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
    {
        Some(var_name) => std::env::var(var_name).ok(),
        None => Some(value),
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_bounded_i64(key: &str, max: i64) -> Option<i64> {
    let raw = env_non_empty(key)?;
    match raw.trim().parse::<i64>() {
        Ok(value) if (1..=max).contains(&value) => Some(value),
        _ => {
            warn!(key, value = %raw, "Ignoring invalid numeric environment override");
            None
        }
    }
}
