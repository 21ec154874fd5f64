//! Configuration file
//!
//! TOML, flat keys for the kiosk itself plus a `[browser]` table for
//! launch settings. Every key is optional.

use browser::{FlagValue, LaunchOptions};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{KioskError, Result};
use crate::session::SessionConfig;

/// Built-in configuration, used when no file is given
pub const DEFAULT_CONFIG: &str = include_str!("../exhibit.toml");

/// Looked for in the working directory when the given path doesn't exist
pub const FALLBACK_FILE: &str = "exhibit.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KioskConfig {
    /// Empty means stdout
    pub logfile: String,
    pub loglevel: String,
    /// Idle timeout
    #[serde(rename = "browsertimeout", deserialize_with = "duration")]
    pub browser_timeout: Duration,
    /// Home page
    #[serde(rename = "browserurl")]
    pub browser_url: String,
    #[serde(rename = "browsertaskdelay", deserialize_with = "duration")]
    pub browser_task_delay: Duration,
    #[serde(rename = "starttimeout", deserialize_with = "duration")]
    pub start_timeout: Duration,
    #[serde(rename = "allowedprefixes")]
    pub allowed_prefixes: Vec<String>,
    pub browser: BrowserConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub executable: Option<PathBuf>,
    /// Persistent profile directory
    pub profile: Option<PathBuf>,
    /// Merged over the kiosk defaults
    pub flags: BTreeMap<String, FlagValue>,
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            logfile: String::new(),
            loglevel: "ERROR".to_string(),
            browser_timeout: Duration::from_secs(5 * 60),
            browser_url: "https://performance.ausstellung.cc/zoom/de?exhibition".to_string(),
            browser_task_delay: Duration::from_secs(2),
            start_timeout: Duration::from_secs(10),
            allowed_prefixes: vec!["https://ba14ns21403-sec1.fhnw.ch".to_string()],
            browser: BrowserConfig::default(),
        }
    }
}

impl KioskConfig {
    /// Load from `path`, from `./exhibit.toml` if `path` doesn't exist, or
    /// from the built-in defaults if no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Self::parse(DEFAULT_CONFIG);
        };

        let path = if path.exists() {
            path.to_path_buf()
        } else {
            PathBuf::from(FALLBACK_FILE)
        };

        let text = std::fs::read_to_string(&path)
            .map_err(|e| KioskError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::parse(&text)
            .map_err(|e| KioskError::Config(format!("error loading config file {}: {}", path.display(), e)))
    }

    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| KioskError::Config(e.to_string()))
    }

    pub fn logfile(&self) -> Option<&Path> {
        (!self.logfile.is_empty()).then(|| Path::new(&self.logfile))
    }

    pub fn session(&self) -> Result<SessionConfig> {
        SessionConfig::new(
            self.allowed_prefixes.clone(),
            &self.browser_url,
            self.browser_timeout,
            self.browser_task_delay,
        )
    }

    pub fn launch_options(&self) -> LaunchOptions {
        let mut options = LaunchOptions::kiosk();
        options.executable = self.browser.executable.clone();
        options.profile_dir = self.browser.profile.clone();
        options.start_timeout = self.start_timeout;
        for (name, value) in &self.browser.flags {
            options = options.flag(name.clone(), value.clone());
        }
        options
    }
}

/// Integer seconds, or a number with a `ms`, `s`, `m` or `h` suffix
fn duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}

pub fn parse_duration(text: &str) -> std::result::Result<Duration, String> {
    let text = text.trim();
    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);
    let value: u64 = number
        .parse()
        .map_err(|_| format!("invalid duration {:?}", text))?;

    let secs = |scale: u64| {
        value
            .checked_mul(scale)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("duration out of range {:?}", text))
    };

    match unit.trim() {
        "ms" => Ok(Duration::from_millis(value)),
        "" | "s" => secs(1),
        "m" => secs(60),
        "h" => secs(60 * 60),
        other => Err(format!("unknown duration unit {:?} in {:?}", other, text)),
    }
}
