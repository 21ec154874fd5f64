//! Browser process launch
//!
//! Starts Chromium with `--remote-debugging-port=0` and learns the real
//! port from the `DevToolsActivePort` file Chromium writes into its
//! profile directory.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::{Child, Command};

use crate::error::{DriverError, Result};

/// Name of the handshake descriptor inside the profile directory
pub const DEVTOOLS_ACTIVE_PORT: &str = "DevToolsActivePort";

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Value of a command-line flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Str(String),
}

/// How to start the browser
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Browser binary. Searched for when unset.
    pub executable: Option<PathBuf>,

    /// Persistent profile directory. A throwaway one is used when unset.
    pub profile_dir: Option<PathBuf>,

    /// How long to wait for the DevTools descriptor after spawning
    pub start_timeout: Duration,

    /// `--name` / `--name=value` flags, rendered in name order
    pub flags: BTreeMap<String, FlagValue>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            executable: None,
            profile_dir: None,
            start_timeout: Duration::from_secs(10),
            flags: BTreeMap::new(),
        }
    }
}

impl LaunchOptions {
    /// Fullscreen kiosk with notifications, infobars and crash bubbles off
    pub fn kiosk() -> Self {
        let mut options = Self::default();
        let flags = [
            ("headless", FlagValue::Bool(false)),
            ("start-fullscreen", FlagValue::Bool(true)),
            ("kiosk", FlagValue::Bool(true)),
            ("disable-notifications", FlagValue::Bool(true)),
            ("disable-infobars", FlagValue::Bool(true)),
            ("disable-gpu", FlagValue::Bool(false)),
            ("disable-audio-output", FlagValue::Bool(false)),
            ("mute-audio", FlagValue::Bool(false)),
            ("allow-insecure-localhost", FlagValue::Bool(true)),
            ("enable-immersive-fullscreen-toolbar", FlagValue::Bool(true)),
            ("enable-fullscreen-toolbar-reveal", FlagValue::Bool(false)),
            ("disable-session-crashed-bubble", FlagValue::Bool(true)),
            ("incognito", FlagValue::Bool(true)),
            ("enable-automation", FlagValue::Bool(false)),
            ("no-first-run", FlagValue::Bool(true)),
            ("no-default-browser-check", FlagValue::Bool(true)),
            (
                "disable-features",
                FlagValue::Str(
                    "InfiniteSessionRestore,TranslateUI,PreloadMediaEngagementData,\
                     AutoplayIgnoreWebAudio,MediaEngagementBypassAutoplayPolicies"
                        .to_string(),
                ),
            ),
        ];
        for (name, value) in flags {
            options.flags.insert(name.to_string(), value);
        }
        options
    }

    /// Set a flag, replacing any earlier value
    pub fn flag(mut self, name: impl Into<String>, value: FlagValue) -> Self {
        self.flags.insert(name.into(), value);
        self
    }

    /// Render the flags as command-line arguments
    pub fn to_args(&self) -> Vec<String> {
        self.flags
            .iter()
            .filter_map(|(name, value)| match value {
                FlagValue::Bool(true) => Some(format!("--{}", name)),
                FlagValue::Bool(false) => None,
                FlagValue::Str(v) => Some(format!("--{}={}", name, v)),
            })
            .collect()
    }
}

/// Where the browser keeps its profile
#[derive(Debug)]
pub enum Profile {
    /// Removed when dropped
    Temporary(TempDir),
    Persistent(PathBuf),
}

impl Profile {
    pub fn create(options: &LaunchOptions) -> Result<Self> {
        match &options.profile_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                // A stale descriptor from the last run would point at a dead port
                match std::fs::remove_file(dir.join(DEVTOOLS_ACTIVE_PORT)) {
                    Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
                    _ => {}
                }
                Ok(Profile::Persistent(dir.clone()))
            }
            None => Ok(Profile::Temporary(
                tempfile::Builder::new().prefix("exhibit-").tempdir()?,
            )),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Profile::Temporary(dir) => dir.path(),
            Profile::Persistent(path) => path,
        }
    }
}

/// Browser-level DevTools endpoint from `DevToolsActivePort`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevToolsEndpoint {
    pub port: u16,
    /// e.g. `/devtools/browser/<id>`
    pub browser_path: String,
}

impl DevToolsEndpoint {
    /// Parse the descriptor: port on line one, WebSocket path on line two
    pub fn parse(contents: &str) -> std::result::Result<Self, String> {
        let mut lines = contents.lines().map(str::trim);

        let port = lines
            .next()
            .filter(|l| !l.is_empty())
            .ok_or("empty descriptor")?;
        let port: u16 = port
            .parse()
            .map_err(|e| format!("invalid port {:?}: {}", port, e))?;

        let browser_path = lines.next().ok_or("missing browser path")?;
        if !browser_path.starts_with('/') {
            return Err(format!("invalid browser path {:?}", browser_path));
        }

        Ok(Self {
            port,
            browser_path: browser_path.to_string(),
        })
    }

    /// Read the descriptor from a profile directory
    pub fn read(profile_dir: &Path) -> Result<Self> {
        let path = profile_dir.join(DEVTOOLS_ACTIVE_PORT);
        let contents = std::fs::read_to_string(&path).map_err(|e| DriverError::Descriptor {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        Self::parse(&contents).map_err(|reason| DriverError::Descriptor { path, reason })
    }

    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}{}", self.port, self.browser_path)
    }
}

/// Locate a Chromium-family browser
pub fn find_chrome_executable() -> Option<PathBuf> {
    let candidates: &[&str] = if cfg!(target_os = "macos") {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
        ]
    } else if cfg!(target_os = "windows") {
        &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
            "chrome",
            "msedge",
        ]
    } else {
        &[
            "google-chrome-stable",
            "google-chrome",
            "chromium-browser",
            "chromium",
            "brave-browser",
            "/snap/bin/chromium",
        ]
    };

    candidates.iter().find_map(|candidate| {
        let path = Path::new(candidate);
        if path.is_absolute() {
            path.exists().then(|| path.to_path_buf())
        } else {
            which::which(candidate).ok()
        }
    })
}

/// Spawn the browser and wait until it publishes its DevTools endpoint
pub async fn spawn(options: &LaunchOptions, profile: &Profile) -> Result<(Child, DevToolsEndpoint)> {
    let executable = options
        .executable
        .clone()
        .or_else(find_chrome_executable)
        .ok_or(DriverError::ExecutableNotFound)?;

    let mut cmd = Command::new(&executable);
    cmd.args(options.to_args())
        .arg(format!("--user-data-dir={}", profile.path().display()))
        .arg("--remote-debugging-port=0")
        .arg("about:blank")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    tracing::info!("Launching browser: {}", executable.display());
    let mut child = cmd.spawn().map_err(|source| DriverError::Spawn {
        path: executable.clone(),
        source,
    })?;

    let endpoint = wait_for_endpoint(&mut child, profile.path(), options.start_timeout).await?;
    tracing::debug!("DevTools endpoint: {}", endpoint.ws_url());
    Ok((child, endpoint))
}

async fn wait_for_endpoint(
    child: &mut Child,
    profile_dir: &Path,
    timeout: Duration,
) -> Result<DevToolsEndpoint> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Err(DriverError::Exited(status));
        }

        // Chromium writes the file in two steps; a half-written one fails to parse
        if let Ok(endpoint) = DevToolsEndpoint::read(profile_dir) {
            return Ok(endpoint);
        }

        if tokio::time::Instant::now() >= deadline {
            let _ = child.start_kill();
            return Err(DriverError::StartTimeout(timeout));
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
