//! Kiosk session: what to show and what may be shown

use std::time::Duration;
use url::Url;
use uuid::Uuid;

use crate::error::{KioskError, Result};

/// URL prefixes a page may be loaded from
///
/// Plain string prefixes. `https://example.org` therefore also admits
/// `https://example.org.other.test`; list a trailing `/` to prevent that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList {
    prefixes: Vec<String>,
}

impl AllowList {
    pub fn new(prefixes: Vec<String>) -> Self {
        Self { prefixes }
    }

    /// True iff `url` starts with at least one entry
    pub fn permits(&self, url: &str) -> bool {
        self.prefixes.iter().any(|prefix| url.starts_with(prefix.as_str()))
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }
}

/// Scheme and host (and port) of `home`, with path, query and fragment dropped
pub fn home_origin(home: &Url) -> String {
    let mut origin = home.clone();
    origin.set_path("");
    origin.set_query(None);
    origin.set_fragment(None);
    origin.as_str().trim_end_matches('/').to_string()
}

/// The one kiosk session this process runs
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub id: Uuid,
    pub home: Url,
    pub allow_list: AllowList,
    /// Go home after this long without any browser event
    pub idle_timeout: Duration,
    /// Grace period between launch and the first command sequence
    pub task_delay: Duration,
}

impl SessionConfig {
    /// Validate the home URL and build the allow-list, which always
    /// includes the home origin
    pub fn new(
        allowed_prefixes: Vec<String>,
        home_url: &str,
        idle_timeout: Duration,
        task_delay: Duration,
    ) -> Result<Self> {
        let home = Url::parse(home_url)
            .map_err(|e| KioskError::Config(format!("cannot parse home URL {:?}: {}", home_url, e)))?;

        let mut prefixes = allowed_prefixes;
        prefixes.push(home_origin(&home));

        Ok(Self {
            id: Uuid::now_v7(),
            home,
            allow_list: AllowList::new(prefixes),
            idle_timeout,
            task_delay,
        })
    }
}
