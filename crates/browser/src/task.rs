//! Command sequences executed against the managed page

use serde_json::{json, Value};

/// One step of a command sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// `Page.navigate`
    Navigate(String),
    /// `<Domain>.enable` / `<Domain>.disable`
    Toggle { domain: String, enabled: bool },
}

impl Task {
    pub fn navigate(url: impl Into<String>) -> Self {
        Task::Navigate(url.into())
    }

    pub fn enable(domain: impl Into<String>) -> Self {
        Task::Toggle {
            domain: domain.into(),
            enabled: true,
        }
    }

    pub fn disable(domain: impl Into<String>) -> Self {
        Task::Toggle {
            domain: domain.into(),
            enabled: false,
        }
    }

    /// CDP method this task is sent as
    pub fn method(&self) -> String {
        match self {
            Task::Navigate(_) => "Page.navigate".to_string(),
            Task::Toggle { domain, enabled } => {
                format!("{}.{}", domain, if *enabled { "enable" } else { "disable" })
            }
        }
    }

    pub fn params(&self) -> Option<Value> {
        match self {
            Task::Navigate(url) => Some(json!({ "url": url })),
            Task::Toggle { .. } => None,
        }
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Task::Navigate(url) => write!(f, "navigate to {}", url),
            Task::Toggle { .. } => f.write_str(&self.method()),
        }
    }
}
