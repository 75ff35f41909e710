//! Configuration types for Tapedeck

use std::fmt;
use std::time::Duration;

use hyper::header::HeaderName;
use serde::{Deserialize, Serialize};

use crate::matcher::Rule;
use crate::stabilizer::HeaderStabilizer;
use crate::{Result, TapedeckError};

/// Settings that can be loaded from a TOML file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Headers stripped from every recording, before any rule stabilizers
    #[serde(default)]
    pub strip_headers: Vec<String>,
    /// Whether rules get the default `Date` stabilizer
    #[serde(default = "default_true")]
    pub add_date_stabilizer: bool,
    /// Upper bound on waiting for another task's recording; unbounded if unset
    #[serde(default)]
    pub wait_timeout_ms: Option<u64>,
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            strip_headers: Vec::new(),
            add_date_stabilizer: true,
            wait_timeout_ms: None,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TapedeckError::ConfigError(format!("Failed to read config file: {e}")))?;

        let settings: Self = toml::from_str(&content)
            .map_err(|e| TapedeckError::ConfigError(format!("Failed to parse config: {e}")))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings
    ///
    /// # Errors
    ///
    /// Returns error if a header name is invalid or the timeout is zero
    pub fn validate(&self) -> Result<()> {
        for (i, name) in self.strip_headers.iter().enumerate() {
            if HeaderName::from_bytes(name.as_bytes()).is_err() {
                return Err(TapedeckError::ConfigError(format!(
                    "strip_headers[{i}]: invalid header name '{name}'"
                )));
            }
        }

        if self.wait_timeout_ms == Some(0) {
            return Err(TapedeckError::ConfigError(
                "wait_timeout_ms must be > 0 when set".to_string(),
            ));
        }

        Ok(())
    }

    /// Waiter timeout as a duration
    #[must_use]
    pub fn wait_timeout(&self) -> Option<Duration> {
        self.wait_timeout_ms.map(Duration::from_millis)
    }
}

/// Everything a client needs: rules, top-level stabilizers, settings
#[derive(Default)]
pub struct ClientConfig {
    /// Rules in priority order
    pub rules: Vec<Rule>,
    /// Stabilizers applied to every recording before rule stabilizers
    pub stabilizers: Vec<HeaderStabilizer>,
    /// Loadable settings
    pub settings: Settings,
}

impl ClientConfig {
    /// Empty configuration: every request bypasses recording
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule (lower priority than those already added)
    #[must_use]
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Append a top-level stabilizer
    #[must_use]
    pub fn stabilizer(mut self, stabilizer: HeaderStabilizer) -> Self {
        self.stabilizers.push(stabilizer);
        self
    }

    /// Replace the settings
    #[must_use]
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Validate the settings, whether loaded from a file or built in code
    ///
    /// # Errors
    ///
    /// Returns error if the settings are invalid
    pub fn validate(&self) -> Result<()> {
        self.settings.validate()
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("rules", &self.rules)
            .field("stabilizers", &self.stabilizers.len())
            .field("settings", &self.settings)
            .finish()
    }
}
