use crate::error::{CompileError, Result};
use query_dsl::{DslError, Version};
use serde::{Deserialize, Serialize};

/// Looks up a configuration key, e.g. `std::env::var(key).ok()`.
pub type EnvGetter = fn(&str) -> Option<String>;

pub const VERSION_KEY: &str = "QUERY_TARGET_VERSION";
pub const FILTER_CONTEXT_KEY: &str = "QUERY_FILTER_CONTEXT";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Declared version of the target backend.
    pub version: Version,
    /// Wraps the top-level group in a `filter` so predicates do not affect scoring.
    pub filter_context: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            version: Version::default(),
            filter_context: true,
        }
    }
}

impl CompilerConfig {
    pub fn new(version: Version) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }

    pub fn with_filter_context(mut self, enabled: bool) -> Self {
        self.filter_context = enabled;
        self
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: CompilerConfig = serde_json::from_str(text)
            .map_err(|e| DslError::MalformedClauseSpec(format!("compiler config: {e}")))?;
        config.validated()
    }

    /// Reads the keys through `getter`; absent keys keep their defaults.
    pub fn from_env_with(getter: EnvGetter) -> Result<Self> {
        let mut config = CompilerConfig::default();
        if let Some(version) = getter(VERSION_KEY) {
            config.version = version.parse()?;
        }
        if let Some(flag) = getter(FILTER_CONTEXT_KEY) {
            config.filter_context = match flag.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(CompileError::Dsl(DslError::MalformedClauseSpec(format!(
                        "{FILTER_CONTEXT_KEY}: expected a boolean, got '{flag}'"
                    ))));
                }
            };
        }
        config.validated()
    }

    fn validated(self) -> Result<Self> {
        self.version.ensure_supported()?;
        Ok(self)
    }
}
