// Configuration module

use std::collections::HashMap;

/// Flag variables are enabled by the literal value "Yes".
const FLAG_ENABLED: &str = "Yes";

/// Read-only source of deployment settings.
///
/// Abstracting over the environment keeps the pipeline testable without
/// process-wide mutation: production uses [`EnvSource`], tests use
/// [`MemorySource`].
pub trait ConfigSource: Send + Sync {
    fn get(&self, var: &str) -> Option<String>;
}

/// Reads configuration from process environment variables.
#[derive(Debug, Default)]
pub struct EnvSource;

impl ConfigSource for EnvSource {
    fn get(&self, var: &str) -> Option<String> {
        std::env::var(var).ok()
    }
}

/// In-memory configuration source for tests and embedding.
#[derive(Debug, Default)]
pub struct MemorySource {
    values: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, var: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(var.into(), value.into());
        self
    }
}

impl ConfigSource for MemorySource {
    fn get(&self, var: &str) -> Option<String> {
        self.values.get(var).cloned()
    }
}

/// Per-request snapshot of the deployment configuration.
///
/// Built fresh for every request so policy changes take effect on the
/// next request without a restart. An unset variable and an empty one
/// are equivalent throughout.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whitelisted source buckets, in configuration order. First entry is
    /// the default bucket when the request names none.
    pub source_buckets: Vec<String>,
    /// Whether ALLOWED_SIZES is set at all (restricted mode).
    pub sizes_restricted: bool,
    /// Allowed "WxH" sizes, in configuration order. First entry is the
    /// default size when defaulting is enabled.
    pub allowed_sizes: Vec<String>,
    pub default_to_first_size: bool,
    pub auto_webp: bool,
    pub security_key: Option<String>,
    pub cors_enabled: bool,
    pub cors_origin: Option<String>,
}

impl Config {
    pub fn load(source: &dyn ConfigSource) -> Self {
        let raw_buckets = non_empty(source.get("SOURCE_BUCKETS"));
        let raw_sizes = non_empty(source.get("ALLOWED_SIZES"));

        Config {
            source_buckets: raw_buckets.as_deref().map(split_list).unwrap_or_default(),
            sizes_restricted: raw_sizes.is_some(),
            allowed_sizes: raw_sizes.as_deref().map(split_list).unwrap_or_default(),
            default_to_first_size: flag_set(source, "DEFAULT_TO_FIRST_SIZE"),
            auto_webp: flag_set(source, "AUTO_WEBP"),
            security_key: non_empty(source.get("SECURITY_KEY")),
            cors_enabled: flag_set(source, "CORS_ENABLED"),
            cors_origin: non_empty(source.get("CORS_ORIGIN")),
        }
    }
}

fn flag_set(source: &dyn ConfigSource, var: &str) -> bool {
    source.get(var).as_deref() == Some(FLAG_ENABLED)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Splits a comma-separated list, stripping all whitespace from entries.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|entry| entry.split_whitespace().collect::<String>())
        .filter(|entry| !entry.is_empty())
        .collect()
}
