use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::model::report::{Category, Severity};

const ENV_CONFIG_PATH: &str = "BPMN_LINT_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Severity classification table applied by the result normalizer.
///
/// Resolution order per finding: per-rule override, then category mapping,
/// then the default fallback.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SeverityConfig {
    /// Per-rule forced severity. Wins over the category mapping, so a rule
    /// can be downgraded to advisory (or upgraded) regardless of what it
    /// reports.
    pub rule_overrides: BTreeMap<String, Severity>,
    /// Raw category to severity mapping.
    pub category_map: BTreeMap<Category, Severity>,
    /// Fallback when neither an override nor a category mapping applies.
    pub default: Severity,
    /// Severity or raw-category names that flip the overall status to
    /// "error". Matched against both the resolved severity and the raw
    /// category, so `[error, rule-error]` works as expected.
    pub blocking: BTreeSet<String>,
}

impl Default for SeverityConfig {
    fn default() -> Self {
        Self {
            rule_overrides: BTreeMap::new(),
            category_map: BTreeMap::from([
                (Category::Error, Severity::Error),
                (Category::Warn, Severity::Warning),
                (Category::Info, Severity::Info),
                (Category::RuleError, Severity::Error),
            ]),
            default: Severity::Warning,
            blocking: BTreeSet::from(["error".to_string()]),
        }
    }
}

impl SeverityConfig {
    /// Resolve the severity for one finding.
    pub fn classify(&self, rule: &str, category: Option<Category>) -> Severity {
        if let Some(severity) = self.rule_overrides.get(rule) {
            return *severity;
        }
        if let Some(severity) = category.and_then(|c| self.category_map.get(&c)) {
            return *severity;
        }
        self.default
    }

    /// Whether a classified finding makes the overall outcome an error.
    pub fn is_blocking(&self, severity: Severity, category: Option<Category>) -> bool {
        self.blocking.contains(severity.as_str())
            || category.is_some_and(|c| self.blocking.contains(c.as_str()))
    }
}

/// Rule set selection and per-rule toggles for the rule engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Named rule set to start from. Only "recommended" ships today.
    pub preset: String,
    /// Per-rule on/off switches applied on top of the preset.
    pub overrides: BTreeMap<String, bool>,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            preset: "recommended".to_string(),
            overrides: BTreeMap::new(),
        }
    }
}

/// YAML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub severity: SeverityConfig,
    #[serde(default)]
    pub rules: RuleConfig,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Bearer token required on /v1 routes when set.
    pub api_key: Option<String>,
    pub severity: SeverityConfig,
    pub rules: RuleConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            api_key: None,
            severity: SeverityConfig::default(),
            rules: RuleConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment and config file
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        // Unset or empty means auth is disabled (local development)
        let api_key = std::env::var("ACTION_API_KEY")
            .ok()
            .filter(|key| !key.is_empty());

        let config_path =
            std::env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let file = Self::load_config_file(&config_path).unwrap_or_default();

        Self {
            host,
            port,
            api_key,
            severity: file.severity,
            rules: file.rules,
        }
    }

    /// Load configuration from YAML file
    fn load_config_file(path: &str) -> Option<ConfigFile> {
        let path = Path::new(path);

        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return None;
        }

        match fs::read_to_string(path) {
            Ok(contents) => {
                // Handle empty file
                let contents = contents.trim();
                if contents.is_empty() {
                    tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
                    return Some(ConfigFile::default());
                }

                match serde_yaml::from_str(contents) {
                    Ok(config) => {
                        tracing::info!(path = %path.display(), "Loaded configuration from file");
                        Some(config)
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Failed to parse config file, using defaults");
                        None
                    }
                }
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read config file, using defaults");
                None
            }
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
