//! Engine configuration: orchestrator settings, handler registry, rules.
//!
//! The configuration lives in one YAML document. A missing or unreadable
//! file falls back to built-in defaults, which are persisted so the next
//! run starts from a concrete file. Every runtime mutation goes through
//! `ConfigStore::merge_orchestrator`, which also persists.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

/// Errors loading or persisting configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to persist config file {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize config for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid orchestrator settings after merge: {0}")]
    InvalidMerge(#[from] serde_json::Error),
}

/// Process-wide orchestrator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Master switch; disabled engines drop every event
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Whether actions from handler responses are enqueued automatically
    #[serde(default = "default_true")]
    pub auto_apply_actions: bool,

    /// Maximum queued actions before the oldest is evicted
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,

    /// Per-action execution timeout in milliseconds
    #[serde(default = "default_action_timeout_ms")]
    pub action_timeout_ms: u64,

    /// Debounce window for (handler, event type) bursts in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Whether notification responses may emit play_audio events
    #[serde(default = "default_true")]
    pub audio_feedback: bool,

    /// Maximum cascading re-entrancy depth before an event chain is
    /// reported and dropped
    #[serde(default = "default_max_cascade_depth")]
    pub max_cascade_depth: u32,
}

fn default_true() -> bool {
    true
}
fn default_max_queue_size() -> usize {
    50
}
fn default_action_timeout_ms() -> u64 {
    30_000
}
fn default_debounce_ms() -> u64 {
    500
}
fn default_max_cascade_depth() -> u32 {
    5
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            auto_apply_actions: default_true(),
            max_queue_size: default_max_queue_size(),
            action_timeout_ms: default_action_timeout_ms(),
            debounce_ms: default_debounce_ms(),
            audio_feedback: default_true(),
            max_cascade_depth: default_max_cascade_depth(),
        }
    }
}

/// How to execute one registered handler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerSpec {
    /// Program to execute
    pub command: String,

    /// Arguments passed before the event on stdin
    #[serde(default)]
    pub args: Vec<String>,

    /// Per-handler timeout override in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// Default timeout for handlers without an override
pub const DEFAULT_HANDLER_TIMEOUT_MS: u64 = 30_000;

impl HandlerSpec {
    /// Effective timeout for this handler
    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms.unwrap_or(DEFAULT_HANDLER_TIMEOUT_MS)
    }
}

/// A trigger rule as written in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Rule name (unique within the file)
    pub name: String,

    /// Event type this rule matches exactly
    pub event: String,

    /// Condition expression over the event payload (empty = always)
    #[serde(default)]
    pub condition: String,

    /// Suppress repeat firings within this window
    #[serde(default)]
    pub throttle_ms: u64,

    /// Lower values fire their handlers sooner
    #[serde(default = "default_rule_priority")]
    pub priority: i32,

    /// Handlers to invoke, in order
    pub hooks: Vec<String>,

    /// Whether the rule participates in resolution
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_rule_priority() -> i32 {
    5
}

/// The full configuration document (matches YAML structure)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Handler id to execution spec (BTreeMap for stable persistence)
    #[serde(default)]
    pub handlers: BTreeMap<String, HandlerSpec>,

    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

fn default_version() -> String {
    "1".to_string()
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            version: default_version(),
            orchestrator: OrchestratorConfig::default(),
            handlers: BTreeMap::new(),
            rules: Vec::new(),
        }
    }
}

impl ConfigFile {
    /// Parse a config document from YAML content
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }
}

/// Default config location (~/.hookwire/config.yaml)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".hookwire").join("config.yaml"))
}

/// Owns the configuration document and its persistence path.
///
/// Passed by reference into each component at construction; the single
/// mutation entry point also triggers persistence.
#[derive(Debug)]
pub struct ConfigStore {
    file: ConfigFile,
    path: Option<PathBuf>,
}

impl ConfigStore {
    /// Load configuration from a file, falling back to defaults.
    ///
    /// A missing or unparseable file is recovered by writing defaults
    /// back to the same path.
    pub fn load(path: &Path) -> Self {
        let file = match std::fs::read_to_string(path) {
            Ok(content) => match ConfigFile::from_yaml(&content) {
                Ok(file) => file,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Unparseable config, using defaults");
                    ConfigFile::default()
                }
            },
            Err(e) => {
                info!(path = %path.display(), error = %e, "No config file, using defaults");
                ConfigFile::default()
            }
        };

        let store = Self {
            file,
            path: Some(path.to_path_buf()),
        };
        if !path.exists() {
            if let Err(e) = store.persist() {
                warn!(error = %e, "Failed to persist default config");
            }
        }
        store
    }

    /// Build a store that never touches disk (tests, embedding)
    pub fn in_memory(file: ConfigFile) -> Self {
        Self { file, path: None }
    }

    /// The orchestrator settings
    pub fn orchestrator(&self) -> &OrchestratorConfig {
        &self.file.orchestrator
    }

    /// The registered handlers
    pub fn handlers(&self) -> &BTreeMap<String, HandlerSpec> {
        &self.file.handlers
    }

    /// The rule list as written
    pub fn rules(&self) -> &[RuleSpec] {
        &self.file.rules
    }

    /// The full document
    pub fn file(&self) -> &ConfigFile {
        &self.file
    }

    /// Merge a JSON object into the orchestrator settings and persist.
    ///
    /// Unknown keys are logged and skipped. Returns the keys that were
    /// applied, sorted.
    pub fn merge_orchestrator(&mut self, patch: &Value) -> Result<Vec<String>, ConfigError> {
        let Some(patch) = patch.as_object() else {
            warn!("Ignoring non-object orchestrator config patch");
            return Ok(Vec::new());
        };

        let mut current = serde_json::to_value(&self.file.orchestrator)?;
        let Some(fields) = current.as_object_mut() else {
            warn!("Orchestrator settings did not serialize to an object, rejecting patch");
            return Ok(Vec::new());
        };

        let mut applied = Vec::new();
        for (key, value) in patch {
            if fields.contains_key(key) {
                fields.insert(key.clone(), value.clone());
                applied.push(key.clone());
            } else {
                warn!(key = %key, "Ignoring unknown orchestrator config key");
            }
        }

        if applied.is_empty() {
            return Ok(applied);
        }
        applied.sort();

        self.file.orchestrator = serde_json::from_value(current)?;
        if let Err(e) = self.persist() {
            warn!(error = %e, "Config updated in memory but persistence failed");
        }
        Ok(applied)
    }

    /// Write the document back to its path (no-op for in-memory stores)
    pub fn persist(&self) -> Result<(), ConfigError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Persist {
                path: path.clone(),
                source,
            })?;
        }

        let yaml = serde_yaml::to_string(&self.file).map_err(|source| ConfigError::Serialize {
            path: path.clone(),
            source,
        })?;
        std::fs::write(path, yaml).map_err(|source| ConfigError::Persist {
            path: path.clone(),
            source,
        })
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::in_memory(ConfigFile::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    const TEST_CONFIG_YAML: &str = r#"
version: "1"
orchestrator:
  debounce_ms: 250
  max_queue_size: 10
handlers:
  audio_player:
    command: hooks/audio_player.py
    timeout_ms: 10000
rules:
  - name: diagnostics-audio
    event: diagnostics_received
    condition: "error_count > 0"
    throttle_ms: 2000
    priority: 1
    hooks: [audio_player]
"#;

    #[test]
    fn test_config_parsing() {
        let file = ConfigFile::from_yaml(TEST_CONFIG_YAML).unwrap();

        assert_eq!(file.orchestrator.debounce_ms, 250);
        assert_eq!(file.orchestrator.max_queue_size, 10);
        // Unspecified fields take defaults
        assert!(file.orchestrator.enabled);
        assert_eq!(file.orchestrator.action_timeout_ms, 30_000);

        let handler = &file.handlers["audio_player"];
        assert_eq!(handler.command, "hooks/audio_player.py");
        assert_eq!(handler.timeout_ms(), 10_000);

        let rule = &file.rules[0];
        assert_eq!(rule.event, "diagnostics_received");
        assert_eq!(rule.priority, 1);
        assert!(rule.enabled);
    }

    #[test]
    fn test_missing_file_falls_back_and_persists_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.yaml");

        let store = ConfigStore::load(&path);
        assert!(store.orchestrator().enabled);
        assert!(path.exists(), "defaults should be persisted");

        // Loading again should round-trip
        let reloaded = ConfigStore::load(&path);
        assert_eq!(
            reloaded.orchestrator().max_queue_size,
            store.orchestrator().max_queue_size
        );
    }

    #[test]
    fn test_unparseable_file_falls_back() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(&path, ":- not yaml {{{").unwrap();

        let store = ConfigStore::load(&path);
        assert!(store.orchestrator().enabled);
    }

    #[test]
    fn test_merge_orchestrator_applies_and_persists() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        let mut store = ConfigStore::load(&path);

        let applied = store
            .merge_orchestrator(&json!({"debounce_ms": 100, "audio_feedback": false, "bogus": 1}))
            .unwrap();

        assert_eq!(applied, vec!["audio_feedback", "debounce_ms"], "applied keys are sorted");
        assert_eq!(store.orchestrator().debounce_ms, 100);
        assert!(!store.orchestrator().audio_feedback);

        let reloaded = ConfigStore::load(&path);
        assert_eq!(reloaded.orchestrator().debounce_ms, 100);
        assert!(!reloaded.orchestrator().audio_feedback);
    }

    #[test]
    fn test_merge_rejects_non_object_patch() {
        let mut store = ConfigStore::default();
        let applied = store.merge_orchestrator(&json!([1, 2, 3])).unwrap();
        assert!(applied.is_empty());
    }
}
