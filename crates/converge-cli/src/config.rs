use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use converge_core::ResourceKind;
use converge_reconciler::{RetryPolicy, WaitPolicy};
use converge_sandbox::SandboxOptions;
use serde::{Deserialize, Serialize};

/// Current config version. Bump this when adding fields or changing shape.
/// Each bump requires a corresponding entry in [`migrate`].
pub const CURRENT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergeConfig {
    /// Schema version. Missing or 0 = pre-versioned config.
    #[serde(default)]
    pub config_version: u32,
    /// Sandbox state file the provider reads and writes.
    pub state_path: PathBuf,
    #[serde(default)]
    pub wait: WaitConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    pub created_at: jiff::Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitConfig {
    pub poll_interval_secs: u64,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub multiplier: u32,
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SandboxConfig {
    #[serde(default)]
    pub settle_polls: u32,
    /// Kind → refusal reason for create requests.
    #[serde(default)]
    pub reject: BTreeMap<ResourceKind, String>,
    #[serde(default)]
    pub fail_on_settle: Vec<ResourceKind>,
}

impl Default for WaitConfig {
    fn default() -> Self {
        let policy = WaitPolicy::default();
        Self {
            poll_interval_secs: policy.interval.as_secs(),
            max_attempts: policy.max_attempts,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_retries: policy.max_retries,
            initial_backoff_ms: policy.initial_backoff.as_millis() as u64,
            multiplier: policy.multiplier,
            max_backoff_ms: policy.max_backoff.as_millis() as u64,
        }
    }
}

impl Default for ConvergeConfig {
    fn default() -> Self {
        Self {
            config_version: CURRENT_VERSION,
            state_path: default_state_path(),
            wait: WaitConfig::default(),
            retry: RetryConfig::default(),
            sandbox: SandboxConfig::default(),
            created_at: jiff::Timestamp::now(),
        }
    }
}

impl WaitConfig {
    pub fn policy(&self) -> WaitPolicy {
        WaitPolicy::new(Duration::from_secs(self.poll_interval_secs), self.max_attempts)
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            multiplier: self.multiplier,
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }
}

impl SandboxConfig {
    pub fn options(&self) -> SandboxOptions {
        SandboxOptions {
            settle_polls: self.settle_polls,
            reject: self.reject.clone(),
            fail_on_settle: self.fail_on_settle.clone(),
        }
    }
}

fn default_state_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("converge").join("sandbox.json"))
        .unwrap_or_else(|| PathBuf::from(".converge").join("sandbox.json"))
}

pub fn config_dir() -> eyre::Result<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| eyre::eyre!("no config directory found"))?;
    Ok(base.join("converge"))
}

pub fn config_path() -> eyre::Result<PathBuf> {
    Ok(config_dir()?.join("config.json"))
}

/// Load the config at `path`, or defaults if the file doesn't exist.
pub fn load_or_default(path: &Path) -> eyre::Result<ConvergeConfig> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        Ok(ConvergeConfig::default())
    }
}

pub fn load_config(path: &Path) -> eyre::Result<ConvergeConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("failed to read config at {}: {e}", path.display()))?;

    // Parse as raw JSON so we can run migrations before deserializing.
    let json: serde_json::Value = serde_json::from_str(&contents)?;
    let on_disk_version = json
        .get("config_version")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as u32;

    let migrated = migrate(json, on_disk_version)?;
    let config: ConvergeConfig = serde_json::from_value(migrated)?;
    Ok(config)
}

/// Run sequential migrations from `from_version` up to [`CURRENT_VERSION`].
///
/// Each migration is a pure transform on the raw JSON value.
pub fn migrate(mut json: serde_json::Value, from_version: u32) -> eyre::Result<serde_json::Value> {
    if from_version > CURRENT_VERSION {
        return Err(eyre::eyre!(
            "config_version {from_version} is newer than this build supports ({CURRENT_VERSION}). \
             Please update converge."
        ));
    }

    // v0 → v1: flat poll settings move under `wait`, created_at is stamped
    if from_version < 1 {
        let obj = json
            .as_object_mut()
            .ok_or_else(|| eyre::eyre!("config is not a JSON object"))?;

        let mut wait = serde_json::Map::new();
        if let Some(interval) = obj.remove("poll_interval_secs") {
            wait.insert("poll_interval_secs".to_string(), interval);
        }
        if let Some(attempts) = obj.remove("max_attempts") {
            wait.insert("max_attempts".to_string(), attempts);
        }
        if !wait.is_empty() && !obj.contains_key("wait") {
            let defaults = WaitConfig::default();
            wait.entry("poll_interval_secs")
                .or_insert(defaults.poll_interval_secs.into());
            wait.entry("max_attempts")
                .or_insert(defaults.max_attempts.into());
            obj.insert("wait".to_string(), serde_json::Value::Object(wait));
        }

        obj.entry("created_at")
            .or_insert(serde_json::Value::String(jiff::Timestamp::now().to_string()));
        obj.insert(
            "config_version".to_string(),
            serde_json::Value::Number(1.into()),
        );
        tracing::info!("migrated config v0 → v1 (nested wait settings)");
    }

    // Future migrations go here:
    // if from_version < 2 { ... }

    Ok(json)
}

pub fn save_config(path: &Path, config: &ConvergeConfig) -> eyre::Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }

    // Always write the current version, regardless of what was loaded.
    let mut stamped = config.clone();
    stamped.config_version = CURRENT_VERSION;

    let json = serde_json::to_string_pretty(&stamped)?;

    // Write to a temp file then rename for atomicity
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, json.as_bytes())?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&tmp_path, path)?;

    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}
