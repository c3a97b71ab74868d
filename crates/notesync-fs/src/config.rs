use crate::workspace::WorkspacePaths;
use notesync_core::{LoadPolicy, NoteError, NoteResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

pub const CONFIG_VERSION: u32 = 1;
pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";
pub const DEFAULT_AUTOSAVE_DELAY_MS: u64 = 5_000;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 1_500;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub server: String,
    #[serde(default = "default_autosave_delay_ms")]
    pub autosave_delay_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default)]
    pub load_policy: LoadPolicy,
}

/// Effective settings after CLI overrides are applied.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedSettings {
    pub server: String,
    pub autosave_delay: Duration,
    pub connect_timeout: Duration,
    pub load_policy: LoadPolicy,
}

impl WorkspaceConfig {
    pub fn with_server(server: impl Into<String>) -> Self {
        Self {
            version: CONFIG_VERSION,
            server: server.into(),
            autosave_delay_ms: DEFAULT_AUTOSAVE_DELAY_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            load_policy: LoadPolicy::default(),
        }
    }

    pub fn ensure_defaults(&mut self) {
        if self.version == 0 {
            self.version = CONFIG_VERSION;
        }

        if self.server.trim().is_empty() {
            self.server = DEFAULT_SERVER_URL.to_string();
        }

        if self.autosave_delay_ms == 0 {
            self.autosave_delay_ms = DEFAULT_AUTOSAVE_DELAY_MS;
        }

        if self.connect_timeout_ms == 0 {
            self.connect_timeout_ms = DEFAULT_CONNECT_TIMEOUT_MS;
        }
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self::with_server(DEFAULT_SERVER_URL)
    }
}

fn default_autosave_delay_ms() -> u64 {
    DEFAULT_AUTOSAVE_DELAY_MS
}

fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

pub fn load_config(paths: &WorkspacePaths) -> NoteResult<WorkspaceConfig> {
    let contents = fs::read_to_string(&paths.config_path).map_err(|err| {
        NoteError::io(format!(
            "failed to read workspace config '{}': {}",
            paths.config_path.display(),
            err
        ))
    })?;

    let mut config: WorkspaceConfig = toml::from_str(&contents).map_err(|err| {
        NoteError::io(format!(
            "failed to parse workspace config '{}': {}",
            paths.config_path.display(),
            err
        ))
    })?;
    config.ensure_defaults();
    Ok(config)
}

pub fn save_config(paths: &WorkspacePaths, config: &WorkspaceConfig) -> NoteResult<()> {
    let serialized = toml::to_string_pretty(config)
        .map_err(|err| NoteError::io(format!("failed to encode config.toml: {err}")))?;

    fs::write(&paths.config_path, serialized).map_err(|err| {
        NoteError::io(format!(
            "failed to write workspace config '{}': {}",
            paths.config_path.display(),
            err
        ))
    })
}

pub fn resolve_settings(
    config: &WorkspaceConfig,
    server_override: Option<&str>,
) -> NoteResult<ResolvedSettings> {
    let server = server_override
        .unwrap_or(config.server.as_str())
        .trim()
        .to_string();
    if server.is_empty() {
        return Err(NoteError::usage("server URL cannot be empty"));
    }

    Ok(ResolvedSettings {
        server,
        autosave_delay: Duration::from_millis(config.autosave_delay_ms),
        connect_timeout: Duration::from_millis(config.connect_timeout_ms),
        load_policy: config.load_policy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let mut config: WorkspaceConfig = toml::from_str("").expect("parse empty config");
        config.ensure_defaults();

        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.server, DEFAULT_SERVER_URL);
        assert_eq!(config.autosave_delay_ms, DEFAULT_AUTOSAVE_DELAY_MS);
        assert_eq!(config.load_policy, LoadPolicy::Reconcile);
    }

    #[test]
    fn load_policy_parses_snake_case() {
        let config: WorkspaceConfig =
            toml::from_str("load_policy = \"replace\"").expect("parse config");
        assert_eq!(config.load_policy, LoadPolicy::Replace);
    }

    #[test]
    fn server_override_wins() {
        let config = WorkspaceConfig::with_server("http://notes.internal:3000");
        let settings =
            resolve_settings(&config, Some("http://127.0.0.1:4000")).expect("resolve settings");
        assert_eq!(settings.server, "http://127.0.0.1:4000");
        assert_eq!(settings.autosave_delay, Duration::from_secs(5));

        let error = resolve_settings(&config, Some("  ")).expect_err("empty override");
        assert_eq!(error.kind, notesync_core::ErrorKind::Usage);
    }
}
