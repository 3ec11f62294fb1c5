//! Layered TOML configuration for toolwire.
//!
//! Reads configuration from multiple sources with precedence:
//! CLI flags > env vars > config file > defaults

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use toolwire_mcp::{McpConfig, ServerConfig};
use toolwire_types::ConfigError;

pub use toolwire_api::{DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use toolwire_core::DEFAULT_MAX_ITERATIONS;

/// System prompt used when none is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. Use the available tools \
     when they help answer the question, and answer directly when they do not.";

/// Resolved configuration for a toolwire run.
#[derive(Debug, Clone)]
pub struct ToolwireConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_iterations: usize,
    pub system_prompt: String,
    pub mcp: McpConfig,
    pub config_dir: PathBuf,
}

/// Settings that can be read from a TOML config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub servers: BTreeMap<String, ServerConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiSettings {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub max_iterations: Option<usize>,
    pub system_prompt: Option<String>,
}

/// CLI overrides that take highest precedence.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub max_iterations: Option<usize>,
    pub system_prompt: Option<String>,
}

impl ToolwireConfig {
    /// Load configuration from all sources, applying precedence rules.
    ///
    /// Precedence (highest to lowest):
    /// 1. CLI flags
    /// 2. Environment variables (`OPENAI_API_KEY`, `TOOLWIRE_MODEL`, `OPENAI_BASE_URL`)
    /// 3. Config file (~/.toolwire/config.toml)
    /// 4. Defaults
    pub fn load(overrides: CliOverrides) -> Result<Self, ConfigError> {
        let dir = config_dir();
        let settings = load_settings_file(&dir.join("config.toml"))?;
        Self::resolve(settings, overrides, |key| std::env::var(key).ok(), dir)
    }

    /// Apply precedence rules to already-read settings. `env` looks up
    /// environment variables.
    pub fn resolve(
        settings: SettingsFile,
        overrides: CliOverrides,
        env: impl Fn(&str) -> Option<String>,
        config_dir: PathBuf,
    ) -> Result<Self, ConfigError> {
        let api = settings.api;

        // Resolve API key: CLI > env > config file
        let api_key = overrides
            .api_key
            .or_else(|| env("OPENAI_API_KEY"))
            .or(api.api_key)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingKey {
                key: "api_key (set OPENAI_API_KEY or add to ~/.toolwire/config.toml)".into(),
            })?;

        let model = overrides
            .model
            .or_else(|| env("TOOLWIRE_MODEL"))
            .or(api.model)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let base_url = env("OPENAI_BASE_URL")
            .or(api.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let max_iterations = overrides
            .max_iterations
            .or(api.max_iterations)
            .unwrap_or(DEFAULT_MAX_ITERATIONS);
        if max_iterations == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_iterations".into(),
                message: "must be at least 1".into(),
            });
        }

        let system_prompt = overrides
            .system_prompt
            .or(api.system_prompt)
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

        for (name, server) in &settings.servers {
            if server.command.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: format!("servers.{name}.command"),
                    message: "must not be empty".into(),
                });
            }
        }

        Ok(ToolwireConfig {
            api_key,
            model,
            base_url,
            max_iterations,
            system_prompt,
            mcp: McpConfig {
                servers: settings.servers,
            },
            config_dir,
        })
    }
}

/// Get the toolwire config directory path (~/.toolwire/).
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TOOLWIRE_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".toolwire")
}

/// Load and parse a TOML settings file. A missing file yields defaults.
pub fn load_settings_file(path: &Path) -> Result<SettingsFile, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}", path.display());
            return Ok(SettingsFile::default());
        }
        Err(e) => {
            return Err(ConfigError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            });
        }
    };
    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn settings_with_key() -> SettingsFile {
        SettingsFile {
            api: ApiSettings {
                api_key: Some("file-key".into()),
                ..ApiSettings::default()
            },
            ..SettingsFile::default()
        }
    }

    #[test]
    fn defaults_apply_when_only_key_is_set() {
        let config = ToolwireConfig::resolve(
            settings_with_key(),
            CliOverrides::default(),
            no_env,
            PathBuf::from("/tmp/tw"),
        )
        .unwrap();
        assert_eq!(config.api_key, "file-key");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.max_iterations, DEFAULT_MAX_ITERATIONS);
        assert_eq!(config.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert!(config.mcp.servers.is_empty());
    }

    #[test]
    fn missing_api_key_is_an_error() {
        let err = ToolwireConfig::resolve(
            SettingsFile::default(),
            CliOverrides::default(),
            no_env,
            PathBuf::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey { .. }));
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let overrides = CliOverrides {
            api_key: Some("  ".into()),
            ..CliOverrides::default()
        };
        let err =
            ToolwireConfig::resolve(SettingsFile::default(), overrides, no_env, PathBuf::new())
                .unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey { .. }));
    }

    #[test]
    fn cli_beats_env_beats_file() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("OPENAI_API_KEY", "env-key"),
            ("TOOLWIRE_MODEL", "env-model"),
            ("OPENAI_BASE_URL", "http://localhost:11434/v1"),
        ]);
        let lookup = |key: &str| env.get(key).map(|v| v.to_string());

        let mut settings = settings_with_key();
        settings.api.model = Some("file-model".into());
        settings.api.max_iterations = Some(4);

        let overrides = CliOverrides {
            model: Some("cli-model".into()),
            ..CliOverrides::default()
        };
        let config =
            ToolwireConfig::resolve(settings, overrides, lookup, PathBuf::new()).unwrap();

        assert_eq!(config.api_key, "env-key");
        assert_eq!(config.model, "cli-model");
        assert_eq!(config.base_url, "http://localhost:11434/v1");
        assert_eq!(config.max_iterations, 4);
    }

    #[test]
    fn zero_iterations_is_rejected() {
        let overrides = CliOverrides {
            max_iterations: Some(0),
            ..CliOverrides::default()
        };
        let err = ToolwireConfig::resolve(settings_with_key(), overrides, no_env, PathBuf::new())
            .unwrap_err();
        match err {
            ConfigError::InvalidValue { key, .. } => assert_eq!(key, "max_iterations"),
            other => panic!("Expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn empty_server_command_is_rejected() {
        let mut settings = settings_with_key();
        settings
            .servers
            .insert("broken".into(), ServerConfig::new("", vec![]));
        let err =
            ToolwireConfig::resolve(settings, CliOverrides::default(), no_env, PathBuf::new())
                .unwrap_err();
        assert!(err.to_string().contains("servers.broken.command"));
    }

    #[test]
    fn full_settings_file_parses() {
        let toml_str = r#"
[api]
model = "gpt-4.1-mini"
max_iterations = 6
system_prompt = "Answer in Spanish."

[servers.brightdata]
command = "npx"
args = ["@brightdata/mcp"]
env = { API_TOKEN = "secret" }
timeout_ms = 60000

[servers.local]
command = "python"
args = ["server.py"]
inherit_env = true
"#;
        let settings: SettingsFile = toml::from_str(toml_str).unwrap();
        assert_eq!(settings.api.model.as_deref(), Some("gpt-4.1-mini"));
        assert_eq!(settings.api.max_iterations, Some(6));
        assert_eq!(settings.servers.len(), 2);

        let bright = &settings.servers["brightdata"];
        assert_eq!(bright.env["API_TOKEN"], "secret");
        assert_eq!(bright.timeout_ms, 60000);
        assert!(!bright.inherit_env);
        assert!(settings.servers["local"].inherit_env);
        assert_eq!(settings.servers["local"].handshake_timeout_ms, 10000);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_file(&dir.path().join("config.toml")).unwrap();
        assert!(settings.api.api_key.is_none());
        assert!(settings.servers.is_empty());
    }

    #[test]
    fn file_on_disk_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[api]\napi_key = \"disk-key\"\n\n[servers.echo]\ncommand = \"cat\"\n",
        )
        .unwrap();

        let settings = load_settings_file(&path).unwrap();
        let config = ToolwireConfig::resolve(
            settings,
            CliOverrides::default(),
            no_env,
            dir.path().to_path_buf(),
        )
        .unwrap();
        assert_eq!(config.api_key, "disk-key");
        assert_eq!(config.mcp.servers["echo"].command, "cat");
        assert_eq!(config.config_dir, dir.path());
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[api\nmodel = ").unwrap();

        match load_settings_file(&path) {
            Err(ConfigError::Parse { path: reported, .. }) => {
                assert!(reported.ends_with("config.toml"));
            }
            other => panic!("Expected Parse, got {other:?}"),
        }
    }
}
