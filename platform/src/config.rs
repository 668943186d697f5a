//! Configuration loading
//!
//! `.platform.toml` is looked up by walking up from the current directory,
//! then in the global config dir. Environment variables override the file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::mcp::{ToolConnection, Transport};
use crate::orchestrator::ExecutionMode;

const CONFIG_FILE: &str = ".platform.toml";

/// Find a config file by walking up the directory tree, then checking global config.
///
/// Search order:
/// 1. Current directory and parent directories (walking up to root)
/// 2. Global config at ~/.config/agentic-platform/
fn find_config_file(filename: &str) -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let candidate = current.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_path = config_dir.join("agentic-platform").join(filename);
        if global_path.exists() {
            return Some(global_path);
        }
    }

    None
}

/// Top-level configuration (from .platform.toml)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlatformConfig {
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub prompts: PromptSettings,
    #[serde(default)]
    pub workflow: WorkflowSettings,
    #[serde(default)]
    pub log: LogSettings,
    #[serde(default)]
    pub mcp: McpSettings,
}

/// Model provider settings. A provider without settings stays unbound.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_ollama_host")]
    pub ollama_host: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub anthropic_base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub anthropic_max_tokens: u32,
    #[serde(default = "default_model")]
    pub default_model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bearer token required on /api routes; auth is off when unset
    pub api_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseSettings {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromptSettings {
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,
    #[serde(default)]
    pub backup_on_shutdown: bool,
    /// Backup file loaded into the store at startup
    pub restore_from: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkflowSettings {
    #[serde(default)]
    pub mode: ExecutionMode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct McpSettings {
    #[serde(default)]
    pub connections: Vec<ConnectionSettings>,
}

/// One `[[mcp.connections]]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionSettings {
    pub name: String,
    /// Defaults to `name`
    pub server_name: Option<String>,
    pub uri: String,
    #[serde(default)]
    pub transport: Transport,
    #[serde(default = "default_true")]
    pub connect_on_start: bool,
}

impl ConnectionSettings {
    pub fn to_connection(&self) -> ToolConnection {
        ToolConnection {
            name: self.name.clone(),
            server_name: self
                .server_name
                .clone()
                .unwrap_or_else(|| self.name.clone()),
            uri: self.uri.clone(),
            transport: self.transport,
            is_connected: false,
        }
    }
}

// Default value functions
fn default_ollama_host() -> Option<String> {
    Some("http://localhost:11434".to_string())
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_model() -> String {
    crate::orchestrator::DEFAULT_MODEL_NAME.to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from("backups")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            ollama_host: default_ollama_host(),
            openai_api_key: None,
            openai_base_url: None,
            anthropic_api_key: None,
            anthropic_base_url: None,
            anthropic_max_tokens: default_max_tokens(),
            default_model: default_model(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_token: None,
        }
    }
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            backup_dir: default_backup_dir(),
            backup_on_shutdown: false,
            restore_from: None,
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl DatabaseSettings {
    /// Configured path, else ~/.agentic-platform/platform.db
    pub fn resolve_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".agentic-platform").join("platform.db"))
    }
}

impl PlatformConfig {
    /// Load config from .platform.toml, then apply environment overrides
    ///
    /// Falls back to defaults when no file is found.
    pub fn load() -> Result<Self> {
        let mut config = match find_config_file(CONFIG_FILE) {
            Some(path) => {
                tracing::debug!("Loading config from: {}", path.display());
                Self::load_from_path(&path)?
            }
            None => {
                tracing::debug!("No {} found, using defaults", CONFIG_FILE);
                Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from a specific path (no environment overrides)
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable source
    pub fn apply_env_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("OLLAMA_HOST") {
            self.llm.ollama_host = Some(host);
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.llm.openai_api_key = Some(key);
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            self.llm.openai_base_url = Some(url);
        }
        if let Some(key) = lookup("ANTHROPIC_API_KEY") {
            self.llm.anthropic_api_key = Some(key);
        }
        if let Some(token) = lookup("PLATFORM_API_TOKEN") {
            self.server.api_token = Some(token);
        }
        if let Some(path) = lookup("PLATFORM_DB_PATH") {
            self.database.path = Some(PathBuf::from(path));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = PlatformConfig::default();
        assert_eq!(config.llm.ollama_host.as_deref(), Some("http://localhost:11434"));
        assert_eq!(config.llm.default_model, "llama3");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.workflow.mode, ExecutionMode::Sequential);
        assert_eq!(config.log.format, LogFormat::Pretty);
        assert!(config.mcp.connections.is_empty());
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            r#"
[llm]
openai_api_key = "sk-file"

[server]
port = 9100

[workflow]
mode = "concurrent"

[log]
format = "json"

[[mcp.connections]]
name = "files"
uri = "mcp-fs --root /srv"

[[mcp.connections]]
name = "remote"
server_name = "search"
uri = "http://localhost:9000/mcp"
transport = "http"
connect_on_start = false
"#,
        )
        .unwrap();

        let config = PlatformConfig::load_from_path(&path).unwrap();
        assert_eq!(config.llm.openai_api_key.as_deref(), Some("sk-file"));
        assert_eq!(config.llm.ollama_host.as_deref(), Some("http://localhost:11434"));
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.workflow.mode, ExecutionMode::Concurrent);
        assert_eq!(config.log.format, LogFormat::Json);

        let files = &config.mcp.connections[0];
        assert!(files.connect_on_start);
        assert_eq!(files.to_connection().server_name, "files");

        let remote = config.mcp.connections[1].to_connection();
        assert_eq!(remote.server_name, "search");
        assert_eq!(remote.transport, Transport::Http);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("OLLAMA_HOST", "http://gpu:11434"),
            ("ANTHROPIC_API_KEY", "sk-ant"),
            ("PLATFORM_API_TOKEN", "secret"),
            ("PLATFORM_DB_PATH", "/tmp/p.db"),
        ]
        .into_iter()
        .collect();

        let mut config = PlatformConfig::default();
        config.apply_env_overrides_from(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.llm.ollama_host.as_deref(), Some("http://gpu:11434"));
        assert_eq!(config.llm.anthropic_api_key.as_deref(), Some("sk-ant"));
        assert!(config.llm.openai_api_key.is_none());
        assert_eq!(config.server.api_token.as_deref(), Some("secret"));
        assert_eq!(
            config.database.resolve_path().unwrap(),
            PathBuf::from("/tmp/p.db")
        );
    }

    #[test]
    fn test_bad_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[server]\nport = \"not a number\"\n").unwrap();
        assert!(PlatformConfig::load_from_path(&path).is_err());
    }
}
