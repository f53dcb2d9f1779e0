use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Overrides `host.command` when set.
pub const HOST_COMMAND_ENV: &str = "DASHBOARD_HOST_COMMAND";
/// Overrides `log_filter` when set.
pub const LOG_ENV: &str = "DASHBOARD_LOG";

const DEFAULT_LOG_FILTER: &str = "dashboard_lib=info";

/// Dashboard configuration, loaded from ~/.config/dashboard/config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub host: HostConfig,
    pub update: UpdateConfig,
    pub log_filter: String,
}

/// How to start the native host process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub command: String,
    pub args: Vec<String>,
    /// Deadline for user-name calls. Update checks wait indefinitely.
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Run a silent (`manually = false`) update check once the window is up.
    pub check_on_startup: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            host: HostConfig::default(),
            update: UpdateConfig::default(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            command: "dashboard-host".to_string(),
            args: Vec::new(),
            request_timeout_ms: 10_000,
        }
    }
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            check_on_startup: true,
        }
    }
}

impl DashboardConfig {
    /// Load config from the standard config path, falling back to defaults,
    /// then apply environment overrides.
    pub fn load() -> Self {
        let mut config = Self::load_from(&config_path());
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    fn load_from(path: &std::path::Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config {:?}: {}", path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config {:?}: {}", path, e);
                }
            }
        }
        Self::default()
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(command) = var(HOST_COMMAND_ENV).filter(|c| !c.trim().is_empty()) {
            self.host.command = command;
        }
        if let Some(filter) = var(LOG_ENV).filter(|f| !f.trim().is_empty()) {
            self.log_filter = filter;
        }
    }

    /// Save config to the standard config path.
    #[allow(dead_code)]
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.save_to(&config_path())
    }

    fn save_to(&self, path: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("dashboard")
        .join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "dashboard-config-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = scratch_dir("missing");
        let config = DashboardConfig::load_from(&dir.join("config.json"));
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.host.command, "dashboard-host");
        assert!(config.update.check_on_startup);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = scratch_dir("partial");
        std::fs::create_dir_all(&dir).expect("mkdir");
        let path = dir.join("config.json");
        std::fs::write(&path, r#"{ "host": { "command": "/opt/host" } }"#).expect("write");

        let config = DashboardConfig::load_from(&path);
        assert_eq!(config.host.command, "/opt/host");
        assert!(config.host.args.is_empty());
        assert_eq!(config.host.request_timeout_ms, 10_000);
        assert_eq!(config.log_filter, "dashboard_lib=info");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let dir = scratch_dir("invalid");
        std::fs::create_dir_all(&dir).expect("mkdir");
        let path = dir.join("config.json");
        std::fs::write(&path, "{ not json").expect("write");

        assert_eq!(DashboardConfig::load_from(&path), DashboardConfig::default());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = scratch_dir("save");
        let path = dir.join("nested").join("config.json");
        let mut config = DashboardConfig::default();
        config.host.args = vec!["--stdio".to_string()];
        config.update.check_on_startup = false;

        config.save_to(&path).expect("save should succeed");
        assert_eq!(DashboardConfig::load_from(&path), config);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn env_overrides_host_command_and_log_filter() {
        let mut config = DashboardConfig::default();
        config.apply_env(|key| match key {
            HOST_COMMAND_ENV => Some("/usr/libexec/dashboard-host".to_string()),
            LOG_ENV => Some("debug".to_string()),
            _ => None,
        });
        assert_eq!(config.host.command, "/usr/libexec/dashboard-host");
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut config = DashboardConfig::default();
        config.apply_env(|_| Some("  ".to_string()));
        assert_eq!(config, DashboardConfig::default());
    }
}
