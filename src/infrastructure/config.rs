use crate::domain::{config::BridgeConfig, error::{BridgeError, BridgeResult}};
use std::path::{Path, PathBuf};
use std::fs;

const CONFIG_DIR: &str = ".espbridge";
const CONFIG_FILE: &str = "config.toml";

/// Configuration manager
pub struct ConfigManager {
    global_config_path: PathBuf,
    project_config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Create new configuration manager
    pub fn new() -> BridgeResult<Self> {
        let global_config_path = Self::get_global_config_path()?;
        let project_config_path = Self::find_project_config_path();

        Ok(Self {
            global_config_path,
            project_config_path,
        })
    }

    /// Load configuration: the project file wins over the global one,
    /// defaults apply when neither exists.
    pub fn load_config(&self) -> BridgeResult<BridgeConfig> {
        if let Some(project_path) = &self.project_config_path {
            if project_path.exists() {
                return self.load_config_from_path(project_path);
            }
        }

        if self.global_config_path.exists() {
            return self.load_config_from_path(&self.global_config_path);
        }

        Ok(BridgeConfig::default())
    }

    /// Get global configuration path
    fn get_global_config_path() -> BridgeResult<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| BridgeError::Config {
            message: "Could not determine home directory".to_string(),
        })?;

        Ok(home.join(".config").join("espbridge").join(CONFIG_FILE))
    }

    /// Find project configuration path by walking up directory tree
    fn find_project_config_path() -> Option<PathBuf> {
        let current_dir = std::env::current_dir().ok()?;
        let mut path = current_dir.as_path();

        loop {
            let config_path = path.join(CONFIG_DIR).join(CONFIG_FILE);
            if config_path.exists() {
                return Some(config_path);
            }

            path = path.parent()?;
        }
    }

    /// Load configuration from specific path
    pub fn load_config_from_path(&self, path: &Path) -> BridgeResult<BridgeConfig> {
        let content = fs::read_to_string(path).map_err(|e| BridgeError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: BridgeConfig = toml::from_str(&content).map_err(|e| BridgeError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to specific path
    pub fn save_config_to_path(&self, path: &Path, config: &BridgeConfig) -> BridgeResult<()> {
        let content = toml::to_string_pretty(config).map_err(|e| BridgeError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, content).map_err(|e| BridgeError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })
    }

    /// Create default project configuration, returning its path
    pub fn init_project_config(&self, path: &Path) -> BridgeResult<PathBuf> {
        let config_dir = path.join(CONFIG_DIR);
        let config_file = config_dir.join(CONFIG_FILE);

        if config_file.exists() {
            return Err(BridgeError::Config {
                message: "Project configuration already exists".to_string(),
            });
        }

        fs::create_dir_all(&config_dir).map_err(|e| BridgeError::Config {
            message: format!("Failed to create {} directory: {}", CONFIG_DIR, e),
        })?;

        self.save_config_to_path(&config_file, &BridgeConfig::default())?;

        Ok(config_file)
    }

    /// Get the current project config path (if any)
    pub fn get_project_config_path(&self) -> Option<&PathBuf> {
        self.project_config_path.as_ref()
    }

    /// Get the global config path
    pub fn get_global_config_path_ref(&self) -> &PathBuf {
        &self.global_config_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_manager_creation() {
        let manager = ConfigManager::new().unwrap();
        assert!(manager.get_global_config_path_ref().ends_with("espbridge/config.toml"));
    }

    #[test]
    fn test_init_project_config() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::new().unwrap();

        let config_file = manager.init_project_config(temp_dir.path()).unwrap();
        assert_eq!(config_file, temp_dir.path().join(".espbridge").join("config.toml"));
        assert!(config_file.exists());

        let config = manager.load_config_from_path(&config_file).unwrap();
        assert_eq!(config, BridgeConfig::default());

        // A second init must not clobber the file
        assert!(manager.init_project_config(temp_dir.path()).is_err());
    }

    #[test]
    fn test_partial_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bridge.toml");
        fs::write(
            &path,
            r#"
            [access_point]
            ssid = "lab-relay"
            passphrase = "correcthorse"
            encryption = "wpa_wpa2_psk"

            [server]
            port = 2323
            "#,
        )
        .unwrap();

        let manager = ConfigManager::new().unwrap();
        let config = manager.load_config_from_path(&path).unwrap();
        assert_eq!(config.access_point.ssid, "lab-relay");
        assert_eq!(config.access_point.encryption.code(), 4);
        assert_eq!(config.access_point.channel, 5);
        assert_eq!(config.server.port, 2323);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bridge.toml");
        fs::write(&path, "[relay]\npayload_capacity = 0\n").unwrap();

        let manager = ConfigManager::new().unwrap();
        let err = manager.load_config_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("payload capacity"));

        fs::write(&path, "[server\nport = 1").unwrap();
        assert!(manager.load_config_from_path(&path).is_err());
    }
}
