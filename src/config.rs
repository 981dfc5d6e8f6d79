//! User settings: a TOML file in the platform config directory. A missing
//! file means defaults; a present file only needs the keys it overrides.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get path to a specific config file or subdirectory
    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    /// Ensure the config directory exists
    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Write default configuration to config file
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path("config.toml");

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use --force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;
        std::fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)?;

        Ok(config_path)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version (for future compatibility)
    pub version: String,
    pub codegen: CodegenConfig,
    pub analyses: AnalysesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodegenConfig {
    /// Prefix each generated block with a description comment
    pub add_description_comments: bool,
    /// Run the code-chunk optimizer over the generated script
    pub optimize: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysesConfig {
    /// Override where saved analyses are stored
    pub directory: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "1".to_string(),
            codegen: CodegenConfig::default(),
            analyses: AnalysesConfig::default(),
        }
    }
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            add_description_comments: true,
            optimize: true,
        }
    }
}

impl AppConfig {
    /// Load configuration for the given app name, falling back to defaults
    /// when no config file exists.
    pub fn load(app_name: &str) -> Result<Self> {
        let manager = ConfigManager::new(app_name)?;
        Self::load_from(&manager)
    }

    pub fn load_from(manager: &ConfigManager) -> Result<Self> {
        let config_path = manager.config_path("config.toml");
        if !config_path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&contents)
            .map_err(|e| eyre!("Invalid config at {}: {}", config_path.display(), e))?;
        Ok(config)
    }
}

const DEFAULT_CONFIG_TEMPLATE: &str = r#"# gridscript configuration
version = "1"

[codegen]
# Prefix each generated block with a description comment
add_description_comments = true
# Merge, reorder, and elide generated statements where provably safe
optimize = true

[analyses]
# Override where saved analyses are stored
# directory = "/path/to/analyses"
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_dir(dir.path().to_path_buf());
        let config = AppConfig::load_from(&manager).unwrap();
        assert!(config.codegen.add_description_comments);
        assert!(config.codegen.optimize);
        assert!(config.analyses.directory.is_none());
    }

    #[test]
    fn test_partial_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_dir(dir.path().to_path_buf());
        manager.ensure_config_dir().unwrap();
        std::fs::write(
            manager.config_path("config.toml"),
            "[codegen]\noptimize = false\n",
        )
        .unwrap();
        let config = AppConfig::load_from(&manager).unwrap();
        assert!(!config.codegen.optimize);
        assert!(config.codegen.add_description_comments);
    }

    #[test]
    fn test_default_template_parses() {
        let config: AppConfig = toml::from_str(DEFAULT_CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.version, "1");
    }

    #[test]
    fn test_write_default_config_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_dir(dir.path().to_path_buf());
        manager.write_default_config(false).unwrap();
        assert!(manager.write_default_config(false).is_err());
        assert!(manager.write_default_config(true).is_ok());
    }
}
