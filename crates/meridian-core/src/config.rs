//! Browser configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use meridian_navigation::{ShortcutTable, DEFAULT_SEARCH_TEMPLATE};
use meridian_session::ArtifactDirs;
use meridian_tabs::DEFAULT_MAX_TABS;

use crate::error::CoreError;
use crate::Result;

/// How long a paused browser may keep loading before loads are forced to
/// stop.
pub const DEFAULT_WAKE_LOCK_TIMEOUT_SECS: u64 = 5 * 60;

/// Largest touch icon accepted from the network.
pub const DEFAULT_TOUCH_ICON_MAX_BYTES: usize = 256 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    /// Path to the database file
    pub database_path: PathBuf,
    /// Page thumbnails, one PNG per URL
    pub thumbnail_dir: PathBuf,
    /// Cache, cookies and databases of private tabs
    pub incognito_dir: PathBuf,
    /// Search engine URL template
    pub search_engine: String,
    /// Homepage URL
    pub homepage: String,
    pub shortcuts: ShortcutTable,
    pub max_tabs: usize,
    pub wake_lock_timeout_secs: u64,
    /// Package name the browser is installed under
    pub app_id: String,
    /// Log page loads at debug level as diagnostic traces
    pub tracing: bool,
    pub touch_icon_max_bytes: usize,
}

impl Config {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            database_path: data_dir.join("meridian.db"),
            thumbnail_dir: data_dir.join("thumbnails"),
            incognito_dir: data_dir.join("incognito"),
            data_dir,
            search_engine: DEFAULT_SEARCH_TEMPLATE.to_string(),
            homepage: "about:blank".to_string(),
            shortcuts: ShortcutTable::default(),
            max_tabs: DEFAULT_MAX_TABS,
            wake_lock_timeout_secs: DEFAULT_WAKE_LOCK_TIMEOUT_SECS,
            app_id: "org.meridian.browser".to_string(),
            tracing: false,
            touch_icon_max_bytes: DEFAULT_TOUCH_ICON_MAX_BYTES,
        }
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("Meridian"))
            .unwrap_or_else(|| PathBuf::from(".meridian"))
    }

    /// Read a JSON config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_tabs == 0 {
            return Err(CoreError::Config("max_tabs must be at least 1".to_string()));
        }
        if !self.search_engine.contains("%s") {
            return Err(CoreError::Config(format!(
                "search engine template has no %s: {}",
                self.search_engine
            )));
        }
        if self.homepage.trim().is_empty() {
            return Err(CoreError::Config("homepage is empty".to_string()));
        }
        Ok(())
    }

    pub fn wake_lock_timeout(&self) -> Duration {
        Duration::from_secs(self.wake_lock_timeout_secs)
    }

    pub fn artifact_dirs(&self) -> ArtifactDirs {
        ArtifactDirs {
            thumbnails: self.thumbnail_dir.clone(),
            incognito: self.incognito_dir.clone(),
        }
    }

    /// Create every directory the browser writes into.
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        if let Some(parent) = self.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::create_dir_all(&self.thumbnail_dir)?;
        std::fs::create_dir_all(&self.incognito_dir)?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::data_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new(PathBuf::from("/data"));
        assert_eq!(config.database_path, PathBuf::from("/data/meridian.db"));
        assert_eq!(config.max_tabs, 8);
        assert_eq!(config.wake_lock_timeout(), Duration::from_secs(300));
        assert_eq!(config.artifact_dirs().incognito, PathBuf::from("/data/incognito"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_data_dir_is_named() {
        let dir = Config::data_dir();
        assert!(dir.ends_with("Meridian") || dir.ends_with(".meridian"));
        assert_eq!(Config::default().database_path, dir.join("meridian.db"));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"homepage": "http://home.example/", "max_tabs": 3}"#).unwrap();
        assert_eq!(config.homepage, "http://home.example/");
        assert_eq!(config.max_tabs, 3);
        assert_eq!(config.search_engine, DEFAULT_SEARCH_TEMPLATE);
        assert_eq!(config.shortcuts.len(), 4);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::new(PathBuf::from("/data"));
        config.max_tabs = 0;
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));

        let mut config = Config::new(PathBuf::from("/data"));
        config.search_engine = "http://search.example/".into();
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));
    }
}
