use serde::{Deserialize, Serialize};
use std::path::Path;
use tandem_editor::{ConflictStrategy, SyncConfig, SyncMode};
use tandem_parser::{MapperOptions, SerializeOptions};

pub const DEFAULT_CONFIG_NAME: &str = "tandem.config.json";

/// Tandem configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub sync_mode: SyncMode,

    #[serde(default)]
    pub conflict_strategy: ConflictStrategy,

    /// Spaces per nesting level in generated markup
    #[serde(default = "default_indent")]
    pub indent: usize,

    /// Known component types; tags outside it become placeholders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<Vec<String>>,
}

fn default_indent() -> usize {
    2
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &Path) -> anyhow::Result<Self> {
        let config_path = cwd.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            tracing::debug!(path = %config_path.display(), "loaded config");
            Ok(config)
        } else {
            // Return default config if none exists
            Ok(Config::default())
        }
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            sync_mode: self.sync_mode,
            conflict_strategy: self.conflict_strategy,
        }
    }

    pub fn mapper_options(&self) -> MapperOptions {
        match &self.catalog {
            Some(types) => MapperOptions::with_catalog(types),
            None => MapperOptions::default(),
        }
    }

    pub fn serialize_options(&self) -> SerializeOptions {
        SerializeOptions {
            indent: " ".repeat(self.indent),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sync_mode: SyncMode::default(),
            conflict_strategy: ConflictStrategy::default(),
            indent: default_indent(),
            catalog: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "syncMode": "manual",
            "conflictStrategy": "preferSource",
            "indent": 4,
            "catalog": ["div", "Button"]
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.sync_mode, SyncMode::Manual);
        assert_eq!(config.conflict_strategy, ConflictStrategy::PreferSource);
        assert_eq!(config.serialize_options().indent, "    ");
        assert!(config.mapper_options().catalog.unwrap().contains("button"));
    }

    #[test]
    fn test_default_config() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.indent, 2);
        assert!(config.mapper_options().catalog.is_none());
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Config::load(dir.path()).unwrap(), Config::default());

        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_NAME),
            r#"{ "conflictStrategy": "manual" }"#,
        )
        .unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.sync_config().conflict_strategy, ConflictStrategy::Manual);
        assert_eq!(config.sync_config().sync_mode, SyncMode::Automatic);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), "{ not json").unwrap();
        assert!(Config::load(dir.path()).is_err());
    }
}
