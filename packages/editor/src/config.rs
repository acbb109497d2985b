//! Runtime configuration of a sync session

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether change events drive sync cycles on their own
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncMode {
    #[default]
    Automatic,
    Manual,
}

/// How conflicting edits to the same component are settled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConflictStrategy {
    #[default]
    PreferTree,
    PreferSource,
    /// Hand conflicts to the user instead of resolving them
    Manual,
}

impl fmt::Display for ConflictStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictStrategy::PreferTree => write!(f, "preferTree"),
            ConflictStrategy::PreferSource => write!(f, "preferSource"),
            ConflictStrategy::Manual => write!(f, "manual"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    #[serde(default)]
    pub sync_mode: SyncMode,
    #[serde(default)]
    pub conflict_strategy: ConflictStrategy,
}

/// Partial update merged into a [`SyncConfig`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_mode: Option<SyncMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict_strategy: Option<ConflictStrategy>,
}

impl SyncConfig {
    pub fn merge(&mut self, patch: ConfigPatch) {
        if let Some(mode) = patch.sync_mode {
            self.sync_mode = mode;
        }
        if let Some(strategy) = patch.conflict_strategy {
            self.conflict_strategy = strategy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_only_touches_given_fields() {
        let mut config = SyncConfig::default();
        config.merge(ConfigPatch {
            conflict_strategy: Some(ConflictStrategy::PreferSource),
            ..Default::default()
        });

        assert_eq!(config.sync_mode, SyncMode::Automatic);
        assert_eq!(config.conflict_strategy, ConflictStrategy::PreferSource);
    }

    #[test]
    fn test_config_json_is_camel_case() {
        let config: SyncConfig =
            serde_json::from_str(r#"{"syncMode":"manual","conflictStrategy":"preferSource"}"#).unwrap();
        assert_eq!(config.sync_mode, SyncMode::Manual);
        assert_eq!(config.conflict_strategy, ConflictStrategy::PreferSource);

        let empty: SyncConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, SyncConfig::default());
    }
}
