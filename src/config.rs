use log::debug;
use std::path::PathBuf;

use crate::runtime::Runtime;

pub const DEFAULT_DB_ROOT: &str = "/var/lib/pkg/DB";
pub const DEFAULT_SYNC_COMMAND: &str = "cards sync";

pub const DB_ROOT_ENV: &str = "CARDS_DB_ROOT";
pub const MANIFEST_ROOT_ENV: &str = "CARDS_MANIFEST_ROOT";
pub const SYNC_COMMAND_ENV: &str = "CARDS_SYNC_COMMAND";

/// Locations and commands the backend works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Root of the installed package database (`<db_root>/<name>/META`).
    pub db_root: PathBuf,
    /// Root of the installed file manifests (`<manifest_root>/<name>/files`).
    pub manifest_root: PathBuf,
    /// External command refreshing the package cache, split on whitespace.
    pub sync_command: Vec<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            db_root: PathBuf::from(DEFAULT_DB_ROOT),
            manifest_root: PathBuf::from(DEFAULT_DB_ROOT),
            sync_command: split_command(DEFAULT_SYNC_COMMAND),
        }
    }
}

impl BackendConfig {
    /// Build the configuration from the environment, falling back to defaults.
    ///
    /// The manifest root follows the database root unless set on its own.
    #[tracing::instrument(skip(runtime))]
    pub fn from_runtime<R: Runtime>(runtime: &R) -> Self {
        let mut config = Self::default();

        if let Ok(root) = runtime.env_var(DB_ROOT_ENV) {
            config.db_root = PathBuf::from(&root);
            config.manifest_root = PathBuf::from(root);
        }
        if let Ok(root) = runtime.env_var(MANIFEST_ROOT_ENV) {
            config.manifest_root = PathBuf::from(root);
        }
        if let Ok(command) = runtime.env_var(SYNC_COMMAND_ENV) {
            let command = split_command(&command);
            if !command.is_empty() {
                config.sync_command = command;
            }
        }

        debug!("Using configuration {:?}", config);
        config
    }

    pub fn with_db_root(mut self, root: PathBuf) -> Self {
        self.db_root = root;
        self
    }

    pub fn with_manifest_root(mut self, root: PathBuf) -> Self {
        self.manifest_root = root;
        self
    }
}

fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use std::env::VarError;

    fn runtime_with_env(vars: &'static [(&'static str, &'static str)]) -> MockRuntime {
        let mut runtime = MockRuntime::new();
        runtime.expect_env_var().returning(move |key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
                .ok_or(VarError::NotPresent)
        });
        runtime
    }

    #[test]
    fn test_defaults() {
        let config = BackendConfig::from_runtime(&runtime_with_env(&[]));

        assert_eq!(config.db_root, PathBuf::from("/var/lib/pkg/DB"));
        assert_eq!(config.manifest_root, PathBuf::from("/var/lib/pkg/DB"));
        assert_eq!(config.sync_command, vec!["cards", "sync"]);
    }

    #[test]
    fn test_db_root_moves_manifest_root() {
        let config = BackendConfig::from_runtime(&runtime_with_env(&[(
            "CARDS_DB_ROOT",
            "/srv/db",
        )]));

        assert_eq!(config.db_root, PathBuf::from("/srv/db"));
        assert_eq!(config.manifest_root, PathBuf::from("/srv/db"));
    }

    #[test]
    fn test_manifest_root_override() {
        let config = BackendConfig::from_runtime(&runtime_with_env(&[
            ("CARDS_DB_ROOT", "/srv/db"),
            ("CARDS_MANIFEST_ROOT", "/srv/files"),
        ]));

        assert_eq!(config.db_root, PathBuf::from("/srv/db"));
        assert_eq!(config.manifest_root, PathBuf::from("/srv/files"));
    }

    #[test]
    fn test_blank_sync_command_keeps_default() {
        let config = BackendConfig::from_runtime(&runtime_with_env(&[(
            "CARDS_SYNC_COMMAND",
            "   ",
        )]));

        assert_eq!(config.sync_command, vec!["cards", "sync"]);
    }

    #[test]
    fn test_sync_command_override() {
        let config = BackendConfig::from_runtime(&runtime_with_env(&[(
            "CARDS_SYNC_COMMAND",
            "pkgsync --quiet",
        )]));

        assert_eq!(config.sync_command, vec!["pkgsync", "--quiet"]);
    }
}
