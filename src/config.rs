use std::path::Path;

use config::{Config, File};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("settings directory is not valid UTF-8: {0}")]
    InvalidPath(String),

    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
}

/// Analysis switches, read from `~/.config/concord-el/settings.*` and then
/// `<dir>/.concord-el.*` (any format the `config` crate understands).
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Settings {
    /// Declarations inside `then`/`else`/`try`/`error`/`block`/`parallel` and
    /// `switch` cases of earlier steps are visible to later steps
    pub branch_declarations: bool,
    /// Built-in EL functions take part in resolution and completion
    pub builtin_functions: bool,
    /// `configuration.arguments` are visible in every flow
    pub include_arguments: bool,
    /// Report variables that resolve to nothing as warnings
    pub unresolved_diagnostics: bool,
}

impl Settings {
    pub fn load(root_dir: &Path) -> Result<Settings, ConfigError> {
        let global = shellexpand::tilde("~/.config/concord-el/settings");
        Self::load_from(&global, root_dir)
    }

    fn load_from(global: &str, root_dir: &Path) -> Result<Settings, ConfigError> {
        let root = root_dir
            .to_str()
            .ok_or_else(|| ConfigError::InvalidPath(root_dir.display().to_string()))?;

        let settings = Config::builder()
            .add_source(File::with_name(global).required(false))
            .add_source(File::with_name(&format!("{}/.concord-el", root)).required(false))
            .set_default("branch_declarations", true)?
            .set_default("builtin_functions", true)?
            .set_default("include_arguments", true)?
            .set_default("unresolved_diagnostics", true)?
            .build()?;

        let settings = settings.try_deserialize::<Settings>()?;
        tracing::debug!(?settings, root, "loaded settings");

        Ok(settings)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            branch_declarations: true,
            builtin_functions: true,
            include_arguments: true,
            unresolved_diagnostics: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nothing-here");
        let settings = Settings::load_from(missing.to_str().unwrap(), dir.path()).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_project_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".concord-el.toml"),
            "branch_declarations = false\nunresolved_diagnostics = false\n",
        )
        .unwrap();
        let missing = dir.path().join("nothing-here");

        let settings = Settings::load_from(missing.to_str().unwrap(), dir.path()).unwrap();
        assert!(!settings.branch_declarations);
        assert!(!settings.unresolved_diagnostics);
        assert!(settings.builtin_functions);
    }
}
