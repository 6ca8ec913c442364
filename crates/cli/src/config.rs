use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Looked up in the current directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "buildcost.toml";

pub const DEFAULT_LOG_FILE: &str = ".ninja_log";
pub const DEFAULT_TARGET: &str = "chrome";

/// Optional settings file. Every key can also be given on the command line,
/// which takes precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub log: Option<PathBuf>,
    pub target: Option<String>,
    pub compiler: Option<String>,
    pub ninja: Option<PathBuf>,
    pub show_all: Option<bool>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// An explicit path must exist; the default file is used only if present.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let default = Path::new(DEFAULT_CONFIG_FILE);
        if default.is_file() {
            log::debug!("Using config {}", default.display());
            return Self::load(default);
        }
        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_all_keys() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("buildcost.toml");
        fs::write(
            &path,
            "log = \"out/.ninja_log\"\ntarget = \"base\"\ncompiler = \"clang++\"\nninja = \"/opt/ninja\"\nshow_all = true\n",
        )
        .unwrap();

        let cfg = ConfigFile::load(&path).unwrap();
        assert_eq!(
            cfg,
            ConfigFile {
                log: Some(PathBuf::from("out/.ninja_log")),
                target: Some("base".to_string()),
                compiler: Some("clang++".to_string()),
                ninja: Some(PathBuf::from("/opt/ninja")),
                show_all: Some(true),
            }
        );
    }

    #[test]
    fn missing_keys_stay_unset() {
        let cfg: ConfigFile = toml::from_str("target = \"base\"").unwrap();
        assert_eq!(cfg.target.as_deref(), Some("base"));
        assert_eq!(cfg.log, None);
        assert_eq!(cfg.show_all, None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<ConfigFile>("tagret = \"base\"").is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let err = ConfigFile::discover(Some(&temp.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("nope.toml"));
    }
}
