use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root that relative document paths resolve against.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_dir: Option<PathBuf>,
    pub editor: EditorConfig,
    pub attributes: AttributesConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Character that opens the attribute menu.
    pub trigger: char,
    pub max_candidates: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            trigger: '%',
            max_candidates: 20,
        }
    }
}

/// Attribute keys offered by autocomplete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributesConfig {
    /// Keys legal on every block.
    pub global: Vec<String>,
    /// Extra keys per node type name, e.g. `heading = ["level"]`.
    pub nodes: BTreeMap<String, Vec<String>>,
}

impl Default for AttributesConfig {
    fn default() -> Self {
        Self {
            global: vec!["id".to_string(), "class".to_string()],
            nodes: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the content root
        config.content_dir = config
            .content_dir
            .map(|dir| Self::expand_path(&dir).unwrap_or(dir));

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/docmark");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/docmark/config.toml"));
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.editor.trigger, '%');
        assert_eq!(config.editor.max_candidates, 20);
        assert_eq!(config.attributes.global, vec!["id", "class"]);
    }

    #[test]
    fn test_full_config_parses() {
        let config_content = r#"
content_dir = "/srv/docs"

[editor]
trigger = "@"
max_candidates = 5

[attributes]
global = ["id"]

[attributes.nodes]
heading = ["level", "toc"]
code_block = ["data-file"]
"#;

        let config: Config = toml::from_str(config_content).unwrap();

        assert_eq!(config.content_dir, Some(PathBuf::from("/srv/docs")));
        assert_eq!(config.editor.trigger, '@');
        assert_eq!(config.editor.max_candidates, 5);
        assert_eq!(config.attributes.global, vec!["id"]);
        assert_eq!(config.attributes.nodes["heading"], vec!["level", "toc"]);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let mut original = Config {
            content_dir: Some(PathBuf::from("/tmp/test-docs")),
            ..Config::default()
        };
        original
            .attributes
            .nodes
            .insert("heading".to_string(), vec!["level".to_string()]);

        let toml_str = toml::to_string(&original).unwrap();
        let deserialized: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(original, deserialized);
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test/path");
        let expanded = Config::expand_path(&path);

        assert!(expanded.is_some());
        let expanded = expanded.unwrap();
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("test/path"));
    }

    #[test]
    fn test_expand_path_with_relative_path() {
        let path = PathBuf::from("relative/path");
        let expanded = Config::expand_path(&path).unwrap();

        assert_eq!(expanded, path);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_load_invalid_config_is_a_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "[editor]\nmax_candidates = \"many\"\n").unwrap();

        let err = Config::load_from_path(&config_file).unwrap_err();

        assert!(matches!(err, ConfigError::ConfigParseError { .. }));
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested").join("config.toml");
        let test_config = Config {
            content_dir: Some(PathBuf::from("/tmp/test-docs")),
            ..Config::default()
        };

        test_config.save_to_path(&config_file).unwrap();
        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded_config, test_config);
    }

    #[test]
    fn test_config_with_env_var_in_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "content_dir = \"$DOCMARK_TEST_ROOT/docs\"\n").unwrap();
        unsafe {
            env::set_var("DOCMARK_TEST_ROOT", "/custom/root");
        }

        let config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(config.content_dir, Some(PathBuf::from("/custom/root/docs")));

        unsafe {
            env::remove_var("DOCMARK_TEST_ROOT");
        }
    }
}
