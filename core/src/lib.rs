//! imsession-core
//!
//! Input method session controller shared by engine crates (imsession-pinyin).
//!
//! A host hands raw key events and focus notifications to a [`Session`];
//! the session decides whether each key is consumed, drives a per-session
//! composition over a shared [`ConversionEngine`], and tells a
//! [`PresentationSink`] what to show.
//!
//! Public API:
//! - `SessionHost` - Shared engine bring-up and session creation
//! - `Session` - Key routing, mode switching, selection and focus handling
//! - `ConversionEngine` / `ConversionContext` - Seams to the conversion engine
//! - `PresentationSink` - Display primitives implemented by the host
//! - `Config` - Configuration loaded from TOML
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod keys;
pub use keys::{keysym, keysym_from_name, KeyEvent, KeyResult, Modifiers, UnknownKey};

pub mod mode;
pub use mode::{InputMode, ModeController, ModeIndicator};

pub mod candidate;
pub use candidate::{Candidate, CandidatePager};

pub mod punctuation;
pub use punctuation::PunctuationMap;

pub mod engine;
pub use engine::{ConversionContext, ConversionEngine, FuzzyFlags};

pub mod composition;
pub use composition::{CompositionBuffer, Selection};

pub mod registry;
pub use registry::SessionRegistry;

pub mod presentation;
pub use presentation::{BannerTimer, Preedit, PreeditStyle, PresentationSink, Presenter, View};

pub mod router;
pub use router::{route, Decision, Route, RouteState};

pub mod session;
pub use session::{Session, PRIMARY_BUTTON};

pub mod host;
pub use host::SessionHost;

/// Environment variable overriding the configured log filter.
pub const LOG_ENV: &str = "IMSESSION_LOG";

/// Environment variable naming the directory relative dictionary paths are
/// resolved against.
pub const DATA_DIR_ENV: &str = "IMSESSION_DATA_DIR";

const DEFAULT_LOG_LEVEL: &str = "warn";

const CONFIG_FILE_NAME: &str = "imsession.toml";

/// Session controller configuration.
///
/// Every field has a default, so a partial (or empty) TOML file is valid.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Candidates shown per page
    pub page_size: usize,
    /// Whole-sentence candidates the engine should produce
    pub nbest: usize,
    /// Fuzzy rule names, e.g. `["Z_ZH", "C_CH"]`
    pub fuzzy_flags: Vec<String>,
    /// System dictionary. Relative paths resolve against `IMSESSION_DATA_DIR`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dictionary: Option<PathBuf>,
    /// Log filter directive, e.g. `"info"` or `"imsession_core=debug"`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    /// Clients whose mode is remembered across focus changes
    pub registry_capacity: usize,
    /// How long the mode banner stays up after a switch
    pub banner_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_size: 9,
            nbest: 3,
            fuzzy_flags: vec![],
            dictionary: None,
            log_level: None,
            registry_capacity: 1024,
            banner_timeout_ms: 1000,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Load from `path`, falling back to defaults if the file does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_toml(path)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// `$XDG_CONFIG_HOME/imsession.toml`, then `$HOME/.config/imsession.toml`,
    /// then the same file in the temp directory.
    pub fn default_path() -> PathBuf {
        Self::config_path_from(
            std::env::var_os("XDG_CONFIG_HOME"),
            std::env::var_os("HOME"),
        )
    }

    fn config_path_from(xdg: Option<OsString>, home: Option<OsString>) -> PathBuf {
        let base = xdg
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| {
                home.filter(|v| !v.is_empty())
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .unwrap_or_else(std::env::temp_dir);
        base.join(CONFIG_FILE_NAME)
    }

    pub fn page_size(&self) -> usize {
        self.page_size.max(1)
    }

    pub fn nbest(&self) -> usize {
        self.nbest.max(1)
    }

    pub fn registry_capacity(&self) -> usize {
        self.registry_capacity.max(1)
    }

    pub fn banner_timeout(&self) -> Duration {
        Duration::from_millis(self.banner_timeout_ms)
    }

    pub fn fuzzy_flags(&self) -> FuzzyFlags {
        FuzzyFlags::from_names(&self.fuzzy_flags)
    }

    /// Dictionary path with `IMSESSION_DATA_DIR` applied.
    pub fn dictionary_path(&self) -> Option<PathBuf> {
        let data_dir = std::env::var_os(DATA_DIR_ENV).map(PathBuf::from);
        self.resolve_dictionary(data_dir.as_deref())
    }

    fn resolve_dictionary(&self, data_dir: Option<&Path>) -> Option<PathBuf> {
        let path = self.dictionary.as_ref()?;
        match data_dir {
            Some(dir) if path.is_relative() => Some(dir.join(path)),
            _ => Some(path.clone()),
        }
    }

    /// Log filter: `IMSESSION_LOG`, then `log_level`, then `warn`.
    pub fn log_directive(&self) -> String {
        self.directive_with(std::env::var(LOG_ENV).ok())
    }

    fn directive_with(&self, env: Option<String>) -> String {
        env.filter(|v| !v.trim().is_empty())
            .or_else(|| self.log_level.clone())
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.page_size(), 9);
        assert_eq!(config.nbest(), 3);
        assert_eq!(config.registry_capacity(), 1024);
        assert_eq!(config.banner_timeout(), Duration::from_secs(1));
        assert!(config.fuzzy_flags().is_empty());
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml_str(
            r#"
            page_size = 5
            fuzzy_flags = ["Z_ZH", "C_CH", "Unknown"]
            "#,
        )
        .unwrap();
        assert_eq!(config.page_size(), 5);
        assert_eq!(config.nbest(), 3);
        assert_eq!(config.fuzzy_flags(), FuzzyFlags::Z_ZH | FuzzyFlags::C_CH);
    }

    #[test]
    fn test_zero_values_are_clamped() {
        let config = Config::from_toml_str("page_size = 0\nnbest = 0").unwrap();
        assert_eq!(config.page_size(), 1);
        assert_eq!(config.nbest(), 1);
    }

    #[test]
    fn test_toml_survives_save_and_load() {
        let config = Config {
            page_size: 7,
            dictionary: Some(PathBuf::from("pinyin.dict")),
            log_level: Some("debug".into()),
            ..Config::default()
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(Config::from_toml_str(&text).unwrap(), config);

        let path = std::env::temp_dir().join(format!("imsession-config-{}.toml", std::process::id()));
        config.save_toml(&path).unwrap();
        assert_eq!(Config::load_toml(&path).unwrap(), config);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_means_defaults() {
        let config = Config::load_or_default("/nonexistent/imsession/config.toml").unwrap();
        assert_eq!(config, Config::default());
        assert!(Config::load_toml("/nonexistent/imsession/config.toml").is_err());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        assert!(Config::from_toml_str("page_size = \"nine\"").is_err());
    }

    #[test]
    fn test_default_path_fallbacks() {
        assert_eq!(
            Config::config_path_from(Some("/xdg".into()), Some("/home/u".into())),
            PathBuf::from("/xdg/imsession.toml")
        );
        assert_eq!(
            Config::config_path_from(Some("".into()), Some("/home/u".into())),
            PathBuf::from("/home/u/.config/imsession.toml")
        );
        assert_eq!(
            Config::config_path_from(None, None),
            std::env::temp_dir().join("imsession.toml")
        );
    }

    #[test]
    fn test_dictionary_resolution() {
        let relative = Config {
            dictionary: Some(PathBuf::from("pinyin.dict")),
            ..Config::default()
        };
        assert_eq!(
            relative.resolve_dictionary(Some(Path::new("/usr/share/imsession"))),
            Some(PathBuf::from("/usr/share/imsession/pinyin.dict"))
        );
        assert_eq!(
            relative.resolve_dictionary(None),
            Some(PathBuf::from("pinyin.dict"))
        );

        let absolute = Config {
            dictionary: Some(PathBuf::from("/opt/pinyin.dict")),
            ..Config::default()
        };
        assert_eq!(
            absolute.resolve_dictionary(Some(Path::new("/usr/share"))),
            Some(PathBuf::from("/opt/pinyin.dict"))
        );
        assert_eq!(Config::default().resolve_dictionary(None), None);
    }

    #[test]
    fn test_log_directive_precedence() {
        let config = Config {
            log_level: Some("info".into()),
            ..Config::default()
        };
        assert_eq!(config.directive_with(Some("debug".into())), "debug");
        assert_eq!(config.directive_with(Some(" ".into())), "info");
        assert_eq!(config.directive_with(None), "info");
        assert_eq!(Config::default().directive_with(None), "warn");
    }
}
