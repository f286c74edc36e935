//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$IMFSHELL_CONFIG` (environment variable)
//! 2. `~/.config/imfshell/config.toml` (Linux/macOS)
//!    `%APPDATA%\imfshell\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::parser::flags::Mode;
use crate::parser::MAX_INPUT_LEN;
use crate::store::bag::DEFAULT_LIMIT;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Default parse modes.
    pub parser: ParserConfig,
    /// Memory bag sizing.
    pub memory: MemoryConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Default parse modes, one switch per mode bit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Accept an unquoted `.` in a display-name.
    pub display_name_dot: bool,
    /// Accept an addr-spec without `@domain`.
    pub addr_spec_no_domain: bool,
    /// Structured headers: `.` is atom text.
    pub dot_atom: bool,
    /// Structured headers: emit comments as tokens.
    pub comments: bool,
    /// Structured headers: `;` terminates a token.
    pub semicolon: bool,
    /// Structured headers: keep zero-length tokens.
    pub empty_tokens: bool,
    /// Record syntax errors and keep going.
    pub relax: bool,
    /// Return after the first complete entity.
    pub stop_early: bool,
    /// Input ceiling in bytes; bodies this long or longer are refused.
    pub max_input_len: usize,
}

/// Memory bag sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Byte budget of one memory bag (default: 16777216 = 16 MB).
    pub bag_limit: usize,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            bag_limit: DEFAULT_LIMIT,
        }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            display_name_dot: false,
            addr_spec_no_domain: false,
            dot_atom: false,
            comments: false,
            semicolon: false,
            empty_tokens: false,
            relax: false,
            stop_early: false,
            max_input_len: MAX_INPUT_LEN,
        }
    }
}

impl ParserConfig {
    /// Fold the switches into a [`Mode`].
    pub fn mode(&self) -> Mode {
        let mut mode = Mode::empty();
        mode.set(Mode::DISPLAY_NAME_DOT, self.display_name_dot);
        mode.set(Mode::ADDR_SPEC_NO_DOMAIN, self.addr_spec_no_domain);
        mode.set(Mode::DOT_ATOM, self.dot_atom);
        mode.set(Mode::COMMENT_TOKENS, self.comments);
        mode.set(Mode::SEMICOLON, self.semicolon);
        mode.set(Mode::EMPTY_TOKENS, self.empty_tokens);
        mode.set(Mode::RELAX, self.relax);
        mode.set(Mode::STOP_EARLY, self.stop_early);
        mode
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    match config_file_path() {
        Some(path) if path.exists() => load_config_from(&path),
        _ => Config::default(),
    }
}

/// Load configuration from `path`, falling back to defaults on any error.
pub fn load_config_from(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str::<Config>(&contents) {
            Ok(cfg) => {
                tracing::info!(path = %path.display(), "Loaded config");
                cfg
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to parse config, using defaults"
                );
                Config::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to read config file, using defaults"
            );
            Config::default()
        }
    }
}

/// Save configuration to the standard location.
pub fn save_config(config: &Config) -> anyhow::Result<()> {
    let path = config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;
    save_config_to(config, &path)
}

/// Save configuration to `path`, creating parent directories.
pub fn save_config_to(config: &Config, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(())
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("IMFSHELL_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("imfshell").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("imfshell")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("imfshell.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.general.log_level, "warn");
        assert_eq!(cfg.parser.mode(), Mode::empty());
        assert_eq!(cfg.memory.bag_limit, 16 * 1024 * 1024);
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let mut cfg = Config::default();
        cfg.parser.relax = true;
        cfg.parser.max_input_len = 4096;
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.parser.mode(), Mode::RELAX);
        assert_eq!(parsed.parser.max_input_len, 4096);
        assert_eq!(parsed.memory.bag_limit, cfg.memory.bag_limit);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[parser]
display_name_dot = true
semicolon = true
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert_eq!(cfg.parser.mode(), Mode::DISPLAY_NAME_DOT | Mode::SEMICOLON);
        // Other fields use defaults
        assert_eq!(cfg.parser.max_input_len, MAX_INPUT_LEN);
        assert_eq!(cfg.general.log_level, "warn");
        assert_eq!(cfg.memory.bag_limit, DEFAULT_LIMIT);
    }

    #[test]
    fn test_every_switch_maps_to_its_bit() {
        let cfg = ParserConfig {
            display_name_dot: true,
            addr_spec_no_domain: true,
            dot_atom: true,
            comments: true,
            semicolon: true,
            empty_tokens: true,
            relax: true,
            stop_early: true,
            max_input_len: MAX_INPUT_LEN,
        };
        assert_eq!(cfg.mode(), Mode::all());
    }

    #[test]
    fn test_log_file_under_cache_dir() {
        let mut cfg = Config::default();
        cfg.general.cache_dir = Some(PathBuf::from("/tmp/imfshell-test"));
        assert_eq!(
            log_file_path(&cfg),
            PathBuf::from("/tmp/imfshell-test/imfshell.log")
        );
    }
}
