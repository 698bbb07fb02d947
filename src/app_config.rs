//! Application configuration loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// Directory name used under the config and data base directories.
const APP_DIR: &str = "mediadock";

/// TOML-style file configuration for mediadock defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Storage root holding the `videos/` directory.
    pub library_root: Option<PathBuf>,
    /// Deadline for a whole transfer, in seconds.
    pub transfer_timeout_secs: Option<u64>,
    /// HTTP connect timeout, in seconds.
    pub connect_timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        validate_timeout_secs("transfer_timeout_secs", self.transfer_timeout_secs)?;
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        if let Some(root) = &self.library_root
            && root.as_os_str().is_empty()
        {
            bail!("Invalid config value for `library_root`: path is empty");
        }
        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/mediadock/config.toml`
/// 2. `$HOME/.config/mediadock/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config_home).join(APP_DIR).join("config.toml"));
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join("config.toml"),
    )
}

/// Resolves the default storage root.
///
/// Priority:
/// 1. `$XDG_DATA_HOME/mediadock`
/// 2. `$HOME/.local/share/mediadock`
/// 3. `./mediadock`
#[must_use]
pub fn default_library_root() -> PathBuf {
    if let Some(xdg_data_home) = env_var_non_empty_os("XDG_DATA_HOME") {
        return PathBuf::from(xdg_data_home).join(APP_DIR);
    }
    env_var_non_empty_os("HOME").map_or_else(
        || PathBuf::from(APP_DIR),
        |home| {
            PathBuf::from(home)
                .join(".local")
                .join("share")
                .join(APP_DIR)
        },
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from default path if present.
pub fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(path_ref) if path_ref.exists() => Some(load_file_config(path_ref)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!(
                "Invalid config syntax on line {}: expected key = value",
                line_index + 1
            );
        };

        let key = raw_key.trim();
        let value = raw_value.trim();

        match key {
            "library_root" => {
                let parsed = parse_string_literal(value).with_context(|| {
                    format!("Invalid `library_root` value on line {}", line_index + 1)
                })?;
                cfg.library_root = Some(PathBuf::from(parsed));
            }
            "transfer_timeout_secs" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!(
                        "Invalid `transfer_timeout_secs` value on line {}",
                        line_index + 1
                    )
                })?;
                cfg.transfer_timeout_secs = Some(parsed);
            }
            "connect_timeout_secs" => {
                let parsed = parse_integer_u64(value).with_context(|| {
                    format!(
                        "Invalid `connect_timeout_secs` value on line {}",
                        line_index + 1
                    )
                })?;
                cfg.connect_timeout_secs = Some(parsed);
            }
            unknown => {
                bail!(
                    "Unknown configuration key: '{}' on line {}",
                    unknown,
                    line_index + 1
                );
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}
