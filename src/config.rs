//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory,
//! then applies `NELUMBO_WORK_DIR` and `NELUMBO_LOG_LEVEL` env overrides.
//! The gateway token is read from the `DISCORD_TOKEN` env var only — it is
//! never sourced from TOML.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;

/// Console channel configuration.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Whether the interactive console channel is enabled.
    pub enabled: bool,
}

/// Fully-resolved bot configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_name: String,
    /// Working directory for all persistent data (already expanded, no `~`).
    pub work_dir: PathBuf,
    pub log_level: String,
    /// First word of a chat message that addresses the bot (e.g. `"nelu"`).
    pub command_prefix: String,
    /// Asset root (absolute, or resolved relative to `work_dir`).
    pub assets_dir: PathBuf,
    /// Database file name, created under `work_dir`.
    pub db_file: String,
    pub console: ConsoleConfig,
    /// Gateway token from `DISCORD_TOKEN` — `None` when running without a
    /// platform connection (console-only).
    pub gateway_token: Option<String>,
}

impl Config {
    /// Returns `true` if the console channel should be loaded.
    pub fn console_should_load(&self) -> bool {
        self.console.enabled
    }

    /// Full path of the SQLite database file.
    pub fn db_path(&self) -> PathBuf {
        self.work_dir.join(&self.db_file)
    }
}

/// Raw TOML shape — `serde` target before resolution.
#[derive(Deserialize)]
struct RawConfig {
    bot: RawBot,
    #[serde(default)]
    assets: RawAssets,
    #[serde(default)]
    storage: RawStorage,
    #[serde(default)]
    comms: RawComms,
}

#[derive(Deserialize)]
struct RawBot {
    name: String,
    work_dir: String,
    log_level: String,
    #[serde(default = "default_command_prefix")]
    command_prefix: String,
}

#[derive(Deserialize)]
struct RawAssets {
    #[serde(default = "default_assets_dir")]
    dir: String,
}

#[derive(Deserialize)]
struct RawStorage {
    #[serde(default = "default_db_file")]
    db_file: String,
}

#[derive(Deserialize, Default)]
struct RawComms {
    #[serde(default)]
    console: RawConsole,
}

#[derive(Deserialize)]
struct RawConsole {
    /// Defaults to `true`: the console auto-enables when no platform
    /// gateway is configured.
    #[serde(default = "default_true")]
    enabled: bool,
}

impl Default for RawConsole {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for RawAssets {
    fn default() -> Self {
        Self { dir: default_assets_dir() }
    }
}

impl Default for RawStorage {
    fn default() -> Self {
        Self { db_file: default_db_file() }
    }
}

fn default_command_prefix() -> String {
    "nelu".to_string()
}

fn default_assets_dir() -> String {
    "assets".to_string()
}

fn default_db_file() -> String {
    "nelumbo.db".to_string()
}

fn default_true() -> bool {
    true
}

/// Load config from `config/default.toml`, then apply env-var overrides.
pub fn load() -> Result<Config, AppError> {
    let work_dir_override = env::var("NELUMBO_WORK_DIR").ok();
    let log_level_override = env::var("NELUMBO_LOG_LEVEL").ok();
    load_from(
        Path::new("config/default.toml"),
        work_dir_override.as_deref(),
        log_level_override.as_deref(),
    )
}

/// Internal loader — accepts an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(
    path: &Path,
    work_dir_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let b = parsed.bot;

    let work_dir_str = work_dir_override.unwrap_or(&b.work_dir).to_string();
    let work_dir = expand_home(&work_dir_str);
    let log_level = log_level_override.unwrap_or(&b.log_level).to_string();

    let assets_dir = {
        let p = expand_home(&parsed.assets.dir);
        if p.is_absolute() { p } else { work_dir.join(p) }
    };

    Ok(Config {
        bot_name: b.name,
        work_dir,
        log_level,
        command_prefix: b.command_prefix,
        assets_dir,
        db_file: parsed.storage.db_file,
        console: ConsoleConfig {
            enabled: parsed.comms.console.enabled,
        },
        gateway_token: env::var("DISCORD_TOKEN").ok(),
    })
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

// ── test helpers ──────────────────────────────────────────────────────────────

/// Safe `Config` for unit tests — console off, no tokens, tmp paths.
#[cfg(test)]
impl Config {
    pub fn test_default(work_dir: &Path) -> Self {
        Self {
            bot_name: "test".into(),
            work_dir: work_dir.to_path_buf(),
            log_level: "info".into(),
            command_prefix: "nelu".into(),
            assets_dir: work_dir.join("assets"),
            db_file: "test.db".into(),
            console: ConsoleConfig { enabled: false },
            gateway_token: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL_TOML: &str = r#"
[bot]
name = "test-bot"
work_dir = "~/.nelumbo"
log_level = "info"
"#;

    fn write_toml(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parse_basic_config() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), None, None).unwrap();
        assert_eq!(cfg.bot_name, "test-bot");
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.command_prefix, "nelu");
        assert!(cfg.console_should_load());
    }

    #[test]
    fn assets_dir_resolves_under_work_dir() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), Some("/tmp/nelumbo-test"), None).unwrap();
        assert_eq!(cfg.assets_dir, PathBuf::from("/tmp/nelumbo-test/assets"));
        assert_eq!(cfg.db_path(), PathBuf::from("/tmp/nelumbo-test/nelumbo.db"));
    }

    #[test]
    fn absolute_assets_dir_unchanged() {
        let toml = r#"
[bot]
name = "test-bot"
work_dir = "/tmp/nelumbo-test"
log_level = "info"

[assets]
dir = "/srv/assets"
"#;
        let f = write_toml(toml);
        let cfg = load_from(f.path(), None, None).unwrap();
        assert_eq!(cfg.assets_dir, PathBuf::from("/srv/assets"));
    }

    #[test]
    fn console_can_be_disabled() {
        let toml = r#"
[bot]
name = "test-bot"
work_dir = "/tmp/nelumbo-test"
log_level = "info"

[comms.console]
enabled = false
"#;
        let f = write_toml(toml);
        let cfg = load_from(f.path(), None, None).unwrap();
        assert!(!cfg.console_should_load());
    }

    #[test]
    fn tilde_expands_to_home() {
        let home = dirs::home_dir().expect("home dir must exist in test env");
        let expanded = expand_home("~/.nelumbo");
        assert!(expanded.starts_with(&home));
        assert!(expanded.ends_with(".nelumbo"));
    }

    #[test]
    fn missing_file_errors() {
        let result = load_from(Path::new("/nonexistent/config.toml"), None, None);
        assert!(result.is_err());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("config error"));
    }

    #[test]
    fn env_overrides_apply() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), Some("/tmp/test-override"), Some("debug")).unwrap();
        assert_eq!(cfg.work_dir, PathBuf::from("/tmp/test-override"));
        assert_eq!(cfg.log_level, "debug");
    }
}
