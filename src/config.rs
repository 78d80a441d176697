use crate::error::{JourneyError, JourneyResult};
use crate::model::Settings;
use crate::spotify::SpotifySession;
use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::UtcOffset;

const APP_DIR: &str = "journey";
const SETTINGS_FILE: &str = "settings.json";
const LOG_FILE: &str = "journey.log";
const DOTENV_FILE: &str = ".env";

pub const TOKEN_VAR: &str = "SPOTIFY_ACCESS_TOKEN";
pub const API_BASE_VAR: &str = "SPOTIFY_API_BASE";

pub fn config_root() -> Result<PathBuf> {
    if let Ok(override_dir) = env::var("JOURNEY_CONFIG_DIR") {
        return Ok(PathBuf::from(override_dir));
    }

    let home = env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .context("neither HOME nor USERPROFILE is set")?;
    Ok(PathBuf::from(home).join(".config").join(APP_DIR))
}

pub fn settings_path() -> Result<PathBuf> {
    Ok(config_root()?.join(SETTINGS_FILE))
}

pub fn log_path() -> Result<PathBuf> {
    Ok(config_root()?.join(LOG_FILE))
}

pub fn ensure_config_dir() -> Result<PathBuf> {
    let root = config_root()?;
    fs::create_dir_all(&root).with_context(|| format!("failed to create {}", root.display()))?;
    Ok(root)
}

pub fn load_settings() -> Result<Settings> {
    load_settings_from_path(&settings_path()?)
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    ensure_config_dir()?;
    save_settings_to_path(&settings_path()?, settings)
}

fn load_settings_from_path(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file {}", path.display()))?;
    let settings: Settings = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse settings file {}", path.display()))?;
    Ok(settings)
}

fn save_settings_to_path(path: &Path, settings: &Settings) -> Result<()> {
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Builds the session handle from the environment, then `./.env`.
pub fn load_session() -> JourneyResult<SpotifySession> {
    let dotenv = fs::read_to_string(DOTENV_FILE).ok();
    let mut session = session_from_sources(env::var(TOKEN_VAR).ok(), dotenv.as_deref())?;
    if let Ok(base) = env::var(API_BASE_VAR)
        && !base.trim().is_empty()
    {
        session = session.with_api_base(base.trim());
    }
    Ok(session)
}

fn session_from_sources(
    env_token: Option<String>,
    dotenv: Option<&str>,
) -> JourneyResult<SpotifySession> {
    let token = env_token
        .filter(|value| !value.trim().is_empty())
        .or_else(|| dotenv.and_then(|raw| dotenv_value(raw, TOKEN_VAR)))
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| {
            JourneyError::Config(format!(
                "{TOKEN_VAR} is not set in the environment or {DOTENV_FILE}"
            ))
        })?;
    Ok(SpotifySession::new(token.trim()))
}

/// Looks `key` up in `.env` text without touching the process environment.
/// Lines that fail to parse are ignored.
fn dotenv_value(raw: &str, key: &str) -> Option<String> {
    dotenvy::from_read_iter(raw.as_bytes())
        .filter_map(Result::ok)
        .find(|(name, _)| name == key)
        .map(|(_, value)| value)
}

/// Must run before any thread is spawned; `time` refuses to read the local
/// offset from a multi-threaded process on some platforms.
pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}
