//! Configuration management for Liquid Glass.
//!
//! This module handles loading and accessing configuration values from
//! environment variables and `.env` files. Only the Spotify client id is
//! mandatory; every endpoint and the callback server address have defaults
//! that point at the public Spotify services.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults

use std::{env, path::PathBuf};

use crate::error::ConfigError;

pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8888/callback";
pub const DEFAULT_SCOPE: &str = "user-read-playback-state user-modify-playback-state user-read-currently-playing user-read-private";
pub const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:8888";

/// Loads environment variables from a `.env` file in the local data directory.
///
/// Creates the directory structure if it doesn't exist and loads variables
/// from `liquidglass/.env` under the platform-specific local data directory:
/// - Linux: `~/.local/share/liquidglass/.env`
/// - macOS: `~/Library/Application Support/liquidglass/.env`
/// - Windows: `%LOCALAPPDATA%/liquidglass/.env`
///
/// A missing file is not an error: everything can also come from the
/// process environment.
///
/// # Errors
///
/// This function will return an error if:
/// - The parent directory cannot be created
/// - The `.env` file exists but cannot be read or parsed
pub async fn load_env() -> Result<(), ConfigError> {
    let path = data_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| ConfigError::EnvFile(e.to_string()))?;
    }

    if !path.is_file() {
        log::debug!("no environment file at {}", path.display());
        return Ok(());
    }

    dotenv::from_path(&path).map_err(|e| ConfigError::EnvFile(e.to_string()))?;
    Ok(())
}

/// Returns the application's local data directory.
///
/// Falls back to the current directory when the platform has no notion of
/// a local data directory.
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("liquidglass");
    path
}

/// Runtime configuration of the session manager, the Web API surface and
/// the local callback server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `SPOTIFY_API_AUTH_CLIENT_ID`, the client id of the registered app.
    pub client_id: String,
    /// `SPOTIFY_API_REDIRECT_URI`, must match the app registration.
    pub redirect_uri: String,
    /// `SPOTIFY_API_AUTH_SCOPE`, space-separated permission list.
    pub scope: String,
    /// `SPOTIFY_API_AUTH_URL`
    pub auth_url: String,
    /// `SPOTIFY_API_TOKEN_URL`
    pub token_url: String,
    /// `SPOTIFY_API_URL`, base of the Web API.
    pub api_url: String,
    /// `SERVER_ADDRESS`, bind address of the local callback server.
    pub server_address: String,
}

impl Config {
    /// Creates a configuration with default endpoints for `client_id`.
    pub fn new(client_id: impl Into<String>) -> Self {
        Config {
            client_id: client_id.into(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            server_address: DEFAULT_SERVER_ADDRESS.to_string(),
        }
    }

    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] naming every required variable that
    /// is unset or empty, not just the first one.
    ///
    /// # Example
    ///
    /// ```
    /// let config = Config::from_env()?;
    /// println!("authorizing against {}", config.auth_url);
    /// ```
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut missing = Vec::new();
        let client_id = required("SPOTIFY_API_AUTH_CLIENT_ID", &mut missing);
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        Ok(Config {
            client_id,
            redirect_uri: optional("SPOTIFY_API_REDIRECT_URI", DEFAULT_REDIRECT_URI),
            scope: optional("SPOTIFY_API_AUTH_SCOPE", DEFAULT_SCOPE),
            auth_url: optional("SPOTIFY_API_AUTH_URL", DEFAULT_AUTH_URL),
            token_url: optional("SPOTIFY_API_TOKEN_URL", DEFAULT_TOKEN_URL),
            api_url: optional("SPOTIFY_API_URL", DEFAULT_API_URL),
            server_address: optional("SERVER_ADDRESS", DEFAULT_SERVER_ADDRESS),
        })
    }
}

fn required(name: &str, missing: &mut Vec<String>) -> String {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => {
            missing.push(name.to_string());
            String::new()
        }
    }
}

fn optional(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}
