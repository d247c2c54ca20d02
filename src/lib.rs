//! Liquid Glass session and remote-playback control core
//!
//! This library owns the two stateful halves of the Liquid Glass player
//! client: the OAuth 2.0 PKCE session against Spotify and the remote
//! playback controller that drives an external playback surface. Everything
//! visual lives elsewhere; this crate only keeps the state honest.
//!
//! # Modules
//!
//! - `api` - HTTP endpoints for the local OAuth callback server
//! - `callback` - Redirect URL routing (authorization code vs. surface authorization)
//! - `cli` - Command-line interface implementations
//! - `clock` - Wall clock abstraction used for token expiry
//! - `config` - Configuration management and environment variables
//! - `error` - Error taxonomy shared by all components
//! - `http` - Generic HTTP client abstraction and its reqwest adapter
//! - `management` - Session/token manager and preview resolver
//! - `playback` - Coordinator choosing between remote and local playback
//! - `remote` - Remote playback controller, surface trait and Web API adapter
//! - `server` - Local HTTP server for OAuth callbacks
//! - `spotify` - Spotify accounts and profile endpoints
//! - `store` - Credential store abstraction and implementations
//! - `types` - Data structures and type definitions
//! - `utils` - PKCE helpers
//!
//! # Example
//!
//! ```
//! use liquidglass::{config, cli};
//!
//! #[tokio::main]
//! async fn main() -> liquidglass::Res<()> {
//!     config::load_env().await?;
//!     cli::status().await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod callback;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod management;
pub mod playback;
pub mod remote;
pub mod server;
pub mod spotify;
pub mod store;
pub mod types;
pub mod utils;

/// A convenient Result type alias for operations that may fail.
///
/// Used at the outer edges of the application (CLI commands, server setup)
/// where the concrete error kind no longer matters. Library components
/// return the typed errors from [`error`] instead.
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an informational message with a blue bullet point.
///
/// # Example
///
/// ```
/// info!("Waiting for authorization callback...");
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// # Example
///
/// ```
/// success!("Logged in as {}", name);
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Only meant for the CLI layer: library code never terminates the process.
///
/// # Example
///
/// ```
/// error!("Missing configuration: {}", e);
/// // Program exits here - code after this will not execute
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// # Example
///
/// ```
/// warning!("Remote playback unavailable, playing preview instead");
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
