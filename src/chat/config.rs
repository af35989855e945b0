//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling chat behavior.

use std::path::PathBuf;

use arrrg_derive::CommandLine;

/// Command-line arguments for the parley-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Gateway base URL.
    #[arrrg(optional, "Gateway base URL (default: http://localhost:8000)", "URL")]
    pub url: Option<String>,

    /// Path to the credentials file.
    #[arrrg(optional, "Credentials file (default: ~/.config/parley/credentials.yaml)", "PATH")]
    pub credentials: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    /// Ask the server not to persist conversation history.
    #[arrrg(flag, "Do not persist conversation history server-side")]
    pub no_history: bool,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// The gateway base URL, if overridden.
    pub base_url: Option<String>,

    /// The credentials file path, if overridden.
    pub credentials_path: Option<PathBuf>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Whether the server should persist conversation history.
    pub persist_history: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    pub fn new() -> Self {
        Self {
            base_url: None,
            credentials_path: None,
            use_color: true,
            persist_history: true,
        }
    }

    /// Sets the gateway base URL.
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Sets the credentials file path.
    pub fn with_credentials_path(mut self, path: PathBuf) -> Self {
        self.credentials_path = Some(path);
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Disables server-side history persistence.
    pub fn without_history(mut self) -> Self {
        self.persist_history = false;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        ChatConfig {
            base_url: args.url,
            credentials_path: args.credentials.map(PathBuf::from),
            use_color: !args.no_color,
            persist_history: !args.no_history,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert!(config.base_url.is_none());
        assert!(config.credentials_path.is_none());
        assert!(config.use_color);
        assert!(config.persist_history);
    }

    #[test]
    fn config_from_args_defaults() {
        let args = ChatArgs::default();
        let config = ChatConfig::from(args);
        assert!(config.base_url.is_none());
        assert!(config.use_color);
        assert!(config.persist_history);
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            url: Some("http://gateway:8000".to_string()),
            credentials: Some("/tmp/creds.yaml".to_string()),
            no_color: true,
            no_history: true,
        };
        let config = ChatConfig::from(args);
        assert_eq!(config.base_url, Some("http://gateway:8000".to_string()));
        assert_eq!(
            config.credentials_path,
            Some(PathBuf::from("/tmp/creds.yaml"))
        );
        assert!(!config.use_color);
        assert!(!config.persist_history);
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new()
            .with_base_url("http://gateway:8000".to_string())
            .with_credentials_path(PathBuf::from("creds.yaml"))
            .without_color()
            .without_history();

        assert_eq!(config.base_url, Some("http://gateway:8000".to_string()));
        assert_eq!(config.credentials_path, Some(PathBuf::from("creds.yaml")));
        assert!(!config.use_color);
        assert!(!config.persist_history);
    }
}
