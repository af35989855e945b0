//! Chat session glue between the REPL and the client.
//!
//! `ChatSession` wraps a connected [`Parley`] client with the preflight
//! checks and small response shapes the REPL needs. The conversation itself
//! lives server-side; none of it is persisted here.

use std::path::Path;

use crate::client::Parley;
use crate::error::{Error, Result};
use crate::render::Renderer;
use crate::sse::Decoded;

/// Command path for ordinary chat prompts.
const STREAM_PATH: &str = "/stream";

/// A chat session backed by a connected client.
pub struct ChatSession {
    client: Parley,
}

impl ChatSession {
    /// Creates a new chat session. The client must already be connected.
    pub fn new(client: Parley) -> Self {
        Self { client }
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &Parley {
        &self.client
    }

    /// Sends a regular prompt and streams the response into `renderer`.
    pub async fn send_prompt(
        &self,
        prompt: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<Decoded> {
        self.client
            .stream_command(STREAM_PATH, prompt, renderer)
            .await
    }

    /// Forwards a raw server-side command path and streams the response.
    pub async fn run_command(
        &self,
        path: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<Decoded> {
        self.client.stream_command(path, "", renderer).await
    }

    /// Uploads a local file after checking it exists and has a supported
    /// extension.
    pub async fn upload(&self, path: &str) -> Result<()> {
        if !Path::new(path).is_file() {
            return Err(Error::validation(format!("file not found: {path}")));
        }
        let extension = Path::new(path)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let supported = self.client.supported_filetypes().await?;
        if !supported.contains(&extension) {
            return Err(Error::validation(format!(
                "unsupported file type: {extension} (supported: {})",
                supported.join(", ")
            )));
        }
        self.client.upload(path).await
    }

    /// Sets a standing instruction, then streams the assistant's
    /// acknowledgement of it as a regular prompt.
    pub async fn instruct(
        &self,
        instruction: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<Decoded> {
        let message = self.client.instruct(instruction).await?;
        renderer.print_info(&message);
        self.send_prompt(instruction, renderer).await
    }

    /// Dumps server-side session state; returns the confirmation message.
    pub async fn session_dump(&self) -> Result<String> {
        self.client.session_dump().await
    }

    /// Restores server-side session state; returns the confirmation message.
    pub async fn session_restore(&self) -> Result<String> {
        self.client.session_restore().await
    }

    /// Merges server-side session state; returns the confirmation message.
    pub async fn session_merge(&self) -> Result<String> {
        self.client.session_merge().await
    }
}
