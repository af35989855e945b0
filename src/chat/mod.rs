//! Chat application module for interactive conversations with the gateway.
//!
//! This module provides the REPL glue built on top of the parley client
//! library:
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`commands`]: slash command parsing
//! - [`session`]: the session facade the REPL drives

mod commands;
mod config;
mod session;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig};
pub use session::ChatSession;
