// Public modules
pub mod chat;
pub mod client;
pub mod context;
pub mod credential;
pub mod error;
pub mod keepalive;
pub mod observability;
pub mod render;
pub mod sse;

// Re-exports
pub use client::{Parley, Session};
pub use context::SessionContext;
pub use credential::{Credential, CredentialConfig};
pub use error::{Error, Result};
pub use render::{PlainTextRenderer, Renderer};
pub use sse::{Decoded, Frame};
