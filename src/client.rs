//! HTTP client for the chat gateway.
//!
//! [`Parley`] owns the base URL, the reqwest client, and the shared
//! [`SessionContext`]. It exchanges a signed credential for a session on
//! `/connect`, extends the session on `/keepalive`, streams responses from
//! `/stream` (or any command path), and issues the plain command endpoints.
//! Every authenticated call carries the session as the `X-Session-Token`
//! header; the credential itself travels only once, as the Bearer proof on
//! `/connect`.

use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::context::SessionContext;
use crate::credential::Credential;
use crate::error::{Error, Result};
use crate::observability::{
    CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, STREAM_DURATION,
};
use crate::render::Renderer;
use crate::sse::{self, Decoded};

const DEFAULT_BASE_URL: &str = "http://localhost:8000/";

/// Header carrying the session identifier on every authenticated call.
const SESSION_HEADER: &str = "x-session-token";

/// Timeout for the keep-alive ping. Deliberately short: a slow ping is as
/// useless as a failed one, and the loop retries on its next due tick.
const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for plain (non-streaming) command requests.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// An acquired session.
#[derive(Clone, Debug)]
pub struct Session {
    /// The opaque server-issued identifier.
    pub id: String,
    /// When the session was acquired.
    pub created_at: OffsetDateTime,
}

#[derive(Serialize)]
struct ConnectRequest<'a> {
    user: &'a str,
    persist_history: bool,
}

#[derive(Deserialize)]
struct ConnectResponse {
    session: String,
}

#[derive(Serialize)]
struct PromptRequest<'a> {
    prompt: &'a str,
}

#[derive(Deserialize)]
struct MessageResponse {
    message: String,
}

/// Client for the chat gateway.
#[derive(Clone)]
pub struct Parley {
    base_url: String,
    client: ReqwestClient,
    context: Arc<SessionContext>,
}

impl Parley {
    /// Create a new client.
    ///
    /// The base URL can be provided directly or read from the PARLEY_URL
    /// environment variable, defaulting to a local gateway.
    pub fn new(base_url: Option<String>) -> Result<Self> {
        let base_url = base_url
            .or_else(|| env::var("PARLEY_URL").ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        // Validate early so a typo fails at startup, not mid-conversation.
        url::Url::parse(&base_url)?;
        let base_url = if base_url.ends_with('/') {
            base_url
        } else {
            format!("{base_url}/")
        };

        // No global timeout: a streaming response may run indefinitely while
        // tokens are produced. Short-lived calls set per-request timeouts.
        let client = ReqwestClient::builder().build().map_err(|e| {
            Error::http_client(
                format!("Failed to build HTTP client: {e}"),
                Some(Box::new(e)),
            )
        })?;

        Ok(Self {
            base_url,
            client,
            context: Arc::new(SessionContext::new()),
        })
    }

    /// Returns the shared session context.
    pub fn context(&self) -> &Arc<SessionContext> {
        &self.context
    }

    /// Returns the configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Create and return default headers for requests.
    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    /// Headers for authenticated calls: defaults plus the session header.
    fn session_headers(&self) -> Result<HeaderMap> {
        let mut headers = self.default_headers();
        let session = self.context.session()?;
        headers.insert(
            SESSION_HEADER,
            HeaderValue::from_str(session)
                .map_err(|e| Error::session(format!("session id not header-safe: {e}")))?,
        );
        Ok(headers)
    }

    fn map_send_error(e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(format!("Request timed out: {e}"), None)
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
        }
    }

    /// Read a non-success response's full body and surface it verbatim.
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();
        match response.text().await {
            Ok(body) => Error::api(status_code, body),
            Err(e) => Error::http_client(
                format!("Failed to read error response: {e}"),
                Some(Box::new(e)),
            ),
        }
    }

    /// Exchange a signed credential for a session.
    ///
    /// `persist_history` asks the server to keep the conversation history
    /// on its side. Any rejection or network failure here is fatal: there is
    /// no credential retry and no re-authentication path mid-session.
    pub async fn connect(
        &self,
        credential: &Credential,
        persist_history: bool,
    ) -> Result<Session> {
        let token = credential.mint_token()?;
        let body = ConnectRequest {
            user: credential.subject(),
            persist_history,
        };

        CLIENT_REQUESTS.click();
        let response = self
            .client
            .post(self.endpoint("connect"))
            .headers(self.default_headers())
            .bearer_auth(token)
            .json(&body)
            .timeout(COMMAND_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                CLIENT_REQUEST_ERRORS.click();
                Error::authentication(format!("connect failed: {e}"))
            })?;

        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::authentication(format!(
                "server rejected credential ({status}): {body}"
            )));
        }

        let connected: ConnectResponse = response.json().await.map_err(|e| {
            Error::authentication(format!("malformed connect response: {e}"))
        })?;
        self.context.set_session(connected.session.clone())?;
        self.context.touch();
        Ok(Session {
            id: connected.session,
            created_at: OffsetDateTime::now_utc(),
        })
    }

    /// Ping the server to extend the session lifetime.
    ///
    /// Uses a short timeout; failures are surfaced to the keep-alive loop,
    /// which logs and continues.
    pub async fn keepalive(&self) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint("keepalive"))
            .headers(self.session_headers()?)
            .timeout(KEEPALIVE_TIMEOUT)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }
        Ok(())
    }

    /// Issue a prompt to a command path and stream the response.
    ///
    /// A non-success status is surfaced with the full error body before any
    /// decoding. On success the event stream is decoded incrementally into
    /// `renderer`, the interaction clock advances, and the accumulated
    /// response is returned. `complete` is false when the connection closed
    /// before the completion sentinel.
    pub async fn stream_command(
        &self,
        path: &str,
        prompt: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<Decoded> {
        let mut headers = self.session_headers()?;
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );

        CLIENT_REQUESTS.click();
        let response = self
            .client
            .post(self.endpoint(path))
            .headers(headers)
            .json(&PromptRequest { prompt })
            .send()
            .await
            .map_err(|e| {
                CLIENT_REQUEST_ERRORS.click();
                Self::map_send_error(e)
            })?;

        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }

        let start = Instant::now();
        let frames = sse::process_frames(response.bytes_stream());
        let decoded = sse::decode(frames, renderer).await?;
        STREAM_DURATION.add(start.elapsed().as_secs_f64());

        self.context.touch();
        Ok(decoded)
    }

    /// POST a prompt to a plain (non-streaming) endpoint and return the raw
    /// response body.
    async fn post_command(&self, path: &str, prompt: &str) -> Result<String> {
        CLIENT_REQUESTS.click();
        let response = self
            .client
            .post(self.endpoint(path))
            .headers(self.session_headers()?)
            .json(&PromptRequest { prompt })
            .timeout(COMMAND_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                CLIENT_REQUEST_ERRORS.click();
                Self::map_send_error(e)
            })?;

        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }

        let body = response.text().await.map_err(|e| {
            Error::http_client(format!("Failed to read response: {e}"), Some(Box::new(e)))
        })?;
        self.context.touch();
        Ok(body)
    }

    /// Ask the server which file extensions `/upload` accepts.
    ///
    /// The gateway answers this as a plain command on `/chat` with a
    /// comma-separated body rather than an event stream.
    pub async fn supported_filetypes(&self) -> Result<Vec<String>> {
        let body = self.post_command("chat", "/getfiletypes").await?;
        Ok(body
            .trim()
            .split(',')
            .map(|ext| ext.trim().to_string())
            .filter(|ext| !ext.is_empty())
            .collect())
    }

    /// Register a file with the server for use as conversation context.
    pub async fn upload(&self, path: &str) -> Result<()> {
        self.post_command("upload", path).await?;
        Ok(())
    }

    /// Set a standing instruction; returns the server's confirmation.
    pub async fn instruct(&self, instruction: &str) -> Result<String> {
        let body = self.post_command("instruct", instruction).await?;
        let parsed: MessageResponse = serde_json::from_str(&body)?;
        Ok(parsed.message)
    }

    /// Ask the server to dump the session state; returns its confirmation.
    pub async fn session_dump(&self) -> Result<String> {
        self.session_op("session/dump").await
    }

    /// Ask the server to restore session state; returns its confirmation.
    pub async fn session_restore(&self) -> Result<String> {
        self.session_op("session/restore").await
    }

    /// Ask the server to merge session state; returns its confirmation.
    pub async fn session_merge(&self) -> Result<String> {
        self.session_op("session/merge").await
    }

    async fn session_op(&self, path: &str) -> Result<String> {
        let body = self.post_command(path, "").await?;
        let parsed: MessageResponse = serde_json::from_str(&body)?;
        Ok(parsed.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation_defaults() {
        let client = Parley::new(Some("http://example.com:9000".to_string())).unwrap();
        assert_eq!(client.base_url(), "http://example.com:9000/");
        assert!(!client.context().has_session());
    }

    #[test]
    fn client_rejects_bad_url() {
        assert!(Parley::new(Some("not a url".to_string())).is_err());
    }

    #[test]
    fn endpoint_joins_paths() {
        let client = Parley::new(Some("http://localhost:8000".to_string())).unwrap();
        assert_eq!(client.endpoint("/stream"), "http://localhost:8000/stream");
        assert_eq!(client.endpoint("stream"), "http://localhost:8000/stream");
        assert_eq!(
            client.endpoint("session/dump"),
            "http://localhost:8000/session/dump"
        );
    }

    #[test]
    fn session_headers_require_connect() {
        let client = Parley::new(Some("http://localhost:8000".to_string())).unwrap();
        assert!(client.session_headers().is_err());

        client
            .context()
            .set_session("sess-1".to_string())
            .unwrap();
        let headers = client.session_headers().unwrap();
        assert_eq!(headers.get(SESSION_HEADER).unwrap(), "sess-1");
    }

    #[test]
    fn connect_response_parses() {
        let parsed: ConnectResponse =
            serde_json::from_str("{\"session\": \"abc\"}").unwrap();
        assert_eq!(parsed.session, "abc");
    }
}
