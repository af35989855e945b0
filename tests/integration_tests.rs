//! Integration tests for the parley client.
//! These tests require a running gateway and credentials in the environment.

#[cfg(test)]
mod tests {
    use parley::chat::ChatSession;
    use parley::{Credential, CredentialConfig, Parley, Renderer};

    struct CollectRenderer {
        updates: Vec<String>,
    }

    impl Renderer for CollectRenderer {
        fn update(&mut self, markdown: &str) {
            self.updates.push(markdown.to_string());
        }

        fn finish_response(&mut self) {}

        fn print_info(&mut self, _: &str) {}

        fn print_error(&mut self, error: &str) {
            eprintln!("renderer error: {error}");
        }
    }

    async fn connected_client() -> Option<Parley> {
        // These tests require PARLEY_URL and PARLEY_CREDENTIALS to be set.
        if std::env::var("PARLEY_URL").is_err() || std::env::var("PARLEY_CREDENTIALS").is_err() {
            eprintln!("Skipping test: PARLEY_URL or PARLEY_CREDENTIALS not set");
            return None;
        }
        let config = CredentialConfig::load(None).expect("credentials config should load");
        let credential = Credential::load(&config).expect("credential should load");
        let client = Parley::new(None).expect("client should build");
        client
            .connect(&credential, false)
            .await
            .expect("connect should succeed with valid credentials");
        Some(client)
    }

    #[tokio::test]
    async fn test_connect_and_keepalive() {
        let Some(client) = connected_client().await else {
            return;
        };
        assert!(client.context().has_session());
        client
            .keepalive()
            .await
            .expect("keepalive should succeed on a fresh session");
    }

    #[tokio::test]
    async fn test_streaming_prompt() {
        let Some(client) = connected_client().await else {
            return;
        };
        let session = ChatSession::new(client);

        let mut renderer = CollectRenderer {
            updates: Vec::new(),
        };
        let decoded = session
            .send_prompt("Say 'test passed'", &mut renderer)
            .await
            .expect("streaming request should succeed");

        assert!(!decoded.text.is_empty(), "expected some streamed text");
        // Every update is a growing prefix of the final accumulation.
        for pair in renderer.updates.windows(2) {
            assert!(pair[1].starts_with(pair[0].as_str()));
        }
        assert_eq!(renderer.updates.last().map(String::as_str), Some(decoded.text.as_str()));
    }
}
