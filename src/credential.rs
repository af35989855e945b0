//! Local credential loading and connect-token minting.
//!
//! The credential names a user and an Ed25519 signing key kept on disk. At
//! startup the pair is turned into a [`Credential`], which mints a
//! short-lived signed token presented exactly once, as the Bearer proof on
//! `/connect`. Credentials are never persisted and are regenerated on every
//! process start.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ed25519_dalek::pkcs8::DecodePrivateKey;
use ed25519_dalek::{Signer, SigningKey};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{Error, Result};

/// How long a minted token remains valid.
const TOKEN_LIFETIME_SECS: i64 = 15 * 60;

/// Environment variable overriding the credential config path.
const CREDENTIALS_ENV: &str = "PARLEY_CREDENTIALS";

/// On-disk credential configuration.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CredentialConfig {
    /// User identity presented as the token subject.
    pub user: String,
    /// Path to a PKCS#8 PEM-encoded Ed25519 private key.
    pub key_file: PathBuf,
}

impl CredentialConfig {
    /// Loads the configuration from the given path, or from the default
    /// location (`$PARLEY_CREDENTIALS`, falling back to
    /// `~/.config/parley/credentials.yaml`) when no path is provided.
    ///
    /// A missing or malformed file is a fatal startup condition.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };
        let contents = fs::read_to_string(&path).map_err(|err| {
            Error::config(
                format!("cannot read credentials file {}", path.display()),
                Some(Box::new(err)),
            )
        })?;
        serde_yaml::from_str(&contents).map_err(|err| {
            Error::config(
                format!("malformed credentials file {}", path.display()),
                Some(Box::new(err)),
            )
        })
    }

    fn default_path() -> Result<PathBuf> {
        if let Ok(path) = env::var(CREDENTIALS_ENV) {
            return Ok(PathBuf::from(path));
        }
        let mut path = dirs::config_dir()
            .ok_or_else(|| Error::config("cannot determine config directory", None))?;
        path.push("parley");
        path.push("credentials.yaml");
        Ok(path)
    }
}

/// A loaded credential: subject identity plus signing key material.
///
/// Immutable once created and held only in memory.
pub struct Credential {
    subject: String,
    signing_key: SigningKey,
    issued_at: OffsetDateTime,
    expires_at: OffsetDateTime,
}

/// The signed portion of a minted token.
#[derive(Deserialize, Serialize)]
struct TokenClaims {
    sub: String,
    iat: i64,
    exp: i64,
}

impl Credential {
    /// Reads the signing key named by the configuration and stamps the
    /// validity window.
    pub fn load(config: &CredentialConfig) -> Result<Self> {
        let pem = fs::read_to_string(&config.key_file).map_err(|err| {
            Error::config(
                format!("cannot read key file {}", config.key_file.display()),
                Some(Box::new(err)),
            )
        })?;
        let signing_key = SigningKey::from_pkcs8_pem(&pem)
            .map_err(|err| Error::signing(format!("invalid Ed25519 key: {err}")))?;
        Ok(Self::from_parts(config.user.clone(), signing_key))
    }

    /// Builds a credential directly from a subject and key.
    pub fn from_parts(subject: String, signing_key: SigningKey) -> Self {
        let issued_at = OffsetDateTime::now_utc();
        let expires_at = issued_at + time::Duration::seconds(TOKEN_LIFETIME_SECS);
        Self {
            subject,
            signing_key,
            issued_at,
            expires_at,
        }
    }

    /// Returns the subject identity.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Returns when this credential was created.
    pub fn issued_at(&self) -> OffsetDateTime {
        self.issued_at
    }

    /// Returns when tokens minted from this credential expire.
    pub fn expires_at(&self) -> OffsetDateTime {
        self.expires_at
    }

    /// Mints the compact signed token presented on `/connect`.
    ///
    /// Format: `b64url(claims JSON) "." b64url(signature over those bytes)`.
    pub fn mint_token(&self) -> Result<String> {
        let claims = TokenClaims {
            sub: self.subject.clone(),
            iat: self.issued_at.unix_timestamp(),
            exp: self.expires_at.unix_timestamp(),
        };
        let payload = serde_json::to_vec(&claims)?;
        let signature = self.signing_key.sign(&payload);
        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier};

    fn test_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    #[test]
    fn minted_token_verifies() {
        let credential = Credential::from_parts("alice".to_string(), test_key());
        let token = credential.mint_token().unwrap();

        let (payload_b64, sig_b64) = token.split_once('.').unwrap();
        let payload = URL_SAFE_NO_PAD.decode(payload_b64).unwrap();
        let sig_bytes = URL_SAFE_NO_PAD.decode(sig_b64).unwrap();
        let signature = Signature::from_slice(&sig_bytes).unwrap();

        let verifying_key = test_key().verifying_key();
        verifying_key.verify(&payload, &signature).unwrap();

        let claims: TokenClaims = serde_json::from_slice(&payload).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.exp - claims.iat, TOKEN_LIFETIME_SECS);
    }

    #[test]
    fn expiry_window_is_bounded() {
        let credential = Credential::from_parts("bob".to_string(), test_key());
        let window = credential.expires_at() - credential.issued_at();
        assert_eq!(window.whole_seconds(), TOKEN_LIFETIME_SECS);
    }

    #[test]
    fn config_parses_yaml() {
        let config: CredentialConfig =
            serde_yaml::from_str("user: carol\nkey_file: /home/carol/.keys/parley.pem\n").unwrap();
        assert_eq!(config.user, "carol");
        assert_eq!(
            config.key_file,
            PathBuf::from("/home/carol/.keys/parley.pem")
        );
    }

    #[test]
    fn missing_config_is_fatal() {
        let err = CredentialConfig::load(Some(Path::new("/nonexistent/credentials.yaml")))
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
