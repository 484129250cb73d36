//! # bc-auth-simple
//!
//! Argon2-based implementation of `CredentialProvider`.
//! Handles password hashing and opaque session tokens. Only a peppered
//! SHA-256 digest of a token is ever stored.

use anyhow::anyhow;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use base64::Engine;
use bc_core::traits::CredentialProvider;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

const TOKEN_BYTES: usize = 32;
const SALT_BYTES: usize = 16;

pub struct SimpleCredentialProvider {
    /// Server-side secret mixed into every token digest
    pepper: SecretString,
}

impl SimpleCredentialProvider {
    pub fn new(pepper: SecretString) -> Self {
        Self { pepper }
    }
}

fn random_bytes<const N: usize>() -> anyhow::Result<[u8; N]> {
    let mut buf = [0u8; N];
    getrandom::getrandom(&mut buf).map_err(|e| anyhow!("os rng unavailable: {e}"))?;
    Ok(buf)
}

#[async_trait]
impl CredentialProvider for SimpleCredentialProvider {
    fn hash_password(&self, password: &str) -> anyhow::Result<String> {
        let salt = SaltString::encode_b64(&random_bytes::<SALT_BYTES>()?)
            .map_err(|e| anyhow!("salt encoding failed: {e}"))?;
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow!("password hashing failed: {e}"))?;
        Ok(hash.to_string())
    }

    /// Verifies if a provided password matches a stored Argon2 hash.
    async fn verify_password(&self, password: &str, hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(p) => p,
            Err(_) => return false,
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    fn issue_token(&self) -> anyhow::Result<String> {
        let bytes = random_bytes::<TOKEN_BYTES>()?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn token_digest(&self, token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.pepper.expose_secret().as_bytes());
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(pepper: &str) -> SimpleCredentialProvider {
        SimpleCredentialProvider::new(SecretString::new(pepper.into()))
    }

    #[tokio::test]
    async fn test_password_round_trip() {
        let auth = provider("pepper");
        let hash = auth.hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(auth.verify_password("correct horse", &hash).await);
        assert!(!auth.verify_password("wrong horse", &hash).await);
        assert!(!auth.verify_password("correct horse", "not-a-hash").await);
    }

    #[test]
    fn test_tokens_are_unique_and_url_safe() {
        let auth = provider("pepper");
        let a = auth.issue_token().unwrap();
        let b = auth.issue_token().unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_digest_depends_on_pepper() {
        let token = "token";
        let first = provider("one").token_digest(token);
        assert_eq!(first, provider("one").token_digest(token));
        assert_ne!(first, provider("two").token_digest(token));
        assert_eq!(first.len(), 64);
    }
}
