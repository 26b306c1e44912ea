// Token generation and the one-way digests the session store keeps instead of raw secrets.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

// Domain separation so an access token digest can never collide with a refresh token digest.
const ACCESS_DOMAIN: &[u8] = b"SGACCESS";
const REFRESH_DOMAIN: &[u8] = b"SGREFRESH";

/// Which kind of secret a token is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    fn domain(self) -> &'static [u8] {
        match self {
            TokenKind::Access => ACCESS_DOMAIN,
            TokenKind::Refresh => REFRESH_DOMAIN,
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            TokenKind::Access => "sga_",
            TokenKind::Refresh => "sgr_",
        }
    }
}

/// Generates a fresh opaque token: kind prefix + 32 random bytes, base64url.
pub fn new_token(kind: TokenKind) -> String {
    let mut buf = [0u8; 32];
    OsRng.fill_bytes(&mut buf);
    format!("{}{}", kind.prefix(), URL_SAFE_NO_PAD.encode(buf))
}

/// Hex SHA-256 digest of a token, as stored in the session table.
pub fn hash_token(kind: TokenKind, token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kind.domain());
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Argon2id PHC string for a password.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

/// Checks `password` against a stored PHC string. A malformed hash is an error, a mismatch is `false`.
pub fn verify_password(password: &str, phc: &str) -> anyhow::Result<bool> {
    let parsed =
        PasswordHash::new(phc).map_err(|e| anyhow::anyhow!("stored password hash is invalid: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_prefixed_and_unique() {
        let a = new_token(TokenKind::Access);
        let b = new_token(TokenKind::Access);
        assert!(a.starts_with("sga_"));
        assert!(new_token(TokenKind::Refresh).starts_with("sgr_"));
        assert_ne!(a, b);
    }

    #[test]
    fn digest_depends_on_kind() {
        let t = "same-secret";
        assert_ne!(hash_token(TokenKind::Access, t), hash_token(TokenKind::Refresh, t));
        assert_eq!(hash_token(TokenKind::Access, t), hash_token(TokenKind::Access, t));
        assert_eq!(hash_token(TokenKind::Access, t).len(), 64);
    }

    #[test]
    fn password_roundtrip() {
        let phc = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &phc).unwrap());
        assert!(!verify_password("battery staple", &phc).unwrap());
    }

    #[test]
    fn malformed_phc_is_an_error() {
        assert!(verify_password("x", "not-a-phc-string").is_err());
    }
}
