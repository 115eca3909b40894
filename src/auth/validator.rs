// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signature and time checks for both token formats.
//!
//! | `alg`   | Verification                                            |
//! |---------|---------------------------------------------------------|
//! | `RS256` | Public key from [`KeyCache`] selected by the `kid` header |
//! | `HS256` | Configured shared secret                                |
//! | other   | Rejected before any key lookup                          |
//!
//! Without a shared secret, HS256 tokens are accepted unverified only in
//! development mode. In production they are rejected.

use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};

use super::claims::{numeric_claim, ClaimNormalizer, TokenInfo};
use super::error::AuthError;
use super::keys::{truncate, KeyCache};
use super::token::{ClaimMap, DecodedToken};
use crate::config::AuthConfig;

/// Verifies tokens and turns their claims into a [`TokenInfo`].
#[derive(Clone)]
pub struct TokenValidator {
    keys: KeyCache,
    hs256_key: Option<DecodingKey>,
    allow_unverified_hs256: bool,
    leeway_secs: u64,
    normalizer: ClaimNormalizer,
}

impl TokenValidator {
    pub fn new(config: &AuthConfig, keys: KeyCache) -> Self {
        let hs256_key = config
            .hs256_secret
            .as_deref()
            .map(|secret| DecodingKey::from_secret(secret.as_bytes()));
        let allow_unverified_hs256 = hs256_key.is_none() && config.development;

        if allow_unverified_hs256 {
            tracing::warn!(
                "no HS256 secret configured: HS256 tokens are accepted WITHOUT signature verification (development mode)"
            );
        } else if hs256_key.is_none() {
            tracing::info!("no HS256 secret configured: HS256 tokens will be rejected");
        }

        Self {
            keys,
            hs256_key,
            allow_unverified_hs256,
            leeway_secs: config.leeway_secs,
            normalizer: ClaimNormalizer::new(config.claims_namespace.clone()),
        }
    }

    pub fn keys(&self) -> &KeyCache {
        &self.keys
    }

    /// Validate a token, reporting why it was rejected.
    pub async fn validate(&self, token: &str) -> Result<TokenInfo, AuthError> {
        let decoded = DecodedToken::parse(token)?;

        let claims = match decoded.algorithm() {
            Some("RS256") => self.verify_rs256(&decoded).await?,
            Some("HS256") => match &self.hs256_key {
                Some(key) => self.verify_with(&decoded, key, Algorithm::HS256)?,
                None if self.allow_unverified_hs256 => return self.accept_unverified(&decoded),
                None => return Err(AuthError::SignatureInvalid),
            },
            Some(other) => return Err(AuthError::UnsupportedAlgorithm(truncate(other))),
            None => return Err(AuthError::UnsupportedAlgorithm("none".to_string())),
        };

        Ok(self.normalizer.normalize(&claims))
    }

    /// Validate a possibly-absent token. Every failure yields `None`.
    pub async fn validate_token(&self, token: Option<&str>) -> Option<TokenInfo> {
        let token = token?;
        match self.validate(token).await {
            Ok(info) => Some(info),
            Err(e) => {
                tracing::debug!(reason = e.reason(), detail = %e, "token rejected");
                None
            }
        }
    }

    async fn verify_rs256(&self, token: &DecodedToken) -> Result<ClaimMap, AuthError> {
        let kid = token
            .key_id()
            .ok_or_else(|| AuthError::KeyUnavailable("RS256 token has no key id".to_string()))?;
        let key = self.keys.get(kid).await?;
        self.verify_with(token, &key, Algorithm::RS256)
    }

    fn verify_with(
        &self,
        token: &DecodedToken,
        key: &DecodingKey,
        algorithm: Algorithm,
    ) -> Result<ClaimMap, AuthError> {
        let mut validation = Validation::new(algorithm);
        validation.leeway = self.leeway_secs;
        validation.validate_nbf = true;
        validation.validate_aud = false;
        // Tokens without `exp` are accepted.
        validation.required_spec_claims.clear();

        decode::<ClaimMap>(token.compact(), key, &validation)
            .map(|data| data.claims)
            .map_err(|e| map_jwt_error(e.kind()))
    }

    /// Development-mode HS256 without a secret: claims are trusted as-is,
    /// but `exp` and `nbf` still apply.
    fn accept_unverified(&self, token: &DecodedToken) -> Result<TokenInfo, AuthError> {
        tracing::debug!("accepting unverified HS256 token (development mode)");
        let now = chrono::Utc::now().timestamp();
        let leeway = self.leeway_secs as i64;

        if numeric_claim(token.claims(), "nbf").is_some_and(|nbf| nbf > now + leeway) {
            return Err(AuthError::Expired);
        }

        let info = self.normalizer.normalize(token.claims());
        // Expired once `exp + leeway` has passed.
        if info.is_expired(now, -leeway) {
            return Err(AuthError::Expired);
        }
        Ok(info)
    }
}

fn map_jwt_error(kind: &ErrorKind) -> AuthError {
    match kind {
        ErrorKind::ExpiredSignature | ErrorKind::ImmatureSignature => AuthError::Expired,
        ErrorKind::InvalidSignature => AuthError::SignatureInvalid,
        ErrorKind::InvalidAlgorithm | ErrorKind::MissingAlgorithm => {
            AuthError::UnsupportedAlgorithm("algorithm mismatch".to_string())
        }
        ErrorKind::InvalidToken
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_) => AuthError::Malformed,
        ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidKeyFormat => {
            AuthError::KeyUnavailable("unusable key material".to_string())
        }
        _ => AuthError::SignatureInvalid,
    }
}
