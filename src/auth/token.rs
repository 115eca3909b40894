// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Structural decoding of compact tokens.
//!
//! Nothing here is trusted: the decoder only splits `header.payload.signature`,
//! base64url-decodes the first two segments and parses them as JSON objects.
//! Signature checks happen in [`super::validator`].

use base64ct::{Base64UrlUnpadded, Encoding};
use serde_json::{Map, Value};

use super::error::AuthError;

/// Prefix accepted (and stripped) in front of a token.
pub const BEARER_PREFIX: &str = "Bearer ";

/// JSON object of a token header or payload.
pub type ClaimMap = Map<String, Value>;

/// A compact token split into its parts. Contents are unverified.
#[derive(Debug, Clone)]
pub struct DecodedToken {
    compact: String,
    header: ClaimMap,
    claims: ClaimMap,
}

impl DecodedToken {
    /// Parse a compact token, tolerating a leading `Bearer ` prefix.
    pub fn parse(token: &str) -> Result<Self, AuthError> {
        let token = token.trim();
        let token = token.strip_prefix(BEARER_PREFIX).unwrap_or(token).trim();

        let mut segments = token.split('.');
        let (Some(header), Some(payload), Some(_), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(AuthError::Malformed);
        };

        Ok(Self {
            header: decode_segment(header)?,
            claims: decode_segment(payload)?,
            compact: token.to_string(),
        })
    }

    /// The token without any `Bearer ` prefix.
    pub fn compact(&self) -> &str {
        &self.compact
    }

    pub fn claims(&self) -> &ClaimMap {
        &self.claims
    }

    /// Declared `alg` header.
    pub fn algorithm(&self) -> Option<&str> {
        self.header.get("alg").and_then(Value::as_str)
    }

    /// Declared `kid` header.
    pub fn key_id(&self) -> Option<&str> {
        self.header.get("kid").and_then(Value::as_str)
    }
}

fn decode_segment(segment: &str) -> Result<ClaimMap, AuthError> {
    // Some issuers pad their segments; the alphabet check stays strict.
    let segment = segment.trim_end_matches('=');
    let bytes = Base64UrlUnpadded::decode_vec(segment).map_err(|_| AuthError::Malformed)?;
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(AuthError::Malformed),
    }
}
