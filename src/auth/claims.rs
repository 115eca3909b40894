// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity record and claim schema reconciliation.
//!
//! Two claim layouts are in circulation:
//!
//! - **Legacy** (HS256-era): flat `handle`, `userId`, `email`, `roles` claims.
//! - **Namespaced** (v3, RS256): the same fields prefixed with a URI-like
//!   namespace, e.g. `https://topcoder.com/claims/handle`.
//!
//! The presence of `<namespace>handle` decides which layout a token uses.

use std::collections::BTreeSet;
use std::fmt;

use serde_json::Value;

use super::token::ClaimMap;

/// Which claim layout a token used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClaimSchema {
    Legacy,
    Namespaced,
}

impl ClaimSchema {
    /// Whether this is the current (v3) layout.
    pub fn is_v3(self) -> bool {
        self == ClaimSchema::Namespaced
    }
}

/// Identity extracted from a validated token.
///
/// Built once per request and never persisted. `Debug` redacts the email.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenInfo {
    handle: Option<String>,
    user_id: Option<String>,
    email: Option<String>,
    roles: BTreeSet<String>,
    expiration_time: i64,
    schema: ClaimSchema,
}

impl TokenInfo {
    /// Empty identity of the given schema; fill with the `with_*` methods.
    pub fn new(schema: ClaimSchema) -> Self {
        Self {
            handle: None,
            user_id: None,
            email: None,
            roles: BTreeSet::new(),
            expiration_time: 0,
            schema,
        }
    }

    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.handle = Some(handle.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_expiration_time(mut self, expiration_time: i64) -> Self {
        self.expiration_time = expiration_time;
        self
    }

    pub fn handle(&self) -> Option<&str> {
        self.handle.as_deref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Email address. Do not log.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    /// `exp` in seconds since the epoch; 0 when the token had none.
    pub fn expiration_time(&self) -> i64 {
        self.expiration_time
    }

    pub fn schema(&self) -> ClaimSchema {
        self.schema
    }

    /// Case-insensitive role check.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    /// Whether the token is expired at `now`, treating it as expired
    /// `offset_secs` early. A token without `exp` never expires.
    pub fn is_expired(&self, now: i64, offset_secs: i64) -> bool {
        self.expiration_time != 0 && now >= self.expiration_time - offset_secs
    }
}

impl fmt::Debug for TokenInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenInfo")
            .field("handle", &self.handle)
            .field("user_id", &self.user_id)
            .field("email", &self.email.as_ref().map(|_| "[REDACTED]"))
            .field("roles", &self.roles)
            .field("expiration_time", &self.expiration_time)
            .field("schema", &self.schema)
            .finish()
    }
}

/// Maps either claim layout onto a [`TokenInfo`].
#[derive(Debug, Clone)]
pub struct ClaimNormalizer {
    namespace: String,
}

impl ClaimNormalizer {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// Build the identity record from verified (or dev-mode decoded) claims.
    pub fn normalize(&self, claims: &ClaimMap) -> TokenInfo {
        let ns = |name: &str| format!("{}{}", self.namespace, name);
        let handle_key = ns("handle");

        let (schema, handle, user_id, email, roles) = if claims.contains_key(&handle_key) {
            (
                ClaimSchema::Namespaced,
                string_claim(claims, &handle_key),
                string_claim(claims, &ns("userId")).or_else(|| string_claim(claims, "sub")),
                string_claim(claims, &ns("email")).or_else(|| string_claim(claims, "email")),
                role_claim(claims, &ns("roles")),
            )
        } else {
            (
                ClaimSchema::Legacy,
                string_claim(claims, "handle"),
                string_claim(claims, "userId").or_else(|| string_claim(claims, "sub")),
                string_claim(claims, "email"),
                role_claim(claims, "roles"),
            )
        };

        TokenInfo {
            handle,
            user_id,
            email,
            roles,
            expiration_time: expiration_claim(claims),
            schema,
        }
    }
}

/// String claim; numbers are rendered as strings, anything else is absent.
fn string_claim(claims: &ClaimMap, key: &str) -> Option<String> {
    match claims.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Role claim as a set: a list keeps its string entries, a scalar string
/// becomes a one-element set, any other shape yields an empty set.
fn role_claim(claims: &ClaimMap, key: &str) -> BTreeSet<String> {
    match claims.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(role)) => BTreeSet::from([role.clone()]),
        _ => BTreeSet::new(),
    }
}

/// `exp` in whole seconds, 0 when absent or not a number.
fn expiration_claim(claims: &ClaimMap) -> i64 {
    numeric_claim(claims, "exp").unwrap_or(0)
}

pub(crate) fn numeric_claim(claims: &ClaimMap, key: &str) -> Option<i64> {
    let value = claims.get(key)?;
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
}
