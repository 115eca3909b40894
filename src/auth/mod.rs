// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer token authentication for the arena API.
//!
//! ## Auth Flow
//!
//! 1. Clients send `Authorization: Bearer <token>`, or the `v3jwt` / `tcjwt`
//!    cookie set by the identity provider
//! 2. [`middleware::authenticate`]:
//!    - Decodes the token structure ([`token`])
//!    - Verifies it by algorithm ([`validator`]):
//!      - `RS256` against keys fetched from the key set endpoint ([`keys`])
//!      - `HS256` against the shared secret
//!    - Maps either claim layout onto a [`TokenInfo`] ([`claims`])
//!    - Attaches the identity to the request extensions
//! 3. [`roles::authorize`] enforces per-route role requirements
//! 4. Handlers read the identity with [`CurrentUser`] / [`OptionalUser`]
//!
//! ## Security
//!
//! - Clients never learn which check rejected a token
//! - Clock skew tolerance defaults to 60 seconds
//! - Unverified HS256 tokens are only accepted in development mode
//! - Token values, raw claims and emails are never logged

pub mod claims;
pub mod error;
pub mod extractor;
pub mod keys;
pub mod middleware;
pub mod roles;
pub mod token;
pub mod validator;

#[cfg(test)]
pub(crate) mod test_support;

pub use claims::{ClaimNormalizer, ClaimSchema, TokenInfo};
pub use error::AuthError;
pub use extractor::{CurrentUser, OptionalUser};
pub use keys::KeyCache;
pub use middleware::{authenticate, Authenticator};
pub use roles::{authorize, RoleRequirement};
pub use validator::TokenValidator;
