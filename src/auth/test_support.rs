// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token and key set fixtures shared by the auth tests.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};

pub const PRIVATE_KEY_PEM: &str = include_str!("testdata/rsa_private.pem");
pub const PUBLIC_JWK: &str = include_str!("testdata/rsa_public.jwk.json");

pub const NS: &str = "https://topcoder.com/claims/";

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Key set document holding the test public key under `kid`.
pub fn key_set(kid: &str) -> Value {
    let mut jwk: Value = serde_json::from_str(PUBLIC_JWK).unwrap();
    jwk["kid"] = json!(kid);
    json!({ "keys": [jwk] })
}

/// RS256 token signed with the test private key.
pub fn sign_rs256(kid: Option<&str>, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    let key = EncodingKey::from_rsa_pem(PRIVATE_KEY_PEM.as_bytes()).unwrap();
    encode(&header, claims, &key).unwrap()
}

/// HS256 token signed with `secret`.
pub fn sign_hs256(secret: &str, claims: &Value) -> String {
    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::new(Algorithm::HS256), claims, &key).unwrap()
}

/// Token with an arbitrary header and a junk signature.
pub fn unsigned(header: &Value, claims: &Value) -> String {
    format!(
        "{}.{}.c2lnbmF0dXJl",
        URL_SAFE_NO_PAD.encode(header.to_string()),
        URL_SAFE_NO_PAD.encode(claims.to_string())
    )
}

pub fn legacy_claims(handle: &str, user_id: &str, exp: i64) -> Value {
    json!({ "handle": handle, "userId": user_id, "exp": exp })
}

pub fn namespaced_claims(handle: &str, roles: &[&str], exp: i64) -> Value {
    json!({
        format!("{NS}handle"): handle,
        format!("{NS}roles"): roles,
        "sub": format!("auth0|{handle}"),
        "exp": exp,
    })
}
