// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cross-origin policy.
//!
//! Credentials are allowed, so origins are echoed back only when they are on
//! the allow-list, are a single-label subdomain of `topcoder.com` /
//! `topcoder-dev.com` over HTTPS, or (development mode only) a localhost
//! origin.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE, ORIGIN},
    HeaderName, HeaderValue, Method,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Origins always accepted.
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "https://accounts.topcoder.com",
    "https://accounts-auth0.topcoder.com",
    "https://accounts.topcoder-dev.com",
    "https://accounts-auth0.topcoder-dev.com",
    "https://www.topcoder.com",
    "https://www.topcoder-dev.com",
    "https://topcoder.com",
    "https://topcoder-dev.com",
    "https://local.topcoder-dev.com",
];

const PARENT_DOMAINS: &[&str] = &[".topcoder.com", ".topcoder-dev.com"];

/// Origin allow-list evaluated for every cross-origin request.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed: Vec<String>,
    development: bool,
}

impl OriginPolicy {
    pub fn new(extra_origins: &[String], development: bool) -> Self {
        let allowed = DEFAULT_ALLOWED_ORIGINS
            .iter()
            .map(|o| o.to_string())
            .chain(extra_origins.iter().cloned())
            .collect();
        Self {
            allowed,
            development,
        }
    }

    pub fn allows(&self, origin: &str) -> bool {
        self.allowed.iter().any(|o| o == origin)
            || is_platform_subdomain(origin)
            || (self.development && is_localhost(origin))
    }
}

/// `https://<label>.topcoder.com` or `https://<label>.topcoder-dev.com`
/// where `label` is alphanumeric with inner hyphens.
fn is_platform_subdomain(origin: &str) -> bool {
    let Some(host) = origin.strip_prefix("https://") else {
        return false;
    };
    PARENT_DOMAINS.iter().any(|parent| {
        host.strip_suffix(parent).is_some_and(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
        })
    })
}

fn is_localhost(origin: &str) -> bool {
    ["http://localhost", "http://127.0.0.1"].iter().any(|base| {
        origin.strip_prefix(base).is_some_and(|rest| {
            rest.is_empty()
                || rest
                    .strip_prefix(':')
                    .is_some_and(|port| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()))
        })
    })
}

/// Build the CORS layer for `policy`.
pub fn cors_layer(policy: OriginPolicy) -> CorsLayer {
    let policy = Arc::new(policy);
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            origin.to_str().is_ok_and(|o| policy.allows(o))
        }))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::HEAD,
        ])
        .allow_headers([
            ORIGIN,
            CONTENT_TYPE,
            ACCEPT,
            AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
            CACHE_CONTROL,
        ])
        .expose_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
        .max_age(Duration::from_secs(86_400))
}
