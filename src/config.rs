// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup into an
//! immutable [`AppConfig`], which is then shared through `AppState`.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `ENVIRONMENT` | `development`/`dev` enables development mode | `production` |
//! | `AUTH_HS256_SECRET` | Shared secret for legacy HS256 tokens | unset |
//! | `TC_AUTH_SECRET` | Older name of `AUTH_HS256_SECRET`, read when it is unset | unset |
//! | `AUTH_JWKS_URL` | Key set endpoint for RS256 tokens | Topcoder Auth0 JWKS |
//! | `AUTH_CLAIMS_NAMESPACE` | Prefix of namespaced claims | `https://topcoder.com/claims/` |
//! | `AUTH_TOKEN_LEEWAY_SECS` | Clock skew tolerance for `exp`/`nbf` | `60` |
//! | `AUTH_COOKIE_NAME` | Legacy token cookie | `tcjwt` |
//! | `AUTH_V3_COOKIE_NAME` | Current token cookie | `v3jwt` |
//! | `AUTH_ADMIN_ROLE` | Administrator role name | `administrator` |
//! | `AUTH_MEMBER_ROLE` | Member role name | `Topcoder User` |
//! | `JWKS_CACHE_TTL_SECS` | Lifetime of a cached key | `86400` |
//! | `JWKS_CACHE_MAX_KEYS` | Maximum cached keys | `10` |
//! | `JWKS_FETCH_LIMIT` | Upstream fetches allowed per window | `10` |
//! | `JWKS_FETCH_WINDOW_SECS` | Rate limit window | `60` |
//! | `JWKS_LOOKUP_TIMEOUT_MS` | Max time a request waits for a key | `5000` |
//! | `CORS_ALLOWED_ORIGINS` | Comma-separated allowed origins | empty |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::{env, str::FromStr, time::Duration};

use url::Url;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const ENVIRONMENT_ENV: &str = "ENVIRONMENT";
pub const HS256_SECRET_ENV: &str = "AUTH_HS256_SECRET";
pub const LEGACY_HS256_SECRET_ENV: &str = "TC_AUTH_SECRET";
pub const JWKS_URL_ENV: &str = "AUTH_JWKS_URL";
pub const CLAIMS_NAMESPACE_ENV: &str = "AUTH_CLAIMS_NAMESPACE";
pub const TOKEN_LEEWAY_ENV: &str = "AUTH_TOKEN_LEEWAY_SECS";
pub const COOKIE_NAME_ENV: &str = "AUTH_COOKIE_NAME";
pub const V3_COOKIE_NAME_ENV: &str = "AUTH_V3_COOKIE_NAME";
pub const ADMIN_ROLE_ENV: &str = "AUTH_ADMIN_ROLE";
pub const MEMBER_ROLE_ENV: &str = "AUTH_MEMBER_ROLE";
pub const JWKS_CACHE_TTL_ENV: &str = "JWKS_CACHE_TTL_SECS";
pub const JWKS_CACHE_MAX_KEYS_ENV: &str = "JWKS_CACHE_MAX_KEYS";
pub const JWKS_FETCH_LIMIT_ENV: &str = "JWKS_FETCH_LIMIT";
pub const JWKS_FETCH_WINDOW_ENV: &str = "JWKS_FETCH_WINDOW_SECS";
pub const JWKS_LOOKUP_TIMEOUT_ENV: &str = "JWKS_LOOKUP_TIMEOUT_MS";
pub const CORS_ALLOWED_ORIGINS_ENV: &str = "CORS_ALLOWED_ORIGINS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default key set endpoint of the identity provider.
pub const DEFAULT_JWKS_URL: &str = "https://topcoder.auth0.com/.well-known/jwks.json";
/// Default prefix for namespaced (v3) claims.
pub const DEFAULT_CLAIMS_NAMESPACE: &str = "https://topcoder.com/claims/";

/// Configuration errors detected at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value: {value:?}")]
    InvalidValue { name: &'static str, value: String },

    #[error("{name} must be greater than zero")]
    MustBePositive { name: &'static str },

    #[error("AUTH_JWKS_URL is not a valid URL: {0}")]
    InvalidJwksUrl(#[from] url::ParseError),
}

/// Settings consumed by the token validators and the request authenticator.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Shared secret for HS256 tokens. `None` disables HS256 verification.
    pub hs256_secret: Option<String>,
    /// Prefix used by the namespaced claim schema.
    pub claims_namespace: String,
    /// Accepted clock skew when checking `exp` and `nbf`.
    pub leeway_secs: u64,
    /// Legacy token cookie.
    pub cookie_name: String,
    /// Current token cookie, consulted before the legacy one.
    pub v3_cookie_name: String,
    pub admin_role: String,
    pub member_role: String,
    /// Development mode. Allows HS256 tokens to be decoded without a
    /// signature check when no secret is configured.
    pub development: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            hs256_secret: None,
            claims_namespace: DEFAULT_CLAIMS_NAMESPACE.to_string(),
            leeway_secs: 60,
            cookie_name: "tcjwt".to_string(),
            v3_cookie_name: "v3jwt".to_string(),
            admin_role: "administrator".to_string(),
            member_role: "Topcoder User".to_string(),
            development: false,
        }
    }
}

/// Settings for the remote key set and its cache.
#[derive(Debug, Clone)]
pub struct KeyCacheConfig {
    pub jwks_url: Url,
    /// How long a fetched key is trusted before it is fetched again.
    pub ttl: Duration,
    pub max_keys: usize,
    /// Upstream fetches allowed per `fetch_window`.
    pub fetch_limit: u32,
    pub fetch_window: Duration,
    /// How long a fetch may wait for a rate limiter permit.
    pub limiter_wait: Duration,
    /// HTTP timeout of a single key set request.
    pub fetch_timeout: Duration,
    /// How long a request waits for a missing key before giving up.
    pub lookup_timeout: Duration,
}

impl KeyCacheConfig {
    pub fn new(jwks_url: Url) -> Self {
        Self {
            jwks_url,
            ttl: Duration::from_secs(24 * 60 * 60),
            max_keys: 10,
            fetch_limit: 10,
            fetch_window: Duration::from_secs(60),
            limiter_wait: Duration::from_millis(250),
            fetch_timeout: Duration::from_secs(10),
            lookup_timeout: Duration::from_secs(5),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_allowed_origins: Vec::new(),
            log_format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Complete process configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub auth: AuthConfig,
    pub keys: KeyCacheConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let development = get(ENVIRONMENT_ENV)
            .map(|env| env.eq_ignore_ascii_case("development") || env.eq_ignore_ascii_case("dev"))
            .unwrap_or(false);

        let defaults = AuthConfig::default();
        let auth = AuthConfig {
            hs256_secret: get(HS256_SECRET_ENV).or_else(|| get(LEGACY_HS256_SECRET_ENV)),
            claims_namespace: get(CLAIMS_NAMESPACE_ENV).unwrap_or(defaults.claims_namespace),
            leeway_secs: parse_or(&get, TOKEN_LEEWAY_ENV, defaults.leeway_secs)?,
            cookie_name: get(COOKIE_NAME_ENV).unwrap_or(defaults.cookie_name),
            v3_cookie_name: get(V3_COOKIE_NAME_ENV).unwrap_or(defaults.v3_cookie_name),
            admin_role: get(ADMIN_ROLE_ENV).unwrap_or(defaults.admin_role),
            member_role: get(MEMBER_ROLE_ENV).unwrap_or(defaults.member_role),
            development,
        };

        let jwks_url = Url::parse(&get(JWKS_URL_ENV).unwrap_or_else(|| DEFAULT_JWKS_URL.to_string()))?;
        let mut keys = KeyCacheConfig::new(jwks_url);
        keys.ttl = Duration::from_secs(positive(&get, JWKS_CACHE_TTL_ENV, keys.ttl.as_secs())?);
        keys.max_keys = positive(&get, JWKS_CACHE_MAX_KEYS_ENV, keys.max_keys)?;
        keys.fetch_limit = positive(&get, JWKS_FETCH_LIMIT_ENV, keys.fetch_limit)?;
        keys.fetch_window =
            Duration::from_secs(positive(&get, JWKS_FETCH_WINDOW_ENV, keys.fetch_window.as_secs())?);
        keys.lookup_timeout = Duration::from_millis(positive(
            &get,
            JWKS_LOOKUP_TIMEOUT_ENV,
            keys.lookup_timeout.as_millis() as u64,
        )?);

        let server_defaults = ServerConfig::default();
        let server = ServerConfig {
            host: get(HOST_ENV).unwrap_or(server_defaults.host),
            port: parse_or(&get, PORT_ENV, server_defaults.port)?,
            cors_allowed_origins: get(CORS_ALLOWED_ORIGINS_ENV)
                .map(|origins| {
                    origins
                        .split(',')
                        .map(str::trim)
                        .filter(|o| !o.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            log_format: match get(LOG_FORMAT_ENV).as_deref() {
                Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        Ok(Self { auth, keys, server })
    }
}

fn parse_or<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue { name, value: raw }),
        None => Ok(default),
    }
}

fn positive<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialEq + Default,
    G: Fn(&str) -> Option<String>,
{
    let value = parse_or(get, name, default)?;
    if value == T::default() {
        return Err(ConfigError::MustBePositive { name });
    }
    Ok(value)
}
