// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup and passed
//! by value into the components that need it. Nothing reads the environment
//! after [`AppConfig::from_env`] returns.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `OAUTH_ISSUER` | Expected `iss` claim, also the discovery base URL | Required |
//! | `OAUTH_AUDIENCE` | Expected `aud` claim | Optional |
//! | `OAUTH_CLIENT_ID` | API client id, checked against `client_id` when no audience is set | Required |
//! | `OAUTH_ENFORCE_CLIENT_ID` | Apply the `client_id` check above | `true` |
//! | `OAUTH_CLIENT_SECRET` | API client secret for introspection (never logged) | Required for introspection |
//! | `OAUTH_TOKEN_VALIDATION_STRATEGY` | `jwt` (local JWKS verification) or `introspection` | `jwt` |
//! | `OAUTH_INTROSPECTION_ENDPOINT` | Introspection URL, overrides discovery | From discovery |
//! | `OAUTH_ALGORITHM` | Permitted JWS algorithm | `RS256` |
//! | `OAUTH_CLOCK_SKEW_SECONDS` | Leeway applied to the expiry check, at most 3600 | `0` |
//! | `OAUTH_USERINFO_ENDPOINT` | User-info URL, overrides discovery | From discovery |
//! | `OAUTH_HTTP_TIMEOUT_SECONDS` | Timeout for outbound calls and claims lookups | `10` |
//! | `OAUTH_REQUIRED_SCOPES` | Comma separated `path_prefix=scope` rules | None |
//! | `EXTRA_CLAIMS_SOURCE` | `investments` or `userinfo` | `investments` |
//! | `CLAIMS_CACHE_MAX_MINUTES` | Upper bound on claims cache entry lifetime | `15` |
//! | `CLAIMS_CACHE_SWEEP_SECONDS` | Background sweep interval, `0` disables it | `60` |
//!
//! ## Audience and `client_id`
//!
//! With `OAUTH_AUDIENCE` set, only `aud` is checked. Without it the token's
//! `client_id` (or `azp`) must equal `OAUTH_CLIENT_ID`. Some servers, AWS
//! Cognito among them, issue access tokens with no `aud` whose `client_id`
//! is the calling web client rather than this API. Set
//! `OAUTH_ENFORCE_CLIENT_ID=false` for those.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use jsonwebtoken::Algorithm;
use thiserror::Error;
use url::Url;

use crate::auth::scope::ScopeRule;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const OAUTH_ISSUER_ENV: &str = "OAUTH_ISSUER";
pub const OAUTH_AUDIENCE_ENV: &str = "OAUTH_AUDIENCE";
pub const OAUTH_CLIENT_ID_ENV: &str = "OAUTH_CLIENT_ID";
pub const OAUTH_ENFORCE_CLIENT_ID_ENV: &str = "OAUTH_ENFORCE_CLIENT_ID";
pub const OAUTH_CLIENT_SECRET_ENV: &str = "OAUTH_CLIENT_SECRET";
pub const OAUTH_TOKEN_VALIDATION_STRATEGY_ENV: &str = "OAUTH_TOKEN_VALIDATION_STRATEGY";
pub const OAUTH_INTROSPECTION_ENDPOINT_ENV: &str = "OAUTH_INTROSPECTION_ENDPOINT";
pub const OAUTH_ALGORITHM_ENV: &str = "OAUTH_ALGORITHM";
pub const OAUTH_CLOCK_SKEW_ENV: &str = "OAUTH_CLOCK_SKEW_SECONDS";
pub const OAUTH_USERINFO_ENDPOINT_ENV: &str = "OAUTH_USERINFO_ENDPOINT";
pub const OAUTH_HTTP_TIMEOUT_ENV: &str = "OAUTH_HTTP_TIMEOUT_SECONDS";
pub const OAUTH_REQUIRED_SCOPES_ENV: &str = "OAUTH_REQUIRED_SCOPES";
pub const EXTRA_CLAIMS_SOURCE_ENV: &str = "EXTRA_CLAIMS_SOURCE";

/// Upper bound, in minutes, on how long resolved extra claims are reused.
///
/// Entries never outlive the token they were resolved for, whichever is
/// sooner wins.
pub const CLAIMS_CACHE_MAX_MINUTES_ENV: &str = "CLAIMS_CACHE_MAX_MINUTES";
pub const CLAIMS_CACHE_SWEEP_ENV: &str = "CLAIMS_CACHE_SWEEP_SECONDS";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CACHE_MAX_MINUTES: u64 = 15;
const DEFAULT_SWEEP_SECS: u64 = 60;
const MAX_CLOCK_SKEW_SECS: u64 = 3600;

/// Errors raised while loading configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),
    #[error("environment variable {var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// How access tokens are validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenValidationStrategy {
    /// Verify the JWT signature locally against the issuer's JWKS.
    #[default]
    Jwt,
    /// Ask the authorization server's introspection endpoint, authenticating
    /// with the API's client credentials.
    Introspection,
}

/// Which provider resolves extra claims after token validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtraClaimsSource {
    /// Manager directory lookup keyed by the token's `manager_id` claim,
    /// enriched with user info when an endpoint is known.
    #[default]
    Investments,
    /// User-info endpoint only.
    UserInfo,
}

/// Settings for talking to the authorization server.
#[derive(Clone)]
pub struct OAuthConfig {
    pub issuer: String,
    pub audience: Option<String>,
    pub client_id: String,
    pub enforce_client_id: bool,
    pub client_secret: Option<String>,
    pub validation_strategy: TokenValidationStrategy,
    pub introspection_endpoint: Option<String>,
    pub algorithm: Algorithm,
    pub clock_skew: Duration,
    pub userinfo_endpoint: Option<String>,
    pub http_timeout: Duration,
    pub required_scopes: Vec<ScopeRule>,
    pub extra_claims_source: ExtraClaimsSource,
}

impl OAuthConfig {
    /// Minimal configuration for an issuer, with every optional setting at
    /// its default.
    pub fn new(issuer: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: None,
            client_id: client_id.into(),
            enforce_client_id: true,
            client_secret: None,
            validation_strategy: TokenValidationStrategy::default(),
            introspection_endpoint: None,
            algorithm: Algorithm::RS256,
            clock_skew: Duration::ZERO,
            userinfo_endpoint: None,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            required_scopes: Vec::new(),
            extra_claims_source: ExtraClaimsSource::default(),
        }
    }

    /// OpenID Connect discovery document location for the issuer.
    pub fn discovery_url(&self) -> String {
        format!(
            "{}/.well-known/openid-configuration",
            self.issuer.trim_end_matches('/')
        )
    }
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("client_id", &self.client_id)
            .field("enforce_client_id", &self.enforce_client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("validation_strategy", &self.validation_strategy)
            .field("introspection_endpoint", &self.introspection_endpoint)
            .field("algorithm", &self.algorithm)
            .field("clock_skew", &self.clock_skew)
            .field("userinfo_endpoint", &self.userinfo_endpoint)
            .field("http_timeout", &self.http_timeout)
            .field("required_scopes", &self.required_scopes)
            .field("extra_claims_source", &self.extra_claims_source)
            .finish()
    }
}

/// Claims cache tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimsCacheConfig {
    pub max_ttl: Duration,
    pub sweep_interval: Option<Duration>,
}

impl Default for ClaimsCacheConfig {
    fn default() -> Self {
        Self {
            max_ttl: Duration::from_secs(DEFAULT_CACHE_MAX_MINUTES * 60),
            sweep_interval: Some(Duration::from_secs(DEFAULT_SWEEP_SECS)),
        }
    }
}

/// Full service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
    pub oauth: OAuthConfig,
    pub claims_cache: ClaimsCacheConfig,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated the same as unset ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or(get(PORT_ENV), PORT_ENV, DEFAULT_PORT)?;
        let log_format = match get(LOG_FORMAT_ENV).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: LOG_FORMAT_ENV,
                    reason: format!("expected `json` or `pretty`, got `{other}`"),
                })
            }
        };

        let issuer = get(OAUTH_ISSUER_ENV).ok_or(ConfigError::Missing(OAUTH_ISSUER_ENV))?;
        require_http_url(&issuer, OAUTH_ISSUER_ENV)?;
        let client_id =
            get(OAUTH_CLIENT_ID_ENV).ok_or(ConfigError::Missing(OAUTH_CLIENT_ID_ENV))?;

        let algorithm = match get(OAUTH_ALGORITHM_ENV) {
            Some(raw) => Algorithm::from_str(&raw).map_err(|_| ConfigError::Invalid {
                var: OAUTH_ALGORITHM_ENV,
                reason: format!("unknown algorithm `{raw}`"),
            })?,
            None => Algorithm::RS256,
        };
        if matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(ConfigError::Invalid {
                var: OAUTH_ALGORITHM_ENV,
                reason: "symmetric algorithms cannot be verified against a JWKS".to_string(),
            });
        }

        let client_secret = get(OAUTH_CLIENT_SECRET_ENV);
        let validation_strategy = match get(OAUTH_TOKEN_VALIDATION_STRATEGY_ENV).as_deref() {
            None | Some("jwt") => TokenValidationStrategy::Jwt,
            Some("introspection") => TokenValidationStrategy::Introspection,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: OAUTH_TOKEN_VALIDATION_STRATEGY_ENV,
                    reason: format!("expected `jwt` or `introspection`, got `{other}`"),
                })
            }
        };
        if validation_strategy == TokenValidationStrategy::Introspection && client_secret.is_none()
        {
            return Err(ConfigError::Missing(OAUTH_CLIENT_SECRET_ENV));
        }
        let introspection_endpoint = get(OAUTH_INTROSPECTION_ENDPOINT_ENV);
        if let Some(endpoint) = &introspection_endpoint {
            require_http_url(endpoint, OAUTH_INTROSPECTION_ENDPOINT_ENV)?;
        }

        let clock_skew = parse_or(get(OAUTH_CLOCK_SKEW_ENV), OAUTH_CLOCK_SKEW_ENV, 0)?;
        if clock_skew > MAX_CLOCK_SKEW_SECS {
            return Err(ConfigError::Invalid {
                var: OAUTH_CLOCK_SKEW_ENV,
                reason: format!("must be at most {MAX_CLOCK_SKEW_SECS} seconds"),
            });
        }

        let userinfo_endpoint = get(OAUTH_USERINFO_ENDPOINT_ENV);
        if let Some(endpoint) = &userinfo_endpoint {
            require_http_url(endpoint, OAUTH_USERINFO_ENDPOINT_ENV)?;
        }

        let required_scopes = match get(OAUTH_REQUIRED_SCOPES_ENV) {
            Some(raw) => parse_scope_rules(&raw)?,
            None => Vec::new(),
        };

        let extra_claims_source = match get(EXTRA_CLAIMS_SOURCE_ENV).as_deref() {
            None | Some("investments") => ExtraClaimsSource::Investments,
            Some("userinfo") => ExtraClaimsSource::UserInfo,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: EXTRA_CLAIMS_SOURCE_ENV,
                    reason: format!("expected `investments` or `userinfo`, got `{other}`"),
                })
            }
        };

        let http_timeout = parse_or(
            get(OAUTH_HTTP_TIMEOUT_ENV),
            OAUTH_HTTP_TIMEOUT_ENV,
            DEFAULT_HTTP_TIMEOUT_SECS,
        )?;
        if http_timeout == 0 {
            return Err(ConfigError::Invalid {
                var: OAUTH_HTTP_TIMEOUT_ENV,
                reason: "must be greater than zero".to_string(),
            });
        }

        let oauth = OAuthConfig {
            issuer,
            audience: get(OAUTH_AUDIENCE_ENV),
            client_id,
            enforce_client_id: parse_or(
                get(OAUTH_ENFORCE_CLIENT_ID_ENV),
                OAUTH_ENFORCE_CLIENT_ID_ENV,
                true,
            )?,
            client_secret,
            validation_strategy,
            introspection_endpoint,
            algorithm,
            clock_skew: Duration::from_secs(clock_skew),
            userinfo_endpoint,
            http_timeout: Duration::from_secs(http_timeout),
            required_scopes,
            extra_claims_source,
        };

        let max_minutes = parse_or(
            get(CLAIMS_CACHE_MAX_MINUTES_ENV),
            CLAIMS_CACHE_MAX_MINUTES_ENV,
            DEFAULT_CACHE_MAX_MINUTES,
        )?;
        let sweep_secs = parse_or(
            get(CLAIMS_CACHE_SWEEP_ENV),
            CLAIMS_CACHE_SWEEP_ENV,
            DEFAULT_SWEEP_SECS,
        )?;
        let claims_cache = ClaimsCacheConfig {
            max_ttl: Duration::from_secs(max_minutes.saturating_mul(60)),
            sweep_interval: (sweep_secs > 0).then(|| Duration::from_secs(sweep_secs)),
        };

        Ok(Self {
            host,
            port,
            log_format,
            oauth,
            claims_cache,
        })
    }

    /// Socket address to bind the HTTP listener to.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::Invalid {
                var: HOST_ENV,
                reason: format!("{e}"),
            })
    }
}

fn parse_or<T: FromStr>(
    value: Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    match value {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn require_http_url(value: &str, var: &'static str) -> Result<(), ConfigError> {
    let url = Url::parse(value).map_err(|e| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::Invalid {
            var,
            reason: format!("unsupported URL scheme `{other}`"),
        }),
    }
}

fn parse_scope_rules(raw: &str) -> Result<Vec<ScopeRule>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (prefix, scope) = entry.split_once('=').ok_or_else(|| ConfigError::Invalid {
                var: OAUTH_REQUIRED_SCOPES_ENV,
                reason: format!("expected `path_prefix=scope`, got `{entry}`"),
            })?;
            let (prefix, scope) = (prefix.trim(), scope.trim());
            if !prefix.starts_with('/') || scope.is_empty() {
                return Err(ConfigError::Invalid {
                    var: OAUTH_REQUIRED_SCOPES_ENV,
                    reason: format!("invalid rule `{entry}`"),
                });
            }
            Ok(ScopeRule::new(prefix, scope))
        })
        .collect()
}
