// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Service Wiring
//!
//! Builds the authorization pipeline from configuration and runs the HTTP
//! server until Ctrl-C or SIGTERM.
//!
//! Startup order:
//! 1. Shared HTTP client with the configured timeout
//! 2. Discovery metadata and initial signing keys
//! 3. Token validator for the configured strategy
//! 4. Extra-claims provider for the configured source
//! 5. Authorizer, company store, router
//! 6. Claims cache sweeper (when enabled) and the listener

use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api;
use crate::auth::{
    Authorizer, AuthorizerSettings, KeyResolver, KeyResolverError, ScopePolicy, TokenIntrospector,
    TokenValidator,
};
use crate::claims::{
    ClaimsCacheSweeper, ExtraClaimsProvider, InvestmentsClaimsProvider, ManagerDirectory,
    UserInfoClaimsProvider, UserInfoClient,
};
use crate::config::{
    AppConfig, ConfigError, ExtraClaimsSource, OAuthConfig, TokenValidationStrategy,
    OAUTH_CLIENT_SECRET_ENV,
};
use crate::state::AppState;
use crate::store::CompanyStore;

/// Failures that stop the service from starting or keep it from serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("failed to load authorization server metadata: {0}")]
    Keys(#[from] KeyResolverError),
    #[error("no user-info endpoint configured or discovered")]
    MissingUserInfoEndpoint,
    #[error("no introspection endpoint configured or discovered")]
    MissingIntrospectionEndpoint,
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP client shared by the key resolver and the user-info client.
pub fn http_client(config: &OAuthConfig) -> Result<reqwest::Client, StartupError> {
    Ok(reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()?)
}

/// Build the token validator for the configured strategy.
///
/// The introspection endpoint comes from configuration, falling back to the
/// discovery document.
pub fn token_validator(
    config: &OAuthConfig,
    keys: Arc<KeyResolver>,
    client: reqwest::Client,
) -> Result<TokenValidator, StartupError> {
    let validator = TokenValidator::new(Arc::clone(&keys), config);
    match config.validation_strategy {
        TokenValidationStrategy::Jwt => Ok(validator),
        TokenValidationStrategy::Introspection => {
            let endpoint = config
                .introspection_endpoint
                .clone()
                .or_else(|| keys.metadata().introspection_endpoint.clone())
                .ok_or(StartupError::MissingIntrospectionEndpoint)?;
            let introspector = TokenIntrospector::from_config(config, endpoint, client)
                .ok_or(ConfigError::Missing(OAUTH_CLIENT_SECRET_ENV))?;
            info!(endpoint = introspector.endpoint(), "Validating tokens by introspection");
            Ok(validator.with_introspection(introspector))
        }
    }
}

/// Choose the extra-claims provider.
///
/// The user-info endpoint comes from configuration, falling back to the
/// discovery document.
pub fn claims_provider(
    config: &OAuthConfig,
    keys: &KeyResolver,
    client: reqwest::Client,
) -> Result<Arc<dyn ExtraClaimsProvider>, StartupError> {
    let endpoint = config
        .userinfo_endpoint
        .clone()
        .or_else(|| keys.metadata().userinfo_endpoint.clone());
    let user_info = endpoint.map(|endpoint| UserInfoClient::new(endpoint, client));

    let provider: Arc<dyn ExtraClaimsProvider> = match config.extra_claims_source {
        ExtraClaimsSource::Investments => Arc::new(InvestmentsClaimsProvider::new(
            ManagerDirectory::new(),
            user_info,
        )),
        ExtraClaimsSource::UserInfo => Arc::new(UserInfoClaimsProvider::new(
            user_info.ok_or(StartupError::MissingUserInfoEndpoint)?,
        )),
    };
    Ok(provider)
}

/// Assemble application state around an initialized key resolver.
pub fn build_state(
    config: &AppConfig,
    keys: KeyResolver,
    client: reqwest::Client,
) -> Result<AppState, StartupError> {
    let provider = claims_provider(&config.oauth, &keys, client.clone())?;
    let validator = token_validator(&config.oauth, Arc::new(keys), client)?;
    let settings = AuthorizerSettings {
        max_cache_ttl: config.claims_cache.max_ttl,
        lookup_timeout: config.oauth.http_timeout,
        scopes: ScopePolicy::new(config.oauth.required_scopes.clone()),
    };

    Ok(AppState::new(
        Authorizer::new(validator, provider, settings),
        CompanyStore::seeded(),
    ))
}

/// Contact the authorization server and assemble application state.
pub async fn initialize(config: &AppConfig) -> Result<AppState, StartupError> {
    info!(oauth = ?config.oauth, "Initializing authorization");
    let client = http_client(&config.oauth)?;
    let keys = KeyResolver::initialize(&config.oauth, client.clone()).await?;
    build_state(config, keys, client)
}

/// Run the service until a shutdown signal arrives.
pub async fn run(config: AppConfig) -> Result<(), StartupError> {
    let addr = config.bind_addr()?;
    let state = initialize(&config).await?;
    let shutdown = CancellationToken::new();

    let sweeper = config.claims_cache.sweep_interval.map(|interval| {
        tokio::spawn(
            ClaimsCacheSweeper::new(state.authorizer.cache(), interval).run(shutdown.clone()),
        )
    });

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Investments API listening (docs at /docs)");

    let served = axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await;

    shutdown.cancel();
    if let Some(sweeper) = sweeper {
        if let Err(err) = sweeper.await {
            warn!(error = %err, "Claims cache sweeper ended abnormally");
        }
    }
    info!("Server stopped");
    Ok(served?)
}

/// Resolve on Ctrl-C, SIGTERM, or external cancellation.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = shutdown.cancelled() => {},
    }
    info!("Shutdown signal received, draining connections");
}
