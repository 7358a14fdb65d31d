//! Shared HTTP client construction policy.
//!
//! Both the content API client and the asset downloader build their reqwest
//! clients here so timeouts, compression, user-agent and proxy handling stay
//! consistent across the two kinds of traffic.

use std::panic::{AssertUnwindSafe, catch_unwind, set_hook, take_hook};
use std::time::Duration;

use reqwest::{Client, ClientBuilder, Proxy};
use tracing::warn;

use crate::user_agent;

enum BuildClientFailure {
    Panic,
    Build(reqwest::Error),
}

/// Error returned when no usable HTTP client could be built.
#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    /// The reqwest builder rejected the configuration.
    #[error("HTTP client construction failed for {purpose}: {source}")]
    Build {
        /// Which client was being built ("content-api", "asset-download").
        purpose: &'static str,
        /// Underlying builder error.
        #[source]
        source: reqwest::Error,
    },

    /// The builder panicked on both the system-proxy and env-proxy paths.
    #[error("HTTP client construction panicked for {purpose}")]
    Panicked {
        /// Which client was being built.
        purpose: &'static str,
    },
}

// `catch_unwind` does not suppress panic-hook stderr output; the hook is
// swapped out briefly so the expected system-proxy recovery path stays quiet.
static CLIENT_BUILD_PANIC_HOOK_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Builds a reqwest client with the shared policy.
///
/// `connect_timeout` bounds connection setup. Whole-request timeouts are set
/// per request by the callers, since group, directory and asset fetches each
/// have their own budget.
///
/// # Errors
///
/// Returns [`ClientBuildError`] when the client cannot be constructed.
pub(crate) fn build_http_client(
    purpose: &'static str,
    connect_timeout: Duration,
) -> Result<Client, ClientBuildError> {
    match try_build_client(connect_timeout, false) {
        Ok(client) => Ok(client),
        Err(BuildClientFailure::Panic) => {
            // Some sandboxed environments panic when querying system proxy
            // settings. Retry with env-proxy only.
            warn!(
                purpose,
                "HTTP client builder panicked while loading system proxy settings; retrying with env-proxy fallback"
            );
            match try_build_client(connect_timeout, true) {
                Ok(client) => Ok(client),
                Err(BuildClientFailure::Panic) => Err(ClientBuildError::Panicked { purpose }),
                Err(BuildClientFailure::Build(source)) => {
                    Err(ClientBuildError::Build { purpose, source })
                }
            }
        }
        Err(BuildClientFailure::Build(source)) => Err(ClientBuildError::Build { purpose, source }),
    }
}

fn try_build_client(
    connect_timeout: Duration,
    disable_system_proxy_lookup: bool,
) -> Result<Client, BuildClientFailure> {
    catch_unwind_silent(AssertUnwindSafe(move || {
        let mut builder = base_builder(connect_timeout);
        if disable_system_proxy_lookup {
            builder = apply_env_proxy_fallback(builder.no_proxy());
        }
        builder.build().map_err(BuildClientFailure::Build)
    }))
    .map_err(|_| BuildClientFailure::Panic)?
}

fn catch_unwind_silent<F, T>(operation: F) -> Result<T, Box<dyn std::any::Any + Send + 'static>>
where
    F: FnOnce() -> T + std::panic::UnwindSafe,
{
    let _panic_hook_guard = CLIENT_BUILD_PANIC_HOOK_LOCK
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let previous_hook = take_hook();
    set_hook(Box::new(|_| {}));
    let outcome = catch_unwind(operation);
    set_hook(previous_hook);
    outcome
}

fn base_builder(connect_timeout: Duration) -> ClientBuilder {
    Client::builder()
        .connect_timeout(connect_timeout)
        .gzip(true)
        .user_agent(user_agent::default_user_agent())
}

fn apply_env_proxy_fallback(mut builder: ClientBuilder) -> ClientBuilder {
    if let Some(proxy) = env_proxy_for_scheme("https")
        && let Ok(resolved) = Proxy::https(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    if let Some(proxy) = env_proxy_for_scheme("http")
        && let Ok(resolved) = Proxy::http(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    builder
}

fn env_proxy_for_scheme(scheme: &str) -> Option<String> {
    match scheme {
        "https" => find_first_proxy_var(&["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"]),
        "http" => find_first_proxy_var(&["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"]),
        _ => None,
    }
}

fn find_first_proxy_var(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}
