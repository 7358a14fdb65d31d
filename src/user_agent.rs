//! Shared User-Agent string for content API and asset download traffic.
//!
//! Single source for the UA format so both clients identify the tool the same
//! way when the content host inspects its access logs.

/// Default User-Agent for every request the bundler makes.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("quiz-bundler/{version} (game-asset-bundler)")
}
