//! Route strategy registry.
//!
//! An ordered table of rules, each binding a URL matcher to a caching
//! strategy and the name of the store that strategy reads and writes.
//! Rules are tried in registration order and the first match wins.
//!
//! ### Pattern matching across origins
//! A pattern may match anywhere in a same-origin URL. For a cross-origin
//! URL the match must start at the beginning of the URL, so a loose
//! suffix pattern like `\.js$` never captures third-party scripts.

use crate::strategy::{StaleWhileRevalidate, Strategy};
use phaseout_core::Error;
use regex::Regex;
use std::sync::Arc;
use url::Url;

/// Service worker bootstrap library, cached in its own store.
pub const WORKBOX_URL: &str = "https://storage.googleapis.com/workbox-cdn/releases/4.3.1/workbox-sw.js";
pub const WORKBOX_STORE: &str = "phaseout-workbox";

/// jsDelivr CDN assets.
///
/// The trailing bracket is a character class, not an alternation: it matches
/// one final character out of `. j s | c`. URLs ending in `.js`, `.css` or
/// `.mjs` match; `.png` or `.woff2` do not.
pub const JSDELIVR_PATTERN: &str = r"^(https://cdn\.jsdelivr\.net/.*)[.js|.css]$";
pub const JSDELIVR_STORE: &str = "phaseout-jsdelivr";

/// Application scripts and styles.
pub const STATIC_ASSETS_PATTERN: &str = r"\.(?:js|css)$";
pub const STATIC_ASSETS_STORE: &str = "phaseout-static-assets";

/// Predicate over a request URL.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// The full URL must equal this one.
    Exact(Url),
    /// Regular expression over the full URL string.
    Pattern(Regex),
}

impl Matcher {
    pub fn exact(url: &str) -> Result<Self, Error> {
        Url::parse(url)
            .map(Matcher::Exact)
            .map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))
    }

    pub fn pattern(pattern: &str) -> Result<Self, Error> {
        Regex::new(pattern)
            .map(Matcher::Pattern)
            .map_err(|e| Error::InvalidInput(format!("invalid route pattern {pattern}: {e}")))
    }

    /// Whether `url` is captured by this matcher for a worker installed at `origin`.
    pub fn matches(&self, url: &Url, origin: &Url) -> bool {
        match self {
            Matcher::Exact(expected) => expected.as_str() == url.as_str(),
            Matcher::Pattern(regex) => match regex.find(url.as_str()) {
                Some(m) if m.start() == 0 => true,
                Some(_) if url.origin() == origin.origin() => true,
                Some(_) => {
                    tracing::trace!(%url, pattern = %regex, "ignoring partial match on cross-origin URL");
                    false
                }
                None => false,
            },
        }
    }
}

/// A matcher bound to a strategy and a store name.
#[derive(Clone)]
pub struct RouteRule {
    pub matcher: Matcher,
    pub strategy: Arc<dyn Strategy>,
    pub store: String,
}

impl std::fmt::Debug for RouteRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteRule")
            .field("matcher", &self.matcher)
            .field("strategy", &self.strategy.name())
            .field("store", &self.store)
            .finish()
    }
}

/// Ordered, immutable-after-startup table of route rules.
#[derive(Debug, Clone)]
pub struct RouteRegistry {
    origin: Url,
    rules: Vec<RouteRule>,
}

impl RouteRegistry {
    /// An empty registry for a worker installed at `origin`.
    pub fn new(origin: Url) -> Self {
        Self { origin, rules: Vec::new() }
    }

    /// The three stale-while-revalidate routes the worker ships with.
    pub fn default_routes(origin: Url) -> Result<Self, Error> {
        let swr: Arc<dyn Strategy> = Arc::new(StaleWhileRevalidate);
        let mut registry = Self::new(origin);
        registry
            .register(Matcher::exact(WORKBOX_URL)?, Arc::clone(&swr), WORKBOX_STORE)
            .register(Matcher::pattern(JSDELIVR_PATTERN)?, Arc::clone(&swr), JSDELIVR_STORE)
            .register(Matcher::pattern(STATIC_ASSETS_PATTERN)?, swr, STATIC_ASSETS_STORE);
        Ok(registry)
    }

    /// Append a rule. Earlier rules take precedence.
    pub fn register(&mut self, matcher: Matcher, strategy: Arc<dyn Strategy>, store: impl Into<String>) -> &mut Self {
        self.rules.push(RouteRule { matcher, strategy, store: store.into() });
        self
    }

    /// First rule whose matcher accepts `url`, if any.
    pub fn match_url(&self, url: &Url) -> Option<&RouteRule> {
        self.rules.iter().find(|rule| rule.matcher.matches(url, &self.origin))
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }
}
