// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0

//! Matchers stored by expectations.
//!
//! The crate only composes and describes matchers. Anything smarter than an
//! exact comparison or a closure (regular expressions, JSON comparison, ...)
//! plugs in through [`MatchExpectation`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

/// Capability implemented by third-party matchers
pub trait MatchExpectation: Send + Sync {
    /// Returns true if `actual` satisfies the matcher
    fn matches(&self, actual: &str) -> bool;

    /// Human readable description of what is expected
    fn expected(&self) -> String;

    /// Tag naming the matcher in diagnostics
    fn kind(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Matches a value equal to the expected one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExactMatcher(String);

impl ExactMatcher {
    pub fn new(expected: impl Into<String>) -> Self {
        Self(expected.into())
    }

    pub fn matches(&self, actual: &str) -> bool {
        self.0 == actual
    }

    pub fn expected(&self) -> String {
        self.0.clone()
    }
}

type MatchFn = dyn Fn(&str) -> bool + Send + Sync;

/// Matches using a closure, optionally carrying a description
#[derive(Clone)]
pub struct FnMatcher {
    func: Arc<MatchFn>,
    expected: String,
}

impl FnMatcher {
    pub fn new(func: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self {
            func: Arc::new(func),
            expected: String::new(),
        }
    }

    pub fn with_expected(self, expected: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
            ..self
        }
    }

    pub fn matches(&self, actual: &str) -> bool {
        (self.func)(actual)
    }

    /// The description given at construction, possibly empty
    pub fn expected(&self) -> String {
        self.expected.clone()
    }
}

impl fmt::Debug for FnMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMatcher")
            .field("expected", &self.expected)
            .finish_non_exhaustive()
    }
}

type MatcherFactory = dyn Fn() -> Matcher + Send + Sync;

/// Decorating matcher that produces its inner matcher on demand
#[derive(Clone)]
pub struct CallbackMatcher(Arc<MatcherFactory>);

impl CallbackMatcher {
    pub fn new(factory: impl Fn() -> Matcher + Send + Sync + 'static) -> Self {
        Self(Arc::new(factory))
    }

    pub fn matcher(&self) -> Matcher {
        (self.0)()
    }
}

impl fmt::Debug for CallbackMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CallbackMatcher").field(&self.matcher()).finish()
    }
}

/// Closed set of matchers an expectation can hold
#[derive(Clone)]
pub enum Matcher {
    Exact(ExactMatcher),
    Fn(FnMatcher),
    Callback(CallbackMatcher),
    Custom(Arc<dyn MatchExpectation>),
}

impl Matcher {
    pub fn exact(expected: impl Into<String>) -> Self {
        Matcher::Exact(ExactMatcher::new(expected))
    }

    pub fn func(func: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Matcher::Fn(FnMatcher::new(func))
    }

    pub fn callback(factory: impl Fn() -> Matcher + Send + Sync + 'static) -> Self {
        Matcher::Callback(CallbackMatcher::new(factory))
    }

    pub fn custom(matcher: impl MatchExpectation + 'static) -> Self {
        Matcher::Custom(Arc::new(matcher))
    }

    pub fn matches(&self, actual: &str) -> bool {
        match self {
            Matcher::Exact(m) => m.matches(actual),
            Matcher::Fn(m) => m.matches(actual),
            Matcher::Callback(m) => m.matcher().matches(actual),
            Matcher::Custom(m) => m.matches(actual),
        }
    }

    pub fn expected(&self) -> String {
        match self {
            Matcher::Exact(m) => m.expected(),
            Matcher::Fn(m) => m.expected(),
            Matcher::Callback(m) => m.matcher().expected(),
            Matcher::Custom(m) => m.expected(),
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Exact(m) => fmt::Debug::fmt(m, f),
            Matcher::Fn(m) => fmt::Debug::fmt(m, f),
            Matcher::Callback(m) => fmt::Debug::fmt(m, f),
            Matcher::Custom(m) => write!(f, "{}({:?})", m.kind(), m.expected()),
        }
    }
}

impl From<&str> for Matcher {
    fn from(value: &str) -> Self {
        Matcher::exact(value)
    }
}

impl From<String> for Matcher {
    fn from(value: String) -> Self {
        Matcher::exact(value)
    }
}

impl From<&[u8]> for Matcher {
    fn from(value: &[u8]) -> Self {
        Matcher::exact(String::from_utf8_lossy(value))
    }
}

impl From<Vec<u8>> for Matcher {
    fn from(value: Vec<u8>) -> Self {
        Matcher::from(value.as_slice())
    }
}

impl From<ExactMatcher> for Matcher {
    fn from(value: ExactMatcher) -> Self {
        Matcher::Exact(value)
    }
}

impl From<FnMatcher> for Matcher {
    fn from(value: FnMatcher) -> Self {
        Matcher::Fn(value)
    }
}

impl From<CallbackMatcher> for Matcher {
    fn from(value: CallbackMatcher) -> Self {
        Matcher::Callback(value)
    }
}

impl From<Arc<dyn MatchExpectation>> for Matcher {
    fn from(value: Arc<dyn MatchExpectation>) -> Self {
        Matcher::Custom(value)
    }
}

/// Expected request headers, keyed by header name
pub type HeaderMatcher = HashMap<String, Matcher>;

/// Returns true if every expected header is present and satisfied
pub fn match_headers(expected: &HeaderMatcher, actual: &HashMap<String, String>) -> bool {
    expected.iter().all(|(key, matcher)| {
        actual
            .get(key)
            .is_some_and(|value| matcher.matches(value))
    })
}

/// Matcher applied to a request or response body.
///
/// Messages are serialized to JSON before being handed to the inner matcher.
#[derive(Debug, Clone)]
pub struct PayloadMatcher {
    matcher: Matcher,
}

impl PayloadMatcher {
    pub fn new(matcher: impl Into<Matcher>) -> Self {
        Self {
            matcher: matcher.into(),
        }
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Matches the raw body as text
    pub fn matches_str(&self, actual: &str) -> bool {
        self.matcher.matches(actual)
    }

    /// Matches a message through its JSON form
    pub fn matches<T: Serialize + ?Sized>(&self, payload: &T) -> Result<bool, serde_json::Error> {
        let body = serde_json::to_string(payload)?;

        Ok(self.matcher.matches(&body))
    }

    pub fn expected(&self) -> String {
        self.matcher.expected()
    }
}
