// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0

//! Human readable rendering of expected and actual requests.
//!
//! The output is what test failure reports show, e.g.
//!
//! ```text
//! Unary pkg.ItemService/GetItem (called: 2 time(s), remaining: 1 time(s))
//!     with header:
//!         locale: en-US
//!     with payload
//!         {"id":42}
//! ```

use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};

use serde::Serialize;

use crate::matcher::{HeaderMatcher, Matcher, PayloadMatcher};
use crate::service::Method;

const INDENT: &str = "    ";

/// A header or payload as seen by the formatter
#[derive(Debug, Clone)]
pub enum Value<'a> {
    Nil,
    Str(&'a str),
    Bytes(&'a [u8]),
    Matcher(&'a Matcher),
    Payload(&'a PayloadMatcher),
    /// Any other value, kept in its serialized form
    Message {
        type_name: &'static str,
        body: serde_json::Value,
    },
}

impl<'a> Value<'a> {
    /// Captures an arbitrary message.
    ///
    /// # Panics
    ///
    /// If the message cannot be serialized. The formatter never renders a
    /// value it could not read.
    pub fn message<T: Serialize + ?Sized>(message: &T) -> Self {
        let body = serde_json::to_value(message)
            .unwrap_or_else(|err| panic!("could not serialize value: {err}"));

        Value::Message {
            type_name: std::any::type_name::<T>(),
            body,
        }
    }

    /// True for values that carry nothing, like a `null` message
    pub fn is_nil(&self) -> bool {
        matches!(
            self,
            Value::Nil
                | Value::Message {
                    body: serde_json::Value::Null,
                    ..
                }
        )
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(value: &'a str) -> Self {
        Value::Str(value)
    }
}

impl<'a> From<&'a [u8]> for Value<'a> {
    fn from(value: &'a [u8]) -> Self {
        Value::Bytes(value)
    }
}

impl<'a> From<&'a Matcher> for Value<'a> {
    fn from(value: &'a Matcher) -> Self {
        Value::Matcher(value)
    }
}

impl<'a> From<&'a PayloadMatcher> for Value<'a> {
    fn from(value: &'a PayloadMatcher) -> Self {
        Value::Payload(value)
    }
}

impl<'a, T: Into<Value<'a>>> From<Option<T>> for Value<'a> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Nil, Into::into)
    }
}

/// Writes an expected request, with its call counts when they say something.
///
/// The counts are left out when `remaining_calls` is 0, and when the
/// expectation is a single call that has not happened yet.
pub fn format_expected_request<W: Write + ?Sized>(
    w: &mut W,
    method: &Method,
    header: &HeaderMatcher,
    payload: Option<&PayloadMatcher>,
    total_calls: usize,
    remaining_calls: usize,
) -> io::Result<()> {
    let header = header
        .iter()
        .map(|(key, matcher)| (key.as_str(), Value::Matcher(matcher)))
        .collect();

    format_request(
        w,
        method,
        header,
        Value::from(payload),
        total_calls,
        remaining_calls,
    )
}

/// Writes a request that was actually received.
pub fn format_actual_request<W: Write + ?Sized>(
    w: &mut W,
    method: &Method,
    header: &HashMap<String, String>,
    payload: Value<'_>,
) -> io::Result<()> {
    let header = header
        .iter()
        .map(|(key, value)| (key.as_str(), Value::Str(value)))
        .collect();

    format_request(w, method, header, payload, 0, 0)
}

fn format_request<W: Write + ?Sized>(
    w: &mut W,
    method: &Method,
    header: BTreeMap<&str, Value<'_>>,
    payload: Value<'_>,
    total_calls: usize,
    remaining_calls: usize,
) -> io::Result<()> {
    write!(w, "{} {}", method.method_type, method.full_name())?;

    if remaining_calls > 0 && (total_calls != 0 || remaining_calls != 1) {
        write!(
            w,
            " (called: {total_calls} time(s), remaining: {remaining_calls} time(s))"
        )?;
    }

    writeln!(w)?;

    if !header.is_empty() {
        writeln!(w, "{INDENT}with header:")?;

        for (key, value) in &header {
            writeln!(w, "{INDENT}{INDENT}{key}: {}", format_value_inline(value))?;
        }
    }

    if !payload.is_nil() {
        let body = format_value(&payload);

        if !body.is_empty() {
            writeln!(w, "{INDENT}with payload{}", format_type(&payload))?;
            writeln!(w, "{INDENT}{INDENT}{body}")?;
        }
    }

    Ok(())
}

/// Renders a value on a single line, the way header values are shown.
///
/// # Panics
///
/// If handed a serialized message: headers only ever hold strings, bytes or
/// matchers.
pub fn format_value_inline(value: &Value<'_>) -> String {
    match value {
        Value::Nil => "<nil>".to_string(),
        Value::Str(_) | Value::Bytes(_) => format_value(value),
        Value::Matcher(matcher) => format_matcher_inline(matcher),
        Value::Payload(payload) => format_matcher_inline(payload.matcher()),
        Value::Message { .. } if value.is_nil() => String::new(),
        Value::Message { type_name, .. } => {
            panic!("unknown value type in header: {type_name}")
        }
    }
}

fn format_matcher_inline(matcher: &Matcher) -> String {
    match matcher {
        Matcher::Exact(_) | Matcher::Fn(_) => format_matcher(matcher),
        Matcher::Callback(m) => format_matcher_inline(&m.matcher()),
        Matcher::Custom(m) => format!("{}({:?})", m.kind(), m.expected()),
    }
}

/// Renders a value in full, the way payloads are shown.
pub fn format_value(value: &Value<'_>) -> String {
    match value {
        Value::Nil => "<nil>".to_string(),
        Value::Str(s) => s.to_string(),
        Value::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        Value::Matcher(matcher) => format_matcher(matcher),
        Value::Payload(payload) => format_matcher(payload.matcher()),
        Value::Message { .. } if value.is_nil() => String::new(),
        Value::Message { body, .. } => serde_json::to_string(body)
            .unwrap_or_else(|err| panic!("could not serialize value: {err}")),
    }
}

fn format_matcher(matcher: &Matcher) -> String {
    match matcher {
        Matcher::Callback(m) => format_matcher(&m.matcher()),
        Matcher::Fn(m) => {
            let expected = m.expected();
            if expected.is_empty() {
                return "matches custom expectation".to_string();
            }

            expected
        }
        Matcher::Exact(m) => m.expected(),
        Matcher::Custom(m) => m.expected(),
    }
}

/// Returns ` using <type>` for values that are neither plain nor exact.
pub fn format_type(value: &Value<'_>) -> String {
    if value.is_nil() {
        return String::new();
    }

    match value {
        Value::Str(_) | Value::Bytes(_) => String::new(),
        Value::Matcher(matcher) => format_matcher_type(matcher),
        Value::Payload(payload) => format_matcher_type(payload.matcher()),
        Value::Message { type_name, .. } => format!(" using {type_name}"),
        Value::Nil => String::new(),
    }
}

fn format_matcher_type(matcher: &Matcher) -> String {
    match matcher {
        Matcher::Exact(_) | Matcher::Fn(_) => String::new(),
        Matcher::Callback(m) => format_matcher_type(&m.matcher()),
        Matcher::Custom(m) => format!(" using {}", m.kind()),
    }
}
