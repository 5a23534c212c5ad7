// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0

//! Expectation records shared by concurrent call handlers.

use std::fmt;
use std::time::Duration;

use parking_lot::lock_api::{Mutex, RawMutex};
use tokio_util::sync::CancellationToken;
use tonic::Code;

use crate::delay::Delay;
use crate::errors::DelayError;
use crate::format::format_expected_request;
use crate::matcher::{HeaderMatcher, Matcher, PayloadMatcher};
use crate::service::Method;

/// Mutable part of an expectation, only touched under the lock
#[derive(Debug)]
struct State {
    header: HeaderMatcher,
    /// Remaining matches, 0 means unlimited
    repeat_times: usize,
    fulfilled_times: usize,
}

/// A call the mock waits for and the answer it gives.
///
/// Header matcher and call counters sit behind a lock of type `R`. The
/// default is `parking_lot::RawMutex`; single-threaded tests may use
/// [`crate::LocalRawMutex`] instead.
pub struct Expectation<R: RawMutex = parking_lot::RawMutex> {
    method: Method,
    payload: Option<PayloadMatcher>,
    status_code: Code,
    status_message: String,
    delay: Delay,
    state: Mutex<R, State>,
}

impl Expectation {
    pub fn builder(method: Method) -> ExpectationBuilder {
        ExpectationBuilder::new(method)
    }
}

impl<R: RawMutex> Expectation<R> {
    pub fn service_method(&self) -> &Method {
        &self.method
    }

    pub fn header_matcher(&self) -> HeaderMatcher {
        self.state.lock().header.clone()
    }

    pub fn payload_matcher(&self) -> Option<&PayloadMatcher> {
        self.payload.as_ref()
    }

    /// Number of matches left, 0 when unlimited
    pub fn remain_times(&self) -> usize {
        self.state.lock().repeat_times
    }

    pub fn fulfilled_times(&self) -> usize {
        self.state.lock().fulfilled_times
    }

    /// Records one successful match
    pub fn fulfilled(&self) {
        let mut state = self.state.lock();

        if state.repeat_times > 0 {
            state.repeat_times -= 1;
        }

        state.fulfilled_times += 1;

        tracing::debug!(
            method = %self.method.full_name(),
            remaining = state.repeat_times,
            fulfilled = state.fulfilled_times,
            "expectation fulfilled"
        );
    }

    /// Changes how many more matches are allowed, 0 meaning unlimited
    pub fn set_times(&self, times: usize) {
        self.state.lock().repeat_times = times;
    }

    pub fn status_code(&self) -> Code {
        self.status_code
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    /// Error to answer with, `None` when the call succeeds
    pub fn status(&self) -> Option<tonic::Status> {
        if self.status_code == Code::Ok {
            return None;
        }

        Some(tonic::Status::new(
            self.status_code,
            self.status_message.clone(),
        ))
    }

    pub fn delay(&self) -> &Delay {
        &self.delay
    }

    /// Holds the caller for the configured delay
    pub async fn wait(&self, cancel: &CancellationToken) -> Result<(), DelayError> {
        self.delay.wait(cancel).await
    }
}

impl<R: RawMutex> fmt::Display for Expectation<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = self.header_matcher();
        let (total, remaining) = {
            let state = self.state.lock();
            (state.fulfilled_times, state.repeat_times)
        };

        let mut buf = Vec::new();
        format_expected_request(
            &mut buf,
            &self.method,
            &header,
            self.payload.as_ref(),
            total,
            remaining,
        )
        .map_err(|_| fmt::Error)?;

        f.write_str(&String::from_utf8_lossy(&buf))
    }
}

impl<R: RawMutex> fmt::Debug for Expectation<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expectation")
            .field("method", &self.method)
            .field("payload", &self.payload)
            .field("status_code", &self.status_code)
            .field("status_message", &self.status_message)
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

/// Configures an [`Expectation`] before it is handed to a mock server
#[derive(Debug)]
pub struct ExpectationBuilder {
    method: Method,
    header: HeaderMatcher,
    payload: Option<PayloadMatcher>,
    status_code: Code,
    status_message: String,
    delay: Delay,
    repeat_times: usize,
}

impl ExpectationBuilder {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            header: HeaderMatcher::new(),
            payload: None,
            status_code: Code::Ok,
            status_message: String::new(),
            delay: Delay::NoWait,
            repeat_times: 0,
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, matcher: impl Into<Matcher>) -> Self {
        self.header.insert(key.into(), matcher.into());
        self
    }

    pub fn with_headers(mut self, header: HeaderMatcher) -> Self {
        self.header.extend(header);
        self
    }

    pub fn with_payload(self, matcher: impl Into<Matcher>) -> Self {
        Self {
            payload: Some(PayloadMatcher::new(matcher)),
            ..self
        }
    }

    pub fn return_code(self, code: Code) -> Self {
        Self {
            status_code: code,
            ..self
        }
    }

    pub fn return_error(self, code: Code, message: impl Into<String>) -> Self {
        Self {
            status_code: code,
            status_message: message.into(),
            ..self
        }
    }

    pub fn times(self, times: usize) -> Self {
        Self {
            repeat_times: times,
            ..self
        }
    }

    pub fn once(self) -> Self {
        self.times(1)
    }

    pub fn twice(self) -> Self {
        self.times(2)
    }

    pub fn unlimited(self) -> Self {
        self.times(0)
    }

    /// Holds matched calls until the gate fires, see [`crate::Signal`]
    pub fn wait_until(self, delay: Delay) -> Self {
        Self { delay, ..self }
    }

    pub fn after(self, duration: Duration) -> Self {
        Self {
            delay: Delay::Duration(duration),
            ..self
        }
    }

    pub fn build(self) -> Expectation {
        self.build_with_lock()
    }

    pub fn build_with_lock<R: RawMutex>(self) -> Expectation<R> {
        Expectation {
            method: self.method,
            payload: self.payload,
            status_code: self.status_code,
            status_message: self.status_message,
            delay: self.delay,
            state: Mutex::new(State {
                header: self.header,
                repeat_times: self.repeat_times,
                fulfilled_times: 0,
            }),
        }
    }
}
