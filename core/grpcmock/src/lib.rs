// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0

//! Building blocks for mocking gRPC services in tests.
//!
//! An [`Expectation`] describes a call the mock is waiting for and how it
//! should answer; the [`format`] module renders expected and actual requests
//! for failure reports; [`invoke_unary`] and [`invoke_server_stream`] drive
//! real calls against any server without generated client stubs.

pub mod delay;
pub mod errors;
pub mod expectation;
pub mod format;
pub mod invoke;
pub mod lock;
pub mod matcher;
pub mod service;
pub mod stream;

pub use delay::{Delay, Signal};
pub use errors::{DelayError, InvokeError, MethodError};
pub use expectation::{Expectation, ExpectationBuilder};
pub use invoke::{InvokeOptions, MethodTarget, invoke_server_stream, invoke_unary, parse_method_url};
pub use lock::LocalRawMutex;
pub use matcher::{
    CallbackMatcher, ExactMatcher, FnMatcher, HeaderMatcher, MatchExpectation, Matcher,
    PayloadMatcher,
};
pub use service::{Method, MethodType};
pub use stream::{HandleFn, RecvAll, StreamHandler, handle_fn, recv_all};
