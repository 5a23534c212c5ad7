// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0

//! Consumers for server-streamed responses.

use std::future::Future;

use futures::{Stream, StreamExt};

use crate::errors::InvokeError;

/// Takes over a response stream once the request has been sent.
///
/// `()` is the empty handler: the stream is dropped without being read.
pub trait StreamHandler<S> {
    fn handle(self, stream: S) -> impl Future<Output = Result<(), InvokeError>> + Send;
}

impl<S> StreamHandler<S> for () {
    fn handle(self, stream: S) -> impl Future<Output = Result<(), InvokeError>> + Send {
        drop(stream);

        async { Ok(()) }
    }
}

/// Collects every message of a stream into a vector, see [`recv_all`]
#[derive(Debug)]
pub struct RecvAll<'a, E> {
    out: &'a mut Vec<E>,
}

/// Drains a stream into `out`.
///
/// Each received message is converted into the element type, so `out` may
/// hold the messages themselves or a wrapper such as `Box<M>` or `Arc<M>`.
/// `out` is replaced only once the stream ends cleanly; a receive error
/// leaves it untouched.
pub fn recv_all<E>(out: &mut Vec<E>) -> RecvAll<'_, E> {
    RecvAll { out }
}

impl<S, M, E> StreamHandler<S> for RecvAll<'_, E>
where
    S: Stream<Item = Result<M, tonic::Status>> + Send,
    M: Send,
    E: From<M> + Send,
{
    fn handle(self, stream: S) -> impl Future<Output = Result<(), InvokeError>> + Send {
        async move {
            let mut stream = std::pin::pin!(stream);
            let mut messages = Vec::new();

            while let Some(message) = stream.next().await {
                let message = message.map_err(InvokeError::Receive)?;
                messages.push(E::from(message));
            }

            tracing::debug!(count = messages.len(), "server stream drained");

            *self.out = messages;

            Ok(())
        }
    }
}

/// Stream handler backed by a closure, see [`handle_fn`]
#[derive(Debug, Clone)]
pub struct HandleFn<F>(F);

/// Turns `|stream| async move { ... }` into a [`StreamHandler`]
pub fn handle_fn<F>(f: F) -> HandleFn<F> {
    HandleFn(f)
}

impl<S, F, Fut> StreamHandler<S> for HandleFn<F>
where
    F: FnOnce(S) -> Fut,
    Fut: Future<Output = Result<(), InvokeError>> + Send,
{
    fn handle(self, stream: S) -> impl Future<Output = Result<(), InvokeError>> + Send {
        (self.0)(stream)
    }
}
