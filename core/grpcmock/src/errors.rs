// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InvokeError {
    #[error("could not parse method url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("missing method")]
    MissingMethod,
    #[error("missing target address in method url")]
    MissingTarget,
    #[error("invalid method path: {0}")]
    InvalidMethod(String),
    #[error("invalid header {0}")]
    InvalidHeader(String),
    #[error(transparent)]
    Transport(#[from] tonic::transport::Error),
    #[error(transparent)]
    Status(#[from] tonic::Status),
    #[error("could not receive message: {0}")]
    Receive(#[source] tonic::Status),
    #[error("invocation cancelled")]
    Cancelled,
}

impl InvokeError {
    /// Status code carried by the error, if the server produced one.
    pub fn code(&self) -> Option<tonic::Code> {
        match self {
            InvokeError::Status(status) | InvokeError::Receive(status) => Some(status.code()),
            _ => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DelayError {
    #[error("delay cancelled")]
    Cancelled,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MethodError {
    #[error("invalid service method: {0}")]
    InvalidPath(String),
}
