// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0

//! Calls any gRPC method given its URL and message types.
//!
//! A method URL carries both the server address and the method path:
//! `http://localhost:50051/pkg.ItemService/GetItem`, or
//! `dns:///localhost:50051/pkg.ItemService/GetItem` for targets without an
//! authority.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use duration_str::deserialize_duration;
use http::uri::PathAndQuery;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::metadata::{Ascii, Binary, MetadataKey, MetadataValue};
use tonic::transport::{Channel, Endpoint};
use url::Url;

use crate::errors::InvokeError;
use crate::stream::StreamHandler;

/// Options applied to every call made by [`invoke_unary`] and [`invoke_server_stream`]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvokeOptions {
    /// Metadata sent with the request. Keys ending in `-bin` are sent as
    /// binary metadata.
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Timeout for establishing the connection, zero disables it.
    #[serde(default, deserialize_with = "deserialize_duration")]
    pub connect_timeout: Duration,

    /// Deadline propagated to the server with each call, zero disables it.
    #[serde(default, deserialize_with = "deserialize_duration")]
    pub request_timeout: Duration,

    /// Already established connection. When set, the target of the method
    /// URL is not dialed.
    #[serde(skip)]
    pub channel: Option<Channel>,
}

impl InvokeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn with_connect_timeout(self, connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            ..self
        }
    }

    pub fn with_request_timeout(self, request_timeout: Duration) -> Self {
        Self {
            request_timeout,
            ..self
        }
    }

    /// Routes calls through an existing channel, e.g. one built with
    /// `Endpoint::connect_with_connector` over an in-memory transport.
    pub fn with_channel(self, channel: Channel) -> Self {
        Self {
            channel: Some(channel),
            ..self
        }
    }

    fn request<T>(&self, message: T) -> Result<tonic::Request<T>, InvokeError> {
        let mut request = tonic::Request::new(message);

        for (key, value) in &self.headers {
            // `-bin` keys carry raw bytes, base64 encoded on the wire
            if key.ends_with("-bin") {
                let name = MetadataKey::<Binary>::from_bytes(key.as_bytes())
                    .map_err(|e| InvokeError::InvalidHeader(format!("{key}: {e}")))?;

                request
                    .metadata_mut()
                    .insert_bin(name, MetadataValue::from_bytes(value.as_bytes()));
                continue;
            }

            let name = MetadataKey::<Ascii>::from_bytes(key.as_bytes())
                .map_err(|e| InvokeError::InvalidHeader(format!("{key}: {e}")))?;
            let value = MetadataValue::try_from(value.as_str())
                .map_err(|e| InvokeError::InvalidHeader(format!("{key}: {e}")))?;

            request.metadata_mut().insert(name, value);
        }

        if !self.request_timeout.is_zero() {
            request.set_timeout(self.request_timeout);
        }

        Ok(request)
    }
}

/// Server address and method path extracted from a method URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodTarget {
    /// Target as written in the URL, e.g. `dns:///localhost:50051`
    pub target: String,
    /// Method path, always starting with a single `/`
    pub method: String,
    scheme: String,
    address: String,
}

impl MethodTarget {
    /// URI dialed to reach the target
    pub fn endpoint_uri(&self) -> String {
        match self.scheme.as_str() {
            "https" => format!("https://{}", self.address),
            _ => format!("http://{}", self.address),
        }
    }
}

/// Splits a method URL into its target and its method path.
pub fn parse_method_url(method_url: &str) -> Result<MethodTarget, InvokeError> {
    let url = Url::parse(method_url)?;
    let scheme = url.scheme().to_string();
    let host = url.host_str().unwrap_or_default();

    let (target, address, path) = if host.is_empty() {
        // `host:port/pkg.Service/Method` parses as an opaque url with `host` as
        // its scheme and no path to take a method from
        let Some(rest) = url
            .path()
            .strip_prefix('/')
            .filter(|_| !url.cannot_be_a_base())
        else {
            return Err(InvokeError::MissingMethod);
        };

        // `scheme:///address/pkg.Service/Method`: the address is the first segment
        let (address, path) = rest.split_once('/').unwrap_or((rest, ""));

        (
            format!("{scheme}:///{address}"),
            address.to_string(),
            path.to_string(),
        )
    } else {
        let mut address = host.to_string();
        if let Some(port) = url.port() {
            address = format!("{address}:{port}");
        }

        let user_info = match (url.username(), url.password()) {
            ("", None) => String::new(),
            (user, None) => format!("{user}@"),
            (user, Some(password)) => format!("{user}:{password}@"),
        };

        (
            format!("{scheme}://{user_info}{address}"),
            address,
            url.path().to_string(),
        )
    };

    if address.is_empty() {
        return Err(InvokeError::MissingTarget);
    }

    let method = format!("/{}", path.trim_start_matches('/'));
    if method == "/" {
        return Err(InvokeError::MissingMethod);
    }

    Ok(MethodTarget {
        target,
        method,
        scheme,
        address,
    })
}

async fn prepare(
    method_url: &str,
    options: &InvokeOptions,
) -> Result<(Grpc<Channel>, PathAndQuery), InvokeError> {
    let target = parse_method_url(method_url)?;
    let path = PathAndQuery::try_from(target.method.as_str())
        .map_err(|e| InvokeError::InvalidMethod(format!("{}: {e}", target.method)))?;

    let channel = match &options.channel {
        Some(channel) => channel.clone(),
        None => {
            tracing::debug!(endpoint = %target.target, "connecting");

            let mut endpoint = Endpoint::from_shared(target.endpoint_uri())?;
            if !options.connect_timeout.is_zero() {
                endpoint = endpoint.connect_timeout(options.connect_timeout);
            }

            endpoint.connect().await?
        }
    };

    let mut client = Grpc::new(channel);
    client.ready().await?;

    Ok((client, path))
}

async fn cancellable<T>(
    cancel: &CancellationToken,
    call: impl Future<Output = Result<T, InvokeError>>,
) -> Result<T, InvokeError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(InvokeError::Cancelled),
        res = call => res,
    }
}

/// Performs a unary call and returns the decoded response.
pub async fn invoke_unary<Req, Res>(
    cancel: &CancellationToken,
    method_url: &str,
    request: Req,
    options: &InvokeOptions,
) -> Result<Res, InvokeError>
where
    Req: prost::Message + Send + Sync + 'static,
    Res: prost::Message + Default + Send + Sync + 'static,
{
    cancellable(cancel, async {
        let (mut client, path) = prepare(method_url, options).await?;
        let request = options.request(request)?;

        tracing::debug!(method = %path, "invoking unary method");

        let response = client
            .unary(request, path, ProstCodec::<Req, Res>::default())
            .await?;

        Ok(response.into_inner())
    })
    .await
}

/// Opens a server-streaming call, sends `request` and closes the sending
/// side, then passes the response stream to `handle`.
///
/// With `()` as the handler the stream is dropped unread.
pub async fn invoke_server_stream<Req, Res, H>(
    cancel: &CancellationToken,
    method_url: &str,
    request: Req,
    handle: H,
    options: &InvokeOptions,
) -> Result<(), InvokeError>
where
    Req: prost::Message + Send + Sync + 'static,
    Res: prost::Message + Default + Send + Sync + 'static,
    H: StreamHandler<tonic::Streaming<Res>>,
{
    cancellable(cancel, async {
        let (mut client, path) = prepare(method_url, options).await?;
        let request = options.request(request)?;

        tracing::debug!(method = %path, "invoking server stream method");

        let response = client
            .server_streaming(request, path, ProstCodec::<Req, Res>::default())
            .await?;

        handle.handle(response.into_inner()).await
    })
    .await
}
