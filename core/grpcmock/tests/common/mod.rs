// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0

//! In-process `grpcmock.test.ItemService` answering from expectations.

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::body::Body;
use tonic::codec::ProstCodec;
use tonic::codegen::{Body as HttpBody, BoxFuture, Service, StdError, http};
use tonic::metadata::MetadataMap;
use tonic::server::{Grpc, NamedService, ServerStreamingService, UnaryService};
use tonic::transport::Server;
use tonic::{Request, Response, Status};

use slim_grpcmock::format::{Value, format_actual_request};
use slim_grpcmock::matcher::match_headers;
use slim_grpcmock::{Expectation, Method, MethodType};

pub const SERVICE_NAME: &str = "grpcmock.test.ItemService";

#[derive(Clone, PartialEq, prost::Message, serde::Serialize)]
pub struct GetItemRequest {
    #[prost(int32, tag = "1")]
    pub id: i32,
}

#[derive(Clone, PartialEq, prost::Message, serde::Serialize)]
pub struct ListItemsRequest {
    #[prost(int32, tag = "1")]
    pub limit: i32,
}

#[derive(Clone, PartialEq, prost::Message, serde::Serialize)]
pub struct Item {
    #[prost(int32, tag = "1")]
    pub id: i32,
    #[prost(string, tag = "2")]
    pub name: String,
}

pub fn item(id: i32, name: &str) -> Item {
    Item {
        id,
        name: name.to_string(),
    }
}

pub fn get_item_method() -> Method {
    Method::new(SERVICE_NAME, "GetItem", MethodType::Unary)
}

pub fn list_items_method() -> Method {
    Method::new(SERVICE_NAME, "ListItems", MethodType::ServerStream)
}

pub struct Mock {
    pub expectation: Expectation,
    pub items: Vec<Item>,
}

type ItemStream = Pin<Box<dyn Stream<Item = Result<Item, Status>> + Send + 'static>>;

struct MockItemService {
    mocks: Vec<Mock>,
    cancel: CancellationToken,
}

fn metadata_headers(metadata: &MetadataMap) -> HashMap<String, String> {
    metadata
        .clone()
        .into_headers()
        .iter()
        .filter_map(|(key, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (key.to_string(), value.to_string()))
        })
        .collect()
}

impl MockItemService {
    async fn respond<T: serde::Serialize + Sync>(
        &self,
        method: &Method,
        request: &Request<T>,
    ) -> Result<&Mock, Status> {
        let headers = metadata_headers(request.metadata());

        for mock in &self.mocks {
            let expectation = &mock.expectation;

            if expectation.service_method() != method
                || !match_headers(&expectation.header_matcher(), &headers)
            {
                continue;
            }

            if let Some(payload) = expectation.payload_matcher() {
                let matched = payload
                    .matches(request.get_ref())
                    .map_err(|e| Status::internal(e.to_string()))?;
                if !matched {
                    continue;
                }
            }

            expectation.fulfilled();
            expectation
                .wait(&self.cancel)
                .await
                .map_err(|e| Status::cancelled(e.to_string()))?;

            if let Some(status) = expectation.status() {
                return Err(status);
            }

            return Ok(mock);
        }

        let mut report = Vec::new();
        format_actual_request(
            &mut report,
            method,
            &headers,
            Value::message(request.get_ref()),
        )
        .map_err(|e| Status::internal(e.to_string()))?;

        Err(Status::not_found(format!(
            "unexpected request: {}",
            String::from_utf8_lossy(&report)
        )))
    }

    async fn get_item(&self, request: Request<GetItemRequest>) -> Result<Response<Item>, Status> {
        let mock = self.respond(&get_item_method(), &request).await?;

        Ok(Response::new(mock.items.first().cloned().unwrap_or_default()))
    }

    /// Streams up to `limit` items. Asking for more items than the mock holds
    /// keeps the stream open after the last one.
    async fn list_items(
        &self,
        request: Request<ListItemsRequest>,
    ) -> Result<Response<ItemStream>, Status> {
        let limit = request.get_ref().limit as usize;
        let mock = self.respond(&list_items_method(), &request).await?;

        let items: Vec<_> = mock.items.iter().take(limit).cloned().map(Ok).collect();
        let items = futures::stream::iter(items);

        let stream: ItemStream = if limit > mock.items.len() {
            Box::pin(items.chain(futures::stream::pending()))
        } else {
            Box::pin(items)
        };

        Ok(Response::new(stream))
    }
}

struct GetItemSvc(Arc<MockItemService>);

impl UnaryService<GetItemRequest> for GetItemSvc {
    type Response = Item;
    type Future = BoxFuture<Response<Item>, Status>;

    fn call(&mut self, request: Request<GetItemRequest>) -> Self::Future {
        let inner = Arc::clone(&self.0);
        Box::pin(async move { inner.get_item(request).await })
    }
}

struct ListItemsSvc(Arc<MockItemService>);

impl ServerStreamingService<ListItemsRequest> for ListItemsSvc {
    type Response = Item;
    type ResponseStream = ItemStream;
    type Future = BoxFuture<Response<ItemStream>, Status>;

    fn call(&mut self, request: Request<ListItemsRequest>) -> Self::Future {
        let inner = Arc::clone(&self.0);
        Box::pin(async move { inner.list_items(request).await })
    }
}

/// Routes `grpcmock.test.ItemService` paths to the mock
#[derive(Clone)]
struct ItemServiceServer {
    inner: Arc<MockItemService>,
}

impl NamedService for ItemServiceServer {
    const NAME: &'static str = SERVICE_NAME;
}

impl<B> Service<http::Request<B>> for ItemServiceServer
where
    B: HttpBody + Send + 'static,
    B::Error: Into<StdError> + Send + 'static,
{
    type Response = http::Response<Body>;
    type Error = Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let inner = Arc::clone(&self.inner);

        match req.uri().path() {
            "/grpcmock.test.ItemService/GetItem" => Box::pin(async move {
                let mut grpc = Grpc::new(ProstCodec::<Item, GetItemRequest>::default());
                Ok(grpc.unary(GetItemSvc(inner), req).await)
            }),
            "/grpcmock.test.ItemService/ListItems" => Box::pin(async move {
                let mut grpc = Grpc::new(ProstCodec::<Item, ListItemsRequest>::default());
                Ok(grpc.server_streaming(ListItemsSvc(inner), req).await)
            }),
            path => {
                let status = Status::unimplemented(format!("unknown method {path}"));
                Box::pin(async move { Ok(status.into_http()) })
            }
        }
    }
}

/// Serves the mocks on a random local port until the returned token is cancelled.
pub async fn serve(mocks: Vec<Mock>) -> (SocketAddr, CancellationToken) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let token = CancellationToken::new();
    let server = ItemServiceServer {
        inner: Arc::new(MockItemService {
            mocks,
            cancel: token.clone(),
        }),
    };

    let shutdown = token.clone();
    tokio::spawn(async move {
        Server::builder()
            .add_service(server)
            .serve_with_incoming_shutdown(
                TcpListenerStream::new(listener),
                shutdown.cancelled_owned(),
            )
            .await
            .unwrap();
    });

    (addr, token)
}
