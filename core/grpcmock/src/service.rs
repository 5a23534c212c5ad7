// Copyright AGNTCY Contributors (https://github.com/agntcy)
// SPDX-License-Identifier: Apache-2.0

//! Descriptors for the RPC methods an expectation is bound to.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::MethodError;

/// Streaming shape of an RPC method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MethodType {
    #[default]
    Unary,
    ClientStream,
    ServerStream,
    BidirectionalStream,
}

impl MethodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MethodType::Unary => "Unary",
            MethodType::ClientStream => "ClientStream",
            MethodType::ServerStream => "ServerStream",
            MethodType::BidirectionalStream => "BidirectionalStream",
        }
    }

    /// Returns true if the client sends more than one message
    pub fn is_client_streaming(&self) -> bool {
        matches!(
            self,
            MethodType::ClientStream | MethodType::BidirectionalStream
        )
    }

    /// Returns true if the server answers with more than one message
    pub fn is_server_streaming(&self) -> bool {
        matches!(
            self,
            MethodType::ServerStream | MethodType::BidirectionalStream
        )
    }
}

impl fmt::Display for MethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable identification of a service method
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Method {
    /// Fully qualified service name, e.g. `pkg.ItemService`
    pub service_name: String,
    /// Method name, e.g. `GetItem`
    pub method_name: String,
    pub method_type: MethodType,
}

impl Method {
    pub fn new(
        service_name: impl Into<String>,
        method_name: impl Into<String>,
        method_type: MethodType,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            method_name: method_name.into(),
            method_type,
        }
    }

    /// Builds a descriptor from a gRPC path such as `/pkg.Service/Method`.
    ///
    /// The leading slash is optional.
    pub fn from_path(path: &str, method_type: MethodType) -> Result<Self, MethodError> {
        let trimmed = path.trim_start_matches('/');

        match trimmed.split_once('/') {
            Some((service, method))
                if !service.is_empty() && !method.is_empty() && !method.contains('/') =>
            {
                Ok(Self::new(service, method, method_type))
            }
            _ => Err(MethodError::InvalidPath(path.to_string())),
        }
    }

    /// `pkg.Service/Method`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.service_name, self.method_name)
    }

    /// `/pkg.Service/Method`, the HTTP/2 path used on the wire
    pub fn path(&self) -> String {
        format!("/{}", self.full_name())
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method_type, self.full_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_names() {
        let method = Method::new("grpcmock.test.ItemService", "GetItem", MethodType::Unary);

        assert_eq!(method.full_name(), "grpcmock.test.ItemService/GetItem");
        assert_eq!(method.path(), "/grpcmock.test.ItemService/GetItem");
        assert_eq!(method.to_string(), "Unary grpcmock.test.ItemService/GetItem");
    }

    #[test]
    fn test_method_from_path() {
        let method =
            Method::from_path("/grpcmock.test.ItemService/ListItems", MethodType::ServerStream)
                .unwrap();
        assert_eq!(method.service_name, "grpcmock.test.ItemService");
        assert_eq!(method.method_name, "ListItems");
        assert!(method.method_type.is_server_streaming());
        assert!(!method.method_type.is_client_streaming());

        let method = Method::from_path("pkg.Service/Method", MethodType::Unary).unwrap();
        assert_eq!(method.path(), "/pkg.Service/Method");
    }

    #[test]
    fn test_method_from_invalid_path() {
        for path in ["", "/", "/pkg.Service", "/pkg.Service/", "//Method", "/a/b/c"] {
            assert_eq!(
                Method::from_path(path, MethodType::Unary),
                Err(MethodError::InvalidPath(path.to_string())),
                "path {path:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_method_type_display() {
        assert_eq!(MethodType::Unary.to_string(), "Unary");
        assert_eq!(MethodType::ClientStream.to_string(), "ClientStream");
        assert_eq!(MethodType::ServerStream.to_string(), "ServerStream");
        assert_eq!(
            MethodType::BidirectionalStream.to_string(),
            "BidirectionalStream"
        );
    }
}
