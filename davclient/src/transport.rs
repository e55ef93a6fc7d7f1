// Copyright 2023 Hugo Osvaldo Barrera
//
// SPDX-License-Identifier: EUPL-1.2

//! HTTP transports used by [`DavClient`](crate::dav::DavClient).
use std::time::Duration;

use async_trait::async_trait;
use http::{Request, Response, Uri};
use hyper::{body::Bytes, client::HttpConnector, Body, Client};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};

use crate::dav::DavError;

/// Executes a single HTTP exchange.
///
/// Implementations return whatever response the server sent, regardless of its status code.
/// Errors are reserved for failures where no response was obtained at all.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>, DavError>;
}

/// Transport backed by a `hyper` client.
#[derive(Debug, Clone)]
pub struct HyperTransport {
    client: Client<HttpsConnector<HttpConnector>>,
    timeout: Option<Duration>,
}

impl HyperTransport {
    /// Builds a new transport for requests to `base_url`.
    ///
    /// Only `https` is enabled by default. Plain-text `http` is only enabled if the
    /// input uri has a scheme of `http`.
    #[must_use]
    pub fn new(base_url: &Uri, timeout: Option<Duration>) -> HyperTransport {
        let builder = HttpsConnectorBuilder::new().with_native_roots();
        let builder = match base_url.scheme() {
            Some(scheme) if scheme.as_str() == "http" => builder.https_or_http(),
            _ => builder.https_only(),
        };

        let https = builder.enable_http1().build();
        HyperTransport {
            client: Client::builder().build(https),
            timeout,
        }
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>, DavError> {
        let exchange = async {
            let response = self.client.request(request.map(Body::from)).await?;
            let (head, body) = response.into_parts();
            let body = hyper::body::to_bytes(body).await?;
            Ok::<_, DavError>(Response::from_parts(head, body))
        };

        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, exchange)
                .await
                .map_err(|_| DavError::Timeout(limit))?,
            None => exchange.await,
        }
    }
}
