// Copyright 2023 Hugo Osvaldo Barrera
//
// SPDX-License-Identifier: EUPL-1.2

//! Builder for [`DavClient`].
use std::{sync::Arc, time::Duration};

use http::{HeaderMap, HeaderName, HeaderValue, Uri};

use crate::{
    auth::Auth,
    dav::DavClient,
    transport::{HyperTransport, Transport},
};

pub struct NeedsUri(pub(crate) ());
pub struct NeedsAuth {
    pub(crate) uri: Uri,
}
pub struct Ready {
    pub(crate) uri: Uri,
    pub(crate) auth: Auth,
    pub(crate) headers: HeaderMap,
    pub(crate) timeout: Option<Duration>,
    pub(crate) transport: Option<Arc<dyn Transport>>,
}

/// Builds a [`DavClient`]. Created via [`DavClient::builder`].
///
/// ```no_run
/// # use davclient::{auth::Auth, dav::DavClient};
/// # use http::{HeaderName, HeaderValue, Uri};
/// let client = DavClient::builder()
///     .with_uri(Uri::from_static("https://cloud.example.com/remote.php/dav/"))
///     .with_auth(Auth::None)
///     .with_header(
///         HeaderName::from_static("x-requested-with"),
///         HeaderValue::from_static("XMLHttpRequest"),
///     )
///     .build();
/// assert_eq!(client.base_url().host(), Some("cloud.example.com"));
/// ```
pub struct ClientBuilder<State> {
    pub(crate) state: State,
}

impl ClientBuilder<NeedsUri> {
    pub(crate) fn new() -> ClientBuilder<NeedsUri> {
        ClientBuilder {
            state: NeedsUri(()),
        }
    }

    /// Sets the base URL against which relative hrefs are resolved.
    pub fn with_uri(self, uri: Uri) -> ClientBuilder<NeedsAuth> {
        ClientBuilder {
            state: NeedsAuth { uri },
        }
    }
}

impl ClientBuilder<NeedsAuth> {
    /// Sets the authentication type and credentials.
    pub fn with_auth(self, auth: Auth) -> ClientBuilder<Ready> {
        ClientBuilder {
            state: Ready {
                uri: self.state.uri,
                auth,
                headers: HeaderMap::new(),
                timeout: None,
                transport: None,
            },
        }
    }
}

impl ClientBuilder<Ready> {
    /// Adds a header sent with every request (e.g.: a CSRF token).
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.state.headers.insert(name, value);
        self
    }

    /// Adds headers sent with every request.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.state.headers.extend(headers);
        self
    }

    /// Sets a limit for each individual request, including reading the response body.
    ///
    /// Only applies to the default transport.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.state.timeout = Some(timeout);
        self
    }

    /// Uses a custom transport instead of the default `hyper` client.
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.state.transport = Some(transport);
        self
    }

    /// Return a built client.
    pub fn build(self) -> DavClient {
        let Ready {
            uri,
            auth,
            headers,
            timeout,
            transport,
        } = self.state;
        let transport =
            transport.unwrap_or_else(|| Arc::new(HyperTransport::new(&uri, timeout)));
        DavClient::new(uri, auth, headers, transport)
    }
}
