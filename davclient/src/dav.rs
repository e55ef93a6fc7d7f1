// Copyright 2023 Hugo Osvaldo Barrera
//
// SPDX-License-Identifier: EUPL-1.2

//! Generic webdav implementation.
//!
//! [`DavClient`] sends `PROPFIND`, `PROPPATCH` and `MKCOL` requests and decodes `207
//! Multi-Status` responses. It does not judge response status codes: any response that was
//! received is returned to the caller, who decides what counts as a failure.
use std::{fmt, io, str::FromStr, sync::Arc, time::Duration};

use futures::future::{AbortRegistration, Abortable, Aborted};
use http::{
    header::CONTENT_TYPE, uri::PathAndQuery, HeaderMap, Method, Request, StatusCode, Uri,
};
use hyper::body::Bytes;
use log::debug;
use percent_encoding::{percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::{
    auth::{Auth, AuthError, AuthExt},
    builder::{ClientBuilder, NeedsUri},
    multistatus::parse_multistatus,
    names::{ClarkName, Schema},
    record::ResourceRecord,
    transport::Transport,
    xmlutils::{render_mkcol, render_propertyupdate, render_propfind},
};

/// Characters that are escaped for hrefs.
const DISALLOWED_FOR_HREF: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'.')
    .remove(b'-')
    .remove(b'_')
    .remove(b'~');

const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";

/// Builds one of the webdav-specific methods.
fn dav_method(name: &'static [u8]) -> Method {
    Method::from_bytes(name).expect("webdav method names are valid tokens")
}

/// Copies all of `extra` into `target`.
///
/// Every value of a header in `extra` is kept, and replaces all values of that header in `target`.
pub fn merge_headers(target: &mut HeaderMap, extra: &HeaderMap) {
    for name in extra.keys() {
        target.remove(name);
    }
    for (name, value) in extra {
        target.append(name, value.clone());
    }
}

/// A generic error for WebDav operations.
///
/// None of these variants represent a server's refusal; see [`DavResponse::status`] for that.
#[derive(thiserror::Error, Debug)]
pub enum DavError {
    #[error("http error executing request")]
    Network(#[from] hyper::Error),

    #[error("no response received within {0:?}")]
    Timeout(Duration),

    #[error("the request was aborted")]
    Aborted,

    #[error("no URL given for the request")]
    MissingUrl,

    #[error("failed to build URL or request with the given input")]
    InvalidInput(#[from] http::Error),

    #[error("could not parse XML response")]
    Xml(#[from] roxmltree::Error),

    #[error("could not decode response as utf-8")]
    NotUtf8(#[from] std::str::Utf8Error),

    #[error("the server returned an invalid response: {0}")]
    InvalidResponse(Box<dyn std::error::Error + Send + Sync>),

    #[error("internal error with specified authentication")]
    Auth(#[from] AuthError),
}

impl From<Aborted> for DavError {
    fn from(_: Aborted) -> Self {
        DavError::Aborted
    }
}

impl From<DavError> for io::Error {
    fn from(value: DavError) -> Self {
        match value {
            DavError::Network(_) => io::Error::new(io::ErrorKind::Other, value),
            DavError::Timeout(_) => io::Error::new(io::ErrorKind::TimedOut, value),
            DavError::Aborted => io::Error::new(io::ErrorKind::Interrupted, value),
            DavError::MissingUrl | DavError::InvalidInput(_) | DavError::Auth(_) => {
                io::Error::new(io::ErrorKind::InvalidInput, value)
            }
            DavError::Xml(_) | DavError::NotUtf8(_) | DavError::InvalidResponse(_) => {
                io::Error::new(io::ErrorKind::InvalidData, value)
            }
        }
    }
}

/// Value of the `Depth` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Depth {
    /// Only the resource itself.
    #[default]
    Zero,
    /// The resource and its immediate children.
    One,
    /// The resource and all its descendants.
    Infinity,
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Depth::Zero => "0",
            Depth::One => "1",
            Depth::Infinity => "infinity",
        })
    }
}

#[derive(thiserror::Error, Debug)]
#[error("depth must be one of 0, 1 or infinity; got {0:?}")]
pub struct InvalidDepth(String);

impl FromStr for Depth {
    type Err = InvalidDepth;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0" => Ok(Depth::Zero),
            "1" => Ok(Depth::One),
            "infinity" => Ok(Depth::Infinity),
            other => Err(InvalidDepth(other.to_string())),
        }
    }
}

/// Decoded body of a response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// The single resource returned by a `PROPFIND` with depth `0`.
    Resource(ResourceRecord),
    /// All resources in a `207 Multi-Status` response, in the order returned by the server.
    Multistatus(Vec<ResourceRecord>),
    /// Body of any response which is not `207 Multi-Status`.
    Raw(Bytes),
}

/// A response received from the server.
#[derive(Debug, Clone)]
pub struct DavResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ResponseBody,
    /// The body exactly as received.
    pub raw: Bytes,
}

impl DavResponse {
    /// Returns true if the status code is in the `2xx` range.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// A generic webdav client.
///
/// The client holds no per-resource state. Namespace prefixes and property keys are provided on
/// each call via a [`Schema`].
#[derive(Debug, Clone)]
pub struct DavClient {
    /// Base URL to be used for all requests.
    pub(crate) base_url: Uri,
    auth: Auth,
    /// Sent with every request.
    headers: HeaderMap,
    transport: Arc<dyn Transport>,
}

impl DavClient {
    /// Creates a new builder. See [`ClientBuilder`] for details.
    #[must_use]
    pub fn builder() -> ClientBuilder<NeedsUri> {
        ClientBuilder::new()
    }

    pub(crate) fn new(
        base_url: Uri,
        auth: Auth,
        headers: HeaderMap,
        transport: Arc<dyn Transport>,
    ) -> DavClient {
        DavClient {
            base_url,
            auth,
            headers,
            transport,
        }
    }

    /// Returns the URL against which relative hrefs are resolved.
    #[must_use]
    pub fn base_url(&self) -> &Uri {
        &self.base_url
    }

    /// Resolves `href` into an absolute URL.
    ///
    /// Absolute URLs are returned unchanged. Anything else is taken as a path on the server of the
    /// base URL. The path must not be URL-encoded; a `?query` suffix is kept as-is.
    ///
    /// # Errors
    ///
    /// If `href` is empty, or the resulting URL is not valid.
    pub fn resolve(&self, href: &str) -> Result<Uri, DavError> {
        if href.is_empty() {
            return Err(DavError::MissingUrl);
        }
        let (path, query) = match href.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (href, None),
        };
        // A query may itself carry a URL.
        if path.contains("://") {
            return Uri::try_from(href).map_err(|e| DavError::InvalidInput(e.into()));
        }

        let mut path = percent_encode(path.as_bytes(), DISALLOWED_FOR_HREF).to_string();
        if !path.starts_with('/') {
            let base = self.base_url.path();
            let separator = if base.ends_with('/') { "" } else { "/" };
            path = format!("{base}{separator}{path}");
        }
        if let Some(query) = query {
            path.push('?');
            path.push_str(query);
        }

        let mut parts = self.base_url.clone().into_parts();
        parts.path_and_query =
            Some(PathAndQuery::try_from(path.as_str()).map_err(|e| DavError::InvalidInput(e.into()))?);
        Uri::from_parts(parts).map_err(|e| DavError::InvalidInput(e.into()))
    }

    /// Returns a request builder with authentication and all headers set.
    ///
    /// Headers in `extra` replace any default header with the same name.
    fn request_builder(
        &self,
        method: Method,
        url: &Uri,
        extra: &HeaderMap,
    ) -> Result<http::request::Builder, DavError> {
        let mut headers = self.headers.clone();
        merge_headers(&mut headers, extra);

        let mut builder = Request::builder()
            .method(method)
            .uri(url)
            .authenticate(&self.auth)?;
        if let Some(map) = builder.headers_mut() {
            map.extend(headers);
        }
        Ok(builder)
    }

    /// Sends a `PROPFIND` request.
    ///
    /// If `properties` is empty, all properties in `schema` are requested. With [`Depth::Zero`],
    /// a `207 Multi-Status` body is returned as a single [`ResponseBody::Resource`]. With any other
    /// depth, all resources are returned, including the one which was queried.
    ///
    /// # Errors
    ///
    /// If there are network errors, or a `207` response cannot be parsed.
    pub async fn propfind(
        &self,
        url: &Uri,
        properties: &[ClarkName],
        depth: Depth,
        headers: &HeaderMap,
        schema: &Schema,
    ) -> Result<DavResponse, DavError> {
        let body = if properties.is_empty() {
            let all = schema.properties.names().cloned().collect::<Vec<_>>();
            render_propfind(&all, &schema.namespaces)
        } else {
            render_propfind(properties, &schema.namespaces)
        };

        let request = self
            .request_builder(dav_method(b"PROPFIND"), url, headers)?
            .header(CONTENT_TYPE, XML_CONTENT_TYPE)
            .header("Depth", depth.to_string())
            .body(Bytes::from(body))?;

        let mut response = self.exchange(request, schema).await?;
        if depth == Depth::Zero {
            if let ResponseBody::Multistatus(records) = &mut response.body {
                if !records.is_empty() {
                    response.body = ResponseBody::Resource(records.remove(0));
                }
            }
        }
        Ok(response)
    }

    /// Sends a `PROPPATCH` request setting each property to its value.
    ///
    /// The resource is not fetched again afterwards.
    ///
    /// # Errors
    ///
    /// If there are network errors, or a `207` response cannot be parsed.
    pub async fn proppatch(
        &self,
        url: &Uri,
        properties: &[(ClarkName, String)],
        headers: &HeaderMap,
        schema: &Schema,
    ) -> Result<DavResponse, DavError> {
        let request = self
            .request_builder(dav_method(b"PROPPATCH"), url, headers)?
            .header(CONTENT_TYPE, XML_CONTENT_TYPE)
            .body(Bytes::from(render_propertyupdate(properties, &schema.namespaces)))?;

        self.exchange(request, schema).await
    }

    /// Creates a collection at `url`.
    ///
    /// When `properties` are provided, this executes an [Extended
    /// MKCOL](https://www.rfc-editor.org/rfc/rfc5689) which creates the collection and sets the
    /// properties in a single request. Otherwise, the request has no body.
    ///
    /// # Errors
    ///
    /// If there are network errors, or a `207` response cannot be parsed.
    pub async fn mkcol(
        &self,
        url: &Uri,
        properties: Option<&[(ClarkName, String)]>,
        headers: &HeaderMap,
        schema: &Schema,
    ) -> Result<DavResponse, DavError> {
        let builder = self.request_builder(dav_method(b"MKCOL"), url, headers)?;
        let request = match properties {
            Some(properties) => builder
                .header(CONTENT_TYPE, XML_CONTENT_TYPE)
                .body(Bytes::from(render_mkcol(properties, &schema.namespaces)))?,
            None => builder.body(Bytes::new())?,
        };

        self.exchange(request, schema).await
    }

    /// Sends an arbitrary request.
    ///
    /// A `207 Multi-Status` response body is decoded; any other body is returned as-is.
    ///
    /// # Errors
    ///
    /// If there are network errors, or a `207` response cannot be parsed.
    pub async fn request(
        &self,
        method: Method,
        url: &Uri,
        headers: &HeaderMap,
        body: Bytes,
        schema: &Schema,
    ) -> Result<DavResponse, DavError> {
        let request = self.request_builder(method, url, headers)?.body(body)?;
        self.exchange(request, schema).await
    }

    /// Same as [`DavClient::request`], but may be cancelled via the `AbortHandle` paired with
    /// `registration`.
    ///
    /// # Errors
    ///
    /// Returns [`DavError::Aborted`] if cancelled before completion. Otherwise, same as
    /// [`DavClient::request`].
    pub async fn request_abortable(
        &self,
        method: Method,
        url: &Uri,
        headers: &HeaderMap,
        body: Bytes,
        schema: &Schema,
        registration: AbortRegistration,
    ) -> Result<DavResponse, DavError> {
        Abortable::new(self.request(method, url, headers, body, schema), registration).await?
    }

    // Internal wrapper around the transport that logs all responses and decodes multistatus.
    async fn exchange(
        &self,
        request: Request<Bytes>,
        schema: &Schema,
    ) -> Result<DavResponse, DavError> {
        let method = request.method().clone();
        let uri = request.uri().clone();

        let (head, raw) = self.transport.send(request).await?.into_parts();
        debug!("Response to {method} {uri} ({}): {:?}", head.status, raw);

        let body = if head.status == StatusCode::MULTI_STATUS {
            ResponseBody::Multistatus(parse_multistatus(&raw, &schema.properties)?)
        } else {
            ResponseBody::Raw(raw.clone())
        };

        Ok(DavResponse {
            status: head.status,
            headers: head.headers,
            body,
            raw,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::future::AbortHandle;
    use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
    use hyper::body::Bytes;

    use crate::{
        auth::Auth,
        dav::{merge_headers, DavClient, DavError, Depth, ResponseBody},
        mock::MockTransport,
        names::{ClarkName, NamespaceMap, PropertyMap, Schema, DAV},
        record::Value,
    };

    const OC: &str = "http://owncloud.org/ns";

    const LISTING: &str = r#"<?xml version="1.0"?>
<d:multistatus xmlns:d="DAV:" xmlns:oc="http://owncloud.org/ns">
    <d:response>
        <d:href>/remote.php/dav/systemtags/</d:href>
        <d:propstat>
            <d:prop><d:resourcetype><d:collection/></d:resourcetype></d:prop>
            <d:status>HTTP/1.1 200 OK</d:status>
        </d:propstat>
    </d:response>
    <d:response>
        <d:href>/remote.php/dav/systemtags/1</d:href>
        <d:propstat>
            <d:prop><oc:id>1</oc:id><oc:display-name>important</oc:display-name></d:prop>
            <d:status>HTTP/1.1 200 OK</d:status>
        </d:propstat>
    </d:response>
</d:multistatus>"#;

    fn schema() -> Schema {
        Schema::new(
            NamespaceMap::new([(OC, "oc")]),
            PropertyMap::from_iter([
                ("id", ClarkName::new(OC, "id")),
                ("name", ClarkName::new(OC, "display-name")),
            ]),
        )
    }

    fn client(transport: &Arc<MockTransport>) -> DavClient {
        DavClient::builder()
            .with_uri(Uri::from_static("https://cloud.example.com/remote.php/dav/"))
            .with_auth(Auth::None)
            .with_header(
                HeaderName::from_static("requesttoken"),
                HeaderValue::from_static("csrf-token"),
            )
            .with_transport(transport.clone())
            .build()
    }

    #[test]
    fn test_resolve() {
        let transport = Arc::new(MockTransport::new());
        let client = client(&transport);

        assert_eq!(
            client.resolve("/remote.php/dav/systemtags/").unwrap(),
            "https://cloud.example.com/remote.php/dav/systemtags/"
        );
        assert_eq!(
            client.resolve("comments/files/12").unwrap(),
            "https://cloud.example.com/remote.php/dav/comments/files/12"
        );
        assert_eq!(
            client.resolve("/files/user/my report.pdf?download=1").unwrap(),
            "https://cloud.example.com/files/user/my%20report.pdf?download=1"
        );
        assert_eq!(
            client.resolve("https://other.example.com/dav/").unwrap(),
            "https://other.example.com/dav/"
        );
        assert_eq!(
            client.resolve("files/a?next=https://x").unwrap(),
            "https://cloud.example.com/remote.php/dav/files/a?next=https://x"
        );
        assert!(matches!(client.resolve(""), Err(DavError::MissingUrl)));
    }

    #[test]
    fn test_merge_headers_keeps_all_values() {
        let mut target = HeaderMap::new();
        target.insert("requesttoken", HeaderValue::from_static("csrf-token"));
        target.insert("depth", HeaderValue::from_static("0"));

        let mut extra = HeaderMap::new();
        extra.append("requesttoken", HeaderValue::from_static("a"));
        extra.append("requesttoken", HeaderValue::from_static("b"));
        merge_headers(&mut target, &extra);

        let values = target.get_all("requesttoken").iter().collect::<Vec<_>>();
        assert_eq!(values, vec!["a", "b"]);
        assert_eq!(target["depth"], "0");
    }

    #[tokio::test]
    async fn test_per_call_headers_replace_defaults() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(StatusCode::NO_CONTENT, "");
        let client = client(&transport);
        let url = client.resolve("/remote.php/dav/systemtags/1").unwrap();

        let mut headers = HeaderMap::new();
        headers.append("requesttoken", HeaderValue::from_static("first"));
        headers.append("requesttoken", HeaderValue::from_static("second"));
        client
            .request(Method::DELETE, &url, &headers, Bytes::new(), &schema())
            .await
            .unwrap();

        let request = &transport.requests()[0];
        let values = request
            .headers
            .get_all("requesttoken")
            .iter()
            .collect::<Vec<_>>();
        assert_eq!(values, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_propfind_depth_zero_returns_single_record() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(StatusCode::MULTI_STATUS, LISTING);
        let client = client(&transport);
        let url = client.resolve("/remote.php/dav/systemtags/").unwrap();

        let response = client
            .propfind(&url, &[], Depth::Zero, &HeaderMap::new(), &schema())
            .await
            .unwrap();

        let record = match response.body {
            ResponseBody::Resource(record) => record,
            other => panic!("expected a single resource, got {other:?}"),
        };
        assert_eq!(record.href, "/remote.php/dav/systemtags/");
        assert_eq!(record.id, "systemtags");

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.method.as_str(), "PROPFIND");
        assert_eq!(request.headers["Depth"], "0");
        assert_eq!(
            request.headers["Content-Type"],
            "application/xml; charset=utf-8"
        );
        assert_eq!(request.headers["requesttoken"], "csrf-token");
        // All properties in the schema are requested by default.
        assert_eq!(
            request.body,
            concat!(
                r#"<?xml version="1.0"?><d:propfind xmlns:d="DAV:" xmlns:oc="http://owncloud.org/ns">"#,
                r#"<d:prop><oc:id/><oc:display-name/></d:prop></d:propfind>"#
            )
        );
    }

    #[tokio::test]
    async fn test_propfind_depth_one_keeps_collection() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(StatusCode::MULTI_STATUS, LISTING);
        let client = client(&transport);
        let url = client.resolve("/remote.php/dav/systemtags/").unwrap();

        let response = client
            .propfind(
                &url,
                &[ClarkName::new(DAV, "resourcetype")],
                Depth::One,
                &HeaderMap::new(),
                &schema(),
            )
            .await
            .unwrap();

        let records = match response.body {
            ResponseBody::Multistatus(records) => records,
            other => panic!("expected multistatus, got {other:?}"),
        };
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].href, "/remote.php/dav/systemtags/");
        assert_eq!(records[1].properties["name"], Value::from("important"));
        assert_eq!(transport.requests()[0].headers["Depth"], "1");
    }

    #[tokio::test]
    async fn test_failures_are_returned_not_raised() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(StatusCode::NOT_FOUND, "nope");
        let client = client(&transport);
        let url = client.resolve("/remote.php/dav/systemtags/9").unwrap();

        let response = client
            .proppatch(
                &url,
                &[(ClarkName::new(OC, "display-name"), "x".to_string())],
                &HeaderMap::new(),
                &schema(),
            )
            .await
            .unwrap();

        assert!(!response.is_success());
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.body, ResponseBody::Raw(Bytes::from_static(b"nope")));
    }

    #[tokio::test]
    async fn test_mkcol_bodies() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(StatusCode::CREATED, "");
        transport.respond(StatusCode::CREATED, "");
        let client = client(&transport);
        let url = client.resolve("/remote.php/dav/calendars/user/new/").unwrap();

        client
            .mkcol(&url, None, &HeaderMap::new(), &schema())
            .await
            .unwrap();
        let properties = vec![(
            ClarkName::new(DAV, "resourcetype"),
            "<d:collection/>".to_string(),
        )];
        client
            .mkcol(
                &url,
                Some(properties.as_slice()),
                &HeaderMap::new(),
                &schema(),
            )
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].method.as_str(), "MKCOL");
        assert_eq!(requests[0].body, "");
        assert!(requests[0].headers.get("Content-Type").is_none());
        assert!(requests[1]
            .body
            .contains("<d:resourcetype><d:collection/></d:resourcetype>"));
    }

    #[tokio::test]
    async fn test_transport_errors_are_raised() {
        let transport = Arc::new(MockTransport::new());
        transport.time_out();
        let client = client(&transport);
        let url = client.resolve("/remote.php/dav/systemtags/").unwrap();

        let err = client
            .request(
                Method::DELETE,
                &url,
                &HeaderMap::new(),
                Bytes::new(),
                &schema(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DavError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_request_abortable() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(StatusCode::NO_CONTENT, "");
        let client = client(&transport);
        let url = client.resolve("/remote.php/dav/systemtags/1").unwrap();

        let (handle, registration) = AbortHandle::new_pair();
        handle.abort();
        let err = client
            .request_abortable(
                Method::DELETE,
                &url,
                &HeaderMap::new(),
                Bytes::new(),
                &schema(),
                registration,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DavError::Aborted));
        assert!(transport.requests().is_empty());
    }
}
