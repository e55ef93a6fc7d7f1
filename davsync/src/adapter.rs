// Copyright 2023 Hugo Osvaldo Barrera
//
// SPDX-License-Identifier: EUPL-1.2

use davclient::{
    dav::{merge_headers, DavClient, DavResponse, Depth, ResponseBody},
    record::{Attributes, ResourceRecord},
};
use futures::future::{AbortHandle, AbortRegistration, Abortable};
use http::{header::CONTENT_TYPE, HeaderMap, HeaderValue, Method, Uri};
use hyper::body::Bytes;
use log::debug;

use crate::{
    operation::{dav_method, OperationKind, SyncOperation},
    payload::{echo, json_body, property_set},
    SyncError,
};

const JSON_CONTENT_TYPE: &str = "application/json";

/// Result of a successful operation.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Attributes of a resource written with `PUT` or `POST`.
    ///
    /// These are the submitted attributes, with anything the server returned merged on top.
    Record(Attributes),
    /// A single resource, as read with depth `0`.
    Resource(ResourceRecord),
    /// Resources from a `207 Multi-Status` response.
    ///
    /// For reads with a depth other than `0`, the queried resource itself is not included.
    Resources(Vec<ResourceRecord>),
    /// Any other response body.
    Raw(Bytes),
}

/// Executes [`SyncOperation`]s against a webdav server.
///
/// Each operation results in a single request, except updates to extended collections, which
/// create the collection with `MKCOL` and then set its properties with `PROPPATCH`. Failed
/// requests are never retried.
#[derive(Debug, Clone)]
pub struct SyncAdapter {
    client: DavClient,
}

impl SyncAdapter {
    #[must_use]
    pub fn new(client: DavClient) -> SyncAdapter {
        SyncAdapter { client }
    }

    #[must_use]
    pub fn client(&self) -> &DavClient {
        &self.client
    }

    /// Executes a single operation.
    ///
    /// # Errors
    ///
    /// - [`SyncError::InvalidUrl`] if the URL cannot be resolved. No request is sent.
    /// - [`SyncError::MissingPayload`] for writes without a payload. No request is sent.
    /// - [`SyncError::Status`] if the server responds with a non-2xx status.
    /// - [`SyncError::Transport`] for network errors or unparsable responses.
    /// - [`SyncError::MissingId`] if a returned resource has no id.
    pub async fn sync(&self, operation: SyncOperation<'_>) -> Result<SyncOutcome, SyncError> {
        self.run(operation, None).await
    }

    /// Same as [`SyncAdapter::sync`], but may be cancelled via `handle`.
    ///
    /// `registration` must be the one paired with `handle`. If cancelled while an extended
    /// collection is being created, the `PROPPATCH` is not sent.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Aborted`] if cancelled before completion. Otherwise, same as
    /// [`SyncAdapter::sync`].
    pub async fn sync_abortable(
        &self,
        operation: SyncOperation<'_>,
        handle: AbortHandle,
        registration: AbortRegistration,
    ) -> Result<SyncOutcome, SyncError> {
        Abortable::new(self.run(operation, Some(&handle)), registration)
            .await
            .map_err(|_| SyncError::Aborted)?
    }

    async fn run(
        &self,
        operation: SyncOperation<'_>,
        handle: Option<&AbortHandle>,
    ) -> Result<SyncOutcome, SyncError> {
        let url = self
            .client
            .resolve(&operation.url)
            .map_err(SyncError::InvalidUrl)?;
        let method = operation.method();
        debug!("Executing {:?} for {url} with {method}.", operation.kind);

        match operation.kind {
            OperationKind::Read => self.read(&url, &operation).await,
            OperationKind::Update if operation.shape.extended_collection => {
                self.create_collection(&url, &operation, handle).await
            }
            OperationKind::Update if operation.shape.force_put => {
                self.write(method, &url, operation).await
            }
            OperationKind::Update | OperationKind::Patch => self.patch(&url, &operation).await,
            OperationKind::Create => self.write(method, &url, operation).await,
            OperationKind::Delete => {
                let response = self
                    .client
                    .request(
                        method.clone(),
                        &url,
                        &operation.headers,
                        Bytes::new(),
                        operation.schema,
                    )
                    .await?;
                outcome(check_status(method, response)?.body)
            }
        }
    }

    async fn read(&self, url: &Uri, operation: &SyncOperation<'_>) -> Result<SyncOutcome, SyncError> {
        let depth = operation.depth();
        let response = self
            .client
            .propfind(url, &[], depth, &operation.headers, operation.schema)
            .await?;
        let response = check_status(operation.method(), response)?;

        match response.body {
            ResponseBody::Multistatus(mut records) if depth != Depth::Zero => {
                // The first entry is the queried resource itself.
                if !records.is_empty() {
                    records.remove(0);
                }
                outcome(ResponseBody::Multistatus(records))
            }
            body => outcome(body),
        }
    }

    async fn patch(&self, url: &Uri, operation: &SyncOperation<'_>) -> Result<SyncOutcome, SyncError> {
        let payload = operation.payload.as_ref().ok_or(SyncError::MissingPayload)?;
        let properties = property_set(payload, &operation.schema.properties);

        let response = self
            .client
            .proppatch(url, &properties, &operation.headers, operation.schema)
            .await?;
        outcome(check_status(dav_method(b"PROPPATCH"), response)?.body)
    }

    /// Creates a collection and then sets its properties.
    ///
    /// The collection is created with a plain `MKCOL`; if that fails no `PROPPATCH` is sent.
    async fn create_collection(
        &self,
        url: &Uri,
        operation: &SyncOperation<'_>,
        handle: Option<&AbortHandle>,
    ) -> Result<SyncOutcome, SyncError> {
        if operation.payload.is_none() {
            return Err(SyncError::MissingPayload);
        }

        let response = self
            .client
            .mkcol(url, None, &operation.headers, operation.schema)
            .await?;
        check_status(operation.method(), response)?;

        if handle.map_or(false, AbortHandle::is_aborted) {
            debug!("Collection {url} created but operation was aborted; not setting properties.");
            return Err(SyncError::Aborted);
        }
        self.patch(url, operation).await
    }

    /// Sends the payload as JSON with `PUT` or `POST`.
    async fn write(
        &self,
        method: Method,
        url: &Uri,
        operation: SyncOperation<'_>,
    ) -> Result<SyncOutcome, SyncError> {
        let payload = operation.payload.ok_or(SyncError::MissingPayload)?;
        let body = json_body(&payload)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        merge_headers(&mut headers, &operation.headers);

        let response = self
            .client
            .request(method.clone(), url, &headers, body, operation.schema)
            .await?;
        let response = check_status(method.clone(), response)?;

        Ok(SyncOutcome::Record(echo(
            &payload,
            &response,
            method == Method::POST,
        )))
    }
}

/// Returns the response if it has a 2xx status; otherwise fails with its status and body.
fn check_status(method: Method, response: DavResponse) -> Result<DavResponse, SyncError> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(SyncError::Status {
            method,
            status: response.status,
            body: response.raw,
        })
    }
}

/// Converts a response body into an outcome.
///
/// Fails if any decoded record has no id.
fn outcome(body: ResponseBody) -> Result<SyncOutcome, SyncError> {
    let records: &[ResourceRecord] = match &body {
        ResponseBody::Resource(record) => std::slice::from_ref(record),
        ResponseBody::Multistatus(records) => records.as_slice(),
        ResponseBody::Raw(_) => &[],
    };
    if let Some(record) = records.iter().find(|record| record.id.is_empty()) {
        return Err(SyncError::MissingId {
            href: record.href.clone(),
        });
    }

    Ok(match body {
        ResponseBody::Resource(record) => SyncOutcome::Resource(record),
        ResponseBody::Multistatus(records) => SyncOutcome::Resources(records),
        ResponseBody::Raw(raw) => SyncOutcome::Raw(raw),
    })
}
