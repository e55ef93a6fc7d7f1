// Copyright 2023 Hugo Osvaldo Barrera
//
// SPDX-License-Identifier: EUPL-1.2

//! Maps record-level operations (create, read, update, patch, delete) onto webdav requests.
//!
//! Callers describe each operation with a [`SyncOperation`] and hand it to a [`SyncAdapter`],
//! which picks the request method, translates record fields into webdav properties via the
//! operation's [`Schema`](davclient::Schema), and normalises the response.
//!
//! | operation | resource                                  | method                  |
//! |-----------|-------------------------------------------|-------------------------|
//! | create    | any                                       | `POST`                  |
//! | read      | any                                       | `PROPFIND`              |
//! | delete    | any                                       | `DELETE`                |
//! | update    | [`ResourceShape::extended_collection`]    | `MKCOL` + `PROPPATCH`   |
//! | update    | [`ResourceShape::force_put`]              | `PUT`                   |
//! | update    | otherwise                                 | `PROPPATCH`             |
//! | patch     | any                                       | `PROPPATCH`             |
//!
//! ```rust,no_run
//! use davclient::{auth::Auth, dav::DavClient, names::{ClarkName, PropertyMap, Schema, DAV}};
//! use davsync::{OperationKind, SyncAdapter, SyncOperation};
//! use http::Uri;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let client = DavClient::builder()
//!     .with_uri(Uri::from_static("https://cloud.example.com/remote.php/dav/"))
//!     .with_auth(Auth::None)
//!     .build();
//! let adapter = SyncAdapter::new(client);
//! let schema = Schema {
//!     properties: PropertyMap::from_iter([("name", ClarkName::new(DAV, "displayname"))]),
//!     ..Schema::default()
//! };
//!
//! let operation = SyncOperation::new(OperationKind::Patch, "files/user/report.pdf", &schema)
//!     .with_field("name", "Quarterly report");
//! adapter.sync(operation).await.unwrap();
//! # })
//! ```
use std::io;

use davclient::DavError;
use http::{Method, StatusCode};
use hyper::body::Bytes;

mod adapter;
pub mod operation;
pub mod payload;

pub use adapter::{SyncAdapter, SyncOutcome};
pub use operation::{OperationKind, ResourceShape, SyncOperation};

#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    #[error("could not resolve the URL for the operation")]
    InvalidUrl(#[source] DavError),

    #[error("the operation requires a payload but none was given")]
    MissingPayload,

    #[error("error executing request")]
    Transport(#[from] DavError),

    #[error("{method} request failed with status {status}")]
    Status {
        method: Method,
        status: StatusCode,
        /// Response body as returned by the server.
        body: Bytes,
    },

    #[error("the operation was aborted")]
    Aborted,

    #[error("cannot derive an id for resource {href:?}")]
    MissingId { href: String },

    #[error("could not encode payload as JSON")]
    Encode(#[from] serde_json::Error),
}

impl From<SyncError> for io::Error {
    fn from(value: SyncError) -> Self {
        match value {
            SyncError::Transport(inner) => inner.into(),
            SyncError::InvalidUrl(_) | SyncError::MissingPayload | SyncError::Encode(_) => {
                io::Error::new(io::ErrorKind::InvalidInput, value)
            }
            SyncError::Status { status, .. } => {
                let kind = match status.as_u16() {
                    404 | 410 => io::ErrorKind::NotFound,
                    401 | 403 => io::ErrorKind::PermissionDenied,
                    _ => io::ErrorKind::Other,
                };
                io::Error::new(kind, value)
            }
            SyncError::Aborted => io::Error::new(io::ErrorKind::Interrupted, value),
            SyncError::MissingId { .. } => io::Error::new(io::ErrorKind::InvalidData, value),
        }
    }
}
