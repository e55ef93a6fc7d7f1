// Copyright 2023 Hugo Osvaldo Barrera
//
// SPDX-License-Identifier: EUPL-1.2

//! Description of a single operation and the request method it maps to.
use davclient::{
    dav::Depth,
    names::Schema,
    record::{Attributes, Value},
};
use http::{HeaderMap, HeaderName, HeaderValue, Method};

/// The abstract operation to perform on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Create,
    Read,
    Update,
    Patch,
    Delete,
}

/// How a resource must be written to.
///
/// These are declared by the caller for each resource type; they are never inferred from the
/// resource itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceShape {
    /// The resource is a collection. Reads list its members by default.
    pub is_collection: bool,
    /// Updates create the collection with `MKCOL` and then set its properties.
    pub extended_collection: bool,
    /// Updates send the whole record with `PUT` instead of `PROPPATCH`.
    pub force_put: bool,
}

/// A single operation for [`SyncAdapter`](crate::SyncAdapter).
///
/// Built per call and consumed by the adapter.
#[derive(Debug, Clone)]
pub struct SyncOperation<'a> {
    pub kind: OperationKind,
    /// Absolute URL, or a path resolved against the client's base URL.
    pub url: String,
    pub shape: ResourceShape,
    pub schema: &'a Schema,
    /// Defaults to `1` for collections and `0` otherwise. Only used for reads.
    pub depth: Option<Depth>,
    /// Fields to write. Required for updates and patches.
    pub payload: Option<Attributes>,
    /// Sent in addition to the client's default headers, replacing any with the same name.
    pub headers: HeaderMap,
}

impl<'a> SyncOperation<'a> {
    pub fn new<S: Into<String>>(kind: OperationKind, url: S, schema: &'a Schema) -> Self {
        SyncOperation {
            kind,
            url: url.into(),
            shape: ResourceShape::default(),
            schema,
            depth: None,
            payload: None,
            headers: HeaderMap::new(),
        }
    }

    #[must_use]
    pub fn with_shape(mut self, shape: ResourceShape) -> Self {
        self.shape = shape;
        self
    }

    #[must_use]
    pub fn with_depth(mut self, depth: Depth) -> Self {
        self.depth = Some(depth);
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: Attributes) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Adds a single field to the payload.
    #[must_use]
    pub fn with_field<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.payload
            .get_or_insert_with(Attributes::new)
            .insert(key.into(), value.into());
        self
    }

    /// Adds a header value. Repeating a name sends every value given for it.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// The request method used for this operation.
    ///
    /// For an update with [`ResourceShape::extended_collection`], this is the first of two
    /// requests; a `PROPPATCH` follows.
    #[must_use]
    pub fn method(&self) -> Method {
        match self.kind {
            OperationKind::Create => Method::POST,
            OperationKind::Read => dav_method(b"PROPFIND"),
            OperationKind::Delete => Method::DELETE,
            OperationKind::Update if self.shape.extended_collection => dav_method(b"MKCOL"),
            OperationKind::Update if self.shape.force_put => Method::PUT,
            OperationKind::Update | OperationKind::Patch => dav_method(b"PROPPATCH"),
        }
    }

    /// The depth used when reading.
    #[must_use]
    pub fn depth(&self) -> Depth {
        match self.depth {
            Some(depth) => depth,
            None if self.shape.is_collection => Depth::One,
            None => Depth::Zero,
        }
    }
}

pub(crate) fn dav_method(name: &'static [u8]) -> Method {
    Method::from_bytes(name).expect("webdav method names are valid tokens")
}
