// Copyright 2023 Hugo Osvaldo Barrera
//
// SPDX-License-Identifier: EUPL-1.2

//! A webdav client that treats remote resources as records with named fields.
//!
//! See [`DavClient`] as a useful entry point.
//!
//! Property names in requests and responses are namespace-qualified XML names. A [`Schema`]
//! maps them to short keys (e.g.: `{DAV:}displayname` to `displayName`) and assigns the
//! namespace prefixes used when rendering requests. Schemas are immutable and passed explicitly to
//! each call, so a single client can be shared for many kinds of resources.
//!
//! ```rust,no_run
//! use davclient::{
//!     auth::{Auth, Password},
//!     dav::{DavClient, Depth, ResponseBody},
//!     names::{ClarkName, NamespaceMap, PropertyMap, Schema},
//! };
//! use http::{HeaderMap, Uri};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let client = DavClient::builder()
//!     .with_uri(Uri::from_static("https://cloud.example.com/remote.php/dav/"))
//!     .with_auth(Auth::Basic {
//!         username: String::from("user"),
//!         password: Some(Password::from("secret")),
//!     })
//!     .build();
//!
//! let schema = Schema::new(
//!     NamespaceMap::new([("http://owncloud.org/ns", "oc")]),
//!     PropertyMap::from_iter([("name", ClarkName::parse("{http://owncloud.org/ns}display-name"))]),
//! );
//!
//! let url = client.resolve("systemtags/").unwrap();
//! let response = client
//!     .propfind(&url, &[], Depth::One, &HeaderMap::new(), &schema)
//!     .await
//!     .unwrap();
//! if let ResponseBody::Multistatus(tags) = response.body {
//!     for tag in tags {
//!         println!("{}: {:?}", tag.id, tag.properties.get("name"));
//!     }
//! }
//! # })
//! ```

pub mod auth;
pub mod builder;
pub mod dav;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod multistatus;
pub mod names;
pub mod record;
pub mod transport;
pub mod xmlutils;

pub use dav::{DavClient, DavError};
pub use names::Schema;
