// Copyright 2023 Hugo Osvaldo Barrera
//
// SPDX-License-Identifier: EUPL-1.2

//! Server details and property mappings loaded from a TOML file.
//!
//! ```toml
//! base_url = "https://cloud.example.com/remote.php/dav/"
//! username = "alice"
//! auth = "basic"
//! timeout_secs = 30
//!
//! [namespaces]
//! "http://owncloud.org/ns" = "oc"
//!
//! [properties]
//! name = "{http://owncloud.org/ns}display-name"
//!
//! [headers]
//! X-Requested-With = "XMLHttpRequest"
//!
//! [shape]
//! collection = true
//! ```
use std::{collections::BTreeMap, path::Path, time::Duration};

use anyhow::{bail, Context};
use davclient::{
    auth::{Auth, Password},
    dav::DavClient,
    names::{ClarkName, NamespaceMap, Schema},
};
use davsync::ResourceShape;
use http::{HeaderName, HeaderValue, Uri};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum AuthKind {
    #[default]
    None,
    Basic,
    Bearer,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ShapeConfig {
    collection: bool,
    extended_collection: bool,
    force_put: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Profile {
    base_url: String,
    username: Option<String>,
    #[serde(default)]
    auth: AuthKind,
    timeout_secs: Option<u64>,
    /// Namespace URI to prefix.
    #[serde(default)]
    namespaces: BTreeMap<String, String>,
    /// Short key to property name in Clark notation.
    #[serde(default)]
    properties: BTreeMap<String, String>,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default)]
    shape: ShapeConfig,
}

impl Profile {
    pub(crate) fn load(path: &Path) -> anyhow::Result<Profile> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read profile {}", path.display()))?;
        Profile::parse(&raw).with_context(|| format!("invalid profile {}", path.display()))
    }

    fn parse(raw: &str) -> anyhow::Result<Profile> {
        Ok(toml::from_str(raw)?)
    }

    pub(crate) fn schema(&self) -> Schema {
        Schema::new(
            NamespaceMap::new(&self.namespaces),
            self.properties
                .iter()
                .map(|(key, name)| (key.as_str(), ClarkName::parse(name)))
                .collect(),
        )
    }

    pub(crate) fn shape(&self) -> ResourceShape {
        ResourceShape {
            is_collection: self.shape.collection,
            extended_collection: self.shape.extended_collection,
            force_put: self.shape.force_put,
        }
    }

    /// Builds a client for this profile.
    ///
    /// `secret` is the password for basic authentication, or the token for bearer authentication.
    pub(crate) fn build_client(&self, secret: Option<String>) -> anyhow::Result<DavClient> {
        let uri = self
            .base_url
            .parse::<Uri>()
            .with_context(|| format!("invalid base_url {:?}", self.base_url))?;

        let auth = match self.auth {
            AuthKind::None => Auth::None,
            AuthKind::Basic => Auth::Basic {
                username: self
                    .username
                    .clone()
                    .context("basic authentication requires a username")?,
                password: secret.map(Password::from),
            },
            AuthKind::Bearer => match secret {
                Some(token) => Auth::Bearer {
                    token: Password::from(token),
                },
                None => bail!("bearer authentication requires a token in DAVCLI_PASSWORD"),
            },
        };

        let mut builder = DavClient::builder().with_uri(uri).with_auth(auth);
        for (name, value) in &self.headers {
            builder = builder.with_header(
                HeaderName::from_bytes(name.as_bytes())
                    .with_context(|| format!("invalid header name {name:?}"))?,
                HeaderValue::from_str(value)
                    .with_context(|| format!("invalid value for header {name:?}"))?,
            );
        }
        if let Some(secs) = self.timeout_secs {
            builder = builder.with_timeout(Duration::from_secs(secs));
        }

        Ok(builder.build())
    }
}
