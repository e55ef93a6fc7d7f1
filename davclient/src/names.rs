// Copyright 2023 Hugo Osvaldo Barrera
//
// SPDX-License-Identifier: EUPL-1.2

//! Property names, namespace prefixes and the mapping between short property keys and their
//! fully qualified names.
//!
//! Fully qualified names are represented in [Clark notation]: `{namespace}localname`.
//!
//! [Clark notation]: http://www.jclark.com/xml/xmlns.htm

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
};

/// Namespace for properties defined in the WebDav specifications.
pub const DAV: &str = "DAV:";
/// Prefix always bound to [`DAV`] in rendered requests.
pub const DAV_PREFIX: &str = "d";

pub(crate) const MULTISTATUS: (&str, &str) = (DAV, "multistatus");
pub(crate) const RESPONSE: (&str, &str) = (DAV, "response");
pub(crate) const HREF: (&str, &str) = (DAV, "href");
pub(crate) const PROPSTAT: (&str, &str) = (DAV, "propstat");
pub(crate) const PROP: (&str, &str) = (DAV, "prop");
pub(crate) const STATUS: (&str, &str) = (DAV, "status");

/// Short key under which a resource's identifier is stored.
pub const ID_KEY: &str = "id";

/// A namespace-qualified XML name.
///
/// Names without a namespace are rendered without a prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClarkName {
    namespace: Option<String>,
    name: String,
}

impl ClarkName {
    /// Creates a new name inside `namespace`.
    pub fn new<N: Into<String>, L: Into<String>>(namespace: N, name: L) -> ClarkName {
        ClarkName {
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }

    /// Creates a name with no namespace.
    pub fn local<L: Into<String>>(name: L) -> ClarkName {
        ClarkName {
            namespace: None,
            name: name.into(),
        }
    }

    /// Parses a name in Clark notation.
    ///
    /// Input without a leading `{namespace}` is taken as a plain local name, so this never fails.
    ///
    /// ```
    /// # use davclient::names::ClarkName;
    /// let name = ClarkName::parse("{DAV:}displayname");
    /// assert_eq!(name.namespace(), Some("DAV:"));
    /// assert_eq!(name.name(), "displayname");
    ///
    /// assert_eq!(ClarkName::parse("colour").namespace(), None);
    /// ```
    #[must_use]
    pub fn parse(raw: &str) -> ClarkName {
        if let Some(rest) = raw.strip_prefix('{') {
            if let Some((namespace, name)) = rest.split_once('}') {
                return ClarkName::new(namespace, name);
            }
        }
        ClarkName::local(raw)
    }

    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ClarkName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{{{namespace}}}{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

impl From<&str> for ClarkName {
    fn from(value: &str) -> Self {
        ClarkName::parse(value)
    }
}

impl<'a, 'b> From<roxmltree::ExpandedName<'a, 'b>> for ClarkName {
    fn from(value: roxmltree::ExpandedName<'a, 'b>) -> Self {
        match value.namespace() {
            Some(namespace) => ClarkName::new(namespace, value.name()),
            None => ClarkName::local(value.name()),
        }
    }
}

/// Mapping from namespace URI to the prefix used when rendering requests.
///
/// Always binds [`DAV`] to [`DAV_PREFIX`]. There is no mutation API; build a new map instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceMap {
    prefixes: BTreeMap<String, String>,
}

impl NamespaceMap {
    /// Builds a map from `(namespace, prefix)` pairs, merged with the default `DAV:` binding.
    pub fn new<I, N, P>(namespaces: I) -> NamespaceMap
    where
        I: IntoIterator<Item = (N, P)>,
        N: Into<String>,
        P: Into<String>,
    {
        let mut prefixes = namespaces
            .into_iter()
            .map(|(namespace, prefix)| (namespace.into(), prefix.into()))
            .collect::<BTreeMap<_, _>>();
        prefixes.insert(DAV.to_string(), DAV_PREFIX.to_string());
        NamespaceMap { prefixes }
    }

    /// Returns the prefix registered for `namespace`.
    #[must_use]
    pub fn prefix_for(&self, namespace: &str) -> Option<&str> {
        self.prefixes.get(namespace).map(String::as_str)
    }

    /// Returns the namespace bound to `prefix`.
    #[must_use]
    pub fn namespace_for(&self, prefix: &str) -> Option<&str> {
        self.prefixes
            .iter()
            .find(|(_, p)| p.as_str() == prefix)
            .map(|(namespace, _)| namespace.as_str())
    }

    /// Iterates `(namespace, prefix)` pairs, starting with `DAV:`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        std::iter::once((DAV, DAV_PREFIX)).chain(
            self.prefixes
                .iter()
                .filter(|(namespace, _)| namespace.as_str() != DAV)
                .map(|(namespace, prefix)| (namespace.as_str(), prefix.as_str())),
        )
    }
}

impl Default for NamespaceMap {
    fn default() -> Self {
        NamespaceMap::new(std::iter::empty::<(String, String)>())
    }
}

/// Mapping between short property keys (e.g.: `displayname`) and fully qualified names.
///
/// Lookups are exact and case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyMap {
    by_key: BTreeMap<String, ClarkName>,
}

impl PropertyMap {
    /// Builds a map from a `{clarkName: shortKey}` table.
    pub fn from_clark_table<I, C, K>(table: I) -> PropertyMap
    where
        I: IntoIterator<Item = (C, K)>,
        C: AsRef<str>,
        K: Into<String>,
    {
        table
            .into_iter()
            .map(|(clark, key)| (key.into(), ClarkName::parse(clark.as_ref())))
            .collect()
    }

    /// Expands `key` into its fully qualified name, if registered.
    #[must_use]
    pub fn to_clark(&self, key: &str) -> Option<&ClarkName> {
        self.by_key.get(key)
    }

    /// Translates a fully qualified name back into its short key.
    ///
    /// Unregistered names are returned in Clark notation. When translating many names, build a
    /// [`ReversePropertyMap`] with [`PropertyMap::inverted`] once instead.
    #[must_use]
    pub fn from_clark(&self, name: &ClarkName) -> String {
        self.inverted().from_clark(name)
    }

    /// Returns the reverse mapping. This is `O(n)` on the size of the map.
    #[must_use]
    pub fn inverted(&self) -> ReversePropertyMap<'_> {
        ReversePropertyMap {
            by_name: self
                .by_key
                .iter()
                .map(|(key, name)| (name.to_string(), key.as_str()))
                .collect(),
        }
    }

    /// All registered fully qualified names.
    pub fn names(&self) -> impl Iterator<Item = &ClarkName> {
        self.by_key.values()
    }

    /// Short keys and their fully qualified names.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ClarkName)> {
        self.by_key.iter().map(|(key, name)| (key.as_str(), name))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, ClarkName)> for PropertyMap {
    fn from_iter<T: IntoIterator<Item = (K, ClarkName)>>(iter: T) -> Self {
        PropertyMap {
            by_key: iter
                .into_iter()
                .map(|(key, name)| (key.into(), name))
                .collect(),
        }
    }
}

/// Inverse of a [`PropertyMap`], keyed by names in Clark notation.
#[derive(Debug)]
pub struct ReversePropertyMap<'a> {
    by_name: HashMap<String, &'a str>,
}

impl ReversePropertyMap<'_> {
    /// Translates `name` into its short key, or its Clark notation if not registered.
    #[must_use]
    pub fn from_clark(&self, name: &ClarkName) -> String {
        let clark = name.to_string();
        match self.by_name.get(&clark) {
            Some(key) => (*key).to_string(),
            None => clark,
        }
    }
}

/// Namespace prefixes and property keys for one kind of resource.
///
/// Immutable once built. A single instance is usually shared by all calls for a resource type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    pub namespaces: NamespaceMap,
    pub properties: PropertyMap,
}

impl Schema {
    #[must_use]
    pub fn new(namespaces: NamespaceMap, properties: PropertyMap) -> Schema {
        Schema {
            namespaces,
            properties,
        }
    }
}
