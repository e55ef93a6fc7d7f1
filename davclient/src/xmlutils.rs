// Copyright 2023 Hugo Osvaldo Barrera
//
// SPDX-License-Identifier: EUPL-1.2

//! Utilities for rendering XML request bodies.
use std::{borrow::Cow, fmt::Write};

use crate::names::{ClarkName, NamespaceMap, DAV};

/// Prefix used for namespaces that are not present in a [`NamespaceMap`].
const FALLBACK_PREFIX: &str = "x";

/// Properties whose values are written without escaping.
///
/// The value for these is expected to already be markup (e.g.: `<d:collection/>` for a
/// `resourcetype`).
pub const UNESCAPED_PROPERTIES: &[(&str, &str)] = &[(DAV, "resourcetype")];

/// Returns true if values for `name` are written as raw markup.
#[must_use]
pub fn is_unescaped(name: &ClarkName) -> bool {
    UNESCAPED_PROPERTIES
        .iter()
        .any(|(namespace, local)| name.namespace() == Some(*namespace) && name.name() == *local)
}

/// Replaces characters that need to be escaped in texts.
///
/// `&` --> `&amp;`
/// `<` --> `&lt;`
/// `>` --> `&gt;`
/// `"` --> `&quot;`
/// `'` --> `&apos;`
#[must_use]
pub fn escape_text(raw: &str) -> Cow<str> {
    let needs_escaping = |c: char| matches!(c, '&' | '<' | '>' | '"' | '\'');
    let Some(first) = raw.find(needs_escaping) else {
        return Cow::Borrowed(raw);
    };

    let mut escaped = String::with_capacity(raw.len() + 8);
    escaped.push_str(&raw[..first]);
    for c in raw[first..].chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

/// A property name ready to be written as an element.
struct QualifiedName {
    /// Prefixed name, used for both opening and closing tags.
    tag: String,
    /// Namespace declaration required when the namespace has no registered prefix.
    declaration: Option<String>,
}

impl QualifiedName {
    fn new(name: &ClarkName, namespaces: &NamespaceMap) -> QualifiedName {
        match name.namespace() {
            None => QualifiedName {
                tag: name.name().to_string(),
                declaration: None,
            },
            Some(namespace) => match namespaces.prefix_for(namespace) {
                Some(prefix) => QualifiedName {
                    tag: format!("{prefix}:{}", name.name()),
                    declaration: None,
                },
                None => QualifiedName {
                    tag: format!("{FALLBACK_PREFIX}:{}", name.name()),
                    declaration: Some(format!(
                        " xmlns:{FALLBACK_PREFIX}=\"{}\"",
                        escape_text(namespace)
                    )),
                },
            },
        }
    }

    fn declaration(&self) -> &str {
        self.declaration.as_deref().unwrap_or_default()
    }
}

/// Render an empty element for each property.
#[must_use]
pub fn render_property_list(properties: &[ClarkName], namespaces: &NamespaceMap) -> String {
    let mut rendered = String::new();
    for property in properties {
        let name = QualifiedName::new(property, namespaces);
        // Writing into a `String` does not fail.
        let _ = write!(rendered, "<{}{}/>", name.tag, name.declaration());
    }
    rendered
}

/// Render a `DAV:set` block assigning each property its value.
///
/// Values are escaped, except for the properties in [`UNESCAPED_PROPERTIES`].
#[must_use]
pub fn render_property_set(properties: &[(ClarkName, String)], namespaces: &NamespaceMap) -> String {
    let mut rendered = String::from("<d:set><d:prop>");
    for (property, value) in properties {
        let name = QualifiedName::new(property, namespaces);
        let value = if is_unescaped(property) {
            Cow::Borrowed(value.as_str())
        } else {
            escape_text(value)
        };
        let _ = write!(
            rendered,
            "<{0}{1}>{value}</{0}>",
            name.tag,
            name.declaration()
        );
    }
    rendered.push_str("</d:prop></d:set>");
    rendered
}

/// Opening tag for a request document, declaring every registered namespace.
fn open_document(root: &str, namespaces: &NamespaceMap) -> String {
    let mut rendered = format!("<?xml version=\"1.0\"?><d:{root}");
    for (namespace, prefix) in namespaces.iter() {
        let _ = write!(rendered, " xmlns:{prefix}=\"{}\"", escape_text(namespace));
    }
    rendered.push('>');
    rendered
}

/// Render the body for a `PROPFIND` request.
#[must_use]
pub fn render_propfind(properties: &[ClarkName], namespaces: &NamespaceMap) -> String {
    let mut rendered = open_document("propfind", namespaces);
    rendered.push_str("<d:prop>");
    rendered.push_str(&render_property_list(properties, namespaces));
    rendered.push_str("</d:prop></d:propfind>");
    rendered
}

/// Render the body for a `PROPPATCH` request.
#[must_use]
pub fn render_propertyupdate(
    properties: &[(ClarkName, String)],
    namespaces: &NamespaceMap,
) -> String {
    let mut rendered = open_document("propertyupdate", namespaces);
    rendered.push_str(&render_property_set(properties, namespaces));
    rendered.push_str("</d:propertyupdate>");
    rendered
}

/// Render the body for an [Extended MKCOL](https://www.rfc-editor.org/rfc/rfc5689) request.
#[must_use]
pub fn render_mkcol(properties: &[(ClarkName, String)], namespaces: &NamespaceMap) -> String {
    let mut rendered = open_document("mkcol", namespaces);
    rendered.push_str(&render_property_set(properties, namespaces));
    rendered.push_str("</d:mkcol>");
    rendered
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use crate::names::{ClarkName, NamespaceMap, DAV};
    use crate::xmlutils::{
        escape_text, render_mkcol, render_propertyupdate, render_propfind,
    };

    const OC: &str = "http://owncloud.org/ns";

    fn namespaces() -> NamespaceMap {
        NamespaceMap::new([(OC, "oc")])
    }

    #[test]
    fn test_escape_text() {
        match escape_text("HELLO THERE") {
            Cow::Borrowed(s) => assert_eq!(s, "HELLO THERE"),
            Cow::Owned(_) => panic!("expected Borrowed, got Owned"),
        }
        match escape_text("HELLO <") {
            Cow::Borrowed(_) => panic!("expected Owned, got Borrowed"),
            Cow::Owned(s) => assert_eq!(s, "HELLO &lt;"),
        }
        match escape_text("HELLO &lt;") {
            Cow::Borrowed(_) => panic!("expected Owned, got Borrowed"),
            Cow::Owned(s) => assert_eq!(s, "HELLO &amp;lt;"),
        }
        assert_eq!(
            escape_text(r#"it's "a" <b> & c"#),
            "it&apos;s &quot;a&quot; &lt;b&gt; &amp; c"
        );
        match escape_text("你吃过了吗？") {
            Cow::Borrowed(s) => assert_eq!(s, "你吃过了吗？"),
            Cow::Owned(_) => panic!("expected Borrowed, got Owned"),
        }
    }

    #[test]
    fn test_render_propfind() {
        let body = render_propfind(
            &[
                ClarkName::new(DAV, "getetag"),
                ClarkName::new(OC, "id"),
                ClarkName::new("http://nextcloud.org/ns", "has-preview"),
            ],
            &namespaces(),
        );
        assert_eq!(
            body,
            concat!(
                r#"<?xml version="1.0"?><d:propfind xmlns:d="DAV:" xmlns:oc="http://owncloud.org/ns">"#,
                r#"<d:prop><d:getetag/><oc:id/><x:has-preview xmlns:x="http://nextcloud.org/ns"/></d:prop>"#,
                r#"</d:propfind>"#,
            )
        );
    }

    #[test]
    fn test_render_propertyupdate() {
        let body = render_propertyupdate(
            &[
                (ClarkName::new(OC, "message"), "fish & <chips>".to_string()),
                (ClarkName::local("colour"), "blue".to_string()),
            ],
            &namespaces(),
        );
        assert_eq!(
            body,
            concat!(
                r#"<?xml version="1.0"?><d:propertyupdate xmlns:d="DAV:" xmlns:oc="http://owncloud.org/ns">"#,
                r#"<d:set><d:prop><oc:message>fish &amp; &lt;chips&gt;</oc:message><colour>blue</colour></d:prop></d:set>"#,
                r#"</d:propertyupdate>"#,
            )
        );
    }

    /// `DAV:resourcetype` holds markup, so it is the one property that is written unescaped.
    #[test]
    fn test_resourcetype_is_not_escaped() {
        let body = render_mkcol(
            &[
                (
                    ClarkName::new(DAV, "resourcetype"),
                    "<d:collection/>".to_string(),
                ),
                (ClarkName::new(DAV, "displayname"), "<d:collection/>".to_string()),
            ],
            &NamespaceMap::default(),
        );
        assert_eq!(
            body,
            concat!(
                r#"<?xml version="1.0"?><d:mkcol xmlns:d="DAV:"><d:set><d:prop>"#,
                r#"<d:resourcetype><d:collection/></d:resourcetype>"#,
                r#"<d:displayname>&lt;d:collection/&gt;</d:displayname>"#,
                r#"</d:prop></d:set></d:mkcol>"#,
            )
        );
    }
}
