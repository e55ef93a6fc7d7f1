// Copyright 2023 Hugo Osvaldo Barrera
//
// SPDX-License-Identifier: EUPL-1.2

//! Decoding of `multistatus` responses.
//!
//! See: <https://www.rfc-editor.org/rfc/rfc4918#section-13>
//!
//! # Failed properties
//!
//! A `propstat` whose status is anything other than [`SUCCESS_STATUS`] is skipped. Its properties
//! are silently absent from the decoded [`ResourceRecord`], so callers cannot tell a missing
//! property apart from one that failed.
//!
//! # Identifiers
//!
//! A `response` whose `href` has no non-empty segment (e.g.: `/`) and no `id` property is decoded
//! with an empty [`ResourceRecord::id`]. Such a record is usually the collection itself in a
//! listing, so it does not fail the remaining records.
use std::borrow::Cow;

use log::debug;
use percent_encoding::percent_decode_str;
use roxmltree::Node;

use crate::{
    dav::DavError,
    names::{
        ClarkName, PropertyMap, ReversePropertyMap, HREF, ID_KEY, MULTISTATUS, PROP, PROPSTAT,
        RESPONSE, STATUS,
    },
    record::{derive_id, Attributes, Element, ResourceRecord, Value},
};

/// The only status line for which properties in a `propstat` are decoded.
///
/// This is an exact textual comparison; other `2xx` codes are treated as failures.
pub const SUCCESS_STATUS: &str = "HTTP/1.1 200 OK";

/// Parses a `multistatus` response body.
///
/// Returns one record per `response` element, in the order they appear in the body. Property
/// names are translated into short keys using `properties`.
///
/// # Errors
///
/// - If the body is not valid UTF-8 or not well-formed XML.
/// - If the root element is not `DAV:multistatus`.
/// - If any `response` has no `href`, or one that is not valid UTF-8 once decoded.
pub fn parse_multistatus<B: AsRef<[u8]>>(
    body: B,
    properties: &PropertyMap,
) -> Result<Vec<ResourceRecord>, DavError> {
    let body = std::str::from_utf8(body.as_ref())?;
    let doc = roxmltree::Document::parse(body)?;
    let root = doc.root_element();

    if !root.has_tag_name(MULTISTATUS) {
        return Err(DavError::InvalidResponse(
            format!("expected multistatus, got {}", ClarkName::from(root.tag_name())).into(),
        ));
    }

    let reverse = properties.inverted();
    root.children()
        .filter(|node| node.has_tag_name(RESPONSE))
        .map(|response| parse_response(response, &reverse))
        .collect()
}

fn parse_response(
    response: Node,
    reverse: &ReversePropertyMap,
) -> Result<ResourceRecord, DavError> {
    let href = get_unquoted_href(response)?.into_owned();

    let mut properties = Attributes::new();
    for propstat in response.children().filter(|n| n.has_tag_name(PROPSTAT)) {
        let status = propstat
            .children()
            .find(|n| n.has_tag_name(STATUS))
            .and_then(|n| n.text())
            .unwrap_or_default();
        if status != SUCCESS_STATUS {
            debug!("Skipping propstat for {href} with status {status:?}");
            continue;
        }

        let props = propstat
            .children()
            .filter(|n| n.has_tag_name(PROP))
            .flat_map(|prop| prop.children().filter(Node::is_element));
        for prop in props {
            let key = reverse.from_clark(&ClarkName::from(prop.tag_name()));
            properties.insert(key, decode_value(prop, reverse));
        }
    }

    let id = match properties.get(ID_KEY) {
        Some(Value::Text(id)) if !id.is_empty() => id.clone(),
        _ => match derive_id(&href) {
            Some(id) => id.to_string(),
            None => {
                debug!("Cannot derive an id from href {href:?}.");
                String::new()
            }
        },
    };

    Ok(ResourceRecord {
        href,
        id,
        properties,
    })
}

/// Decodes the content of a property node.
///
/// Nodes with element children are decoded recursively into a [`Value::Nested`]; anything else
/// is decoded as its text.
fn decode_value(node: Node, reverse: &ReversePropertyMap) -> Value {
    if node.children().any(|n| n.is_element()) {
        let children = node
            .children()
            .filter(Node::is_element)
            .map(|child| Element {
                name: reverse.from_clark(&ClarkName::from(child.tag_name())),
                value: decode_value(child, reverse),
            })
            .collect();
        Value::Nested(children)
    } else {
        Value::Text(
            node.children()
                .filter(Node::is_text)
                .filter_map(|n| n.text())
                .collect(),
        )
    }
}

/// Find the `href` child of a `response` and return its unescaped text value.
fn get_unquoted_href<'a>(response: Node<'a, '_>) -> Result<Cow<'a, str>, DavError> {
    Ok(response
        .children()
        .find(|node| node.has_tag_name(HREF))
        .ok_or(DavError::InvalidResponse("missing href in response".into()))?
        .text()
        .map(|href| percent_decode_str(href.trim()))
        .ok_or(DavError::InvalidResponse("missing text in href".into()))?
        .decode_utf8()?)
}
