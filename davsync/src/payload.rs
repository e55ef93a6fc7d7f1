// Copyright 2023 Hugo Osvaldo Barrera
//
// SPDX-License-Identifier: EUPL-1.2

//! Conversion of caller attributes into request bodies, and of write responses back into
//! attributes.
use davclient::{
    dav::{DavResponse, ResponseBody},
    names::{ClarkName, PropertyMap, ID_KEY},
    record::{derive_encoded_id, Attributes, Value},
};
use http::header::CONTENT_LOCATION;
use hyper::body::Bytes;
use log::{debug, warn};

/// Maps each attribute to a property name and its text value.
///
/// Keys missing from `properties` are sent under their own name, parsed as Clark notation if they
/// look like it. Nested values cannot be written and are skipped.
#[must_use]
pub fn property_set(attributes: &Attributes, properties: &PropertyMap) -> Vec<(ClarkName, String)> {
    attributes
        .iter()
        .filter_map(|(key, value)| {
            let name = match properties.to_clark(key) {
                Some(name) => name.clone(),
                None => {
                    warn!("No property mapped for field {key:?}; using it as the property name.");
                    ClarkName::parse(key)
                }
            };
            match value.as_text() {
                Some(text) => Some((name, text.into_owned())),
                None => {
                    warn!("Skipping field {key:?}: nested values cannot be written.");
                    None
                }
            }
        })
        .collect()
}

/// Serialises attributes as a JSON object for `PUT` and `POST` bodies.
///
/// # Errors
///
/// If serialisation fails.
pub fn json_body(attributes: &Attributes) -> Result<Bytes, serde_json::Error> {
    serde_json::to_vec(attributes).map(Bytes::from)
}

/// Builds the attributes returned for a successful `PUT` or `POST`.
///
/// Servers rarely echo the stored resource, so this is `submitted` with whatever the server did
/// return merged on top: the properties of the first decoded record, or the fields of a JSON
/// object body. Other bodies are ignored. When `derive_location` is set, an id derived from the
/// `Content-Location` header replaces any existing one.
#[must_use]
pub fn echo(submitted: &Attributes, response: &DavResponse, derive_location: bool) -> Attributes {
    let mut attributes = submitted.clone();

    match &response.body {
        ResponseBody::Resource(record) => attributes.extend(record.properties.clone()),
        ResponseBody::Multistatus(records) => {
            if let Some(record) = records.first() {
                attributes.extend(record.properties.clone());
            }
        }
        ResponseBody::Raw(raw) => {
            if let Some(fields) = json_fields(raw) {
                attributes.extend(fields);
            }
        }
    }

    if derive_location {
        let location = response
            .headers
            .get(CONTENT_LOCATION)
            .and_then(|value| value.to_str().ok());
        if let Some(id) = location.and_then(derive_encoded_id) {
            attributes.insert(ID_KEY.to_string(), Value::from(id));
        }
    }

    attributes
}

/// Decodes a body holding a JSON object into attributes.
///
/// Returns `None` for empty bodies and anything that is not a JSON object. `null` fields are
/// dropped; arrays and objects are kept as their JSON text.
fn json_fields(raw: &[u8]) -> Option<Attributes> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    let object = match serde_json::from_slice::<serde_json::Map<String, serde_json::Value>>(raw) {
        Ok(object) => object,
        Err(err) => {
            debug!("Ignoring response body that is not a JSON object: {err}");
            return None;
        }
    };

    Some(
        object
            .into_iter()
            .filter_map(|(key, value)| {
                let value = match value {
                    serde_json::Value::Null => return None,
                    serde_json::Value::Bool(b) => Value::Bool(b),
                    serde_json::Value::Number(n) => match n.as_i64() {
                        Some(i) => Value::Integer(i),
                        None => Value::Float(n.as_f64()?),
                    },
                    serde_json::Value::String(text) => Value::Text(text),
                    other => Value::Text(other.to_string()),
                };
                Some((key, value))
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use davclient::{
        dav::{DavResponse, ResponseBody},
        names::{ClarkName, PropertyMap, DAV},
        record::{Attributes, Element, ResourceRecord, Value},
    };
    use http::{HeaderMap, HeaderValue, StatusCode};
    use hyper::body::Bytes;

    use super::{echo, json_body, property_set};

    const CAL: &str = "urn:ietf:params:xml:ns:caldav";

    fn properties() -> PropertyMap {
        PropertyMap::from_iter([
            ("displayName", ClarkName::new(DAV, "displayname")),
            ("enabled", ClarkName::new(CAL, "calendar-enabled")),
        ])
    }

    fn response(body: ResponseBody, headers: HeaderMap) -> DavResponse {
        DavResponse {
            status: StatusCode::CREATED,
            headers,
            body,
            raw: Bytes::new(),
        }
    }

    #[test]
    fn test_property_set() {
        let mut attributes = Attributes::new();
        attributes.insert("displayName".to_string(), Value::from("Work"));
        attributes.insert("enabled".to_string(), Value::from(false));
        attributes.insert("order".to_string(), Value::from(3_i64));
        attributes.insert(
            "children".to_string(),
            Value::Nested(vec![Element {
                name: "x".to_string(),
                value: Value::from("y"),
            }]),
        );

        let set = property_set(&attributes, &properties());

        assert_eq!(
            set,
            vec![
                (ClarkName::new(DAV, "displayname"), "Work".to_string()),
                (ClarkName::new(CAL, "calendar-enabled"), "false".to_string()),
                (ClarkName::local("order"), "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_property_set_accepts_clark_keys() {
        let mut attributes = Attributes::new();
        attributes.insert(
            "{http://apple.com/ns/ical/}calendar-color".to_string(),
            Value::from("#ff0000"),
        );

        let set = property_set(&attributes, &PropertyMap::default());

        assert_eq!(
            set,
            vec![(
                ClarkName::new("http://apple.com/ns/ical/", "calendar-color"),
                "#ff0000".to_string()
            )]
        );
    }

    #[test]
    fn test_json_body() {
        let mut attributes = Attributes::new();
        attributes.insert("summary".to_string(), Value::from("Lunch"));
        attributes.insert("allDay".to_string(), Value::from(true));
        attributes.insert("priority".to_string(), Value::from(5_i64));

        let body = json_body(&attributes).unwrap();

        assert_eq!(
            body,
            Bytes::from_static(br#"{"allDay":true,"priority":5,"summary":"Lunch"}"#)
        );
    }

    #[test]
    fn test_echo_merges_returned_record() {
        let mut submitted = Attributes::new();
        submitted.insert("summary".to_string(), Value::from("Lunch"));
        submitted.insert("id".to_string(), Value::from("stale"));

        let mut returned = Attributes::new();
        returned.insert("etag".to_string(), Value::from("\"abc\""));
        let record = ResourceRecord {
            href: "/cal/lunch.ics".to_string(),
            id: "lunch.ics".to_string(),
            properties: returned,
        };
        let mut headers = HeaderMap::new();
        headers.insert(
            "Content-Location",
            HeaderValue::from_static("/cal/lunch-2.ics"),
        );
        let response = response(ResponseBody::Multistatus(vec![record]), headers);

        let echoed = echo(&submitted, &response, true);
        assert_eq!(echoed["summary"], Value::from("Lunch"));
        assert_eq!(echoed["etag"], Value::from("\"abc\""));
        assert_eq!(echoed["id"], Value::from("lunch-2.ics"));

        // Only POST takes the id from Content-Location.
        let echoed = echo(&submitted, &response, false);
        assert_eq!(echoed["id"], Value::from("stale"));
    }

    #[test]
    fn test_echo_ignores_raw_bodies() {
        let mut submitted = Attributes::new();
        submitted.insert("summary".to_string(), Value::from("Lunch"));
        let response = response(
            ResponseBody::Raw(Bytes::from_static(b"created")),
            HeaderMap::new(),
        );

        assert_eq!(echo(&submitted, &response, true), submitted);

        let response = response_with(ResponseBody::Raw(Bytes::from_static(b"[1, 2]")));
        assert_eq!(echo(&submitted, &response, false), submitted);
    }

    fn response_with(body: ResponseBody) -> DavResponse {
        response(body, HeaderMap::new())
    }

    #[test]
    fn test_echo_ignores_empty_bodies() {
        let mut submitted = Attributes::new();
        submitted.insert("summary".to_string(), Value::from("Lunch"));

        for raw in [&b""[..], &b"  \r\n"[..]] {
            let response = response_with(ResponseBody::Raw(Bytes::copy_from_slice(raw)));
            assert_eq!(echo(&submitted, &response, false), submitted);
        }
    }

    #[test]
    fn test_echo_merges_json_object() {
        let mut submitted = Attributes::new();
        submitted.insert("summary".to_string(), Value::from("Lunch"));
        submitted.insert("priority".to_string(), Value::from(1_i64));

        let response = response_with(ResponseBody::Raw(Bytes::from_static(
            br#"{"etag":"abc","priority":5,"ratio":0.5,"done":false,"note":null,"tags":["a"]}"#,
        )));
        let echoed = echo(&submitted, &response, false);

        assert_eq!(echoed["summary"], Value::from("Lunch"));
        assert_eq!(echoed["etag"], Value::from("abc"));
        assert_eq!(echoed["priority"], Value::from(5_i64));
        assert_eq!(echoed["ratio"], Value::from(0.5_f64));
        assert_eq!(echoed["done"], Value::from(false));
        assert_eq!(echoed["tags"], Value::from(r#"["a"]"#));
        assert!(!echoed.contains_key("note"));
    }

    #[test]
    fn test_echo_decodes_content_location() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Content-Location",
            HeaderValue::from_static("/cal/new%20event.ics"),
        );
        let response = response(ResponseBody::Raw(Bytes::new()), headers);

        let echoed = echo(&Attributes::new(), &response, true);
        assert_eq!(echoed["id"], Value::from("new event.ics"));
    }
}
