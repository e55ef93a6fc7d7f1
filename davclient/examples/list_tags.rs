// Copyright 2023 Hugo Osvaldo Barrera
//
// SPDX-License-Identifier: EUPL-1.2

//! Lists the system tags on a Nextcloud server.
//!
//! Usage:
//!
//!     cargo run --example=list_tags https://cloud.example.com/remote.php/dav/ user MYPASSWORD
//!     cargo run --example=list_tags $DAV_URL                                  $USERNAME $PASSWORD
//!
//! Example output:
//!
//! ```
//! found 2 tags...
//! 🏷 1: important (visible: true)
//! 🏷 2: archived (visible: false)
//! ```
use davclient::{
    auth::Auth,
    dav::{DavClient, Depth, ResponseBody},
    names::{ClarkName, NamespaceMap, PropertyMap, Schema},
};
use http::{HeaderMap, Uri};

const OC: &str = "http://owncloud.org/ns";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let mut arguments = std::env::args();
    arguments
        .next()
        .expect("binary has been called with a name");
    let base_url: Uri = arguments
        .next()
        .expect("$1 is defined")
        .parse()
        .expect("$1 is a valid URL");
    let username = arguments.next().expect("$2 is a valid username");
    let password = arguments.next().expect("$3 is a valid password").into();

    let client = DavClient::builder()
        .with_uri(base_url)
        .with_auth(Auth::Basic {
            username,
            password: Some(password),
        })
        .build();

    let schema = Schema::new(
        NamespaceMap::new([(OC, "oc")]),
        PropertyMap::from_iter([
            ("id", ClarkName::new(OC, "id")),
            ("name", ClarkName::new(OC, "display-name")),
            ("visible", ClarkName::new(OC, "user-visible")),
        ]),
    );

    let url = client.resolve("systemtags/").unwrap();
    let response = client
        .propfind(&url, &[], Depth::One, &HeaderMap::new(), &schema)
        .await
        .unwrap();
    assert!(response.is_success(), "server returned {}", response.status);

    let tags = match response.body {
        // The first entry is the collection itself.
        ResponseBody::Multistatus(records) => records.into_iter().skip(1).collect::<Vec<_>>(),
        other => panic!("expected a multistatus response, got {other:?}"),
    };

    println!("found {} tags...", tags.len());
    for tag in tags {
        let field = |key: &str| tag.properties.get(key).map(ToString::to_string);
        println!(
            "🏷 {}: {} (visible: {})",
            tag.id,
            field("name").unwrap_or_default(),
            field("visible").unwrap_or_default(),
        );
    }
}
