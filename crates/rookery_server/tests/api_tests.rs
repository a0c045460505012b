//! Integration tests for the repository HTTP surface.

mod common;

use axum::http::StatusCode;
use common::*;
use rookery_auth_file::CredentialStore;
use rookery_core::prelude::*;
use rookery_fs::FileSystemStorage;
use rookery_server::{RookeryServer, RookeryServerConfig};

fn cached_config() -> RookeryServerConfig {
    RookeryServerConfig {
        properties: Properties::new()
            .with(PROPERTY_CACHE_CONTROL_FETCH, "public, max-age=3600")
            .with(PROPERTY_CACHE_CONTROL_LIST, "no-cache"),
        ..Default::default()
    }
}

fn unique_config() -> RookeryServerConfig {
    RookeryServerConfig {
        unique_artifacts: true,
        ..Default::default()
    }
}

#[tokio::test]
async fn health_needs_no_credentials() {
    let server = TestServer::new();
    let response = server.request("GET", "/health").send().await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(&response.body[..], b"OK");
}

#[tokio::test]
async fn empty_root_lists_no_entries() {
    let server = TestServer::new();
    let response = server.request("GET", "/").basic_auth(BROWSER).send().await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["request_path"], "/");
    assert!(response.names().is_empty());
}

#[tokio::test]
async fn missing_directory_is_not_found() {
    let server = TestServer::new();
    let response = server
        .request("GET", "/org/missing/")
        .basic_auth(BROWSER)
        .send()
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_puts_directories_first_then_names() {
    let server = TestServer::new();
    server.deploy("c.txt", b"c", "text/plain").await;
    server.deploy("b.txt", b"b", "text/plain").await;
    server.deploy("a/x.jar", b"x", "application/java-archive").await;

    let response = server.request("GET", "/").basic_auth(READER).send().await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.names(), ["a/", "b.txt", "c.txt"]);

    let entries = response.json()["entries"].clone();
    assert_eq!(entries[0]["is_directory"], true);
    assert_eq!(entries[0]["size"], "-");
    assert_eq!(entries[1]["size"], "1B");
}

#[tokio::test]
async fn nested_listing_strips_the_prefix() {
    let server = TestServer::new();
    server.deploy("org/acme/lib/1.0/lib-1.0.jar", b"jar", "application/java-archive").await;
    server.deploy("org/acme/lib/1.0/lib-1.0.pom", b"<project/>", "text/xml").await;
    server.deploy("org/acme/lib/maven-metadata.xml", b"<metadata/>", "text/xml").await;

    let response = server
        .request("GET", "/org/acme/lib/")
        .basic_auth(BROWSER)
        .send()
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["request_path"], "org/acme/lib/");
    assert_eq!(response.names(), ["1.0/", "maven-metadata.xml"]);
}

#[tokio::test]
async fn upload_then_download_round_trips_body_and_content_type() {
    let server = TestServer::new();
    server.deploy("a/b.jar", b"jar-bytes", "application/java-archive").await;

    let response = server.request("GET", "/a/b.jar").basic_auth(READER).send().await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(&response.body[..], b"jar-bytes");
    assert_eq!(response.header("content-type"), Some("application/java-archive"));
    assert!(response.header("etag").is_some());
    assert!(response.header("last-modified").is_some());
}

#[tokio::test]
async fn missing_artifact_is_not_found() {
    let server = TestServer::new();
    let response = server
        .request("GET", "/a/nothing.jar")
        .basic_auth(READER)
        .send()
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn matching_etag_is_not_modified() {
    let server = TestServer::new();
    server.deploy("a/b.jar", b"jar-bytes", "application/java-archive").await;

    let first = server.request("GET", "/a/b.jar").basic_auth(READER).send().await;
    let etag = first.header("etag").unwrap().to_string();

    let second = server
        .request("GET", "/a/b.jar")
        .basic_auth(READER)
        .header("If-None-Match", &etag)
        .send()
        .await;

    assert_eq!(second.status, StatusCode::NOT_MODIFIED);
    assert!(second.body.is_empty());
    assert_eq!(second.header("etag"), Some(etag.as_str()));
    assert!(second.header("last-modified").is_some());
    assert_eq!(second.header("content-type"), Some("application/java-archive"));
}

#[tokio::test]
async fn stale_etag_serves_the_body() {
    let server = TestServer::new();
    server.deploy("a/b.jar", b"jar-bytes", "application/java-archive").await;

    let response = server
        .request("GET", "/a/b.jar")
        .basic_auth(READER)
        .header("If-None-Match", "\"something-else\"")
        .send()
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(&response.body[..], b"jar-bytes");
}

#[tokio::test]
async fn unchanged_since_last_modified_is_not_modified() {
    let server = TestServer::new();
    server.deploy("a/b.jar", b"jar-bytes", "application/java-archive").await;

    let first = server.request("GET", "/a/b.jar").basic_auth(READER).send().await;
    let last_modified = first.header("last-modified").unwrap().to_string();

    let second = server
        .request("GET", "/a/b.jar")
        .basic_auth(READER)
        .header("If-Modified-Since", &last_modified)
        .send()
        .await;

    assert_eq!(second.status, StatusCode::NOT_MODIFIED);
}

#[tokio::test]
async fn failed_if_match_is_precondition_failed() {
    let server = TestServer::new();
    server.deploy("a/b.jar", b"jar-bytes", "application/java-archive").await;

    let response = server
        .request("GET", "/a/b.jar")
        .basic_auth(READER)
        .header("If-Match", "\"not-the-tag\"")
        .send()
        .await;

    assert_eq!(response.status, StatusCode::PRECONDITION_FAILED);
}

#[tokio::test]
async fn missing_credentials_are_challenged() {
    let server = TestServer::new();
    let response = server.request("GET", "/").send().await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.header("www-authenticate"),
        Some("Basic realm=\"rookery\"")
    );
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let server = TestServer::new();
    let response = server
        .request("GET", "/")
        .basic_auth(("reader", "guess"))
        .send()
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn role_checks_are_per_route() {
    let server = TestServer::new();
    server.deploy("a/b.jar", b"jar-bytes", "application/java-archive").await;

    let browse = server.request("GET", "/a/").basic_auth(BROWSER).send().await;
    assert_eq!(browse.status, StatusCode::OK);

    let fetch = server.request("GET", "/a/b.jar").basic_auth(BROWSER).send().await;
    assert_eq!(fetch.status, StatusCode::FORBIDDEN);

    let upload = server
        .request("PUT", "/a/c.jar")
        .basic_auth(READER)
        .body(b"nope")
        .send()
        .await;
    assert_eq!(upload.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn anonymous_identity_applies_without_a_header() {
    let credentials = CredentialStore::parse("users.txt", USERS).with_anonymous(["read"]);
    let server = TestServer::with(RookeryServerConfig::default(), credentials);
    server.deploy("a/b.jar", b"jar-bytes", "application/java-archive").await;

    let fetch = server.request("GET", "/a/b.jar").send().await;
    assert_eq!(fetch.status, StatusCode::OK);

    let upload = server.request("PUT", "/a/c.jar").body(b"nope").send().await;
    assert_eq!(upload.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn redeploy_replaces_when_uniqueness_is_off() {
    let server = TestServer::new();
    server.deploy("a/b.jar", b"first", "application/java-archive").await;
    server.deploy("a/b.jar", b"second", "application/java-archive").await;

    let response = server.request("GET", "/a/b.jar").basic_auth(READER).send().await;
    assert_eq!(&response.body[..], b"second");
}

#[tokio::test]
async fn redeploy_conflicts_when_uniqueness_is_on() {
    let server = TestServer::with(unique_config(), CredentialStore::parse("users.txt", USERS));
    server.deploy("a/b.jar", b"first", "application/java-archive").await;

    let response = server
        .request("PUT", "/a/b.jar")
        .basic_auth(DEPLOYER)
        .body(b"second")
        .send()
        .await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    let message = String::from_utf8(response.body.to_vec()).unwrap();
    assert!(message.contains(PROPERTY_UNIQUE_ARTIFACT));

    let stored = server.request("GET", "/a/b.jar").basic_auth(READER).send().await;
    assert_eq!(&stored.body[..], b"first");
}

#[tokio::test]
async fn maven_metadata_is_always_overwritable() {
    let server = TestServer::with(unique_config(), CredentialStore::parse("users.txt", USERS));
    server.deploy("a/maven-metadata.xml", b"<v1/>", "text/xml").await;
    server.deploy("a/maven-metadata.xml", b"<v2/>", "text/xml").await;
    server.deploy("a/maven-metadata.xml.sha1", b"abc", "text/plain").await;
    server.deploy("a/maven-metadata.xml.sha1", b"def", "text/plain").await;
}

#[tokio::test]
async fn upload_to_directory_path_is_rejected() {
    let server = TestServer::new();
    let response = server
        .request("PUT", "/a/")
        .basic_auth(DEPLOYER)
        .body(b"data")
        .send()
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn configured_cache_control_applies_to_successful_gets() {
    let server = TestServer::with(cached_config(), CredentialStore::parse("users.txt", USERS));
    server.deploy("a/b.jar", b"jar-bytes", "application/java-archive").await;

    let fetch = server.request("GET", "/a/b.jar").basic_auth(READER).send().await;
    assert_eq!(fetch.header("cache-control"), Some("max-age=3600, public"));

    let list = server.request("GET", "/a/").basic_auth(READER).send().await;
    assert_eq!(list.header("cache-control"), Some("no-cache"));
}

#[tokio::test]
async fn cache_control_skips_failures_and_writes() {
    let server = TestServer::with(cached_config(), CredentialStore::parse("users.txt", USERS));

    let upload = server
        .request("PUT", "/a/b.jar")
        .basic_auth(DEPLOYER)
        .body(b"jar")
        .send()
        .await;
    assert_eq!(upload.status, StatusCode::ACCEPTED);
    assert_eq!(upload.header("cache-control"), None);

    let missing = server.request("GET", "/a/c.jar").basic_auth(READER).send().await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.header("cache-control"), None);

    let etag = server
        .request("GET", "/a/b.jar")
        .basic_auth(READER)
        .send()
        .await
        .header("etag")
        .unwrap()
        .to_string();
    let fresh = server
        .request("GET", "/a/b.jar")
        .basic_auth(READER)
        .header("If-None-Match", &etag)
        .send()
        .await;
    assert_eq!(fresh.status, StatusCode::NOT_MODIFIED);
    assert_eq!(fresh.header("cache-control"), None);
}

#[tokio::test]
async fn unset_cache_properties_add_no_header() {
    let server = TestServer::new();
    server.deploy("a/b.jar", b"jar-bytes", "application/java-archive").await;

    let fetch = server.request("GET", "/a/b.jar").basic_auth(READER).send().await;
    assert_eq!(fetch.header("cache-control"), None);
}

#[test]
fn invalid_cache_property_fails_the_build() {
    let root = tempfile::TempDir::new().unwrap();
    let config = RookeryServerConfig {
        properties: Properties::new().with(PROPERTY_CACHE_CONTROL_FETCH, "max-age=soon"),
        ..Default::default()
    };

    let result = RookeryServer::new(config).build(
        FileSystemStorage::new(root.path()),
        CredentialStore::parse("users.txt", USERS),
    );

    assert!(matches!(result, Err(ConfigError::CacheControl { .. })));
}

#[tokio::test]
async fn delete_removes_the_tree_and_reports_the_count() {
    let server = TestServer::new();
    server.deploy("org/acme/lib/1.0/lib-1.0.jar", b"jar", "application/java-archive").await;
    server.deploy("org/acme/lib/1.0/lib-1.0.pom", b"pom", "text/xml").await;
    server.deploy("org/acme/lib/maven-metadata.xml", b"meta", "text/xml").await;
    server.deploy("org/other/keep.jar", b"keep", "application/java-archive").await;

    let response = server
        .request("DELETE", "/org/acme/")
        .basic_auth(DEPLOYER)
        .send()
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(&response.body[..], b"3");

    let gone = server.request("GET", "/org/acme/").basic_auth(READER).send().await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);

    let kept = server.request("GET", "/org/").basic_auth(READER).send().await;
    assert_eq!(kept.names(), ["other/"]);
}

#[tokio::test]
async fn delete_of_missing_directory_counts_zero() {
    let server = TestServer::new();
    let response = server
        .request("DELETE", "/nothing/here/")
        .basic_auth(DEPLOYER)
        .send()
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(&response.body[..], b"0");
}

#[tokio::test]
async fn delete_requires_a_directory_and_write_role() {
    let server = TestServer::new();
    server.deploy("a/b.jar", b"jar", "application/java-archive").await;

    let file = server.request("DELETE", "/a/b.jar").basic_auth(DEPLOYER).send().await;
    assert_eq!(file.status, StatusCode::METHOD_NOT_ALLOWED);

    let reader = server.request("DELETE", "/a/").basic_auth(READER).send().await;
    assert_eq!(reader.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn delete_checks_credentials_before_path_shape() {
    let server = TestServer::new();
    server.deploy("a/b.jar", b"jar", "application/java-archive").await;

    let anonymous = server.request("DELETE", "/a/b.jar").send().await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let reader = server.request("DELETE", "/a/b.jar").basic_auth(READER).send().await;
    assert_eq!(reader.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn directory_path_through_an_artifact_does_not_exist() {
    let server = TestServer::new();
    server.deploy("a/b.jar", b"jar", "application/java-archive").await;

    let listing = server.request("GET", "/a/b.jar/").basic_auth(DEPLOYER).send().await;
    assert_eq!(listing.status, StatusCode::NOT_FOUND);

    let delete = server.request("DELETE", "/a/b.jar/").basic_auth(DEPLOYER).send().await;
    assert_eq!(delete.status, StatusCode::OK);
    assert_eq!(&delete.body[..], b"0");

    let kept = server.request("GET", "/a/b.jar").basic_auth(READER).send().await;
    assert_eq!(&kept.body[..], b"jar");
}

#[tokio::test]
async fn artifact_beside_a_json_named_directory_keeps_its_metadata() {
    let server = TestServer::new();
    server.deploy("lib", b"one", "text/plain").await;
    server.deploy("lib.json/a.jar", b"two", "application/java-archive").await;

    let response = server.request("GET", "/lib.json/a.jar").basic_auth(READER).send().await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(&response.body[..], b"two");
    assert_eq!(response.header("content-type"), Some("application/java-archive"));
}

#[tokio::test]
async fn failed_upload_is_not_readable() {
    let server = TestServer::new();
    server.deploy("lib", b"one", "text/plain").await;

    let upload = server
        .request("PUT", "/lib/a.jar")
        .basic_auth(DEPLOYER)
        .body(b"two")
        .send()
        .await;
    assert!(upload.status.is_server_error());

    let fetch = server.request("GET", "/lib/a.jar").basic_auth(READER).send().await;
    assert_eq!(fetch.status, StatusCode::NOT_FOUND);
}
