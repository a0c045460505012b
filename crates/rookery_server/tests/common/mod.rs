//! Shared harness: a router over a temporary filesystem store.

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rookery_auth_file::CredentialStore;
use rookery_fs::FileSystemStorage;
use rookery_server::{RookeryServer, RookeryServerConfig};
use tempfile::TempDir;
use tower::ServiceExt;

pub const USERS: &str = "\
deployer:secret:write
reader:letmein:read
browser:peek:list
";

pub const DEPLOYER: (&str, &str) = ("deployer", "secret");
pub const READER: (&str, &str) = ("reader", "letmein");
pub const BROWSER: (&str, &str) = ("browser", "peek");

pub struct TestServer {
    pub router: Router,
    pub storage: FileSystemStorage,
    _root: TempDir,
}

impl TestServer {
    pub fn new() -> Self {
        Self::with(RookeryServerConfig::default(), CredentialStore::parse("users.txt", USERS))
    }

    pub fn with(config: RookeryServerConfig, credentials: CredentialStore) -> Self {
        let root = TempDir::new().unwrap();
        let storage = FileSystemStorage::new(root.path());
        let router = RookeryServer::new(config)
            .build(storage.clone(), credentials)
            .unwrap();

        Self {
            router,
            storage,
            _root: root,
        }
    }

    pub fn request(&self, method: &str, uri: &str) -> TestRequest<'_> {
        TestRequest {
            router: &self.router,
            builder: Request::builder().method(method).uri(uri),
            body: Body::empty(),
        }
    }

    /// Uploads as the deployer and asserts the write was accepted.
    pub async fn deploy(&self, key: &str, body: &'static [u8], content_type: &str) {
        let response = self
            .request("PUT", &format!("/{key}"))
            .basic_auth(DEPLOYER)
            .header("Content-Type", content_type)
            .body(body)
            .send()
            .await;
        assert_eq!(response.status, StatusCode::ACCEPTED, "deploying {key}");
    }
}

pub struct TestRequest<'a> {
    router: &'a Router,
    builder: axum::http::request::Builder,
    body: Body,
}

impl TestRequest<'_> {
    pub fn basic_auth(self, (user, pass): (&str, &str)) -> Self {
        let token = STANDARD.encode(format!("{user}:{pass}"));
        self.header("Authorization", &format!("Basic {token}"))
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    pub fn body(mut self, body: &'static [u8]) -> Self {
        self.body = Body::from(body);
        self
    }

    pub async fn send(self) -> TestResponse {
        let request = self.builder.body(self.body).unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    /// Entry names of a directory listing, in response order.
    pub fn names(&self) -> Vec<String> {
        self.json()["entries"]
            .as_array()
            .unwrap()
            .iter()
            .map(|entry| entry["name"].as_str().unwrap().to_string())
            .collect()
    }
}
