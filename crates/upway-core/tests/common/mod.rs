// Shared fixtures for upway-core integration tests.
#![allow(dead_code, clippy::unwrap_used)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use secrecy::SecretString;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use upway_api::{Credentials, PortalSession, TransportConfig};
use upway_core::{CoreError, PublishSink};

pub const SYSTEM_ID: &str = "123456";
pub const RETURN_URL: &str = "/system/123456/Status/Overview";

/// One recorded publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

/// Sink that records every publish and reports a settable pending count.
#[derive(Debug, Default)]
pub struct RecordingSink {
    published: Mutex<Vec<Published>>,
    pending: AtomicUsize,
    shutdowns: AtomicUsize,
}

impl RecordingSink {
    pub fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }

    pub fn state_publishes(&self) -> Vec<(String, String)> {
        self.published()
            .into_iter()
            .filter(|p| !p.retain)
            .map(|p| (p.topic, p.payload))
            .collect()
    }

    pub fn retained_count(&self) -> usize {
        self.published().iter().filter(|p| p.retain).count()
    }

    pub fn clear(&self) {
        self.published.lock().unwrap().clear();
    }

    pub fn set_pending(&self, n: usize) {
        self.pending.store(n, Ordering::SeqCst);
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

impl PublishSink for RecordingSink {
    async fn enqueue(&self, topic: &str, payload: String, retain: bool) -> Result<(), CoreError> {
        self.published.lock().unwrap().push(Published {
            topic: topic.to_owned(),
            payload,
            retain,
        });
        Ok(())
    }

    fn pending_count(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    async fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

pub async fn portal() -> (MockServer, PortalSession) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let credentials = Credentials::new("me@example.com", SecretString::from("pw".to_string()));
    let session =
        PortalSession::new(base_url, SYSTEM_ID, credentials, &TransportConfig::default()).unwrap();
    (server, session)
}

pub fn redirect_to(location: &str) -> ResponseTemplate {
    ResponseTemplate::new(302).insert_header("Location", location)
}

pub async fn mount_login_ok(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/LogIn"))
        .respond_with(redirect_to(RETURN_URL).insert_header("Set-Cookie", "session=abc; Path=/"))
        .expect(expected_calls)
        .mount(server)
        .await;
}

pub async fn mount_values(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/PrivateAPI/Values"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}
