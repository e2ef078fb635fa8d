//! Fake transport for testing
//!
//! Serves scripted replies instead of real HTTP calls and records every
//! request so tests can assert call counts and payloads.

use std::collections::VecDeque;

use tokio::sync::Mutex;

use crate::client::transport::HttpResponse;
use crate::errors::XrayError;

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum FakeReply {
    /// Complete the exchange with this status and body.
    Response(u16, String),
    /// Fail at the transport level with this message.
    NetworkError(String),
}

/// A request the fake transport has seen.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub body: String,
    pub headers: Vec<(String, String)>,
}

/// Fake transport serving a scripted reply queue.
///
/// Replies are consumed in order; when the queue is empty the fallback
/// reply (if any) is served indefinitely.
#[derive(Debug, Default)]
pub struct FakeTransport {
    script: Mutex<VecDeque<FakeReply>>,
    fallback: Mutex<Option<FakeReply>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport that answers every request with the same reply.
    pub fn replying(status: u16, body: &str) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(Some(FakeReply::Response(status, body.to_string()))),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a scripted response.
    pub async fn push_response(&self, status: u16, body: &str) {
        self.script
            .lock()
            .await
            .push_back(FakeReply::Response(status, body.to_string()));
    }

    /// Queue a scripted transport failure.
    pub async fn push_network_error(&self, message: &str) {
        self.script
            .lock()
            .await
            .push_back(FakeReply::NetworkError(message.to_string()));
    }

    /// Reply served once the script runs dry.
    pub async fn set_fallback(&self, status: u16, body: &str) {
        *self.fallback.lock().await = Some(FakeReply::Response(status, body.to_string()));
    }

    /// All requests seen so far.
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }

    /// Number of requests whose URL contains `fragment`.
    pub async fn request_count_to(&self, fragment: &str) -> usize {
        self.requests
            .lock()
            .await
            .iter()
            .filter(|r| r.url.contains(fragment))
            .count()
    }

    pub async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, String)],
        body: &str,
    ) -> Result<HttpResponse, XrayError> {
        self.requests.lock().await.push(RecordedRequest {
            url: url.to_string(),
            body: body.to_string(),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        });

        let scripted = self.script.lock().await.pop_front();
        let reply = match scripted {
            Some(reply) => Some(reply),
            None => self.fallback.lock().await.clone(),
        };

        match reply {
            Some(FakeReply::Response(status, body)) => Ok(HttpResponse { status, body }),
            Some(FakeReply::NetworkError(message)) => Err(XrayError::Network(message)),
            None => Err(XrayError::Network(format!(
                "FakeTransport has no reply scripted for {url}"
            ))),
        }
    }
}
