//! HTTP transport for the Xray API
//!
//! Concrete transport enum wrapping the real and fake implementations,
//! avoiding dyn dispatch. Callers see completed HTTP exchanges as
//! `HttpResponse`; only transport-level failures become errors.

pub use crate::client::transport_fake::{FakeTransport, RecordedRequest};
pub use crate::client::transport_http::HttpTransport;
use crate::errors::XrayError;

/// A completed HTTP exchange. Status handling is the caller's business.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Concrete transport enum
#[derive(Debug)]
pub enum Transport {
    Http(HttpTransport),
    Fake(FakeTransport),
}

impl Transport {
    /// POST a JSON body and return the completed exchange.
    ///
    /// `Err` means the request never completed (DNS, TCP, TLS, timeout);
    /// every HTTP status, including 4xx/5xx, comes back as `Ok`.
    pub async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, String)],
        body: &str,
    ) -> Result<HttpResponse, XrayError> {
        match self {
            Transport::Http(t) => t.post_json(url, headers, body).await,
            Transport::Fake(t) => t.post_json(url, headers, body).await,
        }
    }
}
