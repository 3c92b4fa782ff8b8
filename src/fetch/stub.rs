//! Canned-response [`HttpClient`] for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::{Method, Request, Response};

use super::client::HttpClient;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Serves fixed responses keyed by the full request URL. Unknown URLs get a
/// 404 with an empty body.
#[derive(Default)]
pub struct StubClient {
    responses: HashMap<String, (u16, String)>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl StubClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, url: &str, status: u16, body: &str) -> Self {
        self.responses
            .insert(url.to_string(), (status, body.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for StubClient {
    async fn execute(&self, req: Request) -> reqwest::Result<Response> {
        let header = |name: reqwest::header::HeaderName| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let url = req.url().to_string();
        let recorded = RecordedRequest {
            method: req.method().clone(),
            url: url.clone(),
            authorization: header(reqwest::header::AUTHORIZATION),
            content_type: header(reqwest::header::CONTENT_TYPE),
            body: req
                .body()
                .and_then(|b| b.as_bytes())
                .map(<[u8]>::to_vec)
                .unwrap_or_default(),
        };
        self.requests.lock().unwrap().push(recorded);

        let (status, body) = self
            .responses
            .get(&url)
            .cloned()
            .unwrap_or((404, String::new()));
        let resp = http::Response::builder()
            .status(status)
            .body(body)
            .unwrap();
        Ok(Response::from(resp))
    }
}
