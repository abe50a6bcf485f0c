use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use bytes::Bytes;
use loadr_http::{HttpClient, HttpRequest, has_header};

use crate::config::{HttpMethod, RequestBody};
use crate::error::Result;
use crate::sample::{SampleRecord, StepKind};

/// Error classification recorded when a request hits its timeout.
pub const TIMEOUT_ERROR: &str = "timeout";

const JSON_CONTENT_TYPE: &str = "application/json";

/// A request with its body already encoded, reusable across many executions.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    method: http::Method,
    url: String,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl PreparedRequest {
    /// Encodes `body`. A JSON body gets `content-type: application/json` unless the headers
    /// already carry a content type.
    pub fn new(
        method: HttpMethod,
        url: &str,
        headers: &BTreeMap<String, String>,
        body: Option<&RequestBody>,
    ) -> Result<Self> {
        let mut headers: Vec<(String, String)> =
            headers.iter().map(|(k, v)| (k.clone(), v.clone())).collect();

        let body = match body {
            None => Bytes::new(),
            Some(RequestBody::Text(text)) => Bytes::from(text.clone()),
            Some(RequestBody::Json(value)) => {
                if !has_header(&headers, "content-type") {
                    headers.push(("content-type".to_string(), JSON_CONTENT_TYPE.to_string()));
                }
                Bytes::from(serde_json::to_vec(value)?)
            }
        };

        Ok(Self {
            method: method.as_http(),
            url: url.to_string(),
            headers,
            body,
        })
    }

    /// Same target and headers, different raw body.
    #[must_use]
    pub fn with_body(&self, body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            ..self.clone()
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn to_http(&self, timeout: Duration) -> HttpRequest {
        HttpRequest::new(self.method.clone(), self.url.clone())
            .with_headers(self.headers.clone())
            .with_body(self.body.clone())
            .with_timeout(timeout)
    }
}

/// Result of one execution. `body` is kept for callers that need to inspect the response
/// and is never stored in samples.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub started: Instant,
    pub finished: Instant,
    pub ok: bool,
    pub status: Option<u16>,
    pub error: Option<String>,
    pub response_size: Option<u64>,
    pub body: Option<Bytes>,
}

impl Outcome {
    /// Convert into a sample with offsets relative to `epoch` (the run start).
    pub fn to_sample(&self, kind: StepKind, epoch: Instant) -> SampleRecord {
        SampleRecord {
            kind,
            started: self.started.saturating_duration_since(epoch),
            finished: self.finished.saturating_duration_since(epoch),
            ok: self.ok,
            status: self.status,
            error: self.error.clone(),
            response_size: self.response_size,
        }
    }
}

/// Issue one request and classify the result. Never fails: transport problems become
/// `ok = false` outcomes with an error string, and non-2xx/3xx responses become `ok = false`
/// outcomes with a status. No retries.
pub async fn execute(client: &HttpClient, req: &PreparedRequest, timeout: Duration) -> Outcome {
    let started = Instant::now();
    let res = client.request(req.to_http(timeout)).await;
    let finished = Instant::now();

    match res {
        Ok(res) => {
            tracing::trace!(url = %req.url, status = res.status, "response");
            Outcome {
                started,
                finished,
                ok: res.is_success(),
                status: Some(res.status),
                error: None,
                response_size: Some(res.body.len() as u64),
                body: Some(res.body),
            }
        }
        Err(err) => {
            let error = if err.is_timeout() {
                TIMEOUT_ERROR.to_string()
            } else {
                err.describe()
            };
            tracing::trace!(url = %req.url, kind = %err.transport_error_kind(), %error, "transport error");
            Outcome {
                started,
                finished,
                ok: false,
                status: None,
                error: Some(error),
                response_size: None,
                body: None,
            }
        }
    }
}
