use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::{Error, Result};

pub const DEFAULT_CONCURRENCY: u64 = 10;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MESSAGES_PER_CONVERSATION: u64 = 3;
pub const DEFAULT_PLACEHOLDER: &str = "{{conversationId}}";
pub const DEFAULT_CREATE_BODY: &str = r#"{"title":"new conversation"}"#;
pub const DEFAULT_MESSAGE_BODY_TEMPLATE: &str =
    r#"{"conversationId":"{{conversationId}}","content":"Hello!"}"#;

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn parse(s: &str) -> Result<Self> {
        s.trim()
            .parse()
            .map_err(|_| Error::InvalidMethod(s.to_string()))
    }

    #[must_use]
    pub fn as_http(self) -> http::Method {
        match self {
            Self::Get => http::Method::GET,
            Self::Post => http::Method::POST,
            Self::Put => http::Method::PUT,
            Self::Patch => http::Method::PATCH,
            Self::Delete => http::Method::DELETE,
        }
    }
}

/// Request payload: sent verbatim, or serialized as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestBody {
    Text(String),
    Json(serde_json::Value),
}

impl RequestBody {
    /// Interpret user input: valid JSON becomes a structured body, anything else is raw text.
    pub fn from_input(raw: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(serde_json::Value::String(s)) => Self::Text(s),
            Ok(v) => Self::Json(v),
            Err(_) => Self::Text(raw.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestTarget {
    pub url: String,
    pub method: HttpMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<RequestBody>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationTarget {
    pub create_url: String,
    pub message_url: String,
    pub create_body: String,
    /// Every occurrence of `placeholder` is replaced with the created id.
    pub message_body_template: String,
    pub messages_per_conversation: u64,
    pub placeholder: String,
}

impl ConversationTarget {
    pub fn new(create_url: impl Into<String>, message_url: impl Into<String>) -> Self {
        Self {
            create_url: create_url.into(),
            message_url: message_url.into(),
            create_body: DEFAULT_CREATE_BODY.to_string(),
            message_body_template: DEFAULT_MESSAGE_BODY_TEMPLATE.to_string(),
            messages_per_conversation: DEFAULT_MESSAGES_PER_CONVERSATION,
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum RunMode {
    /// Every unit of work is one request.
    Single(RequestTarget),
    /// Every unit of work is one create request plus its follow-up messages.
    Conversation(ConversationTarget),
}

impl RunMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Single(_) => "single",
            Self::Conversation(_) => "conversation",
        }
    }
}

/// When the worker pool stops starting new units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopCondition {
    #[serde(rename = "durationSec", serialize_with = "duration_secs")]
    Duration(Duration),
    /// Total units (requests, or conversations) to attempt.
    #[serde(rename = "total")]
    Total(u64),
}

impl StopCondition {
    /// Build from the two optional user inputs. Neither set means a single unit.
    pub fn from_parts(duration: Option<Duration>, total: Option<u64>) -> Result<Self> {
        let stop = match (duration, total) {
            (Some(_), Some(_)) => return Err(Error::ConflictingStopConditions),
            (Some(d), None) => Self::Duration(d),
            (None, Some(n)) => Self::Total(n),
            (None, None) => Self::Total(1),
        };
        stop.validate()?;
        Ok(stop)
    }

    fn validate(&self) -> Result<()> {
        match self {
            Self::Duration(d) if d.is_zero() => Err(Error::InvalidDuration),
            Self::Total(0) => Err(Error::InvalidTotal),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Display for StopCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Duration(d) => write!(f, "duration={d:?}"),
            Self::Total(n) => write!(f, "total={n}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    #[serde(flatten)]
    pub mode: RunMode,
    pub headers: BTreeMap<String, String>,
    pub concurrency: u64,
    pub stop: StopCondition,
    #[serde(rename = "timeoutMs", serialize_with = "duration_millis")]
    pub timeout: Duration,
}

impl RunConfig {
    pub fn new(mode: RunMode, stop: StopCondition) -> Self {
        Self {
            mode,
            headers: BTreeMap::new(),
            concurrency: DEFAULT_CONCURRENCY,
            stop,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Reject anything that would make the run meaningless before a worker starts.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::InvalidConcurrency);
        }
        if self.timeout.is_zero() {
            return Err(Error::InvalidTimeout);
        }
        self.stop.validate()?;

        for (name, value) in &self.headers {
            if http::header::HeaderName::from_bytes(name.as_bytes()).is_err()
                || http::header::HeaderValue::from_str(value).is_err()
            {
                return Err(Error::InvalidHeader(name.clone()));
            }
        }

        match &self.mode {
            RunMode::Single(target) => validate_url("url", &target.url),
            RunMode::Conversation(target) => {
                validate_url("createUrl", &target.create_url)?;
                validate_url("messageUrl", &target.message_url)?;
                if target.placeholder.is_empty() {
                    return Err(Error::EmptyPlaceholder);
                }
                Ok(())
            }
        }
    }
}

fn validate_url(field: &'static str, raw: &str) -> Result<()> {
    if raw.trim().is_empty() {
        return Err(Error::MissingUrl(field));
    }

    let invalid = || Error::InvalidUrl {
        field,
        url: raw.to_string(),
    };
    let parsed = url::Url::parse(raw).map_err(|_| invalid())?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(invalid());
    }
    Ok(())
}

fn duration_secs<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

fn duration_millis<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis().min(u64::MAX as u128) as u64)
}
