use std::error::Error as _;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum HttpTransportErrorKind {
    InvalidUrl,
    UnsupportedScheme,
    RequestBuild,
    HeaderName,
    HeaderValue,
    Request,
    Timeout,
    BodyRead,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("only http:// and https:// URLs are supported: {0}")]
    UnsupportedScheme(String),

    #[error("http request build failed: {0}")]
    RequestBuild(#[from] http::Error),

    #[error("invalid http header name: {0}")]
    HeaderName(#[from] http::header::InvalidHeaderName),

    #[error("invalid http header value: {0}")]
    HeaderValue(#[from] http::header::InvalidHeaderValue),

    #[error("http request failed: {0}")]
    Request(#[from] hyper_util::client::legacy::Error),

    #[error("http request timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to read response body: {0}")]
    BodyRead(#[from] hyper::Error),
}

impl Error {
    #[must_use]
    pub fn transport_error_kind(&self) -> HttpTransportErrorKind {
        match self {
            Self::InvalidUrl(_) => HttpTransportErrorKind::InvalidUrl,
            Self::UnsupportedScheme(_) => HttpTransportErrorKind::UnsupportedScheme,
            Self::RequestBuild(_) => HttpTransportErrorKind::RequestBuild,
            Self::HeaderName(_) => HttpTransportErrorKind::HeaderName,
            Self::HeaderValue(_) => HttpTransportErrorKind::HeaderValue,
            Self::Request(_) => HttpTransportErrorKind::Request,
            Self::Timeout(_) => HttpTransportErrorKind::Timeout,
            Self::BodyRead(_) => HttpTransportErrorKind::BodyRead,
        }
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Message text including the innermost cause.
    ///
    /// hyper's client errors only say "client error (Connect)" at the top level; the useful
    /// part (e.g. "Connection refused") lives at the bottom of the source chain.
    #[must_use]
    pub fn describe(&self) -> String {
        let top = self.to_string();

        let mut root: Option<&(dyn std::error::Error + 'static)> = self.source();
        while let Some(next) = root.and_then(|e| e.source()) {
            root = Some(next);
        }

        match root.map(|e| e.to_string()) {
            Some(cause) if !cause.is_empty() && !top.contains(&cause) => format!("{top}: {cause}"),
            _ => top,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_without_source_is_display() {
        let err = Error::InvalidUrl("nope".to_string());
        assert_eq!(err.describe(), "invalid url: nope");
        assert_eq!(err.transport_error_kind(), HttpTransportErrorKind::InvalidUrl);
    }

    #[test]
    fn transport_error_kind_renders_snake_case() {
        assert_eq!(HttpTransportErrorKind::BodyRead.to_string(), "body_read");
        assert_eq!(
            "unsupported_scheme".parse::<HttpTransportErrorKind>().ok(),
            Some(HttpTransportErrorKind::UnsupportedScheme)
        );
    }
}
