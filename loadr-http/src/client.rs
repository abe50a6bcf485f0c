use bytes::Bytes;
use http_body_util::{BodyExt as _, Full};
use hyper::Request;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use std::time::Duration;

use super::util::{has_header, host_header_value};
use super::{Error, HttpRequest, HttpResponse, Result};

/// Shared HTTP/1.1 client. Cloning is cheap and clones share one connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    connect_timeout: Option<Duration>,
}

impl Default for HttpClient {
    /// No separate connect cap; the per-request timeout bounds the whole exchange.
    fn default() -> Self {
        Self::new(None)
    }
}

impl HttpClient {
    #[must_use]
    pub fn new(connect_timeout: Option<Duration>) -> Self {
        let mut http_connector = HttpConnector::new();
        http_connector.enforce_http(false);
        http_connector.set_connect_timeout(connect_timeout);
        http_connector.set_nodelay(true);

        let https_connector = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .wrap_connector(http_connector);

        let inner = Client::builder(TokioExecutor::new()).build(https_connector);

        Self {
            inner,
            connect_timeout,
        }
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    /// Issue one request. If `req.timeout` is set and elapses before the response body has
    /// been fully read, the exchange is dropped (aborting the connection) and
    /// [`Error::Timeout`] is returned.
    pub async fn request(&self, req: HttpRequest) -> Result<HttpResponse> {
        match req.timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.exchange(req))
                .await
                .map_err(|_| Error::Timeout(timeout))?,
            None => self.exchange(req).await,
        }
    }

    pub async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.request(HttpRequest::get(url)).await
    }

    async fn exchange(&self, req: HttpRequest) -> Result<HttpResponse> {
        let parsed = url::Url::parse(&req.url).map_err(|_| Error::InvalidUrl(req.url.clone()))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(Error::UnsupportedScheme(req.url));
        }

        let uri: hyper::Uri = req
            .url
            .parse()
            .map_err(|_| Error::InvalidUrl(req.url.to_string()))?;

        let mut builder = Request::builder().method(req.method).uri(uri);

        if !has_header(&req.headers, "host")
            && let Some(host) = host_header_value(&parsed)
        {
            builder = builder.header(http::header::HOST, host);
        }
        if !req.body.is_empty() && !has_header(&req.headers, "content-length") {
            builder = builder.header(http::header::CONTENT_LENGTH, req.body.len());
        }

        for (k, v) in req.headers {
            let name = http::header::HeaderName::from_bytes(k.as_bytes())?;
            let value = http::header::HeaderValue::from_str(&v)?;
            builder = builder.header(name, value);
        }

        let req: Request<Full<Bytes>> = builder.body(Full::new(req.body))?;
        let res = self.inner.request(req).await?;

        let status = res.status().as_u16();
        let body = res.into_body().collect().await?.to_bytes();

        Ok(HttpResponse { status, body })
    }
}
