use async_trait::async_trait;
use bytes::Bytes;

use crate::error::GenericError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub content_type: &'static str,
    pub body: Bytes,
    pub basic_auth: Option<BasicAuth>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

/// Performs a single HTTP POST exchange. Timeouts and cancellation are the
/// implementation's business.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, req: HttpRequest) -> Result<HttpResponse, GenericError>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, req: HttpRequest) -> Result<HttpResponse, GenericError> {
        let mut builder = self
            .client
            .post(&req.url)
            .header(reqwest::header::CONTENT_TYPE, req.content_type)
            .body(req.body);
        if let Some(auth) = req.basic_auth {
            builder = builder.basic_auth(auth.username, Some(auth.password));
        }

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?;

        Ok(HttpResponse { status, body })
    }
}
