use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde::Deserialize;
use tracing::debug;
use tracing::warn;
use url::form_urlencoded;
use url::Url;

use crate::config::Config;
use crate::config::Protocol;
use crate::error::MixpanelError;
use crate::error::Result;
use crate::request::Request;
use crate::transport::BasicAuth;
use crate::transport::HttpRequest;
use crate::transport::HttpResponse;
use crate::transport::Transport;

const CONTENT_TYPE_JSON: &str = "application/json";
const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Deserialize)]
struct VerboseResponse {
    #[serde(default)]
    status: i64,
    #[serde(default)]
    error: Option<String>,
}

/// Sends built requests, one attempt each, and maps the answer to an outcome.
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    api_url: String,
    project_id: Option<String>,
    basic_auth: Option<BasicAuth>,
    protocol: Protocol,
}

impl Dispatcher {
    pub fn new(cfg: &Config, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            api_url: cfg.api_url.trim_end_matches('/').to_string(),
            project_id: cfg.project_id.clone(),
            basic_auth: cfg.basic_auth(),
            protocol: cfg.protocol,
        }
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn set_project_id(&mut self, project_id: Option<String>) {
        self.project_id = project_id;
    }

    pub fn set_basic_auth(&mut self, basic_auth: Option<BasicAuth>) {
        self.basic_auth = basic_auth;
    }

    pub fn url(&self, req: &Request) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/{}", self.api_url, req.endpoint.path()))?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(project_id) = &self.project_id {
                query.append_pair("project_id", project_id);
            }
            if req.auto_geolocate {
                query.append_pair("ip", "1");
            }
            if self.protocol == Protocol::Verbose {
                query.append_pair("verbose", "1");
            }
        }
        // drop the dangling '?' when nothing was appended
        if url.query() == Some("") {
            url.set_query(None);
        }

        Ok(url)
    }

    pub fn encode(&self, req: &Request) -> Result<(&'static str, Bytes)> {
        let data = serde_json::to_vec(&req.params)?;
        match self.protocol {
            Protocol::Json => Ok((CONTENT_TYPE_JSON, Bytes::from(data))),
            Protocol::Encoded | Protocol::Verbose => {
                let body = form_urlencoded::Serializer::new(String::new())
                    .append_pair("data", &STANDARD.encode(data))
                    .finish();
                Ok((CONTENT_TYPE_FORM, Bytes::from(body)))
            }
        }
    }

    pub async fn dispatch(&self, req: &Request) -> Result<()> {
        let url = self.url(req)?.to_string();
        let (content_type, body) = self.encode(req)?;

        debug!(
            url = url.as_str(),
            protocol = ?self.protocol,
            auto_geolocate = req.auto_geolocate,
            "sending request"
        );

        let resp = self
            .transport
            .send(HttpRequest {
                url: url.clone(),
                content_type,
                body,
                basic_auth: self.basic_auth.clone(),
            })
            .await
            .map_err(|source| {
                warn!(url = url.as_str(), error = %source, "request failed");
                MixpanelError::Transport {
                    url: url.clone(),
                    source,
                }
            })?;

        self.check(&url, resp)
    }

    fn check(&self, url: &str, resp: HttpResponse) -> Result<()> {
        let body = String::from_utf8_lossy(&resp.body);
        let rejected = |status: Option<i64>, message: String| {
            warn!(url, http_code = resp.status, ?status, message = message.as_str(), "request rejected");
            MixpanelError::DeliveryRejected {
                url: url.to_string(),
                http_code: resp.status,
                status,
                message,
            }
        };

        match self.protocol {
            Protocol::Json | Protocol::Encoded => {
                let trimmed = body.strip_suffix('\n').unwrap_or(&body);
                if trimmed == "1" {
                    Ok(())
                } else {
                    Err(rejected(None, trimmed.to_string()))
                }
            }
            Protocol::Verbose => match serde_json::from_str::<VerboseResponse>(&body) {
                Ok(VerboseResponse { status: 1, .. }) => Ok(()),
                Ok(VerboseResponse { status, error }) => {
                    Err(rejected(Some(status), error.unwrap_or_default()))
                }
                Err(_) => Err(rejected(None, body.to_string())),
            },
        }
    }
}
