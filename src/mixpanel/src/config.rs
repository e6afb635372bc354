use crate::transport::BasicAuth;

pub const DEFAULT_API_URL: &str = "https://api.mixpanel.com";

/// Wire protocol spoken to the ingestion endpoints. Chosen up front, the
/// response is never used to guess it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Protocol {
    /// JSON request body, the service answers with a bare `1`.
    #[default]
    Json,
    /// Base64 JSON in a `data` form field, the service answers with a bare `1`.
    Encoded,
    /// As `Encoded` with `verbose=1`, the service answers with a status envelope.
    Verbose,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub token: String,
    pub secret: Option<String>,
    pub api_url: String,
    pub project_id: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub protocol: Protocol,
}

impl Config {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            secret: None,
            api_url: DEFAULT_API_URL.to_string(),
            project_id: None,
            username: None,
            password: None,
            protocol: Protocol::default(),
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// A blank url keeps the default endpoint.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        let api_url = api_url.into();
        if !api_url.is_empty() {
            self.api_url = api_url;
        }
        self
    }

    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Explicit credentials win over the project secret, which is sent as the
    /// username with an empty password.
    pub fn basic_auth(&self) -> Option<BasicAuth> {
        match (&self.username, &self.password, &self.secret) {
            (Some(username), Some(password), _) if !username.is_empty() && !password.is_empty() => {
                Some(BasicAuth {
                    username: username.to_owned(),
                    password: password.to_owned(),
                })
            }
            (_, _, Some(secret)) if !secret.is_empty() => Some(BasicAuth {
                username: secret.to_owned(),
                password: String::new(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::new("tok").with_api_url("");
        assert_eq!(cfg.api_url, DEFAULT_API_URL);
        assert_eq!(cfg.protocol, Protocol::Json);
        assert!(cfg.basic_auth().is_none());
    }

    #[test]
    fn test_basic_auth_precedence() {
        let cfg = Config::new("tok").with_secret("s3cret");
        assert_eq!(
            cfg.basic_auth(),
            Some(BasicAuth {
                username: "s3cret".to_string(),
                password: "".to_string(),
            })
        );

        let cfg = cfg.with_auth("user", "pass");
        assert_eq!(
            cfg.basic_auth(),
            Some(BasicAuth {
                username: "user".to_string(),
                password: "pass".to_string(),
            })
        );

        // incomplete credentials fall back to the secret
        let cfg = Config::new("tok").with_secret("s3cret").with_auth("user", "");
        assert_eq!(cfg.basic_auth().unwrap().username, "s3cret");
    }
}
