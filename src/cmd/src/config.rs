use clap::ValueEnum;
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing::Level;

use crate::error::Error;

#[derive(Debug, Deserialize, PartialEq, Eq)]
pub struct Auth {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
pub struct Log {
    #[serde(default)]
    pub level: LogLevel,
}

#[derive(Deserialize, Copy, Debug, Default, Clone, PartialEq, Eq)]
pub enum Protocol {
    #[serde(rename = "json")]
    #[default]
    Json,
    #[serde(rename = "encoded")]
    Encoded,
    #[serde(rename = "verbose")]
    Verbose,
}

impl From<Protocol> for mixpanel::Protocol {
    fn from(p: Protocol) -> Self {
        match p {
            Protocol::Json => mixpanel::Protocol::Json,
            Protocol::Encoded => mixpanel::Protocol::Encoded,
            Protocol::Verbose => mixpanel::Protocol::Verbose,
        }
    }
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub token: String,
    pub secret: Option<String>,
    pub api_url: Option<String>,
    pub project_id: Option<String>,
    pub auth: Option<Auth>,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default)]
    pub log: Log,
}

impl TryInto<mixpanel::Config> for Config {
    type Error = Error;

    fn try_into(self) -> Result<mixpanel::Config, Self::Error> {
        if self.token.is_empty() {
            return Err(Error::BadRequest("token must not be empty".to_string()));
        }

        let mut cfg = mixpanel::Config::new(self.token).with_protocol(self.protocol.into());
        if let Some(secret) = self.secret {
            cfg = cfg.with_secret(secret);
        }
        if let Some(api_url) = self.api_url {
            cfg = cfg.with_api_url(api_url);
        }
        if let Some(project_id) = self.project_id {
            cfg = cfg.with_project_id(project_id);
        }
        if let Some(auth) = self.auth {
            cfg = cfg.with_auth(auth.username, auth.password);
        }

        Ok(cfg)
    }
}

#[derive(Deserialize, Copy, Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum LogLevel {
    #[serde(rename = "trace")]
    Trace,
    #[serde(rename = "debug")]
    Debug,
    #[serde(rename = "info")]
    #[default]
    Info,
    #[serde(rename = "warn")]
    Warn,
    #[serde(rename = "error")]
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
        .into()
    }
}
