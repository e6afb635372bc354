use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::request::RequestBuilder;
use crate::transport::ReqwestTransport;
use crate::transport::Transport;
use crate::types::Event;
use crate::types::Update;
use crate::Mixpanel;

/// Network-backed client.
pub struct Client {
    cfg: Config,
    builder: RequestBuilder,
    dispatcher: Dispatcher,
}

impl Client {
    pub fn new(cfg: Config) -> Self {
        Self::from_transport(cfg, Arc::new(ReqwestTransport::default()))
    }

    /// Use a preconfigured http client, e.g. one with a proxy or timeouts.
    pub fn from_reqwest(cfg: Config, client: reqwest::Client) -> Self {
        Self::from_transport(cfg, Arc::new(ReqwestTransport::new(client)))
    }

    pub fn from_transport(cfg: Config, transport: Arc<dyn Transport>) -> Self {
        Self {
            builder: RequestBuilder::new(cfg.token.as_str()),
            dispatcher: Dispatcher::new(&cfg, transport),
            cfg,
        }
    }

    pub fn set_project_id(&mut self, project_id: impl Into<String>) {
        self.cfg.project_id = Some(project_id.into());
        self.dispatcher.set_project_id(self.cfg.project_id.clone());
    }

    /// Incomplete credentials fall back to the project secret.
    pub fn set_auth(&mut self, username: impl Into<String>, password: impl Into<String>) {
        self.cfg.username = Some(username.into());
        self.cfg.password = Some(password.into());
        self.dispatcher.set_basic_auth(self.cfg.basic_auth());
    }
}

#[async_trait]
impl Mixpanel for Client {
    async fn track(&self, distinct_id: &str, event_name: &str, event: &Event) -> Result<()> {
        let req = self.builder.track(distinct_id, event_name, event)?;
        self.dispatcher.dispatch(&req).await
    }

    async fn import(&self, distinct_id: &str, event_name: &str, event: &Event) -> Result<()> {
        let req = self.builder.import(distinct_id, event_name, event)?;
        self.dispatcher.dispatch(&req).await
    }

    async fn update_user(&self, distinct_id: &str, update: &Update) -> Result<()> {
        let req = self.builder.update_user(distinct_id, update)?;
        self.dispatcher.dispatch(&req).await
    }

    async fn union_user(&self, distinct_id: &str, update: &Update) -> Result<()> {
        let req = self.builder.union_user(distinct_id, update)?;
        self.dispatcher.dispatch(&req).await
    }

    async fn update_group(&self, group_key: &str, group_id: &str, update: &Update) -> Result<()> {
        let req = self.builder.update_group(group_key, group_id, update)?;
        self.dispatcher.dispatch(&req).await
    }

    async fn union_group(&self, group_key: &str, group_id: &str, update: &Update) -> Result<()> {
        let req = self.builder.union_group(group_key, group_id, update)?;
        self.dispatcher.dispatch(&req).await
    }

    async fn alias(&self, distinct_id: &str, new_id: &str) -> Result<()> {
        let req = self.builder.alias(distinct_id, new_id)?;
        self.dispatcher.dispatch(&req).await
    }

    async fn identify(&self, identified_id: &str, anon_id: Option<&str>) -> Result<Uuid> {
        let (req, anon_id) = self.builder.identify(identified_id, anon_id)?;
        self.dispatcher.dispatch(&req).await?;
        Ok(anon_id)
    }
}
