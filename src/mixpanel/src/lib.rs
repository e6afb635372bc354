//! Client for the Mixpanel ingestion API.
//!
//! Calls go through [`Mixpanel`], implemented by the network-backed [`Client`]
//! and by [`Mock`], which keeps the resulting state in memory for tests.
//!
//! ```no_run
//! use mixpanel::Client;
//! use mixpanel::Config;
//! use mixpanel::Event;
//! use mixpanel::Mixpanel;
//!
//! # async fn run() -> mixpanel::error::Result<()> {
//! let client = Client::new(Config::new("mytoken"));
//! client
//!     .track("1", "Sign Up", &Event::new().property("from", "email"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use uuid::Uuid;

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod mock;
pub mod request;
pub mod transport;
pub mod types;

pub use client::Client;
pub use config::Config;
pub use config::Protocol;
pub use error::MixpanelError;
pub use mock::Mock;
pub use types::Event;
pub use types::Ip;
pub use types::Properties;
pub use types::Timestamp;
pub use types::Update;

use crate::error::Result;

#[async_trait]
pub trait Mixpanel: Send + Sync {
    /// Records an event.
    async fn track(&self, distinct_id: &str, event_name: &str, event: &Event) -> Result<()>;

    /// Records a historical event through the import endpoint.
    async fn import(&self, distinct_id: &str, event_name: &str, event: &Event) -> Result<()>;

    async fn update_user(&self, distinct_id: &str, update: &Update) -> Result<()>;

    /// Like `update_user` with the operation forced to `$union`.
    async fn union_user(&self, distinct_id: &str, update: &Update) -> Result<()>;

    async fn update_group(&self, group_key: &str, group_id: &str, update: &Update) -> Result<()>;

    async fn union_group(&self, group_key: &str, group_id: &str, update: &Update) -> Result<()>;

    /// Creates an alias for an existing distinct id.
    async fn alias(&self, distinct_id: &str, new_id: &str) -> Result<()>;

    /// Links an anonymous id to `identified_id`. A missing anonymous id is
    /// generated; the one used is returned.
    async fn identify(&self, identified_id: &str, anon_id: Option<&str>) -> Result<Uuid>;
}
