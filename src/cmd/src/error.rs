use std::result;

use mixpanel::MixpanelError;
use thiserror::Error;
use tracing::subscriber::SetGlobalDefaultError;

pub type Result<T> = result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("BadRequest: {0}")]
    BadRequest(String),
    #[error("mixpanel: {0}")]
    Mixpanel(#[from] MixpanelError),
    #[error("config: {0:?}")]
    Config(#[from] config::ConfigError),
    #[error("SetGlobalDefaultError: {0:?}")]
    SetGlobalDefaultError(SetGlobalDefaultError),
}
