use std::sync::Arc;

use poem_openapi::Tags;
use tokio_util::sync::CancellationToken;

use crate::application::{
    handlers::message_dispatcher::MessageDispatcher, services::scheduler::Daemon,
};

#[derive(Clone)]
pub struct ApiState {
    pub dispatcher: Arc<MessageDispatcher>,
    pub scheduler: Arc<dyn Daemon>,
    /// Process-wide token; scheduler runs started over HTTP end with it.
    pub shutdown: CancellationToken,
}

/// Enum of API sections (tags)
#[derive(Tags)]
pub enum EndpointsTags {
    Health,
    Scheduler,
    Messages,
}

pub(crate) fn internal_error(err: anyhow::Error) -> poem::Error {
    poem::Error::from_string(
        format!("{err:#}"),
        poem::http::StatusCode::INTERNAL_SERVER_ERROR,
    )
}
