use std::sync::Arc;

use poem::Result as PoemResult;
use poem_openapi::{OpenApi, payload::Json};
use tracing::info;

use crate::{
    application::services::scheduler::SchedulerError,
    presentation::http::{
        endpoints::root::{ApiState, EndpointsTags},
        responses::{ActionResponseDto, SchedulerActionResponse, SchedulerStatusDto},
    },
};

#[derive(Clone)]
pub struct SchedulerEndpoints {
    state: Arc<ApiState>,
}

impl SchedulerEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl SchedulerEndpoints {
    /// Start periodic sending. Starting a running sender has no effect.
    #[oai(path = "/start", method = "post", tag = EndpointsTags::Scheduler)]
    pub async fn start(&self) -> PoemResult<SchedulerActionResponse> {
        match self.state.scheduler.start(&self.state.shutdown).await {
            Ok(()) => {
                info!("sender started over http");
                Ok(SchedulerActionResponse::Accepted(ActionResponseDto::new(
                    "Starting sender",
                )))
            }
            Err(SchedulerError::StopInProgress) => Ok(SchedulerActionResponse::Conflict(
                ActionResponseDto::new("Sender is stopping, try again"),
            )),
            Err(err) => Err(scheduler_error(err)),
        }
    }

    /// Stop periodic sending and wait for the loop to exit.
    #[oai(path = "/stop", method = "post", tag = EndpointsTags::Scheduler)]
    pub async fn stop(&self) -> PoemResult<SchedulerActionResponse> {
        self.state.scheduler.stop().await.map_err(scheduler_error)?;
        info!("sender stopped over http");
        Ok(SchedulerActionResponse::Accepted(ActionResponseDto::new(
            "Stopping sender",
        )))
    }

    #[oai(path = "/status", method = "get", tag = EndpointsTags::Scheduler)]
    pub async fn status(&self) -> Json<SchedulerStatusDto> {
        Json(SchedulerStatusDto {
            state: self.state.scheduler.state().await.into(),
        })
    }
}

fn scheduler_error(err: SchedulerError) -> poem::Error {
    poem::Error::from_string(
        err.to_string(),
        poem::http::StatusCode::INTERNAL_SERVER_ERROR,
    )
}
