use std::sync::Arc;

use poem::Result as PoemResult;
use poem_openapi::{OpenApi, payload::Json};

use crate::presentation::http::{
    endpoints::root::{ApiState, EndpointsTags, internal_error},
    mappers::map_delivery,
    responses::SentMessagesDto,
};

#[derive(Clone)]
pub struct MessagesEndpoints {
    state: Arc<ApiState>,
}

impl MessagesEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl MessagesEndpoints {
    /// Delivered messages, oldest first.
    #[oai(path = "/messages", method = "get", tag = EndpointsTags::Messages)]
    pub async fn list_sent(&self) -> PoemResult<Json<SentMessagesDto>> {
        let records = self
            .state
            .dispatcher
            .list_delivered()
            .await
            .map_err(internal_error)?;

        Ok(Json(SentMessagesDto {
            items: records.iter().map(map_delivery).collect(),
        }))
    }
}
