use chrono::{DateTime, Utc};
use poem_openapi::{ApiResponse, Object, payload::Json};

use crate::presentation::models::SchedulerStateKind;

#[derive(Object)]
pub struct ActionResponseDto {
    pub message: String,
}

impl ActionResponseDto {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[derive(ApiResponse)]
pub enum SchedulerActionResponse {
    /// The request was accepted; the scheduler changes state in the background.
    #[oai(status = 202)]
    Accepted(Json<ActionResponseDto>),
    /// The scheduler is still stopping from an earlier request.
    #[oai(status = 409)]
    Conflict(Json<ActionResponseDto>),
}

#[derive(Object)]
pub struct SchedulerStatusDto {
    pub state: SchedulerStateKind,
}

#[derive(Object, Debug, PartialEq)]
pub struct SentMessageDto {
    /// Identifier assigned by the delivery provider.
    pub id: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Object)]
pub struct SentMessagesDto {
    pub items: Vec<SentMessageDto>,
}
