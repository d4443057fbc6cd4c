use thiserror::Error;

/// Validation failures raised by [`Message`](super::models::Message) construction
/// and state transitions.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MessageError {
    #[error("ID can't be blank")]
    BlankId,
    #[error("invalid phone number")]
    InvalidPhone,
    #[error("blank message ID")]
    BlankExternalId,
    #[error("invalid sent datetime")]
    InvalidSentTime,
    #[error("negative character limit")]
    NegativeLimit,
}
