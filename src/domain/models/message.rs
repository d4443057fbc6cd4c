use std::sync::LazyLock;

use chrono::{DateTime, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::errors::MessageError;

static E164_PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+[1-9]\d{1,14}$").expect("valid E.164 pattern"));

/// Checks that `number` is an E.164 phone number (`+` and 2-15 digits, no leading zero).
pub fn validate_recipient(number: &str) -> Result<(), MessageError> {
    if E164_PHONE.is_match(number) {
        Ok(())
    } else {
        Err(MessageError::InvalidPhone)
    }
}

/// Delivery metadata of a sent message: the provider-assigned id and the send time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    #[serde(rename = "message_id")]
    pub external_id: String,
    pub sent_at: DateTime<Utc>,
}

/// What a [`MessageSender`](crate::application::services::sender::MessageSender)
/// hands back after a successful delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    pub external_id: String,
    pub sent_at: DateTime<Utc>,
}

/// An outbound message and its delivery state.
///
/// A message is pending until [`Message::set_sent`] succeeds; the external id and
/// the send time are always set together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    id: String,
    recipient: String,
    content: String,
    delivery: Option<DeliveryRecord>,
}

impl Message {
    pub fn new(
        id: impl Into<String>,
        recipient: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<Self, MessageError> {
        let id = id.into();
        if id.is_empty() {
            return Err(MessageError::BlankId);
        }
        let recipient = recipient.into();
        validate_recipient(&recipient)?;

        Ok(Self {
            id,
            recipient,
            content: content.into(),
            delivery: None,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn external_id(&self) -> Option<&str> {
        self.delivery.as_ref().map(|d| d.external_id.as_str())
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        self.delivery.as_ref().map(|d| d.sent_at)
    }

    pub fn is_pending(&self) -> bool {
        self.delivery.is_none()
    }

    pub fn delivery(&self) -> Option<&DeliveryRecord> {
        self.delivery.as_ref()
    }

    /// Marks the message as delivered.
    ///
    /// A blank id is reported before a zero timestamp. Both the Unix epoch and
    /// `0001-01-01T00:00:00Z` count as zero. Calling this on an already delivered message
    /// replaces the previous delivery record.
    pub fn set_sent(
        &mut self,
        external_id: impl Into<String>,
        sent_at: DateTime<Utc>,
    ) -> Result<(), MessageError> {
        let external_id = external_id.into();
        if external_id.is_empty() {
            return Err(MessageError::BlankExternalId);
        }
        if is_zero_time(sent_at) {
            return Err(MessageError::InvalidSentTime);
        }
        self.delivery = Some(DeliveryRecord {
            external_id,
            sent_at,
        });
        Ok(())
    }

    /// Returns at most `limit` characters of the content.
    ///
    /// Counts Unicode scalar values, so the result is always valid UTF-8.
    pub fn truncated_content(&self, limit: isize) -> Result<&str, MessageError> {
        let limit = usize::try_from(limit).map_err(|_| MessageError::NegativeLimit)?;
        match self.content.char_indices().nth(limit) {
            Some((end, _)) => Ok(&self.content[..end]),
            None => Ok(&self.content),
        }
    }
}

fn is_zero_time(at: DateTime<Utc>) -> bool {
    at == DateTime::<Utc>::default() || Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0).single() == Some(at)
}
