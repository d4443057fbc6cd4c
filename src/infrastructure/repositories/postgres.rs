use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Pool, Postgres, postgres::PgPoolOptions};

use crate::domain::{
    models::{DeliveryRecord, Message, validate_recipient},
    repositories::{MessageRepository, MessageWriter},
};

pub type PgPool = Pool<Postgres>;

pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .context("connecting to postgres")
}

pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("running migrations")
}

/// Messages stored in the `message` table.
///
/// `get_next_unsent` is a plain read. Callers that overlap in time can receive the same
/// row; the service tolerates this because delivery is at-least-once.
#[derive(Clone)]
pub struct PostgresMessageRepository {
    pool: PgPool,
}

impl PostgresMessageRepository {
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self { pool })
    }
}

#[async_trait]
impl MessageWriter for PostgresMessageRepository {
    async fn insert(&self, recipient: &str, content: &str) -> anyhow::Result<Message> {
        validate_recipient(recipient)?;
        let record = sqlx::query_as::<_, MessageRecord>(
            r#"
            INSERT INTO message (recipient, content)
            VALUES ($1, $2)
            RETURNING id, recipient, content, message_id, sent_at
            "#,
        )
        .bind(recipient)
        .bind(content)
        .fetch_one(&self.pool)
        .await
        .context("inserting message")?;
        Message::try_from(record)
    }
}

#[async_trait]
impl MessageRepository for PostgresMessageRepository {
    async fn get_next_unsent(&self) -> anyhow::Result<Option<Message>> {
        let record = sqlx::query_as::<_, MessageRecord>(
            r#"
            SELECT id, recipient, content, message_id, sent_at
            FROM message
            WHERE message_id IS NULL AND sent_at IS NULL
            ORDER BY created_at, id
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;
        record.map(Message::try_from).transpose()
    }

    async fn get_all_unsent(&self) -> anyhow::Result<Vec<Message>> {
        let records = sqlx::query_as::<_, MessageRecord>(
            r#"
            SELECT id, recipient, content, message_id, sent_at
            FROM message
            WHERE message_id IS NULL AND sent_at IS NULL
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        records.into_iter().map(Message::try_from).collect()
    }

    async fn get_all_sent(&self) -> anyhow::Result<Vec<DeliveryRecord>> {
        let records = sqlx::query_as::<_, SentRecord>(
            r#"
            SELECT message_id, sent_at
            FROM message
            WHERE message_id IS NOT NULL AND sent_at IS NOT NULL
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(records.into_iter().map(DeliveryRecord::from).collect())
    }

    async fn save(&self, message: &Message) -> anyhow::Result<()> {
        let Some(delivery) = message.delivery() else {
            return Ok(());
        };
        let id = parse_id(message.id())?;

        let result = sqlx::query(
            r#"
            UPDATE message
            SET message_id = $1, sent_at = $2
            WHERE id = $3
            "#,
        )
        .bind(&delivery.external_id)
        .bind(delivery.sent_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .context("setting message sent")?;

        if result.rows_affected() == 0 {
            anyhow::bail!("message {id} not found");
        }
        Ok(())
    }
}

fn parse_id(id: &str) -> anyhow::Result<i32> {
    id.parse()
        .with_context(|| format!("converting message ID {id:?} to int"))
}

#[derive(FromRow)]
struct MessageRecord {
    id: i32,
    recipient: String,
    content: String,
    message_id: Option<String>,
    sent_at: Option<DateTime<Utc>>,
}

impl TryFrom<MessageRecord> for Message {
    type Error = anyhow::Error;

    fn try_from(value: MessageRecord) -> Result<Self, Self::Error> {
        let mut message = Message::new(value.id.to_string(), value.recipient, value.content)
            .with_context(|| format!("creating message {} from row", value.id))?;
        match (value.message_id, value.sent_at) {
            (Some(external_id), Some(sent_at)) => message.set_sent(external_id, sent_at)?,
            (None, None) => {}
            _ => anyhow::bail!("message {} has a partial delivery record", value.id),
        }
        Ok(message)
    }
}

#[derive(FromRow)]
struct SentRecord {
    message_id: String,
    sent_at: DateTime<Utc>,
}

impl From<SentRecord> for DeliveryRecord {
    fn from(value: SentRecord) -> Self {
        Self {
            external_id: value.message_id,
            sent_at: value.sent_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixed_time;

    fn record(message_id: Option<&str>, sent_at: Option<DateTime<Utc>>) -> MessageRecord {
        MessageRecord {
            id: 12,
            recipient: "+994551234567".to_string(),
            content: "hello".to_string(),
            message_id: message_id.map(str::to_string),
            sent_at,
        }
    }

    #[test]
    fn pending_row_maps_to_pending_message() {
        let message = Message::try_from(record(None, None)).unwrap();

        assert_eq!(message.id(), "12");
        assert_eq!(message.content(), "hello");
        assert!(message.is_pending());
    }

    #[test]
    fn delivered_row_keeps_delivery() {
        let message = Message::try_from(record(Some("ext-12"), Some(fixed_time()))).unwrap();

        assert_eq!(message.external_id(), Some("ext-12"));
        assert_eq!(message.sent_at(), Some(fixed_time()));
    }

    #[test]
    fn partial_delivery_row_is_rejected() {
        let err = Message::try_from(record(Some("ext-12"), None)).unwrap_err();

        assert_eq!(err.to_string(), "message 12 has a partial delivery record");
    }

    #[test]
    fn row_with_invalid_recipient_is_rejected() {
        let mut row = record(None, None);
        row.recipient = "0551234567".to_string();

        let err = Message::try_from(row).unwrap_err();

        assert_eq!(
            format!("{err:#}"),
            "creating message 12 from row: invalid phone number"
        );
    }

    #[test]
    fn parse_id_rejects_non_numeric_ids() {
        assert_eq!(parse_id("42").unwrap(), 42);
        assert!(parse_id("abc").is_err());
    }
}
