use anyhow::Context;
use async_trait::async_trait;
use redis::Client;
use redis::aio::MultiplexedConnection;
use tracing::debug;

use super::DeliveryCache;
use crate::domain::models::DeliveryRecord;

/// Delivery records kept as JSON strings in a Redis list, oldest at the head.
#[derive(Clone)]
pub struct RedisDeliveryCache {
    conn: MultiplexedConnection,
    key: String,
}

impl RedisDeliveryCache {
    pub async fn connect(url: &str, key: impl Into<String>) -> anyhow::Result<Self> {
        let client = Client::open(url).context("opening redis client")?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .context("connecting to redis")?;
        Ok(Self::new(conn, key))
    }

    pub fn new(conn: MultiplexedConnection, key: impl Into<String>) -> Self {
        Self {
            conn,
            key: key.into(),
        }
    }
}

#[async_trait]
impl DeliveryCache for RedisDeliveryCache {
    async fn entries(&self) -> anyhow::Result<Vec<DeliveryRecord>> {
        let raw: Vec<String> = redis::cmd("LRANGE")
            .arg(&self.key)
            .arg(0)
            .arg(-1)
            .query_async(&mut self.conn.clone())
            .await?;

        raw.iter()
            .map(|entry| serde_json::from_str(entry).context("decoding cached delivery record"))
            .collect()
    }

    async fn append(&self, records: &[DeliveryRecord]) -> anyhow::Result<()> {
        // RPUSH without values is a syntax error.
        if records.is_empty() {
            return Ok(());
        }
        let encoded = records
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?;

        let len: i64 = redis::cmd("RPUSH")
            .arg(&self.key)
            .arg(encoded)
            .query_async(&mut self.conn.clone())
            .await?;
        debug!(key = %self.key, appended = records.len(), len, "cached delivery records");
        Ok(())
    }
}
