//! Kafka publisher built on `rskafka`.
//!
//! The broker connection is opened lazily on the first publish so the
//! service can start while Kafka is down. Any failure drops the cached
//! connection and the next publish reconnects.

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rskafka::client::partition::{Compression, PartitionClient, UnknownTopicHandling};
use rskafka::client::{Client, ClientBuilder};
use rskafka::record::Record;
use rskafka::topic::Topic;
use tokio::sync::Mutex;

use super::{Delivery, LeastBytes, MessagePublisher, OutboundRecord, PublishError};
use crate::config::Config;

struct Connection {
    client: Client,
    partitions: Vec<i32>,
    partition_clients: HashMap<i32, Arc<PartitionClient>>,
}

/// Publishes every record to one fixed topic, spreading records over
/// partitions with [`LeastBytes`].
pub struct KafkaPublisher {
    brokers: Vec<String>,
    topic: String,
    timeout: Duration,
    max_record_bytes: usize,
    balancer: LeastBytes,
    connection: Mutex<Option<Connection>>,
}

impl KafkaPublisher {
    pub fn new(config: &Config) -> Self {
        Self {
            brokers: config.kafka_brokers.clone(),
            topic: config.kafka_topic.clone(),
            timeout: config.publish_timeout,
            max_record_bytes: config.max_message_bytes,
            balancer: LeastBytes::new(),
            connection: Mutex::new(None),
        }
    }

    async fn connect(&self) -> Result<Connection, PublishError> {
        tracing::debug!(brokers = ?self.brokers, topic = %self.topic, "Connecting to Kafka");

        let client = ClientBuilder::new(self.brokers.clone())
            .build()
            .await
            .map_err(unavailable)?;

        let topics = client.list_topics().await.map_err(unavailable)?;
        let partitions = partitions_of(&topics, &self.topic);

        if partitions.is_empty() {
            return Err(PublishError::Unavailable(format!(
                "topic '{}' does not exist",
                self.topic
            )));
        }

        tracing::info!(
            topic = %self.topic,
            partitions = partitions.len(),
            "Kafka connection established"
        );

        Ok(Connection {
            client,
            partitions,
            partition_clients: HashMap::new(),
        })
    }

    /// Pick a partition for a record of `size` bytes and return its client.
    async fn partition_for(&self, size: usize) -> Result<(i32, Arc<PartitionClient>), PublishError> {
        let mut guard = self.connection.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect().await?);
        }
        let Some(conn) = guard.as_mut() else {
            return Err(PublishError::Unavailable("connection not established".into()));
        };

        let partition = self.balancer.balance(size, &conn.partitions).ok_or_else(|| {
            PublishError::Unavailable(format!("topic '{}' has no partitions", self.topic))
        })?;

        if let Some(client) = conn.partition_clients.get(&partition) {
            return Ok((partition, Arc::clone(client)));
        }

        let client = Arc::new(
            conn.client
                .partition_client(self.topic.clone(), partition, UnknownTopicHandling::Error)
                .await
                .map_err(unavailable)?,
        );
        conn.partition_clients.insert(partition, Arc::clone(&client));

        Ok((partition, client))
    }

    async fn send(&self, record: OutboundRecord) -> Result<Delivery, PublishError> {
        let (partition, client) = self.partition_for(record.payload.len()).await?;

        let record = Record {
            key: record.key,
            value: Some(record.payload),
            headers: record.headers,
            timestamp: Utc::now(),
        };

        let offsets = client
            .produce(vec![record], Compression::NoCompression)
            .await
            .map_err(unavailable)?;

        Ok(Delivery {
            partition,
            offset: offsets.first().copied().unwrap_or(-1),
        })
    }

    /// Forget the cached connection so the next call reconnects.
    async fn reset(&self) {
        self.connection.lock().await.take();
    }

    async fn check(&self) -> Result<(), PublishError> {
        let mut guard = self.connection.lock().await;
        if let Some(conn) = guard.as_ref() {
            conn.client.list_topics().await.map_err(unavailable)?;
            return Ok(());
        }
        *guard = Some(self.connect().await?);
        Ok(())
    }
}

#[async_trait]
impl MessagePublisher for KafkaPublisher {
    async fn publish(&self, record: OutboundRecord) -> Result<Delivery, PublishError> {
        if record.payload.len() > self.max_record_bytes {
            return Err(PublishError::Rejected(format!(
                "record of {} bytes exceeds the {} byte limit",
                record.payload.len(),
                self.max_record_bytes
            )));
        }

        let result = match tokio::time::timeout(self.timeout, self.send(record)).await {
            Ok(result) => result,
            Err(_) => Err(PublishError::Timeout(self.timeout)),
        };

        match result {
            Ok(delivery) => {
                tracing::debug!(
                    topic = %self.topic,
                    partition = delivery.partition,
                    offset = delivery.offset,
                    "Record published"
                );
                Ok(delivery)
            }
            Err(e) => {
                tracing::warn!(topic = %self.topic, error = %e, "Publish failed, dropping connection");
                self.reset().await;
                Err(e)
            }
        }
    }

    async fn ping(&self) -> Result<(), PublishError> {
        let result = match tokio::time::timeout(self.timeout, self.check()).await {
            Ok(result) => result,
            Err(_) => Err(PublishError::Timeout(self.timeout)),
        };

        if result.is_err() {
            self.reset().await;
        }
        result
    }
}

/// Partition ids of `name`, ascending; empty when the topic is unknown.
fn partitions_of(topics: &[Topic], name: &str) -> Vec<i32> {
    topics
        .iter()
        .find(|topic| topic.name == name)
        .map(|topic| topic.partitions.iter().copied().collect())
        .unwrap_or_default()
}

fn unavailable(err: impl Display) -> PublishError {
    PublishError::Unavailable(err.to_string())
}
