use log::{debug, info};
use std::sync::Arc;

use super::dto::*;
use crate::domain::{errors::*, services::Broker, value_objects::*};

/// Use case for sending messages to topics
pub struct SendMessageUseCase {
    broker: Arc<Broker>,
}

impl SendMessageUseCase {
    pub fn new(broker: Arc<Broker>) -> Self {
        Self { broker }
    }

    /// Send a single message to a topic
    pub fn execute(
        &self,
        topic_name: String,
        key: Option<String>,
        value: Vec<u8>,
    ) -> Result<DeliveryReport> {
        let topic_name = TopicName::new(topic_name)?;
        debug!("Sending {} bytes to topic: {}", value.len(), topic_name);

        let message = self.broker.publish(&topic_name, value, key, None)?;
        Ok(DeliveryReport::from(&message))
    }

    /// Send multiple messages to a topic, stopping at the first failure
    pub fn execute_batch(
        &self,
        topic_name: String,
        messages: Vec<(Option<String>, Vec<u8>)>,
    ) -> Result<Vec<DeliveryReport>> {
        let topic_name = TopicName::new(topic_name)?;
        info!("Sending {} messages to topic: {}", messages.len(), topic_name);

        messages
            .into_iter()
            .map(|(key, value)| {
                self.broker
                    .publish(&topic_name, value, key, None)
                    .map(|message| DeliveryReport::from(&message))
            })
            .collect()
    }
}

/// Use case for reading a partition without consuming it
pub struct FetchMessagesUseCase {
    broker: Arc<Broker>,
}

impl FetchMessagesUseCase {
    pub fn new(broker: Arc<Broker>) -> Self {
        Self { broker }
    }

    /// Fetch up to `max_messages` from one partition starting at `offset`
    pub fn execute(
        &self,
        topic_name: String,
        partition: u32,
        offset: u64,
        max_messages: Option<usize>,
    ) -> Result<Vec<FetchedMessage>> {
        let topic_name = TopicName::new(topic_name)?;
        let topic = self
            .broker
            .get_topic(&topic_name)
            .ok_or_else(|| DomainError::TopicNotFound(topic_name.clone()))?;
        let partition_id = PartitionId(partition);
        let partition = topic
            .get_partition(partition_id)
            .ok_or_else(|| DomainError::PartitionNotFound {
                topic: topic_name.clone(),
                partition: partition_id,
            })?;

        let messages: Vec<FetchedMessage> = partition
            .get_messages(Offset(offset), max_messages)
            .iter()
            .map(FetchedMessage::from)
            .collect();

        debug!(
            "Fetched {} messages from {}:{} starting at offset {}",
            messages.len(),
            topic_name,
            partition_id,
            offset
        );
        Ok(messages)
    }
}

/// Use case for managing topics and reporting broker state
pub struct TopicManagementUseCase {
    broker: Arc<Broker>,
}

impl TopicManagementUseCase {
    pub fn new(broker: Arc<Broker>) -> Self {
        Self { broker }
    }

    /// Create a new topic
    pub fn create_topic(
        &self,
        topic_name: String,
        partitions: u32,
        replication_factor: u32,
    ) -> Result<TopicStatus> {
        let topic_name = TopicName::new(topic_name)?;
        let topic = self
            .broker
            .create_topic(topic_name, partitions, replication_factor)?;
        Ok(TopicStatus::from(topic.as_ref()))
    }

    pub fn delete_topic(&self, topic_name: String) -> Result<bool> {
        let topic_name = TopicName::new(topic_name)?;
        Ok(self.broker.delete_topic(&topic_name))
    }

    /// Get topic metadata
    pub fn describe_topic(&self, topic_name: String) -> Result<Option<TopicStatus>> {
        let topic_name = TopicName::new(topic_name)?;
        Ok(self
            .broker
            .get_topic(&topic_name)
            .map(|topic| TopicStatus::from(topic.as_ref())))
    }

    /// List all topic names
    pub fn list_topics(&self) -> Vec<String> {
        self.broker
            .get_all_topics()
            .iter()
            .map(|t| t.name.to_string())
            .collect()
    }

    pub fn broker_status(&self) -> BrokerStatus {
        BrokerStatus::from(self.broker.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn broker() -> Arc<Broker> {
        Arc::new(Broker::with_strategy(PartitionStrategyKind::RoundRobin))
    }

    #[test]
    fn test_batch_send_reports_positions() {
        let broker = broker();
        let topics = TopicManagementUseCase::new(broker.clone());
        topics.create_topic("events".to_string(), 2, 1).unwrap();

        let send = SendMessageUseCase::new(broker);
        let reports = send
            .execute_batch(
                "events".to_string(),
                (0..4).map(|i| (None, vec![i])).collect(),
            )
            .unwrap();

        let positions: Vec<(u32, u64)> = reports.iter().map(|r| (r.partition, r.offset)).collect();
        assert_eq!(positions, vec![(0, 0), (1, 0), (0, 1), (1, 1)]);
    }

    #[test]
    fn test_fetch_reads_without_consuming() {
        let broker = broker();
        let topics = TopicManagementUseCase::new(broker.clone());
        topics.create_topic("log".to_string(), 1, 1).unwrap();
        let send = SendMessageUseCase::new(broker.clone());
        for i in 0..3u8 {
            send.execute("log".to_string(), Some(format!("k{}", i)), vec![i])
                .unwrap();
        }

        let fetch = FetchMessagesUseCase::new(broker);
        let fetched = fetch.execute("log".to_string(), 0, 1, Some(10)).unwrap();
        assert_eq!(fetched.len(), 2);
        assert_eq!(fetched[0].offset, 1);
        assert_eq!(fetched[0].key.as_deref(), Some("k1"));
        assert!(fetched.iter().all(|m| m.status == "DELIVERED"));

        assert!(matches!(
            fetch.execute("log".to_string(), 5, 0, None),
            Err(DomainError::PartitionNotFound { .. })
        ));
        assert!(matches!(
            fetch.execute("nope".to_string(), 0, 0, None),
            Err(DomainError::TopicNotFound(_))
        ));
    }

    #[test]
    fn test_topic_management() {
        let topics = TopicManagementUseCase::new(broker());
        topics.create_topic("b".to_string(), 3, 2).unwrap();
        topics.create_topic("a".to_string(), 1, 1).unwrap();

        assert_eq!(topics.list_topics(), vec!["a", "b"]);
        let described = topics.describe_topic("b".to_string()).unwrap().unwrap();
        assert_eq!(described.partition_count, 3);
        assert_eq!(described.replication_factor, 2);
        assert_eq!(described.partitions.len(), 3);

        assert!(topics.delete_topic("a".to_string()).unwrap());
        assert!(topics.describe_topic("a".to_string()).unwrap().is_none());
        assert!(topics.create_topic("bad name".to_string(), 1, 1).is_err());

        let status = topics.broker_status();
        assert_eq!(status.partition_strategy, "round_robin");
        assert_eq!(status.topics.len(), 1);
    }
}
