use serde::{Deserialize, Serialize};

use crate::domain::{
    entities::{Message, Partition, Topic},
    services::Broker,
};

/// Where a sent message ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub message_id: String,
    pub topic: String,
    pub partition: u32,
    pub offset: u64,
}

impl From<&Message> for DeliveryReport {
    fn from(message: &Message) -> Self {
        Self {
            message_id: message.id.to_string(),
            topic: message.topic.to_string(),
            partition: message.partition().map(|p| p.value()).unwrap_or_default(),
            offset: message.offset().map(|o| o.value()).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedMessage {
    pub message_id: String,
    pub offset: u64,
    pub key: Option<String>,
    pub value: Vec<u8>,
    pub timestamp: i64,
    pub status: String,
}

impl From<&Message> for FetchedMessage {
    fn from(message: &Message) -> Self {
        Self {
            message_id: message.id.to_string(),
            offset: message.offset().map(|o| o.value()).unwrap_or_default(),
            key: message.key.clone(),
            value: message.value.clone(),
            timestamp: message.timestamp.timestamp_millis(),
            status: message.status().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionStatus {
    pub partition_id: u32,
    pub message_count: usize,
    pub next_offset: u64,
}

impl From<&Partition> for PartitionStatus {
    fn from(partition: &Partition) -> Self {
        Self {
            partition_id: partition.id.value(),
            message_count: partition.message_count(),
            next_offset: partition.next_offset().value(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicStatus {
    pub name: String,
    pub partition_count: u32,
    pub replication_factor: u32,
    pub total_messages: usize,
    pub partitions: Vec<PartitionStatus>,
}

impl From<&Topic> for TopicStatus {
    fn from(topic: &Topic) -> Self {
        let partitions: Vec<PartitionStatus> = topic
            .get_all_partitions()
            .iter()
            .map(|p| PartitionStatus::from(p.as_ref()))
            .collect();
        Self {
            name: topic.name.to_string(),
            partition_count: topic.partition_count(),
            replication_factor: topic.replication_factor,
            total_messages: partitions.iter().map(|p| p.message_count).sum(),
            partitions,
        }
    }
}

/// Snapshot of a broker for status output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerStatus {
    pub broker_id: String,
    pub partition_strategy: String,
    pub producers: usize,
    pub consumers: usize,
    pub failed_messages: usize,
    pub topics: Vec<TopicStatus>,
}

impl From<&Broker> for BrokerStatus {
    fn from(broker: &Broker) -> Self {
        Self {
            broker_id: broker.id().to_string(),
            partition_strategy: broker.strategy_name().to_string(),
            producers: broker.producer_count(),
            consumers: broker.consumer_count(),
            failed_messages: broker.failed_messages().len(),
            topics: broker
                .get_all_topics()
                .iter()
                .map(|t| TopicStatus::from(t.as_ref()))
                .collect(),
        }
    }
}
