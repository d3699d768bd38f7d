use thiserror::Error;

use super::value_objects::*;

pub type Result<T> = std::result::Result<T, DomainError>;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Topic '{0}' not found")]
    TopicNotFound(TopicName),

    #[error("Invalid topic name: {0}")]
    InvalidTopicName(String),

    #[error("Topic '{0}' already exists")]
    TopicAlreadyExists(TopicName),

    #[error("Partition {partition} does not exist in topic '{topic}'")]
    PartitionNotFound {
        topic: TopicName,
        partition: PartitionId,
    },

    #[error("Invalid partition count {0}: a topic needs at least one partition")]
    InvalidPartitionCount(u32),

    #[error("Invalid replication factor {0}: must be at least 1")]
    InvalidReplicationFactor(u32),

    #[error("Producer '{0}' is not registered with this broker")]
    ProducerNotFound(ProducerId),

    #[error("'{0}' is not bound to a broker")]
    Unbound(String),

    #[error("Unsupported partition strategy: {0}")]
    UnsupportedStrategy(String),

    #[error("Message {0} was already delivered")]
    AlreadyDelivered(MessageId),
}
