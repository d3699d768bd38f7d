//! # minibroker
//!
//! An in-memory publish/subscribe broker: named topics split into
//! append-only partitions, producers that route messages through a pluggable
//! partition strategy, and consumers that read partitions by offset.
//!
//! ## Architecture
//!
//! - **Domain Layer**: messages, partitions, topics, partition strategies,
//!   the [`Broker`] registry and the [`Producer`]/[`Consumer`] handles
//! - **Application Layer**: use cases and serializable status DTOs
//! - **Infrastructure Layer**: the DashMap-backed topic registry
//!
//! ## Usage
//!
//! ```rust
//! use minibroker::domain::clients::Producer;
//! use minibroker::domain::services::Broker;
//! use minibroker::domain::value_objects::{PartitionStrategyKind, TopicName};
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let broker = Arc::new(Broker::with_strategy(PartitionStrategyKind::KeyBased));
//!     broker.create_topic(TopicName::new("orders".to_string())?, 3, 1)?;
//!
//!     let mut producer = Producer::with_broker(broker.clone());
//!     let message = producer.try_send("orders", "order #1", Some("user-1"))?;
//!
//!     println!(
//!         "Message {} stored in partition {:?} at offset {:?}",
//!         message.id,
//!         message.partition(),
//!         message.offset()
//!     );
//!     Ok(())
//! }
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use config::{BrokerConfig, ConfigError};
pub use domain::clients::{Consumer, Producer};
pub use domain::entities::{Message, Partition, Topic};
pub use domain::errors::{DomainError, Result};
pub use domain::services::{Broker, BrokerBuilder};
pub use domain::strategies::{
    KeyBasedStrategy, PartitionStrategy, PartitionStrategyFactory, RandomStrategy,
    RoundRobinStrategy,
};
pub use domain::value_objects::{
    MessageId, MessageStatus, Offset, PartitionId, PartitionStrategyKind, TopicName,
};
pub use infrastructure::persistence::InMemoryTopicRepository;
