use dashmap::{DashMap, DashSet};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use super::{
    entities::*, errors::*, repositories::TopicRepository, strategies::*, value_objects::*,
};
use crate::config::{BrokerConfig, ConfigError};
use crate::infrastructure::persistence::InMemoryTopicRepository;

/// Builds a [`Broker`] from a config, with optional overrides for the
/// partition strategy and the topic registry
#[derive(Default)]
pub struct BrokerBuilder {
    config: BrokerConfig,
    strategy: Option<Arc<dyn PartitionStrategy>>,
    repository: Option<Arc<dyn TopicRepository>>,
}

impl BrokerBuilder {
    pub fn config(mut self, config: BrokerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn partition_strategy(mut self, kind: PartitionStrategyKind) -> Self {
        self.config.partition_strategy = kind;
        self.strategy = None;
        self
    }

    /// Use a caller-provided strategy instead of a built-in one
    pub fn custom_strategy(mut self, strategy: Arc<dyn PartitionStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn repository(mut self, repository: Arc<dyn TopicRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn auto_create_topics(mut self, enabled: bool) -> Self {
        self.config.auto_create_topics = enabled;
        self
    }

    pub fn build(self) -> std::result::Result<Broker, ConfigError> {
        self.config.validate()?;

        let id = self
            .config
            .broker_id
            .clone()
            .map(BrokerId::new)
            .unwrap_or_else(BrokerId::generate);
        let strategy = self
            .strategy
            .unwrap_or_else(|| PartitionStrategyFactory::create(self.config.partition_strategy));
        let topics = self
            .repository
            .unwrap_or_else(|| Arc::new(InMemoryTopicRepository::new()));

        info!(
            "Broker {} ready (strategy: {}, auto-create topics: {})",
            id,
            strategy.name(),
            self.config.auto_create_topics
        );

        Ok(Broker {
            id,
            config: self.config,
            topics,
            strategy,
            producers: DashSet::new(),
            consumers: DashMap::new(),
            failed: Mutex::new(Vec::new()),
        })
    }
}

/// The process-local registry of topics and the routing point for all sends.
///
/// A broker is shared behind an `Arc`; every method takes `&self`.
pub struct Broker {
    id: BrokerId,
    config: BrokerConfig,
    topics: Arc<dyn TopicRepository>,
    strategy: Arc<dyn PartitionStrategy>,
    producers: DashSet<ProducerId>,
    consumers: DashMap<ConsumerId, GroupId>,
    failed: Mutex<Vec<Message>>,
}

impl Broker {
    pub fn builder() -> BrokerBuilder {
        BrokerBuilder::default()
    }

    /// Broker with default configuration and the given strategy
    pub fn with_strategy(kind: PartitionStrategyKind) -> Self {
        Self::from_parts(
            BrokerConfig {
                partition_strategy: kind,
                ..BrokerConfig::default()
            },
            PartitionStrategyFactory::create(kind),
        )
    }

    fn from_parts(config: BrokerConfig, strategy: Arc<dyn PartitionStrategy>) -> Self {
        Self {
            id: BrokerId::generate(),
            config,
            topics: Arc::new(InMemoryTopicRepository::new()),
            strategy,
            producers: DashSet::new(),
            consumers: DashMap::new(),
            failed: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> &BrokerId {
        &self.id
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Create a topic; fails if the name is already registered
    pub fn create_topic(
        &self,
        name: TopicName,
        partitions: u32,
        replication_factor: u32,
    ) -> Result<Arc<Topic>> {
        let topic = Topic::new(name.clone(), partitions, replication_factor)?;
        let topic = self
            .topics
            .insert_if_absent(topic)
            .ok_or_else(|| DomainError::TopicAlreadyExists(name.clone()))?;

        info!(
            "Created topic '{}' with {} partitions (replication factor {})",
            name, partitions, replication_factor
        );
        Ok(topic)
    }

    /// Remove a topic and all of its messages. Returns `false` if it did not exist.
    ///
    /// Strategy state for the topic is dropped too, so a topic created again
    /// under the same name starts from scratch.
    pub fn delete_topic(&self, name: &TopicName) -> bool {
        let deleted = self.topics.delete(name);
        if deleted {
            self.strategy.forget_topic(name);
            info!("Deleted topic '{}'", name);
        }
        deleted
    }

    pub fn topic_exists(&self, name: &TopicName) -> bool {
        self.topics.exists(name)
    }

    pub fn get_topic(&self, name: &TopicName) -> Option<Arc<Topic>> {
        self.topics.find_by_name(name)
    }

    /// All topics ordered by name
    pub fn get_all_topics(&self) -> Vec<Arc<Topic>> {
        self.topics.list_all()
    }

    /// Register a producer id. Returns `false` if it was already registered.
    pub fn register_producer(&self, producer_id: &ProducerId) -> bool {
        let added = self.producers.insert(producer_id.clone());
        if added {
            info!("Registered producer {} with broker {}", producer_id, self.id);
        }
        added
    }

    pub fn is_producer_registered(&self, producer_id: &ProducerId) -> bool {
        self.producers.contains(producer_id)
    }

    /// Register a consumer as a member of `group_id`, replacing any previous membership
    pub fn register_consumer(&self, consumer_id: &ConsumerId, group_id: &GroupId) {
        self.consumers.insert(consumer_id.clone(), group_id.clone());
        info!(
            "Registered consumer {} in group {} with broker {}",
            consumer_id, group_id, self.id
        );
    }

    /// Consumers registered in `group_id`, ordered by id
    pub fn group_members(&self, group_id: &GroupId) -> Vec<ConsumerId> {
        let members: BTreeSet<ConsumerId> = self
            .consumers
            .iter()
            .filter(|entry| entry.value() == group_id)
            .map(|entry| entry.key().clone())
            .collect();
        members.into_iter().collect()
    }

    pub fn producer_count(&self) -> usize {
        self.producers.len()
    }

    pub fn consumer_count(&self) -> usize {
        self.consumers.len()
    }

    /// Send a message and return its id
    pub fn send_message(
        &self,
        topic_name: &TopicName,
        value: Vec<u8>,
        key: Option<String>,
        producer_id: Option<&ProducerId>,
    ) -> Result<MessageId> {
        self.publish(topic_name, value, key, producer_id)
            .map(|message| message.id)
    }

    /// Send a message and return it as stored, with partition and offset set.
    ///
    /// A `producer_id`, when given, must belong to a registered producer.
    pub fn publish(
        &self,
        topic_name: &TopicName,
        value: Vec<u8>,
        key: Option<String>,
        producer_id: Option<&ProducerId>,
    ) -> Result<Message> {
        if let Some(producer_id) = producer_id {
            if !self.is_producer_registered(producer_id) {
                warn!("Rejected send from unregistered producer {}", producer_id);
                return Err(DomainError::ProducerNotFound(producer_id.clone()));
            }
        }

        let topic = self.resolve_topic(topic_name)?;
        let mut message = Message::new(topic_name.clone(), key, value);
        let partition_id = self.strategy.assign_partition(&message, &topic);

        let Some(partition) = topic.get_partition(partition_id) else {
            message.mark_failed();
            warn!(
                "Strategy {} chose partition {} outside topic '{}' ({} partitions); message {} failed",
                self.strategy.name(),
                partition_id,
                topic_name,
                topic.partition_count(),
                message.id
            );
            self.failed.lock().push(message);
            return Err(DomainError::PartitionNotFound {
                topic: topic_name.clone(),
                partition: partition_id,
            });
        };

        let delivered = partition.append(message)?;
        debug!(
            "Message {} delivered to {}:{} at offset {}",
            delivered.id,
            topic_name,
            partition_id,
            delivered.offset().unwrap_or_default()
        );
        Ok(delivered)
    }

    /// Messages the broker could not deliver, in the order they failed.
    ///
    /// The list is kept until drained with [`Broker::take_failed_messages`].
    pub fn failed_messages(&self) -> Vec<Message> {
        self.failed.lock().clone()
    }

    /// Drain the failed-delivery list
    pub fn take_failed_messages(&self) -> Vec<Message> {
        std::mem::take(&mut *self.failed.lock())
    }

    fn resolve_topic(&self, name: &TopicName) -> Result<Arc<Topic>> {
        if let Some(topic) = self.topics.find_by_name(name) {
            return Ok(topic);
        }
        if !self.config.auto_create_topics {
            warn!("Rejected send to unknown topic '{}'", name);
            return Err(DomainError::TopicNotFound(name.clone()));
        }

        let (topic, created) = self.topics.get_or_create(name, &mut || {
            Topic::new(
                name.clone(),
                self.config.default_partitions,
                self.config.default_replication_factor,
            )
        })?;
        if created {
            info!(
                "Auto-created topic '{}' with {} partitions",
                name,
                topic.partition_count()
            );
        }
        Ok(topic)
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::with_strategy(PartitionStrategyKind::default())
    }
}

impl fmt::Display for Broker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Broker(id={}, topics={}, producers={}, consumers={})",
            self.id,
            self.topics.list_all().len(),
            self.producer_count(),
            self.consumer_count()
        )
    }
}

impl fmt::Debug for Broker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broker")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}
