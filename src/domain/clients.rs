use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use super::{
    entities::{Message, Topic},
    errors::*,
    services::Broker,
    value_objects::*,
};

/// A producer sends messages to topics through the broker it is bound to
/// and remembers the ids of everything it sent successfully.
#[derive(Debug, Clone)]
pub struct Producer {
    pub id: ProducerId,
    broker: Option<Arc<Broker>>,
    sent_messages: Vec<MessageId>,
}

impl Producer {
    /// Create an unbound producer
    pub fn new(id: ProducerId) -> Self {
        Self {
            id,
            broker: None,
            sent_messages: Vec::new(),
        }
    }

    /// Create a producer with a generated id, bound and registered with `broker`
    pub fn with_broker(broker: Arc<Broker>) -> Self {
        let mut producer = Self::new(ProducerId::generate());
        producer.set_broker(broker);
        producer
    }

    /// Bind to `broker`, registering this producer's id with it
    pub fn set_broker(&mut self, broker: Arc<Broker>) {
        broker.register_producer(&self.id);
        self.broker = Some(broker);
    }

    pub fn is_bound(&self) -> bool {
        self.broker.is_some()
    }

    /// Send a message, returning its id, or `None` if the send failed.
    ///
    /// Failures are logged; use [`try_send`](Self::try_send) to inspect them.
    pub fn send(
        &mut self,
        topic: &str,
        value: impl Into<Vec<u8>>,
        key: Option<&str>,
    ) -> Option<MessageId> {
        match self.try_send(topic, value, key) {
            Ok(message) => Some(message.id),
            Err(e) => {
                warn!("Producer {} failed to send to '{}': {}", self.id, topic, e);
                None
            }
        }
    }

    /// Send a message and return it as stored by the broker
    pub fn try_send(
        &mut self,
        topic: &str,
        value: impl Into<Vec<u8>>,
        key: Option<&str>,
    ) -> Result<Message> {
        let broker = self
            .broker
            .as_ref()
            .ok_or_else(|| DomainError::Unbound(format!("producer {}", self.id)))?;
        let topic = TopicName::new(topic.to_string())?;

        let message = broker.publish(
            &topic,
            value.into(),
            key.map(str::to_string),
            Some(&self.id),
        )?;
        self.sent_messages.push(message.id);
        Ok(message)
    }

    /// Ids of successfully sent messages, in send order
    pub fn sent_messages(&self) -> &[MessageId] {
        &self.sent_messages
    }
}

impl fmt::Display for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Producer(id={}, messages_sent={})",
            self.id,
            self.sent_messages.len()
        )
    }
}

/// A consumer reads subscribed topics partition by partition, tracking its
/// own position in each.
///
/// Each subscription remembers which incarnation of the topic its positions
/// belong to. If the topic is deleted and created again, the next poll starts
/// the new topic from offset 0.
#[derive(Debug, Clone)]
pub struct Consumer {
    pub id: ConsumerId,
    pub group_id: GroupId,
    broker: Option<Arc<Broker>>,
    subscriptions: BTreeMap<TopicName, Uuid>,
    positions: HashMap<TopicPartition, Offset>,
    consumed_messages: Vec<MessageId>,
}

impl Consumer {
    /// Create an unbound consumer; a fresh group id is generated when none is given
    pub fn new(id: ConsumerId, group_id: Option<GroupId>) -> Self {
        Self {
            id,
            group_id: group_id.unwrap_or_else(GroupId::generate),
            broker: None,
            subscriptions: BTreeMap::new(),
            positions: HashMap::new(),
            consumed_messages: Vec::new(),
        }
    }

    /// Create a consumer with a generated id, bound and registered with `broker`
    pub fn with_broker(broker: Arc<Broker>, group_id: Option<GroupId>) -> Self {
        let mut consumer = Self::new(ConsumerId::generate(), group_id);
        consumer.set_broker(broker);
        consumer
    }

    /// Bind to `broker` and join this consumer's group there
    pub fn set_broker(&mut self, broker: Arc<Broker>) {
        broker.register_consumer(&self.id, &self.group_id);
        self.broker = Some(broker);
    }

    /// Subscribe to an existing topic, starting every partition at offset 0
    pub fn subscribe(&mut self, topic: &str) -> Result<()> {
        let broker = self
            .broker
            .as_ref()
            .ok_or_else(|| DomainError::Unbound(format!("consumer {}", self.id)))?;
        let name = TopicName::new(topic.to_string())?;
        let topic = broker
            .get_topic(&name)
            .ok_or_else(|| DomainError::TopicNotFound(name.clone()))?;

        if !self.subscriptions.contains_key(&name) {
            self.rewind(&name, &topic);
            info!("Consumer {} subscribed to '{}'", self.id, name);
        }
        Ok(())
    }

    /// Point every partition of `topic` at offset 0 and pin its instance
    fn rewind(&mut self, name: &TopicName, topic: &Topic) {
        self.positions.retain(|tp, _| &tp.topic != name);
        for partition in topic.get_all_partitions() {
            self.positions
                .insert(TopicPartition::new(name.clone(), partition.id), Offset(0));
        }
        self.subscriptions.insert(name.clone(), topic.instance_id());
    }

    /// Drop a subscription and its positions. Returns `false` if not subscribed.
    pub fn unsubscribe(&mut self, topic: &str) -> bool {
        let Ok(name) = TopicName::new(topic.to_string()) else {
            return false;
        };
        if self.subscriptions.remove(&name).is_none() {
            return false;
        }
        self.positions.retain(|tp, _| tp.topic != name);
        info!("Consumer {} unsubscribed from '{}'", self.id, name);
        true
    }

    pub fn subscriptions(&self) -> impl Iterator<Item = &TopicName> {
        self.subscriptions.keys()
    }

    /// Current read position for a topic-partition, if subscribed
    pub fn position(&self, topic_partition: &TopicPartition) -> Option<Offset> {
        self.positions.get(topic_partition).copied()
    }

    /// Read up to `max_messages` from subscribed topics.
    ///
    /// Topics are visited by name and partitions by id. Returned messages are
    /// marked consumed and positions move past them.
    pub fn poll(&mut self, max_messages: usize) -> Vec<Message> {
        let Some(broker) = self.broker.clone() else {
            return Vec::new();
        };

        let subscribed: Vec<(TopicName, Uuid)> = self
            .subscriptions
            .iter()
            .map(|(name, instance)| (name.clone(), *instance))
            .collect();

        let mut messages = Vec::new();
        for (name, instance) in subscribed {
            if messages.len() >= max_messages {
                break;
            }
            let Some(topic) = broker.get_topic(&name) else {
                debug!("Subscribed topic '{}' no longer exists", name);
                continue;
            };
            if topic.instance_id() != instance {
                info!(
                    "Topic '{}' was recreated; consumer {} restarts it at offset 0",
                    name, self.id
                );
                self.rewind(&name, &topic);
            }

            for partition in topic.get_all_partitions() {
                let remaining = max_messages - messages.len();
                if remaining == 0 {
                    break;
                }
                let tp = TopicPartition::new(name.clone(), partition.id);
                let position = self.positions.get(&tp).copied().unwrap_or_default();
                let batch = partition.consume(position, remaining);
                if batch.is_empty() {
                    continue;
                }

                self.positions
                    .insert(tp, Offset(position.value() + batch.len() as u64));
                self.consumed_messages.extend(batch.iter().map(|m| m.id));
                messages.extend(batch);
            }
        }

        debug!("Consumer {} polled {} messages", self.id, messages.len());
        messages
    }

    /// Ids of every message this consumer has polled, in poll order
    pub fn consumed_messages(&self) -> &[MessageId] {
        &self.consumed_messages
    }
}

impl fmt::Display for Consumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Consumer(id={}, group={}, subscribed_topics={})",
            self.id,
            self.group_id,
            self.subscriptions.len()
        )
    }
}
