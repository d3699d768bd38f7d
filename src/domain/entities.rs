use chrono::{DateTime, Utc};
use log::debug;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use super::errors::{DomainError, Result};
use super::value_objects::*;

/// A topic is a named stream of messages split into a fixed set of partitions
#[derive(Debug)]
pub struct Topic {
    pub name: TopicName,
    pub replication_factor: u32,
    pub created_at: DateTime<Utc>,
    instance: Uuid,
    partitions: Vec<Arc<Partition>>,
}

impl Topic {
    /// Create a topic and all of its partitions up front.
    ///
    /// The partition count is fixed for the lifetime of the topic.
    pub fn new(name: TopicName, partition_count: u32, replication_factor: u32) -> Result<Self> {
        if partition_count == 0 {
            return Err(DomainError::InvalidPartitionCount(partition_count));
        }
        if replication_factor == 0 {
            return Err(DomainError::InvalidReplicationFactor(replication_factor));
        }

        let partitions = (0..partition_count)
            .map(|id| Arc::new(Partition::new(PartitionId(id), name.clone())))
            .collect();

        Ok(Self {
            name,
            replication_factor,
            created_at: Utc::now(),
            instance: Uuid::new_v4(),
            partitions,
        })
    }

    /// Identity of this topic incarnation.
    ///
    /// A topic deleted and created again under the same name gets a new value.
    pub fn instance_id(&self) -> Uuid {
        self.instance
    }

    pub fn partition_count(&self) -> u32 {
        self.partitions.len() as u32
    }

    /// Get a specific partition by ID
    pub fn get_partition(&self, partition_id: PartitionId) -> Option<Arc<Partition>> {
        self.partitions.get(partition_id.value() as usize).cloned()
    }

    /// All partitions, ordered by ascending ID
    pub fn get_all_partitions(&self) -> Vec<Arc<Partition>> {
        self.partitions.clone()
    }

    /// Total number of messages across every partition
    pub fn message_count(&self) -> usize {
        self.partitions.iter().map(|p| p.message_count()).sum()
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Topic(name={}, partitions={}, replication={})",
            self.name,
            self.partition_count(),
            self.replication_factor
        )
    }
}

/// A partition is an append-only log of messages.
///
/// The message at index `i` always carries offset `i`. Appends take the write
/// lock so offset assignment and the push happen as one step; readers share
/// the read lock and never observe a half-appended message.
#[derive(Debug)]
pub struct Partition {
    pub id: PartitionId,
    pub topic: TopicName,
    log: RwLock<Vec<Message>>,
    next_offset: AtomicU64,
}

impl Partition {
    /// Create a new empty partition
    pub fn new(id: PartitionId, topic: TopicName) -> Self {
        Self {
            id,
            topic,
            log: RwLock::new(Vec::new()),
            next_offset: AtomicU64::new(0),
        }
    }

    /// Append a message and return the offset it was assigned
    pub fn add_message(&self, message: Message) -> Result<Offset> {
        self.append(message).map(|delivered| delivered.offset().unwrap_or_default())
    }

    /// Append a message and return a copy of it as stored
    pub(crate) fn append(&self, mut message: Message) -> Result<Message> {
        let placed = message.partition.is_some() || message.offset.is_some();
        if message.status() != MessageStatus::Pending || placed {
            return Err(DomainError::AlreadyDelivered(message.id));
        }

        let mut log = self.log.write();
        let offset = Offset(log.len() as u64);
        assert_eq!(
            self.next_offset.load(Ordering::Acquire),
            offset.value(),
            "offset counter diverged from log length in {}:{}",
            self.topic,
            self.id
        );

        message.mark_delivered(self.id, offset);
        log.push(message.clone());
        self.next_offset.store(offset.next().value(), Ordering::Release);
        drop(log);

        debug!(
            "Appended message {} to {}:{} at offset {}",
            message.id, self.topic, self.id, offset
        );
        Ok(message)
    }

    /// Get the message stored at `offset`, if any
    pub fn get_message(&self, offset: Offset) -> Option<Message> {
        self.log.read().get(offset.value() as usize).cloned()
    }

    /// Get up to `max_count` messages starting at `start`.
    ///
    /// `None` reads to the end of the log. A start past the end yields nothing.
    pub fn get_messages(&self, start: Offset, max_count: Option<usize>) -> Vec<Message> {
        let log = self.log.read();
        let start = start.value() as usize;
        if start >= log.len() {
            return Vec::new();
        }
        let end = match max_count {
            Some(max) => start.saturating_add(max).min(log.len()),
            None => log.len(),
        };
        log[start..end].to_vec()
    }

    /// Read like [`get_messages`](Self::get_messages) and mark what was read as consumed
    pub(crate) fn consume(&self, start: Offset, max_count: usize) -> Vec<Message> {
        let mut log = self.log.write();
        let start = start.value() as usize;
        if start >= log.len() {
            return Vec::new();
        }
        let end = start.saturating_add(max_count).min(log.len());
        log[start..end]
            .iter_mut()
            .map(|message| {
                message.mark_consumed();
                message.clone()
            })
            .collect()
    }

    /// The offset the next appended message will receive
    pub fn next_offset(&self) -> Offset {
        Offset(self.next_offset.load(Ordering::Acquire))
    }

    /// Get the number of messages in this partition
    pub fn message_count(&self) -> usize {
        self.log.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.message_count() == 0
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Partition(id={}, topic={}, messages={})",
            self.id,
            self.topic,
            self.message_count()
        )
    }
}

/// A message is the fundamental unit of data that flows through the system.
///
/// Delivery fields are private: partition and offset are set together exactly
/// once, when a partition appends the message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub topic: TopicName,
    pub key: Option<String>,
    pub value: Vec<u8>,
    pub timestamp: DateTime<Utc>,
    status: MessageStatus,
    partition: Option<PartitionId>,
    offset: Option<Offset>,
}

impl Message {
    /// Create a new pending message
    pub fn new(topic: TopicName, key: Option<String>, value: Vec<u8>) -> Self {
        Self {
            id: MessageId::new(),
            topic,
            key,
            value,
            timestamp: Utc::now(),
            status: MessageStatus::Pending,
            partition: None,
            offset: None,
        }
    }

    pub fn status(&self) -> MessageStatus {
        self.status
    }

    pub fn partition(&self) -> Option<PartitionId> {
        self.partition
    }

    pub fn offset(&self) -> Option<Offset> {
        self.offset
    }

    /// The key, treating an empty string as no key
    pub fn routing_key(&self) -> Option<&str> {
        self.key.as_deref().filter(|k| !k.is_empty())
    }

    /// The payload as UTF-8, lossily
    pub fn value_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }

    fn mark_delivered(&mut self, partition: PartitionId, offset: Offset) {
        debug_assert!(self.partition.is_none() && self.offset.is_none());
        self.status = MessageStatus::Delivered;
        self.partition = Some(partition);
        self.offset = Some(offset);
    }

    fn mark_consumed(&mut self) {
        if self.status == MessageStatus::Delivered {
            self.status = MessageStatus::Consumed;
        }
    }

    pub(crate) fn mark_failed(&mut self) {
        if self.status == MessageStatus::Pending {
            self.status = MessageStatus::Failed;
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmt_opt = |v: Option<String>| v.unwrap_or_else(|| "None".to_string());
        write!(
            f,
            "Message(id={}, topic={}, key={}, partition={}, offset={}, status={})",
            self.id,
            self.topic,
            fmt_opt(self.key.clone()),
            fmt_opt(self.partition.map(|p| p.to_string())),
            fmt_opt(self.offset.map(|o| o.to_string())),
            self.status
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic_name(name: &str) -> TopicName {
        TopicName::new(name.to_string()).unwrap()
    }

    fn message(value: &str) -> Message {
        Message::new(topic_name("t"), None, value.as_bytes().to_vec())
    }

    #[test]
    fn test_new_message_is_pending() {
        let msg = message("hello");
        assert_eq!(msg.status(), MessageStatus::Pending);
        assert!(msg.partition().is_none());
        assert!(msg.offset().is_none());
    }

    #[test]
    fn test_offsets_follow_append_order() {
        let partition = Partition::new(PartitionId(2), topic_name("t"));
        for i in 0..5u64 {
            let offset = partition.add_message(message(&format!("m{}", i))).unwrap();
            assert_eq!(offset, Offset(i));
        }

        for (i, msg) in partition.get_messages(Offset(0), None).iter().enumerate() {
            assert_eq!(msg.offset(), Some(Offset(i as u64)));
            assert_eq!(msg.partition(), Some(PartitionId(2)));
            assert_eq!(msg.status(), MessageStatus::Delivered);
        }
        assert_eq!(partition.next_offset(), Offset(5));
    }

    #[test]
    fn test_empty_partition_reads() {
        let partition = Partition::new(PartitionId(0), topic_name("t"));
        assert!(partition.get_message(Offset(0)).is_none());
        assert!(partition.get_messages(Offset(0), Some(10)).is_empty());
        assert!(partition.is_empty());
    }

    #[test]
    fn test_get_messages_clips_to_log() {
        let partition = Partition::new(PartitionId(0), topic_name("t"));
        for i in 0..4 {
            partition.add_message(message(&i.to_string())).unwrap();
        }

        assert_eq!(partition.get_messages(Offset(1), Some(2)).len(), 2);
        assert_eq!(partition.get_messages(Offset(2), Some(100)).len(), 2);
        assert_eq!(partition.get_messages(Offset(3), None).len(), 1);
        assert!(partition.get_messages(Offset(4), None).is_empty());
        assert!(partition.get_messages(Offset(0), Some(0)).is_empty());
        assert_eq!(partition.get_messages(Offset(1), Some(usize::MAX)).len(), 3);
        assert!(partition.get_message(Offset(4)).is_none());
    }

    #[test]
    fn test_reads_are_idempotent() {
        let partition = Partition::new(PartitionId(0), topic_name("t"));
        for i in 0..3 {
            partition.add_message(message(&i.to_string())).unwrap();
        }
        let first = partition.get_messages(Offset(1), Some(5));
        let second = partition.get_messages(Offset(1), Some(5));
        assert_eq!(first, second);
    }

    #[test]
    fn test_delivered_message_cannot_be_appended_again() {
        let partition = Partition::new(PartitionId(0), topic_name("t"));
        partition.add_message(message("once")).unwrap();
        let stored = partition.get_message(Offset(0)).unwrap();

        let err = partition.add_message(stored).unwrap_err();
        assert!(matches!(err, DomainError::AlreadyDelivered(_)));
        assert_eq!(partition.message_count(), 1);
    }

    #[test]
    fn test_pending_message_with_position_is_rejected() {
        let partition = Partition::new(PartitionId(0), topic_name("t"));
        let mut forged = message("forged");
        forged.offset = Some(Offset(7));

        let err = partition.add_message(forged).unwrap_err();
        assert!(matches!(err, DomainError::AlreadyDelivered(_)));
        assert!(partition.is_empty());
        assert_eq!(partition.next_offset(), Offset(0));

        let mut forged = message("forged");
        forged.partition = Some(PartitionId(3));
        assert!(partition.add_message(forged).is_err());
        assert_eq!(partition.add_message(message("real")).unwrap(), Offset(0));
    }

    #[test]
    fn test_consume_marks_messages() {
        let partition = Partition::new(PartitionId(0), topic_name("t"));
        for i in 0..3 {
            partition.add_message(message(&i.to_string())).unwrap();
        }
        let consumed = partition.consume(Offset(0), 2);
        assert_eq!(consumed.len(), 2);
        assert!(consumed.iter().all(|m| m.status() == MessageStatus::Consumed));
        assert_eq!(
            partition.get_message(Offset(2)).unwrap().status(),
            MessageStatus::Delivered
        );
    }

    #[test]
    fn test_topic_creates_partitions_eagerly() {
        let topic = Topic::new(topic_name("orders"), 3, 1).unwrap();
        let ids: Vec<_> = topic.get_all_partitions().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![PartitionId(0), PartitionId(1), PartitionId(2)]);
        assert!(topic.get_partition(PartitionId(3)).is_none());
        assert_eq!(topic.to_string(), "Topic(name=orders, partitions=3, replication=1)");
    }

    #[test]
    fn test_recreated_topic_has_new_instance() {
        let first = Topic::new(topic_name("orders"), 1, 1).unwrap();
        let second = Topic::new(topic_name("orders"), 1, 1).unwrap();
        assert_ne!(first.instance_id(), second.instance_id());
    }

    #[test]
    fn test_topic_rejects_zero_partitions() {
        assert!(matches!(
            Topic::new(topic_name("t"), 0, 1),
            Err(DomainError::InvalidPartitionCount(0))
        ));
        assert!(matches!(
            Topic::new(topic_name("t"), 1, 0),
            Err(DomainError::InvalidReplicationFactor(0))
        ));
    }

    #[test]
    fn test_partition_display() {
        let partition = Partition::new(PartitionId(1), topic_name("events"));
        partition.add_message(message("a")).unwrap();
        assert_eq!(partition.to_string(), "Partition(id=1, topic=events, messages=1)");
    }
}
