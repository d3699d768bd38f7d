//! Partition assignment policies.
//!
//! A [`PartitionStrategy`] maps a message and its destination topic to a
//! partition index. The broker holds exactly one strategy, shared by every
//! producer that sends through it, so implementations must be `Send + Sync`
//! and keep any mutable state behind their own synchronization.
//!
//! Three strategies are built in and selected with [`PartitionStrategyKind`]:
//!
//! - [`RoundRobinStrategy`]: cycles through partitions per topic
//! - [`KeyBasedStrategy`]: MD5 of the key, so equal keys share a partition
//! - [`RandomStrategy`]: uniform random choice, no ordering guarantee

use dashmap::DashMap;
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use super::entities::{Message, Topic};
use super::value_objects::{PartitionId, PartitionStrategyKind, TopicName};

/// Decides which partition of `topic` receives `message`.
///
/// Returned IDs must lie in `0..topic.partition_count()`. Topics always have
/// at least one partition.
pub trait PartitionStrategy: Send + Sync + fmt::Debug {
    fn assign_partition(&self, message: &Message, topic: &Topic) -> PartitionId;

    /// Short name used in logs and status output
    fn name(&self) -> &'static str;

    /// Drop any per-topic state held for `topic`. Called when it is deleted.
    fn forget_topic(&self, _topic: &TopicName) {}
}

/// Builds a shared strategy instance for a configured kind
pub struct PartitionStrategyFactory;

impl PartitionStrategyFactory {
    pub fn create(kind: PartitionStrategyKind) -> Arc<dyn PartitionStrategy> {
        match kind {
            PartitionStrategyKind::RoundRobin => Arc::new(RoundRobinStrategy::new()),
            PartitionStrategyKind::KeyBased => Arc::new(KeyBasedStrategy),
            PartitionStrategyKind::Random => Arc::new(RandomStrategy),
        }
    }
}

/// Cycles through a topic's partitions, starting at 0 for each new topic.
///
/// Cursors live in this instance, keyed by topic name and instance, so a
/// topic recreated under an old name starts again at partition 0. Reading and
/// advancing a cursor happens while holding the map entry, so concurrent
/// senders to the same topic never receive the same slot twice in a cycle.
#[derive(Debug, Default)]
pub struct RoundRobinStrategy {
    cursors: DashMap<(TopicName, Uuid), u32>,
}

impl RoundRobinStrategy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PartitionStrategy for RoundRobinStrategy {
    fn assign_partition(&self, _message: &Message, topic: &Topic) -> PartitionId {
        let mut cursor = self
            .cursors
            .entry((topic.name.clone(), topic.instance_id()))
            .or_insert(0);
        let partition = *cursor;
        *cursor = (partition + 1) % topic.partition_count();
        PartitionId(partition)
    }

    fn name(&self) -> &'static str {
        PartitionStrategyKind::RoundRobin.as_str()
    }

    fn forget_topic(&self, topic: &TopicName) {
        self.cursors.retain(|(name, _), _| name != topic);
    }
}

/// Routes by MD5 of the message key; keyless messages go to partition 0
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyBasedStrategy;

impl KeyBasedStrategy {
    /// Partition for `key` in a topic with `partition_count` partitions
    pub fn partition_for_key(key: &str, partition_count: u32) -> PartitionId {
        let digest = md5::compute(key.as_bytes());
        let hash = u128::from_be_bytes(digest.0);
        PartitionId((hash % u128::from(partition_count)) as u32)
    }
}

impl PartitionStrategy for KeyBasedStrategy {
    fn assign_partition(&self, message: &Message, topic: &Topic) -> PartitionId {
        match message.routing_key() {
            Some(key) => Self::partition_for_key(key, topic.partition_count()),
            None => PartitionId(0),
        }
    }

    fn name(&self) -> &'static str {
        PartitionStrategyKind::KeyBased.as_str()
    }
}

/// Picks a partition uniformly at random on every call
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomStrategy;

impl PartitionStrategy for RandomStrategy {
    fn assign_partition(&self, _message: &Message, topic: &Topic) -> PartitionId {
        PartitionId(rand::thread_rng().gen_range(0..topic.partition_count()))
    }

    fn name(&self) -> &'static str {
        PartitionStrategyKind::Random.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn topic(name: &str, partitions: u32) -> Topic {
        Topic::new(TopicName::new(name.to_string()).unwrap(), partitions, 1).unwrap()
    }

    fn keyed(topic: &Topic, key: Option<&str>) -> Message {
        Message::new(topic.name.clone(), key.map(str::to_string), b"v".to_vec())
    }

    #[test]
    fn test_round_robin_cycles_from_zero() {
        let strategy = RoundRobinStrategy::new();
        let events = topic("events", 2);

        let assigned: Vec<u32> = (0..4)
            .map(|_| strategy.assign_partition(&keyed(&events, None), &events).value())
            .collect();
        assert_eq!(assigned, vec![0, 1, 0, 1]);
    }

    #[test]
    fn test_round_robin_cursors_are_per_topic() {
        let strategy = RoundRobinStrategy::new();
        let a = topic("a", 3);
        let b = topic("b", 3);

        assert_eq!(strategy.assign_partition(&keyed(&a, None), &a), PartitionId(0));
        assert_eq!(strategy.assign_partition(&keyed(&a, None), &a), PartitionId(1));
        assert_eq!(strategy.assign_partition(&keyed(&b, None), &b), PartitionId(0));
        assert_eq!(strategy.assign_partition(&keyed(&a, None), &a), PartitionId(2));
    }

    #[test]
    fn test_round_robin_visits_every_partition_once() {
        let strategy = RoundRobinStrategy::new();
        let t = topic("coverage", 5);

        let seen: HashSet<u32> = (0..5)
            .map(|_| strategy.assign_partition(&keyed(&t, None), &t).value())
            .collect();
        assert_eq!(seen.len(), 5);
    }

    #[test]
    fn test_key_based_matches_md5_modulo() {
        // int(md5("user-1")) % 3 == 1, int(md5("user-2")) % 3 == 0
        assert_eq!(KeyBasedStrategy::partition_for_key("user-1", 3), PartitionId(1));
        assert_eq!(KeyBasedStrategy::partition_for_key("user-2", 3), PartitionId(0));
        assert_eq!(KeyBasedStrategy::partition_for_key("user2", 3), PartitionId(2));
        assert_eq!(KeyBasedStrategy::partition_for_key("user-2", 4), PartitionId(3));
    }

    #[test]
    fn test_key_based_affinity_and_fallback() {
        let strategy = KeyBasedStrategy;
        let orders = topic("orders", 7);

        let first = strategy.assign_partition(&keyed(&orders, Some("customer-42")), &orders);
        for _ in 0..10 {
            assert_eq!(
                strategy.assign_partition(&keyed(&orders, Some("customer-42")), &orders),
                first
            );
        }

        assert_eq!(strategy.assign_partition(&keyed(&orders, None), &orders), PartitionId(0));
        assert_eq!(strategy.assign_partition(&keyed(&orders, Some("")), &orders), PartitionId(0));
    }

    #[test]
    fn test_round_robin_restarts_for_recreated_topic() {
        let strategy = RoundRobinStrategy::new();
        let old = topic("events", 3);
        strategy.assign_partition(&keyed(&old, None), &old);
        strategy.assign_partition(&keyed(&old, None), &old);

        // same name, new incarnation
        let new = topic("events", 2);
        assert_eq!(strategy.assign_partition(&keyed(&new, None), &new), PartitionId(0));
        assert_eq!(strategy.assign_partition(&keyed(&new, None), &new), PartitionId(1));
    }

    #[test]
    fn test_round_robin_forget_topic_drops_cursors() {
        let strategy = RoundRobinStrategy::new();
        let a = topic("a", 2);
        let b = topic("b", 2);
        strategy.assign_partition(&keyed(&a, None), &a);
        strategy.assign_partition(&keyed(&b, None), &b);

        strategy.forget_topic(&a.name);
        assert_eq!(strategy.cursors.len(), 1);
        assert_eq!(strategy.assign_partition(&keyed(&a, None), &a), PartitionId(0));
        assert_eq!(strategy.assign_partition(&keyed(&b, None), &b), PartitionId(1));
    }

    #[test]
    fn test_random_spreads_over_all_partitions() {
        let strategy = RandomStrategy;
        let t = topic("random", 4);
        let mut counts = [0usize; 4];
        for _ in 0..400 {
            let partition = strategy.assign_partition(&keyed(&t, None), &t);
            assert!(partition.value() < 4);
            counts[partition.value() as usize] += 1;
        }
        // expected 100 each; 40 is far outside any plausible uniform draw
        assert!(counts.iter().all(|&c| c >= 40), "skewed draws: {:?}", counts);

        let single = topic("single", 1);
        assert_eq!(strategy.assign_partition(&keyed(&single, None), &single), PartitionId(0));
    }

    #[test]
    fn test_factory_builds_requested_kind() {
        for kind in [
            PartitionStrategyKind::RoundRobin,
            PartitionStrategyKind::KeyBased,
            PartitionStrategyKind::Random,
        ] {
            assert_eq!(PartitionStrategyFactory::create(kind).name(), kind.as_str());
        }
    }
}
