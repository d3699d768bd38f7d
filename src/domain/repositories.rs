use std::sync::Arc;

use super::entities::Topic;
use super::errors::Result;
use super::value_objects::TopicName;

/// Registry of topics owned by a broker.
///
/// Implementations must make [`get_or_create`](TopicRepository::get_or_create)
/// and [`insert_if_absent`](TopicRepository::insert_if_absent) atomic per name:
/// concurrent callers racing on the same name all observe a single topic.
pub trait TopicRepository: Send + Sync {
    fn find_by_name(&self, name: &TopicName) -> Option<Arc<Topic>>;

    /// Return the topic named `name`, building it with `create` if missing.
    ///
    /// The flag is `true` when this call created the topic.
    fn get_or_create(
        &self,
        name: &TopicName,
        create: &mut dyn FnMut() -> Result<Topic>,
    ) -> Result<(Arc<Topic>, bool)>;

    /// Store `topic` unless its name is taken; returns the stored topic on success
    fn insert_if_absent(&self, topic: Topic) -> Option<Arc<Topic>>;

    /// All topics, ordered by name
    fn list_all(&self) -> Vec<Arc<Topic>>;

    fn delete(&self, name: &TopicName) -> bool;

    fn exists(&self, name: &TopicName) -> bool;
}
