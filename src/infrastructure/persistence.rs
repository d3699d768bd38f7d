use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

use crate::domain::{
    entities::Topic, errors::Result, repositories::TopicRepository, value_objects::TopicName,
};

/// In-memory implementation of the TopicRepository
#[derive(Default)]
pub struct InMemoryTopicRepository {
    topics: DashMap<TopicName, Arc<Topic>>,
}

impl InMemoryTopicRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TopicRepository for InMemoryTopicRepository {
    fn find_by_name(&self, name: &TopicName) -> Option<Arc<Topic>> {
        self.topics.get(name).map(|entry| entry.value().clone())
    }

    fn get_or_create(
        &self,
        name: &TopicName,
        create: &mut dyn FnMut() -> Result<Topic>,
    ) -> Result<(Arc<Topic>, bool)> {
        // The vacant entry holds the shard lock, so only one caller builds the topic
        match self.topics.entry(name.clone()) {
            Entry::Occupied(entry) => Ok((entry.get().clone(), false)),
            Entry::Vacant(entry) => {
                let topic = Arc::new(create()?);
                entry.insert(topic.clone());
                Ok((topic, true))
            }
        }
    }

    fn insert_if_absent(&self, topic: Topic) -> Option<Arc<Topic>> {
        match self.topics.entry(topic.name.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(entry) => {
                let topic = Arc::new(topic);
                entry.insert(topic.clone());
                Some(topic)
            }
        }
    }

    fn list_all(&self) -> Vec<Arc<Topic>> {
        let mut topics: Vec<Arc<Topic>> = self
            .topics
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        topics.sort_by(|a, b| a.name.cmp(&b.name));
        topics
    }

    fn delete(&self, name: &TopicName) -> bool {
        self.topics.remove(name).is_some()
    }

    fn exists(&self, name: &TopicName) -> bool {
        self.topics.contains_key(name)
    }
}
