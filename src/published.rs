//! Buffer of values pushed to subscribed topics during the current cycle.

use crate::error::{LogError, LogResult};
use std::collections::HashMap;

/// A value that may or may not have been published this cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Published {
    /// A value was published this cycle.
    Present(String),
    /// Nothing was published this cycle.
    #[default]
    Absent,
}

impl Published {
    /// True for [`Published::Present`].
    pub fn is_present(&self) -> bool {
        matches!(self, Published::Present(_))
    }

    /// The published text, if any.
    pub fn as_deref(&self) -> Option<&str> {
        match self {
            Published::Present(value) => Some(value),
            Published::Absent => None,
        }
    }
}

/// Per-cycle buffer keyed by subscribed-topic name.
///
/// Only names added through [`PublishedData::insert_absent`] accept data.
#[derive(Debug, Default)]
pub struct PublishedData {
    entries: HashMap<String, Published>,
}

impl PublishedData {
    /// An empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry for a newly registered subscribed topic.
    pub fn insert_absent(&mut self, name: impl Into<String>) {
        self.entries.insert(name.into(), Published::Absent);
    }

    /// Stores `value` for `name`, replacing anything published earlier this cycle.
    ///
    /// # Errors
    ///
    /// Returns `LogError::UnknownTopic` if `name` has no entry.
    pub fn publish(&mut self, name: &str, value: String) -> LogResult<()> {
        let entry = self
            .entries
            .get_mut(name)
            .ok_or_else(|| LogError::UnknownTopic(name.to_string()))?;
        *entry = Published::Present(value);
        Ok(())
    }

    /// The entry for `name`, `Absent` for unknown names.
    pub fn get(&self, name: &str) -> Published {
        self.entries.get(name).cloned().unwrap_or_default()
    }

    /// Whether `name` accepts published data.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Marks every entry as absent for the next cycle.
    pub fn reset(&mut self) {
        self.entries
            .values_mut()
            .for_each(|entry| *entry = Published::Absent);
    }

    /// Number of subscribed topics with an entry.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no subscribed topic is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
