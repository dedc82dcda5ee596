//! Topic variants and their value-resolution rules.
//!
//! A topic is one column of the record. The set of kinds is closed:
//!
//! - [`QueriedTopic`] pulls its value from a producer function once per cycle.
//! - [`SubscribedTopic`] receives values pushed between cycles and applies an
//!   [`InferMode`] when nothing was pushed.
//! - [`ConstantValue`] holds a fixed value set at registration.

use crate::error::{LogError, LogResult};
use crate::format::NumberFormat;
use crate::published::Published;
use std::fmt;

/// Text logged by a subscribed topic that has no value to show.
pub const DEFAULT_DATA: &str = "-1.0";

/// What a subscribed topic shows for a cycle in which nothing was published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferMode {
    /// Fall back to [`DEFAULT_DATA`], so gaps stand out in the record.
    Default,
    /// Carry the last published value forward.
    Last,
}

/// Source of a queried topic's value.
pub enum Producer {
    /// Produces text that is logged as-is.
    Text(Box<dyn FnMut() -> String + Send>),
    /// Produces a number that is converted with the recorder's current `NumberFormat`.
    Numeric(Box<dyn FnMut() -> f64 + Send>),
}

impl fmt::Debug for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Producer::Text(_) => write!(f, "Text(<function>)"),
            Producer::Numeric(_) => write!(f, "Numeric(<function>)"),
        }
    }
}

/// A topic whose value is pulled from a producer on every refresh.
#[derive(Debug)]
pub struct QueriedTopic {
    name: String,
    producer: Producer,
    value: Option<String>,
}

impl QueriedTopic {
    /// A queried topic with no value until its first refresh.
    pub fn new(name: impl Into<String>, producer: Producer) -> Self {
        Self {
            name: name.into(),
            producer,
            value: None,
        }
    }

    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Calls the producer exactly once and caches the result as text.
    pub fn refresh_value(&mut self, number_format: &NumberFormat) {
        let value = match &mut self.producer {
            Producer::Text(produce) => produce(),
            Producer::Numeric(produce) => number_format.format(produce()),
        };
        self.value = Some(value);
    }

    /// The value cached by the latest refresh.
    ///
    /// # Errors
    ///
    /// Returns `LogError::UninitializedValue` if the topic was never refreshed.
    pub fn value(&self) -> LogResult<&str> {
        self.value
            .as_deref()
            .ok_or_else(|| LogError::UninitializedValue(self.name.clone()))
    }
}

/// A topic whose value is pushed by producers between cycles.
#[derive(Debug, Clone)]
pub struct SubscribedTopic {
    name: String,
    mode: InferMode,
    value: String,
}

impl SubscribedTopic {
    /// A subscribed topic showing [`DEFAULT_DATA`] until something is published.
    pub fn new(name: impl Into<String>, mode: InferMode) -> Self {
        Self {
            name: name.into(),
            mode,
            value: DEFAULT_DATA.to_string(),
        }
    }

    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rule applied when nothing was published.
    pub fn mode(&self) -> InferMode {
        self.mode
    }

    /// The value resolved by the latest update.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Resolves this cycle's value from what was (or was not) published.
    pub fn handle_published_data(&mut self, data: Published) {
        match (data, self.mode) {
            (Published::Present(value), _) => self.value = value,
            (Published::Absent, InferMode::Default) => self.value = DEFAULT_DATA.to_string(),
            (Published::Absent, InferMode::Last) => {}
        }
    }
}

/// A named value that never changes after registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantValue {
    name: String,
    value: String,
}

impl ConstantValue {
    /// A constant holding `value`.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Registered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The fixed value.
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// One column of the record.
#[derive(Debug)]
pub enum Topic {
    /// Pulled from a producer.
    Queried(QueriedTopic),
    /// Pushed between cycles.
    Subscribed(SubscribedTopic),
    /// Fixed at registration.
    Value(ConstantValue),
}

impl Topic {
    /// Column name.
    pub fn name(&self) -> &str {
        match self {
            Topic::Queried(topic) => topic.name(),
            Topic::Subscribed(topic) => topic.name(),
            Topic::Value(value) => value.name(),
        }
    }

    /// The text this topic contributes to the next record.
    pub fn value(&self) -> LogResult<&str> {
        match self {
            Topic::Queried(topic) => topic.value(),
            Topic::Subscribed(topic) => Ok(topic.value()),
            Topic::Value(value) => Ok(value.value()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queried_value_fails_before_refresh() {
        let topic = QueriedTopic::new("temp", Producer::Text(Box::new(|| "98.6".to_string())));
        match topic.value() {
            Err(LogError::UninitializedValue(name)) => assert_eq!(name, "temp"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn queried_refresh_calls_producer_once() {
        let mut calls = 0;
        let mut topic = QueriedTopic::new(
            "count",
            Producer::Text(Box::new(move || {
                calls += 1;
                calls.to_string()
            })),
        );
        let fmt = NumberFormat::default();

        topic.refresh_value(&fmt);
        assert_eq!(topic.value().unwrap(), "1");
        topic.refresh_value(&fmt);
        assert_eq!(topic.value().unwrap(), "2");
    }

    #[test]
    fn numeric_producer_uses_format_at_refresh_time() {
        let mut topic = QueriedTopic::new("speed", Producer::Numeric(Box::new(|| 2.5)));

        topic.refresh_value(&NumberFormat::default());
        assert_eq!(topic.value().unwrap(), "2.5000");

        topic.refresh_value(&NumberFormat::custom(|v| format!("{v}")));
        assert_eq!(topic.value().unwrap(), "2.5");
    }

    #[test]
    fn subscribed_default_mode_resets_on_silence() {
        let mut topic = SubscribedTopic::new("cmd", InferMode::Default);
        assert_eq!(topic.value(), DEFAULT_DATA);

        topic.handle_published_data(Published::Present("fwd".into()));
        assert_eq!(topic.value(), "fwd");

        topic.handle_published_data(Published::Absent);
        assert_eq!(topic.value(), DEFAULT_DATA);
    }

    #[test]
    fn subscribed_last_mode_carries_forward() {
        let mut topic = SubscribedTopic::new("cmd", InferMode::Last);

        topic.handle_published_data(Published::Absent);
        assert_eq!(topic.value(), DEFAULT_DATA);

        topic.handle_published_data(Published::Present("left".into()));
        topic.handle_published_data(Published::Absent);
        assert_eq!(topic.value(), "left");

        topic.handle_published_data(Published::Present("right".into()));
        assert_eq!(topic.value(), "right");
    }

    #[test]
    fn topic_dispatch() {
        let constant = Topic::Value(ConstantValue::new("id", "robot1"));
        assert_eq!(constant.name(), "id");
        assert_eq!(constant.value().unwrap(), "robot1");

        let subscribed = Topic::Subscribed(SubscribedTopic::new("cmd", InferMode::Last));
        assert_eq!(subscribed.value().unwrap(), DEFAULT_DATA);
    }
}
