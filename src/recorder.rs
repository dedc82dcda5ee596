//! Topic registry and lifecycle coordinator.
//!
//! A [`Recorder`] moves through two phases, one way only:
//!
//! 1. **Registering**: topics, constant values and metadata values are declared.
//! 2. **Logging**: entered by [`Recorder::finish_initialization`], which freezes
//!    the column set and writes the header. Each cycle the application publishes
//!    values, calls [`Recorder::update_topics`] and then [`Recorder::log`].
//!
//! Calls made in the wrong phase fail with `LogError::InvalidPhase` and leave
//! the recorder untouched.
//!
//! # Example
//!
//! ```no_run
//! use topic_log::{InferMode, Recorder, RecorderOptions};
//!
//! # fn main() -> Result<(), topic_log::LogError> {
//! let mut recorder = Recorder::open("drive.csv", RecorderOptions::default())?;
//! recorder.register_queried_topic("temp", || "98.6".to_string())?;
//! recorder.register_subscribed_topic("cmd", InferMode::Default)?;
//! recorder.register_constant_value("id", "robot1")?;
//! recorder.finish_initialization()?; // temp,cmd,id
//!
//! recorder.update_topics()?;
//! recorder.log()?; // 98.6,-1.0,robot1
//!
//! recorder.publish_string("cmd", "fwd")?;
//! recorder.update_topics()?;
//! recorder.log()?; // 98.6,fwd,robot1
//! # Ok(())
//! # }
//! ```

use crate::config::RecorderConfig;
use crate::error::{LogError, LogResult};
use crate::format::NumberFormat;
use crate::naming::{check_name, NameCheck};
use crate::published::PublishedData;
use crate::topic::{ConstantValue, InferMode, Producer, QueriedTopic, SubscribedTopic, Topic};
use crate::writer::{join_fields, output_path, IoErrorPolicy, LineOutcome, RecordWriter};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// Set once a recorder has been created through `Recorder::initialize*`.
static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Lifecycle phase of a [`Recorder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Topics and values may be registered; nothing is logged yet.
    Registering,
    /// The column set is frozen and records are written.
    Logging,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Registering => write!(f, "registering"),
            Phase::Logging => write!(f, "logging"),
        }
    }
}

/// Settings applied when a recorder is created.
#[derive(Debug, Clone)]
pub struct RecorderOptions {
    /// Write `<path>.gz` through a gzip encoder.
    pub compressed: bool,
    /// Gzip level, 0-9.
    pub compression_level: u32,
    /// Whether I/O failures are reported or returned.
    pub io_error_policy: IoErrorPolicy,
    /// Conversion used by `publish_numeric` and numeric producers.
    pub number_format: NumberFormat,
}

impl Default for RecorderOptions {
    fn default() -> Self {
        Self {
            compressed: false,
            compression_level: 6,
            io_error_policy: IoErrorPolicy::default(),
            number_format: NumberFormat::default(),
        }
    }
}

impl RecorderOptions {
    /// Gzip the output.
    pub fn with_compression(mut self, compressed: bool) -> Self {
        self.compressed = compressed;
        self
    }

    /// Sets the gzip level, 0-9.
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level;
        self
    }

    /// Sets how I/O failures are surfaced.
    pub fn with_io_error_policy(mut self, policy: IoErrorPolicy) -> Self {
        self.io_error_policy = policy;
        self
    }

    /// Sets the initial number format.
    pub fn with_number_format(mut self, number_format: NumberFormat) -> Self {
        self.number_format = number_format;
        self
    }
}

/// Owns the topics of one log and the stream they are written to.
#[derive(Debug)]
pub struct Recorder {
    phase: Phase,
    /// Every registered name, in registration order.
    namespace: Vec<String>,
    /// Record columns, in registration order.
    topics: Vec<Topic>,
    metadata: Vec<ConstantValue>,
    published: PublishedData,
    writer: RecordWriter,
    io_error_policy: IoErrorPolicy,
    number_format: NumberFormat,
    header: Option<String>,
    records_written: u64,
}

impl Recorder {
    /// Creates the process-wide recorder writing to `path`.
    ///
    /// # Errors
    ///
    /// Returns `LogError::AlreadyInitialized` if a recorder was already
    /// initialized in this process.
    pub fn initialize(path: impl AsRef<Path>, compressed: bool) -> LogResult<Self> {
        Self::initialize_with(path, RecorderOptions::default().with_compression(compressed))
    }

    /// Like [`initialize`](Self::initialize) with explicit options.
    pub fn initialize_with(path: impl AsRef<Path>, options: RecorderOptions) -> LogResult<Self> {
        INITIALIZED
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| LogError::AlreadyInitialized)?;

        Self::open(path, options).inspect_err(|_| {
            // No recorder exists, release the claim.
            INITIALIZED.store(false, Ordering::SeqCst);
        })
    }

    /// Validates `config` and initializes the process-wide recorder from it.
    pub fn from_config(config: &RecorderConfig) -> LogResult<Self> {
        config.validate()?;
        Self::initialize_with(&config.output.path, config.to_options())
    }

    /// Creates a recorder writing to `path` without claiming the process-wide slot.
    ///
    /// Under `IoErrorPolicy::Report` a file that cannot be created is logged and
    /// the recorder runs disconnected: every line is reported as dropped.
    pub fn open(path: impl AsRef<Path>, options: RecorderOptions) -> LogResult<Self> {
        let path = path.as_ref();
        let writer = match RecordWriter::create(path, options.compressed, options.compression_level)
        {
            Ok(writer) => writer,
            Err(err) if options.io_error_policy == IoErrorPolicy::Report => {
                let target = output_path(path, options.compressed);
                tracing::error!(
                    path = %target.display(),
                    error = %err,
                    "Failed to open record output, records will be dropped"
                );
                RecordWriter::disconnected(Some(target))
            }
            Err(err) => return Err(LogError::Io(err)),
        };
        Ok(Self::with_writer(writer, options))
    }

    /// Creates a recorder over an existing writer.
    pub fn with_writer(writer: RecordWriter, options: RecorderOptions) -> Self {
        Self {
            phase: Phase::Registering,
            namespace: Vec::new(),
            topics: Vec::new(),
            metadata: Vec::new(),
            published: PublishedData::new(),
            writer,
            io_error_policy: options.io_error_policy,
            number_format: options.number_format,
            header: None,
            records_written: 0,
        }
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Adds a column whose value is produced by `producer` on every update.
    pub fn register_queried_topic<F>(&mut self, name: &str, producer: F) -> LogResult<NameCheck>
    where
        F: FnMut() -> String + Send + 'static,
    {
        let check = self.admit_name("register_queried_topic", name)?;
        self.add_topic(Topic::Queried(QueriedTopic::new(
            name,
            Producer::Text(Box::new(producer)),
        )));
        Ok(check)
    }

    /// Adds a column whose numeric value is formatted with the number format in
    /// effect at each update.
    pub fn register_queried_numeric<F>(&mut self, name: &str, producer: F) -> LogResult<NameCheck>
    where
        F: FnMut() -> f64 + Send + 'static,
    {
        let check = self.admit_name("register_queried_numeric", name)?;
        self.add_topic(Topic::Queried(QueriedTopic::new(
            name,
            Producer::Numeric(Box::new(producer)),
        )));
        Ok(check)
    }

    /// Adds a column fed by `publish_string` / `publish_numeric`.
    pub fn register_subscribed_topic(&mut self, name: &str, mode: InferMode) -> LogResult<NameCheck> {
        let check = self.admit_name("register_subscribed_topic", name)?;
        self.published.insert_absent(name);
        self.add_topic(Topic::Subscribed(SubscribedTopic::new(name, mode)));
        Ok(check)
    }

    /// Adds a column that repeats `value` in every record.
    pub fn register_constant_value(
        &mut self,
        name: &str,
        value: impl Into<String>,
    ) -> LogResult<NameCheck> {
        let check = self.admit_name("register_constant_value", name)?;
        self.add_topic(Topic::Value(ConstantValue::new(name, value)));
        Ok(check)
    }

    /// Reserves `name` for a value that is kept with the recorder but never
    /// written as a column.
    pub fn register_metadata_value(
        &mut self,
        name: &str,
        value: impl Into<String>,
    ) -> LogResult<NameCheck> {
        let check = self.admit_name("register_metadata_value", name)?;
        self.namespace.push(name.to_string());
        self.metadata.push(ConstantValue::new(name, value));
        Ok(check)
    }

    /// Checks phase and uniqueness before anything is mutated.
    fn admit_name(&self, operation: &'static str, name: &str) -> LogResult<NameCheck> {
        self.require_phase(Phase::Registering, operation)?;
        if name.is_empty() {
            return Err(LogError::EmptyName);
        }
        if self.is_in_namespace(name) {
            return Err(LogError::DuplicateName(name.to_string()));
        }

        let check = check_name(name);
        if let NameCheck::InvalidCharacter {
            character,
            position,
        } = check
        {
            tracing::warn!(name, %character, position, "Invalid character in name");
        }
        Ok(check)
    }

    fn add_topic(&mut self, topic: Topic) {
        tracing::debug!(name = topic.name(), column = self.topics.len(), "Topic registered");
        self.namespace.push(topic.name().to_string());
        self.topics.push(topic);
    }

    fn is_in_namespace(&self, name: &str) -> bool {
        self.namespace.iter().any(|existing| existing == name)
    }

    fn require_phase(&self, expected: Phase, operation: &'static str) -> LogResult<()> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(LogError::InvalidPhase {
                operation,
                phase: self.phase,
            })
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Writes the header, freezes the column set and enters the logging phase.
    ///
    /// # Errors
    ///
    /// Under `IoErrorPolicy::Fail` a failed header write returns `LogError::Io`
    /// and the recorder stays in the registering phase, so the call can be
    /// repeated once the output recovers. Data lines are never written to a
    /// log whose header is missing.
    pub fn finish_initialization(&mut self) -> LogResult<LineOutcome> {
        self.require_phase(Phase::Registering, "finish_initialization")?;

        let header = join_fields(self.topics.iter().map(Topic::name));
        let outcome = self
            .io_error_policy
            .handle(self.writer.write_line(&header))?;

        self.phase = Phase::Logging;
        self.header = Some(header);
        tracing::info!(
            columns = self.topics.len(),
            names = self.namespace.len(),
            "Registration finished, logging started"
        );
        Ok(outcome)
    }

    /// Publishes text to a subscribed topic for the current cycle.
    ///
    /// A later publish to the same topic within the cycle replaces this one.
    pub fn publish_string(&mut self, name: &str, value: impl Into<String>) -> LogResult<()> {
        self.require_phase(Phase::Logging, "publish_string")?;
        self.published.publish(name, value.into())
    }

    /// Publishes a number, converted with the current number format.
    pub fn publish_numeric(&mut self, name: &str, value: f64) -> LogResult<()> {
        self.require_phase(Phase::Logging, "publish_numeric")?;
        let text = self.number_format.format(value);
        self.published.publish(name, text)
    }

    /// Brings every topic up to date for the current cycle.
    ///
    /// Queried topics are refreshed first, then subscribed topics resolve what
    /// was published, then the published-data buffer is cleared. Must run once
    /// per cycle before [`log`](Self::log).
    pub fn update_topics(&mut self) -> LogResult<()> {
        self.require_phase(Phase::Logging, "update_topics")?;

        for topic in &mut self.topics {
            if let Topic::Queried(queried) = topic {
                queried.refresh_value(&self.number_format);
            }
        }

        for topic in &mut self.topics {
            if let Topic::Subscribed(subscribed) = topic {
                let data = self.published.get(subscribed.name());
                subscribed.handle_published_data(data);
            }
        }

        self.published.reset();
        Ok(())
    }

    /// Writes one record holding the current value of every topic.
    ///
    /// # Errors
    ///
    /// Returns `LogError::UninitializedValue` without writing anything if a
    /// queried topic has never been refreshed.
    pub fn log(&mut self) -> LogResult<LineOutcome> {
        self.require_phase(Phase::Logging, "log")?;

        let values = self
            .topics
            .iter()
            .map(Topic::value)
            .collect::<LogResult<Vec<_>>>()?;
        let line = join_fields(values);

        let outcome = self.io_error_policy.handle(self.writer.write_line(&line))?;
        if outcome.is_written() {
            self.records_written += 1;
            tracing::debug!(record = self.records_written, "Record written");
        }
        Ok(outcome)
    }

    /// Flushes and closes the output.
    pub fn close(self) -> LogResult<()> {
        tracing::info!(records = self.records_written, "Closing recorder");
        self.writer.close()?;
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The header line, once registration has finished.
    pub fn header(&self) -> Option<&str> {
        self.header.as_deref()
    }

    /// Column names in record order.
    pub fn topic_names(&self) -> Vec<&str> {
        self.topics.iter().map(Topic::name).collect()
    }

    /// Number of names registered, columns and metadata alike.
    pub fn namespace_len(&self) -> usize {
        self.namespace.len()
    }

    /// Values registered with `register_metadata_value`, in registration order.
    pub fn metadata(&self) -> &[ConstantValue] {
        &self.metadata
    }

    /// Current value of the topic `name`, if it exists and has a value.
    pub fn current_value(&self, name: &str) -> Option<&str> {
        self.topics
            .iter()
            .find(|topic| topic.name() == name)
            .and_then(|topic| topic.value().ok())
    }

    /// Data records written successfully, header excluded.
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// The file being written, if file-backed.
    pub fn output_path(&self) -> Option<&Path> {
        self.writer.path()
    }

    /// How I/O failures are surfaced.
    pub fn io_error_policy(&self) -> IoErrorPolicy {
        self.io_error_policy
    }

    /// The number format applied to later conversions.
    pub fn number_format(&self) -> &NumberFormat {
        &self.number_format
    }

    /// Replaces the number format for all later conversions.
    pub fn set_number_format(&mut self, number_format: NumberFormat) {
        self.number_format = number_format;
    }
}
