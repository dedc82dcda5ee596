//! # topic_log
//!
//! A telemetry recorder for control loops. Applications register named
//! topics, then once per cycle the recorder collects every topic's value and
//! appends one comma-separated line to a file, optionally gzip-compressed.
//!
//! ## Crate Structure
//!
//! - **`recorder`**: the `Recorder` coordinator. Owns the topic registry, enforces the
//!   registering → logging phase order and drives each cycle.
//! - **`topic`**: the three topic kinds (queried, subscribed, constant value) and the
//!   `InferMode` applied to silent subscribed topics.
//! - **`published`**: the per-cycle buffer of values pushed to subscribed topics.
//! - **`writer`**: field escaping, line assembly and the buffered, optionally compressed
//!   output stream, plus the `IoErrorPolicy` for failed writes.
//! - **`format`**: the replaceable number-to-text conversion.
//! - **`naming`**: the lenient name-character check.
//! - **`config`**: figment-based configuration loading and validation.
//! - **`logging`**: `tracing-subscriber` initialisation.
//! - **`error`**: the `LogError` enum.
//!
//! ## Cycle
//!
//! ```no_run
//! use topic_log::{InferMode, Recorder};
//!
//! # fn main() -> Result<(), topic_log::LogError> {
//! let mut recorder = Recorder::initialize("run.csv", false)?;
//! recorder.register_queried_numeric("battery", || 12.6)?;
//! recorder.register_subscribed_topic("state", InferMode::Last)?;
//! recorder.finish_initialization()?;
//!
//! for _ in 0..3 {
//!     recorder.publish_string("state", "driving")?;
//!     recorder.update_topics()?;
//!     recorder.log()?;
//! }
//! recorder.close()
//! # }
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod naming;
pub mod published;
pub mod recorder;
pub mod topic;
pub mod writer;

pub use error::{LogError, LogResult};
pub use format::NumberFormat;
pub use naming::NameCheck;
pub use published::Published;
pub use recorder::{Phase, Recorder, RecorderOptions};
pub use topic::{InferMode, DEFAULT_DATA};
pub use writer::{IoErrorPolicy, LineOutcome};
