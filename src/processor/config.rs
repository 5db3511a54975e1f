//! Processor configuration
//!
//! A [`ProcessorConfig`] can be built in code with the `with_*` setters or
//! loaded from TOML. Keys may sit at the top level or under a `[processor]`
//! table:
//!
//! ```toml
//! [processor]
//! name = "thumbnails"
//! thread_count = 4
//! queue_capacity = 1000   # omit, or -1, for an unbounded queue
//! store_kind = "linked"
//! is_background = false
//! priority = "below_normal"
//! ```

use crate::queue::{QueueError, QueueResult, StoreKind};
use crate::worker::ThreadPriority;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

const DEFAULT_NAME: &str = "queue-processor";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessorConfig {
    /// Used in logs and as the worker thread name prefix
    pub name: String,
    pub thread_count: usize,
    /// `None` means unbounded
    #[serde(
        deserialize_with = "deserialize_capacity",
        skip_serializing_if = "Option::is_none"
    )]
    pub queue_capacity: Option<usize>,
    pub store_kind: StoreKind,
    /// Background processors do not wait for their workers when dropped
    pub is_background: bool,
    pub priority: ThreadPriority,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            thread_count: default_thread_count(),
            queue_capacity: None,
            store_kind: StoreKind::default(),
            is_background: true,
            priority: ThreadPriority::default(),
        }
    }
}

impl ProcessorConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_thread_count(mut self, thread_count: usize) -> Self {
        self.thread_count = thread_count;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    pub fn unbounded(mut self) -> Self {
        self.queue_capacity = None;
        self
    }

    pub fn with_store_kind(mut self, store_kind: StoreKind) -> Self {
        self.store_kind = store_kind;
        self
    }

    pub fn with_background(mut self, is_background: bool) -> Self {
        self.is_background = is_background;
        self
    }

    pub fn with_priority(mut self, priority: ThreadPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Check the values a processor cannot run with
    pub fn validate(&self) -> QueueResult<()> {
        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if self.thread_count == 0 {
            return Err(invalid("thread_count must be greater than 0"));
        }
        if self.queue_capacity == Some(0) {
            return Err(invalid("queue_capacity must be greater than 0"));
        }
        Ok(())
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> QueueResult<Self> {
        let mut table = toml::from_str::<toml::Table>(contents)
            .map_err(|e| invalid(&format!("malformed TOML: {}", e)))?;

        // Keys under [processor] take the place of the top level
        let table = match table.remove("processor") {
            Some(toml::Value::Table(section)) => {
                if !table.is_empty() {
                    log::debug!(
                        "Ignoring {} top-level keys outside [processor]",
                        table.len()
                    );
                }
                section
            }
            Some(_) => return Err(invalid("'processor' must be a table")),
            None => table,
        };

        let config: ProcessorConfig = toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| invalid(&e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> QueueResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| invalid(&format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
            .map_err(|e| match e {
                QueueError::InvalidConfig { message } => QueueError::InvalidConfig {
                    message: format!("{}: {}", path.display(), message),
                },
                other => other,
            })
    }

    pub fn to_toml_string(&self) -> QueueResult<String> {
        toml::to_string(self).map_err(|e| QueueError::OperationFailed {
            message: format!("serialising configuration: {}", e),
        })
    }
}

fn invalid(message: &str) -> QueueError {
    QueueError::InvalidConfig {
        message: message.to_string(),
    }
}

fn default_thread_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Negative values mean unbounded
fn deserialize_capacity<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<i64>::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(value) if value < 0 => Ok(None),
        Some(value) => usize::try_from(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
