// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::output::writer::{self, BufferWriter, FileWriter, StdoutWriter, WriterType};

/// Source of the timestamps stamped on every run log record.
pub trait TimestampProvider {
    fn now(&self) -> chrono::DateTime<chrono_tz::Tz>;
}

struct UtcTimestampProvider;

impl TimestampProvider for UtcTimestampProvider {
    fn now(&self) -> chrono::DateTime<chrono_tz::Tz> {
        chrono::Utc::now().with_timezone(&chrono_tz::UTC)
    }
}

/// The configuration repository for the run log.
pub struct Config {
    pub(crate) timestamp_provider: Box<dyn TimestampProvider + Send + Sync + 'static>,
    pub(crate) writer: WriterType,
}

impl Config {
    /// Creates a new [`ConfigBuilder`]
    ///
    /// # Examples
    /// ```rust
    /// # use acm_dfu_test::output::*;
    ///
    /// let builder = Config::builder();
    /// ```
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// The builder for the [`Config`] object.
pub struct ConfigBuilder {
    timestamp_provider: Option<Box<dyn TimestampProvider + Send + Sync + 'static>>,
    writer: Option<WriterType>,
}

impl ConfigBuilder {
    fn new() -> Self {
        Self {
            timestamp_provider: None,
            writer: None,
        }
    }

    /// Overrides the clock; mostly useful for deterministic output in tests.
    pub fn with_timestamp_provider(
        mut self,
        timestamp_provider: Box<dyn TimestampProvider + Send + Sync + 'static>,
    ) -> Self {
        self.timestamp_provider = Some(timestamp_provider);
        self
    }

    pub fn with_buffer_output(mut self, buffer: Arc<Mutex<Vec<String>>>) -> Self {
        self.writer = Some(WriterType::Buffer(BufferWriter::new(buffer)));
        self
    }

    /// Appends records to `path`, creating it if needed. Earlier runs are kept.
    pub async fn with_file_output<P: AsRef<Path>>(
        mut self,
        path: P,
    ) -> Result<Self, std::io::Error> {
        self.writer = Some(WriterType::File(FileWriter::new(path).await?));
        Ok(self)
    }

    pub fn with_custom_output(
        mut self,
        custom: Box<dyn writer::Writer + Send + Sync + 'static>,
    ) -> Self {
        self.writer = Some(WriterType::Custom(custom));
        self
    }

    pub fn build(self) -> Config {
        Config {
            timestamp_provider: self
                .timestamp_provider
                .unwrap_or_else(|| Box::new(UtcTimestampProvider)),
            writer: self
                .writer
                .unwrap_or_else(|| WriterType::Stdout(StdoutWriter::new())),
        }
    }
}
