// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::io;
use std::sync::atomic::{self, Ordering};
use std::sync::Arc;

use unwrap_infallible::UnwrapInfallible;

use crate::output::{
    config,
    writer::{self, WriterType},
};
use crate::spec;

/// Failure to record a run log entry.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum OutputError {
    #[error("failed to write to output stream")]
    IoError(#[from] io::Error),
}

/// Serializes run log records and hands them to the configured writer.
///
/// Sequence numbers start at 0 and are shared by every run and trial scope
/// created from the same emitter.
pub struct JsonEmitter {
    timestamp_provider: Box<dyn config::TimestampProvider + Send + Sync + 'static>,
    writer: writer::WriterType,
    seqno: Arc<atomic::AtomicU64>,
}

impl JsonEmitter {
    pub(crate) fn new(
        timestamp_provider: Box<dyn config::TimestampProvider + Send + Sync + 'static>,
        writer: writer::WriterType,
    ) -> Self {
        JsonEmitter {
            timestamp_provider,
            writer,
            seqno: Arc::new(atomic::AtomicU64::new(0)),
        }
    }

    fn incr_seqno(&self) -> u64 {
        self.seqno.fetch_add(1, Ordering::AcqRel)
    }

    fn serialize_artifact(&self, object: &spec::RootImpl) -> String {
        let root = spec::Root {
            artifact: object.clone(),
            timestamp: self.timestamp_provider.now(),
            seqno: self.incr_seqno(),
        };

        serde_json::json!(root).to_string()
    }

    pub async fn emit(&self, object: &spec::RootImpl) -> Result<(), OutputError> {
        let s = self.serialize_artifact(object);

        match &self.writer {
            WriterType::File(file) => file.write(&s).await?,
            WriterType::Stdout(stdout) => stdout.write(&s).await.unwrap_infallible(),
            WriterType::Buffer(buffer) => buffer.write(&s).await.unwrap_infallible(),

            WriterType::Custom(custom) => custom.write(&s).await?,
        }

        Ok(())
    }
}
