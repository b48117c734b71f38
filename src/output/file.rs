// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::path::Path;

use crate::output as tv;
use crate::spec;

/// A file produced during a trial, referenced by URI.
///
/// # Examples
///
/// ```
/// # use std::path::Path;
/// # use acm_dfu_test::output::*;
/// if let Some(builder) = File::builder_from_path(Path::new("/var/tmp/acm/sn_ure_abc.dfu")) {
///     let file = builder
///         .description("firmware package")
///         .content_type(mime::APPLICATION_OCTET_STREAM)
///         .build();
/// }
/// ```
pub struct File {
    name: String,
    uri: tv::Uri,
    is_snapshot: bool,
    description: Option<String>,
    content_type: Option<mime::Mime>,
}

impl File {
    /// Builder for a local path. The path is made absolute against the
    /// current directory; `None` when it can't be expressed as a `file://` URI.
    pub fn builder_from_path(path: &Path) -> Option<FileBuilder> {
        let absolute = std::path::absolute(path).ok()?;
        let uri = tv::Uri::from_file_path(&absolute).ok()?;
        let name = absolute.file_name()?.to_string_lossy().into_owned();

        Some(FileBuilder::new(&name, uri))
    }

    pub fn to_artifact(&self) -> spec::File {
        spec::File {
            name: self.name.clone(),
            uri: self.uri.as_str().to_owned(),
            is_snapshot: self.is_snapshot,
            description: self.description.clone(),
            content_type: self.content_type.as_ref().map(|ct| ct.to_string()),
        }
    }
}

pub struct FileBuilder {
    name: String,
    uri: tv::Uri,
    is_snapshot: bool,
    description: Option<String>,
    content_type: Option<mime::Mime>,
}

impl FileBuilder {
    fn new(name: &str, uri: tv::Uri) -> Self {
        FileBuilder {
            name: name.to_string(),
            uri,
            is_snapshot: false,
            description: None,
            content_type: None,
        }
    }

    pub fn is_snapshot(mut self, value: bool) -> FileBuilder {
        self.is_snapshot = value;
        self
    }

    pub fn description(mut self, description: &str) -> FileBuilder {
        self.description = Some(description.to_owned());
        self
    }

    pub fn content_type(mut self, content_type: mime::Mime) -> FileBuilder {
        self.content_type = Some(content_type);
        self
    }

    pub fn build(self) -> File {
        File {
            name: self.name,
            uri: self.uri,
            is_snapshot: self.is_snapshot,
            description: self.description,
            content_type: self.content_type,
        }
    }
}
