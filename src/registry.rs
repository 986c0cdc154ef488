//! Explicit format registry for multi-format auto-detection.
//!
//! The registry is a plain value: construct it once at startup and pass it
//! by reference to whatever needs it. There is no process-wide mutable
//! state. Detection probes candidates in registration order and the first
//! fourcc/revision match wins, so adding formats never reorders existing
//! tie-breaks.

use log::trace;
use once_cell::sync::Lazy;

use crate::io::{read_common_header, Error, Result, SUPPORTED_REVISION};
use crate::span::ByteSpan;

/// Descriptor of one container format a reader understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormatDesc {
    pub fourcc: [u8; 4],
    pub name: &'static str,
    pub min_revision: u32,
    pub max_revision: u32,
}

impl FormatDesc {
    pub fn matches(&self, fourcc: [u8; 4], revision: u32) -> bool {
        self.fourcc == fourcc && (self.min_revision..=self.max_revision).contains(&revision)
    }
}

/// Formats this crate ships descriptors for.
static BUILTIN_FORMATS: Lazy<Vec<FormatDesc>> = Lazy::new(|| {
    vec![
        FormatDesc {
            fourcc: *b"SCNE",
            name: "scene archive",
            min_revision: SUPPORTED_REVISION,
            max_revision: SUPPORTED_REVISION,
        },
        FormatDesc {
            fourcc: *b"RLIB",
            name: "resource library",
            min_revision: SUPPORTED_REVISION,
            max_revision: SUPPORTED_REVISION,
        },
    ]
});

/// Ordered set of known formats.
#[derive(Clone, Debug, Default)]
pub struct FormatRegistry {
    formats: Vec<FormatDesc>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the built-in descriptors.
    pub fn with_builtin() -> Self {
        Self {
            formats: BUILTIN_FORMATS.clone(),
        }
    }

    pub fn register(&mut self, desc: FormatDesc) {
        self.formats.push(desc);
    }

    pub fn formats(&self) -> &[FormatDesc] {
        &self.formats
    }

    /// Identifies the format of `buffer`.
    ///
    /// A buffer too short for a header is simply "no match"; each candidate
    /// is probed in registration order and the first whose fourcc and
    /// revision range accept the header wins.
    pub fn detect(&self, buffer: &[u8]) -> Result<&FormatDesc> {
        let span = ByteSpan::new(buffer);
        let Some(header) = read_common_header(span) else {
            return Err(Error::UnknownFormat);
        };
        if !header.size_is_valid(buffer.len()) {
            return Err(Error::UnknownFormat);
        }

        for desc in &self.formats {
            if desc.matches(header.fourcc, header.revision) {
                trace!("detected {} (fourcc {:?})", desc.name, desc.fourcc);
                return Ok(desc);
            }
        }
        Err(Error::UnknownFormat)
    }
}
