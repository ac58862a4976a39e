//! Signal source registry
//!
//! Every input registers itself here and receives a handle. Signals carry
//! the handle of the input they were read from so that conflicts can be
//! attributed to a source by name.

use crate::types::{MergeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a registered signal source
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceHandle(u32);

impl SourceHandle {
    /// Reserved handle meaning "no source"
    pub const BAD_HANDLE: SourceHandle = SourceHandle(u32::MAX);

    /// True unless this is [`SourceHandle::BAD_HANDLE`]
    pub fn is_valid(&self) -> bool {
        *self != Self::BAD_HANDLE
    }
}

impl Default for SourceHandle {
    fn default() -> Self {
        Self::BAD_HANDLE
    }
}

impl fmt::Display for SourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "#{}", self.0)
        } else {
            f.write_str("#none")
        }
    }
}

/// Registry of source display names, indexed by handle.
///
/// Handles are issued in registration order. Display names are only
/// descriptive: registering the same name twice yields two handles.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    names: Vec<String>,
}

impl SourceRegistry {
    /// Name reported for [`SourceHandle::BAD_HANDLE`]
    pub const NO_SOURCE_NAME: &'static str = "none";

    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source and return its new handle
    pub fn register(&mut self, name: impl Into<String>) -> SourceHandle {
        let name = name.into();
        let handle = SourceHandle(self.names.len() as u32);
        log::trace!("Registered source {} as {}", name, handle);
        self.names.push(name);
        handle
    }

    /// Look up the display name of a source
    pub fn source_name(&self, handle: SourceHandle) -> Result<&str> {
        if !handle.is_valid() {
            return Ok(Self::NO_SOURCE_NAME);
        }

        self.names
            .get(handle.0 as usize)
            .map(String::as_str)
            .ok_or(MergeError::UnknownHandle(handle))
    }

    /// Number of registered sources
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True if nothing has been registered yet
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
