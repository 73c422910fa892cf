//! Reply returned by [`ProcessorProviders`](super::ProcessorProviders).

use serde::Serialize;

use crate::cache::Source;

/// Data served for one request and where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply<T> {
    /// The served data
    pub data: T,
    /// Memory, persistence or freshly loaded
    pub source: Source,
}

impl<T> Reply<T> {
    /// Creates a new Reply
    pub fn new(data: T, source: Source) -> Self {
        Self { data, source }
    }

    pub fn into_data(self) -> T {
        self.data
    }
}
