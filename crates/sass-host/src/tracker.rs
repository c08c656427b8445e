//! Correlates the compiler's outstanding requests with their responses.

use crate::{Error, Result};
use std::collections::{hash_map::Entry, HashMap};

/// The response kind an outstanding request expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResponseKind {
    Canonicalize,
    Import,
    FileImport,
    FunctionCall,
}

impl ResponseKind {
    fn as_str(&self) -> &'static str {
        match self {
            ResponseKind::Canonicalize => "CanonicalizeResponse",
            ResponseKind::Import => "ImportResponse",
            ResponseKind::FileImport => "FileImportResponse",
            ResponseKind::FunctionCall => "FunctionCallResponse",
        }
    }
}

/// Tracks each outstanding compiler request ID until its response is sent.
///
/// Request IDs are scoped to a single compilation and direction, so each
/// dispatcher owns its own tracker. A duplicate ID, an unknown ID, or a
/// response of the wrong kind is a protocol error.
#[derive(Debug, Default)]
pub(crate) struct RequestTracker {
    pending: HashMap<u32, ResponseKind>,
}

impl RequestTracker {
    pub fn add(&mut self, id: u32, kind: ResponseKind) -> Result<()> {
        match self.pending.entry(id) {
            Entry::Occupied(entry) => Err(Error::CompilerProtocol(format!(
                "request ID {id} is already in use by a pending {} request",
                entry.get().as_str()
            ))),
            Entry::Vacant(entry) => {
                entry.insert(kind);
                Ok(())
            }
        }
    }

    pub fn resolve(&mut self, id: u32, kind: ResponseKind) -> Result<()> {
        match self.pending.get(&id) {
            Some(expected) if *expected == kind => {
                self.pending.remove(&id);
                Ok(())
            }
            Some(expected) => Err(Error::CompilerProtocol(format!(
                "request ID {id} expects a {}, not a {}",
                expected.as_str(),
                kind.as_str()
            ))),
            None => Err(Error::CompilerProtocol(format!(
                "response ID {id} doesn't match any outstanding request"
            ))),
        }
    }

    /// The number of requests still awaiting a response.
    #[cfg(test)]
    pub fn outstanding(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod test {
    use super::{RequestTracker, ResponseKind};
    use crate::Error;

    #[test]
    fn test_add_and_resolve() {
        let mut tracker = RequestTracker::default();
        tracker.add(0, ResponseKind::Canonicalize).unwrap();
        tracker.add(1, ResponseKind::FunctionCall).unwrap();
        assert_eq!(tracker.outstanding(), 2);

        tracker.resolve(1, ResponseKind::FunctionCall).unwrap();
        tracker.resolve(0, ResponseKind::Canonicalize).unwrap();
        assert_eq!(tracker.outstanding(), 0);

        // The ID may be reused once resolved.
        tracker.add(0, ResponseKind::Import).unwrap();
        tracker.resolve(0, ResponseKind::Import).unwrap();
    }

    #[test]
    fn test_duplicate_id() {
        let mut tracker = RequestTracker::default();
        tracker.add(3, ResponseKind::Import).unwrap();
        let err = tracker.add(3, ResponseKind::Import).unwrap_err();
        assert!(
            matches!(&err, Error::CompilerProtocol(m) if m.contains("already in use")),
            "{err}"
        );
    }

    #[test]
    fn test_kind_mismatch_leaves_request_outstanding() {
        let mut tracker = RequestTracker::default();
        tracker.add(5, ResponseKind::FileImport).unwrap();
        let err = tracker
            .resolve(5, ResponseKind::Canonicalize)
            .unwrap_err();
        assert!(
            matches!(&err, Error::CompilerProtocol(m) if m.contains("expects a FileImportResponse")),
            "{err}"
        );
        assert_eq!(tracker.outstanding(), 1);
    }

    #[test]
    fn test_unknown_id() {
        let mut tracker = RequestTracker::default();
        let err = tracker.resolve(9, ResponseKind::Import).unwrap_err();
        assert!(
            matches!(&err, Error::CompilerProtocol(m) if m.contains("doesn't match any outstanding request")),
            "{err}"
        );
    }
}
