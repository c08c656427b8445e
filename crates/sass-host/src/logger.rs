//! Routing of compiler log events to user code.

use crate::span::Span;
use std::io::Write;

/// Receives warnings and debug messages raised during a compilation.
///
/// The default method bodies write the compiler's pre-formatted text to
/// the standard error sink, so implementors may override only the events
/// they care about.
pub trait Logger: Send + Sync {
    /// True to tell the compiler to suppress all output other than the
    /// compilation's own failure.
    fn silent(&self) -> bool {
        false
    }

    /// A `@warn` or deprecation warning.
    fn warn(&self, message: &str, details: &WarnDetails) {
        let _ = message;
        write_stderr(&details.formatted);
    }

    /// A `@debug` message.
    fn debug(&self, message: &str, details: &DebugDetails) {
        let _ = message;
        write_stderr(&details.formatted);
    }
}

/// The fallback used when no logger is configured: every default method
/// body applies, writing pre-formatted events to standard error.
pub(crate) struct DefaultLogger;

impl Logger for DefaultLogger {}

/// A logger that swallows every event and asks the compiler to stay quiet.
pub struct Silent;

impl Logger for Silent {
    fn silent(&self) -> bool {
        true
    }

    fn warn(&self, _message: &str, _details: &WarnDetails) {}

    fn debug(&self, _message: &str, _details: &DebugDetails) {}
}

#[derive(Debug, Clone)]
pub struct WarnDetails {
    /// True when the warning is a deprecation warning.
    pub deprecation: bool,
    /// For deprecation warnings, the deprecation's identifier.
    pub deprecation_type: Option<String>,
    pub span: Option<Span>,
    /// The stylesheet stack at the point the warning was raised.
    pub stack: Option<String>,
    /// The warning formatted for human display.
    pub formatted: String,
}

#[derive(Debug, Clone)]
pub struct DebugDetails {
    pub span: Option<Span>,
    /// The message formatted for human display.
    pub formatted: String,
}

fn write_stderr(formatted: &str) {
    let mut stderr = std::io::stderr();
    _ = stderr.write_all(formatted.as_bytes()); // Best-effort.
    if !formatted.ends_with('\n') {
        _ = stderr.write_all(b"\n");
    }
}
