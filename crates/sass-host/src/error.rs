use crate::span::Span;
use std::sync::Arc;
use url::Url;

/// Errors surfaced by the compiler host.
///
/// Variants are cloneable so a single failure (for example the child
/// exiting) can be fanned out to every in-flight compilation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The stylesheet failed to compile. This is the compiler doing its
    /// job, not a fault in the host or the protocol.
    #[error(transparent)]
    Compile(Box<CompileError>),
    /// The compiler violated the embedded protocol: a packet that doesn't
    /// decode, a mandatory field left unset, a duplicate or unknown
    /// request ID, or a message for a completed compilation.
    #[error("Compiler caused error: {0}")]
    CompilerProtocol(String),
    /// The compiler sent a ProtocolError message, reporting that this host
    /// violated the protocol.
    #[error("Compiler reported error: {0}")]
    CompilerReported(String),
    /// An option was rejected before any request was written.
    #[error("invalid option: {0}")]
    InvalidOption(String),
    /// The compiler process exited before the compilation completed.
    #[error("the compiler process exited unexpectedly")]
    ChildExited,
    /// The host was disposed and refuses new work.
    #[error("the compiler host has been disposed")]
    HostDisposed,
    /// This platform has no released compiler binary.
    #[error("no embedded compiler is available for {0}")]
    UnsupportedPlatform(String),
    /// An I/O failure on the compiler's stdio. Arc-wrapped so the error
    /// stays cloneable for fan-out.
    #[error("compiler i/o failed: {0}")]
    Io(Arc<std::io::Error>),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(Arc::new(err))
    }
}

impl From<CompileError> for Error {
    fn from(err: CompileError) -> Self {
        Error::Compile(Box::new(err))
    }
}

/// A compilation failure reported by the compiler, with its structured
/// diagnostics.
#[derive(Debug, Clone)]
pub struct CompileError {
    /// The failure message, without the formatted span context.
    pub sass_message: String,
    /// The stylesheet stack at the point of failure.
    pub sass_stack: String,
    /// The span of source the failure points at.
    pub span: Option<Span>,
    /// Canonical URLs of everything loaded before the failure.
    pub loaded_urls: Vec<Url>,
    formatted: String,
}

impl CompileError {
    pub(crate) fn new(
        failure: proto_sass::outbound_message::compile_response::CompileFailure,
        loaded_urls: Vec<Url>,
    ) -> Self {
        Self {
            sass_message: failure.message,
            sass_stack: failure.stack_trace,
            span: failure.span.map(Span::from),
            loaded_urls,
            formatted: failure.formatted,
        }
    }
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The formatted message includes the span and stack. Compilers may
        // omit it, in which case we fall back to an `Error:` prefix the way
        // formatted messages begin.
        if self.formatted.is_empty() {
            write!(f, "Error: {}", self.sass_message)
        } else {
            f.write_str(&self.formatted)
        }
    }
}

impl std::error::Error for CompileError {}
