//! Host bridge for an out-of-process stylesheet compiler.
//!
//! The compiler ships as a separate binary and speaks a length-prefixed,
//! varint-tagged protobuf protocol over its stdin and stdout. This crate
//! launches it, multiplexes any number of concurrent compilations over the
//! shared pipes, dispatches its importer and custom-function callbacks
//! back into user code, and surfaces results as [`CompileResult`]s.
//!
//! Two hosts share the protocol runtime:
//!
//! - [`Compiler`] (from [`init_compiler`]): async. Callbacks may return
//!   futures, and compilations run concurrently on one child process.
//! - [`SyncCompiler`] (from [`init_sync_compiler`]): strictly
//!   synchronous. Callbacks return values, one compilation at a time.
//!
//! ```no_run
//! # async fn demo() -> sass_host::Result<()> {
//! let compiler = sass_host::init_compiler().await?;
//! let result = compiler
//!     .compile_string("a {b: 1 + 2}", &Default::default())
//!     .await?;
//! assert_eq!(result.css, "a {\n  b: 3;\n}");
//! compiler.dispose().await?;
//! # Ok(())
//! # }
//! ```

mod child;
mod codec;
mod compiler_path;
mod dispatcher;
mod error;
mod framer;
mod functions;
mod host;
mod importers;
mod logger;
mod options;
mod span;
mod sync;
mod tracker;

pub mod value;

pub use error::{CompileError, Error, Result};
pub use host::{init_compiler, CompileResult, Compiler, Version};
pub use importers::{
    CanonicalizeContext, FileImporter, Importer, ImporterResult, SassImporter, SyncFileImporter,
    SyncImporter, SyncSassImporter,
};
pub use logger::{DebugDetails, Logger, Silent, WarnDetails};
pub use options::{
    Options, OutputStyle, StringOptions, SyncOptions, SyncStringOptions, Syntax,
};
pub use span::{Location, Span};
pub use sync::{init_sync_compiler, SyncCompiler};
