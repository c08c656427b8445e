//! Compilation options.

use crate::importers::{SassImporter, SyncSassImporter};
use crate::logger::Logger;
use crate::value::HostFunction;
use proto_sass::inbound_message::CompileRequest;
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

/// Syntax of a stylesheet source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Syntax {
    #[default]
    Scss,
    Indented,
    Css,
}

impl Syntax {
    pub(crate) fn to_proto(self) -> proto_sass::Syntax {
        match self {
            Syntax::Scss => proto_sass::Syntax::Scss,
            Syntax::Indented => proto_sass::Syntax::Indented,
            Syntax::Css => proto_sass::Syntax::Css,
        }
    }
}

/// The CSS output style. The enum is the validation: there is no
/// unrecognized style to reject at request time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputStyle {
    #[default]
    Expanded,
    Compressed,
}

impl OutputStyle {
    pub(crate) fn to_proto(self) -> proto_sass::OutputStyle {
        match self {
            OutputStyle::Expanded => proto_sass::OutputStyle::Expanded,
            OutputStyle::Compressed => proto_sass::OutputStyle::Compressed,
        }
    }
}

/// Options shared by `compile` and `compile_string`.
///
/// The importer parameter selects the host flavor: [`SassImporter`] with
/// future-returning callbacks for [`crate::Compiler`], or
/// [`SyncSassImporter`] for [`crate::SyncCompiler`].
pub struct Options<I = SassImporter> {
    pub style: OutputStyle,
    /// Request a source map in the result.
    pub source_map: bool,
    /// Embed the full source texts in the source map.
    pub source_map_include_sources: bool,
    /// Whether diagnostics use terminal colors; `None` detects whether
    /// stderr is a terminal.
    pub alert_color: Option<bool>,
    /// Restrict diagnostics to ASCII art.
    pub alert_ascii: bool,
    /// Silence warnings raised by stylesheets loaded through load paths.
    pub quiet_deps: bool,
    /// Emit every deprecation warning instead of collapsing repeats.
    pub verbose: bool,
    /// Emit a `@charset` declaration or BOM when the output isn't ASCII.
    pub charset: bool,
    /// Filesystem roots to resolve loads against, tried after `importers`.
    pub load_paths: Vec<PathBuf>,
    /// Importers to try in order for loads the compiler can't resolve.
    pub importers: Vec<I>,
    /// Custom functions available to the stylesheet.
    pub functions: Vec<HostFunction>,
    /// Receives warnings and debug messages. Without one, pre-formatted
    /// events go to standard error.
    pub logger: Option<Arc<dyn Logger>>,
    /// Deprecation IDs to treat as compilation failures.
    pub fatal_deprecations: Vec<String>,
    /// Deprecation IDs to silence.
    pub silence_deprecations: Vec<String>,
    /// Future deprecation IDs to opt into early.
    pub future_deprecations: Vec<String>,
}

pub type SyncOptions = Options<SyncSassImporter>;

impl<I> Default for Options<I> {
    fn default() -> Self {
        Self {
            style: OutputStyle::default(),
            source_map: false,
            source_map_include_sources: false,
            alert_color: None,
            alert_ascii: false,
            quiet_deps: false,
            verbose: false,
            charset: true,
            load_paths: Vec::new(),
            importers: Vec::new(),
            functions: Vec::new(),
            logger: None,
            fatal_deprecations: Vec::new(),
            silence_deprecations: Vec::new(),
            future_deprecations: Vec::new(),
        }
    }
}

impl<I> Options<I> {
    /// Fill a compile request's scalar fields from these options.
    pub(crate) fn apply(&self, request: &mut CompileRequest) {
        request.style = self.style.to_proto() as i32;
        request.source_map = self.source_map;
        request.source_map_include_sources = self.source_map_include_sources;
        request.alert_color = self
            .alert_color
            .unwrap_or_else(|| atty::is(atty::Stream::Stderr));
        request.alert_ascii = self.alert_ascii;
        request.quiet_deps = self.quiet_deps;
        request.verbose = self.verbose;
        request.charset = self.charset;
        request.silent = self.logger.as_ref().map_or(false, |logger| logger.silent());
        request.fatal_deprecation = self.fatal_deprecations.clone();
        request.silence_deprecation = self.silence_deprecations.clone();
        request.future_deprecation = self.future_deprecations.clone();
    }
}

/// Assemble a compile request from its input, options, and the wire
/// entries the registries produced. Shared by both host flavors.
pub(crate) fn build_request<I>(
    input: proto_sass::inbound_message::compile_request::Input,
    options: &Options<I>,
    importers: Vec<proto_sass::inbound_message::compile_request::Importer>,
    global_functions: Vec<String>,
) -> CompileRequest {
    let mut request = CompileRequest {
        input: Some(input),
        importers,
        global_functions,
        ..Default::default()
    };
    options.apply(&mut request);
    request
}

/// Options for compiling a source string instead of a file.
pub struct StringOptions<I = SassImporter> {
    pub options: Options<I>,
    pub syntax: Syntax,
    /// The canonical URL attributed to the source.
    pub url: Option<Url>,
    /// The importer that resolves loads relative to `url`.
    pub importer: Option<I>,
}

pub type SyncStringOptions = StringOptions<SyncSassImporter>;

impl<I> Default for StringOptions<I> {
    fn default() -> Self {
        Self {
            options: Options::default(),
            syntax: Syntax::default(),
            url: None,
            importer: None,
        }
    }
}

impl<I> From<Options<I>> for StringOptions<I> {
    fn from(options: Options<I>) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }
}
