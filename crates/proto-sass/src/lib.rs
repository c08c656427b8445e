//! Message types for the embedded compiler protocol.
//!
//! The embedded compiler is driven over its stdin and stdout with
//! length-prefixed packets. Each packet payload is a varint compilation ID
//! followed by the protobuf encoding of an [`InboundMessage`] (host to
//! compiler) or [`OutboundMessage`] (compiler to host). These types are
//! maintained by hand, in lockstep with the compiler's published schema.

mod value;

pub use value::{
    calculation_value, value_inner, Calculation, CalculationOperation, CalculationOperator,
    CalculationValue, Color, List, ListSeparator, Map, MapEntry, SingletonValue, Value,
};

/// The wrapper type for all messages sent from the host to the compiler.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InboundMessage {
    #[prost(oneof = "inbound_message::Message", tags = "2, 3, 4, 5, 6, 7")]
    pub message: Option<inbound_message::Message>,
}

pub mod inbound_message {
    /// A request for the compiler's version metadata.
    #[derive(Clone, Copy, PartialEq, ::prost::Message)]
    pub struct VersionRequest {
        #[prost(uint32, tag = "1")]
        pub id: u32,
    }

    /// A request to compile a single stylesheet to CSS.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct CompileRequest {
        #[prost(oneof = "compile_request::Input", tags = "2, 3")]
        pub input: Option<compile_request::Input>,
        #[prost(enumeration = "super::OutputStyle", tag = "4")]
        pub style: i32,
        /// Whether to generate a source map for this compilation.
        #[prost(bool, tag = "5")]
        pub source_map: bool,
        /// Importers to try, in order, for loads that aren't otherwise
        /// resolvable. Load paths are appended here as path importers.
        #[prost(message, repeated, tag = "6")]
        pub importers: Vec<compile_request::Importer>,
        /// Signatures of custom functions the stylesheet may call back into
        /// the host for.
        #[prost(string, repeated, tag = "7")]
        pub global_functions: Vec<String>,
        #[prost(bool, tag = "8")]
        pub alert_color: bool,
        #[prost(bool, tag = "9")]
        pub alert_ascii: bool,
        #[prost(bool, tag = "10")]
        pub verbose: bool,
        #[prost(bool, tag = "11")]
        pub quiet_deps: bool,
        #[prost(bool, tag = "12")]
        pub source_map_include_sources: bool,
        #[prost(bool, tag = "13")]
        pub charset: bool,
        /// Suppress all log events other than the compilation's own failure.
        #[prost(bool, tag = "14")]
        pub silent: bool,
        #[prost(string, repeated, tag = "15")]
        pub fatal_deprecation: Vec<String>,
        #[prost(string, repeated, tag = "16")]
        pub silence_deprecation: Vec<String>,
        #[prost(string, repeated, tag = "17")]
        pub future_deprecation: Vec<String>,
    }

    pub mod compile_request {
        /// Source text to compile, in place of a filesystem path.
        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct StringInput {
            #[prost(string, tag = "1")]
            pub source: String,
            /// The canonical URL attributed to `source`, or empty if it has none.
            #[prost(string, tag = "2")]
            pub url: String,
            #[prost(enumeration = "super::super::Syntax", tag = "3")]
            pub syntax: i32,
            /// The importer used to resolve loads relative to `url`.
            #[prost(message, optional, tag = "4")]
            pub importer: Option<Importer>,
        }

        /// One entry of the compilation's importer list.
        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct Importer {
            #[prost(oneof = "importer::Importer", tags = "1, 2, 3, 5")]
            pub importer: Option<importer::Importer>,
            /// URL schemes for which `importer_id` never canonicalizes.
            #[prost(string, repeated, tag = "4")]
            pub non_canonical_scheme: Vec<String>,
        }

        pub mod importer {
            #[derive(Clone, PartialEq, ::prost::Oneof)]
            pub enum Importer {
                /// A filesystem load path, resolved entirely inside the compiler.
                #[prost(string, tag = "1")]
                Path(String),
                /// A host importer with canonicalize/load callbacks.
                #[prost(uint32, tag = "2")]
                ImporterId(u32),
                /// A host importer with a find-file-url callback.
                #[prost(uint32, tag = "3")]
                FileImporterId(u32),
                #[prost(message, tag = "5")]
                PackageImporter(super::PackageImporter),
            }
        }

        /// An importer resolving `pkg:` loads from a package root directory.
        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct PackageImporter {
            #[prost(string, tag = "1")]
            pub entry_point_directory: String,
        }

        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Input {
            #[prost(message, tag = "2")]
            String(StringInput),
            /// An absolute filesystem path to compile.
            #[prost(string, tag = "3")]
            Path(String),
        }
    }

    /// The host's answer to an outbound CanonicalizeRequest.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct CanonicalizeResponse {
        #[prost(uint32, tag = "1")]
        pub id: u32,
        #[prost(oneof = "canonicalize_response::Result", tags = "2, 3")]
        pub result: Option<canonicalize_response::Result>,
        /// True if the canonicalize callback never read its containing URL,
        /// so the compiler may cache the result across containing URLs.
        #[prost(bool, tag = "4")]
        pub containing_url_unused: bool,
    }

    pub mod canonicalize_response {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Result {
            /// The canonical URL, or unset if the importer doesn't recognize it.
            #[prost(string, tag = "2")]
            Url(String),
            #[prost(string, tag = "3")]
            Error(String),
        }
    }

    /// The host's answer to an outbound ImportRequest.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ImportResponse {
        #[prost(uint32, tag = "1")]
        pub id: u32,
        #[prost(oneof = "import_response::Result", tags = "2, 3")]
        pub result: Option<import_response::Result>,
    }

    pub mod import_response {
        /// A successfully loaded stylesheet.
        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct ImportSuccess {
            #[prost(string, tag = "1")]
            pub contents: String,
            #[prost(enumeration = "super::super::Syntax", tag = "2")]
            pub syntax: i32,
            /// An absolute, browser-accessible URL for `contents` in source maps.
            #[prost(string, optional, tag = "3")]
            pub source_map_url: Option<String>,
        }

        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Result {
            #[prost(message, tag = "2")]
            Success(ImportSuccess),
            #[prost(string, tag = "3")]
            Error(String),
        }
    }

    /// The host's answer to an outbound FileImportRequest.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct FileImportResponse {
        #[prost(uint32, tag = "1")]
        pub id: u32,
        #[prost(oneof = "file_import_response::Result", tags = "2, 3")]
        pub result: Option<file_import_response::Result>,
        #[prost(bool, tag = "4")]
        pub containing_url_unused: bool,
    }

    pub mod file_import_response {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Result {
            /// An absolute `file:` URL, or unset to pass to the next importer.
            #[prost(string, tag = "2")]
            FileUrl(String),
            #[prost(string, tag = "3")]
            Error(String),
        }
    }

    /// The host's answer to an outbound FunctionCallRequest.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct FunctionCallResponse {
        #[prost(uint32, tag = "1")]
        pub id: u32,
        #[prost(oneof = "function_call_response::Result", tags = "2, 3")]
        pub result: Option<function_call_response::Result>,
        /// IDs of argument lists from the request whose keywords were read.
        #[prost(uint32, repeated, tag = "4")]
        pub accessed_argument_lists: Vec<u32>,
    }

    pub mod function_call_response {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Result {
            #[prost(message, tag = "2")]
            Success(super::super::Value),
            #[prost(string, tag = "3")]
            Error(String),
        }
    }

    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Message {
        #[prost(message, tag = "2")]
        CompileRequest(CompileRequest),
        #[prost(message, tag = "3")]
        CanonicalizeResponse(CanonicalizeResponse),
        #[prost(message, tag = "4")]
        ImportResponse(ImportResponse),
        #[prost(message, tag = "5")]
        FileImportResponse(FileImportResponse),
        #[prost(message, tag = "6")]
        FunctionCallResponse(FunctionCallResponse),
        #[prost(message, tag = "7")]
        VersionRequest(VersionRequest),
    }
}

/// The wrapper type for all messages sent from the compiler to the host.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct OutboundMessage {
    #[prost(oneof = "outbound_message::Message", tags = "1, 2, 3, 4, 5, 6, 7, 8")]
    pub message: Option<outbound_message::Message>,
}

pub mod outbound_message {
    /// The compiler's version metadata, answering a VersionRequest.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct VersionResponse {
        #[prost(uint32, tag = "1")]
        pub id: u32,
        #[prost(string, tag = "2")]
        pub protocol_version: String,
        #[prost(string, tag = "3")]
        pub compiler_version: String,
        #[prost(string, tag = "4")]
        pub implementation_version: String,
        #[prost(string, tag = "5")]
        pub implementation_name: String,
    }

    /// The terminal result of a compilation. The compilation it answers is
    /// identified by the packet envelope, so the message itself carries no
    /// ID (field 1 is retired).
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct CompileResponse {
        #[prost(oneof = "compile_response::Result", tags = "2, 3")]
        pub result: Option<compile_response::Result>,
        /// Canonical URLs of all sources loaded during the compilation.
        #[prost(string, repeated, tag = "4")]
        pub loaded_urls: Vec<String>,
    }

    pub mod compile_response {
        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct CompileSuccess {
            #[prost(string, tag = "1")]
            pub css: String,
            /// A JSON-encoded source map, or empty if none was requested.
            #[prost(string, tag = "2")]
            pub source_map: String,
        }

        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct CompileFailure {
            #[prost(string, tag = "1")]
            pub message: String,
            #[prost(message, optional, tag = "2")]
            pub span: Option<super::super::SourceSpan>,
            #[prost(string, tag = "3")]
            pub stack_trace: String,
            /// The failure formatted for human display, including the span.
            #[prost(string, tag = "4")]
            pub formatted: String,
        }

        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Result {
            #[prost(message, tag = "2")]
            Success(CompileSuccess),
            #[prost(message, tag = "3")]
            Failure(CompileFailure),
        }
    }

    /// A warning, deprecation warning, or debug message from the compiler.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct LogEvent {
        #[prost(enumeration = "super::LogEventType", tag = "1")]
        pub r#type: i32,
        #[prost(string, tag = "2")]
        pub message: String,
        #[prost(message, optional, tag = "3")]
        pub span: Option<super::SourceSpan>,
        /// The stylesheet stack at the point the event was raised.
        #[prost(string, tag = "4")]
        pub stack_trace: String,
        /// The event formatted for human display.
        #[prost(string, tag = "5")]
        pub formatted: String,
        /// For deprecation warnings, the deprecation's identifier.
        #[prost(string, optional, tag = "6")]
        pub deprecation_type: Option<String>,
    }

    /// A request for the host to canonicalize a load URL.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct CanonicalizeRequest {
        #[prost(uint32, tag = "1")]
        pub id: u32,
        #[prost(uint32, tag = "2")]
        pub importer_id: u32,
        #[prost(string, tag = "3")]
        pub url: String,
        /// Whether this load originated from an `@import` rule.
        #[prost(bool, tag = "4")]
        pub from_import: bool,
        /// The canonical URL of the stylesheet containing the load.
        #[prost(string, optional, tag = "5")]
        pub containing_url: Option<String>,
    }

    /// A request for the host to load a canonicalized URL.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ImportRequest {
        #[prost(uint32, tag = "1")]
        pub id: u32,
        #[prost(uint32, tag = "2")]
        pub importer_id: u32,
        /// A canonical URL previously returned by the same importer.
        #[prost(string, tag = "3")]
        pub url: String,
    }

    /// A request for the host to map a URL onto a `file:` URL.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct FileImportRequest {
        #[prost(uint32, tag = "1")]
        pub id: u32,
        #[prost(uint32, tag = "2")]
        pub importer_id: u32,
        #[prost(string, tag = "3")]
        pub url: String,
        #[prost(bool, tag = "4")]
        pub from_import: bool,
        #[prost(string, optional, tag = "5")]
        pub containing_url: Option<String>,
    }

    /// A request for the host to invoke a custom function.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct FunctionCallRequest {
        #[prost(uint32, tag = "1")]
        pub id: u32,
        #[prost(oneof = "function_call_request::Identifier", tags = "2, 3")]
        pub identifier: Option<function_call_request::Identifier>,
        #[prost(message, repeated, tag = "4")]
        pub arguments: Vec<super::Value>,
    }

    pub mod function_call_request {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Identifier {
            /// The name of a function registered via global_functions.
            #[prost(string, tag = "2")]
            Name(String),
            /// An opaque ID minted by the host for an anonymous function.
            #[prost(uint32, tag = "3")]
            FunctionId(u32),
        }
    }

    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Message {
        #[prost(message, tag = "1")]
        Error(super::ProtocolError),
        #[prost(message, tag = "2")]
        CompileResponse(CompileResponse),
        #[prost(message, tag = "3")]
        LogEvent(LogEvent),
        #[prost(message, tag = "4")]
        CanonicalizeRequest(CanonicalizeRequest),
        #[prost(message, tag = "5")]
        ImportRequest(ImportRequest),
        #[prost(message, tag = "6")]
        FileImportRequest(FileImportRequest),
        #[prost(message, tag = "7")]
        FunctionCallRequest(FunctionCallRequest),
        #[prost(message, tag = "8")]
        VersionResponse(VersionResponse),
    }
}

/// An error reported when an endpoint violated the embedded protocol.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtocolError {
    #[prost(enumeration = "ProtocolErrorType", tag = "1")]
    pub r#type: i32,
    /// The ID of the request that triggered the error, or u32::MAX if it
    /// isn't attributable to one.
    #[prost(uint32, tag = "2")]
    pub id: u32,
    #[prost(string, tag = "3")]
    pub message: String,
}

/// A chunk of a source file, with its location.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SourceSpan {
    /// The text covered by the span.
    #[prost(string, tag = "1")]
    pub text: String,
    #[prost(message, optional, tag = "2")]
    pub start: Option<source_span::SourceLocation>,
    /// The end of the span; absent for point spans.
    #[prost(message, optional, tag = "3")]
    pub end: Option<source_span::SourceLocation>,
    /// The URL of the source file, or empty if it has none.
    #[prost(string, tag = "4")]
    pub url: String,
    /// Additional source text surrounding the span.
    #[prost(string, tag = "5")]
    pub context: String,
}

pub mod source_span {
    /// A single point in a source file, with 0-indexed line and column.
    #[derive(Clone, Copy, PartialEq, ::prost::Message)]
    pub struct SourceLocation {
        #[prost(uint32, tag = "1")]
        pub offset: u32,
        #[prost(uint32, tag = "2")]
        pub line: u32,
        #[prost(uint32, tag = "3")]
        pub column: u32,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Syntax {
    Scss = 0,
    Indented = 1,
    Css = 2,
}

impl Syntax {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Syntax::Scss => "SCSS",
            Syntax::Indented => "INDENTED",
            Syntax::Css => "CSS",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum OutputStyle {
    Expanded = 0,
    Compressed = 1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum LogEventType {
    Warning = 0,
    DeprecationWarning = 1,
    Debug = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ProtocolErrorType {
    /// A message couldn't be decoded at all.
    Parse = 0,
    /// A message was decoded but its contents are invalid.
    Params = 1,
    /// The endpoint failed in a way that isn't the other's fault.
    Internal = 2,
}
