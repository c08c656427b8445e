use url::Url;

/// A chunk of a source file, as attached to failures and log events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    /// The text covered by the span.
    pub text: String,
    pub start: Location,
    /// The end of the span; equal to `start` for point spans.
    pub end: Location,
    /// The URL of the source file, if it has one.
    pub url: Option<Url>,
    /// Additional source text surrounding the span.
    pub context: Option<String>,
}

/// A single point in a source file. `line` and `column` are 0-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    pub offset: u32,
    pub line: u32,
    pub column: u32,
}

impl From<proto_sass::source_span::SourceLocation> for Location {
    fn from(location: proto_sass::source_span::SourceLocation) -> Self {
        Self {
            offset: location.offset,
            line: location.line,
            column: location.column,
        }
    }
}

impl From<proto_sass::SourceSpan> for Span {
    fn from(span: proto_sass::SourceSpan) -> Self {
        let start = span.start.map(Location::from).unwrap_or_default();
        Self {
            text: span.text,
            start,
            // A point span has no explicit end on the wire.
            end: span.end.map(Location::from).unwrap_or(start),
            url: Url::parse(&span.url).ok(),
            context: (!span.context.is_empty()).then(|| span.context),
        }
    }
}
