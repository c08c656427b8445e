//! The asynchronous compiler host.
//!
//! One reader task drives the framer and codec, routing each decoded
//! `(compilation ID, message)` to the owning dispatcher's channel; one
//! writer task owns the child's stdin; a third copies the child's stderr
//! to ours verbatim. Multiple compilations share the child concurrently,
//! isolated by their compilation IDs.

use crate::child::CompilerChild;
use crate::compiler_path;
use crate::dispatcher::{DispatchEvent, Dispatcher};
use crate::error::CompileError;
use crate::framer::{self, PacketFramer};
use crate::functions::FunctionRegistry;
use crate::importers::{self, ImporterRegistry};
use crate::logger::Logger;
use crate::options::{build_request, Options, StringOptions};
use crate::{codec, Error, Result};
use proto_sass::inbound_message::{self, compile_request, CompileRequest};
use proto_sass::outbound_message::{self, compile_response, CompileResponse};
use proto_sass::{InboundMessage, OutboundMessage};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, Weak};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot, Notify};
use url::Url;

/// The result of a successful compilation.
#[derive(Debug, Clone)]
pub struct CompileResult {
    pub css: String,
    /// Canonical URLs of every stylesheet loaded during the compilation.
    pub loaded_urls: Vec<Url>,
    /// The parsed source map, when [`Options::source_map`] was set.
    pub source_map: Option<serde_json::Value>,
}

/// Version metadata reported by the compiler.
#[derive(Debug, Clone)]
pub struct Version {
    pub protocol_version: String,
    pub compiler_version: String,
    pub implementation_version: String,
    pub implementation_name: String,
}

/// Launch a compiler child process and return a host for it.
///
/// This factory is the only way to construct a [`Compiler`].
pub async fn init_compiler() -> Result<Compiler> {
    let program = compiler_path::resolve()?;
    Ok(Compiler::new(CompilerChild::launch(&program)?))
}

/// A long-lived handle on one compiler child process.
///
/// Clones are cheap and share the child, so an importer or function
/// callback may hold one and start a nested compilation re-entrantly; the
/// nested compile gets its own compilation ID and is fully isolated.
#[derive(Clone)]
pub struct Compiler {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<State>,
    /// Notified whenever the set of active compilations empties.
    idle: Notify,
    child: tokio::sync::Mutex<Option<CompilerChild>>,
}

struct State {
    next_compilation_id: u32,
    active: HashMap<u32, mpsc::UnboundedSender<DispatchEvent>>,
    next_version_id: u32,
    pending_versions: HashMap<u32, oneshot::Sender<outbound_message::VersionResponse>>,
    /// Present until disposal; dropping it closes the writer task's
    /// channel, which in turn closes the child's stdin exactly once.
    writer: Option<mpsc::UnboundedSender<Vec<u8>>>,
    disposed: bool,
    /// Sticky failure set on child exit or protocol corruption; all later
    /// compiles fail fast with it.
    fatal: Option<Error>,
}

impl Compiler {
    fn new(mut child: CompilerChild) -> Compiler {
        let stdin = child.stdin.take().expect("child stdin is piped");
        let stdout = child.stdout.take().expect("child stdout is piped");
        let mut stderr = child.stderr.take().expect("child stderr is piped");

        // The child's stderr is free-form logging; forward it verbatim.
        tokio::spawn(async move {
            _ = tokio::io::copy(&mut stderr, &mut tokio::io::stderr()).await;
        });

        Self::from_transport(stdout, stdin, Some(child))
    }

    /// Assemble a host over an arbitrary transport. Production use goes
    /// through [`init_compiler`]; tests drive this with in-memory pipes.
    fn from_transport<R, W>(stdout: R, stdin: W, child: Option<CompilerChild>) -> Compiler
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(Inner {
            state: Mutex::new(State {
                next_compilation_id: 1,
                active: HashMap::new(),
                next_version_id: 1,
                pending_versions: HashMap::new(),
                writer: Some(write_tx),
                disposed: false,
                fatal: None,
            }),
            idle: Notify::new(),
            child: tokio::sync::Mutex::new(child),
        });

        tokio::spawn(write_loop(stdin, write_rx));
        // The reader holds only a weak handle: when the last user handle
        // drops, the child (owned by Inner) is killed and the loop ends on
        // its EOF instead of keeping the host alive forever.
        tokio::spawn(read_loop(stdout, Arc::downgrade(&inner)));

        Compiler { inner }
    }

    /// Compile the stylesheet at `path`.
    pub async fn compile(&self, path: impl AsRef<Path>, options: &Options) -> Result<CompileResult> {
        let importers = ImporterRegistry::new(&options.importers, &options.load_paths)?;
        let functions = FunctionRegistry::new(&options.functions)?;
        let input = compile_request::Input::Path(importers::absolute_path(path.as_ref())?);
        let request = build_request(
            input,
            options,
            importers.entries(),
            functions.global_signatures(),
        );
        self.run(request, importers, functions, options.logger.clone())
            .await
    }

    /// Compile a stylesheet from source text.
    pub async fn compile_string(
        &self,
        source: &str,
        options: &StringOptions,
    ) -> Result<CompileResult> {
        let mut importers =
            ImporterRegistry::new(&options.options.importers, &options.options.load_paths)?;
        let functions = FunctionRegistry::new(&options.options.functions)?;
        let importer = options
            .importer
            .as_ref()
            .map(|importer| importers.register(importer))
            .transpose()?;
        let input = compile_request::Input::String(compile_request::StringInput {
            source: source.to_string(),
            url: options
                .url
                .as_ref()
                .map(|url| url.to_string())
                .unwrap_or_default(),
            syntax: options.syntax.to_proto() as i32,
            importer,
        });
        let request = build_request(
            input,
            &options.options,
            importers.entries(),
            functions.global_signatures(),
        );
        self.run(request, importers, functions, options.options.logger.clone())
            .await
    }

    /// Query the compiler's version metadata.
    pub async fn version(&self) -> Result<Version> {
        let (response_tx, response_rx) = oneshot::channel();
        {
            let mut state = self.lock_state();
            if state.disposed {
                return Err(Error::HostDisposed);
            }
            if let Some(fatal) = &state.fatal {
                return Err(fatal.clone());
            }
            let writer = state.writer.clone().ok_or(Error::HostDisposed)?;
            let id = state.next_version_id;
            state.next_version_id += 1;
            state.pending_versions.insert(id, response_tx);

            // Version traffic travels under the reserved compilation ID 0.
            let payload = codec::encode(
                0,
                &InboundMessage {
                    message: Some(inbound_message::Message::VersionRequest(
                        inbound_message::VersionRequest { id },
                    )),
                },
            );
            writer
                .send(framer::frame(&payload))
                .map_err(|_| Error::ChildExited)?;
        }

        match response_rx.await {
            Ok(response) => Ok(Version {
                protocol_version: response.protocol_version,
                compiler_version: response.compiler_version,
                implementation_version: response.implementation_version,
                implementation_name: response.implementation_name,
            }),
            Err(_) => {
                let state = self.lock_state();
                Err(state.fatal.clone().unwrap_or(Error::ChildExited))
            }
        }
    }

    /// Refuse new work, await in-flight compilations, close the child's
    /// stdin, and wait for it to exit.
    ///
    /// In-flight compilations are not cancelled. A non-zero exit after the
    /// clean shutdown handshake is an error.
    pub async fn dispose(&self) -> Result<()> {
        self.lock_state().disposed = true;

        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut state = self.lock_state();
                if state.active.is_empty() {
                    state.writer = None;
                    state.pending_versions.clear();
                    break;
                }
            }
            notified.await;
        }

        let child = self.inner.child.lock().await.take();
        if let Some(child) = child {
            let status = child.wait().await?;
            if !status.success() {
                return Err(Error::ChildExited);
            }
        }
        Ok(())
    }

    async fn run(
        &self,
        request: CompileRequest,
        importers: ImporterRegistry,
        functions: FunctionRegistry,
        logger: Option<Arc<dyn Logger>>,
    ) -> Result<CompileResult> {
        let (compilation_id, inbox, writer) = {
            let mut state = self.lock_state();
            if state.disposed {
                return Err(Error::HostDisposed);
            }
            if let Some(fatal) = &state.fatal {
                return Err(fatal.clone());
            }
            let writer = state.writer.clone().ok_or(Error::HostDisposed)?;
            let compilation_id = state.next_compilation_id;
            state.next_compilation_id += 1;
            let (event_tx, event_rx) = mpsc::unbounded_channel();
            state.active.insert(compilation_id, event_tx);
            (compilation_id, event_rx, writer)
        };

        let dispatcher = Dispatcher::new(compilation_id, importers, functions, logger, writer);
        let result = dispatcher.compile(request, inbox).await;

        {
            let mut state = self.lock_state();
            state.active.remove(&compilation_id);
            if state.active.is_empty() {
                // No compilation holds an ID anymore; the space is free.
                state.next_compilation_id = 1;
                self.inner.idle.notify_waiters();
            }
        }

        finish_response(result?)
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, State> {
        self.inner.state.lock().expect("host state is never poisoned")
    }
}

/// Turn a terminal compile response into the user-facing result.
pub(crate) fn finish_response(response: CompileResponse) -> Result<CompileResult> {
    let loaded_urls = response
        .loaded_urls
        .iter()
        .map(|url| {
            Url::parse(url)
                .map_err(|err| Error::CompilerProtocol(format!("invalid loaded URL {url:?}: {err}")))
        })
        .collect::<Result<Vec<_>>>()?;

    match response.result {
        Some(compile_response::Result::Success(success)) => {
            let source_map = if success.source_map.is_empty() {
                None
            } else {
                Some(serde_json::from_str(&success.source_map).map_err(|err| {
                    Error::CompilerProtocol(format!("invalid source map JSON: {err}"))
                })?)
            };
            Ok(CompileResult {
                css: success.css,
                loaded_urls,
                source_map,
            })
        }
        Some(compile_response::Result::Failure(failure)) => {
            Err(CompileError::new(failure, loaded_urls).into())
        }
        None => Err(Error::CompilerProtocol(
            "CompileResponse.result is not set".to_string(),
        )),
    }
}

async fn write_loop<W>(mut stdin: W, mut frames: mpsc::UnboundedReceiver<Vec<u8>>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = frames.recv().await {
        if let Err(error) = stdin.write_all(&frame).await {
            tracing::warn!(%error, "failed writing to the compiler's stdin");
            return;
        }
    }
    // Channel closed: flush and drop stdin, signalling EOF so the child
    // can exit.
    _ = stdin.shutdown().await;
}

async fn read_loop<R>(mut stdout: R, inner: Weak<Inner>)
where
    R: AsyncRead + Unpin,
{
    let mut framer = PacketFramer::new();
    let mut buf = vec![0u8; 8192];

    loop {
        let n = match stdout.read(&mut buf).await {
            Ok(n) => n,
            Err(err) => {
                fail(&inner, Error::from(err));
                return;
            }
        };
        if n == 0 {
            let clean = match inner.upgrade() {
                Some(inner) => {
                    let state = inner.state.lock().expect("host state is never poisoned");
                    state.disposed && state.active.is_empty() && !framer.mid_frame()
                }
                None => return,
            };
            if !clean {
                fail(&inner, Error::ChildExited);
            }
            return;
        }
        for payload in framer.feed(&buf[..n]) {
            match codec::decode(&payload) {
                Ok((compilation_id, message)) => route(&inner, compilation_id, message),
                Err(error) => {
                    // The stream can't be trusted past a framing or
                    // decoding failure.
                    fail(&inner, error);
                    return;
                }
            }
        }
    }
}

fn route(inner: &Weak<Inner>, compilation_id: u32, message: OutboundMessage) {
    let Some(inner) = inner.upgrade() else { return };
    let mut state = inner.state.lock().expect("host state is never poisoned");

    if compilation_id == 0 {
        match message.message {
            Some(outbound_message::Message::VersionResponse(response)) => {
                match state.pending_versions.remove(&response.id) {
                    Some(tx) => {
                        _ = tx.send(response);
                    }
                    None => set_fatal(
                        &mut state,
                        Error::CompilerProtocol(format!(
                            "unknown VersionResponse.id {}",
                            response.id
                        )),
                    ),
                }
            }
            // A standalone protocol error poisons the whole host.
            Some(outbound_message::Message::Error(error)) => {
                fail_locked(&mut state, Error::CompilerReported(error.message));
            }
            _ => fail_locked(
                &mut state,
                Error::CompilerProtocol("unexpected message with compilation ID 0".to_string()),
            ),
        }
        return;
    }

    match state.active.get(&compilation_id) {
        Some(events) => {
            _ = events.send(DispatchEvent::Message(message));
        }
        // A log event racing its compilation's terminal response is
        // dropped; anything else for an inactive ID poisons the host, but
        // doesn't kill siblings.
        None => match message.message {
            Some(outbound_message::Message::LogEvent(_)) => {
                tracing::debug!(compilation_id, "dropping log event for inactive compilation");
            }
            _ => {
                let error =
                    Error::CompilerProtocol(format!("unknown compilation ID {compilation_id}"));
                tracing::error!(%error, "embedded protocol desynchronized");
                set_fatal(&mut state, error);
            }
        },
    }
}

fn fail(inner: &Weak<Inner>, error: Error) {
    let Some(inner) = inner.upgrade() else { return };
    let mut state = inner.state.lock().expect("host state is never poisoned");
    fail_locked(&mut state, error);
}

/// Fail every active compilation and pending version query, and poison
/// the host for future calls.
fn fail_locked(state: &mut State, error: Error) {
    set_fatal(state, error.clone());
    for (_, events) in state.active.drain() {
        _ = events.send(DispatchEvent::Failed(error.clone()));
    }
    state.pending_versions.clear();
}

fn set_fatal(state: &mut State, error: Error) {
    state.fatal.get_or_insert(error);
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::value::{HostFunction, SassString, Value};
    use prost::Message as _;
    use proto_sass::outbound_message::compile_response::CompileSuccess;
    use tokio::io::{ReadHalf, WriteHalf};

    /// The compiler's side of an in-memory transport: reads framed
    /// inbound messages, writes framed outbound messages.
    struct FakeCompiler {
        reader: ReadHalf<tokio::io::DuplexStream>,
        writer: WriteHalf<tokio::io::DuplexStream>,
        framer: PacketFramer,
        pending: std::collections::VecDeque<(u32, InboundMessage)>,
    }

    fn host_pair() -> (Compiler, FakeCompiler) {
        let (host_io, fake_io) = tokio::io::duplex(1 << 16);
        let (host_read, host_write) = tokio::io::split(host_io);
        let compiler = Compiler::from_transport(host_read, host_write, None);
        let (fake_read, fake_write) = tokio::io::split(fake_io);
        (
            compiler,
            FakeCompiler {
                reader: fake_read,
                writer: fake_write,
                framer: PacketFramer::new(),
                pending: std::collections::VecDeque::new(),
            },
        )
    }

    impl FakeCompiler {
        /// Read the next framed inbound message, or None at EOF.
        async fn next(&mut self) -> Option<(u32, InboundMessage)> {
            loop {
                if let Some(message) = self.pending.pop_front() {
                    return Some(message);
                }
                let mut buf = [0u8; 4096];
                let n = self.reader.read(&mut buf).await.unwrap();
                if n == 0 {
                    return None;
                }
                for payload in self.framer.feed(&buf[..n]) {
                    let mut bytes = payload.as_slice();
                    let id = prost::encoding::decode_varint(&mut bytes).unwrap() as u32;
                    self.pending
                        .push_back((id, InboundMessage::decode(bytes).unwrap()));
                }
            }
        }

        async fn next_compile_request(&mut self) -> (u32, CompileRequest) {
            match self.next().await {
                Some((id, InboundMessage {
                    message: Some(inbound_message::Message::CompileRequest(request)),
                })) => (id, request),
                other => panic!("expected a compile request, got {other:?}"),
            }
        }

        async fn send(&mut self, compilation_id: u32, message: outbound_message::Message) {
            let mut payload = Vec::new();
            prost::encoding::encode_varint(compilation_id as u64, &mut payload);
            OutboundMessage {
                message: Some(message),
            }
            .encode(&mut payload)
            .unwrap();
            self.writer
                .write_all(&framer::frame(&payload))
                .await
                .unwrap();
        }

        async fn send_success(&mut self, compilation_id: u32, css: &str, loaded_urls: &[&str]) {
            self.send(
                compilation_id,
                outbound_message::Message::CompileResponse(CompileResponse {
                    result: Some(compile_response::Result::Success(CompileSuccess {
                        css: css.to_string(),
                        source_map: String::new(),
                    })),
                    loaded_urls: loaded_urls.iter().map(|url| url.to_string()).collect(),
                }),
            )
            .await;
        }
    }

    #[tokio::test]
    async fn test_compile_string_success() {
        let (compiler, mut fake) = host_pair();

        let compile = {
            let compiler = compiler.clone();
            tokio::spawn(async move {
                compiler
                    .compile_string("a {b: c}", &StringOptions::default())
                    .await
            })
        };

        let (id, request) = fake.next_compile_request().await;
        assert_eq!(id, 1);
        match request.input {
            Some(compile_request::Input::String(input)) => {
                assert_eq!(input.source, "a {b: c}");
                assert_eq!(input.url, "");
                assert_eq!(input.importer, None);
            }
            other => panic!("unexpected input: {other:?}"),
        }

        fake.send_success(1, "a {\n  b: c;\n}", &[]).await;
        let result = compile.await.unwrap().unwrap();
        assert_eq!(result.css, "a {\n  b: c;\n}");
        assert!(result.loaded_urls.is_empty());
        assert!(result.source_map.is_none());
    }

    #[tokio::test]
    async fn test_compile_failure_surfaces_span() {
        let (compiler, mut fake) = host_pair();

        let compile = {
            let compiler = compiler.clone();
            tokio::spawn(
                async move { compiler.compile_string("a {", &StringOptions::default()).await },
            )
        };
        let (id, _) = fake.next_compile_request().await;

        let location = proto_sass::source_span::SourceLocation {
            offset: 3,
            line: 0,
            column: 3,
        };
        fake.send(
            id,
            outbound_message::Message::CompileResponse(CompileResponse {
                result: Some(compile_response::Result::Failure(
                    compile_response::CompileFailure {
                        message: "expected \"}\".".to_string(),
                        span: Some(proto_sass::SourceSpan {
                            text: String::new(),
                            start: Some(location),
                            end: Some(location),
                            url: String::new(),
                            context: "a {".to_string(),
                        }),
                        stack_trace: "- 1:4  root stylesheet\n".to_string(),
                        formatted: String::new(),
                    },
                )),
                loaded_urls: Vec::new(),
            }),
        )
        .await;

        let err = compile.await.unwrap().unwrap_err();
        let Error::Compile(failure) = err else {
            panic!("expected a compilation failure, got {err:?}");
        };
        assert_eq!(failure.sass_message, "expected \"}\".");
        assert_eq!(failure.sass_stack, "- 1:4  root stylesheet\n");
        let span = failure.span.as_ref().unwrap();
        assert_eq!(span.start.offset, 3);
        assert_eq!(span.start.line, 0);
        assert_eq!(span.start.column, 3);
        assert_eq!(span.end, span.start);
        assert_eq!(failure.to_string(), "Error: expected \"}\".");
    }

    #[tokio::test]
    async fn test_custom_importer_round_trip() {
        use crate::importers::{CanonicalizeContext, Importer, ImporterResult, SassImporter};

        struct FooImporter;

        #[async_trait::async_trait]
        impl Importer for FooImporter {
            async fn canonicalize(
                &self,
                url: &str,
                _context: &CanonicalizeContext,
            ) -> anyhow::Result<Option<Url>> {
                anyhow::ensure!(url.starts_with("foo:"));
                Ok(Some(Url::parse("foo:canonical")?))
            }

            async fn load(&self, _url: &Url) -> anyhow::Result<Option<ImporterResult>> {
                Ok(Some(ImporterResult {
                    contents: "a { b: c }".to_string(),
                    syntax: crate::Syntax::Scss,
                    source_map_url: None,
                }))
            }
        }

        let (compiler, mut fake) = host_pair();
        let options = StringOptions {
            options: Options {
                importers: vec![SassImporter::Canonical(Arc::new(FooImporter))],
                ..Options::default()
            },
            ..StringOptions::default()
        };
        let compile = {
            let compiler = compiler.clone();
            tokio::spawn(async move {
                compiler
                    .compile_string("@use 'foo:anything'", &options)
                    .await
            })
        };

        let (id, request) = fake.next_compile_request().await;
        assert_eq!(
            request.importers[0].importer,
            Some(compile_request::importer::Importer::ImporterId(0))
        );

        fake.send(
            id,
            outbound_message::Message::CanonicalizeRequest(
                outbound_message::CanonicalizeRequest {
                    id: 0,
                    importer_id: 0,
                    url: "foo:anything".to_string(),
                    from_import: false,
                    containing_url: None,
                },
            ),
        )
        .await;
        match fake.next().await {
            Some((
                _,
                InboundMessage {
                    message: Some(inbound_message::Message::CanonicalizeResponse(response)),
                },
            )) => {
                assert_eq!(
                    response.result,
                    Some(
                        proto_sass::inbound_message::canonicalize_response::Result::Url(
                            "foo:canonical".to_string()
                        )
                    )
                );
            }
            other => panic!("expected a canonicalize response, got {other:?}"),
        }

        fake.send(
            id,
            outbound_message::Message::ImportRequest(outbound_message::ImportRequest {
                id: 0,
                importer_id: 0,
                url: "foo:canonical".to_string(),
            }),
        )
        .await;
        match fake.next().await {
            Some((
                _,
                InboundMessage {
                    message: Some(inbound_message::Message::ImportResponse(response)),
                },
            )) => match response.result {
                Some(proto_sass::inbound_message::import_response::Result::Success(success)) => {
                    assert_eq!(success.contents, "a { b: c }");
                }
                other => panic!("unexpected import result: {other:?}"),
            },
            other => panic!("expected an import response, got {other:?}"),
        }

        fake.send_success(id, "a {\n  b: c;\n}", &["foo:canonical"]).await;
        let result = compile.await.unwrap().unwrap();
        assert!(result.css.contains("a {\n  b: c;\n}"));
        assert_eq!(
            result.loaded_urls,
            vec![Url::parse("foo:canonical").unwrap()]
        );
    }

    #[tokio::test]
    async fn test_compilation_ids_count_up_and_reset() {
        let (compiler, mut fake) = host_pair();

        // Ten concurrent compilations observe IDs 1..=10 in issue order.
        let compiles: Vec<_> = (0..10)
            .map(|_| {
                let compiler = compiler.clone();
                tokio::spawn(
                    async move { compiler.compile_string("", &StringOptions::default()).await },
                )
            })
            .collect();

        let mut seen = Vec::new();
        for _ in 0..10 {
            let (id, _) = fake.next_compile_request().await;
            seen.push(id);
        }
        assert_eq!(seen, (1..=10).collect::<Vec<_>>());

        for id in seen {
            fake.send_success(id, "", &[]).await;
        }
        for compile in compiles {
            compile.await.unwrap().unwrap();
        }

        // With the active set drained, the next compilation reuses ID 1.
        let compile = {
            let compiler = compiler.clone();
            tokio::spawn(
                async move { compiler.compile_string("", &StringOptions::default()).await },
            )
        };
        let (id, _) = fake.next_compile_request().await;
        assert_eq!(id, 1);
        fake.send_success(1, "", &[]).await;
        compile.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_reentrant_compile_from_function_callback() {
        let (compiler, mut fake) = host_pair();

        let nested_host = compiler.clone();
        let options = StringOptions {
            options: Options {
                functions: vec![HostFunction::new_async("nested()", move |_| {
                    let compiler = nested_host.clone();
                    async move {
                        let result = compiler
                            .compile_string("b {c: d}", &StringOptions::default())
                            .await?;
                        Ok(Value::String(SassString::quoted(result.css)))
                    }
                })],
                ..Options::default()
            },
            ..StringOptions::default()
        };

        let compile = {
            let compiler = compiler.clone();
            tokio::spawn(async move { compiler.compile_string("outer", &options).await })
        };

        let (outer_id, request) = fake.next_compile_request().await;
        assert_eq!(request.global_functions, vec!["nested()".to_string()]);

        fake.send(
            outer_id,
            outbound_message::Message::FunctionCallRequest(
                outbound_message::FunctionCallRequest {
                    id: 1,
                    identifier: Some(
                        proto_sass::outbound_message::function_call_request::Identifier::Name(
                            "nested".to_string(),
                        ),
                    ),
                    arguments: Vec::new(),
                },
            ),
        )
        .await;

        // The callback starts a second compilation with its own fresh ID.
        let (inner_id, inner_request) = fake.next_compile_request().await;
        assert_ne!(inner_id, outer_id);
        match inner_request.input {
            Some(compile_request::Input::String(input)) => assert_eq!(input.source, "b {c: d}"),
            other => panic!("unexpected inner input: {other:?}"),
        }
        fake.send_success(inner_id, "b {\n  c: d;\n}", &[]).await;

        match fake.next().await {
            Some((
                id,
                InboundMessage {
                    message: Some(inbound_message::Message::FunctionCallResponse(response)),
                },
            )) => {
                assert_eq!(id, outer_id);
                assert_eq!(response.id, 1);
                assert!(matches!(
                    response.result,
                    Some(proto_sass::inbound_message::function_call_response::Result::Success(_))
                ));
            }
            other => panic!("expected a function call response, got {other:?}"),
        }

        fake.send_success(outer_id, "", &[]).await;
        compile.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_dispose_waits_for_active_compilations() {
        let (compiler, mut fake) = host_pair();

        let compile = {
            let compiler = compiler.clone();
            tokio::spawn(
                async move { compiler.compile_string("", &StringOptions::default()).await },
            )
        };
        let (id, _) = fake.next_compile_request().await;

        let dispose = {
            let compiler = compiler.clone();
            tokio::spawn(async move { compiler.dispose().await })
        };

        // New work is refused immediately...
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let err = compiler
            .compile_string("", &StringOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::HostDisposed), "{err}");
        // ...but disposal itself waits for the in-flight compilation.
        assert!(!dispose.is_finished());

        fake.send_success(id, "", &[]).await;
        compile.await.unwrap().unwrap();
        dispose.await.unwrap().unwrap();

        // The host closed stdin: the fake sees EOF.
        assert_eq!(fake.next().await, None);
    }

    #[tokio::test]
    async fn test_child_exit_fails_active_compilations() {
        let (compiler, mut fake) = host_pair();

        let first = {
            let compiler = compiler.clone();
            tokio::spawn(
                async move { compiler.compile_string("", &StringOptions::default()).await },
            )
        };
        let second = {
            let compiler = compiler.clone();
            tokio::spawn(
                async move { compiler.compile_string("", &StringOptions::default()).await },
            )
        };
        let _ = fake.next_compile_request().await;
        let _ = fake.next_compile_request().await;

        // The compiler hangs up without answering.
        drop(fake);

        for compile in [first, second] {
            let err = compile.await.unwrap().unwrap_err();
            assert!(matches!(err, Error::ChildExited), "{err}");
        }

        // The failure is sticky.
        let err = compiler
            .compile_string("", &StringOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ChildExited), "{err}");
    }

    #[tokio::test]
    async fn test_version_query() {
        let (compiler, mut fake) = host_pair();

        let version = {
            let compiler = compiler.clone();
            tokio::spawn(async move { compiler.version().await })
        };

        let (envelope_id, request) = match fake.next().await {
            Some((
                envelope_id,
                InboundMessage {
                    message: Some(inbound_message::Message::VersionRequest(request)),
                },
            )) => (envelope_id, request),
            other => panic!("expected a version request, got {other:?}"),
        };
        assert_eq!(envelope_id, 0);

        fake.send(
            0,
            outbound_message::Message::VersionResponse(outbound_message::VersionResponse {
                id: request.id,
                protocol_version: "3.2.0".to_string(),
                compiler_version: "1.77.0".to_string(),
                implementation_version: "1.77.0".to_string(),
                implementation_name: "dart-sass".to_string(),
            }),
        )
        .await;

        let version = version.await.unwrap().unwrap();
        assert_eq!(version.protocol_version, "3.2.0");
        assert_eq!(version.implementation_name, "dart-sass");
    }

    #[tokio::test]
    async fn test_standalone_protocol_error_poisons_the_host() {
        let (compiler, mut fake) = host_pair();

        let compile = {
            let compiler = compiler.clone();
            tokio::spawn(
                async move { compiler.compile_string("", &StringOptions::default()).await },
            )
        };
        let _ = fake.next_compile_request().await;

        fake.send(
            0,
            outbound_message::Message::Error(proto_sass::ProtocolError {
                r#type: proto_sass::ProtocolErrorType::Parse as i32,
                id: u32::MAX,
                message: "host wrote garbage".to_string(),
            }),
        )
        .await;

        let err = compile.await.unwrap().unwrap_err();
        assert_eq!(err.to_string(), "Compiler reported error: host wrote garbage");
    }
}
