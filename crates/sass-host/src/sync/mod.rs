//! The strictly synchronous compiler host.
//!
//! Worker threads own the child's stdout and stderr and post
//! `{stdout | stderr | exit | error}` events into a shared [`Mailbox`];
//! the calling thread blocks in `yield_next` and drives the dispatch loop
//! without ever yielding to an executor. One compilation runs at a time,
//! and because compile methods take `&mut self`, a callback can't start a
//! nested compilation on the same host.

mod mailbox;

use crate::compiler_path;
use crate::dispatcher::{SyncDispatcher, SyncFlow};
use crate::framer::{self, PacketFramer};
use crate::functions::FunctionRegistry;
use crate::host::{finish_response, CompileResult, Version};
use crate::importers::{self, SyncImporterRegistry};
use crate::logger::Logger;
use crate::options::{build_request, SyncOptions, SyncStringOptions};
use crate::{codec, Error, Result};
use mailbox::{Event, Mailbox};
use proto_sass::inbound_message::{self, compile_request, CompileRequest};
use proto_sass::outbound_message;
use proto_sass::InboundMessage;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

/// The sync host runs one compilation at a time, so the set of active
/// compilations empties between calls and the ID counter stays reset.
const COMPILATION_ID: u32 = 1;

/// Launch a compiler child process and return a strictly synchronous host
/// for it.
///
/// This factory is the only way to construct a [`SyncCompiler`].
pub fn init_sync_compiler() -> Result<SyncCompiler> {
    let program = compiler_path::resolve()?;
    SyncCompiler::spawn(crate::child::embedded_command(&program))
}

/// A handle on one compiler child process, driven without an executor.
pub struct SyncCompiler {
    stdin: Option<Box<dyn Write + Send>>,
    mailbox: Arc<Mailbox>,
    framer: PacketFramer,
    threads: Vec<std::thread::JoinHandle<()>>,
    next_version_id: u32,
    exited: Option<std::process::ExitStatus>,
    fatal: Option<Error>,
}

impl SyncCompiler {
    fn spawn(mut command: std::process::Command) -> Result<Self> {
        let mut child = command
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()?;

        tracing::debug!(pid = child.id(), "started compiler child process");

        let stdin = child.stdin.take().expect("child stdin is piped");
        let stdout = child.stdout.take().expect("child stdout is piped");
        let stderr = child.stderr.take().expect("child stderr is piped");
        Ok(Self::from_transport(
            Box::new(stdin),
            Box::new(stdout),
            Box::new(stderr),
            Some(child),
        ))
    }

    /// Assemble a host over arbitrary blocking pipes. Production use goes
    /// through [`init_sync_compiler`]; tests drive this with `os_pipe`.
    fn from_transport(
        stdin: Box<dyn Write + Send>,
        stdout: Box<dyn Read + Send>,
        stderr: Box<dyn Read + Send>,
        child: Option<std::process::Child>,
    ) -> Self {
        let mailbox = Arc::new(Mailbox::new());

        // The stdout thread owns the child: after stdout's EOF it reaps
        // the exit status, posts it, and closes the mailbox.
        let stdout_thread = {
            let mailbox = Arc::clone(&mailbox);
            std::thread::spawn(move || {
                read_into_mailbox(stdout, &mailbox, Event::Stdout);
                if let Some(mut child) = child {
                    match child.wait() {
                        Ok(status) => {
                            mailbox.post(Event::Exit(status));
                        }
                        Err(err) => {
                            mailbox.post(Event::Error(err));
                        }
                    }
                }
                mailbox.close();
            })
        };
        let stderr_thread = {
            let mailbox = Arc::clone(&mailbox);
            std::thread::spawn(move || {
                read_into_mailbox(stderr, &mailbox, Event::Stderr);
            })
        };

        Self {
            stdin: Some(stdin),
            mailbox,
            framer: PacketFramer::new(),
            threads: vec![stdout_thread, stderr_thread],
            next_version_id: 1,
            exited: None,
            fatal: None,
        }
    }

    /// Compile the stylesheet at `path`, blocking until the result.
    pub fn compile(&mut self, path: impl AsRef<Path>, options: &SyncOptions) -> Result<CompileResult> {
        let importers = SyncImporterRegistry::new(&options.importers, &options.load_paths)?;
        let functions = FunctionRegistry::new(&options.functions)?;
        let input = compile_request::Input::Path(importers::absolute_path(path.as_ref())?);
        let request = build_request(
            input,
            options,
            importers.entries(),
            functions.global_signatures(),
        );
        self.run(request, importers, functions, options.logger.clone())
    }

    /// Compile a stylesheet from source text, blocking until the result.
    pub fn compile_string(
        &mut self,
        source: &str,
        options: &SyncStringOptions,
    ) -> Result<CompileResult> {
        let mut importers =
            SyncImporterRegistry::new(&options.options.importers, &options.options.load_paths)?;
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
    }

    /// Query the compiler's version metadata.
    pub fn version(&mut self) -> Result<Version> {
        self.check_health()?;
        let id = self.next_version_id;
        self.next_version_id += 1;
        self.write(
            0,
            inbound_message::Message::VersionRequest(inbound_message::VersionRequest { id }),
        )?;

        loop {
            for message in self.next_decoded()? {
                match message {
                    (0, outbound_message::Message::VersionResponse(response))
                        if response.id == id =>
                    {
                        return Ok(Version {
                            protocol_version: response.protocol_version,
                            compiler_version: response.compiler_version,
                            implementation_version: response.implementation_version,
                            implementation_name: response.implementation_name,
                        });
                    }
                    (0, outbound_message::Message::Error(error)) => {
                        return Err(self.poison(Error::CompilerReported(error.message)));
                    }
                    (compilation_id, _) => {
                        return Err(self.poison(Error::CompilerProtocol(format!(
                            "unexpected message for compilation ID {compilation_id} while awaiting a version"
                        ))));
                    }
                }
            }
        }
    }

    /// Close the child's stdin and block until it exits.
    pub fn dispose(mut self) -> Result<()> {
        self.stdin = None;

        loop {
            match self.mailbox.yield_next() {
                Some(Event::Stderr(bytes)) => forward_stderr(&bytes),
                Some(Event::Exit(status)) => {
                    self.exited = Some(status);
                }
                Some(Event::Stdout(_)) => {
                    tracing::debug!("ignoring compiler output during disposal");
                }
                Some(Event::Error(_)) => {}
                None => break,
            }
        }
        for thread in self.threads.drain(..) {
            _ = thread.join();
        }

        match self.exited {
            Some(status) if !status.success() => Err(Error::ChildExited),
            _ => Ok(()),
        }
    }

    fn run(
        &mut self,
        request: CompileRequest,
        importers: SyncImporterRegistry,
        functions: FunctionRegistry,
        logger: Option<Arc<dyn Logger>>,
    ) -> Result<CompileResult> {
        self.check_health()?;
        let mut dispatcher = SyncDispatcher::new(importers, functions, logger);
        self.write(
            COMPILATION_ID,
            inbound_message::Message::CompileRequest(request),
        )?;

        loop {
            for (compilation_id, message) in self.next_decoded()? {
                if compilation_id != COMPILATION_ID {
                    if compilation_id == 0 {
                        if let outbound_message::Message::Error(error) = message {
                            return Err(self.poison(Error::CompilerReported(error.message)));
                        }
                    }
                    return Err(self.poison(Error::CompilerProtocol(format!(
                        "unknown compilation ID {compilation_id}"
                    ))));
                }
                match dispatcher.handle(message) {
                    Ok(SyncFlow::Continue) => {}
                    Ok(SyncFlow::Respond(response)) => self.write(COMPILATION_ID, response)?,
                    Ok(SyncFlow::Done(response)) => return finish_response(response),
                    Err(error) => return Err(self.poison(error)),
                }
            }
        }
    }

    /// Block for the next batch of decoded messages from the child.
    fn next_decoded(&mut self) -> Result<Vec<(u32, outbound_message::Message)>> {
        loop {
            let event = match self.mailbox.yield_next() {
                Some(event) => event,
                None => return Err(self.poison(Error::ChildExited)),
            };
            match event {
                Event::Stderr(bytes) => forward_stderr(&bytes),
                Event::Error(err) => {
                    let error = Error::from(err);
                    return Err(self.poison(error));
                }
                Event::Exit(status) => {
                    self.exited = Some(status);
                    return Err(self.poison(Error::ChildExited));
                }
                Event::Stdout(bytes) => {
                    let payloads = self.framer.feed(&bytes);
                    if payloads.is_empty() {
                        continue;
                    }
                    let mut messages = Vec::with_capacity(payloads.len());
                    for payload in payloads {
                        let (compilation_id, message) = match codec::decode(&payload) {
                            Ok(decoded) => decoded,
                            Err(error) => return Err(self.poison(error)),
                        };
                        let Some(message) = message.message else {
                            return Err(self.poison(Error::CompilerProtocol(
                                "OutboundMessage.message is not set".to_string(),
                            )));
                        };
                        messages.push((compilation_id, message));
                    }
                    return Ok(messages);
                }
            }
        }
    }

    fn write(&mut self, compilation_id: u32, message: inbound_message::Message) -> Result<()> {
        let stdin = self.stdin.as_mut().ok_or(Error::HostDisposed)?;
        let payload = codec::encode(
            compilation_id,
            &InboundMessage {
                message: Some(message),
            },
        );
        stdin.write_all(&framer::frame(&payload))?;
        stdin.flush()?;
        Ok(())
    }

    fn check_health(&self) -> Result<()> {
        match &self.fatal {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn poison(&mut self, error: Error) -> Error {
        self.fatal.get_or_insert(error.clone());
        error
    }
}

fn read_into_mailbox(
    mut reader: Box<dyn Read + Send>,
    mailbox: &Mailbox,
    wrap: impl Fn(Vec<u8>) -> Event,
) {
    let mut buf = [0u8; 8192];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => return,
            Ok(n) => {
                if !mailbox.post(wrap(buf[..n].to_vec())) {
                    return;
                }
            }
            Err(err) => {
                mailbox.post(Event::Error(err));
                return;
            }
        }
    }
}

fn forward_stderr(bytes: &[u8]) {
    _ = std::io::stderr().write_all(bytes); // Best-effort, verbatim.
}
