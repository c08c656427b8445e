//! Per-compilation request/response routing.
//!
//! A dispatcher owns the callbacks of exactly one compilation: it writes
//! the compile request, answers the compiler's canonicalize/import/
//! file-import/function-call requests (re-entrantly if a callback starts
//! another compilation), routes log events, and resolves with the terminal
//! compile response. Its state machine is `idle -> running -> (done |
//! failed)`; the host stops routing messages to it once it terminates.

use crate::functions::FunctionRegistry;
use crate::importers::{ImporterRegistry, SyncImporterRegistry};
use crate::logger::{DebugDetails, DefaultLogger, Logger, WarnDetails};
use crate::span::Span;
use crate::tracker::{RequestTracker, ResponseKind};
use crate::{codec, framer};
use crate::{Error, Result};
use proto_sass::inbound_message::{self, CompileRequest};
use proto_sass::outbound_message::{self, CompileResponse, LogEvent};
use proto_sass::{InboundMessage, LogEventType, OutboundMessage};
use std::sync::Arc;
use tokio::sync::mpsc;

/// What the host delivers to a dispatcher's inbox.
pub(crate) enum DispatchEvent {
    Message(OutboundMessage),
    /// The host failed this compilation from outside the message flow,
    /// e.g. because the child exited.
    Failed(Error),
}

pub(crate) struct Dispatcher {
    compilation_id: u32,
    importers: ImporterRegistry,
    functions: FunctionRegistry,
    tracker: RequestTracker,
    logger: Option<Arc<dyn Logger>>,
    writer: mpsc::UnboundedSender<Vec<u8>>,
}

impl Dispatcher {
    pub fn new(
        compilation_id: u32,
        importers: ImporterRegistry,
        functions: FunctionRegistry,
        logger: Option<Arc<dyn Logger>>,
        writer: mpsc::UnboundedSender<Vec<u8>>,
    ) -> Self {
        Self {
            compilation_id,
            importers,
            functions,
            tracker: RequestTracker::default(),
            logger,
            writer,
        }
    }

    /// Write the compile request, then service the compiler until the
    /// terminal response or a failure. Callable once: the dispatcher is
    /// consumed either way.
    pub async fn compile(
        mut self,
        request: CompileRequest,
        mut inbox: mpsc::UnboundedReceiver<DispatchEvent>,
    ) -> Result<CompileResponse> {
        use outbound_message::Message;

        self.send(inbound_message::Message::CompileRequest(request))?;

        while let Some(event) = inbox.recv().await {
            let message = match event {
                DispatchEvent::Message(message) => message,
                DispatchEvent::Failed(error) => return Err(error),
            };
            let Some(message) = message.message else {
                return Err(Error::CompilerProtocol(
                    "OutboundMessage.message is not set".to_string(),
                ));
            };

            match message {
                Message::CompileResponse(response) => return Ok(response),
                Message::LogEvent(event) => {
                    route_log_event(self.logger.as_deref(), event);
                }
                Message::CanonicalizeRequest(request) => {
                    self.tracker.add(request.id, ResponseKind::Canonicalize)?;
                    let response = self.importers.canonicalize(&request).await?;
                    self.tracker.resolve(request.id, ResponseKind::Canonicalize)?;
                    self.send(inbound_message::Message::CanonicalizeResponse(response))?;
                }
                Message::ImportRequest(request) => {
                    self.tracker.add(request.id, ResponseKind::Import)?;
                    let response = self.importers.import(&request).await?;
                    self.tracker.resolve(request.id, ResponseKind::Import)?;
                    self.send(inbound_message::Message::ImportResponse(response))?;
                }
                Message::FileImportRequest(request) => {
                    self.tracker.add(request.id, ResponseKind::FileImport)?;
                    let response = self.importers.file_import(&request).await?;
                    self.tracker.resolve(request.id, ResponseKind::FileImport)?;
                    self.send(inbound_message::Message::FileImportResponse(response))?;
                }
                Message::FunctionCallRequest(request) => {
                    self.tracker.add(request.id, ResponseKind::FunctionCall)?;
                    let response = self.functions.call(&request).await?;
                    self.tracker.resolve(request.id, ResponseKind::FunctionCall)?;
                    self.send(inbound_message::Message::FunctionCallResponse(response))?;
                }
                Message::Error(error) => {
                    return Err(Error::CompilerReported(error.message));
                }
                Message::VersionResponse(_) => {
                    return Err(Error::CompilerProtocol(
                        "unexpected VersionResponse within a compilation".to_string(),
                    ));
                }
            }
        }

        // The inbox closed without a terminal response: the host tore us
        // down while the child was still owing a reply.
        Err(Error::ChildExited)
    }

    fn send(&self, message: inbound_message::Message) -> Result<()> {
        let payload = codec::encode(
            self.compilation_id,
            &InboundMessage {
                message: Some(message),
            },
        );
        self.writer
            .send(framer::frame(&payload))
            .map_err(|_| Error::ChildExited)
    }
}

/// The dispatcher of the synchronous host: the same state machine, driven
/// by the caller's blocking loop. Responses are handed back for the caller
/// to write, since it owns the child's stdin.
pub(crate) struct SyncDispatcher {
    importers: SyncImporterRegistry,
    functions: FunctionRegistry,
    tracker: RequestTracker,
    logger: Option<Arc<dyn Logger>>,
}

/// The effect of one outbound message on a synchronous compilation.
pub(crate) enum SyncFlow {
    /// Write this response to the compiler and keep going.
    Respond(inbound_message::Message),
    /// Consumed without a reply.
    Continue,
    /// The terminal response arrived.
    Done(CompileResponse),
}

impl SyncDispatcher {
    pub fn new(
        importers: SyncImporterRegistry,
        functions: FunctionRegistry,
        logger: Option<Arc<dyn Logger>>,
    ) -> Self {
        Self {
            importers,
            functions,
            tracker: RequestTracker::default(),
            logger,
        }
    }

    pub fn handle(&mut self, message: outbound_message::Message) -> Result<SyncFlow> {
        use outbound_message::Message;

        Ok(match message {
            Message::CompileResponse(response) => SyncFlow::Done(response),
            Message::LogEvent(event) => {
                route_log_event(self.logger.as_deref(), event);
                SyncFlow::Continue
            }
            Message::CanonicalizeRequest(request) => {
                self.tracker.add(request.id, ResponseKind::Canonicalize)?;
                let response = self.importers.canonicalize(&request)?;
                self.tracker.resolve(request.id, ResponseKind::Canonicalize)?;
                SyncFlow::Respond(inbound_message::Message::CanonicalizeResponse(response))
            }
            Message::ImportRequest(request) => {
                self.tracker.add(request.id, ResponseKind::Import)?;
                let response = self.importers.import(&request)?;
                self.tracker.resolve(request.id, ResponseKind::Import)?;
                SyncFlow::Respond(inbound_message::Message::ImportResponse(response))
            }
            Message::FileImportRequest(request) => {
                self.tracker.add(request.id, ResponseKind::FileImport)?;
                let response = self.importers.file_import(&request)?;
                self.tracker.resolve(request.id, ResponseKind::FileImport)?;
                SyncFlow::Respond(inbound_message::Message::FileImportResponse(response))
            }
            Message::FunctionCallRequest(request) => {
                self.tracker.add(request.id, ResponseKind::FunctionCall)?;
                let response = self.functions.call_sync(&request)?;
                self.tracker.resolve(request.id, ResponseKind::FunctionCall)?;
                SyncFlow::Respond(inbound_message::Message::FunctionCallResponse(response))
            }
            Message::Error(error) => return Err(Error::CompilerReported(error.message)),
            Message::VersionResponse(_) => {
                return Err(Error::CompilerProtocol(
                    "unexpected VersionResponse within a compilation".to_string(),
                ));
            }
        })
    }
}

/// Deliver one log event to the compilation's logger, or to the default
/// stderr sink without one.
pub(crate) fn route_log_event(logger: Option<&dyn Logger>, event: LogEvent) {
    let logger = logger.unwrap_or(&DefaultLogger);
    let span = event.span.map(Span::from);

    match LogEventType::try_from(event.r#type) {
        Ok(LogEventType::Debug) => {
            logger.debug(
                &event.message,
                &DebugDetails {
                    span,
                    formatted: event.formatted,
                },
            );
        }
        Ok(kind) => {
            logger.warn(
                &event.message,
                &WarnDetails {
                    deprecation: kind == LogEventType::DeprecationWarning,
                    deprecation_type: event.deprecation_type,
                    span,
                    stack: (!event.stack_trace.is_empty()).then(|| event.stack_trace),
                    formatted: event.formatted,
                },
            );
        }
        Err(_) => {
            tracing::warn!(event_type = event.r#type, "ignoring log event of unknown type");
        }
    }
}
