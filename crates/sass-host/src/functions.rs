//! Custom functions callable from the stylesheet, and the per-compilation
//! function registry.
//!
//! Globally registered functions are dispatched by name; anonymous
//! functions returned as values are dispatched by a host-minted ID. The
//! compiler quoting an ID the host never minted is a protocol error,
//! whereas an unknown name is answered with an error response and left for
//! the compiler to turn into a compilation failure.

use crate::value::convert::{self, ArgumentListTracker, HostFunctionIds};
use crate::value::{HostCallback, HostFunction, Value};
use crate::{Error, Result};
use proto_sass::inbound_message::{function_call_response, FunctionCallResponse};
use proto_sass::outbound_message::{function_call_request::Identifier, FunctionCallRequest};
use std::collections::HashMap;

pub(crate) struct FunctionRegistry {
    by_name: HashMap<String, HostFunction>,
    by_id: HashMap<u32, HostFunction>,
    // Callback identity -> minted ID, so re-serializing one function value
    // reuses its ID instead of growing the table.
    ids_by_identity: HashMap<usize, u32>,
    next_id: u32,
    signatures: Vec<String>,
}

impl FunctionRegistry {
    pub fn new(functions: &[HostFunction]) -> Result<Self> {
        let mut registry = Self {
            by_name: HashMap::new(),
            by_id: HashMap::new(),
            ids_by_identity: HashMap::new(),
            next_id: 0,
            signatures: Vec::new(),
        };
        for function in functions {
            let name = function_name(function.signature())?;
            registry.signatures.push(function.signature().to_string());
            registry.by_name.insert(name, function.clone());
        }
        Ok(registry)
    }

    /// Signatures for the compile request's `global_functions` list.
    pub fn global_signatures(&self) -> Vec<String> {
        self.signatures.clone()
    }

    pub async fn call(&mut self, request: &FunctionCallRequest) -> Result<FunctionCallResponse> {
        let (function, mut lists, arguments) = match self.prepare(request)? {
            Prepared::Ready(parts) => parts,
            Prepared::Unknown(response) => return Ok(response),
        };
        let outcome = match function.callback() {
            HostCallback::Sync(callback) => callback(arguments),
            HostCallback::Async(callback) => callback(arguments).await,
        };
        Ok(self.finish(request.id, outcome, &mut lists))
    }

    /// Like [`FunctionRegistry::call`], but refuses to suspend: a function
    /// registered with a future-returning callback is answered with an
    /// error response.
    pub fn call_sync(&mut self, request: &FunctionCallRequest) -> Result<FunctionCallResponse> {
        let (function, mut lists, arguments) = match self.prepare(request)? {
            Prepared::Ready(parts) => parts,
            Prepared::Unknown(response) => return Ok(response),
        };
        let outcome = match function.callback() {
            HostCallback::Sync(callback) => callback(arguments),
            HostCallback::Async(_) => Err(anyhow::anyhow!(
                "the function {:?} returns a future and can't be called from the synchronous compiler",
                function.signature()
            )),
        };
        Ok(self.finish(request.id, outcome, &mut lists))
    }

    fn prepare(&self, request: &FunctionCallRequest) -> Result<Prepared> {
        let identifier = request.identifier.as_ref().ok_or_else(|| {
            Error::CompilerProtocol("FunctionCallRequest.identifier is not set".to_string())
        })?;

        let function = match identifier {
            Identifier::Name(name) => match self.by_name.get(name) {
                Some(function) => function.clone(),
                None => {
                    return Ok(Prepared::Unknown(error_response(
                        request.id,
                        format!("no global function is registered with the name {name:?}"),
                    )))
                }
            },
            Identifier::FunctionId(id) => match self.by_id.get(id) {
                Some(function) => function.clone(),
                None => {
                    return Err(Error::CompilerProtocol(format!(
                        "unknown FunctionCallRequest.function_id {id}"
                    )))
                }
            },
        };

        let mut lists = ArgumentListTracker::default();
        let mut arguments = Vec::with_capacity(request.arguments.len());
        for argument in &request.arguments {
            arguments.push(convert::from_proto(argument.clone(), &mut lists)?);
        }
        Ok(Prepared::Ready((function, lists, arguments)))
    }

    fn finish(
        &mut self,
        id: u32,
        outcome: anyhow::Result<Value>,
        lists: &mut ArgumentListTracker,
    ) -> FunctionCallResponse {
        use function_call_response::Result as WireResult;

        let result = match outcome {
            Ok(value) => WireResult::Success(convert::to_proto(&value, self)),
            Err(err) => WireResult::Error(format!("{err:#}")),
        };
        FunctionCallResponse {
            id,
            result: Some(result),
            accessed_argument_lists: lists.accessed_ids(),
        }
    }
}

enum Prepared {
    Ready((HostFunction, ArgumentListTracker, Vec<Value>)),
    Unknown(FunctionCallResponse),
}

impl HostFunctionIds for FunctionRegistry {
    fn register_anonymous(&mut self, function: &HostFunction) -> u32 {
        if let Some(id) = self.ids_by_identity.get(&function.callback_identity()) {
            return *id;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.ids_by_identity
            .insert(function.callback_identity(), id);
        self.by_id.insert(id, function.clone());
        id
    }
}

fn error_response(id: u32, message: String) -> FunctionCallResponse {
    FunctionCallResponse {
        id,
        result: Some(function_call_response::Result::Error(message)),
        accessed_argument_lists: Vec::new(),
    }
}

/// The name a signature registers under: everything before the `(`.
fn function_name(signature: &str) -> Result<String> {
    let invalid = || {
        Error::InvalidOption(format!(
            "function signature {signature:?} must be of the form name($arguments...)"
        ))
    };
    match signature.find('(') {
        None | Some(0) => Err(invalid()),
        Some(_) if !signature.ends_with(')') => Err(invalid()),
        Some(paren) => Ok(signature[..paren].to_string()),
    }
}
