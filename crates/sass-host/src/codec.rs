//! Packet payload ⇄ (compilation ID, protocol message).
//!
//! Every payload begins with a varint compilation ID; the remainder is the
//! protobuf encoding of one wrapper message. Compilation ID 0 is reserved
//! for messages without a compilation context.

use crate::{Error, Result};
use prost::Message as _;
use proto_sass::{outbound_message, InboundMessage, OutboundMessage};

/// Encode an inbound message into a packet payload.
pub(crate) fn encode(compilation_id: u32, message: &InboundMessage) -> Vec<u8> {
    let mut buf = Vec::with_capacity(
        prost::encoding::encoded_len_varint(compilation_id as u64) + message.encoded_len(),
    );
    prost::encoding::encode_varint(compilation_id as u64, &mut buf);
    message
        .encode(&mut buf)
        .expect("buf has pre-allocated capacity");
    buf
}

/// Decode a packet payload into its compilation ID and outbound message.
///
/// Unknown fields within a known message are skipped by the protobuf
/// decoder for forward compatibility; an unknown top-level tag leaves the
/// wrapper's oneof unset, which is rejected here.
pub(crate) fn decode(mut payload: &[u8]) -> Result<(u32, OutboundMessage)> {
    let id = prost::encoding::decode_varint(&mut payload)
        .map_err(|_| Error::CompilerProtocol("invalid compilation ID varint".to_string()))?;
    let id = u32::try_from(id)
        .map_err(|_| Error::CompilerProtocol(format!("compilation ID {id} is out of range")))?;

    let message = OutboundMessage::decode(payload)
        .map_err(|err| Error::CompilerProtocol(format!("invalid protocol buffer: {err}")))?;
    validate(&message)?;

    Ok((id, message))
}

fn validate(message: &OutboundMessage) -> Result<()> {
    use outbound_message::Message;

    match &message.message {
        None => Err(Error::CompilerProtocol(
            "OutboundMessage.message is not set".to_string(),
        )),
        Some(Message::CompileResponse(response)) if response.result.is_none() => Err(
            Error::CompilerProtocol("CompileResponse.result is not set".to_string()),
        ),
        Some(Message::FunctionCallRequest(request)) if request.identifier.is_none() => Err(
            Error::CompilerProtocol("FunctionCallRequest.identifier is not set".to_string()),
        ),
        Some(_) => Ok(()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use proto_sass::outbound_message::{compile_response, CompileResponse, LogEvent};

    fn ex_log_event() -> OutboundMessage {
        OutboundMessage {
            message: Some(outbound_message::Message::LogEvent(LogEvent {
                r#type: proto_sass::LogEventType::Debug as i32,
                message: "hello".to_string(),
                span: None,
                stack_trace: String::new(),
                formatted: "hello\n".to_string(),
                deprecation_type: None,
            })),
        }
    }

    #[test]
    fn test_round_trip() {
        // An inbound and outbound message share the envelope layout, so an
        // encoded inbound payload decodes as the outbound wrapper with the
        // same compilation ID.
        let payload = encode(7, &InboundMessage { message: None });
        assert_eq!(payload, vec![7]);

        let mut payload = vec![200, 1]; // varint 200
        payload.extend_from_slice(&ex_log_event().encode_to_vec());
        let (id, message) = decode(&payload).unwrap();
        assert_eq!(id, 200);
        assert_eq!(message, ex_log_event());
    }

    #[test]
    fn test_rejects_truncated_varint() {
        let err = decode(&[0x80]).unwrap_err();
        assert!(matches!(err, Error::CompilerProtocol(_)), "{err}");
    }

    #[test]
    fn test_rejects_out_of_range_compilation_id() {
        // Varint for 2^32.
        let err = decode(&[0x80, 0x80, 0x80, 0x80, 0x10]).unwrap_err();
        assert!(
            matches!(&err, Error::CompilerProtocol(m) if m.contains("out of range")),
            "{err}"
        );
    }

    #[test]
    fn test_rejects_unset_message() {
        let err = decode(&[1]).unwrap_err();
        assert!(
            matches!(&err, Error::CompilerProtocol(m) if m.contains("message is not set")),
            "{err}"
        );
    }

    #[test]
    fn test_rejects_compile_response_without_result() {
        let message = OutboundMessage {
            message: Some(outbound_message::Message::CompileResponse(CompileResponse {
                result: None,
                loaded_urls: Vec::new(),
            })),
        };
        let mut payload = vec![1];
        payload.extend_from_slice(&message.encode_to_vec());

        let err = decode(&payload).unwrap_err();
        assert!(
            matches!(&err, Error::CompilerProtocol(m) if m.contains("result is not set")),
            "{err}"
        );

        let message = OutboundMessage {
            message: Some(outbound_message::Message::CompileResponse(CompileResponse {
                result: Some(compile_response::Result::Success(
                    compile_response::CompileSuccess {
                        css: "a {\n  b: c;\n}".to_string(),
                        source_map: String::new(),
                    },
                )),
                loaded_urls: Vec::new(),
            })),
        };
        let mut payload = vec![1];
        payload.extend_from_slice(&message.encode_to_vec());
        assert_eq!(decode(&payload).unwrap(), (1, message));
    }
}
