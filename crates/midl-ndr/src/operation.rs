//! Contract between generated stubs and the engine
//!
//! A generated interface file defines, per method, a request structure, a
//! response structure and an operation type tying them to the opnum. The
//! transport dispatches on [`NdrOperation::OPNUM`]; this crate only turns
//! the payloads into stub data and back.

use bytes::Bytes;
use tracing::debug;

use crate::{decode_from_bytes, encode_to_bytes, NdrContext, NdrDecode, NdrEncode, Result};

/// Fix-ups applied to a payload before it is marshaled.
///
/// `prepare_payload` is where a stub derives dependent fields, such as a
/// `[size_is]` count from the length of the buffer it describes.
/// `after_prepare_payload` is left for hand-written code that validates or
/// adjusts the result; returning `NdrError::InvalidPayload` aborts the call.
pub trait PreparePayload {
    fn prepare_payload(&mut self) -> Result<()> {
        Ok(())
    }

    fn after_prepare_payload(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Run both prepare hooks in order.
pub fn prepare<P: PreparePayload + ?Sized>(payload: &mut P) -> Result<()> {
    payload.prepare_payload()?;
    payload.after_prepare_payload()
}

/// One RPC method of a generated interface
pub trait NdrOperation {
    type Request: NdrEncode + NdrDecode + PreparePayload;
    type Response: NdrEncode + NdrDecode + PreparePayload;

    /// Operation number within the interface
    const OPNUM: u16;

    /// Method name, for diagnostics
    const NAME: &'static str;

    fn marshal_request(request: &mut Self::Request, ctx: NdrContext) -> Result<Bytes> {
        prepare(request)?;
        let bytes = encode_to_bytes(&*request, ctx)?;
        debug!(opnum = Self::OPNUM, name = Self::NAME, len = bytes.len(), "marshaled request");
        Ok(bytes)
    }

    fn unmarshal_request(data: impl Into<Bytes>, ctx: NdrContext) -> Result<Self::Request> {
        let request = decode_from_bytes(data, ctx)?;
        debug!(opnum = Self::OPNUM, name = Self::NAME, "unmarshaled request");
        Ok(request)
    }

    fn marshal_response(response: &mut Self::Response, ctx: NdrContext) -> Result<Bytes> {
        prepare(response)?;
        let bytes = encode_to_bytes(&*response, ctx)?;
        debug!(opnum = Self::OPNUM, name = Self::NAME, len = bytes.len(), "marshaled response");
        Ok(bytes)
    }

    fn unmarshal_response(data: impl Into<Bytes>, ctx: NdrContext) -> Result<Self::Response> {
        let response = decode_from_bytes(data, ctx)?;
        debug!(opnum = Self::OPNUM, name = Self::NAME, "unmarshaled response");
        Ok(response)
    }
}
