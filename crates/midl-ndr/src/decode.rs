//! NDR decoding trait

use bytes::Bytes;

use crate::{NdrContext, NdrReader, Result};

/// Trait for types that can be decoded from NDR format
pub trait NdrDecode: Sized {
    /// Decode a value at the reader's current position.
    ///
    /// Pointer fields come back as pending referents; they are filled in
    /// when the reader's deferred queue is flushed.
    fn ndr_decode(r: &mut NdrReader) -> Result<Self>;

    /// Get the NDR alignment requirement for this type.
    ///
    /// Also used by the bounds guard as the minimum encoded width of one
    /// element.
    fn ndr_align() -> usize {
        1
    }
}

/// Decode a complete stub body, resolving every deferred pointer body.
pub fn decode_from_bytes<T: NdrDecode>(data: impl Into<Bytes>, ctx: NdrContext) -> Result<T> {
    let mut r = NdrReader::new(data, ctx);
    let value = T::ndr_decode(&mut r)?;
    r.finish()?;
    Ok(value)
}
