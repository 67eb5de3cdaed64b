//! NDR encoding trait

use bytes::Bytes;

use crate::{NdrContext, NdrWriter, Result};

/// Trait for types that can be encoded to NDR format
pub trait NdrEncode {
    /// Encode this value at the writer's current position.
    ///
    /// The value is borrowed for `'a` so pointer bodies can be queued on the
    /// writer and encoded when the enclosing block is flushed.
    fn ndr_encode<'a>(&'a self, w: &mut NdrWriter<'a>) -> Result<()>;

    /// Get the NDR alignment requirement for this type
    fn ndr_align() -> usize
    where
        Self: Sized,
    {
        1
    }
}

/// Encode a complete stub body: the value, then every deferred pointer body.
pub fn encode_to_bytes<T: NdrEncode>(value: &T, ctx: NdrContext) -> Result<Bytes> {
    let mut w = NdrWriter::new(ctx);
    value.ndr_encode(&mut w)?;
    w.finish()
}
