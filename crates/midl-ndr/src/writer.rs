//! NDR output stream
//!
//! [`NdrWriter`] owns the buffer of one encode pass together with the pointer
//! registry and the deferred-body queue of that pass. Generated stubs drive
//! it field by field; it never sees interface definitions.

use std::collections::HashMap;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::deferred::DeferredQueue;
use crate::pointers::{PtrKey, REFERENT_ID_BASE};
use crate::primitives::NdrScalar;
use crate::{NdrContext, NdrError, Result};

/// Queued pointer body, run when the writer is flushed
pub type DeferredEncode<'a> = Box<dyn FnOnce(&mut NdrWriter<'a>) -> Result<()> + 'a>;

/// Encoder for a single NDR stream.
///
/// `'a` is the lifetime of the values being encoded: pointer bodies borrow
/// them until the queue is flushed.
pub struct NdrWriter<'a> {
    pub(crate) buf: BytesMut,
    pub(crate) ctx: NdrContext,
    /// Stream offset of `buf[0]`, used for alignment
    base: usize,
    pub(crate) referents: HashMap<PtrKey, u64>,
    pub(crate) next_referent: u64,
    pub(crate) deferred: DeferredQueue<DeferredEncode<'a>>,
}

impl<'a> NdrWriter<'a> {
    pub fn new(ctx: NdrContext) -> Self {
        Self::with_offset(ctx, 0)
    }

    /// Create a writer whose first byte sits at `base` in the stub data.
    pub fn with_offset(ctx: NdrContext, base: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            ctx,
            base,
            referents: HashMap::new(),
            next_referent: REFERENT_ID_BASE,
            deferred: DeferredQueue::new(),
        }
    }

    pub fn context(&self) -> &NdrContext {
        &self.ctx
    }

    /// Current stream offset
    #[inline]
    pub fn position(&self) -> usize {
        self.base + self.buf.len()
    }

    /// Bytes written so far
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Number of pointer bodies waiting for a flush
    pub fn pending_deferred(&self) -> usize {
        self.deferred.len()
    }

    /// Flush every remaining pointer body and return the encoded stream.
    pub fn finish(mut self) -> Result<Bytes> {
        self.flush_deferred()?;
        Ok(self.buf.freeze())
    }

    /// Take the buffer without flushing. Returns `None` if bodies are queued.
    pub(crate) fn into_flushed_buffer(self) -> Option<BytesMut> {
        if self.deferred.is_empty() {
            Some(self.buf)
        } else {
            None
        }
    }

    /// Write zero padding until the position is a multiple of `alignment`.
    pub fn align(&mut self, alignment: usize) -> Result<()> {
        let alignment = NdrContext::effective_alignment(alignment, self.position())?;
        let padding = NdrContext::align_padding(self.position(), alignment);
        self.buf.put_bytes(0, padding);
        if self.position() % alignment != 0 {
            return Err(NdrError::MisalignedStream {
                offset: self.position(),
                alignment,
            });
        }
        Ok(())
    }

    /// Align the start of a union arm. NDR20 has no arm alignment.
    pub fn align_union(&mut self, alignment: usize) -> Result<()> {
        if self.ctx.is_ndr64() {
            self.align(alignment)?;
        }
        Ok(())
    }

    /// Pad a structure out to its alignment. Only NDR64 pads structure tails.
    pub fn trailing_gap(&mut self, alignment: usize) -> Result<()> {
        if self.ctx.is_ndr64() {
            self.align(alignment)?;
        }
        Ok(())
    }

    /// Append bytes verbatim, without alignment.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    /// Write an integer at its natural alignment.
    pub fn write_scalar<S: NdrScalar>(&mut self, value: S) -> Result<()> {
        self.align(S::WIDTH)?;
        value.put(&self.ctx, &mut self.buf);
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_scalar(value)
    }

    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.write_scalar(value)
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_scalar(value)
    }

    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.write_scalar(value)
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_scalar(value)
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_scalar(value)
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.write_scalar(value)
    }

    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.write_scalar(value)
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.align(4)?;
        self.ctx.put_f32(&mut self.buf, value);
        Ok(())
    }

    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.align(8)?;
        self.ctx.put_f64(&mut self.buf, value);
        Ok(())
    }

    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_u8(u8::from(value))
    }

    /// Write an enum tag: 16 bits in NDR20, 32 bits in NDR64.
    pub fn write_enum(&mut self, value: u16) -> Result<()> {
        if self.ctx.is_ndr64() {
            self.write_u32(value.into())
        } else {
            self.write_u16(value)
        }
    }

    /// Write the conformance (maximum element count) of an array.
    pub fn write_size(&mut self, size: u64) -> Result<()> {
        self.write_count(size)
    }

    /// Write the actual element count of a varying array.
    pub fn write_length(&mut self, length: u64) -> Result<()> {
        self.write_count(length)
    }

    /// Write the variance (offset, actual count) of a varying array.
    pub fn write_variance(&mut self, offset: u64, length: u64) -> Result<()> {
        self.write_count(offset)?;
        self.write_count(length)
    }

    fn write_count(&mut self, count: u64) -> Result<()> {
        if self.ctx.is_ndr64() {
            self.write_u64(count)
        } else {
            let count = u32::try_from(count).map_err(|_| NdrError::IntegerOverflow)?;
            self.write_u32(count)
        }
    }

    /// Run every queued pointer body, FIFO, including bodies queued while
    /// draining. A flush requested from inside a running body is a no-op;
    /// the outer flush picks up whatever that body queued.
    pub fn flush_deferred(&mut self) -> Result<()> {
        if !self.deferred.begin_drain() {
            return Ok(());
        }
        let mut drained = 0usize;
        let result = loop {
            let Some(entry) = self.deferred.pop() else {
                break Ok(());
            };
            drained += 1;
            if let Err(e) = entry(self) {
                self.deferred.clear();
                break Err(e);
            }
        };
        self.deferred.end_drain();
        if drained > 0 {
            trace!(drained, position = self.position(), "flushed deferred pointer bodies");
        }
        result
    }
}
