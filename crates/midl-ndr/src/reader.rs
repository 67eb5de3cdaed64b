//! NDR input stream and bounds guard
//!
//! [`NdrReader`] owns the input of one decode pass, the referent table that
//! resolves pointer aliases, and the deferred-body queue. Every count read
//! from the wire goes through [`NdrReader::validate_count`] before anything
//! is allocated for it.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use bytes::{Buf, Bytes};
use tracing::{debug, trace, warn};

use crate::deferred::DeferredQueue;
use crate::primitives::NdrScalar;
use crate::{NdrContext, NdrError, Result};

/// Queued pointer body, run when the reader is flushed
pub type DeferredDecode = Box<dyn FnOnce(&mut NdrReader) -> Result<()>>;

/// The pointer body currently being decoded
#[derive(Debug, Clone, Copy)]
pub(crate) struct ReferentFrame {
    pub(crate) id: u64,
    /// 1 for a pointer read outside any body
    pub(crate) depth: usize,
}

/// Decoder for a single NDR stream
pub struct NdrReader {
    buf: Bytes,
    pub(crate) ctx: NdrContext,
    /// Stream offset of the first input byte
    base: usize,
    total: usize,
    pub(crate) referents: HashMap<u64, Rc<dyn Any>>,
    pub(crate) deferred: DeferredQueue<DeferredDecode>,
    pub(crate) current: Option<ReferentFrame>,
    /// Referent IDs read inside each body, keyed by the body's own ID
    edges: HashMap<u64, Vec<u64>>,
    walked: usize,
}

impl NdrReader {
    pub fn new(data: impl Into<Bytes>, ctx: NdrContext) -> Self {
        Self::with_offset(data, ctx, 0)
    }

    /// Create a reader whose first byte sits at `base` in the stub data.
    pub fn with_offset(data: impl Into<Bytes>, ctx: NdrContext, base: usize) -> Self {
        let buf = data.into();
        Self {
            total: buf.len(),
            buf,
            ctx,
            base,
            referents: HashMap::new(),
            deferred: DeferredQueue::new(),
            current: None,
            edges: HashMap::new(),
            walked: 0,
        }
    }

    pub fn context(&self) -> &NdrContext {
        &self.ctx
    }

    /// Current stream offset
    #[inline]
    pub fn position(&self) -> usize {
        self.base + (self.total - self.buf.len())
    }

    /// Unread input bytes
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// Number of pointer bodies waiting for a flush
    pub fn pending_deferred(&self) -> usize {
        self.deferred.len()
    }

    /// Flush every remaining pointer body and return the unread input.
    pub fn finish(mut self) -> Result<Bytes> {
        self.flush_deferred()?;
        Ok(self.buf)
    }

    /// Fail with `TruncatedInput` unless `needed` bytes remain.
    #[inline]
    pub fn ensure(&self, needed: usize) -> Result<()> {
        if self.buf.remaining() < needed {
            return Err(NdrError::TruncatedInput {
                needed,
                have: self.buf.remaining(),
            });
        }
        Ok(())
    }

    /// Reject a wire-declared element count that cannot be satisfied by the
    /// remaining input, before anything is allocated for it.
    ///
    /// `width` is the minimum encoded size of one element. Returns the count
    /// as a `usize` ready for allocation.
    pub fn validate_count(&self, count: u64, width: usize) -> Result<usize> {
        let remaining = self.remaining();
        let fits = count
            .checked_mul(width.max(1) as u64)
            .map_or(false, |bytes| bytes <= remaining as u64);
        if !fits {
            debug!(count, width, remaining, "rejecting wire count larger than input");
            return Err(NdrError::BufferOverflow {
                count,
                width,
                remaining,
            });
        }
        if count > self.ctx.max_elements as u64 {
            debug!(count, limit = self.ctx.max_elements, "rejecting wire count above ceiling");
            return Err(NdrError::AllocationLimitExceeded {
                requested: count,
                limit: self.ctx.max_elements,
            });
        }
        usize::try_from(count).map_err(|_| NdrError::IntegerOverflow)
    }

    /// Skip padding until the position is a multiple of `alignment`.
    ///
    /// Padding content is ignored unless the context is strict.
    pub fn align(&mut self, alignment: usize) -> Result<()> {
        let alignment = NdrContext::effective_alignment(alignment, self.position())?;
        let padding = NdrContext::align_padding(self.position(), alignment);
        self.ensure(padding)?;
        if let Some(at) = self.buf[..padding].iter().position(|b| *b != 0) {
            let offset = self.position() + at;
            if self.ctx.strict_padding {
                warn!(offset, "non-zero padding in strict mode");
                return Err(NdrError::NonZeroPadding { offset });
            }
            trace!(offset, "ignoring non-zero padding");
        }
        self.buf.advance(padding);
        if self.position() % alignment != 0 {
            return Err(NdrError::MisalignedStream {
                offset: self.position(),
                alignment,
            });
        }
        Ok(())
    }

    /// Skip the alignment before a union arm. NDR20 has no arm alignment.
    pub fn align_union(&mut self, alignment: usize) -> Result<()> {
        if self.ctx.is_ndr64() {
            self.align(alignment)?;
        }
        Ok(())
    }

    /// Skip a structure's tail padding. Only NDR64 pads structure tails.
    pub fn trailing_gap(&mut self, alignment: usize) -> Result<()> {
        if self.ctx.is_ndr64() {
            self.align(alignment)?;
        }
        Ok(())
    }

    /// Copy bytes verbatim, without alignment.
    pub fn read_raw(&mut self, out: &mut [u8]) -> Result<()> {
        self.ensure(out.len())?;
        self.buf.copy_to_slice(out);
        Ok(())
    }

    /// Split off `count` bytes without copying. The count goes through the
    /// bounds guard first.
    pub fn read_bytes(&mut self, count: u64) -> Result<Bytes> {
        let count = self.validate_count(count, 1)?;
        Ok(self.buf.split_to(count))
    }

    /// Read an integer at its natural alignment.
    pub fn read_scalar<S: NdrScalar>(&mut self) -> Result<S> {
        self.align(S::WIDTH)?;
        self.ensure(S::WIDTH)?;
        Ok(S::get(&self.ctx, &mut self.buf))
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.read_scalar()
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        self.read_scalar()
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_scalar()
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        self.read_scalar()
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_scalar()
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.read_scalar()
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.read_scalar()
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.read_scalar()
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.align(4)?;
        self.ensure(4)?;
        Ok(self.ctx.get_f32(&mut self.buf))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.align(8)?;
        self.ensure(8)?;
        Ok(self.ctx.get_f64(&mut self.buf))
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Read an enum tag: 16 bits in NDR20, 32 bits in NDR64.
    pub fn read_enum(&mut self) -> Result<u16> {
        if self.ctx.is_ndr64() {
            let value = self.read_u32()?;
            u16::try_from(value).map_err(|_| NdrError::InvalidEnumValue(value.into()))
        } else {
            self.read_u16()
        }
    }

    /// Read the conformance (maximum element count) of an array.
    ///
    /// The value is not validated here; pass it through
    /// [`validate_count`](Self::validate_count) before allocating.
    pub fn read_size(&mut self) -> Result<u64> {
        self.read_count()
    }

    /// Read the actual element count of a varying array.
    pub fn read_length(&mut self) -> Result<u64> {
        self.read_count()
    }

    /// Read the variance (offset, actual count) of a varying array.
    pub fn read_variance(&mut self) -> Result<(u64, u64)> {
        let offset = self.read_count()?;
        let length = self.read_count()?;
        Ok((offset, length))
    }

    fn read_count(&mut self) -> Result<u64> {
        if self.ctx.is_ndr64() {
            self.read_u64()
        } else {
            Ok(self.read_u32()?.into())
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
        self.current = None;
        if drained > 0 {
            trace!(drained, position = self.position(), "resolved deferred pointer bodies");
        }
        result
    }

    /// Record that the body being decoded points at `id`.
    ///
    /// An alias whose target can already reach the current body would make
    /// the body its own descendant, so it fails with `InvalidPointer`.
    pub(crate) fn link_referent(&mut self, id: u64, aliased: bool) -> Result<()> {
        let Some(frame) = self.current else {
            return Ok(());
        };
        if aliased && self.reaches(id, frame.id)? {
            warn!(id, parent = frame.id, "rejecting cyclic referent");
            return Err(NdrError::InvalidPointer(id));
        }
        self.edges.entry(frame.id).or_default().push(id);
        Ok(())
    }

    /// Depth-first search over recorded body edges. The total number of
    /// nodes visited per stream is bounded by the element ceiling.
    fn reaches(&mut self, from: u64, to: u64) -> Result<bool> {
        let mut stack = vec![from];
        let mut seen = HashSet::new();
        while let Some(id) = stack.pop() {
            if id == to {
                return Ok(true);
            }
            if !seen.insert(id) {
                continue;
            }
            self.walked += 1;
            if self.walked > self.ctx.max_elements {
                debug!(walked = self.walked, "referent graph walk above ceiling");
                return Err(NdrError::AllocationLimitExceeded {
                    requested: self.walked as u64,
                    limit: self.ctx.max_elements,
                });
            }
            if let Some(next) = self.edges.get(&id) {
                stack.extend(next.iter().copied());
            }
        }
        Ok(false)
    }
}
