//! NDR encoding/decoding context
//!
//! The context carries the negotiated stream parameters (byte order, transfer
//! syntax, padding strictness, allocation and nesting ceilings) and provides
//! helpers for alignment and byte-order-aware primitive encoding/decoding.

use bytes::{Buf, BufMut};

use crate::error::{NdrError, Result, MAX_NDR_ARRAY_ELEMENTS, MAX_NDR_POINTER_DEPTH};

/// Largest natural alignment of any NDR value
pub const MAX_ALIGNMENT: usize = 8;

/// Negotiated NDR transfer syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferSyntax {
    /// NDR 2.0: 32-bit referent IDs and counts, 16-bit enums
    #[default]
    Ndr20,
    /// NDR64: 64-bit referent IDs and counts, 32-bit enums
    Ndr64,
}

/// NDR encoding/decoding context
///
/// Fixed for the lifetime of one stream. Tracks the byte order and transfer
/// syntax and provides methods for encoding/decoding primitives.
#[derive(Debug, Clone, Copy)]
pub struct NdrContext {
    /// Whether to use little-endian byte order
    pub little_endian: bool,
    /// Transfer syntax negotiated for the presentation context
    pub syntax: TransferSyntax,
    /// Reject non-zero alignment padding on decode
    pub strict_padding: bool,
    /// Upper bound on any wire-declared element count
    pub max_elements: usize,
    /// Upper bound on pointer nesting accepted on decode
    pub max_depth: usize,
}

impl NdrContext {
    /// Create a new NDR context with little-endian byte order (default)
    pub fn new() -> Self {
        Self {
            little_endian: true,
            syntax: TransferSyntax::Ndr20,
            strict_padding: false,
            max_elements: MAX_NDR_ARRAY_ELEMENTS,
            max_depth: MAX_NDR_POINTER_DEPTH,
        }
    }

    /// Create a context with big-endian byte order
    pub fn big_endian() -> Self {
        Self::with_byte_order(false)
    }

    /// Create a context with specified byte order
    pub fn with_byte_order(little_endian: bool) -> Self {
        Self {
            little_endian,
            ..Self::new()
        }
    }

    /// Create a context from the packed data representation label of a PDU.
    ///
    /// The upper nibble of the first byte is the integer representation:
    /// zero means big endian, anything else little endian.
    pub fn from_data_representation(drep: [u8; 4]) -> Self {
        Self::with_byte_order(drep[0] & 0xF0 != 0)
    }

    /// Select the transfer syntax
    pub fn with_syntax(mut self, syntax: TransferSyntax) -> Self {
        self.syntax = syntax;
        self
    }

    /// Shorthand for `with_syntax(TransferSyntax::Ndr64)`
    pub fn ndr64(self) -> Self {
        self.with_syntax(TransferSyntax::Ndr64)
    }

    /// Reject non-zero padding bytes on decode
    pub fn strict(mut self) -> Self {
        self.strict_padding = true;
        self
    }

    /// Override the element ceiling applied by the bounds guard
    pub fn with_max_elements(mut self, max_elements: usize) -> Self {
        self.max_elements = max_elements;
        self
    }

    /// Override the pointer nesting ceiling
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[inline]
    pub fn is_ndr64(&self) -> bool {
        self.syntax == TransferSyntax::Ndr64
    }

    /// Wire width of a referent ID
    #[inline]
    pub fn pointer_size(&self) -> usize {
        if self.is_ndr64() { 8 } else { 4 }
    }

    /// Wire width of a size, offset or length field
    #[inline]
    pub fn count_size(&self) -> usize {
        if self.is_ndr64() { 8 } else { 4 }
    }

    /// Wire width of an enum tag
    #[inline]
    pub fn enum_size(&self) -> usize {
        if self.is_ndr64() { 4 } else { 2 }
    }

    /// Calculate padding needed to align to the given boundary
    #[inline]
    pub fn align_padding(position: usize, alignment: usize) -> usize {
        if alignment == 0 || alignment == 1 {
            return 0;
        }
        let remainder = position % alignment;
        if remainder == 0 {
            0
        } else {
            alignment - remainder
        }
    }

    /// Validate an alignment request and cap it at [`MAX_ALIGNMENT`].
    ///
    /// Alignments are powers of two; zero is treated as one. Anything else is
    /// a bug in the calling stub.
    pub(crate) fn effective_alignment(alignment: usize, offset: usize) -> Result<usize> {
        match alignment {
            0 => Ok(1),
            n if n.is_power_of_two() => Ok(n.min(MAX_ALIGNMENT)),
            n => Err(NdrError::MisalignedStream { offset, alignment: n }),
        }
    }

    // Primitive encoding methods

    /// Put a u8
    #[inline]
    pub fn put_u8<B: BufMut>(&self, buf: &mut B, value: u8) {
        buf.put_u8(value);
    }

    /// Put an i8
    #[inline]
    pub fn put_i8<B: BufMut>(&self, buf: &mut B, value: i8) {
        buf.put_i8(value);
    }

    /// Put a u16
    #[inline]
    pub fn put_u16<B: BufMut>(&self, buf: &mut B, value: u16) {
        if self.little_endian {
            buf.put_u16_le(value);
        } else {
            buf.put_u16(value);
        }
    }

    /// Put an i16
    #[inline]
    pub fn put_i16<B: BufMut>(&self, buf: &mut B, value: i16) {
        if self.little_endian {
            buf.put_i16_le(value);
        } else {
            buf.put_i16(value);
        }
    }

    /// Put a u32
    #[inline]
    pub fn put_u32<B: BufMut>(&self, buf: &mut B, value: u32) {
        if self.little_endian {
            buf.put_u32_le(value);
        } else {
            buf.put_u32(value);
        }
    }

    /// Put an i32
    #[inline]
    pub fn put_i32<B: BufMut>(&self, buf: &mut B, value: i32) {
        if self.little_endian {
            buf.put_i32_le(value);
        } else {
            buf.put_i32(value);
        }
    }

    /// Put a u64
    #[inline]
    pub fn put_u64<B: BufMut>(&self, buf: &mut B, value: u64) {
        if self.little_endian {
            buf.put_u64_le(value);
        } else {
            buf.put_u64(value);
        }
    }

    /// Put an i64
    #[inline]
    pub fn put_i64<B: BufMut>(&self, buf: &mut B, value: i64) {
        if self.little_endian {
            buf.put_i64_le(value);
        } else {
            buf.put_i64(value);
        }
    }

    /// Put an f32
    #[inline]
    pub fn put_f32<B: BufMut>(&self, buf: &mut B, value: f32) {
        if self.little_endian {
            buf.put_f32_le(value);
        } else {
            buf.put_f32(value);
        }
    }

    /// Put an f64
    #[inline]
    pub fn put_f64<B: BufMut>(&self, buf: &mut B, value: f64) {
        if self.little_endian {
            buf.put_f64_le(value);
        } else {
            buf.put_f64(value);
        }
    }

    // Primitive decoding methods. Callers check `remaining()` first.

    /// Get a u8
    #[inline]
    pub fn get_u8<B: Buf>(&self, buf: &mut B) -> u8 {
        buf.get_u8()
    }

    /// Get an i8
    #[inline]
    pub fn get_i8<B: Buf>(&self, buf: &mut B) -> i8 {
        buf.get_i8()
    }

    /// Get a u16
    #[inline]
    pub fn get_u16<B: Buf>(&self, buf: &mut B) -> u16 {
        if self.little_endian {
            buf.get_u16_le()
        } else {
            buf.get_u16()
        }
    }

    /// Get an i16
    #[inline]
    pub fn get_i16<B: Buf>(&self, buf: &mut B) -> i16 {
        if self.little_endian {
            buf.get_i16_le()
        } else {
            buf.get_i16()
        }
    }

    /// Get a u32
    #[inline]
    pub fn get_u32<B: Buf>(&self, buf: &mut B) -> u32 {
        if self.little_endian {
            buf.get_u32_le()
        } else {
            buf.get_u32()
        }
    }

    /// Get an i32
    #[inline]
    pub fn get_i32<B: Buf>(&self, buf: &mut B) -> i32 {
        if self.little_endian {
            buf.get_i32_le()
        } else {
            buf.get_i32()
        }
    }

    /// Get a u64
    #[inline]
    pub fn get_u64<B: Buf>(&self, buf: &mut B) -> u64 {
        if self.little_endian {
            buf.get_u64_le()
        } else {
            buf.get_u64()
        }
    }

    /// Get an i64
    #[inline]
    pub fn get_i64<B: Buf>(&self, buf: &mut B) -> i64 {
        if self.little_endian {
            buf.get_i64_le()
        } else {
            buf.get_i64()
        }
    }

    /// Get an f32
    #[inline]
    pub fn get_f32<B: Buf>(&self, buf: &mut B) -> f32 {
        if self.little_endian {
            buf.get_f32_le()
        } else {
            buf.get_f32()
        }
    }

    /// Get an f64
    #[inline]
    pub fn get_f64<B: Buf>(&self, buf: &mut B) -> f64 {
        if self.little_endian {
            buf.get_f64_le()
        } else {
            buf.get_f64()
        }
    }
}

impl Default for NdrContext {
    fn default() -> Self {
        Self::new()
    }
}
