//! NDR array types
//!
//! NDR supports several array types:
//!
//! - Fixed arrays: size known at compile time
//! - Conformant arrays: size determined at runtime, transmitted as prefix
//! - Varying arrays: subset of elements transmitted
//! - Conformant varying arrays: both conformant and varying
//!
//! The size, offset and length fields are 4 bytes in NDR20 and 8 bytes in
//! NDR64. Stubs that hoist a structure's conformance to the front of the
//! structure call [`NdrWriter::write_size`] and [`NdrWriter::write_elements`]
//! separately instead of using the wrapper types.

use std::marker::PhantomData;

use bytes::{BufMut, Bytes};
use tracing::warn;

use crate::{NdrDecode, NdrEncode, NdrError, NdrReader, NdrWriter, Result};

fn to_usize(count: u64) -> Result<usize> {
    usize::try_from(count).map_err(|_| NdrError::IntegerOverflow)
}

fn to_u64(count: usize) -> Result<u64> {
    u64::try_from(count).map_err(|_| NdrError::IntegerOverflow)
}

impl<'a> NdrWriter<'a> {
    /// Write every element, with no count prefix.
    pub fn write_elements<T: NdrEncode>(&mut self, elements: &'a [T]) -> Result<()> {
        for elem in elements {
            elem.ndr_encode(self)?;
        }
        Ok(())
    }

    /// Write exactly `count` elements: the slice is truncated when longer
    /// and padded with `T::default()` when shorter.
    pub fn write_elements_padded<T: NdrEncode + Default>(
        &mut self,
        elements: &'a [T],
        count: usize,
    ) -> Result<()> {
        let used = elements.len().min(count);
        self.write_elements(&elements[..used])?;
        for _ in used..count {
            self.write_default::<T>()?;
        }
        Ok(())
    }

    /// Encode a default element. The value only lives for this call, so it
    /// goes through a scratch writer positioned at the current offset.
    fn write_default<T: NdrEncode + Default>(&mut self) -> Result<()> {
        let value = T::default();
        let mut scratch = NdrWriter::with_offset(self.ctx, self.position());
        value.ndr_encode(&mut scratch)?;
        let bytes = scratch.into_flushed_buffer().ok_or_else(|| {
            NdrError::InvalidPayload("default array element queued a pointer body".to_string())
        })?;
        self.buf.extend_from_slice(&bytes);
        Ok(())
    }

    /// Conformant array: `size`, then `min(len, size)` elements, zero-padded
    /// up to `size`.
    pub fn write_conformant_array<T: NdrEncode + Default>(
        &mut self,
        elements: &'a [T],
        size: u64,
    ) -> Result<()> {
        self.write_size(size)?;
        self.write_elements_padded(elements, to_usize(size)?)
    }

    /// Conformant varying array: `size`, offset 0, actual count clamped to
    /// `size`, then the elements.
    pub fn write_conformant_varying_array<T: NdrEncode + Default>(
        &mut self,
        elements: &'a [T],
        size: u64,
        length: u64,
    ) -> Result<()> {
        let length = length.min(size);
        self.write_size(size)?;
        self.write_variance(0, length)?;
        self.write_elements_padded(elements, to_usize(length)?)
    }

    /// Varying array with a fixed bound: offset 0, length, elements.
    pub fn write_varying_array<T: NdrEncode>(&mut self, elements: &'a [T]) -> Result<()> {
        self.write_variance(0, to_u64(elements.len())?)?;
        self.write_elements(elements)
    }

    /// Write exactly `count` raw bytes, truncating or zero-padding `bytes`.
    pub fn write_bytes(&mut self, bytes: &[u8], count: usize) {
        let used = bytes.len().min(count);
        self.write_raw(&bytes[..used]);
        self.buf.put_bytes(0, count - used);
    }
}

impl NdrReader {
    /// Read `count` elements, with no count prefix.
    ///
    /// The count goes through the bounds guard before the vector is
    /// allocated, using the element's alignment as its minimum width.
    pub fn read_elements<T: NdrDecode>(&mut self, count: u64) -> Result<Vec<T>> {
        let count = self.validate_count(count, T::ndr_align())?;
        let mut elements = Vec::with_capacity(count);
        for _ in 0..count {
            elements.push(T::ndr_decode(self)?);
        }
        Ok(elements)
    }

    pub fn read_conformant_array<T: NdrDecode>(&mut self) -> Result<Vec<T>> {
        let size = self.read_size()?;
        self.read_elements(size)
    }

    /// Read the variance of a varying array bounded by `size` and return
    /// `(offset, actual)`. An actual count running past `size` is clamped.
    pub fn read_bounded_variance(&mut self, size: u64) -> Result<(u64, u64)> {
        let (offset, length) = self.read_variance()?;
        let limit = size.saturating_sub(offset);
        if length > limit {
            warn!(size, offset, length, "clamping varying array count to its conformance");
            return Ok((offset, limit));
        }
        Ok((offset, length))
    }

    pub fn read_conformant_varying_array<T: NdrDecode>(&mut self) -> Result<ConformantVaryingArray<T>> {
        let max_count = self.read_size()?;
        let (offset, actual) = self.read_bounded_variance(max_count)?;
        let elements = self.read_elements(actual)?;
        Ok(ConformantVaryingArray {
            max_count,
            offset,
            elements,
        })
    }

    /// Read a conformant byte array without copying.
    pub fn read_conformant_bytes(&mut self) -> Result<Bytes> {
        let size = self.read_size()?;
        self.read_bytes(size)
    }
}

impl<T: NdrEncode, const N: usize> NdrEncode for [T; N] {
    fn ndr_encode<'a>(&'a self, w: &mut NdrWriter<'a>) -> Result<()> {
        w.write_elements(self)
    }

    fn ndr_align() -> usize {
        T::ndr_align()
    }
}

impl<T: NdrDecode, const N: usize> NdrDecode for [T; N] {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        let mut elements = Vec::with_capacity(N);
        for _ in 0..N {
            elements.push(T::ndr_decode(r)?);
        }
        elements.try_into().map_err(|v: Vec<T>| NdrError::ArraySizeMismatch {
            expected: N,
            got: v.len(),
        })
    }

    fn ndr_align() -> usize {
        T::ndr_align()
    }
}

/// Fixed-size array
///
/// Wire format: just the elements (no size prefix)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedArray<T, const N: usize> {
    pub elements: [T; N],
}

impl<T: Default, const N: usize> Default for FixedArray<T, N> {
    fn default() -> Self {
        Self {
            elements: std::array::from_fn(|_| T::default()),
        }
    }
}

impl<T, const N: usize> FixedArray<T, N> {
    pub fn new(elements: [T; N]) -> Self {
        Self { elements }
    }
}

impl<T: NdrEncode, const N: usize> NdrEncode for FixedArray<T, N> {
    fn ndr_encode<'a>(&'a self, w: &mut NdrWriter<'a>) -> Result<()> {
        self.elements.ndr_encode(w)
    }

    fn ndr_align() -> usize {
        T::ndr_align()
    }
}

impl<T: NdrDecode, const N: usize> NdrDecode for FixedArray<T, N> {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        Ok(Self {
            elements: <[T; N]>::ndr_decode(r)?,
        })
    }

    fn ndr_align() -> usize {
        T::ndr_align()
    }
}

/// Conformant array - size determined at runtime
///
/// Wire format:
/// ```text
/// max_count: u32/u64  # Maximum elements
/// elements[max_count] # Element data
/// ```
///
/// Note: In struct context, max_count may be at struct start while
/// elements are at end (conformant data comes last).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConformantArray<T> {
    pub elements: Vec<T>,
}

impl<T> ConformantArray<T> {
    pub fn new(elements: Vec<T>) -> Self {
        Self { elements }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl<T> From<Vec<T>> for ConformantArray<T> {
    fn from(elements: Vec<T>) -> Self {
        Self { elements }
    }
}

impl<T: NdrEncode> NdrEncode for ConformantArray<T> {
    fn ndr_encode<'a>(&'a self, w: &mut NdrWriter<'a>) -> Result<()> {
        w.write_size(to_u64(self.elements.len())?)?;
        w.write_elements(&self.elements)
    }

    fn ndr_align() -> usize {
        4 // For max_count
    }
}

impl<T: NdrDecode> NdrDecode for ConformantArray<T> {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        Ok(Self {
            elements: r.read_conformant_array()?,
        })
    }

    fn ndr_align() -> usize {
        4
    }
}

/// Varying array - subset of fixed array transmitted
///
/// Wire format:
/// ```text
/// offset: u32/u64       # First transmitted element (always 0 in practice)
/// actual_count: u32/u64 # Number of transmitted elements
/// elements[actual_count]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaryingArray<T, const N: usize> {
    pub offset: u64,
    pub elements: Vec<T>,
    _marker: PhantomData<[T; N]>,
}

impl<T, const N: usize> Default for VaryingArray<T, N> {
    fn default() -> Self {
        Self {
            offset: 0,
            elements: Vec::new(),
            _marker: PhantomData,
        }
    }
}

impl<T, const N: usize> VaryingArray<T, N> {
    pub fn new(elements: Vec<T>) -> Self {
        Self {
            offset: 0,
            elements,
            _marker: PhantomData,
        }
    }
}

impl<T: NdrEncode, const N: usize> NdrEncode for VaryingArray<T, N> {
    fn ndr_encode<'a>(&'a self, w: &mut NdrWriter<'a>) -> Result<()> {
        if self.elements.len() > N {
            return Err(NdrError::ArraySizeMismatch {
                expected: N,
                got: self.elements.len(),
            });
        }
        w.write_varying_array(&self.elements)
    }

    fn ndr_align() -> usize {
        4
    }
}

impl<T: NdrDecode, const N: usize> NdrDecode for VaryingArray<T, N> {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        let (offset, actual) = r.read_variance()?;
        let end = offset.checked_add(actual).ok_or(NdrError::IntegerOverflow)?;
        if end > N as u64 {
            return Err(NdrError::ArraySizeMismatch {
                expected: N,
                got: usize::try_from(end).unwrap_or(usize::MAX),
            });
        }

        Ok(Self {
            offset,
            elements: r.read_elements(actual)?,
            _marker: PhantomData,
        })
    }

    fn ndr_align() -> usize {
        4
    }
}

/// Conformant varying array - size and subset determined at runtime
///
/// Wire format:
/// ```text
/// max_count: u32/u64    # Maximum elements (conformance)
/// offset: u32/u64       # First transmitted element
/// actual_count: u32/u64 # Number of transmitted elements
/// elements[actual_count]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConformantVaryingArray<T> {
    pub max_count: u64,
    pub offset: u64,
    pub elements: Vec<T>,
}

impl<T> ConformantVaryingArray<T> {
    pub fn new(elements: Vec<T>) -> Self {
        Self {
            max_count: elements.len() as u64,
            offset: 0,
            elements,
        }
    }

    pub fn with_max(max_count: u64, elements: Vec<T>) -> Self {
        Self {
            max_count,
            offset: 0,
            elements,
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl<T: NdrEncode> NdrEncode for ConformantVaryingArray<T> {
    fn ndr_encode<'a>(&'a self, w: &mut NdrWriter<'a>) -> Result<()> {
        let limit = to_usize(self.max_count.saturating_sub(self.offset))?;
        let elements = &self.elements[..self.elements.len().min(limit)];

        w.write_size(self.max_count)?;
        w.write_variance(self.offset, to_u64(elements.len())?)?;
        w.write_elements(elements)
    }

    fn ndr_align() -> usize {
        4
    }
}

impl<T: NdrDecode> NdrDecode for ConformantVaryingArray<T> {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        r.read_conformant_varying_array()
    }

    fn ndr_align() -> usize {
        4
    }
}
