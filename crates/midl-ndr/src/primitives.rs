//! NDR primitive type implementations
//!
//! NDR primitive types and their encodings:
//!
//! | MIDL Type     | Rust Type | Size | Alignment |
//! |---------------|-----------|------|-----------|
//! | boolean       | bool      | 1    | 1         |
//! | byte/char     | u8        | 1    | 1         |
//! | small         | i8        | 1    | 1         |
//! | short         | i16       | 2    | 2         |
//! | long/int      | i32       | 4    | 4         |
//! | hyper         | i64       | 8    | 8         |
//! | unsigned short| u16       | 2    | 2         |
//! | unsigned long | u32       | 4    | 4         |
//! | unsigned hyper| u64       | 8    | 8         |
//! | float         | f32       | 4    | 4         |
//! | double        | f64       | 8    | 8         |
//! | wchar_t       | u16       | 2    | 2         |
//! | error_status_t| u32       | 4    | 4         |
//! | __int3264     | Int3264   | 4/8  | 4/8       |
//! | enum          | u16       | 2/4  | 2/4       |
//!
//! Sizes written as `a/b` differ between NDR20 and NDR64.

use std::fmt;

use bytes::{Buf, BufMut};

use crate::{NdrContext, NdrDecode, NdrEncode, NdrError, NdrReader, NdrWriter, Result};

/// Fixed-width integer that can carry a union discriminant or be written
/// directly by the scalar codec.
pub trait NdrScalar: Copy + PartialEq + fmt::Debug + 'static {
    /// Encoded width in bytes, which is also the natural alignment
    const WIDTH: usize;

    fn put<B: BufMut>(self, ctx: &NdrContext, buf: &mut B);

    /// Read the value. The caller has already checked `WIDTH` bytes remain.
    fn get<B: Buf>(ctx: &NdrContext, buf: &mut B) -> Self;

    /// Widen for diagnostics
    fn to_i64(self) -> i64;
}

// Macro to implement NdrScalar/NdrEncode/NdrDecode for integer types
macro_rules! impl_ndr_scalar {
    ($ty:ty, $size:expr, $put:ident, $get:ident) => {
        impl NdrScalar for $ty {
            const WIDTH: usize = $size;

            #[inline]
            fn put<B: BufMut>(self, ctx: &NdrContext, buf: &mut B) {
                ctx.$put(buf, self);
            }

            #[inline]
            fn get<B: Buf>(ctx: &NdrContext, buf: &mut B) -> Self {
                ctx.$get(buf)
            }

            #[inline]
            fn to_i64(self) -> i64 {
                self as i64
            }
        }

        impl NdrEncode for $ty {
            fn ndr_encode<'a>(&'a self, w: &mut NdrWriter<'a>) -> Result<()> {
                w.write_scalar(*self)
            }

            fn ndr_align() -> usize {
                $size
            }
        }

        impl NdrDecode for $ty {
            fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
                r.read_scalar()
            }

            fn ndr_align() -> usize {
                $size
            }
        }
    };
}

impl_ndr_scalar!(u8, 1, put_u8, get_u8);
impl_ndr_scalar!(i8, 1, put_i8, get_i8);
impl_ndr_scalar!(u16, 2, put_u16, get_u16);
impl_ndr_scalar!(i16, 2, put_i16, get_i16);
impl_ndr_scalar!(u32, 4, put_u32, get_u32);
impl_ndr_scalar!(i32, 4, put_i32, get_i32);
impl_ndr_scalar!(u64, 8, put_u64, get_u64);
impl_ndr_scalar!(i64, 8, put_i64, get_i64);

impl NdrEncode for f32 {
    fn ndr_encode<'a>(&'a self, w: &mut NdrWriter<'a>) -> Result<()> {
        w.write_f32(*self)
    }

    fn ndr_align() -> usize { 4 }
}

impl NdrDecode for f32 {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        r.read_f32()
    }

    fn ndr_align() -> usize { 4 }
}

impl NdrEncode for f64 {
    fn ndr_encode<'a>(&'a self, w: &mut NdrWriter<'a>) -> Result<()> {
        w.write_f64(*self)
    }

    fn ndr_align() -> usize { 8 }
}

impl NdrDecode for f64 {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        r.read_f64()
    }

    fn ndr_align() -> usize { 8 }
}

/// NDR boolean - encoded as a single byte (0x00 = false, 0x01 = true)
impl NdrEncode for bool {
    fn ndr_encode<'a>(&'a self, w: &mut NdrWriter<'a>) -> Result<()> {
        w.write_bool(*self)
    }

    fn ndr_align() -> usize { 1 }
}

impl NdrDecode for bool {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        r.read_bool()
    }

    fn ndr_align() -> usize { 1 }
}

/// MIDL `__int3264`: 32 bits on the NDR20 wire, 64 bits on NDR64
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Int3264(pub i64);

/// MIDL `unsigned __int3264`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct UInt3264(pub u64);

impl NdrEncode for Int3264 {
    fn ndr_encode<'a>(&'a self, w: &mut NdrWriter<'a>) -> Result<()> {
        if w.context().is_ndr64() {
            w.write_i64(self.0)
        } else {
            let narrow = i32::try_from(self.0).map_err(|_| NdrError::IntegerOverflow)?;
            w.write_i32(narrow)
        }
    }

    fn ndr_align() -> usize { 4 }
}

impl NdrDecode for Int3264 {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        if r.context().is_ndr64() {
            Ok(Self(r.read_i64()?))
        } else {
            Ok(Self(r.read_i32()?.into()))
        }
    }

    fn ndr_align() -> usize { 4 }
}

impl NdrEncode for UInt3264 {
    fn ndr_encode<'a>(&'a self, w: &mut NdrWriter<'a>) -> Result<()> {
        if w.context().is_ndr64() {
            w.write_u64(self.0)
        } else {
            let narrow = u32::try_from(self.0).map_err(|_| NdrError::IntegerOverflow)?;
            w.write_u32(narrow)
        }
    }

    fn ndr_align() -> usize { 4 }
}

impl NdrDecode for UInt3264 {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        if r.context().is_ndr64() {
            Ok(Self(r.read_u64()?))
        } else {
            Ok(Self(r.read_u32()?.into()))
        }
    }

    fn ndr_align() -> usize { 4 }
}

/// GUID/UUID type for NDR encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct NdrUuid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl NdrUuid {
    /// Nil UUID
    pub const NIL: Self = Self {
        data1: 0,
        data2: 0,
        data3: 0,
        data4: [0; 8],
    };

    /// Parse from string "xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx"
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.len() != 36 {
            return None;
        }
        let parts: Vec<&str> = s.split('-').collect();
        let widths = [8, 4, 4, 4, 12];
        if parts.len() != widths.len() {
            return None;
        }
        let well_formed = parts.iter().zip(widths).all(|(part, width)| {
            part.len() == width && part.bytes().all(|b| b.is_ascii_hexdigit())
        });
        if !well_formed {
            return None;
        }

        let data1 = u32::from_str_radix(parts[0], 16).ok()?;
        let data2 = u16::from_str_radix(parts[1], 16).ok()?;
        let data3 = u16::from_str_radix(parts[2], 16).ok()?;
        let clock = u16::from_str_radix(parts[3], 16).ok()?;

        let mut data4 = [0u8; 8];
        data4[..2].copy_from_slice(&clock.to_be_bytes());
        for (i, byte) in data4[2..].iter_mut().enumerate() {
            *byte = u8::from_str_radix(parts[4].get(i * 2..i * 2 + 2)?, 16).ok()?;
        }

        Some(Self { data1, data2, data3, data4 })
    }
}

impl fmt::Display for NdrUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-",
            self.data1, self.data2, self.data3, self.data4[0], self.data4[1],
        )?;
        for byte in &self.data4[2..] {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl NdrEncode for NdrUuid {
    fn ndr_encode<'a>(&'a self, w: &mut NdrWriter<'a>) -> Result<()> {
        // UUID aligns to 4 bytes (same as first field)
        w.align(4)?;
        w.write_u32(self.data1)?;
        w.write_u16(self.data2)?;
        w.write_u16(self.data3)?;
        w.write_raw(&self.data4);
        Ok(())
    }

    fn ndr_align() -> usize { 4 }
}

impl NdrDecode for NdrUuid {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        r.align(4)?;
        r.ensure(16)?;
        let data1 = r.read_u32()?;
        let data2 = r.read_u16()?;
        let data3 = r.read_u16()?;
        let mut data4 = [0u8; 8];
        r.read_raw(&mut data4)?;
        Ok(Self { data1, data2, data3, data4 })
    }

    fn ndr_align() -> usize { 4 }
}

/// NDR handle_t (opaque handle) - represented as a 32-bit context ID
pub type HandleT = u32;

/// NDR error_status_t - HRESULT-like error code
pub type ErrorStatusT = u32;
