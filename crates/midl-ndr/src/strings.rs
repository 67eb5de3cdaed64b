//! NDR string types
//!
//! NDR strings are arrays of characters that carry their NUL terminator on
//! the wire. The `[string]` form is a conformant varying array:
//!
//! ```text
//! max_count: u32/u64    # Maximum elements including null
//! offset: u32/u64       # Always 0
//! actual_count: u32/u64 # Actual elements including null
//! chars[actual_count]
//! ```
//!
//! Wide strings are UTF-16 code units. An empty string is still one unit
//! long. No padding follows the characters; the next field aligns itself.

use tracing::debug;

use crate::{NdrDecode, NdrEncode, NdrError, NdrReader, NdrWriter, Result};

fn utf16_with_nul(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn unit_count(len: usize) -> Result<u64> {
    u64::try_from(len).map_err(|_| NdrError::IntegerOverflow)
}

impl<'a> NdrWriter<'a> {
    /// Write a `[string] wchar_t*` body: conformant varying UTF-16.
    pub fn write_wstring(&mut self, s: &str) -> Result<()> {
        let units = utf16_with_nul(s);
        let count = unit_count(units.len())?;
        self.write_size(count)?;
        self.write_variance(0, count)?;
        self.write_units(&units)
    }

    /// Write a NUL-terminated UTF-16 string as a conformant array only, for
    /// `[size_is]` character buffers.
    pub fn write_conformant_wstring(&mut self, s: &str) -> Result<()> {
        let units = utf16_with_nul(s);
        self.write_size(unit_count(units.len())?)?;
        self.write_units(&units)
    }

    /// Write a `[string] char*` body: conformant varying bytes.
    pub fn write_string(&mut self, s: &str) -> Result<()> {
        let count = unit_count(s.len() + 1)?;
        self.write_size(count)?;
        self.write_variance(0, count)?;
        self.write_raw(s.as_bytes());
        self.write_raw(&[0]);
        Ok(())
    }

    fn write_units(&mut self, units: &[u16]) -> Result<()> {
        for unit in units {
            self.write_u16(*unit)?;
        }
        Ok(())
    }
}

impl NdrReader {
    pub fn read_wstring(&mut self) -> Result<String> {
        let size = self.read_size()?;
        let (offset, actual) = self.read_bounded_variance(size)?;
        if offset != 0 {
            debug!(offset, "string with non-zero variance offset");
        }
        self.read_units(actual)
    }

    pub fn read_conformant_wstring(&mut self) -> Result<String> {
        let size = self.read_size()?;
        self.read_units(size)
    }

    pub fn read_string(&mut self) -> Result<String> {
        let size = self.read_size()?;
        let (_, actual) = self.read_bounded_variance(size)?;
        let mut bytes = self.read_bytes(actual)?.to_vec();
        if bytes.last() == Some(&0) {
            bytes.pop();
        }
        Ok(String::from_utf8(bytes)?)
    }

    /// Read `count` UTF-16 units, drop one trailing NUL if present, and
    /// convert. Unpaired surrogates become U+FFFD.
    fn read_units(&mut self, count: u64) -> Result<String> {
        let mut units: Vec<u16> = self.read_elements(count)?;
        if units.last() == Some(&0) {
            units.pop();
        }
        Ok(String::from_utf16_lossy(&units))
    }
}

/// ANSI string type (null-terminated char*)
///
/// Used for [string] annotated char* parameters in MIDL.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NdrString(pub String);

impl NdrString {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for NdrString {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for NdrString {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for NdrString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl NdrEncode for NdrString {
    fn ndr_encode<'a>(&'a self, w: &mut NdrWriter<'a>) -> Result<()> {
        w.write_string(&self.0)
    }

    fn ndr_align() -> usize {
        4
    }
}

impl NdrDecode for NdrString {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        Ok(Self(r.read_string()?))
    }

    fn ndr_align() -> usize {
        4
    }
}

/// Unicode string type (null-terminated wchar_t*)
///
/// Used for [string] annotated wchar_t* parameters in MIDL.
/// Encoded as UTF-16 in the stream's byte order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NdrWString(pub String);

impl NdrWString {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for NdrWString {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for NdrWString {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for NdrWString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl NdrEncode for NdrWString {
    fn ndr_encode<'a>(&'a self, w: &mut NdrWriter<'a>) -> Result<()> {
        w.write_wstring(&self.0)
    }

    fn ndr_align() -> usize {
        4
    }
}

impl NdrDecode for NdrWString {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        Ok(Self(r.read_wstring()?))
    }

    fn ndr_align() -> usize {
        4
    }
}

/// BSTR - COM-style string
///
/// Note: In NDR, BSTR is encoded differently than in-memory COM BSTRs.
/// The wire format is the same as [`NdrWString`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BString(pub String);

impl BString {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for BString {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for BString {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl NdrEncode for BString {
    fn ndr_encode<'a>(&'a self, w: &mut NdrWriter<'a>) -> Result<()> {
        w.write_wstring(&self.0)
    }

    fn ndr_align() -> usize {
        4
    }
}

impl NdrDecode for BString {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        Ok(Self(r.read_wstring()?))
    }

    fn ndr_align() -> usize {
        4
    }
}
