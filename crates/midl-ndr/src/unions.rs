//! NDR discriminated unions
//!
//! A union is a discriminant followed by exactly one arm. Generated stubs
//! model the union as a Rust `enum` and implement [`NdrUnion`] on it: the
//! engine writes or reads the discriminant and dispatches to the arm.
//!
//! Encapsulated unions carry their own discriminant. Non-encapsulated
//! (`[switch_is]`) unions take it from a sibling field, and the stub passes
//! it in explicitly.

use crate::primitives::NdrScalar;
use crate::{NdrError, NdrReader, NdrWriter, Result};

/// Closed set of arms selected by a discriminant
pub trait NdrUnion: Sized {
    /// Discriminant type
    type Switch: NdrScalar;

    /// Discriminant of the arm this value holds
    fn switch_value(&self) -> Self::Switch;

    /// Whether `switch` selects the arm this value holds.
    ///
    /// Unions with a MIDL `default:` arm override this so the default arm
    /// accepts every unregistered discriminant.
    fn accepts(&self, switch: Self::Switch) -> bool {
        self.switch_value() == switch
    }

    /// Alignment of the largest arm; NDR64 aligns the arm to it
    fn arm_align() -> usize {
        1
    }

    /// Encode the held arm, without the discriminant
    fn encode_arm<'a>(&'a self, w: &mut NdrWriter<'a>) -> Result<()>;

    /// Decode the arm selected by `switch`. An unregistered discriminant is
    /// `UnsupportedDiscriminant`.
    fn decode_arm(switch: Self::Switch, r: &mut NdrReader) -> Result<Self>;
}

impl<'a> NdrWriter<'a> {
    /// Write a union selected by `switch`: the discriminant, then the arm.
    ///
    /// Fails with `UnsupportedDiscriminant` when `switch` does not select the
    /// arm `value` holds.
    pub fn write_union<U: NdrUnion>(&mut self, value: &'a U, switch: U::Switch) -> Result<()> {
        if !value.accepts(switch) {
            return Err(NdrError::UnsupportedDiscriminant(switch.to_i64()));
        }
        self.write_scalar(switch)?;
        self.align_union(U::arm_align())?;
        value.encode_arm(self)
    }

    /// Write a union whose discriminant comes from the held arm.
    pub fn write_encapsulated_union<U: NdrUnion>(&mut self, value: &'a U) -> Result<()> {
        self.write_union(value, value.switch_value())
    }
}

impl NdrReader {
    /// Read a discriminant and the arm it selects.
    pub fn read_union<U: NdrUnion>(&mut self) -> Result<U> {
        let switch: U::Switch = self.read_scalar()?;
        self.align_union(U::arm_align())?;
        U::decode_arm(switch, self)
    }
}
