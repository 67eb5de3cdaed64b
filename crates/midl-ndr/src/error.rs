//! NDR error types

use thiserror::Error;

/// Default ceiling on the element count of any array decoded from the wire
pub const MAX_NDR_ARRAY_ELEMENTS: usize = 16 * 1024 * 1024;

/// Default ceiling on how deeply pointer bodies may nest on decode
pub const MAX_NDR_POINTER_DEPTH: usize = 1024;

/// NDR encoding/decoding errors
#[derive(Debug, Error)]
pub enum NdrError {
    /// A wire-declared count does not fit in the remaining input
    #[error("buffer overflow: {count} elements of {width} bytes declared, {remaining} bytes remain")]
    BufferOverflow {
        count: u64,
        width: usize,
        remaining: usize,
    },

    /// Not enough data for a fixed-width value
    #[error("truncated input: needed {needed} bytes, have {have}")]
    TruncatedInput { needed: usize, have: usize },

    /// Union discriminant with no registered arm
    #[error("unsupported union discriminant: {0}")]
    UnsupportedDiscriminant(i64),

    /// Alignment invariant violated by the caller or the engine
    #[error("misaligned stream: offset {offset} is not a multiple of {alignment}")]
    MisalignedStream { offset: usize, alignment: usize },

    /// Non-zero padding byte in strict mode
    #[error("non-zero padding at offset {offset}")]
    NonZeroPadding { offset: usize },

    /// Referent ID resolved to a value of a different type
    #[error("invalid pointer: referent ID {0:#x}")]
    InvalidPointer(u64),

    /// Non-null referent whose body was never decoded
    #[error("unresolved referent ID {0:#x}: deferred bodies were not flushed")]
    UnresolvedReferent(u64),

    /// Array size mismatch
    #[error("array size mismatch: expected {expected}, got {got}")]
    ArraySizeMismatch { expected: usize, got: usize },

    /// Invalid enum value
    #[error("invalid enum value: {0}")]
    InvalidEnumValue(i64),

    /// Value does not fit the width required by the transfer syntax
    #[error("integer overflow")]
    IntegerOverflow,

    /// Wire count exceeds the configured element ceiling
    #[error("allocation limit exceeded: requested {requested} elements, limit {limit}")]
    AllocationLimitExceeded { requested: u64, limit: usize },

    /// Pointer bodies nested deeper than the configured ceiling
    #[error("pointer depth {depth} exceeds limit {limit}")]
    DepthLimitExceeded { depth: usize, limit: usize },

    /// Payload rejected by a prepare hook
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// UTF-8 decoding error
    #[error("UTF-8 error: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),
}

/// Result type for NDR operations
pub type Result<T> = std::result::Result<T, NdrError>;
