//! NDR (Network Data Representation) runtime library
//!
//! This crate provides the runtime support for MIDL-generated stubs,
//! implementing the NDR transfer syntax as specified in DCE RPC and MS-RPCE,
//! in both its NDR20 and NDR64 forms.
//!
//! # NDR Wire Format
//!
//! NDR is the standard encoding for DCE RPC data. Key characteristics:
//! - Primitives align to their natural size (1, 2, 4, or 8 bytes)
//! - Structures align to their largest member
//! - Pointers are referent IDs; the data they point to is deferred until
//!   the enclosing structure is complete
//! - Conformant data (arrays with runtime-determined size) comes at the end
//! - Strings are conformant varying arrays with null terminator
//!
//! # Usage
//!
//! A stub encodes a value through an [`NdrWriter`] and decodes through an
//! [`NdrReader`]. Both are created per call and carry the pointer tables
//! and deferred queue of that call; [`encode_to_bytes`] and
//! [`decode_from_bytes`] wrap a whole message.

mod arrays;
mod context;
mod decode;
mod deferred;
mod encode;
mod error;
mod operation;
mod pointers;
mod primitives;
mod reader;
mod strings;
mod unions;
mod writer;

pub use arrays::{ConformantArray, ConformantVaryingArray, FixedArray, VaryingArray};
pub use context::{NdrContext, TransferSyntax, MAX_ALIGNMENT};
pub use decode::{decode_from_bytes, NdrDecode};
pub use encode::{encode_to_bytes, NdrEncode};
pub use error::{NdrError, Result, MAX_NDR_ARRAY_ELEMENTS, MAX_NDR_POINTER_DEPTH};
pub use operation::{prepare, NdrOperation, PreparePayload};
pub use pointers::{
    FullPtr, NdrPtr, PtrKey, RefPtr, Referent, UniquePtr, REFERENT_ID_BASE, REFERENT_ID_STEP,
};
pub use primitives::{ErrorStatusT, HandleT, Int3264, NdrScalar, NdrUuid, UInt3264};
pub use reader::{DeferredDecode, NdrReader};
pub use strings::{BString, NdrString, NdrWString};
pub use unions::NdrUnion;
pub use writer::{DeferredEncode, NdrWriter};

/// Re-export bytes for convenience
pub use bytes::{Buf, BufMut, Bytes, BytesMut};
