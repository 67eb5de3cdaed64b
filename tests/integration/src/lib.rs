//! Integration test support
//!
//! `stubs` holds request/response types written the way the interface
//! generator emits them, so the tests drive the engine exactly as a real
//! client or server would.
//!
//! Run with logging:
//! ```text
//! RUST_LOG=midl_ndr=trace cargo test -p integration-tests
//! ```

pub mod common;
pub mod stubs;
