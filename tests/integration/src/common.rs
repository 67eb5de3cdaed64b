//! Shared helpers for the integration tests

use std::sync::Once;

use bytes::Bytes;
use midl_ndr::{NdrContext, NdrOperation};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

static INIT: Once = Once::new();

/// Install a test-writer subscriber filtered by `RUST_LOG`. Safe to call
/// from every test.
pub fn init_logging() {
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

/// Contexts every scenario is run under
pub fn all_contexts() -> [NdrContext; 4] {
    [
        NdrContext::new(),
        NdrContext::big_endian(),
        NdrContext::new().ndr64(),
        NdrContext::big_endian().ndr64(),
    ]
}

/// Marshal a request on the client and unmarshal it on the server.
pub fn request_round_trip<O: NdrOperation>(
    request: &mut O::Request,
    ctx: NdrContext,
) -> midl_ndr::Result<(Bytes, O::Request)> {
    let stub_data = O::marshal_request(request, ctx)?;
    let decoded = O::unmarshal_request(stub_data.clone(), ctx)?;
    Ok((stub_data, decoded))
}
