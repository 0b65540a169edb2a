//! Integration test binary.
//!
//! All integration tests compile into this single binary, organized into
//! modules by the surface they exercise. Shared fixtures live in `helpers`.


mod crud;
mod lock;
mod query;

/// Initialize tracing for all tests in this binary.
///
/// Respects `RUST_LOG`; run with `RUST_LOG=debug` to see store internals
/// while debugging a failure.
#[ctor::ctor]
fn init_test_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init()
        .ok();
}
