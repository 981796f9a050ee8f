//! Tracing/logging setup shared by storefront binaries.

/// Initialize process-wide tracing, picking the output format from
/// `GROUPBUY_LOG_FORMAT`.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    crate::tracing::init_with(LogFormat::from_env());
}

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use crate::tracing::LogFormat;
