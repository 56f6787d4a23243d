pub mod cors;
pub mod request_tracing;
pub mod session;
