//! Tracing setup shared by embedding hosts and tests

pub mod logging;
pub mod testing;
