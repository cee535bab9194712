//! Logging setup shared by the binaries of this workspace: subscriber
//! initialization, level based stdout/stderr routing and a panic hook that
//! reports through `tracing`.
mod config;
pub mod tracing;

pub use config::Config;
