//! Engine logging
//!
//! This module provides:
//! - The wallet engine's logging subsystem (named loggers, native sinks)
//! - A forwarding bridge re-emitting engine messages through the `log` facade

pub mod bridge;
pub mod host;

pub use bridge::{
    install, uninstall, ForwardLevel, ForwardSink, ForwardedMessage, LogBridge, LogCrateSink,
    DEFAULT_CHANNEL, PERF_LOGGER,
};
pub use host::{DispatchCallback, Level, LogMessage, LogRegistry, LoggerConfig};
