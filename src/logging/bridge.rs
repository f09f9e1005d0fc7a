//! Log forwarding bridge
//!
//! Hooks a dispatch callback into the engine's [`LogRegistry`] and re-emits
//! every engine message through a single [`ForwardSink`], by default the `log`
//! facade under a channel target. While installed the registry's native sinks
//! are switched off and the `PERF` timer logger is disabled.

use crate::logging::host::{
    ConfigSnapshot, DispatchCallback, Level, LogMessage, LogRegistry, LoggerConfig,
};
use std::sync::{Arc, Mutex, OnceLock};

/// Name of the dispatch callback registered by the bridge
pub const FORWARD_CALLBACK: &str = "forward";

/// High-volume performance timer logger, silenced while the bridge is active
pub const PERF_LOGGER: &str = "PERF";

/// Default `log` target for forwarded messages
pub const DEFAULT_CHANNEL: &str = "wallet_engine";

static GLOBAL_BRIDGE: OnceLock<LogBridge> = OnceLock::new();

// =============================================================================
// Levels
// =============================================================================

/// Five-level scale used for forwarded messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ForwardLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warning = 3,
    Error = 4,
}

impl ForwardLevel {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn to_log_level(self) -> log::Level {
        match self {
            ForwardLevel::Trace => log::Level::Trace,
            ForwardLevel::Debug => log::Level::Debug,
            ForwardLevel::Info => log::Level::Info,
            ForwardLevel::Warning => log::Level::Warn,
            ForwardLevel::Error => log::Level::Error,
        }
    }
}

impl From<Level> for ForwardLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Trace => ForwardLevel::Trace,
            Level::Debug => ForwardLevel::Debug,
            Level::Info => ForwardLevel::Info,
            Level::Warning => ForwardLevel::Warning,
            Level::Error | Level::Fatal => ForwardLevel::Error,
            Level::Verbose | Level::Unknown => ForwardLevel::Info,
        }
    }
}

// =============================================================================
// Sinks
// =============================================================================

/// A message as handed to a forward sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardedMessage<'a> {
    pub channel: &'a str,
    pub level: ForwardLevel,
    pub file: &'a str,
    pub line: u32,
    pub function: &'a str,
    pub message: &'a str,
}

/// Destination of forwarded engine messages
pub trait ForwardSink: Send + Sync {
    fn forward(&self, message: &ForwardedMessage<'_>);

    fn flush(&self) {}
}

/// Forwards to whatever logger is installed behind the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogCrateSink;

impl ForwardSink for LogCrateSink {
    fn forward(&self, message: &ForwardedMessage<'_>) {
        let level = message.level.to_log_level();
        let metadata = log::Metadata::builder()
            .level(level)
            .target(message.channel)
            .build();
        if !log::logger().enabled(&metadata) {
            return;
        }

        log::logger().log(
            &log::Record::builder()
                .args(format_args!(
                    "{} function=\"{}\"",
                    message.message, message.function
                ))
                .level(level)
                .target(message.channel)
                .file(Some(message.file))
                .line(Some(message.line))
                .build(),
        );
    }

    fn flush(&self) {
        log::logger().flush();
    }
}

struct ForwardCallback {
    channel: String,
    sink: Arc<dyn ForwardSink>,
}

impl DispatchCallback for ForwardCallback {
    fn handle(&self, message: &LogMessage) {
        self.sink.forward(&ForwardedMessage {
            channel: &self.channel,
            level: message.level.into(),
            file: &message.file,
            line: message.line,
            function: &message.function,
            message: &message.message,
        });
    }
}

// =============================================================================
// Bridge
// =============================================================================

struct Installed {
    sink: Arc<dyn ForwardSink>,
    snapshot: ConfigSnapshot,
}

/// Install-once forwarding hook on one registry
pub struct LogBridge {
    registry: Arc<LogRegistry>,
    installed: Mutex<Option<Installed>>,
}

impl LogBridge {
    pub fn new(registry: Arc<LogRegistry>) -> Self {
        Self {
            registry,
            installed: Mutex::new(None),
        }
    }

    pub fn registry(&self) -> &Arc<LogRegistry> {
        &self.registry
    }

    pub fn is_installed(&self) -> bool {
        self.installed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Start forwarding engine messages to `sink` under `channel`.
    ///
    /// Returns `false` without changing anything when a forwarder is already
    /// installed on the registry.
    pub fn install(&self, channel: &str, sink: Arc<dyn ForwardSink>) -> bool {
        let mut installed = self.installed.lock().unwrap_or_else(|e| e.into_inner());
        if installed.is_some() {
            return false;
        }

        let callback = Arc::new(ForwardCallback {
            channel: channel.to_string(),
            sink: sink.clone(),
        });

        let snapshot = self.registry.update(|state| {
            if state.has_callback(FORWARD_CALLBACK) {
                return None;
            }
            let snapshot = state.snapshot();

            state.reconfigure_all(|config| {
                config.to_standard_output = false;
                config.to_file = false;
            });
            state.set_default_config(LoggerConfig::silent());
            state.configure(PERF_LOGGER, LoggerConfig::disabled());
            state.install_callback(FORWARD_CALLBACK, callback);

            Some(snapshot)
        });

        match snapshot {
            Some(snapshot) => {
                *installed = Some(Installed { sink, snapshot });
                log::debug!("Engine log forwarding installed on channel {}", channel);
                true
            }
            None => false,
        }
    }

    /// Stop forwarding, restore the registry's previous configuration and
    /// flush the sink. Returns `false` if nothing was installed.
    pub fn uninstall(&self) -> bool {
        let mut installed = self.installed.lock().unwrap_or_else(|e| e.into_inner());
        let Some(Installed { sink, snapshot }) = installed.take() else {
            return false;
        };

        self.registry.update(|state| {
            state.uninstall_callback(FORWARD_CALLBACK);
            state.restore(snapshot);
        });
        sink.flush();

        log::debug!("Engine log forwarding uninstalled");
        true
    }
}

fn global_bridge() -> &'static LogBridge {
    GLOBAL_BRIDGE.get_or_init(|| LogBridge::new(LogRegistry::global()))
}

/// Forward the global engine registry to the `log` facade under `channel`
pub fn install(channel: &str) -> bool {
    global_bridge().install(channel, Arc::new(LogCrateSink))
}

/// Undo [`install`] and flush the `log` facade
pub fn uninstall() -> bool {
    global_bridge().uninstall()
}

// =============================================================================
// Tests
// =============================================================================
