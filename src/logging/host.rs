//! Engine logging subsystem
//!
//! The wallet engine logs through named loggers (`wallet`, `net`, `PERF`, ...).
//! Each logger has its own configuration deciding whether it is enabled and
//! which native sinks (standard output, log file) receive its lines. Dispatch
//! callbacks see every message of every enabled logger.

use chrono::Utc;
use std::collections::HashMap;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

static GLOBAL_REGISTRY: OnceLock<Arc<LogRegistry>> = OnceLock::new();

// =============================================================================
// Levels and Messages
// =============================================================================

/// Severity of an engine log message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
    Verbose,
    Unknown,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
            Level::Verbose => "VERBOSE",
            Level::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// A single message emitted by an engine logger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub logger: String,
    pub level: Level,
    pub file: String,
    pub line: u32,
    pub function: String,
    pub message: String,
}

/// Log through an engine registry, capturing the call site
macro_rules! engine_log {
    ($registry:expr, $logger:expr, $level:expr, $($arg:tt)+) => {
        $registry.log($crate::logging::host::LogMessage {
            logger: $logger.to_string(),
            level: $level,
            file: file!().to_string(),
            line: line!(),
            function: module_path!().to_string(),
            message: format!($($arg)+),
        })
    };
}
pub(crate) use engine_log;

// =============================================================================
// Logger Configuration
// =============================================================================

/// Per-logger configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggerConfig {
    /// Disabled loggers drop messages before any sink or callback sees them
    pub enabled: bool,
    pub to_standard_output: bool,
    pub to_file: bool,
}

impl LoggerConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            to_standard_output: false,
            to_file: false,
        }
    }

    /// Enabled, but no native sink
    pub fn silent() -> Self {
        Self {
            enabled: true,
            to_standard_output: false,
            to_file: false,
        }
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            to_standard_output: true,
            to_file: false,
        }
    }
}

/// Receives every dispatched message
pub trait DispatchCallback: Send + Sync {
    fn handle(&self, message: &LogMessage);
}

/// Logger configurations captured at one point in time
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSnapshot {
    loggers: HashMap<String, LoggerConfig>,
    default_config: LoggerConfig,
}

// =============================================================================
// Registry State
// =============================================================================

/// Mutable registry state, reached through [`LogRegistry::update`]
pub struct RegistryState {
    loggers: HashMap<String, LoggerConfig>,
    default_config: LoggerConfig,
    callbacks: Vec<(String, Arc<dyn DispatchCallback>)>,
}

impl RegistryState {
    fn new() -> Self {
        Self {
            loggers: HashMap::new(),
            default_config: LoggerConfig::default(),
            callbacks: Vec::new(),
        }
    }

    /// Configuration of `logger`, the default one if it was never seen
    pub fn logger_config(&self, logger: &str) -> LoggerConfig {
        self.loggers
            .get(logger)
            .copied()
            .unwrap_or(self.default_config)
    }

    pub fn configure(&mut self, logger: &str, config: LoggerConfig) {
        self.loggers.insert(logger.to_string(), config);
    }

    /// Apply `f` to every logger created so far
    pub fn reconfigure_all(&mut self, mut f: impl FnMut(&mut LoggerConfig)) {
        for config in self.loggers.values_mut() {
            f(config);
        }
    }

    /// Configuration given to loggers on first use
    pub fn set_default_config(&mut self, config: LoggerConfig) {
        self.default_config = config;
    }

    pub fn default_config(&self) -> LoggerConfig {
        self.default_config
    }

    pub fn has_callback(&self, name: &str) -> bool {
        self.callbacks.iter().any(|(n, _)| n == name)
    }

    /// Register a dispatch callback. Returns `false` if `name` is taken.
    pub fn install_callback(&mut self, name: &str, callback: Arc<dyn DispatchCallback>) -> bool {
        if self.has_callback(name) {
            return false;
        }
        self.callbacks.push((name.to_string(), callback));
        true
    }

    pub fn uninstall_callback(&mut self, name: &str) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(n, _)| n != name);
        self.callbacks.len() != before
    }

    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            loggers: self.loggers.clone(),
            default_config: self.default_config,
        }
    }

    /// Restore a snapshot. Loggers created after it was taken fall back to
    /// the restored default configuration.
    pub fn restore(&mut self, snapshot: ConfigSnapshot) {
        self.loggers = snapshot.loggers;
        self.default_config = snapshot.default_config;
    }
}

// =============================================================================
// Registry
// =============================================================================

/// The engine's logger registry and dispatcher
pub struct LogRegistry {
    state: RwLock<RegistryState>,
    stdout: Mutex<Box<dyn Write + Send>>,
    log_file: Mutex<Option<File>>,
}

impl LogRegistry {
    pub fn new() -> Self {
        Self::with_standard_output(Box::new(io::stdout()))
    }

    /// Registry whose standard output sink writes to `writer`
    pub fn with_standard_output(writer: Box<dyn Write + Send>) -> Self {
        Self {
            state: RwLock::new(RegistryState::new()),
            stdout: Mutex::new(writer),
            log_file: Mutex::new(None),
        }
    }

    /// The process-wide registry used by engines that are not given one
    pub fn global() -> Arc<LogRegistry> {
        GLOBAL_REGISTRY
            .get_or_init(|| Arc::new(LogRegistry::new()))
            .clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `f` with exclusive access to the registry state
    pub fn update<R>(&self, f: impl FnOnce(&mut RegistryState) -> R) -> R {
        f(&mut self.write())
    }

    pub fn logger_config(&self, logger: &str) -> LoggerConfig {
        self.read().logger_config(logger)
    }

    pub fn configure(&self, logger: &str, config: LoggerConfig) {
        self.write().configure(logger, config);
    }

    /// Open (appending) the file receiving lines of loggers configured with
    /// `to_file`. Replaces any previously opened file.
    pub fn set_log_file(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        *self.log_file.lock().unwrap_or_else(|e| e.into_inner()) = Some(file);
        Ok(())
    }

    /// Dispatch a message to the native sinks and callbacks
    pub fn log(&self, message: LogMessage) {
        let (config, callbacks) = {
            let mut state = self.write();
            let config = match state.loggers.get(&message.logger) {
                Some(config) => *config,
                None => {
                    let config = state.default_config;
                    state.loggers.insert(message.logger.clone(), config);
                    config
                }
            };
            if !config.enabled {
                return;
            }
            let callbacks: Vec<Arc<dyn DispatchCallback>> =
                state.callbacks.iter().map(|(_, cb)| cb.clone()).collect();
            (config, callbacks)
        };

        if config.to_standard_output || config.to_file {
            let line = format_line(&message);
            if config.to_standard_output {
                let mut out = self.stdout.lock().unwrap_or_else(|e| e.into_inner());
                let _ = writeln!(out, "{}", line);
            }
            if config.to_file {
                let mut file = self.log_file.lock().unwrap_or_else(|e| e.into_inner());
                if let Some(file) = file.as_mut() {
                    if let Err(e) = writeln!(file, "{}", line) {
                        log::warn!("Failed to write engine log file: {}", e);
                    }
                }
            }
        }

        for callback in callbacks {
            callback.handle(&message);
        }
    }
}

impl Default for LogRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn format_line(message: &LogMessage) -> String {
    format!(
        "{} {:<7} [{}] {}:{} {}",
        Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
        message.level,
        message.logger,
        message.file,
        message.line,
        message.message
    )
}

// =============================================================================
// Tests
// =============================================================================
