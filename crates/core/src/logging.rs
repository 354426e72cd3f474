//! Centralized logging configuration for the emulator core.
//!
//! Emulation code logs through a single global [`LogConfig`] so that
//! verbosity can be tuned per component without threading a logger value
//! through every subsystem.
//!
//! # Architecture
//!
//! - **LogConfig**: thread-safe global configuration using atomic operations
//! - **LogLevel**: hierarchical log levels (Off < Error < Warn < Info < Debug < Trace)
//! - **LogCategory**: per-component categories (CPU, Bus, PPU, APU, Cartridge, Interrupts)
//! - **log()**: common entry point with lazy message construction and async file I/O
//!
//! # Performance
//!
//! Messages are built from closures, so a disabled category costs one
//! atomic load. File output goes through a channel to a background thread;
//! emulation never blocks on disk.
//!
//! # Usage
//!
//! ```rust
//! use ferricom_core::logging::{log, LogCategory, LogLevel};
//!
//! log(LogCategory::Cpu, LogLevel::Debug, || {
//!     format!("BRK at PC={:04X}", 0x1234)
//! });
//! ```

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::mpsc::{channel, Sender};
use std::sync::{Mutex, OnceLock};
use std::thread;

/// Log level for controlling verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    /// Parse log level from string (case-insensitive)
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "off" | "0" => Some(LogLevel::Off),
            "error" | "err" | "1" => Some(LogLevel::Error),
            "warn" | "warning" | "2" => Some(LogLevel::Warn),
            "info" | "3" => Some(LogLevel::Info),
            "debug" | "4" => Some(LogLevel::Debug),
            "trace" | "5" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    fn to_u8(self) -> u8 {
        self as u8
    }

    fn from_u8(val: u8) -> Self {
        match val {
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            5 => LogLevel::Trace,
            _ => LogLevel::Off,
        }
    }
}

/// Log category for different emulator components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    /// CPU execution (instruction tracing, interrupts taken, invalid opcodes)
    Cpu,
    /// Bus/memory access and device forwarding
    Bus,
    /// Picture unit register window
    Ppu,
    /// Audio unit register window
    Apu,
    /// Cartridge loading and mapper dispatch
    Cartridge,
    /// Interrupt requests (IRQ, NMI, RESET)
    Interrupts,
}

const CATEGORY_COUNT: usize = 6;

/// Sentinel stored in a category slot meaning "no override, use the default".
const NO_OVERRIDE: u8 = u8::MAX;

impl LogCategory {
    fn index(self) -> usize {
        match self {
            LogCategory::Cpu => 0,
            LogCategory::Bus => 1,
            LogCategory::Ppu => 2,
            LogCategory::Apu => 3,
            LogCategory::Cartridge => 4,
            LogCategory::Interrupts => 5,
        }
    }

    /// Short label used as a log line prefix.
    pub fn as_str(self) -> &'static str {
        match self {
            LogCategory::Cpu => "CPU",
            LogCategory::Bus => "BUS",
            LogCategory::Ppu => "PPU",
            LogCategory::Apu => "APU",
            LogCategory::Cartridge => "CART",
            LogCategory::Interrupts => "INT",
        }
    }
}

/// Global logging configuration.
///
/// Holds one level per category plus a default. All reads are atomic;
/// a frontend or a test may reconfigure at any time.
pub struct LogConfig {
    default_level: AtomicU8,
    category_levels: [AtomicU8; CATEGORY_COUNT],
    console_enabled: AtomicBool,
    file_sender: Mutex<Option<Sender<String>>>,
}

impl LogConfig {
    fn new() -> Self {
        const SLOT: AtomicU8 = AtomicU8::new(NO_OVERRIDE);
        Self {
            default_level: AtomicU8::new(LogLevel::Off.to_u8()),
            category_levels: [SLOT; CATEGORY_COUNT],
            console_enabled: AtomicBool::new(true),
            file_sender: Mutex::new(None),
        }
    }

    /// Access the process-wide configuration.
    pub fn global() -> &'static Self {
        static INSTANCE: OnceLock<LogConfig> = OnceLock::new();
        INSTANCE.get_or_init(LogConfig::new)
    }

    /// Set the default level applied to categories without an override.
    pub fn set_default_level(&self, level: LogLevel) {
        self.default_level.store(level.to_u8(), Ordering::Relaxed);
    }

    /// Override the level for a single category.
    pub fn set_level(&self, category: LogCategory, level: LogLevel) {
        self.category_levels[category.index()].store(level.to_u8(), Ordering::Relaxed);
    }

    /// Remove a category override, falling back to the default level.
    pub fn clear_level(&self, category: LogCategory) {
        self.category_levels[category.index()].store(NO_OVERRIDE, Ordering::Relaxed);
    }

    /// Enable or disable stderr output (file output is unaffected).
    pub fn set_console_enabled(&self, enabled: bool) {
        self.console_enabled.store(enabled, Ordering::Relaxed);
    }

    /// The effective level for a category.
    pub fn level_for(&self, category: LogCategory) -> LogLevel {
        let raw = self.category_levels[category.index()].load(Ordering::Relaxed);
        if raw == NO_OVERRIDE {
            LogLevel::from_u8(self.default_level.load(Ordering::Relaxed))
        } else {
            LogLevel::from_u8(raw)
        }
    }

    /// Whether a message at `level` in `category` would be emitted.
    pub fn should_log(&self, category: LogCategory, level: LogLevel) -> bool {
        level != LogLevel::Off && level <= self.level_for(category)
    }

    /// Reset all levels to Off and drop any category overrides.
    pub fn reset(&self) {
        self.set_default_level(LogLevel::Off);
        for slot in &self.category_levels {
            slot.store(NO_OVERRIDE, Ordering::Relaxed);
        }
    }

    /// Route log output to a file, appending.
    ///
    /// I/O happens on a background thread; the emulation thread only sends
    /// over a channel. Returns an error if the file cannot be opened.
    pub fn set_log_file(&self, path: PathBuf) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let (sender, receiver) = channel::<String>();

        thread::Builder::new()
            .name("log-writer".to_string())
            .spawn(move || {
                while let Ok(message) = receiver.recv() {
                    // A full disk must not take down emulation.
                    let _ = writeln!(file, "{message}");
                }
                let _ = file.flush();
            })?;

        *self.file_sender.lock().unwrap_or_else(|e| e.into_inner()) = Some(sender);
        Ok(())
    }

    /// Stop routing output to a file; the writer thread drains and exits.
    pub fn clear_log_file(&self) {
        *self.file_sender.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn write_message(&self, category: LogCategory, message: &str) {
        let line = format!("[{}] {}", category.as_str(), message);
        if self.console_enabled.load(Ordering::Relaxed) {
            eprintln!("{line}");
        }
        if let Some(sender) = self
            .file_sender
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
        {
            let _ = sender.send(line);
        }
    }
}

/// Log a message in `category` at `level`.
///
/// The message closure is only invoked when the category is enabled at
/// that level, so callers can format freely on hot paths.
pub fn log<F>(category: LogCategory, level: LogLevel, message_fn: F)
where
    F: FnOnce() -> String,
{
    let config = LogConfig::global();
    if config.should_log(category, level) {
        config.write_message(category, &message_fn());
    }
}
