//! Barrie Launcher Logging System
//!
//! Writes a timestamped log file per session with a system information header

use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use crate::system;

static LOGGER: OnceLock<Arc<Mutex<BarrieLogger>>> = OnceLock::new();
static CONSOLE_ECHO: AtomicBool = AtomicBool::new(false);

// ============================================================================
// System Information Detection
// ============================================================================

#[derive(Debug, Clone)]
pub struct SystemInfo {
    pub app_version: String,
    pub os: String,
    pub os_version: String,
    pub arch: String,
    pub cpu: String,
    pub memory: String,
    pub java: String,
}

impl SystemInfo {
    pub fn detect() -> Self {
        Self {
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            os: system::os_name().to_string(),
            os_version: system::os_version(),
            arch: system::os_arch().to_string(),
            cpu: system::cpu_name(),
            memory: system::total_memory_mb()
                .map(|mb| format!("{:.1} GB", mb as f64 / 1024.0))
                .unwrap_or_else(|| "Unknown".to_string()),
            java: detect_java_on_path(),
        }
    }

    pub fn to_log_header(&self) -> String {
        format!(
r#"================================================================================
Barrie Launcher Log - {}
================================================================================
Application:   Barrie Launcher v{}
System Info:
  OS:          {} {}
  Arch:        {}
  CPU:         {}
  Memory:      {}
  Java:        {}
================================================================================
"#,
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            self.app_version,
            self.os,
            self.os_version,
            self.arch,
            self.cpu,
            self.memory,
            self.java
        )
    }
}

fn detect_java_on_path() -> String {
    // java -version prints to stderr
    if let Ok(output) = Command::new("java").arg("-version").output() {
        let out = String::from_utf8_lossy(&output.stderr);
        if let Some(line) = out.lines().next() {
            return line.trim().to_string();
        }
    }
    "Not found".to_string()
}

// ============================================================================
// Log Levels
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogLevel {
    Info,
    Action, // User actions (commands, selections)
    Download,
    Install,
    Launch,
    Warning,
    Error,
}

impl LogLevel {
    pub fn prefix(&self) -> &'static str {
        match self {
            LogLevel::Info => "[INFO]",
            LogLevel::Action => "[ACTION]",
            LogLevel::Download => "[DOWNLOAD]",
            LogLevel::Install => "[INSTALL]",
            LogLevel::Launch => "[LAUNCH]",
            LogLevel::Warning => "[WARNING]",
            LogLevel::Error => "[ERROR]",
        }
    }
}

// ============================================================================
// Barrie Logger
// ============================================================================

pub struct BarrieLogger {
    log_file: Option<File>,
}

impl BarrieLogger {
    pub fn new() -> Self {
        let log_dir = barrie_path!("logs");
        let _ = fs::create_dir_all(&log_dir);

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let log_path = log_dir.join(format!("barrie_{}.log", timestamp));

        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .ok();

        let mut logger = Self { log_file };

        let header = SystemInfo::detect().to_log_header();
        logger.write_raw(&header);

        logger
    }

    fn write_raw(&mut self, msg: &str) {
        if let Some(ref mut file) = self.log_file {
            let _ = writeln!(file, "{}", msg);
            let _ = file.flush();
        }

        if CONSOLE_ECHO.load(Ordering::Relaxed) {
            eprintln!("{}", msg);
        }
    }

    pub fn log(&mut self, level: LogLevel, message: &str) {
        let timestamp = Local::now().format("%H:%M:%S");
        let formatted = format!("[{}] {} {}", timestamp, level.prefix(), message);
        self.write_raw(&formatted);
    }
}

impl Default for BarrieLogger {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Global Logger Access
// ============================================================================

/// Initialize the global logger (call once at startup)
pub fn init_logger() {
    LOGGER.get_or_init(|| Arc::new(Mutex::new(BarrieLogger::new())));
}

/// Mirror log lines to stderr
pub fn set_console_echo(enabled: bool) {
    CONSOLE_ECHO.store(enabled, Ordering::Relaxed);
}

/// Messages logged before `init_logger` only reach the console (when echo is on)
fn log(level: LogLevel, message: &str) {
    match LOGGER.get() {
        Some(logger) => {
            if let Ok(mut log) = logger.lock() {
                log.log(level, message);
            }
        }
        None => {
            if CONSOLE_ECHO.load(Ordering::Relaxed) {
                eprintln!("{} {}", level.prefix(), message);
            }
        }
    }
}

// ============================================================================
// Convenience Logging Functions
// ============================================================================

pub fn log_info(message: &str) {
    log(LogLevel::Info, message);
}

pub fn log_action(message: &str) {
    log(LogLevel::Action, message);
}

pub fn log_download(message: &str) {
    log(LogLevel::Download, message);
}

pub fn log_install(message: &str) {
    log(LogLevel::Install, message);
}

pub fn log_launch(message: &str) {
    log(LogLevel::Launch, message);
}

pub fn log_warning(message: &str) {
    log(LogLevel::Warning, message);
}

pub fn log_error(message: &str) {
    log(LogLevel::Error, message);
}
