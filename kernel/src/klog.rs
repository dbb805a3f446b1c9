//! klog — бэкенд `log` в стиле printk
//! klog — printk-style `log` backend
//!
//! Каждая запись: `<N>[gmdev] сообщение\n`, N — уровень printk.
//! Each record: `<N>[gmdev] message\n`, N is the printk level.
//!
//!   3 KERN_ERR   4 KERN_WARNING   6 KERN_INFO   7 KERN_DEBUG

use core::fmt;

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use spin::Mutex;

use crate::config::DeviceConfig;

/// Куда уходят строки журнала (консоль ядра, UART, ...).
/// Where log lines go (kernel console, UART, ...).
pub trait Console: Sync {
    fn write_str(&self, s: &str);
}

pub const PREFIX: &str = "[gmdev]";

pub const fn printk_level(level: Level) -> u8 {
    match level {
        Level::Error => 3,
        Level::Warn  => 4,
        Level::Info  => 6,
        Level::Debug | Level::Trace => 7,
    }
}

// ── fmt::Write поверх Console / fmt::Write over Console ──────────────────────

struct ConsoleWriter<'a>(&'a dyn Console);

impl fmt::Write for ConsoleWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.write_str(s);
        Ok(())
    }
}

pub struct KernelLogger {
    console: Mutex<Option<&'static dyn Console>>,
    level:   Mutex<LevelFilter>,
}

impl KernelLogger {
    pub const fn new() -> Self {
        Self { console: Mutex::new(None), level: Mutex::new(LevelFilter::Trace) }
    }

    /// Подключить консоль с порогом `level`.
    /// Attach a console with threshold `level`.
    pub fn attach(&self, console: &'static dyn Console, level: LevelFilter) {
        *self.level.lock() = level;
        *self.console.lock() = Some(console);
    }
}

impl Default for KernelLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= *self.level.lock() && self.console.lock().is_some()
    }

    fn log(&self, record: &Record) {
        if record.level() > *self.level.lock() {
            return;
        }
        // Lock held for the whole line so records never interleave.
        let console = self.console.lock();
        if let Some(console) = *console {
            use fmt::Write;
            let _ = writeln!(
                ConsoleWriter(console),
                "<{}>{} {}",
                printk_level(record.level()),
                PREFIX,
                record.args()
            );
        }
    }

    fn flush(&self) {}
}

static LOGGER: KernelLogger = KernelLogger::new();

/// Установить глобальный логгер (один раз за время жизни ядра).
/// Порог берётся из `config.log_level`. Повторный вызов ничего не меняет.
/// Install the global logger (once per kernel lifetime).
/// The threshold comes from `config.log_level`. A repeated call changes nothing.
pub fn init(console: &'static dyn Console, config: &DeviceConfig) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    LOGGER.attach(console, config.log_level);
    log::set_max_level(config.log_level);
    Ok(())
}
