//! Конфигурация устройства / Device configuration
//!
//! Константы + параметры модуля (аналог module_param).
//! Constants + module parameters (module_param equivalent).

use log::LevelFilter;

/// Максимальный размер данных от пользователя (вместе с терминатором).
/// Max size of data copied from user (terminator included).
pub const DATA_MAX: usize = 96;

/// init() exit code — unable to spawn the character device.
pub const ECDEV: i32 = 256;

/// Путь к узлу устройства / Device node path
pub const DEFAULT_NODE_PATH: &str = "/dev/gmdev";

/// Параметры регистрации устройства.
/// Device registration parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Name passed to chrdev registration.
    pub chrdev_name: &'static str,
    /// Class (namespace) the node is grouped under.
    pub class_name: &'static str,
    /// Name of the addressable node.
    pub node_name: &'static str,
    /// Minor number of the node; the major is allocated dynamically.
    pub minor: u32,
    /// Порог журнала драйвера / Driver log threshold.
    pub log_level: LevelFilter,
}

impl DeviceConfig {
    pub const DEFAULT: Self = Self {
        chrdev_name: "gmdDevice",
        class_name:  "gmdev",
        node_name:   "gmdev",
        minor:       0,
        log_level:   LevelFilter::Info,
    };

    pub const fn with_node_name(mut self, name: &'static str) -> Self {
        self.node_name = name;
        self
    }

    pub const fn with_minor(mut self, minor: u32) -> Self {
        self.minor = minor;
        self
    }

    pub const fn with_log_level(mut self, level: LevelFilter) -> Self {
        self.log_level = level;
        self
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
