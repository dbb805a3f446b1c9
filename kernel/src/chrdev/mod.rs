//! Control Channel — character device lifecycle
//!
//! Три этапа регистрации / Three registration stages:
//!   Entry — chrdev + динамический major / chrdev + dynamic major
//!   Class — группа устройств (sysfs class) / device class (sysfs class)
//!   Node  — адресуемый узел /dev/<node> / addressable node /dev/<node>
//!
//! Создаются строго по порядку, удаляются в обратном.
//! Created strictly in order, torn down in reverse.
//!
//! Сами узлы и права на них выдаёт внешний `ChannelRegistry`.
//! Nodes and their permission bits come from an external `ChannelRegistry`.

pub mod fops;
pub mod session;

use log::{error, info};
use spin::Mutex;

use crate::config::DeviceConfig;
use crate::error::{Errno, RegistrationError};

/// Старший номер устройства / Device major number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Major(pub u32);

/// dev_t — MKDEV(major, minor)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DevT {
    pub major: u32,
    pub minor: u32,
}

impl DevT {
    pub const fn new(major: Major, minor: u32) -> Self {
        Self { major: major.0, minor }
    }
}

/// Непрозрачный дескриптор класса / Opaque class handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassId(pub u64);

/// Внешний реестр устройств (register_chrdev, class_create, device_create).
/// External device registry (register_chrdev, class_create, device_create).
pub trait ChannelRegistry {
    fn register_chrdev(&self, name: &str) -> Result<Major, Errno>;
    fn unregister_chrdev(&self, major: Major, name: &str);

    fn create_class(&self, name: &str) -> Result<ClassId, Errno>;
    fn destroy_class(&self, class: ClassId);

    fn create_device(&self, class: ClassId, devt: DevT, name: &str) -> Result<(), Errno>;
    fn destroy_device(&self, class: ClassId, devt: DevT);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Entry,
    Class,
    Node,
}

/// Per-stage view of the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Uninitialized,
    Initialized,
    Error,
}

/// Состояние канала — одна переменная на все три этапа.
/// Channel state — one variable across all three stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    NotStarted,
    EntryReady { major: Major },
    ClassReady { major: Major, class: ClassId },
    NodeReady { major: Major, class: ClassId },
    /// Bring-up failed at this stage; everything before it was torn down.
    Failed(Stage),
}

impl ChannelState {
    pub const fn status(&self, stage: Stage) -> StageStatus {
        use StageStatus::*;

        let reached = match self {
            Self::NotStarted           => 0,
            Self::EntryReady { .. }    => 1,
            Self::ClassReady { .. }    => 2,
            Self::NodeReady { .. }     => 3,
            Self::Failed(failed) => {
                return if *failed as u8 == stage as u8 { Error } else { Uninitialized };
            }
        };

        if (stage as u8) < reached { Initialized } else { Uninitialized }
    }

    pub const fn is_live(&self) -> bool {
        matches!(
            self,
            Self::EntryReady { .. } | Self::ClassReady { .. } | Self::NodeReady { .. }
        )
    }

    pub const fn major(&self) -> Option<Major> {
        match *self {
            Self::EntryReady { major }
            | Self::ClassReady { major, .. }
            | Self::NodeReady { major, .. } => Some(major),
            Self::NotStarted | Self::Failed(_) => None,
        }
    }
}

/// Character device registration, owned by the module.
pub struct Channel<C> {
    registry: C,
    config:   DeviceConfig,
    state:    Mutex<ChannelState>,
}

impl<C: ChannelRegistry> Channel<C> {
    pub const fn new(registry: C, config: DeviceConfig) -> Self {
        Self { registry, config, state: Mutex::new(ChannelState::NotStarted) }
    }

    pub fn state(&self) -> ChannelState {
        *self.state.lock()
    }

    pub fn registry(&self) -> &C {
        &self.registry
    }

    /// Поднять все три этапа. При сбое уже созданное удаляется.
    /// Bring up all three stages. On failure, whatever was created is torn down.
    pub fn bring_up(&self) -> Result<Major, RegistrationError> {
        let mut state = self.state.lock();
        if let ChannelState::NodeReady { major, .. } = *state {
            return Ok(major);
        }
        let cfg = &self.config;

        let major = match self.registry.register_chrdev(cfg.chrdev_name) {
            Ok(major) => major,
            Err(e) => {
                // Nothing was created yet, no teardown needed.
                error!("couldn't assign device major number - {e}");
                *state = ChannelState::Failed(Stage::Entry);
                return Err(RegistrationError::Entry(e));
            }
        };
        *state = ChannelState::EntryReady { major };

        let class = match self.registry.create_class(cfg.class_name) {
            Ok(class) => class,
            Err(e) => {
                error!("device class registration failed with error code {e}");
                self.teardown_locked(&mut state);
                *state = ChannelState::Failed(Stage::Class);
                return Err(RegistrationError::Class(e));
            }
        };
        *state = ChannelState::ClassReady { major, class };

        let devt = DevT::new(major, cfg.minor);
        if let Err(e) = self.registry.create_device(class, devt, cfg.node_name) {
            error!("device identifier registration failed with error code {e}");
            self.teardown_locked(&mut state);
            *state = ChannelState::Failed(Stage::Node);
            return Err(RegistrationError::Node(e));
        }
        *state = ChannelState::NodeReady { major, class };

        info!("successfully registered godMode character device (major {})", major.0);
        Ok(major)
    }

    /// Идемпотентно; вызывается из любого состояния.
    /// Idempotent; callable from any state.
    pub fn teardown(&self) {
        let mut state = self.state.lock();
        self.teardown_locked(&mut state);
    }

    fn teardown_locked(&self, state: &mut ChannelState) {
        use ChannelState::*;

        if let NodeReady { major, class } = *state {
            self.registry.destroy_device(class, DevT::new(major, self.config.minor));
        }
        if let NodeReady { class, .. } | ClassReady { class, .. } = *state {
            self.registry.destroy_class(class);
        }
        if let Some(major) = state.major() {
            self.registry.unregister_chrdev(major, self.config.chrdev_name);
        }

        if state.is_live() {
            *state = NotStarted;
        }
        info!("unregistering godMode device");
    }
}
