//! gmdev — godMode Device
//!
//! Символьное устройство, через которое привилегированный пользователь
//! включает/выключает SIGNAL_UNKILLABLE у любого процесса по PID.
//! A character device through which a privileged user toggles
//! SIGNAL_UNKILLABLE on any process by PID.
//!
//! Подсистемы / Subsystems:
//!   proc    — чтение/запись флагов задачи, toggle / task flags, toggle
//!   chrdev  — регистрация устройства, сессии, fops / registration, sessions, fops
//!   klog    — printk-бэкенд для `log` / printk backend for `log`
//!
//! Использование / Usage:
//!   echo -ne "1234\0" > /dev/gmdev     # Default ↔ Unkillable

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod chrdev;
pub mod config;
pub mod error;
pub mod klog;
pub mod proc;

#[cfg(test)]
mod mock;

use log::{error, info, warn, SetLoggerError};

use chrdev::fops::OpenFile;
use chrdev::session::{ModuleRef, SessionGuard};
use chrdev::{Channel, ChannelRegistry, ChannelState};
use klog::Console;
use config::{DeviceConfig, ECDEV};
use error::{Error, InitError, Result};
use proc::toggle::{toggle, Transition};
use proc::{Pid, ProcessRegistry};

/// Загруженный модуль: устройство + внешние реестры.
/// A loaded module: the device plus its external registries.
pub struct GodMode<P, C> {
    config:   DeviceConfig,
    procs:    P,
    channel:  Channel<C>,
    sessions: SessionGuard,
    module:   ModuleRef,
}

impl<P: ProcessRegistry, C: ChannelRegistry> GodMode<P, C> {
    pub const fn new(procs: P, registry: C, config: DeviceConfig) -> Self {
        Self {
            config,
            procs,
            channel: Channel::new(registry, config),
            sessions: SessionGuard::new(),
            module: ModuleRef::new(),
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn processes(&self) -> &P {
        &self.procs
    }

    pub fn channel(&self) -> &Channel<C> {
        &self.channel
    }

    pub fn module_ref(&self) -> &ModuleRef {
        &self.module
    }

    /// Поставить printk-логгер с порогом из конфигурации модуля.
    /// Install the printk logger with the module config's threshold.
    pub fn init_logging(
        &self,
        console: &'static dyn Console,
    ) -> core::result::Result<(), SetLoggerError> {
        klog::init(console, &self.config)
    }

    /// init_module()
    pub fn init(&self) -> core::result::Result<(), InitError> {
        info!("starting godMode device..");

        match self.channel.bring_up() {
            Ok(_) => Ok(()),
            Err(e) => {
                error!("E{ECDEV} - failed to initialize gmdev");
                Err(InitError::ChannelUnavailable(e))
            }
        }
    }

    /// cleanup_module() — безусловно / unconditionally
    pub fn cleanup(&self) {
        self.channel.teardown();
        info!("unloading godMode device from kernel");
    }

    /// delete_module(): пока модуль закреплён сессией — EBUSY.
    /// delete_module(): EBUSY while a session pins the module.
    pub fn try_unload(&self) -> Result<()> {
        if self.module.is_pinned() {
            warn!("module in use ({} refs), refusing unload", self.module.count());
            return Err(Error::Busy);
        }
        self.cleanup();
        Ok(())
    }

    /// open() на /dev/<node>.
    pub fn open(&self) -> Result<OpenFile<'_, P>> {
        if !matches!(self.channel.state(), ChannelState::NodeReady { .. }) {
            return Err(Error::NoDevice);
        }
        let session = self.sessions.open(&self.module)?;
        Ok(OpenFile::new(&self.procs, session))
    }

    /// Синхронный toggle с результатом (в обход write()).
    /// Synchronous toggle that reports its outcome (bypasses write()).
    pub fn toggle(&self, pid: Pid) -> Result<Transition> {
        toggle(&self.procs, pid)
    }
}
