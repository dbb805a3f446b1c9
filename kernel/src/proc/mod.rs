//! Process Attribute Accessor — SIGNAL_UNKILLABLE
//!
//! Поиск задачи по PID и чтение/запись флагов signal_struct.
//! Task lookup by PID and read/write of signal_struct flags.
//!
//! Сам доступ к задачам даёт внешний `ProcessRegistry`
//! (в ядре: find_get_pid + pid_task).
//! Task access itself comes from an external `ProcessRegistry`
//! (in the kernel: find_get_pid + pid_task).

pub mod toggle;

use core::fmt;

use bitflags::bitflags;
use log::info;

use crate::error::{Error, Result};

/// Идентификатор процесса / Process identifier (pid_t)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Pid(pub i32);

impl Pid {
    pub const fn as_raw(self) -> i32 { self.0 }

    /// Только положительные PID адресуют процесс.
    /// Only positive PIDs address a process.
    pub const fn is_valid(self) -> bool { self.0 > 0 }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for Pid {
    type Error = Error;

    fn try_from(raw: i64) -> Result<Self> {
        i32::try_from(raw).map(Pid).map_err(|_| Error::OutOfRange)
    }
}

bitflags! {
    /// signal_struct->flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SignalFlags: u32 {
        const STOP_STOPPED    = 0x0000_0001;
        const STOP_CONTINUED  = 0x0000_0002;
        const GROUP_EXIT      = 0x0000_0004;
        const CLD_STOPPED     = 0x0000_0010;
        const CLD_CONTINUED   = 0x0000_0020;
        /// for init: ignore fatal signals
        const UNKILLABLE      = 0x0000_0040;
        const GROUP_COREDUMP  = 0x0000_0080;

        // Неизвестные биты не теряем / keep unknown bits intact
        const _ = !0;
    }
}

/// Состояние защиты процесса на момент запроса.
/// Process protection state at the time of the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionState {
    Default,
    Unkillable,
    /// Процесс не найден / no such process
    Invalid,
}

impl ProtectionState {
    fn label(self) -> &'static str {
        match self {
            Self::Default    => "FLAG_DEFAULT",
            Self::Unkillable => "SIGNAL_UNKILLABLE",
            Self::Invalid    => "TASK_INVALID",
        }
    }
}

impl fmt::Display for ProtectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Внешний реестр процессов.
/// External process registry.
pub trait ProcessRegistry {
    /// Флаги задачи или `None`, если PID не найден.
    /// Task flags, or `None` if the PID has no live task.
    fn signal_flags(&self, pid: Pid) -> Option<SignalFlags>;

    /// Заменить флаги результатом `update`; `None`, если PID не найден.
    /// Replace the flags with the result of `update`; `None` if the PID has no live task.
    fn update_signal_flags(
        &self,
        pid: Pid,
        update: &mut dyn FnMut(SignalFlags) -> SignalFlags,
    ) -> Option<SignalFlags>;
}

/// Accessor over a borrowed process registry.
pub struct TaskAccessor<'a, P: ProcessRegistry + ?Sized> {
    registry: &'a P,
}

impl<'a, P: ProcessRegistry + ?Sized> TaskAccessor<'a, P> {
    pub const fn new(registry: &'a P) -> Self {
        Self { registry }
    }

    /// Прочитать текущее состояние защиты.
    /// Read the current protection state.
    pub fn resolve(&self, pid: Pid) -> ProtectionState {
        if !pid.is_valid() {
            return ProtectionState::Invalid;
        }

        let Some(flags) = self.registry.signal_flags(pid) else {
            return ProtectionState::Invalid;
        };

        let state = if flags.contains(SignalFlags::UNKILLABLE) {
            ProtectionState::Unkillable
        } else {
            ProtectionState::Default
        };

        info!(
            "task flags for PID: {} - {} ({:#x} | {})",
            pid, state, flags.bits(), flags.bits()
        );
        state
    }

    /// Assign SIGNAL_UNKILLABLE.
    pub fn set_unkillable(&self, pid: Pid) -> Result<()> {
        self.assign(pid, "SIGNAL_UNKILLABLE", |f| f | SignalFlags::UNKILLABLE)
    }

    /// Revoke SIGNAL_UNKILLABLE — back to FLAG_DEFAULT.
    pub fn clear_unkillable(&self, pid: Pid) -> Result<()> {
        self.assign(pid, "FLAG_DEFAULT", |f| f - SignalFlags::UNKILLABLE)
    }

    fn assign(
        &self,
        pid: Pid,
        label: &str,
        mut update: impl FnMut(SignalFlags) -> SignalFlags,
    ) -> Result<()> {
        if !pid.is_valid() {
            return Err(Error::InvalidIdentifier(pid));
        }

        match self.registry.update_signal_flags(pid, &mut update) {
            Some(_) => {
                info!("assigned flag {label} to PID({pid})");
                Ok(())
            }
            None => {
                info!("unable to assign {label} to PID({pid})");
                Err(Error::ProcessNotFound(pid))
            }
        }
    }
}
