//! Toggle — переключение SIGNAL_UNKILLABLE
//!
//! Состояние читается один раз и меняется один раз.
//! State is read once, then flipped once.
//!
//! Между чтением и записью нет блокировки: если флаги процесса меняет
//! кто-то ещё, переключение опирается на устаревшее состояние.
//! No lock is held between the read and the write: if someone else
//! changes the task flags in between, the toggle acts on stale state.

use log::info;

use super::{Pid, ProcessRegistry, ProtectionState, TaskAccessor};
use crate::error::{Error, Result};

/// Выполненный переход / Applied transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Default → Unkillable
    Protected,
    /// Unkillable → Default
    Unprotected,
}

impl Transition {
    /// Состояние после перехода / State after the transition
    pub const fn target(self) -> ProtectionState {
        match self {
            Self::Protected   => ProtectionState::Unkillable,
            Self::Unprotected => ProtectionState::Default,
        }
    }
}

/// Переключить защиту процесса `pid`.
/// Flip the protection of process `pid`.
pub fn toggle<P: ProcessRegistry + ?Sized>(registry: &P, pid: Pid) -> Result<Transition> {
    let tasks = TaskAccessor::new(registry);

    match tasks.resolve(pid) {
        ProtectionState::Default => {
            tasks.set_unkillable(pid)?;
            Ok(Transition::Protected)
        }
        ProtectionState::Unkillable => {
            tasks.clear_unkillable(pid)?;
            Ok(Transition::Unprotected)
        }
        ProtectionState::Invalid => {
            info!("no such process: {pid}");
            Err(Error::ProcessNotFound(pid))
        }
    }
}
