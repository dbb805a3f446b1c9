//! Ошибки драйвера / Driver errors

use core::fmt;

use thiserror::Error;

use crate::config::ECDEV;
use crate::proc::Pid;

/// Код ошибки ядра (положительный) / Kernel error number (positive)
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Errno(pub i32);

impl Errno {
    pub const ESRCH:  Self = Self(3);
    pub const ENOMEM: Self = Self(12);
    pub const EFAULT: Self = Self(14);
    pub const EBUSY:  Self = Self(16);
    pub const ENODEV: Self = Self(19);
    pub const EINVAL: Self = Self(22);
    pub const ERANGE: Self = Self(34);

    /// Negative form returned through ssize_t entry points.
    pub const fn as_neg(self) -> isize {
        -(self.0 as isize)
    }

    fn name(self) -> Option<&'static str> {
        Some(match self {
            Self::ESRCH  => "ESRCH",
            Self::ENOMEM => "ENOMEM",
            Self::EFAULT => "EFAULT",
            Self::EBUSY  => "EBUSY",
            Self::ENODEV => "ENODEV",
            Self::EINVAL => "EINVAL",
            Self::ERANGE => "ERANGE",
            _ => return None,
        })
    }
}

impl fmt::Debug for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "Errno({})", self.0),
        }
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "-{}", self.0)
    }
}

/// Этап регистрации, на котором произошёл сбой.
/// Bring-up stage that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("couldn't assign device major number ({0})")]
    Entry(Errno),

    #[error("device class registration failed with error code {0}")]
    Class(Errno),

    #[error("device identifier registration failed with error code {0}")]
    Node(Errno),
}

impl RegistrationError {
    pub const fn errno(self) -> Errno {
        match self {
            Self::Entry(e) | Self::Class(e) | Self::Node(e) => e,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    #[error("device busy")]
    Busy,

    #[error("device not registered")]
    NoDevice,

    #[error("payload of {len} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("{missed} bytes could not be copied from user space")]
    CopyFault { missed: usize },

    #[error("payload is not a base-10 integer")]
    InvalidPayload,

    #[error("integer out of range")]
    OutOfRange,

    #[error("no such process: {0}")]
    ProcessNotFound(Pid),

    #[error("invalid pid {0}")]
    InvalidIdentifier(Pid),

    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

impl Error {
    pub const fn errno(self) -> Errno {
        match self {
            Self::Busy                  => Errno::EBUSY,
            Self::NoDevice              => Errno::ENODEV,
            Self::PayloadTooLarge { .. } => Errno::EINVAL,
            Self::CopyFault { .. }      => Errno::EFAULT,
            Self::InvalidPayload        => Errno::EINVAL,
            Self::OutOfRange            => Errno::ERANGE,
            Self::ProcessNotFound(_)    => Errno::ESRCH,
            Self::InvalidIdentifier(_)  => Errno::EINVAL,
            Self::Registration(e)       => e.errno(),
        }
    }
}

impl From<Error> for Errno {
    fn from(e: Error) -> Self {
        e.errno()
    }
}

/// Сбой init_module() / init_module() failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InitError {
    #[error("E{code} - failed to initialize gmdev: {0}", code = ECDEV)]
    ChannelUnavailable(#[source] RegistrationError),
}

impl InitError {
    /// Код возврата init / init return code
    pub const fn code(&self) -> i32 {
        match self {
            Self::ChannelUnavailable(_) => ECDEV,
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
