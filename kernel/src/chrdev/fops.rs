//! file_operations — open / release / read / write
//!
//! Протокол записи / Write protocol:
//!   "<pid>\0" — десятичный PID, до DATA_MAX байт вместе с терминатором
//!   "<pid>\0" — decimal PID, up to DATA_MAX bytes including the terminator
//!
//! Результат переключения в write() не возвращается — только число
//! принятых байт; исход виден в журнале.
//! The toggle outcome is not returned from write() — only the number of
//! accepted bytes; the outcome goes to the log.

use core::num::IntErrorKind;

use log::{info, warn};

use super::session::Session;
use crate::config::DATA_MAX;
use crate::error::{Error, Result};
use crate::proc::toggle::toggle;
use crate::proc::{Pid, ProcessRegistry};

/// Буфер в пространстве пользователя (copy_from_user).
/// A user-space buffer (copy_from_user).
pub trait UserBuffer {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Скопировать `dst.len()` байт; вернуть число НЕ скопированных байт.
    /// Copy `dst.len()` bytes; return the number of bytes NOT copied.
    fn copy_to(&self, dst: &mut [u8]) -> usize;
}

impl UserBuffer for [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn copy_to(&self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(<[u8]>::len(self));
        dst[..n].copy_from_slice(&self[..n]);
        dst.len() - n
    }
}

/// kstrtol(buf, 10): до первого NUL, один завершающий '\n' допустим.
/// kstrtol(buf, 10): up to the first NUL, one trailing '\n' allowed.
pub fn parse_decimal(buf: &[u8]) -> Result<i64> {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    let mut digits = &buf[..end];
    if let [rest @ .., b'\n'] = digits {
        digits = rest;
    }

    let text = core::str::from_utf8(digits).map_err(|_| Error::InvalidPayload)?;
    text.parse::<i64>().map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => Error::OutOfRange,
        _ => Error::InvalidPayload,
    })
}

/// Обработчик write(): разобрать PID и переключить защиту.
/// write() handler: parse a PID and toggle its protection.
pub fn write_payload<P, B>(procs: &P, src: &B) -> Result<usize>
where
    P: ProcessRegistry + ?Sized,
    B: UserBuffer + ?Sized,
{
    let count = src.len();
    if count > DATA_MAX {
        warn!("rejecting {count} byte payload (limit {DATA_MAX})");
        return Err(Error::PayloadTooLarge { len: count, max: DATA_MAX });
    }

    // +1: место под терминатор при count == DATA_MAX
    // +1: room for the terminator when count == DATA_MAX
    let mut data = [0u8; DATA_MAX + 1];
    let missed = src.copy_to(&mut data[..count]);
    if missed != 0 {
        warn!("copy from user fell short by {missed} bytes");
        return Err(Error::CopyFault { missed });
    }
    let copied = count - missed;
    data[copied] = 0;

    let raw = match parse_decimal(&data[..=copied]) {
        Ok(raw) => raw,
        Err(e) => {
            info!("ignoring invalid PID");
            return Err(e);
        }
    };

    match Pid::try_from(raw) {
        // Исход уже в журнале / outcome is already logged
        Ok(pid) => {
            let _outcome = toggle(procs, pid);
        }
        Err(_) => warn!("PID {raw} out of range, ignoring"),
    }
    Ok(copied)
}

/// Открытый файл устройства / An open device file
pub struct OpenFile<'a, P: ProcessRegistry + ?Sized> {
    procs:   &'a P,
    session: Session<'a>,
}

impl<'a, P: ProcessRegistry + ?Sized> OpenFile<'a, P> {
    pub(crate) fn new(procs: &'a P, session: Session<'a>) -> Self {
        Self { procs, session }
    }

    /// Чтение не поддерживается — всегда EOF.
    /// Reading is not supported — always EOF.
    pub fn read(&self, _buf: &mut [u8]) -> Result<usize> {
        Ok(0)
    }

    pub fn write<B: UserBuffer + ?Sized>(&self, src: &B) -> Result<usize> {
        write_payload(self.procs, src)
    }

    /// release() — освобождает сессию и модуль.
    /// release() — frees the session and the module pin.
    pub fn release(self) {
        self.session.close();
    }
}
