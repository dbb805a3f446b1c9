//! Session Guard — один открытый дескриптор за раз
//! Session Guard — one open handle at a time
//!
//! Счётчик занятости под spin::Mutex вместо голого int:
//! параллельные open() сериализуются.
//! Occupancy counter behind a spin::Mutex instead of a bare int:
//! concurrent open() calls are serialized.

use core::sync::atomic::{AtomicUsize, Ordering};

use log::warn;
use spin::Mutex;

use crate::error::{Error, Result};

/// Счётчик ссылок модуля (try_module_get / module_put).
/// Module reference count (try_module_get / module_put).
#[derive(Debug, Default)]
pub struct ModuleRef {
    refs: AtomicUsize,
}

impl ModuleRef {
    pub const fn new() -> Self {
        Self { refs: AtomicUsize::new(0) }
    }

    pub fn get(&self) {
        self.refs.fetch_add(1, Ordering::AcqRel);
    }

    pub fn put(&self) {
        let _ = self
            .refs
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    pub fn count(&self) -> usize {
        self.refs.load(Ordering::Acquire)
    }

    pub fn is_pinned(&self) -> bool {
        self.count() != 0
    }
}

#[derive(Debug, Default)]
pub struct SessionGuard {
    occupancy: Mutex<usize>,
}

impl SessionGuard {
    pub const fn new() -> Self {
        Self { occupancy: Mutex::new(0) }
    }

    /// Занять устройство и закрепить модуль.
    /// Claim the device and pin the module.
    pub fn open<'a>(&'a self, module: &'a ModuleRef) -> Result<Session<'a>> {
        let mut occupancy = self.occupancy.lock();
        if *occupancy != 0 {
            warn!("busy RW attempt");
            return Err(Error::Busy);
        }

        *occupancy += 1;
        module.get();
        Ok(Session { guard: self, module })
    }

    pub fn is_busy(&self) -> bool {
        *self.occupancy.lock() != 0
    }

    fn release(&self) {
        let mut occupancy = self.occupancy.lock();
        *occupancy = occupancy.saturating_sub(1);
    }
}

/// Открытая сессия; закрывается при drop (release()).
/// An open session; closed on drop (release()).
#[derive(Debug)]
pub struct Session<'a> {
    guard:  &'a SessionGuard,
    module: &'a ModuleRef,
}

impl Session<'_> {
    pub fn close(self) {}
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        self.guard.release();
        self.module.put();
    }
}
