//! Фейковые внешние реестры для тестов.
//! Fake external registries for tests.

use std::collections::BTreeMap;
use std::string::String;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;
use std::vec::Vec;

use spin::Mutex;

use crate::chrdev::fops::UserBuffer;
use crate::chrdev::{ChannelRegistry, ClassId, DevT, Major, Stage};
use crate::config::DeviceConfig;
use crate::error::Errno;
use crate::klog::{self, Console};
use crate::proc::{Pid, ProcessRegistry, SignalFlags};

// ── Processes ────────────────────────────────────────────────────────────────

/// What happens to a task right before the next flag update lands.
enum Interference {
    Overwrite(i32, SignalFlags),
    Exit(i32),
}

#[derive(Default)]
pub struct FakeProcesses {
    tasks:   Mutex<BTreeMap<i32, SignalFlags>>,
    pending: Mutex<Option<Interference>>,
    lookups: AtomicUsize,
    updates: AtomicUsize,
}

impl FakeProcesses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_task(self, pid: i32, flags: SignalFlags) -> Self {
        self.tasks.lock().insert(pid, flags);
        self
    }

    pub fn flags(&self, pid: i32) -> Option<SignalFlags> {
        self.tasks.lock().get(&pid).copied()
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn before_next_update(&self, pid: i32, flags: SignalFlags) {
        *self.pending.lock() = Some(Interference::Overwrite(pid, flags));
    }

    pub fn exit_before_next_update(&self, pid: i32) {
        *self.pending.lock() = Some(Interference::Exit(pid));
    }
}

impl ProcessRegistry for FakeProcesses {
    fn signal_flags(&self, pid: Pid) -> Option<SignalFlags> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.flags(pid.as_raw())
    }

    fn update_signal_flags(
        &self,
        pid: Pid,
        update: &mut dyn FnMut(SignalFlags) -> SignalFlags,
    ) -> Option<SignalFlags> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        let mut tasks = self.tasks.lock();

        match self.pending.lock().take() {
            Some(Interference::Overwrite(p, flags)) => {
                tasks.insert(p, flags);
            }
            Some(Interference::Exit(p)) => {
                tasks.remove(&p);
            }
            None => {}
        }

        let flags = tasks.get_mut(&pid.as_raw())?;
        *flags = update(*flags);
        Some(*flags)
    }
}

// ── Channel registry ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    RegisterChrdev,
    UnregisterChrdev(Major),
    CreateClass,
    DestroyClass,
    CreateDevice(DevT),
    DestroyDevice(DevT),
}

pub struct FakeChannels {
    fail_at: Option<(Stage, Errno)>,
    calls:   Mutex<Vec<Call>>,
}

impl FakeChannels {
    pub const MAJOR: Major = Major(240);

    pub fn new() -> Self {
        Self { fail_at: None, calls: Mutex::new(Vec::new()) }
    }

    pub fn failing_at(stage: Stage, errno: Errno) -> Self {
        Self { fail_at: Some((stage, errno)), calls: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    fn record(&self, call: Call, stage: Option<Stage>) -> Result<(), Errno> {
        self.calls.lock().push(call);
        match (self.fail_at, stage) {
            (Some((failing, errno)), Some(stage)) if failing == stage => Err(errno),
            _ => Ok(()),
        }
    }
}

impl ChannelRegistry for FakeChannels {
    fn register_chrdev(&self, _name: &str) -> Result<Major, Errno> {
        self.record(Call::RegisterChrdev, Some(Stage::Entry)).map(|()| Self::MAJOR)
    }

    fn unregister_chrdev(&self, major: Major, _name: &str) {
        let _ = self.record(Call::UnregisterChrdev(major), None);
    }

    fn create_class(&self, _name: &str) -> Result<ClassId, Errno> {
        self.record(Call::CreateClass, Some(Stage::Class)).map(|()| ClassId(1))
    }

    fn destroy_class(&self, _class: ClassId) {
        let _ = self.record(Call::DestroyClass, None);
    }

    fn create_device(&self, _class: ClassId, devt: DevT, _name: &str) -> Result<(), Errno> {
        self.record(Call::CreateDevice(devt), Some(Stage::Node))
    }

    fn destroy_device(&self, _class: ClassId, devt: DevT) {
        let _ = self.record(Call::DestroyDevice(devt), None);
    }
}

// ── User buffers ─────────────────────────────────────────────────────────────

/// A user buffer whose last `short` bytes fault during the copy.
pub struct FaultyBuffer {
    data:  &'static [u8],
    short: usize,
}

impl FaultyBuffer {
    pub fn new(data: &'static [u8], short: usize) -> Self {
        Self { data, short }
    }
}

impl UserBuffer for FaultyBuffer {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn copy_to(&self, dst: &mut [u8]) -> usize {
        let ok = dst.len().saturating_sub(self.short);
        dst[..ok].copy_from_slice(&self.data[..ok]);
        dst.len() - ok
    }
}

// ── Console ──────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct CaptureConsole {
    out: Mutex<String>,
}

impl CaptureConsole {
    pub fn lines(&self) -> Vec<String> {
        self.out.lock().lines().map(String::from).collect()
    }
}

impl Console for CaptureConsole {
    fn write_str(&self, s: &str) {
        self.out.lock().push_str(s);
    }
}

/// Глобальный логгер тестового бинарника, ставится один раз.
/// The test binary's global logger, installed once.
pub fn global_console() -> &'static CaptureConsole {
    static CONSOLE: OnceLock<&'static CaptureConsole> = OnceLock::new();
    CONSOLE.get_or_init(|| {
        let console: &'static CaptureConsole = Box::leak(Box::new(CaptureConsole::default()));
        klog::init(console, &DeviceConfig::DEFAULT).unwrap();
        console
    })
}
