//! Producer/pump shared state
//!
//! The logical plane pair and the staged raw command live behind blocking
//! mutexes (critical-section raw mutex, so the pump can run on the other
//! core); the request flags and run state are plain load/store atomics in
//! [`SyncState`].

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use heapless::Vec;

use penumbra_core::framebuffer::FramePair;
use penumbra_core::state::{RunState, SyncState};

/// Longest raw command sequence that can be staged for the pump.
pub const MAX_PENDING_CMD: usize = 8;

/// Whether the pump brings the panel up as soon as it is spawned, or
/// parks until the producer calls `start()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StartMode {
    /// Bring the hardware up immediately
    Immediate,
    /// Park in `Waiting` until released
    Delayed,
}

/// Everything the producer handle and the pump share.
///
/// `const`-constructible so it can live in a `static`; the handle and the
/// pump each hold a `&'static Shared`.
pub struct Shared {
    pub(crate) sync: SyncState,
    pub(crate) frame: Mutex<CriticalSectionRawMutex, RefCell<FramePair>>,
    pub(crate) pending_cmd: Mutex<CriticalSectionRawMutex, RefCell<Vec<u8, MAX_PENDING_CMD>>>,
}

impl Shared {
    pub const fn new(mode: StartMode) -> Self {
        let initial = match mode {
            StartMode::Immediate => RunState::Starting,
            StartMode::Delayed => RunState::Waiting,
        };
        Self {
            sync: SyncState::new(initial),
            frame: Mutex::new(RefCell::new(FramePair::new())),
            pending_cmd: Mutex::new(RefCell::new(Vec::new())),
        }
    }

    /// Current pump lifecycle state.
    pub fn run_state(&self) -> RunState {
        self.sync.run_state()
    }
}
