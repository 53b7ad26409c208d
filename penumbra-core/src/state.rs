//! Pump run state and shared synchronization cells
//!
//! The producer and the pump communicate through a handful of word-sized
//! cells. Every cell has a single writer for each direction of travel
//! (the producer raises requests, the pump acknowledges and owns the run
//! state), so plain load/store atomics are enough - deliberately no
//! read-modify-write, which thumbv6m cores lack anyway.

use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU8, Ordering};

/// Lifecycle of the display pump.
///
/// ```text
/// Waiting -> Starting -> Running -> Stopping -> Stopped
///            (immediate start enters at Starting)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RunState {
    /// Created in delayed-start mode, parked until released by `start()`
    Waiting,
    /// Released; hardware bring-up pending
    Starting,
    /// Steady-state subframe loop active
    Running,
    /// Stop requested; honored at the end of the current outer cycle
    Stopping,
    /// Terminal: panel blanked, pump exited
    Stopped,
}

impl RunState {
    const fn to_u8(self) -> u8 {
        match self {
            RunState::Waiting => 0,
            RunState::Starting => 1,
            RunState::Running => 2,
            RunState::Stopping => 3,
            RunState::Stopped => 4,
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => RunState::Waiting,
            1 => RunState::Starting,
            2 => RunState::Running,
            3 => RunState::Stopping,
            _ => RunState::Stopped,
        }
    }

    /// True once the pump has exited; nothing will service requests anymore.
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Stopped)
    }
}

/// Sentinel in the contrast cell meaning "no change requested".
pub const CONTRAST_NONE: u16 = 0xFFFF;

/// The shared word-sized fields.
///
/// Field discipline: `run_state` is written by both sides but only at
/// disjoint phases (producer: Waiting->Starting and Running->Stopping;
/// pump: everything else). The request flags are raised by the producer
/// and cleared by the pump at its checkpoint.
pub struct SyncState {
    run_state: AtomicU8,
    copy_pending: AtomicBool,
    cmd_pending: AtomicBool,
    contrast_request: AtomicU16,
}

impl SyncState {
    /// Cells for a pump that will boot into `initial`.
    pub const fn new(initial: RunState) -> Self {
        Self {
            run_state: AtomicU8::new(initial.to_u8()),
            copy_pending: AtomicBool::new(false),
            cmd_pending: AtomicBool::new(false),
            contrast_request: AtomicU16::new(CONTRAST_NONE),
        }
    }

    pub fn run_state(&self) -> RunState {
        RunState::from_u8(self.run_state.load(Ordering::Acquire))
    }

    pub fn set_run_state(&self, state: RunState) {
        self.run_state.store(state.to_u8(), Ordering::Release);
    }

    /// Ask the pump to recomposite the derived planes at its next checkpoint.
    ///
    /// The Release store publishes every logical-plane write made before it;
    /// the pump's Acquire load pairs with it.
    pub fn request_copy(&self) {
        self.copy_pending.store(true, Ordering::Release);
    }

    pub fn copy_pending(&self) -> bool {
        self.copy_pending.load(Ordering::Acquire)
    }

    pub fn clear_copy(&self) {
        self.copy_pending.store(false, Ordering::Release);
    }

    /// Hand the staged raw command bytes to the pump.
    pub fn request_cmd(&self) {
        self.cmd_pending.store(true, Ordering::Release);
    }

    pub fn cmd_pending(&self) -> bool {
        self.cmd_pending.load(Ordering::Acquire)
    }

    pub fn clear_cmd(&self) {
        self.cmd_pending.store(false, Ordering::Release);
    }

    /// Request a contrast recompute. A later request overwrites an
    /// unserviced earlier one; the pump applies whichever it observes.
    pub fn request_contrast(&self, level: u8) {
        self.contrast_request.store(level as u16, Ordering::Release);
    }

    /// The pending contrast level, if any.
    pub fn contrast_request(&self) -> Option<u8> {
        match self.contrast_request.load(Ordering::Acquire) {
            CONTRAST_NONE => None,
            level => Some(level as u8),
        }
    }

    pub fn clear_contrast(&self) {
        self.contrast_request.store(CONTRAST_NONE, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_state_round_trip() {
        let states = [
            RunState::Waiting,
            RunState::Starting,
            RunState::Running,
            RunState::Stopping,
            RunState::Stopped,
        ];
        for state in states {
            assert_eq!(RunState::from_u8(state.to_u8()), state);
        }
    }

    #[test]
    fn test_initial_state() {
        let sync = SyncState::new(RunState::Waiting);
        assert_eq!(sync.run_state(), RunState::Waiting);
        assert!(!sync.copy_pending());
        assert!(!sync.cmd_pending());
        assert_eq!(sync.contrast_request(), None);
    }

    #[test]
    fn test_copy_handshake() {
        let sync = SyncState::new(RunState::Running);
        sync.request_copy();
        assert!(sync.copy_pending());
        sync.clear_copy();
        assert!(!sync.copy_pending());
    }

    #[test]
    fn test_contrast_request_overwrites() {
        let sync = SyncState::new(RunState::Running);
        sync.request_contrast(10);
        sync.request_contrast(200);
        assert_eq!(sync.contrast_request(), Some(200));
        sync.clear_contrast();
        assert_eq!(sync.contrast_request(), None);
    }

    #[test]
    fn test_contrast_extremes_are_representable() {
        let sync = SyncState::new(RunState::Running);
        // 0xFF is a level, not the sentinel; the sentinel needs all 16 bits.
        sync.request_contrast(0xFF);
        assert_eq!(sync.contrast_request(), Some(0xFF));
        sync.request_contrast(0);
        assert_eq!(sync.contrast_request(), Some(0));
    }

    #[test]
    fn test_terminal_state() {
        assert!(RunState::Stopped.is_terminal());
        assert!(!RunState::Running.is_terminal());
        assert!(!RunState::Stopping.is_terminal());
    }
}
