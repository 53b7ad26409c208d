//! Producer-facing control surface
//!
//! A cheap copyable handle over the shared block. Drawing operations
//! mutate the logical plane pair; nothing reaches the panel until a
//! `show` hands the pair to the pump's checkpoint.

use embassy_futures::yield_now;

use penumbra_core::framebuffer::{FramePair, Shade};
use penumbra_core::protocol::cmd;
use penumbra_core::state::RunState;

use crate::shared::{Shared, MAX_PENDING_CMD};

/// Why a raw command was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// More bytes than the staging buffer holds; splitting automatically
    /// could separate a command from its parameters, so the caller must.
    TooLong,
    /// The pump is not running, so nothing owns the bus to send it.
    NotRunning,
}

/// The producer's view of the display.
#[derive(Clone, Copy)]
pub struct Greyscale {
    shared: &'static Shared,
}

impl Greyscale {
    pub fn new(shared: &'static Shared) -> Self {
        Self { shared }
    }

    /// Set every pixel to `shade`.
    pub fn fill(&self, shade: Shade) {
        self.with_frame(|frame| frame.fill(shade));
    }

    /// Set a single pixel. Out-of-panel coordinates are ignored.
    pub fn pixel(&self, x: i32, y: i32, shade: Shade) {
        self.with_frame(|frame| frame.pixel(x, y, shade));
    }

    pub fn hline(&self, x: i32, y: i32, w: i32, shade: Shade) {
        self.with_frame(|frame| frame.hline(x, y, w, shade));
    }

    pub fn vline(&self, x: i32, y: i32, h: i32, shade: Shade) {
        self.with_frame(|frame| frame.vline(x, y, h, shade));
    }

    pub fn rect(&self, x: i32, y: i32, w: i32, h: i32, shade: Shade) {
        self.with_frame(|frame| frame.rect(x, y, w, h, shade));
    }

    pub fn fill_rect(&self, x: i32, y: i32, w: i32, h: i32, shade: Shade) {
        self.with_frame(|frame| frame.fill_rect(x, y, w, h, shade));
    }

    pub fn line(&self, x0: i32, y0: i32, x1: i32, y1: i32, shade: Shade) {
        self.with_frame(|frame| frame.line(x0, y0, x1, y1, shade));
    }

    pub fn text(&self, s: &str, x: i32, y: i32, shade: Shade) {
        self.with_frame(|frame| frame.text(s, x, y, shade));
    }

    /// Run a batch of drawing against the logical pair under one lock.
    pub fn with_frame<R>(&self, f: impl FnOnce(&mut FramePair) -> R) -> R {
        self.shared.frame.lock(|frame| f(&mut frame.borrow_mut()))
    }

    /// Publish the logical planes and wait until the pump has composited
    /// them.
    ///
    /// On return the next transmitted frame is exactly what was drawn
    /// before the call - provided nothing draws again until then. If the
    /// pump is not running the request is left pending and this returns
    /// immediately.
    pub async fn show(&self) {
        self.shared.sync.request_copy();
        if self.shared.sync.run_state() != RunState::Running {
            return;
        }
        while self.shared.sync.copy_pending() {
            yield_now().await;
        }
    }

    /// Publish without waiting. Drawing again before the pump's next
    /// checkpoint races the composition; the frame may mix old and new
    /// content.
    pub fn show_async(&self) {
        self.shared.sync.request_copy();
    }

    /// Request a brightness change (0 = dimmest, 255 = brightest).
    pub fn contrast(&self, level: u8) {
        self.shared.sync.request_contrast(level);
    }

    /// Request a brightness change and wait until the pump has applied it.
    pub async fn contrast_sync(&self, level: u8) {
        self.shared.sync.request_contrast(level);
        if self.shared.sync.run_state() != RunState::Running {
            return;
        }
        while self.shared.sync.contrast_request().is_some() {
            yield_now().await;
        }
    }

    /// Release a delayed-start pump. No-op unless it is still `Waiting`.
    pub fn start(&self) {
        if self.shared.sync.run_state() == RunState::Waiting {
            self.shared.sync.set_run_state(RunState::Starting);
        }
    }

    /// Stop the pump and wait for it to exit.
    ///
    /// The pump finishes its current three-subframe cycle, blanks the
    /// panel, restores the controller's standard configuration and parks
    /// in `Stopped` before this returns.
    pub async fn teardown(&self) {
        if self.shared.sync.run_state() == RunState::Stopped {
            return;
        }
        self.shared.sync.set_run_state(RunState::Stopping);
        while self.shared.sync.run_state() != RunState::Stopped {
            yield_now().await;
        }
    }

    /// Send raw command bytes through the pump's checkpoint and wait for
    /// them to go out on the bus.
    pub async fn command(&self, bytes: &[u8]) -> Result<(), CommandError> {
        if bytes.len() > MAX_PENDING_CMD {
            return Err(CommandError::TooLong);
        }
        if self.shared.sync.run_state() != RunState::Running {
            return Err(CommandError::NotRunning);
        }
        self.shared.pending_cmd.lock(|pending| {
            let mut pending = pending.borrow_mut();
            pending.clear();
            // Length was checked above.
            let _ = pending.extend_from_slice(bytes);
        });
        self.shared.sync.request_cmd();
        while self.shared.sync.cmd_pending() {
            yield_now().await;
        }
        Ok(())
    }

    /// Switch the panel drive on.
    pub async fn power_on(&self) -> Result<(), CommandError> {
        self.command(&[cmd::DISPLAY_ON]).await
    }

    /// Switch the panel drive off (the pump keeps scanning an invisible
    /// image).
    pub async fn power_off(&self) -> Result<(), CommandError> {
        self.command(&[cmd::DISPLAY_OFF]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::StartMode;

    #[test]
    fn test_start_releases_waiting_pump() {
        static SHARED: Shared = Shared::new(StartMode::Delayed);
        let display = Greyscale::new(&SHARED);

        assert_eq!(SHARED.run_state(), RunState::Waiting);
        display.start();
        assert_eq!(SHARED.run_state(), RunState::Starting);
    }

    #[test]
    fn test_start_is_noop_when_not_waiting() {
        static SHARED: Shared = Shared::new(StartMode::Immediate);
        let display = Greyscale::new(&SHARED);

        assert_eq!(SHARED.run_state(), RunState::Starting);
        display.start();
        assert_eq!(SHARED.run_state(), RunState::Starting);

        SHARED.sync.set_run_state(RunState::Running);
        display.start();
        assert_eq!(SHARED.run_state(), RunState::Running);
    }

    #[test]
    fn test_show_async_raises_flag() {
        static SHARED: Shared = Shared::new(StartMode::Delayed);
        let display = Greyscale::new(&SHARED);

        assert!(!SHARED.sync.copy_pending());
        display.show_async();
        assert!(SHARED.sync.copy_pending());
    }

    #[test]
    fn test_contrast_request() {
        static SHARED: Shared = Shared::new(StartMode::Delayed);
        let display = Greyscale::new(&SHARED);

        display.contrast(0x42);
        assert_eq!(SHARED.sync.contrast_request(), Some(0x42));
    }

    #[test]
    fn test_drawing_reaches_logical_planes() {
        static SHARED: Shared = Shared::new(StartMode::Delayed);
        let display = Greyscale::new(&SHARED);

        display.fill(Shade::Black);
        display.pixel(7, 9, Shade::LightGrey);
        display.hline(0, 0, 3, Shade::White);

        display.with_frame(|frame| {
            assert_eq!(frame.shade_at(7, 9), Some(Shade::LightGrey));
            assert_eq!(frame.shade_at(1, 0), Some(Shade::White));
            assert_eq!(frame.shade_at(3, 0), Some(Shade::Black));
        });
    }
}
