//! The display pump
//!
//! A background task body that owns the bus and the derived planes. Each
//! perceived frame is three hardware subframes: one derived plane each,
//! at ascending contrast weights, on a fixed microsecond schedule set by
//! the controller's internal row clock.
//!
//! The controller has no frame-sync output, so before every subframe the
//! row counter is parked with an out-of-spec 1-row multiplex ratio, and
//! after loading the plane the scan resumes over the visible rows plus a
//! padding region. The wait budgets keep our schedule and the
//! controller's oscillator from drifting a visible distance apart within
//! one subframe.
//!
//! This is a soft-real-time loop. A missed budget shows up as flicker or
//! banding, never as an error, and there is no recovery path.

use embassy_futures::yield_now;
use embassy_time::{Duration, Instant, Timer};
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

use penumbra_core::compose::DerivedPlanes;
use penumbra_core::protocol::Protocol;
use penumbra_core::state::RunState;
use penumbra_core::SUBFRAMES;

use crate::interface::{BusError, SpiInterface};
use crate::shared::Shared;

/// The pump half of a display: bus, derived planes, contrast table.
pub struct Pump<SPI, DC, CS, RST> {
    bus: SpiInterface<SPI, DC, CS, RST>,
    shared: &'static Shared,
    protocol: Protocol,
    derived: DerivedPlanes,
    frame_adj: [[u8; 2]; SUBFRAMES],
}

impl<SPI, DC, CS, RST> Pump<SPI, DC, CS, RST>
where
    SPI: SpiBus<u8>,
    DC: OutputPin,
    CS: OutputPin,
    RST: OutputPin,
{
    pub fn new(bus: SpiInterface<SPI, DC, CS, RST>, shared: &'static Shared) -> Self {
        Self::with_protocol(bus, shared, Protocol::ssd1306_72x40())
    }

    /// A pump with substituted protocol tables (other controller
    /// revisions, other timings).
    pub fn with_protocol(
        bus: SpiInterface<SPI, DC, CS, RST>,
        shared: &'static Shared,
        protocol: Protocol,
    ) -> Self {
        Self {
            bus,
            shared,
            protocol,
            derived: DerivedPlanes::new(),
            frame_adj: Protocol::contrast_ramp(0xFF),
        }
    }

    /// Run the pump until torn down (or until the bus dies). Terminal
    /// state is always `Stopped`.
    pub async fn run(mut self) -> Result<(), BusError> {
        // Delayed start: park until released or abandoned. No hardware
        // has been touched yet, so an abandoned pump just exits.
        loop {
            match self.shared.sync.run_state() {
                RunState::Waiting => yield_now().await,
                RunState::Stopping | RunState::Stopped => {
                    self.shared.sync.set_run_state(RunState::Stopped);
                    return Ok(());
                }
                _ => break,
            }
        }

        let result = self.pump_loop().await;

        #[cfg(feature = "defmt")]
        if let Err(err) = result {
            defmt::warn!("display bus failed, pump stopping: {}", err);
        }

        // Release anything blocked on a request before parking terminal.
        self.shared.sync.clear_copy();
        self.shared.sync.clear_contrast();
        self.shared.sync.clear_cmd();
        self.shared.sync.set_run_state(RunState::Stopped);
        result
    }

    async fn pump_loop(&mut self) -> Result<(), BusError> {
        self.bus.deselect()?;
        self.bus.hard_reset().await?;
        self.bus.select()?;
        self.load_grey_mode()?;

        self.shared.sync.set_run_state(RunState::Running);
        #[cfg(feature = "defmt")]
        defmt::info!("display pump running");

        while self.shared.sync.run_state() == RunState::Running {
            for index in 0..SUBFRAMES {
                self.subframe(index).await?;
            }
        }

        // Only a stop request leads here. Flash a blank frame so
        // persistence doesn't leave a ghost, then hand the controller
        // back in its standard configuration.
        self.blank_and_flush()?;
        self.bus.deselect()?;
        self.bus.hard_reset().await?;
        self.bus.select()?;
        self.bus.command(self.protocol.restore_cmds)?;
        self.bus.deselect()?;

        #[cfg(feature = "defmt")]
        defmt::info!("display pump stopped");
        Ok(())
    }

    /// One subframe on the wire, with its two timing waits.
    async fn subframe(&mut self, index: usize) -> Result<(), BusError> {
        let park_start = Instant::now();
        self.park_row_counter()?;
        Self::sleep_remainder(park_start, self.protocol.pre_frame_us).await;

        let scan_start = Instant::now();
        self.send_parked_subframe(index)?;

        if index == SUBFRAMES - 1 {
            self.checkpoint()?;
        }

        Self::sleep_remainder_coarse(scan_start, self.protocol.frame_us).await;
        Ok(())
    }

    /// Force the row counter to its known parking position.
    fn park_row_counter(&mut self) -> Result<(), BusError> {
        self.bus.command(&self.protocol.pre_frame_cmds)
    }

    /// Load one derived plane and resume the extended scan, weighting the
    /// subframe with its contrast pair.
    fn send_parked_subframe(&mut self, index: usize) -> Result<(), BusError> {
        self.bus.data(self.derived.plane(index))?;
        self.bus.command(&self.frame_adj[index])?;
        self.bus.command(&self.protocol.post_frame_cmds)?;
        // The contrast write can lose an ordering race against the
        // multiplex change; repeating it wins either way.
        self.bus.command(&self.frame_adj[index])
    }

    /// The end-of-cycle maintenance slot: at most one action per cycle,
    /// in priority order copy > contrast > queued command.
    fn checkpoint(&mut self) -> Result<(), BusError> {
        let shared = self.shared;
        if shared.sync.copy_pending() {
            shared
                .frame
                .lock(|frame| self.derived.compose(&frame.borrow()));
            shared.sync.clear_copy();
        } else if let Some(level) = shared.sync.contrast_request() {
            self.frame_adj = Protocol::contrast_ramp(level);
            shared.sync.clear_contrast();
        } else if shared.sync.cmd_pending() {
            shared
                .pending_cmd
                .lock(|pending| self.bus.command(&pending.borrow()))?;
            shared.sync.clear_cmd();
        }
        Ok(())
    }

    /// Grey-mode bring-up: fast-scan init, clear the whole GDRAM, set the
    /// panel window, and seed the derived planes from whatever the
    /// producer drew before start.
    fn load_grey_mode(&mut self) -> Result<(), BusError> {
        self.bus.command(self.protocol.init_cmds)?;
        let zeros = [0u8; 32];
        for _ in 0..32 {
            self.bus.data(&zeros)?;
        }
        self.bus.command(self.protocol.window_cmds)?;

        let shared = self.shared;
        shared
            .frame
            .lock(|frame| self.derived.compose(&frame.borrow()));
        Ok(())
    }

    /// Blank the first derived plane and push it out once.
    fn blank_and_flush(&mut self) -> Result<(), BusError> {
        self.derived.blank_first();
        self.bus.data(self.derived.plane(0))
    }

    /// Sleep out whatever remains of `budget_us` measured from `start`.
    async fn sleep_remainder(start: Instant, budget_us: u64) {
        let elapsed = start.elapsed().as_micros();
        if elapsed < budget_us {
            Timer::after(Duration::from_micros(budget_us - elapsed)).await;
        }
    }

    /// Same, but a coarse millisecond wait first so the fine wait only
    /// trims the tail.
    async fn sleep_remainder_coarse(start: Instant, budget_us: u64) {
        let elapsed = start.elapsed().as_micros();
        if elapsed < budget_us {
            let remaining = budget_us - elapsed;
            if remaining >= 1024 {
                Timer::after(Duration::from_millis(remaining >> 10)).await;
            }
        }
        Self::sleep_remainder(start, budget_us).await;
    }
}
