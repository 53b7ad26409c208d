//! Penumbra demo firmware
//!
//! Drives the 72x40 SSD1306-class OLED found on RP2040 handhelds in
//! 4-shade grey mode. The display pump gets core 1 to itself - its
//! subframe schedule must not compete with the producer - while core 0
//! draws a small demo: shade bars, a sweeping cursor, a brightness cycle.
//!
//! Wiring (SPI0): SCK=GPIO18, MOSI=GPIO19, D/C=GPIO17, CS=GPIO16,
//! RST=GPIO20.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::{Executor, Spawner};
use embassy_rp::gpio::{Level, Output};
use embassy_rp::multicore::{spawn_core1, Stack};
use embassy_rp::peripherals::SPI0;
use embassy_rp::spi::{self, Spi};
use embassy_time::Timer;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use penumbra_core::framebuffer::Shade;
use penumbra_driver::{Greyscale, Pump, Shared, SpiInterface, StartMode};

/// Display bus clock. The controller tolerates far more than the
/// datasheet's 10 MHz; the subframe schedule depends on transfers being
/// a small fraction of the row budget.
const SPI_HZ: u32 = 100_000_000;

static SHARED: Shared = Shared::new(StartMode::Delayed);

static mut CORE1_STACK: Stack<4096> = Stack::new();
static EXECUTOR1: StaticCell<Executor> = StaticCell::new();

type DisplaySpi = Spi<'static, SPI0, spi::Blocking>;
type DisplayPump = Pump<DisplaySpi, Output<'static>, Output<'static>, Output<'static>>;

#[embassy_executor::task]
async fn pump_task(pump: DisplayPump) {
    if pump.run().await.is_err() {
        error!("display pump exited on bus error");
    }
}

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("penumbra demo starting");

    let p = embassy_rp::init(Default::default());

    let mut config = spi::Config::default();
    config.frequency = SPI_HZ;
    let spi = Spi::new_blocking_txonly(p.SPI0, p.PIN_18, p.PIN_19, config);

    let dc = Output::new(p.PIN_17, Level::Low);
    let cs = Output::new(p.PIN_16, Level::High);
    let rst = Output::new(p.PIN_20, Level::High);

    let pump = Pump::new(SpiInterface::new(spi, dc, cs, rst), &SHARED);

    // The pump owns core 1 outright.
    let core1_stack = unsafe { &mut *core::ptr::addr_of_mut!(CORE1_STACK) };
    spawn_core1(p.CORE1, core1_stack, move || {
        let executor1 = EXECUTOR1.init(Executor::new());
        executor1.run(|spawner| spawner.spawn(pump_task(pump)).unwrap());
    });

    let display = Greyscale::new(&SHARED);

    // Drawn before start: the very first frames show the banner.
    display.fill(Shade::Black);
    display.text("penumbra", 6, 8, Shade::White);
    display.hline(6, 17, 48, Shade::LightGrey);

    display.start();
    display.show().await;
    info!("display pump released");

    Timer::after_secs(2).await;

    const LEVELS: [u8; 3] = [0x40, 0x90, 0xFF];
    let mut tick: i32 = 0;
    loop {
        display.with_frame(|frame| {
            frame.fill(Shade::Black);

            // Shade bars across the top.
            for (i, shade) in [
                Shade::Black,
                Shade::DarkGrey,
                Shade::LightGrey,
                Shade::White,
            ]
            .into_iter()
            .enumerate()
            {
                frame.fill_rect(i as i32 * 18, 0, 18, 12, shade);
            }
            frame.rect(0, 0, 72, 12, Shade::DarkGrey);

            // Sweeping cursor in a framed region below.
            frame.rect(0, 14, 72, 26, Shade::DarkGrey);
            frame.vline(2 + tick % 68, 16, 22, Shade::White);
            frame.text("grey", 24, 25, Shade::LightGrey);
        });
        display.show().await;

        // Step the brightness every second or so.
        if tick % 32 == 0 {
            let level = LEVELS[(tick / 32) as usize % LEVELS.len()];
            display.contrast(level);
        }

        tick += 1;
        Timer::after_millis(33).await;
    }
}
