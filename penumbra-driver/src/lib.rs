//! Hardware-facing half of the Penumbra greyscale driver
//!
//! Splits the display into two cooperating units:
//!
//! - [`Greyscale`], the producer-facing handle: drawing operations on the
//!   logical plane pair plus the show/contrast/lifecycle control surface.
//! - [`Pump`], the background task body that owns the bus, composites the
//!   derived planes, and cycles them on the controller's row-clock
//!   schedule.
//!
//! Both sides meet in a [`Shared`] block. One `Shared` must drive exactly
//! one physical bus; nothing enforces that, it is a wiring obligation of
//! the caller.

#![no_std]

#[cfg(test)]
extern crate std;

pub mod handle;
pub mod interface;
pub mod pump;
pub mod shared;

#[cfg(test)]
mod mock;

pub use handle::{CommandError, Greyscale};
pub use interface::{BusError, SpiInterface};
pub use pump::Pump;
pub use shared::{Shared, StartMode};
