//! 4-wire SPI display interface
//!
//! Command/data framing for a write-only SSD1306-style serial bus: the
//! D/C line low selects commands, high selects display memory; CS frames
//! the whole grey-mode session rather than individual transfers; RST
//! drives the power-on reset pulse.

use embassy_time::Timer;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

/// Bus-level failure. Type-erased: by the time either half of the bus
/// refuses a write there is nothing useful left to do with the details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// SPI transfer failed
    Spi,
    /// A control pin refused to switch
    Pin,
}

/// The display's serial bus plus its three control lines.
pub struct SpiInterface<SPI, DC, CS, RST> {
    spi: SPI,
    dc: DC,
    cs: CS,
    rst: RST,
}

impl<SPI, DC, CS, RST> SpiInterface<SPI, DC, CS, RST>
where
    SPI: SpiBus<u8>,
    DC: OutputPin,
    CS: OutputPin,
    RST: OutputPin,
{
    pub fn new(spi: SPI, dc: DC, cs: CS, rst: RST) -> Self {
        Self { spi, dc, cs, rst }
    }

    /// Send command bytes (D/C low).
    pub fn command(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        self.dc.set_low().map_err(|_| BusError::Pin)?;
        self.spi.write(bytes).map_err(|_| BusError::Spi)
    }

    /// Send display memory bytes (D/C high).
    pub fn data(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        self.dc.set_high().map_err(|_| BusError::Pin)?;
        self.spi.write(bytes).map_err(|_| BusError::Spi)
    }

    /// Assert chip select for the duration of a session.
    pub fn select(&mut self) -> Result<(), BusError> {
        self.cs.set_low().map_err(|_| BusError::Pin)
    }

    /// Release chip select.
    pub fn deselect(&mut self) -> Result<(), BusError> {
        self.cs.set_high().map_err(|_| BusError::Pin)
    }

    /// Pulse the reset line with the controller's required settle times.
    pub async fn hard_reset(&mut self) -> Result<(), BusError> {
        self.rst.set_high().map_err(|_| BusError::Pin)?;
        Timer::after_millis(1).await;
        self.rst.set_low().map_err(|_| BusError::Pin)?;
        Timer::after_millis(10).await;
        self.rst.set_high().map_err(|_| BusError::Pin)?;
        Timer::after_millis(10).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Entry, MockBus};

    #[test]
    fn test_command_and_data_framing() {
        let (mut bus, log) = MockBus::interface();

        bus.command(&[0xA8, 0x00]).unwrap();
        bus.data(&[0x55, 0xAA]).unwrap();
        bus.command(&[0x81, 0x7F]).unwrap();

        let entries = log.entries();
        assert_eq!(
            entries,
            [
                Entry::Cmd(std::vec![0xA8, 0x00]),
                Entry::Data(std::vec![0x55, 0xAA]),
                Entry::Cmd(std::vec![0x81, 0x7F]),
            ]
        );
    }

    #[test]
    fn test_chip_select_session() {
        let (mut bus, log) = MockBus::interface();

        bus.deselect().unwrap();
        bus.select().unwrap();
        bus.command(&[0xAE]).unwrap();

        let entries = log.entries();
        assert_eq!(entries[0], Entry::CsHigh);
        assert_eq!(entries[1], Entry::CsLow);
    }
}
