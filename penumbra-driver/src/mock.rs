//! Mock bus for host tests
//!
//! Records every transfer the driver makes, segmented by the D/C line,
//! so tests can assert on the exact byte stream a real panel would see.

use std::cell::RefCell;
use std::rc::Rc;
use std::vec::Vec;

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin};
use embedded_hal::spi::{ErrorType as SpiErrorType, SpiBus};

use crate::interface::SpiInterface;

/// One observable bus event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// SPI write with D/C low
    Cmd(Vec<u8>),
    /// SPI write with D/C high
    Data(Vec<u8>),
    CsHigh,
    CsLow,
    RstHigh,
    RstLow,
}

#[derive(Default)]
struct State {
    entries: Vec<Entry>,
    dc_high: bool,
}

/// Shared view of the recorded traffic.
#[derive(Clone)]
pub struct Log(Rc<RefCell<State>>);

impl Log {
    pub fn entries(&self) -> Vec<Entry> {
        self.0.borrow().entries.clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().entries.clear();
    }
}

pub struct MockBus;

impl MockBus {
    /// A fresh interface over recording mocks, plus its log.
    pub fn interface() -> (SpiInterface<MockSpi, MockDc, MockCs, MockRst>, Log) {
        let log = Log(Rc::new(RefCell::new(State::default())));
        let bus = SpiInterface::new(
            MockSpi(log.clone()),
            MockDc(log.clone()),
            MockCs(log.clone()),
            MockRst(log.clone()),
        );
        (bus, log)
    }
}

pub struct MockSpi(Log);

impl SpiErrorType for MockSpi {
    type Error = Infallible;
}

impl SpiBus<u8> for MockSpi {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        words.fill(0);
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        let mut state = self.0 .0.borrow_mut();
        let entry = if state.dc_high {
            Entry::Data(words.to_vec())
        } else {
            Entry::Cmd(words.to_vec())
        };
        state.entries.push(entry);
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        read.fill(0);
        self.write(write)
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        let copy = words.to_vec();
        self.write(&copy)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

pub struct MockDc(Log);

impl PinErrorType for MockDc {
    type Error = Infallible;
}

impl OutputPin for MockDc {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0 .0.borrow_mut().dc_high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0 .0.borrow_mut().dc_high = true;
        Ok(())
    }
}

pub struct MockCs(Log);

impl PinErrorType for MockCs {
    type Error = Infallible;
}

impl OutputPin for MockCs {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0 .0.borrow_mut().entries.push(Entry::CsLow);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0 .0.borrow_mut().entries.push(Entry::CsHigh);
        Ok(())
    }
}

pub struct MockRst(Log);

impl PinErrorType for MockRst {
    type Error = Infallible;
}

impl OutputPin for MockRst {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0 .0.borrow_mut().entries.push(Entry::RstLow);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0 .0.borrow_mut().entries.push(Entry::RstHigh);
        Ok(())
    }
}
