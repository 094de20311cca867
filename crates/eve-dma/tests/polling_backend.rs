//! Polling fallback end to end with embedded-hal-mock bus and pins.
//! The transfer finishes inside `start_transfer`; the busy flag is never
//! observed pending by the caller.

#![allow(clippy::unwrap_used)]

use embedded_hal::spi::{ErrorKind, ErrorType, SpiBus};
use embedded_hal_mock::eh1::digital::{
    Mock as PinMock, State as PinStateMock, Transaction as PinTransaction,
};
use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};
use eve_dma::backend::{PollingEngine, PollingError};
use eve_dma::{BusyFlag, TransferBuffer, TransferError, Transport};
use eve_platform::spi::NoReceiverGate;

#[test]
fn write_is_framed_by_chip_select() {
    let bus = SpiMock::<u8>::new(&[
        SpiTransaction::write_vec(vec![0x80, 0x10, 0x00, 0xEF, 0xBE, 0xAD, 0xDE]),
        SpiTransaction::flush(),
    ]);
    let cs = PinMock::new(&[
        PinTransaction::set(PinStateMock::High),
        PinTransaction::set(PinStateMock::Low),
        PinTransaction::set(PinStateMock::High),
    ]);
    let busy = BusyFlag::new();
    let mut buffer = TransferBuffer::<8>::new();
    let mut transport = Transport::new(
        &mut buffer,
        &busy,
        PollingEngine::new(bus),
        NoReceiverGate,
        cs,
    );

    transport.init().unwrap();
    transport.begin_write(0x1000).unwrap();
    transport.append(0xDEAD_BEEF).unwrap();

    assert_eq!(transport.start_transfer(), Ok(7));
    assert!(!transport.is_busy());
    assert!(!transport.chip_select().is_asserted());
    assert_eq!(transport.stats().started, 1);
    assert_eq!(transport.stats().completed, 1);

    let (engine, _, mut cs) = transport.release().unwrap();
    engine.into_inner().done();
    cs.done();
}

/// Bus whose every write fails.
struct FailingBus;

impl ErrorType for FailingBus {
    type Error = ErrorKind;
}

impl SpiBus for FailingBus {
    fn read(&mut self, _words: &mut [u8]) -> Result<(), Self::Error> {
        Err(ErrorKind::Other)
    }

    fn write(&mut self, _words: &[u8]) -> Result<(), Self::Error> {
        Err(ErrorKind::Other)
    }

    fn transfer(&mut self, _read: &mut [u8], _write: &[u8]) -> Result<(), Self::Error> {
        Err(ErrorKind::Other)
    }

    fn transfer_in_place(&mut self, _words: &mut [u8]) -> Result<(), Self::Error> {
        Err(ErrorKind::Other)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[test]
fn bus_error_leaves_flag_idle_and_cs_released() {
    let cs = PinMock::new(&[
        PinTransaction::set(PinStateMock::Low),
        PinTransaction::set(PinStateMock::High),
    ]);
    let busy = BusyFlag::new();
    let mut buffer = TransferBuffer::<8>::new();
    let mut transport = Transport::new(
        &mut buffer,
        &busy,
        PollingEngine::new(FailingBus),
        NoReceiverGate,
        cs,
    );

    transport.append(1).unwrap();
    let err = transport.start_transfer().unwrap_err();

    assert_eq!(err, TransferError::Dma(PollingError::Bus(ErrorKind::Other)));
    assert!(!busy.is_busy());
    assert_eq!(transport.stats().failed, 1);
    assert_eq!(transport.fill_index(), 1);

    let (_, _, mut cs) = transport.release().unwrap();
    cs.done();
}
