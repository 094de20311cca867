//! Transfer lifecycle against simulated peripherals.
//! Covers the busy-flag protocol, chip-select framing and buffer ownership
//! from the caller's point of view.

#![allow(clippy::unwrap_used)]
#![allow(clippy::arithmetic_side_effects)]

use eve_dma::{BusyFlag, BusyState, TransferBuffer, TransferError, Transport};
use eve_platform::dma::{Armed, DmaEngine};
use eve_platform::dma_safety::{MAX_TRANSFER_BYTES, TRANSFER_BUFFER_WORDS};
use eve_platform::gpio::PinState;
use eve_platform::mocks::{Event, EventLog, MockDma, MockPin, MockSpi};
use eve_platform::SpiTx;

fn leak_flag() -> &'static BusyFlag {
    Box::leak(Box::new(BusyFlag::new()))
}

/// CS pin that records the busy flag at every edge.
fn probed_pin(log: &EventLog, busy: &'static BusyFlag) -> MockPin {
    MockPin::with_probe(log.clone(), move || busy.is_busy())
}

#[test]
fn single_word_transfer_sends_three_bytes() {
    let log = EventLog::new();
    let busy = leak_flag();
    let mut buffer = TransferBuffer::<16>::new();
    let mut transport = Transport::new(
        &mut buffer,
        busy,
        MockDma::new(log.clone()),
        MockSpi::new(log.clone()),
        probed_pin(&log, busy),
    );
    transport.init().unwrap();

    transport.append(0xAABB_CCDD).unwrap();
    assert_eq!(transport.start_transfer(), Ok(3));
    assert_eq!(transport.engine().prepared_len(), Some(3));
    assert_eq!(transport.engine().last_source(), &[0xCC, 0xBB, 0xAA]);
    assert!(transport.is_busy());

    transport.on_complete();

    assert_eq!(transport.state(), BusyState::Idle);
    transport.reset_index().unwrap();
    assert_eq!(transport.fill_index(), 0);
}

#[test]
fn back_to_back_start_is_rejected_without_touching_hardware() {
    let log = EventLog::new();
    let busy = leak_flag();
    let mut buffer = TransferBuffer::<16>::new();
    let mut transport = Transport::new(
        &mut buffer,
        busy,
        MockDma::new(log.clone()),
        MockSpi::new(log.clone()),
        probed_pin(&log, busy),
    );

    transport.append(1).unwrap();
    transport.append(2).unwrap();
    transport.start_transfer().unwrap();
    let before = log.events();

    assert_eq!(transport.start_transfer(), Err(TransferError::Busy));

    assert_eq!(log.events(), before);
    assert!(busy.is_busy());
    assert_eq!(transport.engine().started(), 1);
    assert_eq!(transport.stats().rejected, 1);
}

#[test]
fn completion_leaves_receiver_on_cs_high_and_flag_idle() {
    let log = EventLog::new();
    let busy = leak_flag();
    let mut buffer = TransferBuffer::<16>::new();
    let spi = MockSpi::new(log.clone());
    spi.drain_after(10);
    let mut transport = Transport::new(
        &mut buffer,
        busy,
        MockDma::new(log.clone()),
        spi,
        probed_pin(&log, busy),
    );

    transport.append(1).unwrap();
    transport.start_transfer().unwrap();
    transport.on_complete();

    assert!(!busy.is_busy());
    assert!(!transport.chip_select().is_asserted());
    assert!(transport.spi().receiver_enabled());
}

#[test]
fn flag_is_cleared_only_after_cs_deasserts() {
    let log = EventLog::new();
    let busy = leak_flag();
    let mut buffer = TransferBuffer::<16>::new();
    let mut transport = Transport::new(
        &mut buffer,
        busy,
        MockDma::new(log.clone()),
        MockSpi::new(log.clone()),
        probed_pin(&log, busy),
    );

    transport.append(1).unwrap();
    transport.start_transfer().unwrap();
    transport.on_complete();

    // CS asserts before the flag is published, and deasserts while it is
    // still pending: a caller that sees idle always sees CS high.
    let edges: Vec<_> = log
        .events()
        .into_iter()
        .filter(|e| matches!(e, Event::ChipSelect { .. }))
        .collect();
    assert_eq!(
        edges,
        vec![
            Event::ChipSelect {
                level: PinState::Low,
                busy: Some(false)
            },
            Event::ChipSelect {
                level: PinState::High,
                busy: Some(true)
            },
        ]
    );
}

#[test]
fn receiver_is_enabled_before_cs_deasserts() {
    let log = EventLog::new();
    let busy = leak_flag();
    let mut buffer = TransferBuffer::<16>::new();
    let mut transport = Transport::new(
        &mut buffer,
        busy,
        MockDma::new(log.clone()),
        MockSpi::new(log.clone()),
        MockPin::new(log.clone()),
    );

    transport.append(1).unwrap();
    transport.start_transfer().unwrap();
    log.clear();
    transport.on_complete();

    let drained = log.position(&Event::Drained).unwrap();
    let rx_on = log.position(&Event::Receiver(true)).unwrap();
    let cs_high = log
        .position(&Event::ChipSelect {
            level: PinState::High,
            busy: None,
        })
        .unwrap();
    assert!(drained < rx_on);
    assert!(rx_on < cs_high);
}

#[test]
fn repeated_session_yields_same_length() {
    let log = EventLog::new();
    let busy = leak_flag();
    let mut buffer = TransferBuffer::<16>::new();
    let mut transport = Transport::new(
        &mut buffer,
        busy,
        MockDma::new(log.clone()),
        MockSpi::new(log.clone()),
        MockPin::new(log.clone()),
    );
    let words = [0x11, 0x22, 0x33, 0x44, 0x55];

    let mut lengths = Vec::new();
    for _ in 0..2 {
        transport.reset_index().unwrap();
        for word in words {
            transport.append(word).unwrap();
        }
        lengths.push(transport.start_transfer().unwrap());
        transport.on_complete();
    }

    assert_eq!(lengths, vec![19, 19]);
    assert_eq!(transport.stats().completed, 2);
}

#[test]
fn full_buffer_length_does_not_wrap() {
    let log = EventLog::new();
    let busy = leak_flag();
    let mut buffer = Box::new(TransferBuffer::<TRANSFER_BUFFER_WORDS>::new());
    let mut transport = Transport::new(
        &mut *buffer,
        busy,
        MockDma::new(log.clone()),
        MockSpi::new(log.clone()),
        MockPin::new(log.clone()),
    );

    for i in 0..TRANSFER_BUFFER_WORDS {
        transport.append(u32::try_from(i).unwrap()).unwrap();
    }
    assert_eq!(transport.remaining_capacity(), 0);
    assert_eq!(transport.append(0), Err(TransferError::BufferFull));

    let len = transport.start_transfer().unwrap();
    assert_eq!(usize::from(len), MAX_TRANSFER_BYTES);
    assert_eq!(len, 4099);
    assert_eq!(transport.engine().prepared_len(), Some(4099));
}

#[test]
fn begin_write_frames_memory_write() {
    let log = EventLog::new();
    let busy = leak_flag();
    let mut buffer = TransferBuffer::<16>::new();
    let mut transport = Transport::new(
        &mut buffer,
        busy,
        MockDma::new(log.clone()),
        MockSpi::new(log.clone()),
        MockPin::new(log.clone()),
    );

    transport.append(0xFFFF_FFFF).unwrap();
    transport.begin_write(0x30_8000).unwrap();
    transport.append(0x0403_0201).unwrap();

    assert_eq!(transport.start_transfer(), Ok(7));
    assert_eq!(
        transport.engine().last_source(),
        &[0xB0, 0x80, 0x00, 0x01, 0x02, 0x03, 0x04]
    );
}

/// Engine that records the busy flag at the moment the channel is enabled.
struct FlagProbeDma {
    busy: &'static BusyFlag,
    seen_at_start: Option<bool>,
}

impl DmaEngine for FlagProbeDma {
    type Error = ();

    fn init(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn prepare(&mut self, _source: &[u8]) -> Result<(), Self::Error> {
        Ok(())
    }

    fn start(&mut self, _source: &[u8]) -> Result<Armed, Self::Error> {
        self.seen_at_start = Some(self.busy.is_busy());
        Ok(Armed::Pending)
    }

    fn acknowledge(&mut self) {}
}

#[test]
fn flag_is_pending_before_channel_enable() {
    let log = EventLog::new();
    let busy = leak_flag();
    let mut buffer = TransferBuffer::<16>::new();
    let engine = FlagProbeDma {
        busy,
        seen_at_start: None,
    };
    let mut transport = Transport::new(
        &mut buffer,
        busy,
        engine,
        MockSpi::new(log.clone()),
        MockPin::new(log.clone()),
    );

    transport.append(1).unwrap();
    transport.start_transfer().unwrap();

    assert_eq!(transport.engine().seen_at_start, Some(true));
}

#[test]
fn refused_arm_can_be_retried() {
    let log = EventLog::new();
    let busy = leak_flag();
    let mut buffer = TransferBuffer::<16>::new();
    let mut dma = MockDma::new(log.clone());
    dma.refuse_next_starts(2);
    let mut transport = Transport::new(
        &mut buffer,
        busy,
        dma,
        MockSpi::new(log.clone()),
        MockPin::new(log.clone()),
    );
    transport.append(1).unwrap();

    let mut attempts = 0;
    let len = loop {
        attempts += 1;
        match transport.start_transfer() {
            Ok(len) => break len,
            Err(e) => {
                assert!(e.is_retryable());
                assert!(!busy.is_busy());
            }
        }
    };

    assert_eq!(attempts, 3);
    assert_eq!(len, 3);
    assert_eq!(transport.stats().failed, 2);
    assert_eq!(transport.stats().started, 1);
    assert_eq!(transport.fill_index(), 1);
}
