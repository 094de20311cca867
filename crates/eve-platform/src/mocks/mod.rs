//! Mock implementations for testing
//!
//! Simulated peripherals for every platform trait, for use in unit and
//! integration tests. Each mock records what it did into a shared
//! [`EventLog`] so tests can assert the relative order of operations across
//! peripherals (DMA, SPI, chip-select).
//!
//! All mocks are `Send` so a transport built from them can live in a
//! `static` behind a critical-section mutex, as it would on hardware.

#![cfg(any(test, feature = "std"))]
#![allow(clippy::missing_panics_doc)]

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::vec::Vec;

use crate::dma::{Armed, DmaEngine};
use crate::gpio::PinState;
use crate::irq::IrqLine;
use crate::regs::RegisterBlock;
use crate::spi::SpiTx;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Event log ───────────────────────────────────────────────────────────────

/// One observable hardware action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// DMA controller initialised.
    DmaInit,
    /// Descriptor rewritten for a transfer of `len` bytes.
    DescriptorLoaded {
        /// Transfer length in bytes.
        len: usize,
    },
    /// DMA channel enabled.
    DmaStarted,
    /// DMA arm request refused.
    DmaRejected,
    /// Transfer-complete flag acknowledged.
    DmaAcknowledged,
    /// SPI receive path switched.
    Receiver(bool),
    /// SPI shift register observed empty.
    Drained,
    /// SPI clock switched to the burst rate (`true`) or back.
    BurstClock(bool),
    /// Chip-select line driven.
    ChipSelect {
        /// Level driven onto the line.
        level: PinState,
        /// Busy flag sampled at the moment of the write, if probed.
        busy: Option<bool>,
    },
    /// Interrupt line enabled at a priority.
    IrqEnabled(u8),
    /// Interrupt line masked.
    IrqDisabled,
}

/// Shared, cloneable record of [`Event`]s.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn push(&self, event: Event) {
        lock(&self.0).push(event);
    }

    /// Snapshot of all events so far.
    pub fn events(&self) -> Vec<Event> {
        lock(&self.0).clone()
    }

    /// Forget all events.
    pub fn clear(&self) {
        lock(&self.0).clear();
    }

    /// Index of the first event equal to `event`.
    pub fn position(&self, event: &Event) -> Option<usize> {
        lock(&self.0).iter().position(|e| e == event)
    }

    /// Number of events equal to `event`.
    pub fn count(&self, event: &Event) -> usize {
        lock(&self.0).iter().filter(|e| *e == event).count()
    }
}

// ── DMA engine ──────────────────────────────────────────────────────────────

/// Errors a [`MockDma`] can be told to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockDmaError {
    /// The arm request was refused (queue busy / not ready).
    NotReady,
}

/// DMA engine that records calls instead of moving bytes.
#[derive(Debug)]
pub struct MockDma {
    log: EventLog,
    outcome: Armed,
    refuse_starts: usize,
    last_source: Vec<u8>,
    prepared_len: Option<usize>,
    started: usize,
}

impl MockDma {
    /// Engine whose transfers complete through the (simulated) interrupt.
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            outcome: Armed::Pending,
            refuse_starts: 0,
            last_source: Vec::new(),
            prepared_len: None,
            started: 0,
        }
    }

    /// Engine that reports every transfer as already finished.
    pub fn completing_inline(log: EventLog) -> Self {
        Self {
            outcome: Armed::Completed,
            ..Self::new(log)
        }
    }

    /// Refuse the next `count` start requests with [`MockDmaError::NotReady`].
    pub fn refuse_next_starts(&mut self, count: usize) {
        self.refuse_starts = count;
    }

    /// Bytes handed to the last successful start.
    pub fn last_source(&self) -> &[u8] {
        &self.last_source
    }

    /// Length the descriptor was last prepared with.
    pub fn prepared_len(&self) -> Option<usize> {
        self.prepared_len
    }

    /// Number of successful starts.
    pub fn started(&self) -> usize {
        self.started
    }
}

impl DmaEngine for MockDma {
    type Error = MockDmaError;

    fn init(&mut self) -> Result<(), Self::Error> {
        self.log.push(Event::DmaInit);
        Ok(())
    }

    fn prepare(&mut self, source: &[u8]) -> Result<(), Self::Error> {
        self.prepared_len = Some(source.len());
        self.log.push(Event::DescriptorLoaded { len: source.len() });
        Ok(())
    }

    fn start(&mut self, source: &[u8]) -> Result<Armed, Self::Error> {
        if self.refuse_starts > 0 {
            self.refuse_starts = self.refuse_starts.saturating_sub(1);
            self.log.push(Event::DmaRejected);
            return Err(MockDmaError::NotReady);
        }
        self.last_source = source.to_vec();
        self.started = self.started.saturating_add(1);
        self.log.push(Event::DmaStarted);
        Ok(self.outcome)
    }

    fn acknowledge(&mut self) {
        self.log.push(Event::DmaAcknowledged);
    }
}

// ── SPI transmit port ───────────────────────────────────────────────────────

/// SPI port whose shift register drains after a configurable number of polls.
#[derive(Debug)]
pub struct MockSpi {
    log: EventLog,
    receiver: bool,
    burst: bool,
    polls_until_drained: Mutex<usize>,
    polls: Mutex<usize>,
}

impl MockSpi {
    /// Port that is drained on the first poll.
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            receiver: true,
            burst: false,
            polls_until_drained: Mutex::new(0),
            polls: Mutex::new(0),
        }
    }

    /// Report "still shifting" for the next `polls` drain checks.
    pub fn drain_after(&self, polls: usize) {
        *lock(&self.polls_until_drained) = polls;
    }

    /// Total drain checks so far.
    pub fn drain_polls(&self) -> usize {
        *lock(&self.polls)
    }

    /// True while the burst clock is selected.
    pub fn burst_clock(&self) -> bool {
        self.burst
    }
}

impl SpiTx for MockSpi {
    fn set_receiver(&mut self, enabled: bool) {
        self.receiver = enabled;
        self.log.push(Event::Receiver(enabled));
    }

    fn is_drained(&self) -> bool {
        let mut polls = lock(&self.polls);
        *polls = polls.saturating_add(1);
        let mut remaining = lock(&self.polls_until_drained);
        if *remaining > 0 {
            *remaining = remaining.saturating_sub(1);
            return false;
        }
        self.log.push(Event::Drained);
        true
    }

    fn receiver_enabled(&self) -> bool {
        self.receiver
    }

    fn set_burst_clock(&mut self, burst: bool) {
        self.burst = burst;
        self.log.push(Event::BurstClock(burst));
    }
}

// ── GPIO ────────────────────────────────────────────────────────────────────

/// Error produced by a [`MockPin`] told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockPinError;

impl embedded_hal::digital::Error for MockPinError {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

type Probe = Box<dyn Fn() -> bool + Send>;

/// Output pin that logs every level it drives as [`Event::ChipSelect`].
pub struct MockPin {
    log: EventLog,
    level: PinState,
    probe: Option<Probe>,
    fail_next: bool,
}

impl MockPin {
    /// Pin starting high.
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            level: PinState::High,
            probe: None,
            fail_next: false,
        }
    }

    /// Sample `probe` (typically the busy flag) on every write and record
    /// the result alongside the level.
    pub fn with_probe(log: EventLog, probe: impl Fn() -> bool + Send + 'static) -> Self {
        Self {
            probe: Some(Box::new(probe)),
            ..Self::new(log)
        }
    }

    /// Make the next write fail without changing the level.
    pub fn fail_next_write(&mut self) {
        self.fail_next = true;
    }

    /// Level last driven.
    pub fn level(&self) -> PinState {
        self.level
    }

    fn drive(&mut self, level: PinState) -> Result<(), MockPinError> {
        if self.fail_next {
            self.fail_next = false;
            return Err(MockPinError);
        }
        self.level = level;
        let busy = self.probe.as_ref().map(|probe| probe());
        self.log.push(Event::ChipSelect { level, busy });
        Ok(())
    }
}

impl core::fmt::Debug for MockPin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MockPin")
            .field("level", &self.level)
            .field("probed", &self.probe.is_some())
            .finish_non_exhaustive()
    }
}

impl embedded_hal::digital::ErrorType for MockPin {
    type Error = MockPinError;
}

impl embedded_hal::digital::OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(PinState::Low)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(PinState::High)
    }
}

// ── Interrupt line ──────────────────────────────────────────────────────────

/// Interrupt line that only records enable/disable.
#[derive(Debug, Clone)]
pub struct MockIrq {
    log: EventLog,
}

impl MockIrq {
    /// Line logging into `log`.
    pub fn new(log: EventLog) -> Self {
        Self { log }
    }
}

impl IrqLine for MockIrq {
    fn enable(&mut self, priority: u8) {
        self.log.push(Event::IrqEnabled(priority));
    }

    fn disable(&mut self) {
        self.log.push(Event::IrqDisabled);
    }
}

// ── Simulated register block ────────────────────────────────────────────────

/// One register write seen by a [`SimRegisters`] block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterWrite {
    /// Byte offset in the block.
    pub offset: usize,
    /// Access width in bytes (1, 2 or 4).
    pub width: u8,
    /// Value written.
    pub value: u32,
}

#[derive(Debug, Clone, Copy)]
struct DelayedBits {
    offset: usize,
    mask: u32,
    reads_left: usize,
}

#[derive(Debug, Default)]
struct SimState {
    memory: Vec<u8>,
    writes: Vec<RegisterWrite>,
    self_clearing: Vec<(usize, u32)>,
    delayed: Vec<DelayedBits>,
}

impl SimState {
    fn load(&self, offset: usize, width: usize) -> u32 {
        let end = offset.saturating_add(width);
        assert!(
            end <= self.memory.len(),
            "register read past end of simulated block"
        );
        let mut word = [0u8; 4];
        for (dst, src) in word
            .iter_mut()
            .zip(self.memory.get(offset..end).unwrap_or_default())
        {
            *dst = *src;
        }
        u32::from_le_bytes(word)
    }

    fn store(&mut self, offset: usize, width: usize, value: u32) {
        let end = offset.saturating_add(width);
        assert!(
            end <= self.memory.len(),
            "register write past end of simulated block"
        );
        if let Some(bytes) = self.memory.get_mut(offset..end) {
            for (dst, src) in bytes.iter_mut().zip(value.to_le_bytes()) {
                *dst = src;
            }
        }
    }

    fn on_read(&mut self, offset: usize, width: usize) {
        let mut fired = Vec::new();
        for pending in &mut self.delayed {
            if pending.offset == offset {
                pending.reads_left = pending.reads_left.saturating_sub(1);
                if pending.reads_left == 0 {
                    fired.push((pending.offset, pending.mask));
                }
            }
        }
        self.delayed.retain(|pending| pending.reads_left > 0);
        for (at, mask) in fired {
            let value = self.load(at, width) | mask;
            self.store(at, width, value);
        }
    }

    fn write(&mut self, offset: usize, width: usize, value: u32) {
        #[allow(clippy::cast_possible_truncation)] // width is 1, 2 or 4
        self.writes.push(RegisterWrite {
            offset,
            width: width as u8,
            value,
        });
        let cleared = self
            .self_clearing
            .iter()
            .filter(|(at, _)| *at == offset)
            .fold(value, |v, (_, mask)| v & !mask);
        self.store(offset, width, cleared);
    }
}

/// Register block backed by plain memory.
///
/// Models the two hardware behaviours the transfer path waits on:
/// self-clearing bits (software reset) and status flags that assert after a
/// number of polls (shift register drain).
#[derive(Debug)]
pub struct SimRegisters {
    base: u32,
    state: Mutex<SimState>,
}

impl SimRegisters {
    /// Zeroed block of `size` bytes at bus address `base`.
    pub fn new(base: u32, size: usize) -> Self {
        Self {
            base,
            state: Mutex::new(SimState {
                memory: vec![0; size],
                ..SimState::default()
            }),
        }
    }

    /// Bits in `mask` at `offset` read back as 0 right after any write.
    #[must_use]
    pub fn with_self_clearing(self, offset: usize, mask: u32) -> Self {
        lock(&self.state).self_clearing.push((offset, mask));
        self
    }

    /// Set `mask` at `offset` once the register has been read `reads` times.
    pub fn set_after_reads(&self, offset: usize, mask: u32, reads: usize) {
        let mut state = lock(&self.state);
        if reads == 0 {
            let value = state.load(offset, 1) | mask;
            state.store(offset, 1, value);
        } else {
            state.delayed.push(DelayedBits {
                offset,
                mask,
                reads_left: reads,
            });
        }
    }

    /// Write without recording it (hardware-side change).
    pub fn poke_u8(&self, offset: usize, value: u8) {
        lock(&self.state).store(offset, 1, u32::from(value));
    }

    /// Write without recording it (hardware-side change).
    pub fn poke_u32(&self, offset: usize, value: u32) {
        lock(&self.state).store(offset, 4, value);
    }

    /// Read without triggering delayed flags.
    pub fn peek_u8(&self, offset: usize) -> u8 {
        lock(&self.state).load(offset, 1).to_le_bytes()[0]
    }

    /// Read without triggering delayed flags.
    pub fn peek_u16(&self, offset: usize) -> u16 {
        let [lo, hi, _, _] = lock(&self.state).load(offset, 2).to_le_bytes();
        u16::from_le_bytes([lo, hi])
    }

    /// Read without triggering delayed flags.
    pub fn peek_u32(&self, offset: usize) -> u32 {
        lock(&self.state).load(offset, 4)
    }

    /// Every recorded write, oldest first.
    pub fn writes(&self) -> Vec<RegisterWrite> {
        lock(&self.state).writes.clone()
    }

    /// Recorded writes to `offset`.
    pub fn writes_to(&self, offset: usize) -> Vec<RegisterWrite> {
        lock(&self.state)
            .writes
            .iter()
            .filter(|w| w.offset == offset)
            .copied()
            .collect()
    }

    /// Forget recorded writes (memory contents stay).
    pub fn clear_writes(&self) {
        lock(&self.state).writes.clear();
    }

    fn read(&self, offset: usize, width: usize) -> u32 {
        let mut state = lock(&self.state);
        state.on_read(offset, width);
        state.load(offset, width)
    }
}

impl RegisterBlock for SimRegisters {
    fn base_address(&self) -> u32 {
        self.base
    }

    fn read_u8(&self, offset: usize) -> u8 {
        self.read(offset, 1).to_le_bytes()[0]
    }

    fn write_u8(&self, offset: usize, value: u8) {
        lock(&self.state).write(offset, 1, u32::from(value));
    }

    fn read_u16(&self, offset: usize) -> u16 {
        let [lo, hi, _, _] = self.read(offset, 2).to_le_bytes();
        u16::from_le_bytes([lo, hi])
    }

    fn write_u16(&self, offset: usize, value: u16) {
        lock(&self.state).write(offset, 2, u32::from(value));
    }

    fn read_u32(&self, offset: usize) -> u32 {
        self.read(offset, 4)
    }

    fn write_u32(&self, offset: usize, value: u32) {
        lock(&self.state).write(offset, 4, value);
    }
}
