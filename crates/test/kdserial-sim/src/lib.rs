//! Simulated register file for host-side driver tests.
//!
//! [`SimBus`] implements [`RegisterBus`] on top of sparse little-endian
//! memory, so a register keeps whatever was last written to it. On top of that
//! plain behaviour a test can script the device:
//!
//! - [`SimBus::queue_reads`] makes the next reads at an offset return scripted
//!   values (FIFO data, a status that changes once) before falling back to
//!   memory.
//! - [`SimBus::freeze`] makes writes to an offset vanish, which is how a test
//!   models a register that refuses to change state.
//! - Every write is logged and every read is counted.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use kdserial_mmio::{AccessSize, RegisterBus};

/// A single logged register write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteRecord {
    /// Byte offset of the access.
    pub offset: usize,
    /// Width of the access.
    pub size: AccessSize,
    /// Value written, zero-extended.
    pub value: u64,
}

#[derive(Debug, Default)]
struct SimState {
    mem: BTreeMap<usize, u8>,
    queued: BTreeMap<usize, VecDeque<u64>>,
    frozen: BTreeSet<usize>,
    writes: Vec<WriteRecord>,
    reads: BTreeMap<usize, usize>,
}

impl SimState {
    fn load(&self, offset: usize, size: AccessSize) -> u64 {
        (0..size.bytes()).rev().fold(0u64, |acc, i| {
            (acc << 8) | u64::from(self.mem.get(&(offset + i)).copied().unwrap_or(0))
        })
    }

    fn store(&mut self, offset: usize, size: AccessSize, value: u64) {
        for i in 0..size.bytes() {
            #[expect(clippy::cast_possible_truncation, reason = "byte extraction")]
            let byte = (value >> (8 * i)) as u8;
            self.mem.insert(offset + i, byte);
        }
    }

    fn read(&mut self, offset: usize, size: AccessSize) -> u64 {
        *self.reads.entry(offset).or_default() += 1;
        let scripted = self.queued.get_mut(&offset).and_then(VecDeque::pop_front);
        let mask = if size == AccessSize::Qword {
            u64::MAX
        } else {
            (1u64 << (8 * size.bytes())) - 1
        };
        scripted.map_or_else(|| self.load(offset, size), |v| v & mask)
    }

    fn write(&mut self, offset: usize, size: AccessSize, value: u64) {
        self.writes.push(WriteRecord {
            offset,
            size,
            value,
        });
        if !self.frozen.contains(&offset) {
            self.store(offset, size, value);
        }
    }
}

/// A scriptable in-memory register file.
#[derive(Debug, Default)]
pub struct SimBus {
    state: RefCell<SimState>,
}

impl SimBus {
    /// Creates an empty register file; every register reads as zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a 32-bit register without logging a write.
    pub fn poke_u32(&self, offset: usize, value: u32) {
        self.state
            .borrow_mut()
            .store(offset, AccessSize::Dword, u64::from(value));
    }

    /// Sets a 16-bit register without logging a write.
    pub fn poke_u16(&self, offset: usize, value: u16) {
        self.state
            .borrow_mut()
            .store(offset, AccessSize::Word, u64::from(value));
    }

    /// Sets an 8-bit register without logging a write.
    pub fn poke_u8(&self, offset: usize, value: u8) {
        self.state
            .borrow_mut()
            .store(offset, AccessSize::Byte, u64::from(value));
    }

    /// Returns the stored 32-bit value without counting a read.
    #[must_use]
    #[expect(clippy::cast_possible_truncation, reason = "load is masked to 32 bits")]
    pub fn peek_u32(&self, offset: usize) -> u32 {
        self.state.borrow().load(offset, AccessSize::Dword) as u32
    }

    /// Returns the stored 16-bit value without counting a read.
    #[must_use]
    #[expect(clippy::cast_possible_truncation, reason = "load is masked to 16 bits")]
    pub fn peek_u16(&self, offset: usize) -> u16 {
        self.state.borrow().load(offset, AccessSize::Word) as u16
    }

    /// Returns the stored 8-bit value without counting a read.
    #[must_use]
    #[expect(clippy::cast_possible_truncation, reason = "load is masked to 8 bits")]
    pub fn peek_u8(&self, offset: usize) -> u8 {
        self.state.borrow().load(offset, AccessSize::Byte) as u8
    }

    /// Scripts the next reads at `offset`; memory is used once they run out.
    pub fn queue_reads(&self, offset: usize, values: impl IntoIterator<Item = u64>) {
        self.state
            .borrow_mut()
            .queued
            .entry(offset)
            .or_default()
            .extend(values);
    }

    /// Number of scripted reads still pending at `offset`.
    #[must_use]
    pub fn pending_reads(&self, offset: usize) -> usize {
        self.state.borrow().queued.get(&offset).map_or(0, VecDeque::len)
    }

    /// Makes writes to `offset` leave the stored value unchanged.
    pub fn freeze(&self, offset: usize) {
        self.state.borrow_mut().frozen.insert(offset);
    }

    /// Undoes [`freeze`](Self::freeze).
    pub fn thaw(&self, offset: usize) {
        self.state.borrow_mut().frozen.remove(&offset);
    }

    /// All writes since creation or the last [`clear_log`](Self::clear_log).
    #[must_use]
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.state.borrow().writes.clone()
    }

    /// Values written to `offset`, oldest first.
    #[must_use]
    pub fn writes_to(&self, offset: usize) -> Vec<u64> {
        self.state
            .borrow()
            .writes
            .iter()
            .filter(|w| w.offset == offset)
            .map(|w| w.value)
            .collect()
    }

    /// Number of reads at `offset` since creation or the last log clear.
    #[must_use]
    pub fn read_count(&self, offset: usize) -> usize {
        self.state.borrow().reads.get(&offset).copied().unwrap_or(0)
    }

    /// Forgets logged writes and read counts; memory and scripts are kept.
    pub fn clear_log(&self) {
        let mut state = self.state.borrow_mut();
        state.writes.clear();
        state.reads.clear();
    }
}

#[expect(clippy::cast_possible_truncation, reason = "reads are masked to the access size")]
impl RegisterBus for SimBus {
    fn read_u8(&self, offset: usize) -> u8 {
        self.state.borrow_mut().read(offset, AccessSize::Byte) as u8
    }
    fn read_u16(&self, offset: usize) -> u16 {
        self.state.borrow_mut().read(offset, AccessSize::Word) as u16
    }
    fn read_u32(&self, offset: usize) -> u32 {
        self.state.borrow_mut().read(offset, AccessSize::Dword) as u32
    }
    fn read_u64(&self, offset: usize) -> u64 {
        self.state.borrow_mut().read(offset, AccessSize::Qword)
    }
    fn write_u8(&self, offset: usize, value: u8) {
        self.state
            .borrow_mut()
            .write(offset, AccessSize::Byte, u64::from(value));
    }
    fn write_u16(&self, offset: usize, value: u16) {
        self.state
            .borrow_mut()
            .write(offset, AccessSize::Word, u64::from(value));
    }
    fn write_u32(&self, offset: usize, value: u32) {
        self.state
            .borrow_mut()
            .write(offset, AccessSize::Dword, u64::from(value));
    }
    fn write_u64(&self, offset: usize, value: u64) {
        self.state
            .borrow_mut()
            .write(offset, AccessSize::Qword, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_is_little_endian() {
        let bus = SimBus::new();
        bus.write_u32(0x10, 0x1122_3344);
        assert_eq!(bus.read_u8(0x10), 0x44);
        assert_eq!(bus.read_u16(0x12), 0x1122);
        assert_eq!(bus.peek_u32(0x10), 0x1122_3344);
    }

    #[test]
    fn queued_reads_take_priority() {
        let bus = SimBus::new();
        bus.poke_u32(0x0, 9);
        bus.queue_reads(0x0, [1, 2]);
        assert_eq!(bus.pending_reads(0x0), 2);
        assert_eq!(bus.read_u32(0x0), 1);
        assert_eq!(bus.read_u32(0x0), 2);
        assert_eq!(bus.read_u32(0x0), 9);
        assert_eq!(bus.read_count(0x0), 3);
    }

    #[test]
    fn frozen_registers_log_but_ignore_writes() {
        let bus = SimBus::new();
        bus.poke_u16(0x84, 0x3);
        bus.freeze(0x84);
        bus.write_u16(0x84, 0x0);
        assert_eq!(bus.peek_u16(0x84), 0x3);
        assert_eq!(bus.writes_to(0x84), vec![0]);

        bus.thaw(0x84);
        bus.write_u16(0x84, 0x0);
        assert_eq!(bus.peek_u16(0x84), 0x0);
    }

    #[test]
    fn clear_log_keeps_memory() {
        let bus = SimBus::new();
        bus.write_u8(0x1, 0xaa);
        bus.clear_log();
        assert!(bus.writes().is_empty());
        assert_eq!(bus.peek_u8(0x1), 0xaa);
    }
}
