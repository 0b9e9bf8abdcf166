//! Generic 16550 polling core.
//!
//! Shared by the LPSS family. The core knows nothing about power management;
//! it programs the line, moves single bytes and can park the UART before a
//! power-down. Register spacing and access width come from the
//! [`AccessMode`] the port was initialized with, so the same code drives
//! byte-packed legacy layouts and the 32-bit-stride DesignWare layout.

use bitflags::bitflags;
use kdserial_mmio::{AccessSize, RegisterBus};

use crate::baud::{DivisorEntry, DivisorTable};
use crate::port::AccessMode;

// ---------------------------------------------------------------------------
// Register indices
// ---------------------------------------------------------------------------

/// Register indices; the byte offset is `index * stride`.
pub mod reg {
    /// Transmit Holding Register (write, DLAB=0).
    pub const THR: usize = 0;
    /// Receive Buffer Register (read, DLAB=0).
    pub const RBR: usize = 0;
    /// Divisor Latch Low byte (DLAB=1).
    pub const DLL: usize = 0;
    /// Interrupt Enable Register (DLAB=0).
    pub const IER: usize = 1;
    /// Divisor Latch High byte (DLAB=1).
    pub const DLM: usize = 1;
    /// FIFO Control Register (write).
    pub const FCR: usize = 2;
    /// Line Control Register.
    pub const LCR: usize = 3;
    /// Modem Control Register.
    pub const MCR: usize = 4;
    /// Line Status Register.
    pub const LSR: usize = 5;
}

// ---------------------------------------------------------------------------
// Bitflag types
// ---------------------------------------------------------------------------

bitflags! {
    /// FIFO Control Register bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Fcr: u8 {
        /// Enable FIFOs.
        const ENABLE     = 1 << 0;
        /// Clear receive FIFO.
        const CLEAR_RX   = 1 << 1;
        /// Clear transmit FIFO.
        const CLEAR_TX   = 1 << 2;
        /// Trigger level: 14 bytes.
        const TRIGGER_14 = 0b11 << 6;
    }
}

bitflags! {
    /// Line Control Register bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Lcr: u8 {
        /// Word length bit 0.
        const WORD_LEN_0 = 1 << 0;
        /// Word length bit 1.
        const WORD_LEN_1 = 1 << 1;
        /// Extra stop bit.
        const STOP_BIT   = 1 << 2;
        /// Parity enable.
        const PARITY     = 1 << 3;
        /// Divisor Latch Access Bit.
        const DLAB       = 1 << 7;

        /// 8 data bits, no parity, 1 stop bit.
        const EIGHT_N_ONE = Self::WORD_LEN_0.bits() | Self::WORD_LEN_1.bits();
    }
}

bitflags! {
    /// Modem Control Register bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Mcr: u8 {
        /// Data Terminal Ready.
        const DTR  = 1 << 0;
        /// Request To Send.
        const RTS  = 1 << 1;
        /// Auxiliary output 2.
        const OUT2 = 1 << 3;
    }
}

bitflags! {
    /// Line Status Register bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Lsr: u8 {
        /// Received data available.
        const DATA_READY = 1 << 0;
        /// Transmit Holding Register empty.
        const THR_EMPTY  = 1 << 5;
    }
}

// ---------------------------------------------------------------------------
// Baud rate
// ---------------------------------------------------------------------------

static NS16550_DIVISORS: [DivisorEntry; 8] = [
    DivisorEntry::new(115_200, 1),
    DivisorEntry::new(57_600, 2),
    DivisorEntry::new(38_400, 3),
    DivisorEntry::new(28_800, 4),
    DivisorEntry::new(19_200, 6),
    DivisorEntry::new(14_400, 8),
    DivisorEntry::new(9_600, 12),
    DivisorEntry::new(7_200, 16),
];

/// Divisors for the 1.8432 MHz reference clock (rate = 115200 / divisor).
pub const NS16550_TABLE: DivisorTable =
    DivisorTable::new(&NS16550_DIVISORS, DivisorEntry::new(7_200, 16));

// ---------------------------------------------------------------------------
// Ns16550
// ---------------------------------------------------------------------------

/// A 16550 register file reached through a [`RegisterBus`].
///
/// Carries no state beyond the bus reference and layout, so the drivers build
/// one on the stack for every call.
#[derive(Debug, Clone, Copy)]
pub struct Ns16550<'a, B> {
    bus: &'a B,
    stride: usize,
    size: AccessSize,
}

impl<'a, B: RegisterBus> Ns16550<'a, B> {
    /// Creates a view of the 16550 registers using the given access layout.
    #[must_use]
    pub fn new(bus: &'a B, access: AccessMode) -> Self {
        Self {
            bus,
            stride: access.stride(),
            size: access.access_size,
        }
    }

    #[expect(clippy::cast_possible_truncation, reason = "16550 registers are 8 bits wide")]
    fn read(&self, index: usize) -> u8 {
        self.bus.read_sized(index * self.stride, self.size) as u8
    }

    fn write(&self, index: usize, value: u8) {
        self.bus
            .write_sized(index * self.stride, self.size, u64::from(value));
    }

    /// Programs 8N1, the divisor, enabled FIFOs and DTR/RTS/OUT2 with every
    /// interrupt source disabled.
    pub fn init(&self, divisor: u16) {
        // 1. Disable all interrupts; the debugger polls.
        self.write(reg::IER, 0x00);

        // 2. Divisor, leaving the line at 8N1 with DLAB clear.
        self.write(reg::LCR, Lcr::EIGHT_N_ONE.bits());
        self.set_divisor(divisor);

        // 3. Enable + clear FIFOs, 14-byte trigger.
        self.write(
            reg::FCR,
            (Fcr::ENABLE | Fcr::CLEAR_RX | Fcr::CLEAR_TX | Fcr::TRIGGER_14).bits(),
        );

        // 4. DTR + RTS + OUT2.
        self.write(reg::MCR, (Mcr::DTR | Mcr::RTS | Mcr::OUT2).bits());
    }

    /// Writes the divisor latch, preserving the current line settings.
    pub fn set_divisor(&self, divisor: u16) {
        let lcr = Lcr::from_bits_retain(self.read(reg::LCR)).difference(Lcr::DLAB);
        let [low, high] = divisor.to_le_bytes();

        self.write(reg::LCR, (lcr | Lcr::DLAB).bits());
        self.write(reg::DLL, low);
        self.write(reg::DLM, high);
        self.write(reg::LCR, lcr.bits());
    }

    /// Returns the current Line Status Register value.
    #[must_use]
    pub fn line_status(&self) -> Lsr {
        Lsr::from_bits_retain(self.read(reg::LSR))
    }

    /// Returns `true` if a received byte is waiting.
    #[must_use]
    pub fn rx_ready(&self) -> bool {
        self.line_status().contains(Lsr::DATA_READY)
    }

    /// Returns `true` if the transmit holding register can take a byte.
    #[must_use]
    pub fn can_write(&self) -> bool {
        self.line_status().contains(Lsr::THR_EMPTY)
    }

    /// Non-blocking read: `Some(byte)` if data is available.
    #[must_use]
    pub fn try_read_byte(&self) -> Option<u8> {
        if self.rx_ready() {
            Some(self.read(reg::RBR))
        } else {
            None
        }
    }

    /// Writes a byte to the transmit holding register without checking LSR.
    pub fn write_byte(&self, byte: u8) {
        self.write(reg::THR, byte);
    }

    /// Drops OUT2 and disables the FIFOs ahead of a power-down.
    pub fn park(&self) {
        let mcr = Mcr::from_bits_retain(self.read(reg::MCR));
        self.write(reg::MCR, mcr.difference(Mcr::OUT2).bits());
        self.write(reg::FCR, 0);
    }
}
