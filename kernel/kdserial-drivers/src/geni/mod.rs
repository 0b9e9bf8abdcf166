//! Qualcomm GENI serial engine in FIFO mode (SDM845).
//!
//! The serial engine is driven through two sequencers: the main one runs
//! transmit commands, the secondary one runs a single long-lived read
//! command. Both revisions share the register map; they differ in the serial
//! clock (and so the divisor table) and in where the serial engine window sits
//! relative to the base address the platform reports.

pub mod fifo;
pub mod regs;

use kdserial_core::spin::{spin_until, spin_until_bounded};
use kdserial_core::{kdebug, ktrace, kwarn};
use kdserial_mmio::{AccessSize, RegisterBus};

use crate::baud::{DivisorEntry, DivisorTable};
use crate::driver::UartDriver;
use crate::error::UartError;
use crate::port::{AccessMode, PortDescriptor};

use self::fifo::{FifoTransferBuffer, RX_BUFFER_CAPACITY, RX_FIFO_DEPTH_WORDS, RxFifoStatus};
use self::regs::{GeniRegs, GeniStatus, MIrq, SIrq, SeIrqEn};

/// Status reads allowed while waiting for the main sequencer to go idle.
pub const GENI_QUIESCE_RETRIES: u32 = 10_000;

const DEFAULT_CGC_EN: u32 = 0x7F;
const FORCE_DEFAULT: u32 = 1;
const DEFAULT_IO_OUTPUT_CTRL_MSK: u32 = 0x7F;

const SER_CLK_EN: u32 = 1 << 0;
const CLK_DIV_SHIFT: u32 = 4;

const M_OPCODE_SHIFT: u32 = 27;
const S_OPCODE_SHIFT: u32 = 27;
const UART_START_TX: u32 = 0x1;
const UART_START_READ: u32 = 0x1;

// Four 8-bit characters per FIFO word, least significant first.
const UART_PACKING_CFG0: u32 = 0x0004_380E;
const UART_PACKING_CFG1: u32 = 0x000C_3E0E;

const TX_WATERMARK: u32 = 2;
const RX_WATERMARK: u32 = 2;
#[expect(clippy::cast_possible_truncation, reason = "FIFO depth is 64")]
const RX_RFR_WATERMARK: u32 = RX_FIFO_DEPTH_WORDS as u32 - 2;

const UART_WORD_LEN: u32 = 8;
const UART_PARITY_NONE: u32 = 0;
/// Encodes one stop bit.
const UART_STOP_BIT_LEN_1: u32 = 0;
/// Sixteen character times at 10 bits per character.
const UART_RX_STALE_CNT: u32 = 16 * 10;

static GENI_V1_DIVISORS: [DivisorEntry; 9] = [
    DivisorEntry::new(7_200, 64),
    DivisorEntry::new(9_600, 48),
    DivisorEntry::new(14_400, 32),
    DivisorEntry::new(19_200, 24),
    DivisorEntry::new(28_800, 16),
    DivisorEntry::new(38_400, 12),
    DivisorEntry::new(57_600, 8),
    DivisorEntry::new(76_800, 6),
    DivisorEntry::new(115_200, 4),
];

static GENI_V2_DIVISORS: [DivisorEntry; 9] = [
    DivisorEntry::new(7_200, 32),
    DivisorEntry::new(9_600, 24),
    DivisorEntry::new(14_400, 16),
    DivisorEntry::new(19_200, 12),
    DivisorEntry::new(28_800, 8),
    DivisorEntry::new(38_400, 6),
    DivisorEntry::new(57_600, 4),
    DivisorEntry::new(76_800, 3),
    DivisorEntry::new(115_200, 2),
];

/// Divisors for the 14.7456 MHz serial clock (16x oversampling).
pub const GENI_V1_TABLE: DivisorTable =
    DivisorTable::new(&GENI_V1_DIVISORS, DivisorEntry::new(7_200, 64));
/// Divisors for the 7.3728 MHz serial clock (16x oversampling).
pub const GENI_V2_TABLE: DivisorTable =
    DivisorTable::new(&GENI_V2_DIVISORS, DivisorEntry::new(7_200, 32));

/// GENI register layout revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeniRevision {
    /// The port base is the serial engine window.
    V1,
    /// The port base is the QUP wrapper; the serial engine sits above it.
    V2,
}

impl GeniRevision {
    /// Offset of the serial engine window from the port base.
    #[must_use]
    pub const fn se_offset(self) -> usize {
        match self {
            Self::V1 => 0,
            Self::V2 => 0x4000,
        }
    }

    /// Divisor table for this revision's serial clock.
    #[must_use]
    pub const fn divisors(self) -> DivisorTable {
        match self {
            Self::V1 => GENI_V1_TABLE,
            Self::V2 => GENI_V2_TABLE,
        }
    }
}

/// GENI UART driver. Owns the per-port receive buffer.
#[derive(Debug)]
pub struct Geni {
    revision: GeniRevision,
    rx: FifoTransferBuffer,
}

impl Geni {
    /// Creates the driver for one layout revision.
    #[must_use]
    pub const fn new(revision: GeniRevision) -> Self {
        Self {
            revision,
            rx: FifoTransferBuffer::new(),
        }
    }

    /// Returns the layout revision.
    #[must_use]
    pub const fn revision(&self) -> GeniRevision {
        self.revision
    }

    /// Bytes unpacked from the FIFO but not yet returned.
    #[must_use]
    pub const fn buffered(&self) -> usize {
        self.rx.remaining()
    }

    fn regs<'a, B: RegisterBus>(&self, bus: &'a B) -> GeniRegs<&'a B> {
        GeniRegs::new(bus, self.revision.se_offset())
    }

    /// Programs the clock dividers for `rate`; returns the entry used.
    fn program_clock<B: RegisterBus>(&self, regs: &GeniRegs<&B>, rate: u32) -> DivisorEntry {
        let entry = self.revision.divisors().lookup(rate);
        let cfg = (entry.divisor << CLK_DIV_SHIFT) | SER_CLK_EN;
        regs.cfg.set_ser_m_clk_cfg(cfg);
        regs.cfg.set_ser_s_clk_cfg(cfg);
        entry
    }

    /// Everything `initialize` does after validating the access mode.
    fn program<B: RegisterBus>(&mut self, port: &mut PortDescriptor<B>) -> Result<(), UartError> {
        port.reset_state();
        self.rx.clear();
        let bus = port.bus().ok_or(UartError::NotReady)?;
        let regs = self.regs(bus);

        spin_until_bounded(GENI_QUIESCE_RETRIES, || {
            !regs.cfg.status().contains(GeniStatus::M_GENI_CMD_ACTIVE)
        })
        .map_err(|e| {
            kwarn!("kdserial: GENI main sequencer busy after {} reads", e.attempts);
            UartError::RetryExhausted {
                retries: e.attempts,
            }
        })?;

        regs.cfg.set_cgc_ctrl(DEFAULT_CGC_EN);
        regs.cfg.set_force_default(FORCE_DEFAULT);
        regs.cfg.set_output_ctrl(DEFAULT_IO_OUTPUT_CTRL_MSK);

        // FIFO mode: no DMA, sequencer interrupts only, no GSI events.
        regs.image.set_dma_mode_en(0);
        regs.dma.set_irq_en(SeIrqEn::GENI_M_IRQ_EN | SeIrqEn::GENI_S_IRQ_EN);
        regs.dma.set_gsi_event_en(0);

        regs.data.set_m_irq_en(MIrq::M_CMD_DONE | MIrq::M_TX_FIFO_WATERMARK);
        regs.data
            .set_s_irq_en(SIrq::S_CMD_DONE | SIrq::S_RX_FIFO_WATERMARK | SIrq::S_RX_FIFO_LAST);

        regs.image.set_tx_packing_cfg0(UART_PACKING_CFG0);
        regs.image.set_tx_packing_cfg1(UART_PACKING_CFG1);
        regs.image.set_rx_packing_cfg0(UART_PACKING_CFG0);
        regs.image.set_rx_packing_cfg1(UART_PACKING_CFG1);
        regs.data.set_tx_watermark(TX_WATERMARK);
        regs.data.set_rx_watermark(RX_WATERMARK);
        regs.data.set_rx_rfr_watermark(RX_RFR_WATERMARK);

        let entry = self.program_clock(&regs, port.baud_rate);

        regs.image.set_tx_trans_cfg(0);
        regs.image.set_tx_word_len(UART_WORD_LEN);
        regs.image.set_rx_word_len(UART_WORD_LEN);
        regs.image.set_tx_parity_cfg(UART_PARITY_NONE);
        regs.image.set_rx_parity_cfg(UART_PARITY_NONE);
        regs.image.set_rx_trans_cfg(0);
        regs.image.set_tx_stop_bit_len(UART_STOP_BIT_LEN_1);
        regs.image.set_rx_stale_cnt(UART_RX_STALE_CNT);

        regs.data.set_s_cmd0(UART_START_READ << S_OPCODE_SHIFT);

        port.baud_rate = entry.rate;
        Ok(())
    }

    /// Drains the RX FIFO into the transfer buffer.
    fn refill<B: RegisterBus>(&mut self, port: &mut PortDescriptor<B>) -> Result<(), UartError> {
        let bus = port.data_bus().ok_or(UartError::NotReady)?;
        let regs = self.regs(bus);

        let s_irq = regs.data.s_irq_status();
        regs.data.set_s_irq_clear(s_irq);
        let m_irq = regs.data.m_irq_status();
        regs.data.set_m_irq_clear(m_irq);

        let status = RxFifoStatus::decode(regs.data.rx_fifo_status());
        if status.total_bytes() == 0 {
            return Err(UartError::NoData);
        }

        let filled = self.rx.fill(status, || regs.data.rx_fifo());
        match filled {
            Ok(count) => {
                ktrace!("kdserial: GENI refilled {} bytes", count);
                Ok(())
            }
            Err(pending) => {
                kwarn!(
                    "kdserial: GENI RX FIFO reports {} bytes, buffer holds {}; resetting",
                    pending,
                    RX_BUFFER_CAPACITY
                );
                if let Err(e) = self.program(port) {
                    kwarn!("kdserial: GENI re-initialization failed: {}", e);
                }
                Err(UartError::FifoOverflow {
                    pending,
                    capacity: RX_BUFFER_CAPACITY,
                })
            }
        }
    }
}

impl<B: RegisterBus> UartDriver<B> for Geni {
    fn initialize(
        &mut self,
        _load_options: Option<&str>,
        port: &mut PortDescriptor<B>,
        access: AccessMode,
    ) -> Result<(), UartError> {
        if !access.memory_mapped || access.access_size != AccessSize::Dword {
            kwarn!("kdserial: GENI cannot use access mode {:?}", access);
            return Err(UartError::Unsupported);
        }
        self.program(port)?;
        kdebug!("kdserial: GENI {:?} ready at {} baud", self.revision, port.baud_rate);
        Ok(())
    }

    fn set_baud(&mut self, port: &mut PortDescriptor<B>, rate: u32) -> Result<(), UartError> {
        let bus = port.data_bus().ok_or(UartError::NotReady)?;
        let regs = self.regs(bus);
        if regs.cfg.status().contains(GeniStatus::M_GENI_CMD_ACTIVE) {
            return Err(UartError::NotReady);
        }

        let entry = self.program_clock(&regs, rate);
        port.baud_rate = entry.rate;
        Ok(())
    }

    fn get_byte(&mut self, port: &mut PortDescriptor<B>) -> Result<u8, UartError> {
        if port.data_bus().is_none() {
            return Err(UartError::NotReady);
        }
        if let Some(byte) = self.rx.pop() {
            return Ok(byte);
        }
        self.refill(port)?;
        self.rx.pop().ok_or(UartError::NoData)
    }

    fn put_byte(
        &mut self,
        port: &mut PortDescriptor<B>,
        byte: u8,
        busy_wait: bool,
    ) -> Result<(), UartError> {
        let bus = port.data_bus().ok_or(UartError::NotReady)?;
        let regs = self.regs(bus);
        let idle = || !regs.cfg.status().contains(GeniStatus::M_GENI_CMD_ACTIVE);

        if !busy_wait && !idle() {
            return Err(UartError::NotReady);
        }
        spin_until(idle);

        regs.image.set_tx_trans_len(1);
        regs.data.set_m_cmd0(UART_START_TX << M_OPCODE_SHIFT);
        regs.data.set_tx_fifo(u32::from(byte));
        Ok(())
    }

    fn rx_ready(&mut self, port: &mut PortDescriptor<B>) -> bool {
        if port.data_bus().is_none() {
            return false;
        }
        !self.rx.is_empty() || self.refill(port).is_ok()
    }
}
