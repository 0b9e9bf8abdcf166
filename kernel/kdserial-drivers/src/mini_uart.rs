//! BCM2835 auxiliary mini-UART.
//!
//! The firmware has already set up the line rate from the VPU clock, so this
//! driver only forces 8-bit mode and masks interrupts. There is no divisor
//! table: `set_baud` succeeds without touching hardware.

use bitflags::bitflags;
use kdserial_core::{kdebug, kwarn};
use kdserial_core::spin::spin_until;
use kdserial_mmio::{RegisterBus, register_block};

use crate::driver::UartDriver;
use crate::error::UartError;
use crate::port::{AccessMode, PortDescriptor, PortFlags};

bitflags! {
    /// AUX_MU_IER_REG bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MiniUartIer: u32 {
        /// Transmit-empty interrupt.
        const TX_EMPTY = 1 << 0;
        /// Receive-not-empty interrupt.
        const RX_NOT_EMPTY = 1 << 1;
    }
}

bitflags! {
    /// AUX_MU_STAT_REG bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MiniUartStat: u32 {
        /// At least one byte in the receive FIFO.
        const RX_NOT_EMPTY = 1 << 0;
        /// The transmit FIFO can take a byte.
        const TX_NOT_FULL  = 1 << 1;
    }
}

/// LCR value selecting 8-bit data.
///
/// The datasheet documents bit 0 alone as 8-bit mode, but the hardware needs
/// both low bits set or it stays in 7-bit mode.
pub const LCR_8BIT: u32 = 0x3;

register_block! {
    /// Mini-UART registers, relative to the AUX block base.
    pub MiniUartRegs {
        /// AUX_MU_IO_REG: data in and out.
        [0x40; u32; rw] io,
        /// AUX_MU_IER_REG.
        [0x44; u32; rw] ier => MiniUartIer,
        /// AUX_MU_LCR_REG.
        [0x4C; u32; rw] lcr,
        /// AUX_MU_STAT_REG.
        [0x64; u32; ro] stat => MiniUartStat,
    }
}

/// BCM2835 mini-UART driver. Stateless between calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct MiniUart;

impl MiniUart {
    /// Creates the driver.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn program<B: RegisterBus>(port: &mut PortDescriptor<B>) -> Result<(), UartError> {
        port.reset_state();
        let bus = port.bus().ok_or(UartError::NotReady)?;
        let regs = MiniUartRegs::new(bus);

        regs.set_ier(MiniUartIer::empty());
        regs.set_lcr(LCR_8BIT);
        Ok(())
    }
}

impl<B: RegisterBus> UartDriver<B> for MiniUart {
    fn initialize(
        &mut self,
        _load_options: Option<&str>,
        port: &mut PortDescriptor<B>,
        access: AccessMode,
    ) -> Result<(), UartError> {
        if !access.memory_mapped {
            kwarn!("kdserial: mini-UART requires memory-mapped access");
            return Err(UartError::Unsupported);
        }
        Self::program(port)?;
        kdebug!("kdserial: mini-UART ready");
        Ok(())
    }

    fn set_baud(&mut self, port: &mut PortDescriptor<B>, _rate: u32) -> Result<(), UartError> {
        port.data_bus().map(|_| ()).ok_or(UartError::NotReady)
    }

    fn get_byte(&mut self, port: &mut PortDescriptor<B>) -> Result<u8, UartError> {
        if port.data_bus().is_none() {
            return Err(UartError::NotReady);
        }
        if port.flags.contains(PortFlags::ABSENT) {
            kdebug!("kdserial: mini-UART re-initializing absent port");
            Self::program(port)?;
        }

        let regs = MiniUartRegs::new(port.data_bus().ok_or(UartError::NotReady)?);
        if !regs.stat().contains(MiniUartStat::RX_NOT_EMPTY) {
            return Err(UartError::NoData);
        }
        let [byte, ..] = regs.io().to_le_bytes();
        Ok(byte)
    }

    fn put_byte(
        &mut self,
        port: &mut PortDescriptor<B>,
        byte: u8,
        busy_wait: bool,
    ) -> Result<(), UartError> {
        let regs = MiniUartRegs::new(port.data_bus().ok_or(UartError::NotReady)?);
        let ready = || regs.stat().contains(MiniUartStat::TX_NOT_FULL);

        if !busy_wait && !ready() {
            return Err(UartError::NotReady);
        }
        spin_until(ready);
        regs.set_io(u32::from(byte));
        Ok(())
    }

    fn rx_ready(&mut self, port: &mut PortDescriptor<B>) -> bool {
        port.data_bus()
            .is_some_and(|bus| MiniUartRegs::new(bus).stat().contains(MiniUartStat::RX_NOT_EMPTY))
    }
}
