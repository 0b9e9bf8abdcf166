//! Intel LPSS 16550-derivative UART with PCI power management.
//!
//! The data path is the generic [`Ns16550`] core. On top of that the LPSS
//! block adds a private software-reset register, a clock-parameters register
//! (revision 2) and an image of the device's PCI configuration header, which
//! together let the debugger power the UART down to D3hot and back.

use bitflags::bitflags;
use kdserial_core::{kdebug, kwarn};
use kdserial_core::spin::spin_until;
use kdserial_mmio::{RegisterBus, Window};

use crate::baud::DivisorEntry;
use crate::driver::UartDriver;
use crate::error::{UartError, VerifiedRegister};
use crate::ns16550::{NS16550_TABLE, Ns16550};
use crate::pci_pm::{self, PowerState};
use crate::port::{AccessMode, PortDescriptor, PortFlags, PowerRegisters};

/// DesignWare UART status register.
pub const LPSS_USR: usize = 0x7C;
/// Revision 2 private clock-parameters register.
pub const LPSS_CLOCK_PARAMS: usize = 0x200;
/// Offset of the PCI configuration image inside the aperture.
pub const LPSS_PCI_CONFIG_OFFSET: usize = 0x1000;
/// Value of the reset field while the controller is held in reset.
const RESET_ASSERTED: u32 = 0;

bitflags! {
    /// DesignWare USR bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Usr: u32 {
        /// A character is being shifted; LCR writes are ignored.
        const BUSY = 1 << 0;
    }
}

bitflags! {
    /// Revision 2 clock-parameters bits the driver touches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClockParams: u32 {
        /// Latches new M/N values on a rising edge.
        const UPDATE = 1 << 31;
    }
}

/// LPSS silicon revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LpssRevision {
    /// Reset at +0x804, no clock-parameter or bus-enable handling.
    Rev1,
    /// Reset at +0x204 with clock parameters and bus-enable handling.
    Rev2,
}

impl LpssRevision {
    /// Offset of the private software-reset register.
    #[must_use]
    pub const fn reset_register(self) -> usize {
        match self {
            Self::Rev1 => 0x804,
            Self::Rev2 => 0x204,
        }
    }

    /// Mask of the reset field; also its deasserted value.
    #[must_use]
    pub const fn reset_deasserted(self) -> u32 {
        match self {
            Self::Rev1 => 0x3,
            Self::Rev2 => 0x7,
        }
    }

    const fn is_rev2(self) -> bool {
        matches!(self, Self::Rev2)
    }
}

/// LPSS UART driver.
#[derive(Debug)]
pub struct Lpss {
    revision: LpssRevision,
    access: AccessMode,
    /// Clock parameters captured on the way into D3.
    clock_snapshot: Option<u32>,
}

impl Lpss {
    /// Creates the driver for one silicon revision.
    #[must_use]
    pub const fn new(revision: LpssRevision) -> Self {
        Self {
            revision,
            access: AccessMode::MMIO32,
            clock_snapshot: None,
        }
    }

    /// Returns the silicon revision.
    #[must_use]
    pub const fn revision(&self) -> LpssRevision {
        self.revision
    }

    fn reset_field<B: RegisterBus>(&self, bus: &B) -> u32 {
        bus.read_u32(self.revision.reset_register()) & self.revision.reset_deasserted()
    }

    fn write_reset<B: RegisterBus>(&self, bus: &B, value: u32) {
        let mask = self.revision.reset_deasserted();
        let offset = self.revision.reset_register();
        let current = bus.read_u32(offset);
        bus.write_u32(offset, (current & !mask) | (value & mask));
    }

    /// Everything `initialize` does after validating the access mode.
    fn program<B: RegisterBus>(&mut self, port: &mut PortDescriptor<B>) -> Result<(), UartError> {
        port.reset_state();
        let entry = NS16550_TABLE.lookup(port.baud_rate);
        let bus = port.bus().ok_or(UartError::NotReady)?;

        let config = Window::new(bus, LPSS_PCI_CONFIG_OFFSET);
        let power = PowerRegisters {
            command: LPSS_PCI_CONFIG_OFFSET + pci_pm::PCI_COMMAND,
            pmcsr: LPSS_PCI_CONFIG_OFFSET + pci_pm::pmcsr_offset(&config),
        };
        Ns16550::new(bus, self.access).init(divisor_of(entry));

        port.set_power_registers(Some(power));
        port.baud_rate = entry.rate;
        Ok(())
    }
}

fn divisor_of(entry: DivisorEntry) -> u16 {
    u16::try_from(entry.divisor).unwrap_or(u16::MAX)
}

impl<B: RegisterBus> UartDriver<B> for Lpss {
    fn initialize(
        &mut self,
        _load_options: Option<&str>,
        port: &mut PortDescriptor<B>,
        access: AccessMode,
    ) -> Result<(), UartError> {
        if !access.memory_mapped || access.access_size.bytes() > access.stride() {
            kwarn!("kdserial: LPSS cannot use access mode {:?}", access);
            return Err(UartError::Unsupported);
        }
        self.access = access;
        self.clock_snapshot = None;
        self.program(port)?;
        kdebug!("kdserial: LPSS {:?} ready at {} baud", self.revision, port.baud_rate);
        Ok(())
    }

    fn set_baud(&mut self, port: &mut PortDescriptor<B>, rate: u32) -> Result<(), UartError> {
        let bus = port.data_bus().ok_or(UartError::NotReady)?;
        if Usr::from_bits_retain(bus.read_u32(LPSS_USR)).contains(Usr::BUSY) {
            return Err(UartError::NotReady);
        }

        let entry = NS16550_TABLE.lookup(rate);
        Ns16550::new(bus, self.access).set_divisor(divisor_of(entry));
        port.baud_rate = entry.rate;
        Ok(())
    }

    fn get_byte(&mut self, port: &mut PortDescriptor<B>) -> Result<u8, UartError> {
        let bus = port.data_bus().ok_or(UartError::NotReady)?;
        Ns16550::new(bus, self.access)
            .try_read_byte()
            .ok_or(UartError::NoData)
    }

    fn put_byte(
        &mut self,
        port: &mut PortDescriptor<B>,
        byte: u8,
        busy_wait: bool,
    ) -> Result<(), UartError> {
        let bus = port.data_bus().ok_or(UartError::NotReady)?;
        let uart = Ns16550::new(bus, self.access);

        if !busy_wait && !uart.can_write() {
            return Err(UartError::NotReady);
        }
        spin_until(|| uart.can_write());
        uart.write_byte(byte);
        Ok(())
    }

    fn rx_ready(&mut self, port: &mut PortDescriptor<B>) -> bool {
        port.data_bus()
            .is_some_and(|bus| Ns16550::new(bus, self.access).rx_ready())
    }

    fn supports_power_management(&self) -> bool {
        true
    }

    fn set_power_d3(&mut self, port: &mut PortDescriptor<B>) -> Result<(), UartError> {
        let bus = port.bus().ok_or(UartError::NotReady)?;
        let power = port.power_registers().ok_or(UartError::NotReady)?;

        let deasserted = self.revision.reset_deasserted();
        let reset = self.reset_field(bus);
        if reset != deasserted {
            kwarn!("kdserial: LPSS reset reads {:#x}, refusing D3", reset);
            return Err(UartError::VerificationFailed {
                register: VerifiedRegister::SoftReset,
                expected: deasserted,
                found: reset,
            });
        }

        Ns16550::new(bus, self.access).park();
        if self.revision.is_rev2() {
            self.clock_snapshot = Some(bus.read_u32(LPSS_CLOCK_PARAMS));
        }
        self.write_reset(bus, RESET_ASSERTED);
        if self.revision.is_rev2() {
            pci_pm::set_bus_enables(bus, power.command, false)?;
        }
        pci_pm::transition(bus, power.pmcsr, PowerState::D0, PowerState::D3Hot)?;

        port.flags |= PortFlags::POWERED_DOWN;
        kdebug!("kdserial: LPSS in D3");
        Ok(())
    }

    fn set_power_d0(&mut self, port: &mut PortDescriptor<B>) -> Result<(), UartError> {
        let bus = port.bus().ok_or(UartError::NotReady)?;
        let power = port.power_registers().ok_or(UartError::NotReady)?;

        pci_pm::transition(bus, power.pmcsr, PowerState::D3Hot, PowerState::D0)?;
        if self.revision.is_rev2() {
            pci_pm::set_bus_enables(bus, power.command, true)?;
        }

        let reset = self.reset_field(bus);
        if reset != RESET_ASSERTED {
            kwarn!("kdserial: LPSS reset reads {:#x} leaving D3", reset);
            return Err(UartError::VerificationFailed {
                register: VerifiedRegister::SoftReset,
                expected: RESET_ASSERTED,
                found: reset,
            });
        }

        // Pulse UPDATE low to high to latch M/N, then leave the register
        // exactly as it was captured.
        if let Some(params) = self.clock_snapshot.take() {
            let latch = ClockParams::UPDATE.bits();
            bus.write_u32(LPSS_CLOCK_PARAMS, params & !latch);
            bus.write_u32(LPSS_CLOCK_PARAMS, params | latch);
            bus.write_u32(LPSS_CLOCK_PARAMS, params);
        }
        self.write_reset(bus, self.revision.reset_deasserted());

        self.program(port)?;
        kdebug!("kdserial: LPSS back in D0");
        Ok(())
    }
}
