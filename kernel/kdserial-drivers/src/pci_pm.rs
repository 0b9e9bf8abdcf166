//! PCI power management for memory-mapped PCI UARTs.
//!
//! LPSS controllers expose an image of their PCI configuration header inside
//! the MMIO aperture. Everything here takes a bus whose offset 0 is the start
//! of that header, so the same code works against the real image and the
//! simulator.

use bitflags::bitflags;
use kdserial_core::kwarn;
use kdserial_mmio::RegisterBus;

use crate::error::{UartError, VerifiedRegister};

/// Offset of the PCI command register.
pub const PCI_COMMAND: usize = 0x04;
/// Offset of the PCI status register.
pub const PCI_STATUS: usize = 0x06;
/// Offset of the capabilities pointer.
pub const PCI_CAPABILITIES_PTR: usize = 0x34;
/// Capability ID of the power-management capability.
pub const PCI_CAP_ID_PM: u8 = 0x01;
/// PMCSR offset used when the capability list does not name one.
pub const DEFAULT_PMCSR_OFFSET: usize = 0x84;
/// Offset of PMCSR inside the power-management capability.
const PM_CAP_CONTROL: usize = 0x04;
/// Upper bound on capability entries walked; a 256-byte header holds at most 48.
const MAX_CAPABILITIES: usize = 48;

bitflags! {
    /// PCI command register bits managed here.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PciCommand: u16 {
        /// Memory space enable.
        const MEMORY_SPACE = 1 << 1;
        /// Bus master enable.
        const BUS_MASTER   = 1 << 2;
    }
}

bitflags! {
    /// PCI status register bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PciStatus: u16 {
        /// The header carries a capability list.
        const CAPABILITIES_LIST = 1 << 4;
    }
}

bitflags! {
    /// Power-management control/status register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Pmcsr: u16 {
        /// Power-state field, bits 1:0.
        const POWER_STATE = 0b11;
        /// PME status, write one to clear.
        const PME_STATUS  = 1 << 15;
    }
}

/// Device power state as encoded in PMCSR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum PowerState {
    /// Fully on.
    D0 = 0,
    /// Light sleep.
    D1 = 1,
    /// Deeper sleep.
    D2 = 2,
    /// Off with configuration space preserved.
    D3Hot = 3,
}

impl PowerState {
    /// Decodes the two-bit power-state field.
    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        match bits & 0b11 {
            0 => Self::D0,
            1 => Self::D1,
            2 => Self::D2,
            _ => Self::D3Hot,
        }
    }
}

impl Pmcsr {
    /// Returns the power-state field.
    #[must_use]
    pub const fn power_state(self) -> PowerState {
        PowerState::from_bits(self.bits())
    }

    /// Returns a copy with the power-state field replaced.
    #[must_use]
    pub const fn with_power_state(self, state: PowerState) -> Self {
        Self::from_bits_retain((self.bits() & !Self::POWER_STATE.bits()) | state as u16)
    }
}

/// Walks the capability list looking for the power-management capability.
///
/// Returns the PMCSR offset relative to the start of the header.
pub fn find_pmcsr<B: RegisterBus>(config: &B) -> Option<usize> {
    let status = PciStatus::from_bits_retain(config.read_u16(PCI_STATUS));
    if !status.contains(PciStatus::CAPABILITIES_LIST) {
        return None;
    }

    let mut ptr = usize::from(config.read_u8(PCI_CAPABILITIES_PTR) & 0xFC);
    for _ in 0..MAX_CAPABILITIES {
        if ptr == 0 {
            return None;
        }
        if config.read_u8(ptr) == PCI_CAP_ID_PM {
            return Some(ptr + PM_CAP_CONTROL);
        }
        ptr = usize::from(config.read_u8(ptr + 1) & 0xFC);
    }
    None
}

/// Returns the PMCSR offset, falling back to [`DEFAULT_PMCSR_OFFSET`].
pub fn pmcsr_offset<B: RegisterBus>(config: &B) -> usize {
    find_pmcsr(config).unwrap_or(DEFAULT_PMCSR_OFFSET)
}

/// Moves the device from `from` to `to` through PMCSR.
///
/// The current state must be `from`; anything else means the caller's view of
/// the device is wrong and nothing is written. Entering D0 also clears a
/// pending PME.
///
/// # Errors
///
/// Returns [`UartError::VerificationFailed`] when the current state is not
/// `from` or the written state does not read back.
pub fn transition<B: RegisterBus>(
    bus: &B,
    pmcsr: usize,
    from: PowerState,
    to: PowerState,
) -> Result<(), UartError> {
    let current = Pmcsr::from_bits_retain(bus.read_u16(pmcsr));
    if current.power_state() != from {
        kwarn!(
            "kdserial: PMCSR reports {:?}, expected {:?} before entering {:?}",
            current.power_state(),
            from,
            to
        );
        return Err(pmcsr_mismatch(from, current));
    }

    let mut next = current.with_power_state(to);
    if to == PowerState::D0 {
        next |= Pmcsr::PME_STATUS;
    } else {
        next.remove(Pmcsr::PME_STATUS);
    }
    bus.write_u16(pmcsr, next.bits());

    let readback = Pmcsr::from_bits_retain(bus.read_u16(pmcsr));
    if readback.power_state() != to {
        kwarn!("kdserial: PMCSR stuck at {:?} after writing {:?}", readback.power_state(), to);
        return Err(pmcsr_mismatch(to, readback));
    }
    Ok(())
}

fn pmcsr_mismatch(expected: PowerState, found: Pmcsr) -> UartError {
    UartError::VerificationFailed {
        register: VerifiedRegister::Pmcsr,
        expected: u32::from(expected as u16),
        found: u32::from(found.power_state() as u16),
    }
}

/// Sets or clears bus-master and memory-space enable, then verifies both.
///
/// # Errors
///
/// Returns [`UartError::VerificationFailed`] if either bit does not read
/// back as written.
pub fn set_bus_enables<B: RegisterBus>(bus: &B, command: usize, enable: bool) -> Result<(), UartError> {
    let wanted = PciCommand::MEMORY_SPACE | PciCommand::BUS_MASTER;
    let current = PciCommand::from_bits_retain(bus.read_u16(command));
    let next = if enable {
        current | wanted
    } else {
        current.difference(wanted)
    };
    bus.write_u16(command, next.bits());

    let found = PciCommand::from_bits_retain(bus.read_u16(command)) & wanted;
    let expected = if enable { wanted } else { PciCommand::empty() };
    if found != expected {
        kwarn!("kdserial: PCI command enables read back {:#x}", found.bits());
        return Err(UartError::VerificationFailed {
            register: VerifiedRegister::PciCommand,
            expected: u32::from(expected.bits()),
            found: u32::from(found.bits()),
        });
    }
    Ok(())
}
