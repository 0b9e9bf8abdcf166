//! Port descriptor shared by every UART family.

use bitflags::bitflags;
use kdserial_mmio::{AccessSize, RegisterBus};

bitflags! {
    /// Per-port state bits. Every driver's `initialize` clears all of them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PortFlags: u32 {
        /// Set by the caller when an earlier probe found no device; the
        /// mini-UART re-initializes on its next receive.
        const ABSENT       = 1 << 0;
        /// The device is in D3; data-path calls report not-ready.
        const POWERED_DOWN = 1 << 1;
    }
}

/// How the dispatcher wants the registers accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessMode {
    /// `true` for memory-mapped registers, `false` for legacy port I/O.
    pub memory_mapped: bool,
    /// Width of each register access.
    pub access_size: AccessSize,
    /// Register bit width; also the register stride for 16550 layouts.
    pub bit_width: u8,
}

impl AccessMode {
    /// 32-bit memory-mapped registers at a 4-byte stride.
    pub const MMIO32: Self = Self {
        memory_mapped: true,
        access_size: AccessSize::Dword,
        bit_width: 32,
    };

    /// 8-bit memory-mapped registers at a 1-byte stride.
    pub const MMIO8: Self = Self {
        memory_mapped: true,
        access_size: AccessSize::Byte,
        bit_width: 8,
    };

    /// Register stride in bytes implied by `bit_width`.
    #[must_use]
    pub const fn stride(&self) -> usize {
        match self.bit_width {
            16 => 2,
            32 => 4,
            64 => 8,
            _ => 1,
        }
    }
}

/// Offsets of the PCI registers an LPSS port manages during power changes.
///
/// Derived from the port aperture by `initialize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerRegisters {
    /// PCI command register.
    pub command: usize,
    /// Power-management control/status register.
    pub pmcsr: usize,
}

/// One UART instance as seen by the driver layer.
///
/// Owned by the dispatcher and passed by reference into every driver call.
/// `base` is `None` when no device was found; data-path calls then report
/// [`UartError::NotReady`](crate::UartError::NotReady) instead of touching
/// memory.
#[derive(Debug)]
pub struct PortDescriptor<B> {
    base: Option<B>,
    /// Line rate in bits per second. Drivers that program a divisor record
    /// the rate they actually selected.
    pub baud_rate: u32,
    /// Per-port state bits.
    pub flags: PortFlags,
    power: Option<PowerRegisters>,
}

impl<B: RegisterBus> PortDescriptor<B> {
    /// Describes a port whose registers are reachable through `base`.
    pub const fn new(base: B, baud_rate: u32) -> Self {
        Self {
            base: Some(base),
            baud_rate,
            flags: PortFlags::empty(),
            power: None,
        }
    }

    /// Describes a port with no device behind it.
    pub const fn absent(baud_rate: u32) -> Self {
        Self {
            base: None,
            baud_rate,
            flags: PortFlags::empty(),
            power: None,
        }
    }

    /// Returns the register bus, if a device is present.
    #[must_use]
    pub const fn bus(&self) -> Option<&B> {
        self.base.as_ref()
    }

    /// Returns `true` if a device is present.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        self.base.is_some()
    }

    /// Returns the cached PCI power register offsets.
    #[must_use]
    pub const fn power_registers(&self) -> Option<PowerRegisters> {
        self.power
    }

    pub(crate) fn set_power_registers(&mut self, power: Option<PowerRegisters>) {
        self.power = power;
    }

    /// Resets the state every `initialize` starts from.
    pub(crate) fn reset_state(&mut self) {
        self.flags = PortFlags::empty();
        self.power = None;
    }

    /// Returns the bus if the data path may be used right now.
    pub(crate) fn data_bus(&self) -> Option<&B> {
        if self.flags.contains(PortFlags::POWERED_DOWN) {
            return None;
        }
        self.base.as_ref()
    }
}
