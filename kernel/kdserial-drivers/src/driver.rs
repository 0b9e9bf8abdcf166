//! The driver contract and family dispatch.

use kdserial_mmio::RegisterBus;

use crate::error::UartError;
use crate::geni::{Geni, GeniRevision};
use crate::lpss::{Lpss, LpssRevision};
use crate::mini_uart::MiniUart;
use crate::port::{AccessMode, PortDescriptor};

/// Operations every debugger UART family provides.
///
/// All calls are synchronous and polling. A driver instance owns only the
/// state its family needs between calls; everything else lives in the
/// [`PortDescriptor`] the dispatcher passes in.
pub trait UartDriver<B: RegisterBus> {
    /// Brings the port up at `port.baud_rate`, 8N1, interrupts off.
    ///
    /// `load_options` is the loader's option string; current families ignore
    /// it.
    ///
    /// # Errors
    ///
    /// [`UartError::Unsupported`] for an access mode the family cannot use,
    /// [`UartError::NotReady`] for a port with no device, or a hardware
    /// failure reported while programming.
    fn initialize(
        &mut self,
        load_options: Option<&str>,
        port: &mut PortDescriptor<B>,
        access: AccessMode,
    ) -> Result<(), UartError>;

    /// Changes the line rate. Unknown rates snap to the family's slowest.
    ///
    /// # Errors
    ///
    /// [`UartError::NotReady`] if the port is absent, powered down or busy.
    fn set_baud(&mut self, port: &mut PortDescriptor<B>, rate: u32) -> Result<(), UartError>;

    /// Reads one received byte without blocking.
    ///
    /// # Errors
    ///
    /// [`UartError::NoData`] when nothing is waiting, [`UartError::NotReady`]
    /// when the port cannot be used, or a family-specific failure.
    fn get_byte(&mut self, port: &mut PortDescriptor<B>) -> Result<u8, UartError>;

    /// Transmits one byte. With `busy_wait` unset a full transmitter is
    /// reported instead of waited on.
    ///
    /// # Errors
    ///
    /// [`UartError::NotReady`] if the port cannot be used or the transmitter
    /// is full and `busy_wait` is `false`.
    fn put_byte(
        &mut self,
        port: &mut PortDescriptor<B>,
        byte: u8,
        busy_wait: bool,
    ) -> Result<(), UartError>;

    /// Returns `true` if [`get_byte`](Self::get_byte) would return data.
    fn rx_ready(&mut self, port: &mut PortDescriptor<B>) -> bool;

    /// Returns `true` if D0/D3 transitions do real work for this family.
    fn supports_power_management(&self) -> bool {
        false
    }

    /// Brings the device back to D0 and reprograms it.
    ///
    /// # Errors
    ///
    /// Families with power management report verification failures.
    fn set_power_d0(&mut self, port: &mut PortDescriptor<B>) -> Result<(), UartError> {
        let _ = port;
        Ok(())
    }

    /// Parks the device and moves it to D3hot.
    ///
    /// # Errors
    ///
    /// Families with power management report verification failures.
    fn set_power_d3(&mut self, port: &mut PortDescriptor<B>) -> Result<(), UartError> {
        let _ = port;
        Ok(())
    }

    /// Writes every byte of `bytes`, waiting for the transmitter as needed.
    ///
    /// # Errors
    ///
    /// Stops at the first byte [`put_byte`](Self::put_byte) rejects.
    fn put_bytes(&mut self, port: &mut PortDescriptor<B>, bytes: &[u8]) -> Result<(), UartError> {
        for &byte in bytes {
            self.put_byte(port, byte, true)?;
        }
        Ok(())
    }
}

/// Which family and revision a port belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverKind {
    /// BCM2835 auxiliary mini-UART.
    MiniUart,
    /// Intel LPSS 16550, first revision.
    LpssRev1,
    /// Intel LPSS 16550, second revision.
    LpssRev2,
    /// Qualcomm GENI serial engine, first layout.
    GeniV1,
    /// Qualcomm GENI serial engine, QUP-wrapped layout.
    GeniV2,
}

/// DBG2 port subtype for the BCM2835 mini-UART.
pub const DBG2_SUBTYPE_BCM2835: u16 = 0x0010;
/// DBG2 port subtype for the SDM845 GENI UART.
pub const DBG2_SUBTYPE_SDM845_V1: u16 = 0x0011;
/// DBG2 port subtype for the SDM845 GENI UART with the 7.372 MHz clock.
pub const DBG2_SUBTYPE_SDM845_V2: u16 = 0x0013;
/// DBG2 port subtype for Intel LPSS UARTs, of either revision.
pub const DBG2_SUBTYPE_INTEL_LPSS: u16 = 0x0014;

impl DriverKind {
    /// Maps an ACPI DBG2 serial subtype to a family.
    ///
    /// [`DBG2_SUBTYPE_INTEL_LPSS`] is not mapped: it does not say which
    /// silicon revision is present, so the platform picks
    /// [`LpssRev1`](Self::LpssRev1) or [`LpssRev2`](Self::LpssRev2) itself.
    #[must_use]
    pub const fn from_dbg2_subtype(subtype: u16) -> Option<Self> {
        match subtype {
            DBG2_SUBTYPE_BCM2835 => Some(Self::MiniUart),
            DBG2_SUBTYPE_SDM845_V1 => Some(Self::GeniV1),
            DBG2_SUBTYPE_SDM845_V2 => Some(Self::GeniV2),
            _ => None,
        }
    }
}

/// A driver for any supported family.
#[derive(Debug)]
pub enum DebugUart {
    /// BCM2835 mini-UART.
    MiniUart(MiniUart),
    /// Intel LPSS 16550.
    Lpss(Lpss),
    /// Qualcomm GENI.
    Geni(Geni),
}

impl DebugUart {
    /// Creates the driver for `kind` in its pre-initialization state.
    #[must_use]
    pub const fn new(kind: DriverKind) -> Self {
        match kind {
            DriverKind::MiniUart => Self::MiniUart(MiniUart::new()),
            DriverKind::LpssRev1 => Self::Lpss(Lpss::new(LpssRevision::Rev1)),
            DriverKind::LpssRev2 => Self::Lpss(Lpss::new(LpssRevision::Rev2)),
            DriverKind::GeniV1 => Self::Geni(Geni::new(GeniRevision::V1)),
            DriverKind::GeniV2 => Self::Geni(Geni::new(GeniRevision::V2)),
        }
    }

    /// Returns the family and revision this driver was built for.
    #[must_use]
    pub const fn kind(&self) -> DriverKind {
        match self {
            Self::MiniUart(_) => DriverKind::MiniUart,
            Self::Lpss(d) => match d.revision() {
                LpssRevision::Rev1 => DriverKind::LpssRev1,
                LpssRevision::Rev2 => DriverKind::LpssRev2,
            },
            Self::Geni(d) => match d.revision() {
                GeniRevision::V1 => DriverKind::GeniV1,
                GeniRevision::V2 => DriverKind::GeniV2,
            },
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $d:ident => $call:expr) => {
        match $self {
            Self::MiniUart($d) => $call,
            Self::Lpss($d) => $call,
            Self::Geni($d) => $call,
        }
    };
}

impl<B: RegisterBus> UartDriver<B> for DebugUart {
    fn initialize(
        &mut self,
        load_options: Option<&str>,
        port: &mut PortDescriptor<B>,
        access: AccessMode,
    ) -> Result<(), UartError> {
        dispatch!(self, d => d.initialize(load_options, port, access))
    }

    fn set_baud(&mut self, port: &mut PortDescriptor<B>, rate: u32) -> Result<(), UartError> {
        dispatch!(self, d => d.set_baud(port, rate))
    }

    fn get_byte(&mut self, port: &mut PortDescriptor<B>) -> Result<u8, UartError> {
        dispatch!(self, d => d.get_byte(port))
    }

    fn put_byte(
        &mut self,
        port: &mut PortDescriptor<B>,
        byte: u8,
        busy_wait: bool,
    ) -> Result<(), UartError> {
        dispatch!(self, d => d.put_byte(port, byte, busy_wait))
    }

    fn rx_ready(&mut self, port: &mut PortDescriptor<B>) -> bool {
        dispatch!(self, d => d.rx_ready(port))
    }

    fn supports_power_management(&self) -> bool {
        dispatch!(self, d => UartDriver::<B>::supports_power_management(d))
    }

    fn set_power_d0(&mut self, port: &mut PortDescriptor<B>) -> Result<(), UartError> {
        dispatch!(self, d => d.set_power_d0(port))
    }

    fn set_power_d3(&mut self, port: &mut PortDescriptor<B>) -> Result<(), UartError> {
        dispatch!(self, d => d.set_power_d3(port))
    }
}
