//! Polling UART drivers for the kernel debugger transport.
//!
//! Three families are supported behind one [`UartDriver`] contract:
//!
//! - [`mini_uart`]: BCM2835 auxiliary mini-UART.
//! - [`lpss`]: Intel LPSS 16550 derivative with D0/D3 power management.
//! - [`geni`]: Qualcomm GENI serial engine in FIFO mode.
//!
//! Every call is synchronous, non-reentrant and reaches the hardware through
//! a [`RegisterBus`](kdserial_mmio::RegisterBus), so the same code runs on
//! real MMIO and on the test simulator. The [`DebugUart`] enum picks a family
//! at runtime from a [`DriverKind`].

#![cfg_attr(not(test), no_std)]

pub mod baud;
pub mod driver;
pub mod error;
pub mod geni;
pub mod lpss;
pub mod mini_uart;
pub mod ns16550;
pub mod pci_pm;
pub mod port;

pub use driver::{DebugUart, DriverKind, UartDriver};
pub use error::{UartError, VerifiedRegister};
pub use port::{AccessMode, PortDescriptor, PortFlags, PowerRegisters};
