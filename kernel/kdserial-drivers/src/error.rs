//! Driver error types.

use core::fmt;

/// Registers whose write-then-read-back is verified by the drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifiedRegister {
    /// PCI power-management control/status register.
    Pmcsr,
    /// PCI command register (bus-master and memory-space enables).
    PciCommand,
    /// LPSS private software-reset register.
    SoftReset,
}

impl fmt::Display for VerifiedRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pmcsr => f.write_str("PMCSR"),
            Self::PciCommand => f.write_str("PCI command"),
            Self::SoftReset => f.write_str("software reset"),
        }
    }
}

/// Errors returned by the UART driver operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UartError {
    /// No device behind the port, the port is powered down, or the hardware
    /// is transiently busy.
    NotReady,
    /// Nothing has been received. A normal polling outcome.
    NoData,
    /// The requested access mode is not supported by this family.
    Unsupported,
    /// A register did not read back the value the driver expected.
    VerificationFailed {
        /// Register that was checked.
        register: VerifiedRegister,
        /// Expected value, masked to the checked field.
        expected: u32,
        /// Value actually read, masked to the checked field.
        found: u32,
    },
    /// The receive FIFO reported more data than the transfer buffer holds.
    /// The port has been re-initialized and the pending data dropped.
    FifoOverflow {
        /// Bytes reported by hardware.
        pending: usize,
        /// Capacity of the transfer buffer.
        capacity: usize,
    },
    /// A bounded wait ran out of attempts.
    RetryExhausted {
        /// Number of attempts made.
        retries: u32,
    },
}

impl UartError {
    /// Returns `true` for outcomes the caller is expected to simply re-poll.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::NotReady | Self::NoData)
    }
}

impl fmt::Display for UartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReady => f.write_str("port not ready"),
            Self::NoData => f.write_str("no data available"),
            Self::Unsupported => f.write_str("access mode not supported"),
            Self::VerificationFailed {
                register,
                expected,
                found,
            } => write!(
                f,
                "{register} verification failed: expected {expected:#x}, found {found:#x}"
            ),
            Self::FifoOverflow { pending, capacity } => write!(
                f,
                "receive FIFO overflow: {pending} bytes pending, buffer holds {capacity}"
            ),
            Self::RetryExhausted { retries } => {
                write!(f, "hardware did not settle after {retries} attempts")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_all_variants() {
        assert_eq!(format!("{}", UartError::NotReady), "port not ready");
        assert_eq!(format!("{}", UartError::NoData), "no data available");
        assert_eq!(
            format!("{}", UartError::Unsupported),
            "access mode not supported"
        );
        assert_eq!(
            format!(
                "{}",
                UartError::VerificationFailed {
                    register: VerifiedRegister::Pmcsr,
                    expected: 3,
                    found: 0,
                }
            ),
            "PMCSR verification failed: expected 0x3, found 0x0"
        );
        assert_eq!(
            format!(
                "{}",
                UartError::FifoOverflow {
                    pending: 300,
                    capacity: 256,
                }
            ),
            "receive FIFO overflow: 300 bytes pending, buffer holds 256"
        );
        assert_eq!(
            format!("{}", UartError::RetryExhausted { retries: 10 }),
            "hardware did not settle after 10 attempts"
        );
    }

    #[test]
    fn transient_classification() {
        assert!(UartError::NotReady.is_transient());
        assert!(UartError::NoData.is_transient());
        assert!(!UartError::Unsupported.is_transient());
        assert!(!UartError::RetryExhausted { retries: 1 }.is_transient());
    }
}
