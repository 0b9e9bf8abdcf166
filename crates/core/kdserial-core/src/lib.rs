//! Shared support code for the kdserial debugger UART drivers.
//!
//! - [`log`]: hook-based leveled logging that discards output until a sink
//!   is registered.
//! - [`spin`]: the two polling shapes the drivers use, unbounded and counted.

#![cfg_attr(not(test), no_std)]

pub mod log;
pub mod spin;
