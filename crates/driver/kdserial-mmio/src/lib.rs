//! Register access primitives for the kdserial drivers.
//!
//! Drivers never touch raw pointers directly. They talk to a [`RegisterBus`],
//! a byte-addressed register window with bit-exact 8/16/32/64-bit accessors.
//! [`Mmio`] is the hardware implementation (volatile, uncached, in program
//! order); tests substitute a simulated bus.
//!
//! The [`register_block!`] macro generates typed accessor structs on top of
//! any bus:
//!
//! ```ignore
//! use kdserial_mmio::{Mmio, register_block};
//!
//! register_block! {
//!     /// BCM2835 auxiliary mini-UART registers.
//!     pub MiniUartRegs {
//!         /// Data register.
//!         [0x40; u32; rw] io,
//!         /// Line status.
//!         [0x64; u32; ro] stat,
//!     }
//! }
//!
//! let bus = unsafe { Mmio::from_addr(0xfe21_5000) }.unwrap();
//! let regs = MiniUartRegs::new(&bus);
//! let status = regs.stat();
//! ```

#![cfg_attr(not(test), no_std)]

// Generated code names the bus trait through `::kdserial_mmio`.
extern crate self as kdserial_mmio;

use core::fmt;
use core::ptr::NonNull;

pub use kdserial_mmio_macros::register_block;

/// Width of a single register access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccessSize {
    /// 8-bit access.
    Byte,
    /// 16-bit access.
    Word,
    /// 32-bit access.
    Dword,
    /// 64-bit access.
    Qword,
}

impl AccessSize {
    /// Size of one access in bytes.
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            Self::Byte => 1,
            Self::Word => 2,
            Self::Dword => 4,
            Self::Qword => 8,
        }
    }
}

/// A window of device registers addressed by byte offset.
///
/// Methods take `&self`: register I/O is shared hardware state and every
/// implementation is expected to be used from a single polling thread.
/// Reads may have side effects (FIFO pops, read-to-clear status), so callers
/// must not elide or reorder them.
pub trait RegisterBus {
    /// Reads an 8-bit register.
    fn read_u8(&self, offset: usize) -> u8;
    /// Reads a 16-bit register.
    fn read_u16(&self, offset: usize) -> u16;
    /// Reads a 32-bit register.
    fn read_u32(&self, offset: usize) -> u32;
    /// Reads a 64-bit register.
    fn read_u64(&self, offset: usize) -> u64;
    /// Writes an 8-bit register.
    fn write_u8(&self, offset: usize, value: u8);
    /// Writes a 16-bit register.
    fn write_u16(&self, offset: usize, value: u16);
    /// Writes a 32-bit register.
    fn write_u32(&self, offset: usize, value: u32);
    /// Writes a 64-bit register.
    fn write_u64(&self, offset: usize, value: u64);

    /// Reads a register of the given size, zero-extended to 64 bits.
    fn read_sized(&self, offset: usize, size: AccessSize) -> u64 {
        match size {
            AccessSize::Byte => u64::from(self.read_u8(offset)),
            AccessSize::Word => u64::from(self.read_u16(offset)),
            AccessSize::Dword => u64::from(self.read_u32(offset)),
            AccessSize::Qword => self.read_u64(offset),
        }
    }

    /// Writes the low bits of `value` to a register of the given size.
    #[expect(clippy::cast_possible_truncation, reason = "truncation to the access size is intended")]
    fn write_sized(&self, offset: usize, size: AccessSize, value: u64) {
        match size {
            AccessSize::Byte => self.write_u8(offset, value as u8),
            AccessSize::Word => self.write_u16(offset, value as u16),
            AccessSize::Dword => self.write_u32(offset, value as u32),
            AccessSize::Qword => self.write_u64(offset, value),
        }
    }
}

impl<T: RegisterBus + ?Sized> RegisterBus for &T {
    fn read_u8(&self, offset: usize) -> u8 {
        (**self).read_u8(offset)
    }
    fn read_u16(&self, offset: usize) -> u16 {
        (**self).read_u16(offset)
    }
    fn read_u32(&self, offset: usize) -> u32 {
        (**self).read_u32(offset)
    }
    fn read_u64(&self, offset: usize) -> u64 {
        (**self).read_u64(offset)
    }
    fn write_u8(&self, offset: usize, value: u8) {
        (**self).write_u8(offset, value);
    }
    fn write_u16(&self, offset: usize, value: u16) {
        (**self).write_u16(offset, value);
    }
    fn write_u32(&self, offset: usize, value: u32) {
        (**self).write_u32(offset, value);
    }
    fn write_u64(&self, offset: usize, value: u64) {
        (**self).write_u64(offset, value);
    }
}

// ---------------------------------------------------------------------------
// Mmio
// ---------------------------------------------------------------------------

/// Memory-mapped register window starting at a fixed virtual address.
///
/// All accesses are volatile, so the compiler neither caches nor reorders
/// them relative to each other.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Mmio {
    base: NonNull<u8>,
}

impl Mmio {
    /// Creates a window at `base`.
    ///
    /// # Safety
    ///
    /// `base` must point to a mapped, uncached device region large enough for
    /// every register offset the driver touches, and must stay mapped for as
    /// long as the window (or any copy of it) is used.
    #[must_use]
    pub const unsafe fn new(base: NonNull<u8>) -> Self {
        Self { base }
    }

    /// Creates a window from a raw virtual address, returning `None` for 0.
    ///
    /// # Safety
    ///
    /// Same requirements as [`new`](Self::new).
    #[must_use]
    pub unsafe fn from_addr(addr: usize) -> Option<Self> {
        NonNull::new(addr as *mut u8).map(|base| Self { base })
    }

    /// Returns the base address of the window.
    #[must_use]
    pub fn addr(&self) -> usize {
        self.base.as_ptr() as usize
    }

    #[inline]
    fn ptr<T>(&self, offset: usize) -> *mut T {
        self.base.as_ptr().wrapping_add(offset).cast::<T>()
    }
}

impl fmt::Debug for Mmio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Mmio")
            .field(&format_args!("{:#x}", self.addr()))
            .finish()
    }
}

macro_rules! mmio_access {
    ($($read:ident / $write:ident: $ty:ty),* $(,)?) => {
        $(
            #[inline]
            fn $read(&self, offset: usize) -> $ty {
                // SAFETY: Caller of `Mmio::new` guarantees the window covers `offset`.
                unsafe { core::ptr::read_volatile(self.ptr::<$ty>(offset)) }
            }

            #[inline]
            fn $write(&self, offset: usize, value: $ty) {
                // SAFETY: Caller of `Mmio::new` guarantees the window covers `offset`.
                unsafe { core::ptr::write_volatile(self.ptr::<$ty>(offset), value) }
            }
        )*
    };
}

impl RegisterBus for Mmio {
    mmio_access! {
        read_u8 / write_u8: u8,
        read_u16 / write_u16: u16,
        read_u32 / write_u32: u32,
        read_u64 / write_u64: u64,
    }
}

// ---------------------------------------------------------------------------
// Window
// ---------------------------------------------------------------------------

/// A sub-window of another bus, shifted by a fixed byte offset.
///
/// Used for register blocks whose position inside the device aperture
/// differs between silicon revisions.
#[derive(Debug, Clone, Copy)]
pub struct Window<B> {
    bus: B,
    offset: usize,
}

impl<B: RegisterBus> Window<B> {
    /// Creates a view of `bus` starting at `offset`.
    #[must_use]
    pub const fn new(bus: B, offset: usize) -> Self {
        Self { bus, offset }
    }

    /// Byte offset of this window inside the parent bus.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }
}

impl<B: RegisterBus> RegisterBus for Window<B> {
    fn read_u8(&self, offset: usize) -> u8 {
        self.bus.read_u8(self.offset + offset)
    }
    fn read_u16(&self, offset: usize) -> u16 {
        self.bus.read_u16(self.offset + offset)
    }
    fn read_u32(&self, offset: usize) -> u32 {
        self.bus.read_u32(self.offset + offset)
    }
    fn read_u64(&self, offset: usize) -> u64 {
        self.bus.read_u64(self.offset + offset)
    }
    fn write_u8(&self, offset: usize, value: u8) {
        self.bus.write_u8(self.offset + offset, value);
    }
    fn write_u16(&self, offset: usize, value: u16) {
        self.bus.write_u16(self.offset + offset, value);
    }
    fn write_u32(&self, offset: usize, value: u32) {
        self.bus.write_u32(self.offset + offset, value);
    }
    fn write_u64(&self, offset: usize, value: u64) {
        self.bus.write_u64(self.offset + offset, value);
    }
}
