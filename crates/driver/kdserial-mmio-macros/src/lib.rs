//! Proc-macro crate for the `register_block!` MMIO register DSL.
//!
//! Generates typed register accessors from a declarative definition. The
//! accessors are generic over `kdserial_mmio::RegisterBus`; the single
//! `unsafe` point is wherever the bus itself is created (e.g. `Mmio::new`).

mod codegen;
mod parse;

use proc_macro::TokenStream;
use syn::parse_macro_input;

use crate::parse::RegisterBlock;

/// Generates a typed register block struct with accessors over a register bus.
///
/// # Syntax
///
/// ```ignore
/// register_block! {
///     /// Doc comment for the struct.
///     pub StructName {
///         /// Doc comment for the register.
///         [offset; width; access_mode] name => OptionalBitflagsType,
///     }
/// }
/// ```
///
/// - `offset`: byte offset from the start of the block, aligned to `width`
/// - `width`: `u8`, `u16`, `u32`, or `u64`
/// - `access_mode`: `ro` (read-only), `wo` (write-only), `rw` (read-write)
/// - `name`: register name (generates method names)
/// - `=> Type`: optional bitflags type (must have `from_bits_retain`/`.bits()`)
///
/// # Generated Code
///
/// `pub struct StructName<B>` wrapping a bus, with for each register:
/// - `ro`/`rw`: `fn name(&self) -> Type`
/// - `wo`/`rw`: `fn set_name(&self, value: Type)`
/// - `rw`: `fn modify_name(&self, f: impl FnOnce(Type) -> Type)`
///
/// # Example
///
/// ```ignore
/// use kdserial_mmio::register_block;
///
/// register_block! {
///     /// BCM2835 auxiliary mini-UART registers.
///     pub MiniUartRegs {
///         /// Data register.
///         [0x40; u32; rw] io,
///         /// Line status.
///         [0x64; u32; ro] stat => MuStat,
///     }
/// }
/// ```
#[proc_macro]
pub fn register_block(input: TokenStream) -> TokenStream {
    let block = parse_macro_input!(input as RegisterBlock);
    codegen::generate(&block).into()
}
