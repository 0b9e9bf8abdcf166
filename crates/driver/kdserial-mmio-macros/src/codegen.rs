//! Code generation for the `register_block!` macro.
//!
//! Every generated accessor goes through `::kdserial_mmio::RegisterBus`, so
//! the same block definition drives real MMIO and the test simulator.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use crate::parse::{Register, RegisterBlock};

/// Generates the complete output for a register block definition.
pub fn generate(block: &RegisterBlock) -> TokenStream {
    let vis = &block.vis;
    let name = &block.name;
    let attrs = &block.attrs;

    let methods: Vec<TokenStream> = block.registers.iter().map(generate_methods).collect();

    quote! {
        #(#attrs)*
        #[derive(Debug, Clone, Copy)]
        #vis struct #name<B> {
            bus: B,
        }

        impl<B: ::kdserial_mmio::RegisterBus> #name<B> {
            /// Wraps a register bus whose offset 0 is the start of this block.
            #[must_use]
            #vis const fn new(bus: B) -> Self {
                Self { bus }
            }

            /// Returns the underlying register bus.
            #[must_use]
            #vis const fn bus(&self) -> &B {
                &self.bus
            }

            #(#methods)*
        }
    }
}

/// Generates accessor methods for a single register.
fn generate_methods(reg: &Register) -> TokenStream {
    let mut methods = TokenStream::new();

    if reg.access.has_reader() {
        methods.extend(generate_read(reg));
    }
    if reg.access.has_writer() {
        methods.extend(generate_write(reg));
    }
    if reg.access.has_reader() && reg.access.has_writer() {
        methods.extend(generate_modify(reg));
    }

    methods
}

/// Generates the reader.
fn generate_read(reg: &Register) -> TokenStream {
    let name = &reg.name;
    let offset = &reg.offset;
    let width_ty = width_type(reg);
    let read_fn = format_ident!("read_{}", reg.width.primitive());
    let attrs = &reg.attrs;

    if let Some(ref bf_type) = reg.flags {
        quote! {
            #(#attrs)*
            #[inline]
            pub fn #name(&self) -> #bf_type {
                let raw: #width_ty = self.bus.#read_fn(#offset);
                #bf_type::from_bits_retain(raw)
            }
        }
    } else {
        quote! {
            #(#attrs)*
            #[inline]
            pub fn #name(&self) -> #width_ty {
                self.bus.#read_fn(#offset)
            }
        }
    }
}

/// Generates the `set_` writer.
fn generate_write(reg: &Register) -> TokenStream {
    let name = &reg.name;
    let setter_name = format_ident!("set_{}", name);
    let offset = &reg.offset;
    let width_ty = width_type(reg);
    let write_fn = format_ident!("write_{}", reg.width.primitive());

    let set_doc = format!("Writes the `{name}` register.");

    if let Some(ref bf_type) = reg.flags {
        quote! {
            #[doc = #set_doc]
            #[inline]
            pub fn #setter_name(&self, value: #bf_type) {
                self.bus.#write_fn(#offset, value.bits());
            }
        }
    } else {
        quote! {
            #[doc = #set_doc]
            #[inline]
            pub fn #setter_name(&self, value: #width_ty) {
                self.bus.#write_fn(#offset, value);
            }
        }
    }
}

/// Generates the `modify_` read-modify-write helper for `rw` registers.
fn generate_modify(reg: &Register) -> TokenStream {
    let name = &reg.name;
    let setter_name = format_ident!("set_{}", name);
    let modify_name = format_ident!("modify_{}", name);
    let value_ty = match reg.flags {
        Some(ref bf_type) => quote! { #bf_type },
        None => width_type(reg),
    };

    let modify_doc =
        format!("Reads the `{name}` register, applies `f` and writes the result back.");

    quote! {
        #[doc = #modify_doc]
        #[inline]
        pub fn #modify_name(&self, f: impl FnOnce(#value_ty) -> #value_ty) {
            let value = self.#name();
            self.#setter_name(f(value));
        }
    }
}

/// Returns the token stream for the register's width type.
fn width_type(reg: &Register) -> TokenStream {
    let ident = format_ident!("{}", reg.width.primitive());
    quote! { #ident }
}
