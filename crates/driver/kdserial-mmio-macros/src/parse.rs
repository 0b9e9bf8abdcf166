//! Parser for the `register_block!` input.
//!
//! A block is an attributed, optionally public name followed by a braced
//! list of register lines:
//!
//! ```text
//! [offset; width; access] name => Flags,
//! ```
//!
//! Offsets must be aligned to their width and names must be unique within
//! the block. Both are reported at the offending token.

use syn::parse::{Parse, ParseStream};
use syn::{Attribute, Ident, LitInt, Token, Visibility, braced, bracketed};

/// Parsed `register_block!` input.
pub struct RegisterBlock {
    pub attrs: Vec<Attribute>,
    pub vis: Visibility,
    pub name: Ident,
    pub registers: Vec<Register>,
}

/// Which accessors a register gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// `ro`: reader only.
    Ro,
    /// `wo`: `set_` writer only.
    Wo,
    /// `rw`: reader, writer and `modify_`.
    Rw,
}

impl Access {
    fn from_keyword(keyword: &Ident) -> syn::Result<Self> {
        match keyword.to_string().as_str() {
            "ro" => Ok(Self::Ro),
            "wo" => Ok(Self::Wo),
            "rw" => Ok(Self::Rw),
            other => Err(syn::Error::new(
                keyword.span(),
                format!("unknown access `{other}`, use ro, wo or rw"),
            )),
        }
    }

    pub fn has_reader(self) -> bool {
        matches!(self, Self::Ro | Self::Rw)
    }

    pub fn has_writer(self) -> bool {
        matches!(self, Self::Wo | Self::Rw)
    }
}

/// Bus access width of one register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    U8,
    U16,
    U32,
    U64,
}

impl Width {
    const ALL: [Self; 4] = [Self::U8, Self::U16, Self::U32, Self::U64];

    fn from_keyword(keyword: &Ident) -> syn::Result<Self> {
        Self::ALL
            .into_iter()
            .find(|width| keyword == width.primitive())
            .ok_or_else(|| {
                syn::Error::new(
                    keyword.span(),
                    format!("unknown width `{keyword}`, use u8, u16, u32 or u64"),
                )
            })
    }

    /// Primitive type name, also the suffix of the matching bus method.
    pub fn primitive(self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
        }
    }

    pub fn size(self) -> u64 {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
            Self::U64 => 8,
        }
    }
}

/// One register line.
pub struct Register {
    pub attrs: Vec<Attribute>,
    pub offset: LitInt,
    pub width: Width,
    pub access: Access,
    pub name: Ident,
    /// Bitflags type the raw value is wrapped in, if any.
    pub flags: Option<Ident>,
}

impl Parse for RegisterBlock {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let attrs = input.call(Attribute::parse_outer)?;
        let vis = input.parse()?;
        let name = input.parse()?;

        let body;
        braced!(body in input);

        let mut registers: Vec<Register> = Vec::new();
        while !body.is_empty() {
            let register: Register = body.parse()?;
            if registers.iter().any(|seen| seen.name == register.name) {
                return Err(syn::Error::new(
                    register.name.span(),
                    format!("register `{}` is defined twice", register.name),
                ));
            }
            registers.push(register);
            if !body.is_empty() {
                body.parse::<Token![,]>()?;
            }
        }

        Ok(Self {
            attrs,
            vis,
            name,
            registers,
        })
    }
}

impl Parse for Register {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let attrs = input.call(Attribute::parse_outer)?;
        let (offset, width, access) = parse_location(input)?;
        let name = input.parse()?;
        let flags = if input.parse::<Option<Token![=>]>>()?.is_some() {
            Some(input.parse()?)
        } else {
            None
        };

        Ok(Self {
            attrs,
            offset,
            width,
            access,
            name,
            flags,
        })
    }
}

/// Parses the bracketed `[offset; width; access]` prefix.
fn parse_location(input: ParseStream) -> syn::Result<(LitInt, Width, Access)> {
    let location;
    bracketed!(location in input);

    let offset: LitInt = location.parse()?;
    location.parse::<Token![;]>()?;
    let width = Width::from_keyword(&location.parse()?)?;
    location.parse::<Token![;]>()?;
    let access = Access::from_keyword(&location.parse()?)?;

    let byte_offset: u64 = offset.base10_parse()?;
    if byte_offset % width.size() != 0 {
        return Err(syn::Error::new(
            offset.span(),
            format!(
                "offset {byte_offset:#x} is not aligned to a {}-byte register",
                width.size()
            ),
        ));
    }

    Ok((offset, width, access))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> syn::Result<RegisterBlock> {
        syn::parse_str(source)
    }

    fn error(source: &str) -> String {
        match parse(source) {
            Ok(_) => panic!("`{source}` parsed"),
            Err(e) => e.to_string(),
        }
    }

    #[test]
    fn parses_every_access_and_width() {
        let block = parse(
            "pub Regs {
                [0x0; u8; ro] a,
                [0x2; u16; wo] b => Flags,
                [0x4; u32; rw] c,
                [0x8; u64; rw] d,
            }",
        )
        .unwrap();

        assert_eq!(block.name, "Regs");
        let summary: Vec<_> = block
            .registers
            .iter()
            .map(|r| (r.name.to_string(), r.width, r.access, r.flags.is_some()))
            .collect();
        assert_eq!(
            summary,
            [
                ("a".to_owned(), Width::U8, Access::Ro, false),
                ("b".to_owned(), Width::U16, Access::Wo, true),
                ("c".to_owned(), Width::U32, Access::Rw, false),
                ("d".to_owned(), Width::U64, Access::Rw, false),
            ]
        );
    }

    #[test]
    fn last_comma_is_optional() {
        assert_eq!(parse("Regs { [0x40; u32; rw] io }").unwrap().registers.len(), 1);
    }

    #[test]
    fn rejects_misaligned_offsets() {
        assert!(error("Regs { [0x42; u32; rw] io }").contains("not aligned to a 4-byte"));
    }

    #[test]
    fn rejects_duplicate_names() {
        assert!(error("Regs { [0x0; u8; ro] a, [0x1; u8; ro] a }").contains("defined twice"));
    }

    #[test]
    fn rejects_unknown_keywords() {
        assert!(error("Regs { [0x0; u24; ro] a }").contains("unknown width"));
        assert!(error("Regs { [0x0; u8; rx] a }").contains("unknown access"));
    }

    #[test]
    fn access_selects_accessors() {
        assert!(Access::Ro.has_reader() && !Access::Ro.has_writer());
        assert!(!Access::Wo.has_reader() && Access::Wo.has_writer());
        assert!(Access::Rw.has_reader() && Access::Rw.has_writer());
    }
}
