//! Errors returned by this crate.
//!
//! This module contains the definitions for all error types returned by this crate.

use thiserror::Error;

/// Errors that may occur while loading, verifying, or indexing a DEX file.
#[derive(Error, Debug)]
pub enum DexError {
    /// Ran out of bytes while a fixed-width or length-prefixed field still expected more.
    #[error("unexpected end of dex file")]
    Truncated,

    /// First 4 bytes were neither `"dex\n"` nor `"cdex"`.
    #[error("bad dex magic: {0:02x?}")]
    BadMagic([u8; 4]),

    /// Version quartet wasn't one of the recognized `"035\0" .. "039\0" | "001\0"`.
    #[error("unrecognized dex version: {0:02x?}")]
    BadVersion([u8; 4]),

    /// `endian_tag` was neither [`crate::ENDIAN_CONSTANT`] nor its swapped form.
    #[error("bad endian tag: {0:#010x}")]
    BadEndian(u32),

    /// Adler-32 over `bytes[12..]` didn't match the header's `checksum` field.
    #[error("adler-32 checksum mismatch: header says {expected:#010x}, computed {actual:#010x}")]
    BadChecksum { expected: u32, actual: u32 },

    /// A section's `(offset, size, alignment)` triple violated `checkOffsetSize`.
    #[error("bad section offset/size/alignment: {0}")]
    BadOffset(&'static str),

    /// A ULEB128-prefixed length exceeded the width expected at that call site.
    #[error("uleb128 value wider than expected")]
    InvalidULEB128,

    /// A map-item or item-type code outside the known set.
    #[error("unknown item type code: {0:#06x}")]
    UnknownTypeItem(u16),

    /// A class or method lookup found nothing; not fatal — callers may try the next dex.
    #[error("lookup miss")]
    NotFound,
}
