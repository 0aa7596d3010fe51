use bitflags::bitflags;
use winnow::binary::{le_u8, le_u16, le_u32};
use winnow::combinator::repeat;
use winnow::error::{ErrMode, Needed};
use winnow::prelude::*;
use winnow::token::take;

use crate::structs::ResChunkHeader;

bitflags! {
    #[derive(Debug)]
    pub(crate) struct StringType: u32 {
        const Sorted = 1 << 0;
        const Utf8 = 1 << 8;
    }
}

#[derive(Debug)]
pub(crate) struct ResStringPoolHeader {
    pub(crate) header: ResChunkHeader,
    pub(crate) string_count: u32,
    pub(crate) style_count: u32,
    pub(crate) flags: u32,
    pub(crate) strings_start: u32,
    pub(crate) styles_start: u32,
}

impl ResStringPoolHeader {
    pub(crate) fn parse(input: &mut &[u8]) -> ModalResult<ResStringPoolHeader> {
        let header = ResChunkHeader::parse(input)?;
        let (string_count, style_count, flags, strings_start, styles_start) =
            (le_u32, le_u32, le_u32, le_u32, le_u32).parse_next(input)?;

        Ok(ResStringPoolHeader {
            header,
            string_count,
            style_count,
            flags,
            strings_start,
            styles_start,
        })
    }

    #[inline]
    pub(crate) fn is_utf8(&self) -> bool {
        StringType::from_bits_truncate(self.flags).contains(StringType::Utf8)
    }
}

/// The decoded string pool of an AXML document: every string referenced by
/// index elsewhere in the file lives here, resolved once up front.
#[derive(Debug)]
pub(crate) struct StringPool {
    pub(crate) header: ResStringPoolHeader,
    pub(crate) strings: Vec<String>,
}

impl StringPool {
    pub(crate) fn parse(input: &mut &[u8]) -> ModalResult<StringPool> {
        let string_header = ResStringPoolHeader::parse(input)?;

        let string_offsets =
            repeat(string_header.string_count as usize, le_u32).parse_next(input)?;
        let _style_offsets: Vec<u32> =
            repeat(string_header.style_count as usize, le_u32).parse_next(input)?;

        let strings = Self::parse_strings(input, &string_header, &string_offsets)?;

        Ok(StringPool {
            header: string_header,
            strings,
        })
    }

    fn parse_strings(
        input: &mut &[u8],
        string_header: &ResStringPoolHeader,
        string_offsets: &[u32],
    ) -> ModalResult<Vec<String>> {
        let string_pool_size = string_header
            .header
            .size
            .saturating_sub(string_header.strings_start) as usize;

        // take just the string chunk; malformed samples sometimes have
        // trailing junk the offset table never points into
        let (slice, rest) = input
            .split_at_checked(string_pool_size)
            .ok_or(ErrMode::Incomplete(Needed::Unknown))?;
        *input = rest;

        let is_utf8 = string_header.is_utf8();
        let mut strings = Vec::with_capacity(string_header.string_count as usize);

        for &offset in string_offsets {
            let Some(mut tail) = slice.get(offset as usize..) else {
                strings.push(String::new());
                continue;
            };

            match Self::parse_string(&mut tail, is_utf8) {
                Ok(s) => strings.push(s),
                Err(_) => strings.push(String::new()),
            }
        }

        Ok(strings)
    }

    fn parse_string(input: &mut &[u8], is_utf8: bool) -> ModalResult<String> {
        let string = if !is_utf8 {
            let u16len = le_u16(input)?;

            let real_len = if u16len & 0x8000 != 0 {
                let u16len_fix: u16 = le_u16(input)?;
                (((u16len & 0x7FFF) as u32) << 16 | u16len_fix as u32) as usize
            } else {
                u16len as usize
            };

            let content = take(real_len * 2).parse_next(input)?;
            let _ = le_u16(input)?; // zero terminator

            Self::read_utf16(content, real_len)
        } else {
            let (length1, length2) = (le_u8, le_u8).parse_next(input)?;

            let real_length = if length1 & 0x80 != 0 {
                let length = ((length1 as u16 & !0x80) << 8) | length2 as u16;
                let _ = le_u16(input)?;
                length as u32
            } else {
                length1 as u32
            };

            let content = take(real_length).parse_next(input)?;
            let _ = le_u8(input)?;

            String::from_utf8_lossy(content).to_string()
        };

        Ok(string)
    }

    fn read_utf16(slice: &[u8], size: usize) -> String {
        std::char::decode_utf16(
            slice
                .chunks_exact(2)
                .take(size)
                .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]])),
        )
        .collect::<Result<String, _>>()
        .unwrap_or_default()
    }

    /// An index beyond the pool resolves to the empty string rather than failing.
    pub(crate) fn get(&self, idx: u32) -> Option<&String> {
        self.strings.get(idx as usize)
    }
}
