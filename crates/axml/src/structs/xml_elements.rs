use winnow::binary::{le_u16, le_u32};
use winnow::combinator::repeat;
use winnow::prelude::*;

use crate::structs::{ResChunkHeader, ResourceValue};

#[derive(Debug)]
pub(crate) struct XMLResourceMap {
    pub(crate) header: ResChunkHeader,
    pub(crate) resource_ids: Vec<u32>,
}

impl XMLResourceMap {
    /// The resource-ID chunk is expected to open with the `XmlResourceMap`
    /// tag (0x0180); some producers emit one stray `u16` before it, so a
    /// single extra read is tolerated before giving up on resync.
    pub(crate) fn parse(input: &mut &[u8]) -> ModalResult<XMLResourceMap> {
        let mut res_type = le_u16(input)?;
        if res_type != crate::structs::ResourceType::XmlResourceMap as u16 {
            res_type = le_u16(input)?;
        }

        let (header_size, size) = (le_u16, le_u32).parse_next(input)?;
        let header = ResChunkHeader {
            type_: crate::structs::ResourceType::from(res_type),
            header_size,
            size,
        };

        let resource_ids = repeat(
            (size.saturating_sub(header_size as u32) / 4) as usize,
            le_u32,
        )
        .parse_next(input)?;

        Ok(XMLResourceMap {
            header,
            resource_ids,
        })
    }
}

/// Header shared by every tagged chunk in the XML body: the generic chunk
/// header plus a source line number and an (unused here) comment string ref.
#[derive(Debug, Default)]
pub(crate) struct XMLHeader {
    pub(crate) header: ResChunkHeader,
    pub(crate) line_number: u32,
    pub(crate) comment: u32,
}

impl XMLHeader {
    #[inline]
    pub(crate) fn parse(input: &mut &[u8], header: ResChunkHeader) -> ModalResult<XMLHeader> {
        let (line_number, comment) = (le_u32, le_u32).parse_next(input)?;

        Ok(XMLHeader {
            header,
            line_number,
            comment,
        })
    }
}

pub(crate) trait XmlElement {
    fn parse(input: &mut &[u8], header: XMLHeader) -> ModalResult<Self>
    where
        Self: Sized;
}

#[derive(Debug)]
pub(crate) struct XmlNamespace {
    pub(crate) header: XMLHeader,
    pub(crate) prefix: u32,
    pub(crate) uri: u32,
}

impl XmlElement for XmlNamespace {
    #[inline]
    fn parse(input: &mut &[u8], header: XMLHeader) -> ModalResult<Self> {
        let (prefix, uri) = (le_u32, le_u32).parse_next(input)?;
        Ok(XmlNamespace {
            header,
            prefix,
            uri,
        })
    }
}

#[derive(Debug)]
pub(crate) struct XmlAttributeElement {
    pub(crate) namespace_uri: u32,
    pub(crate) name: u32,
    pub(crate) value: u32,
    pub(crate) typed_value: ResourceValue,
}

impl XmlAttributeElement {
    #[inline]
    fn parse(input: &mut &[u8]) -> ModalResult<XmlAttributeElement> {
        let (namespace_uri, name, value, typed_value) =
            (le_u32, le_u32, le_u32, ResourceValue::parse).parse_next(input)?;

        Ok(XmlAttributeElement {
            namespace_uri,
            name,
            value,
            typed_value,
        })
    }
}

#[derive(Debug)]
pub(crate) struct XmlStartElement {
    pub(crate) header: XMLHeader,
    pub(crate) namespace_uri: u32,
    pub(crate) name: u32,
    pub(crate) flags: u32,
    pub(crate) attribute_count: u32,
    pub(crate) class_attribute: u32,
    pub(crate) attributes: Vec<XmlAttributeElement>,
}

impl XmlElement for XmlStartElement {
    fn parse(input: &mut &[u8], header: XMLHeader) -> ModalResult<Self> {
        let (namespace_uri, name, flags, attribute_count, class_attribute) = (
            le_u32, // namespace_uri
            le_u32, // name
            le_u32, // flags
            le_u32, // attribute_count
            le_u32, // class_attribute
        )
            .parse_next(input)?;

        let attributes = repeat(attribute_count as usize, XmlAttributeElement::parse)
            .parse_next(input)?;

        Ok(XmlStartElement {
            header,
            namespace_uri,
            name,
            flags,
            attribute_count,
            class_attribute,
            attributes,
        })
    }
}

#[derive(Debug)]
pub(crate) struct XmlEndElement {
    pub(crate) header: XMLHeader,
    pub(crate) namespace_uri: u32,
    pub(crate) name: u32,
}

impl XmlElement for XmlEndElement {
    #[inline]
    fn parse(input: &mut &[u8], header: XMLHeader) -> ModalResult<Self> {
        let (namespace_uri, name) = (le_u32, le_u32).parse_next(input)?;
        Ok(XmlEndElement {
            header,
            namespace_uri,
            name,
        })
    }
}

#[derive(Debug)]
pub(crate) struct XmlCData {
    pub(crate) header: XMLHeader,
    pub(crate) data: u32,
    pub(crate) typed_data: ResourceValue,
}

impl XmlElement for XmlCData {
    #[inline]
    fn parse(input: &mut &[u8], header: XMLHeader) -> ModalResult<Self> {
        let data = le_u32(input)?;
        let typed_data = ResourceValue::parse(input)?;

        Ok(XmlCData {
            header,
            data,
            typed_data,
        })
    }
}

/// A single decoded chunk from the tagged section of the document, kept as
/// a tagged variant rather than folded into a DOM so that order-dependent
/// facts (which activity an `<action>` attaches to) can be read off the
/// sequence directly.
#[derive(Debug)]
pub enum Chunk {
    StartNamespace(XmlNamespace),
    EndNamespace(XmlNamespace),
    StartTag(XmlStartElement),
    EndTag(XmlEndElement),
    Text(XmlCData),
}
