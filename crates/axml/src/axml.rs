use std::collections::BTreeMap;

use log::warn;
use winnow::binary::{le_u16, le_u32};
use winnow::prelude::*;

use crate::errors::AXMLError;
use crate::structs::{
    Chunk, ResChunkHeader, ResourceType, StringPool, XMLHeader, XMLResourceMap, XmlCData,
    XmlElement, XmlEndElement, XmlNamespace, XmlStartElement,
};

/// Action name that marks an activity as the launcher entry point.
///
/// See: <https://developer.android.com/reference/android/content/Intent#ACTION_MAIN>
pub const MAIN_ACTION: &str = "android.intent.action.MAIN";

/// Facts extracted from a decoded `AndroidManifest.xml`.
#[derive(Debug, Default)]
pub struct ManifestFacts {
    pub package_name: String,
    pub application_class_name: String,
    pub uses_permissions: Vec<String>,
    pub activities: BTreeMap<String, bool>,
    pub chunks: Vec<Chunk>,
}

impl ManifestFacts {
    /// Activities whose `<intent-filter>` carried `android.intent.action.MAIN`.
    pub fn main_activities(&self) -> impl Iterator<Item = &str> {
        self.activities
            .iter()
            .filter(|(_, &is_main)| is_main)
            .map(|(name, _)| name.as_str())
    }
}

/// Entry point for decoding a packed binary XML document into [`ManifestFacts`].
pub struct AXML;

impl AXML {
    /// Parse a binary-XML manifest, per the file layout described in the
    /// format notes: an 8-byte file header, a string pool, a resource-ID
    /// chunk, then a stream of tagged XML chunks.
    pub fn new(input: &mut &[u8]) -> Result<ManifestFacts, AXMLError> {
        if input.len() < 8 {
            return Err(AXMLError::Truncated);
        }

        let (res_type, _header_size, _file_size) = (le_u16, le_u16, le_u32)
            .parse_next(input)
            .map_err(|_: winnow::error::ErrMode<winnow::error::ContextError>| {
                AXMLError::Truncated
            })?;

        if ResourceType::from(res_type) != ResourceType::Xml {
            return Err(AXMLError::BadResChunkType(res_type));
        }

        let string_pool = StringPool::parse(input).map_err(|_| AXMLError::Truncated)?;
        let _resource_map = XMLResourceMap::parse(input).map_err(|_| AXMLError::Truncated)?;

        Self::scan_chunks(input, &string_pool)
    }

    /// Resolve a string-pool index; an index beyond the pool resolves to the
    /// empty string rather than failing (matches loose producers in the wild).
    fn resolve(pool: &StringPool, idx: u32) -> String {
        pool.get(idx).cloned().unwrap_or_default()
    }

    /// A single linear scan over the tagged chunk stream builds both the
    /// preserved `Chunk` sequence and the derived facts in one pass, so the
    /// order-dependent "most recently seen activity" rule can be applied as
    /// each `<activity>`/`<action>` tag is read, rather than re-querying a
    /// tree afterwards.
    fn scan_chunks(
        input: &mut &[u8],
        string_pool: &StringPool,
    ) -> Result<ManifestFacts, AXMLError> {
        let mut facts = ManifestFacts::default();
        let mut last_activity = String::new();

        while !input.is_empty() {
            let chunk_header = ResChunkHeader::parse(input).map_err(|_| AXMLError::Truncated)?;

            match chunk_header.type_ {
                ResourceType::XmlStartNamespace => {
                    let header =
                        XMLHeader::parse(input, chunk_header).map_err(|_| AXMLError::Truncated)?;
                    let node = XmlNamespace::parse(input, header).map_err(|_| AXMLError::Truncated)?;
                    facts.chunks.push(Chunk::StartNamespace(node));
                }
                ResourceType::XmlEndNamespace => {
                    let header =
                        XMLHeader::parse(input, chunk_header).map_err(|_| AXMLError::Truncated)?;
                    let node = XmlNamespace::parse(input, header).map_err(|_| AXMLError::Truncated)?;
                    facts.chunks.push(Chunk::EndNamespace(node));
                }
                ResourceType::XmlStartElement => {
                    let header =
                        XMLHeader::parse(input, chunk_header).map_err(|_| AXMLError::Truncated)?;
                    let node =
                        XmlStartElement::parse(input, header).map_err(|_| AXMLError::Truncated)?;

                    let tag_name = Self::resolve(string_pool, node.name);

                    for attribute in &node.attributes {
                        let attr_name = Self::resolve(string_pool, attribute.name);
                        let attr_value = Self::resolve(string_pool, attribute.value);

                        match (tag_name.as_str(), attr_name.as_str()) {
                            ("manifest", "package") => facts.package_name = attr_value,
                            ("uses-permission", "name") => facts.uses_permissions.push(attr_value),
                            ("application", "name") => facts.application_class_name = attr_value,
                            ("activity", "name") => {
                                facts.activities.insert(attr_value.clone(), false);
                                last_activity = attr_value;
                            }
                            ("action", "name") if attr_value == MAIN_ACTION => {
                                if last_activity.is_empty() {
                                    warn!("<action> MAIN seen with no enclosing <activity>");
                                } else {
                                    facts.activities.insert(last_activity.clone(), true);
                                }
                            }
                            _ => {}
                        }
                    }

                    facts.chunks.push(Chunk::StartTag(node));
                }
                ResourceType::XmlEndElement => {
                    let header =
                        XMLHeader::parse(input, chunk_header).map_err(|_| AXMLError::Truncated)?;
                    let node =
                        XmlEndElement::parse(input, header).map_err(|_| AXMLError::Truncated)?;
                    facts.chunks.push(Chunk::EndTag(node));
                }
                ResourceType::XmlCdata => {
                    let header =
                        XMLHeader::parse(input, chunk_header).map_err(|_| AXMLError::Truncated)?;
                    let node = XmlCData::parse(input, header).map_err(|_| AXMLError::Truncated)?;
                    facts.chunks.push(Chunk::Text(node));
                }
                other => return Err(AXMLError::UnknownChunk(other.code())),
            }
        }

        Ok(facts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put_u16(buf: &mut Vec<u8>, v: u16) {
        buf.extend_from_slice(&v.to_le_bytes());
    }

    fn put_u32(buf: &mut Vec<u8>, v: u32) {
        buf.extend_from_slice(&v.to_le_bytes());
    }

    /// UTF-8 string-pool entry as this crate's `StringPool::parse_string`
    /// actually decodes it: a one-byte length (strings here are all under
    /// 0x80 bytes) followed by the raw bytes and a NUL terminator.
    fn utf8_entry(s: &str) -> Vec<u8> {
        let bytes = s.as_bytes();
        assert!(bytes.len() < 0x80);
        let mut out = vec![bytes.len() as u8, bytes.len() as u8];
        out.extend_from_slice(bytes);
        out.push(0);
        out
    }

    fn string_pool_chunk(strings: &[&str]) -> Vec<u8> {
        let mut string_data = Vec::new();
        let mut offsets = Vec::new();
        for s in strings {
            offsets.push(string_data.len() as u32);
            string_data.extend(utf8_entry(s));
        }

        let header_len = 28u32;
        let offsets_len = strings.len() as u32 * 4;
        let strings_start = header_len + offsets_len;
        let pool_size = strings_start + string_data.len() as u32;

        let mut chunk = Vec::new();
        put_u16(&mut chunk, 0x0001); // ResourceType::StringPool
        put_u16(&mut chunk, 28);
        put_u32(&mut chunk, pool_size);
        put_u32(&mut chunk, strings.len() as u32); // string_count
        put_u32(&mut chunk, 0); // style_count
        put_u32(&mut chunk, 0x100); // flags: Utf8
        put_u32(&mut chunk, strings_start);
        put_u32(&mut chunk, 0); // styles_start
        for off in offsets {
            put_u32(&mut chunk, off);
        }
        chunk.extend(string_data);
        chunk
    }

    fn resource_map_chunk() -> Vec<u8> {
        let mut chunk = Vec::new();
        put_u16(&mut chunk, 0x0180); // ResourceType::XmlResourceMap
        put_u16(&mut chunk, 8);
        put_u32(&mut chunk, 8);
        chunk
    }

    /// `size`/`header_size` on tag chunks are never consulted by
    /// `scan_chunks` (each variant's `parse` reads a fixed field layout
    /// driven by its own counts, not by the chunk's declared size), so
    /// fixtures can leave them zeroed.
    fn start_element(name_idx: u32, attrs: &[(u32, u32)]) -> Vec<u8> {
        let mut chunk = Vec::new();
        put_u16(&mut chunk, 0x0102); // ResourceType::XmlStartElement
        put_u16(&mut chunk, 0);
        put_u32(&mut chunk, 0);
        put_u32(&mut chunk, 0); // line_number
        put_u32(&mut chunk, 0); // comment
        put_u32(&mut chunk, 0xFFFFFFFF); // namespace_uri
        put_u32(&mut chunk, name_idx);
        put_u32(&mut chunk, 0); // flags
        put_u32(&mut chunk, attrs.len() as u32);
        put_u32(&mut chunk, 0); // class_attribute
        for &(name_i, value_i) in attrs {
            put_u32(&mut chunk, 0xFFFFFFFF); // namespace_uri
            put_u32(&mut chunk, name_i);
            put_u32(&mut chunk, value_i);
            put_u16(&mut chunk, 8); // typed_value.size
            chunk.push(0); // typed_value.res
            chunk.push(0); // typed_value.data_type = Null
            put_u32(&mut chunk, 0); // typed_value.data
        }
        chunk
    }

    fn end_element(name_idx: u32) -> Vec<u8> {
        let mut chunk = Vec::new();
        put_u16(&mut chunk, 0x0103); // ResourceType::XmlEndElement
        put_u16(&mut chunk, 0);
        put_u32(&mut chunk, 0);
        put_u32(&mut chunk, 0); // line_number
        put_u32(&mut chunk, 0); // comment
        put_u32(&mut chunk, 0xFFFFFFFF); // namespace_uri
        put_u32(&mut chunk, name_idx);
        chunk
    }

    /// Builds the S4 scenario fixture: a manifest declaring a package, two
    /// permissions, an application class, and two activities — one with a
    /// `MAIN` intent-filter action, one without.
    fn build_manifest_fixture() -> Vec<u8> {
        const MANIFEST: u32 = 0;
        const PACKAGE: u32 = 1;
        const COM_EX: u32 = 2;
        const USES_PERMISSION: u32 = 3;
        const NAME: u32 = 4;
        const PERM_A: u32 = 5;
        const PERM_B: u32 = 6;
        const APPLICATION: u32 = 7;
        const COM_EX_APP: u32 = 8;
        const ACTIVITY: u32 = 9;
        const COM_EX_MAIN: u32 = 10;
        const ACTION: u32 = 11;
        const MAIN_ACTION_IDX: u32 = 12;
        const COM_EX_OTHER: u32 = 13;

        let strings = [
            "manifest",
            "package",
            "com.ex",
            "uses-permission",
            "name",
            "A",
            "B",
            "application",
            "com.ex.App",
            "activity",
            "com.ex.Main",
            "action",
            MAIN_ACTION,
            "com.ex.Other",
        ];

        let mut data = Vec::new();
        put_u16(&mut data, 0x0003); // ResourceType::Xml
        put_u16(&mut data, 8);
        put_u32(&mut data, 0);

        data.extend(string_pool_chunk(&strings));
        data.extend(resource_map_chunk());

        data.extend(start_element(MANIFEST, &[(PACKAGE, COM_EX)]));
        data.extend(start_element(USES_PERMISSION, &[(NAME, PERM_A)]));
        data.extend(end_element(USES_PERMISSION));
        data.extend(start_element(USES_PERMISSION, &[(NAME, PERM_B)]));
        data.extend(end_element(USES_PERMISSION));
        data.extend(start_element(APPLICATION, &[(NAME, COM_EX_APP)]));
        data.extend(end_element(APPLICATION));
        data.extend(start_element(ACTIVITY, &[(NAME, COM_EX_MAIN)]));
        data.extend(start_element(ACTION, &[(NAME, MAIN_ACTION_IDX)]));
        data.extend(end_element(ACTION));
        data.extend(end_element(ACTIVITY));
        data.extend(start_element(ACTIVITY, &[(NAME, COM_EX_OTHER)]));
        data.extend(end_element(ACTIVITY));

        data
    }

    #[test]
    fn decodes_manifest_facts() {
        let fixture = build_manifest_fixture();
        let facts = AXML::new(&mut &fixture[..]).expect("well-formed fixture should parse");

        assert_eq!(facts.package_name, "com.ex");
        assert_eq!(facts.application_class_name, "com.ex.App");
        assert_eq!(facts.uses_permissions, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(facts.activities.get("com.ex.Main"), Some(&true));
        assert_eq!(facts.activities.get("com.ex.Other"), Some(&false));
        assert_eq!(facts.main_activities().collect::<Vec<_>>(), ["com.ex.Main"]);
    }

    #[test]
    fn rejects_non_xml_chunk_type() {
        let mut data = Vec::new();
        put_u16(&mut data, 0x0002); // ResourceType::Table, not Xml
        put_u16(&mut data, 8);
        put_u32(&mut data, 0);

        let result = AXML::new(&mut &data[..]);
        assert!(matches!(result, Err(AXMLError::BadResChunkType(0x0002))));
    }
}
