use std::borrow::Cow;
use std::sync::Arc;

use bitflags::bitflags;
use log::warn;
use winnow::binary::{le_u16, le_u32, u8};
use winnow::combinator::repeat;
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::take;

use crate::avm::Avm;
use crate::errors::DexError;

/// The constant is used to indicate the endiannes of the file in which it is found.
///
/// This constant means - little-endian.
///
/// See: <https://source.android.com/docs/core/runtime/dex-format#endian-constant>
pub const ENDIAN_CONSTANT: u32 = 0x12345678;

/// The constant is used to indicate the endiannes of the file in which it is found.
///
/// This constant means - big-endian.
///
/// See: <https://source.android.com/docs/core/runtime/dex-format#endian-constant>
pub const REVERSE_ENDIAN_CONSTANT: u32 = 0x78563412;

/// The constant is used to indicate that an index value is absent.
///
/// See: <https://source.android.com/docs/core/runtime/dex-format#no-index>
pub const NO_INDEX: u32 = u32::MAX;

/// A loaded (and, once [`Dex::verify`] succeeds, indexed) DEX file.
///
/// `data` holds the entire file verbatim; every offset recorded elsewhere on
/// this struct is an absolute index into it rather than one relative to a
/// separately-sliced body, which keeps the lookup code free of per-call
/// header-size arithmetic.
#[derive(Debug)]
pub struct Dex {
    /// Origin path, kept for diagnostics only.
    pub file_name: String,

    data: Vec<u8>,

    /// Information about dex header
    pub header: DexHeader,

    /// `true` once [`Dex::verify`] has run to completion without error.
    pub valid: bool,

    /// Dex strings
    pub string_ids: Vec<u32>,

    /// Dex types
    pub type_ids: Vec<u32>,

    /// Dex prototype items
    pub proto_ids: Vec<ProtoItem>,

    /// Dex field items
    pub field_ids: Vec<FieldItem>,

    /// Dex method items
    pub method_ids: Vec<MethodItem>,

    /// Dex class items
    pub class_defs: Vec<ClassItem>,

    /// Dex map list
    pub map_list: Vec<MapItem>,
}

impl Dex {
    /// Read a dex file's header into memory. Mirrors the DEX loader
    /// component: it retains the raw bytes and parses the fixed-width
    /// header, but performs no validation — call [`Dex::verify`] for that.
    pub fn load(file_name: impl Into<String>, data: Vec<u8>) -> Result<Dex, DexError> {
        let input = &mut &data[..];

        let header = Self::parse_dex_header(input)?;

        Ok(Dex {
            file_name: file_name.into(),
            data,
            header,
            valid: false,
            string_ids: Vec::new(),
            type_ids: Vec::new(),
            proto_ids: Vec::new(),
            field_ids: Vec::new(),
            method_ids: Vec::new(),
            class_defs: Vec::new(),
            map_list: Vec::new(),
        })
    }

    /// Load and immediately verify a dex file.
    pub fn open(file_name: impl Into<String>, data: Vec<u8>) -> Result<Dex, DexError> {
        let mut dex = Self::load(file_name, data)?;
        dex.verify()?;
        Ok(dex)
    }

    fn parse_dex_header(input: &mut &[u8]) -> Result<DexHeader, DexError> {
        let magic: [u8; 4] = take(4usize)
            .parse_next(input)
            .map_err(|_: ErrMode<ContextError>| DexError::Truncated)?
            .try_into()
            .map_err(|_| DexError::Truncated)?;

        let version: [u8; 4] = take(4usize)
            .parse_next(input)
            .map_err(|_: ErrMode<ContextError>| DexError::Truncated)?
            .try_into()
            .map_err(|_| DexError::Truncated)?;

        let (
            checksum,
            signature,
            file_size,
            header_size,
            endian_tag,
            link_size,
            link_off,
            map_off,
            string_ids_size,
            string_ids_off,
            type_ids_size,
            type_ids_off,
            proto_ids_size,
            proto_ids_off,
            field_ids_size,
            field_ids_off,
            method_ids_size,
            method_ids_off,
            class_defs_size,
            class_defs_off,
            data_size,
            data_off,
        ) = (
            le_u32,                       // checksum
            take(20usize).map(Arc::from), // signature
            le_u32,                       // file_size
            le_u32,                       // header_size
            le_u32,                       // endian_tag
            le_u32,                       // link_size
            le_u32,                       // link_off
            le_u32,                       // map_off
            le_u32,                       // string_ids_size
            le_u32,                       // string_ids_off
            le_u32,                       // type_ids_size
            le_u32,                       // type_ids_off
            le_u32,                       // proto_ids_size
            le_u32,                       // proto_ids_off
            le_u32,                       // field_ids_size
            le_u32,                       // field_ids_off
            le_u32,                       // method_ids_size
            le_u32,                       // method_ids_off
            le_u32,                       // class_defs_size
            le_u32,                       // class_defs_off
            le_u32,                       // data_size
            le_u32,                       // data_off
        )
            .parse_next(input)
            .map_err(|_: ErrMode<ContextError>| DexError::Truncated)?;

        Ok(DexHeader {
            magic,
            version,
            checksum,
            signature,
            file_size,
            header_size,
            endian_tag,
            link_size,
            link_off,
            map_off,
            string_ids_size,
            string_ids_off,
            type_ids_size,
            type_ids_off,
            proto_ids_size,
            proto_ids_off,
            field_ids_size,
            field_ids_off,
            method_ids_size,
            method_ids_off,
            class_defs_size,
            class_defs_off,
            data_size,
            data_off,
        })
    }

    /// Run the ordered verification steps; the first failure short-circuits
    /// the rest. On success, populates the index arrays and marks the image
    /// `valid`.
    pub fn verify(&mut self) -> Result<(), DexError> {
        self.check_magic()?;
        self.check_version()?;
        self.check_checksum()?;
        self.check_endian()?;
        self.check_sections()?;

        let input = &mut &self.data[self.header.map_off as usize..];
        self.map_list = Self::parse_map_list(input)?;

        self.string_ids = self.parse_u32_array(self.header.string_ids_off, self.header.string_ids_size)?;
        self.type_ids = self.parse_u32_array(self.header.type_ids_off, self.header.type_ids_size)?;

        self.proto_ids = {
            let input = &mut self
                .data
                .get(self.header.proto_ids_off as usize..)
                .ok_or(DexError::BadOffset("proto_ids"))?;
            repeat(self.header.proto_ids_size as usize, ProtoItem::parse)
                .parse_next(input)
                .map_err(|_: ErrMode<ContextError>| DexError::Truncated)?
        };

        self.field_ids = {
            let input = &mut self
                .data
                .get(self.header.field_ids_off as usize..)
                .ok_or(DexError::BadOffset("field_ids"))?;
            repeat(self.header.field_ids_size as usize, FieldItem::parse)
                .parse_next(input)
                .map_err(|_: ErrMode<ContextError>| DexError::Truncated)?
        };

        self.method_ids = {
            let input = &mut self
                .data
                .get(self.header.method_ids_off as usize..)
                .ok_or(DexError::BadOffset("method_ids"))?;
            repeat(self.header.method_ids_size as usize, MethodItem::parse)
                .parse_next(input)
                .map_err(|_: ErrMode<ContextError>| DexError::Truncated)?
        };

        self.class_defs = {
            let input = &mut self
                .data
                .get(self.header.class_defs_off as usize..)
                .ok_or(DexError::BadOffset("class_defs"))?;
            repeat(self.header.class_defs_size as usize, ClassItem::parse)
                .parse_next(input)
                .map_err(|_: ErrMode<ContextError>| DexError::Truncated)?
        };

        self.valid = true;
        Ok(())
    }

    fn check_magic(&self) -> Result<(), DexError> {
        match &self.header.magic {
            b"dex\n" | b"cdex" => Ok(()),
            other => Err(DexError::BadMagic(*other)),
        }
    }

    fn check_version(&self) -> Result<(), DexError> {
        match &self.header.version {
            b"035\0" | b"037\0" | b"038\0" | b"039\0" | b"001\0" => Ok(()),
            other => Err(DexError::BadVersion(*other)),
        }
    }

    /// Adler-32 over `bytes[12..]` — the whole file past the
    /// `magic|version|checksum` prefix — rather than reconstructing the
    /// header field-by-field; both views agree given the fixed layout.
    fn check_checksum(&self) -> Result<(), DexError> {
        let actual = simd_adler32::adler32(&self.data[12..]);
        if actual != self.header.checksum {
            return Err(DexError::BadChecksum {
                expected: self.header.checksum,
                actual,
            });
        }
        Ok(())
    }

    fn check_endian(&self) -> Result<(), DexError> {
        if self.header.endian_tag != ENDIAN_CONSTANT {
            return Err(DexError::BadEndian(self.header.endian_tag));
        }
        Ok(())
    }

    fn check_sections(&self) -> Result<(), DexError> {
        self.check_offset_size(self.header.link_size, self.header.link_off, 0, "link")?;
        self.check_offset_size(self.map_size_hint(), self.header.map_off, 4, "map")?;
        self.check_offset_size(
            self.header.string_ids_size,
            self.header.string_ids_off,
            4,
            "string-ids",
        )?;
        self.check_offset_size(
            self.header.type_ids_size,
            self.header.type_ids_off,
            4,
            "type-ids",
        )?;
        self.check_offset_size(self.header.data_size, self.header.data_off, 0, "data")?;

        Ok(())
    }

    /// The map list carries its own size prefix rather than a header field;
    /// `check_offset_size` only needs to know whether the section is present.
    fn map_size_hint(&self) -> u32 {
        if self.header.map_off == 0 { 0 } else { 1 }
    }

    fn check_offset_size(
        &self,
        size: u32,
        offset: u32,
        alignment: u32,
        label: &'static str,
    ) -> Result<(), DexError> {
        if size == 0 {
            if offset != 0 {
                return Err(DexError::BadOffset(label));
            }
            return Ok(());
        }

        if offset >= self.header.file_size {
            return Err(DexError::BadOffset(label));
        }

        if alignment != 0 && offset % alignment != 0 {
            return Err(DexError::BadOffset(label));
        }

        Ok(())
    }

    fn parse_map_list(input: &mut &[u8]) -> Result<Vec<MapItem>, DexError> {
        let size = le_u32
            .parse_next(input)
            .map_err(|_: ErrMode<ContextError>| DexError::Truncated)?;

        repeat(size as usize, MapItem::parse)
            .parse_next(input)
            .map_err(|_: ErrMode<ContextError>| DexError::Truncated)
    }

    fn parse_u32_array(&self, offset: u32, size: u32) -> Result<Vec<u32>, DexError> {
        let input = &mut self
            .data
            .get(offset as usize..)
            .ok_or(DexError::BadOffset("index array"))?;
        repeat(size as usize, le_u32)
            .parse_next(input)
            .map_err(|_: ErrMode<ContextError>| DexError::Truncated)
    }

    /// String data at absolute file offset `o`: a ULEB128-encoded UTF-16
    /// length, then up to that many bytes, truncated at the first NUL.
    /// Treated as already-valid text — no full MUTF-8 transcoding here.
    pub fn get_string(&self, idx: usize) -> Option<Cow<'_, str>> {
        let offset = *self.string_ids.get(idx)? as usize;
        let mut data = self.data.get(offset..)?;

        let (utf16len, consumed) = Self::uleb128(&mut data).ok()?;
        if consumed > 3 {
            return None;
        }

        let bytes = take::<usize, &[u8], ContextError>(utf16len as usize)
            .parse_next(&mut data)
            .ok()?;

        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());

        Some(simd_cesu8::mutf8::decode_lossy(&bytes[..end]))
    }

    #[inline]
    pub(crate) fn uleb128(input: &mut &[u8]) -> ModalResult<(u64, usize)> {
        let mut val = 0u64;
        let mut shift = 0u32;
        let mut consumed = 0usize;

        loop {
            let byte = u8.parse_next(input)?;
            consumed += 1;
            let b = (byte & 0x7f) as u64;
            val |= b
                .checked_shl(shift)
                .ok_or(ErrMode::Cut(ContextError::new()))?;

            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
        }

        Ok((val, consumed))
    }

    #[inline]
    pub fn get_type(&self, idx: usize) -> Option<Cow<'_, str>> {
        let idx = *self.type_ids.get(idx)?;
        self.get_string(idx as usize)
    }

    /// `a.b.C` → `"La/b/C;"`.
    pub fn to_descriptor(dotted_name: &str) -> String {
        format!("L{};", dotted_name.replace('.', "/"))
    }

    /// Scan `class_defs` for the class whose descriptor matches `full_name`
    /// (given in dotted form, e.g. `com.ex.App`).
    pub fn find_class_def(&self, full_name: &str) -> Result<&ClassItem, DexError> {
        let descriptor = Self::to_descriptor(full_name);

        self.class_defs
            .iter()
            .find(|class_def| {
                class_def
                    .get_name(self)
                    .is_some_and(|name| name == descriptor)
            })
            .ok_or(DexError::NotFound)
    }

    /// Scan `method_ids` for an entry with matching `class_idx` and resolved
    /// name; returns the method's index *in `method_ids`*.
    pub fn find_method_id(&self, method_name: &str, class_idx: u32) -> Result<u32, DexError> {
        self.method_ids
            .iter()
            .enumerate()
            .find(|(_, method)| {
                method.class_idx as u32 == class_idx
                    && method
                        .get_name(self)
                        .is_some_and(|name| name == method_name)
            })
            .map(|(idx, _)| idx as u32)
            .ok_or(DexError::NotFound)
    }

    /// Parse the `ClassDataItem` attached to `class_def`, if any.
    pub fn class_data(&self, class_def: &ClassItem) -> Result<ClassDataItem, DexError> {
        if class_def.class_data_off == 0 {
            return Ok(ClassDataItem::default());
        }

        let input = &mut self
            .data
            .get(class_def.class_data_off as usize..)
            .ok_or(DexError::BadOffset("class_data"))?;

        ClassDataItem::parse(input)
    }

    /// Search `class_def`'s direct and virtual methods for `method_idx`,
    /// then parse the code item at its `code_off`.
    pub fn read_method_code(
        &self,
        class_def: &ClassItem,
        method_idx: u32,
    ) -> Result<CodeItem, DexError> {
        let class_data = self.class_data(class_def)?;

        let code_off = class_data
            .direct_methods
            .iter()
            .chain(class_data.virtual_methods.iter())
            .find(|m| m.method_idx == method_idx)
            .map(|m| m.code_off)
            .ok_or(DexError::NotFound)?;

        if code_off == 0 {
            return Err(DexError::NotFound);
        }

        let input = &mut self
            .data
            .get(code_off as usize..)
            .ok_or(DexError::BadOffset("code_item"))?;

        CodeItem::parse(input)
    }

    /// Convenience: locate `class_name::method_name` and run its code item
    /// to completion on a fresh [`Avm`], returning the interpreter's final
    /// printed value (if a return was reached).
    pub fn run_method(
        &self,
        class_name: &str,
        method_name: &str,
    ) -> Result<Option<i64>, DexError> {
        let class_def = self.find_class_def(class_name)?;
        let method_idx = self.find_method_id(method_name, class_def.class_idx)?;
        let code_item = self.read_method_code(class_def, method_idx)?;

        let mut avm = Avm::new();
        Ok(avm.run(&code_item.insns))
    }
}

/// Abstraction over dex header
///
/// See: <https://source.android.com/docs/core/runtime/dex-format#header-item>
#[derive(Debug, Clone)]
pub struct DexHeader {
    /// Raw magic bytes: `"dex\n"` or `"cdex"`.
    pub magic: [u8; 4],

    /// Raw version quartet, e.g. `"035\0"`.
    pub version: [u8; 4],

    /// Adler32 checksum of the file
    ///
    /// Used to detect file corruption
    pub checksum: u32,

    /// SHA-1 signature of the file
    ///
    /// Used to uniquely identify files
    pub signature: Arc<[u8]>,

    /// Size of the entire file (including the header) in bytes
    pub file_size: u32,

    /// Size of the header (this entire section) in bytes
    pub header_size: u32,

    /// Endiannes tag - [ENDIAN_CONSTANT] or [REVERSE_ENDIAN_CONSTANT]
    pub endian_tag: u32,

    /// Size of the link section
    ///
    /// 0 - if this file isn't statically linked
    pub link_size: u32,

    /// Offset from the start of the file to the link section
    ///
    /// 0 - if `link_size == 0`
    pub link_off: u32,

    /// Offset from the start of the file to the map item
    pub map_off: u32,

    /// Count of strings in the string identifiers list
    pub string_ids_size: u32,

    /// Offset from the start of the file to the string identifiers list
    ///
    /// 0 - if `string_ids_size == 0`
    pub string_ids_off: u32,

    /// Count of elements in the type identifiers list, at most 65535
    pub type_ids_size: u32,

    /// Offset from the start of the file to the type identifiers list
    ///
    /// 0 - if `type_ids_size == 0`
    pub type_ids_off: u32,

    /// Count of elements in the prototype identifiers list, at most 65535
    pub proto_ids_size: u32,

    /// Offset from the start of the file to the prototype identifiers list
    ///
    /// 0 - if `proto_ids_size == 0`
    pub proto_ids_off: u32,

    /// Count of elements in the field identifiers list
    pub field_ids_size: u32,

    /// Offset from the start of the file to the field identifiers list
    ///
    /// 0 - if `field_ids_size == 0`
    pub field_ids_off: u32,

    /// Count of elements in the method identifiers list
    pub method_ids_size: u32,

    /// Offset from the start of the file to the method identifiers list
    ///
    /// 0 - if `method_ids_size == 0`
    pub method_ids_off: u32,

    /// Count of elements in the class definitions list
    pub class_defs_size: u32,

    /// Offset from the start of the file to the class definitions list
    ///
    /// 0 - if `class_defs_size == 0`
    pub class_defs_off: u32,

    /// Size of `data` section in bytes.
    ///
    /// Must be an even multiple of sizeof(uint)
    pub data_size: u32,

    /// Offset from the start of the file to the start of the `data` section
    ///
    /// Must be an even multiple of sizeof(uint)
    pub data_off: u32,
}

/// Abstraction over `proto_id_item`
///
/// See: <https://source.android.com/docs/core/runtime/dex-format#proto-id-item>
#[derive(Debug)]
pub struct ProtoItem {
    /// Index into the [Dex::string_ids] list for the short-form descriptor string of this prototype
    pub shorty_idx: u32,

    /// Index into the [Dex::type_ids] list for the return type of this prototype
    pub return_type_idx: u32,

    /// Offset from the start of the file to the list of parameter types for this prototype
    ///
    /// 0 - if this prototype has no parameters
    pub parameters_off: u32,
}

impl ProtoItem {
    #[inline]
    fn parse(input: &mut &[u8]) -> ModalResult<ProtoItem> {
        (le_u32, le_u32, le_u32)
            .map(|(shorty_idx, return_type_idx, parameters_off)| ProtoItem {
                shorty_idx,
                return_type_idx,
                parameters_off,
            })
            .parse_next(input)
    }

    pub fn view<'a>(&'a self, dex: &'a Dex) -> ProtoView<'a> {
        ProtoView { proto: self, dex }
    }
}

/// Nice way to access fields from [ProtoItem]
pub struct ProtoView<'a> {
    proto: &'a ProtoItem,
    dex: &'a Dex,
}

impl<'a> ProtoView<'a> {
    /// Get descriptor of this prototype from strings pool
    #[inline]
    pub fn descriptor(&self) -> Option<Cow<'_, str>> {
        self.dex.get_string(self.proto.shorty_idx as usize)
    }

    /// Get return type of this prototype from types pool
    pub fn return_type(&self) -> Option<Cow<'_, str>> {
        self.dex.get_type(self.proto.return_type_idx as usize)
    }
}

/// Abstraction over `field_id_item`
///
/// See: <https://source.android.com/docs/core/runtime/dex-format#field-id-item>
#[derive(Debug)]
pub struct FieldItem {
    /// Index into the [Dex::type_ids] list for the definer of this field
    pub class_idx: u16,

    /// Index into the [Dex::type_ids] list for the type of this field
    pub type_idx: u16,

    /// Index into the [Dex::string_ids] list for the name of this field
    pub name_idx: u32,
}

impl FieldItem {
    #[inline]
    fn parse(input: &mut &[u8]) -> ModalResult<FieldItem> {
        (le_u16, le_u16, le_u32)
            .map(|(class_idx, type_idx, name_idx)| FieldItem {
                class_idx,
                type_idx,
                name_idx,
            })
            .parse_next(input)
    }

    /// Get field class
    #[inline]
    pub fn get_class<'a>(&'a self, dex: &'a Dex) -> Option<Cow<'a, str>> {
        dex.get_type(self.class_idx as usize)
    }

    /// Get field type
    #[inline]
    pub fn get_type<'a>(&'a self, dex: &'a Dex) -> Option<Cow<'a, str>> {
        dex.get_type(self.type_idx as usize)
    }

    /// Get field name
    #[inline]
    pub fn get_name<'a>(&'a self, dex: &'a Dex) -> Option<Cow<'a, str>> {
        dex.get_string(self.name_idx as usize)
    }
}

/// Abstraction over `method_id_item`
///
/// See: <https://source.android.com/docs/core/runtime/dex-format#method-id-item>
#[derive(Debug)]
pub struct MethodItem {
    /// Index into the [Dex::type_ids] list for the definer of this method
    pub class_idx: u16,

    /// Index into the [Dex::proto_ids] list for the prototype of this method
    pub proto_idx: u16,

    /// Index into the [Dex::string_ids] list for the name of this method
    pub name_idx: u32,
}

impl MethodItem {
    #[inline]
    fn parse(input: &mut &[u8]) -> ModalResult<MethodItem> {
        (le_u16, le_u16, le_u32)
            .map(|(class_idx, proto_idx, name_idx)| MethodItem {
                class_idx,
                proto_idx,
                name_idx,
            })
            .parse_next(input)
    }

    /// Get method class name
    #[inline]
    pub fn get_class<'a>(&'a self, dex: &'a Dex) -> Option<Cow<'a, str>> {
        dex.get_type(self.class_idx as usize)
    }

    /// Get method prototype
    #[inline]
    pub fn get_prototype<'a>(&'a self, dex: &'a Dex) -> Option<&'a ProtoItem> {
        dex.proto_ids.get(self.proto_idx as usize)
    }

    /// Get method name
    #[inline]
    pub fn get_name<'a>(&'a self, dex: &'a Dex) -> Option<Cow<'a, str>> {
        dex.get_string(self.name_idx as usize)
    }
}

/// Abstraction over `class_def_item`
///
/// See: <https://source.android.com/docs/core/runtime/dex-format#class-def-item>
#[derive(Debug)]
pub struct ClassItem {
    /// Index into the [Dex::type_ids] list for this class
    pub class_idx: u32,

    /// Access flags for the class
    pub access_flags: AccessFlags,

    /// Index into the [Dex::type_ids] list for the superclass
    ///
    /// [NO_INDEX] - if this class has no superclass  (i.e., it is a root class such as `Object`)
    pub superclass_idx: u32,

    /// Offset from the start of the file to the list of interfaces
    ///
    /// `0` - if there are none
    pub interfaces_off: u32,

    /// Index into the [Dex::string_ids] list for the name of the file containing
    /// the original source for (at least most of) this class
    ///
    /// [NO_INDEX] - lack of this information
    pub source_file_idx: u32,

    /// Offset from the start of the file to the annotations structure for this class
    ///
    /// `0` - if there are no annotations on this class
    pub annotations_off: u32,

    /// Offset from the start of the file to the associated class data for this item
    ///
    /// `0` - if there is no class data for this class
    pub class_data_off: u32,

    /// Offset from the start of the file to the list of initial values for `static` fields
    ///
    /// `0` - if there are none (and all `static` fields are to be initialized with `0` or `null`)
    pub static_values_off: u32,
}

impl ClassItem {
    /// 32 bytes: `classIdx:u16, pad1:u16, accessFlags:u32, superclassIdx:u16,
    /// pad2:u16, interfacesOff:u32, sourceFileIdx:u32, annotationsOff:u32,
    /// classDataOff:u32, staticValuesOff:u32`.
    #[inline]
    fn parse(input: &mut &[u8]) -> ModalResult<ClassItem> {
        (
            le_u16, // class_idx
            le_u16, // pad1
            le_u32.map(AccessFlags::from_bits_truncate), // access_flags
            le_u16, // superclass_idx
            le_u16, // pad2
            le_u32, // interfaces_off
            le_u32, // source_file_idx
            le_u32, // annotations_off
            le_u32, // class_data_off
            le_u32, // static_values_off
        )
            .map(
                |(
                    class_idx,
                    _pad1,
                    access_flags,
                    superclass_idx,
                    _pad2,
                    interfaces_off,
                    source_file_idx,
                    annotations_off,
                    class_data_off,
                    static_values_off,
                )| ClassItem {
                    class_idx: class_idx as u32,
                    access_flags,
                    superclass_idx: if superclass_idx == 0xFFFF {
                        NO_INDEX
                    } else {
                        superclass_idx as u32
                    },
                    interfaces_off,
                    source_file_idx,
                    annotations_off,
                    class_data_off,
                    static_values_off,
                },
            )
            .parse_next(input)
    }

    /// Get class name
    #[inline]
    pub fn get_name<'a>(&'a self, dex: &'a Dex) -> Option<Cow<'a, str>> {
        dex.get_type(self.class_idx as usize)
    }

    /// Get superclass for this class
    #[inline]
    pub fn get_superclass<'a>(&'a self, dex: &'a Dex) -> Option<Cow<'a, str>> {
        if self.superclass_idx == NO_INDEX {
            return None;
        }

        dex.get_type(self.superclass_idx as usize)
    }

    /// Get source file for this class
    #[inline]
    pub fn get_source_file<'a>(&'a self, dex: &'a Dex) -> Option<Cow<'a, str>> {
        if self.source_file_idx == NO_INDEX {
            return None;
        }

        dex.get_string(self.source_file_idx as usize)
    }
}

bitflags! {
    /// Represents the access flags used in Android class files for classes, fields, and methods.
    ///
    /// Each flag corresponds to a bitmask defined by the Android/Java class file format.
    ///
    /// See: <https://source.android.com/docs/core/runtime/dex-format#access-flags>
    #[derive(Debug, Clone, Copy)]
    pub struct AccessFlags: u32 {
        /// `ACC_PUBLIC (0x0001)`: Visible everywhere for classes, fields, and methods.
        const PUBLIC = 0x0001;

        /// `ACC_PRIVATE (0x0002)`: Visible only to the defining class.
        const PRIVATE = 0x0002;

        /// `ACC_PROTECTED (0x0004)`: Visible to the package and subclasses.
        const PROTECTED = 0x0004;

        /// `ACC_STATIC (0x0008)`: Static modifier.
        /// * For classes: not constructed with an outer `this`.
        /// * For fields: global to the defining class.
        /// * For methods: does not take a `this` argument.
        const STATIC = 0x0008;

        /// `ACC_FINAL (0x0010)`: Final modifier.
        /// * For classes: not subclassable.
        /// * For fields: immutable after construction.
        /// * For methods: not overridable.
        const FINAL = 0x0010;

        /// `ACC_SYNCHRONIZED (0x0020)`: For methods only.
        /// A lock is automatically acquired around the method call.
        /// Note: May only be set when `ACC_NATIVE` is also set.
        const SYNCHRONIZED = 0x0020;

        /// `ACC_VOLATILE (0x0040)`: For fields only.
        /// Field uses special access rules for thread safety.
        const VOLATILE = 0x0040;

        /// `ACC_BRIDGE (0x0040)`: For methods only.
        /// Marks a bridge method generated by the compiler.
        const BRIDGE = 0x0040;

        /// `ACC_TRANSIENT (0x0080)`: For fields only.
        /// Field is not saved by default serialization.
        const TRANSIENT = 0x0080;

        /// `ACC_VARARGS (0x0080)`: For methods only.
        /// Last argument is a varargs (rest argument).
        const VARARGS = 0x0080;

        /// `ACC_NATIVE (0x0100)`: For methods only.
        /// Method is implemented in native code.
        const NATIVE = 0x0100;

        /// `ACC_INTERFACE (0x0200)`: Class is an interface.
        const INTERFACE = 0x0200;

        /// `ACC_ABSTRACT (0x0400)`:
        /// * For classes: not directly instantiable.
        /// * For methods: unimplemented.
        const ABSTRACT = 0x0400;

        /// `ACC_STRICT (0x0800)`: For methods only.
        /// Enforces strict floating-point rules (`strictfp`).
        const STRICT = 0x0800;

        /// `ACC_SYNTHETIC (0x1000)`: Not directly defined in source code (compiler generated).
        const SYNTHETIC = 0x1000;

        /// `ACC_ANNOTATION (0x2000)`: Declares an annotation class.
        const ANNOTATION = 0x2000;

        /// `ACC_ENUM (0x4000)`: Enum type or enum field.
        const ENUM = 0x4000;

        /// Unused in current specification.
        const UNUSED = 0x8000;

        /// `ACC_CONSTRUCTOR (0x10000)`: Marks a constructor or initializer method.
        const CONSTRUCTOR = 0x10000;

        /// `ACC_DECLARED_SYNCHRONIZED (0x20000)`: Indicates explicitly declared synchronized.
        const DECLARED_SYNCHRONIZED = 0x20000;
    }
}

impl AccessFlags {
    /// Returns `true` if the flag set indicates this is a public member.
    #[inline]
    pub fn is_public(self) -> bool {
        self.contains(Self::PUBLIC)
    }

    /// Returns `true` if the flag set indicates a private member.
    #[inline]
    pub fn is_private(self) -> bool {
        self.contains(Self::PRIVATE)
    }

    /// Returns `true` if the flag set indicates a protected member.
    #[inline]
    pub fn is_protected(self) -> bool {
        self.contains(Self::PROTECTED)
    }

    /// Returns `true` if the flag set includes the static modifier.
    #[inline]
    pub fn is_static(self) -> bool {
        self.contains(Self::STATIC)
    }

    /// Returns `true` if the flag set marks this as final.
    #[inline]
    pub fn is_final(self) -> bool {
        self.contains(Self::FINAL)
    }

    /// Returns `true` if the flag set indicates a synchronized method.
    #[inline]
    pub fn is_synchronized(self) -> bool {
        self.contains(Self::SYNCHRONIZED)
    }

    /// Returns `true` if the flag set marks a volatile field.
    #[inline]
    pub fn is_volatile(self) -> bool {
        self.contains(Self::VOLATILE)
    }

    /// Returns `true` if the flag set marks a bridge method.
    #[inline]
    pub fn is_bridge(self) -> bool {
        self.contains(Self::BRIDGE)
    }

    /// Returns `true` if the flag set marks a transient field.
    #[inline]
    pub fn is_transient(self) -> bool {
        self.contains(Self::TRANSIENT)
    }

    /// Returns `true` if the flag set marks a varargs method.
    #[inline]
    pub fn is_varargs(self) -> bool {
        self.contains(Self::VARARGS)
    }

    /// Returns `true` if this is a native method.
    #[inline]
    pub fn is_native(self) -> bool {
        self.contains(Self::NATIVE)
    }

    /// Returns `true` if this class is an interface.
    #[inline]
    pub fn is_interface(self) -> bool {
        self.contains(Self::INTERFACE)
    }

    /// Returns `true` if this member is abstract.
    #[inline]
    pub fn is_abstract(self) -> bool {
        self.contains(Self::ABSTRACT)
    }

    /// Returns `true` if this method uses strict floating-point rules.
    #[inline]
    pub fn is_strict(self) -> bool {
        self.contains(Self::STRICT)
    }

    /// Returns `true` if the member is synthetic.
    #[inline]
    pub fn is_synthetic(self) -> bool {
        self.contains(Self::SYNTHETIC)
    }

    /// Returns `true` if the type is an annotation class.
    #[inline]
    pub fn is_annotation(self) -> bool {
        self.contains(Self::ANNOTATION)
    }

    /// Returns `true` if the type or field is an enum.
    #[inline]
    pub fn is_enum(self) -> bool {
        self.contains(Self::ENUM)
    }

    /// Returns `true` if the method is a constructor.
    #[inline]
    pub fn is_constructor(self) -> bool {
        self.contains(Self::CONSTRUCTOR)
    }

    /// Returns `true` if the method is declared synchronized.
    #[inline]
    pub fn is_declared_synchronized(self) -> bool {
        self.contains(Self::DECLARED_SYNCHRONIZED)
    }
}

impl std::fmt::Display for AccessFlags {
    /// Renders the set flags as `[public static]`, or `default` when none are
    /// set. Mirrors the Go original's `GetClassAccessString`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names = Vec::new();
        if self.is_public() {
            names.push("public");
        }
        if self.is_private() {
            names.push("private");
        }
        if self.is_protected() {
            names.push("protected");
        }
        if self.is_static() {
            names.push("static");
        }
        if self.is_final() {
            names.push("final");
        }
        if self.is_synchronized() {
            names.push("synchronized");
        }
        if self.is_volatile() {
            names.push("volatile");
        }
        if self.is_transient() {
            names.push("transient");
        }
        if self.is_interface() {
            names.push("interface");
        }
        if self.is_abstract() {
            names.push("abstract");
        }

        if names.is_empty() {
            return write!(f, "default");
        }

        write!(f, "[{}]", names.join(" "))
    }
}

/// Abstraction over `MapItem`
///
/// See: <https://source.android.com/docs/core/runtime/dex-format#map-item>
#[derive(Debug)]
pub struct MapItem {
    /// Type of the items
    pub type_: ItemType,

    /// Unused field
    pub unused: u16,

    /// Count of the number of items to be found at the indicated offset
    pub size: u32,

    /// Offset from the start of the file to the items in question
    pub offset: u32,
}

impl MapItem {
    fn parse(input: &mut &[u8]) -> ModalResult<MapItem> {
        (le_u16.try_map(ItemType::try_from), le_u16, le_u32, le_u32)
            .map(|(type_, unused, size, offset)| MapItem {
                type_,
                unused,
                size,
                offset,
            })
            .parse_next(input)
    }
}

/// DEX item types
///
/// See: <https://source.android.com/docs/core/runtime/dex-format#type-codes>
#[repr(u16)]
#[derive(Debug, PartialEq, Eq)]
pub enum ItemType {
    /// `TYPE_HEADER_ITEM (0x0000)`: Size = 0x70 bytes
    HeaderItem = 0x0000,

    /// `TYPE_STRING_ID_ITEM (0x0001)`: Size = 0x04 bytes
    StringIdItem = 0x0001,

    /// `TYPE_TYPE_ID_ITEM (0x0002)`: Size = 0x04 bytes
    TypeIdItem = 0x0002,

    /// `TYPE_PROTO_ID_ITEM (0x0003)`: Size = 0x0c bytes
    ProtoIdItem = 0x0003,

    /// `TYPE_FIELD_ID_ITEM (0x0004)`: Size = 0x08 bytes
    FieldIdItem = 0x0004,

    /// `TYPE_METHOD_ID_ITEM (0x0005)`: Size = 0x08 bytes
    MethodIdItem = 0x0005,

    /// `TYPE_CLASS_DEF_ITEM (0x0006)`: Size = 0x20 bytes
    ClassDefItem = 0x0006,

    /// `TYPE_CALL_SITE_ID_ITEM (0x0007)`: Size = 0x04 bytes
    CallSiteIdItem = 0x0007,

    /// `TYPE_METHOD_HANDLE_ITEM (0x0008)`: Size = 0x08 bytes
    MethodHandleItem = 0x0008,

    /// `TYPE_MAP_LIST (0x1000)`: Size = 4 + (item.size * 12)
    MapList = 0x1000,

    /// `TYPE_TYPE_LIST (0x1001)`: Size = 4 + (item.size * 2)
    TypeList = 0x1001,

    /// `TYPE_ANNOTATION_SET_REF_LIST (0x1002)`:
    /// Size = 4 + (item.size * 4)
    AnnotationSetRefList = 0x1002,

    /// `TYPE_ANNOTATION_SET_ITEM (0x1003)`:
    /// Size = 4 + (item.size * 4)
    AnnotationSetItem = 0x1003,

    /// `TYPE_CLASS_DATA_ITEM (0x2000)`: Implicit size; must parse
    ClassDataItem = 0x2000,

    /// `TYPE_CODE_ITEM (0x2001)`: Implicit size; must parse
    CodeItem = 0x2001,

    /// `TYPE_STRING_DATA_ITEM (0x2002)`: Implicit size; must parse
    StringDataItem = 0x2002,

    /// `TYPE_DEBUG_INFO_ITEM (0x2003)`: Implicit size; must parse
    DebugInfoItem = 0x2003,

    /// `TYPE_ANNOTATION_ITEM (0x2004)`: Implicit size; must parse
    AnnotationItem = 0x2004,

    /// `TYPE_ENCODED_ARRAY_ITEM (0x2005)`: Implicit size; must parse
    EncodedArrayItem = 0x2005,

    /// `TYPE_ANNOTATIONS_DIRECTORY_ITEM (0x2006)`: Implicit size; must parse
    AnnotationsDirectoryItem = 0x2006,

    /// `TYPE_HIDDENAPI_CLASS_DATA_ITEM (0xF000)`: Implicit size; must parse
    HiddenApiClassDataItem = 0xF000,
}

impl TryFrom<u16> for ItemType {
    type Error = DexError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0x0000 => Ok(Self::HeaderItem),
            0x0001 => Ok(Self::StringIdItem),
            0x0002 => Ok(Self::TypeIdItem),
            0x0003 => Ok(Self::ProtoIdItem),
            0x0004 => Ok(Self::FieldIdItem),
            0x0005 => Ok(Self::MethodIdItem),
            0x0006 => Ok(Self::ClassDefItem),
            0x0007 => Ok(Self::CallSiteIdItem),
            0x0008 => Ok(Self::MethodHandleItem),
            0x1000 => Ok(Self::MapList),
            0x1001 => Ok(Self::TypeList),
            0x1002 => Ok(Self::AnnotationSetRefList),
            0x1003 => Ok(Self::AnnotationSetItem),
            0x2000 => Ok(Self::ClassDataItem),
            0x2001 => Ok(Self::CodeItem),
            0x2002 => Ok(Self::StringDataItem),
            0x2003 => Ok(Self::DebugInfoItem),
            0x2004 => Ok(Self::AnnotationItem),
            0x2005 => Ok(Self::EncodedArrayItem),
            0x2006 => Ok(Self::AnnotationsDirectoryItem),
            0xF000 => Ok(Self::HiddenApiClassDataItem),
            other => Err(DexError::UnknownTypeItem(other)),
        }
    }
}

/// A single field entry inside a [`ClassDataItem`].
#[derive(Debug, Clone)]
pub struct EncodedField {
    /// Absolute index into [Dex::field_ids], reconstructed by prefix-summing
    /// the format's `field_idx_diff` deltas.
    pub field_idx: u32,
    pub access_flags: AccessFlags,
}

/// A single method entry inside a [`ClassDataItem`].
#[derive(Debug, Clone)]
pub struct EncodedMethod {
    /// Absolute index into [Dex::method_ids], reconstructed the same way as
    /// [`EncodedField::field_idx`].
    pub method_idx: u32,
    pub access_flags: AccessFlags,
    /// Offset to this method's [`CodeItem`]; `0` if the method has no code
    /// (abstract or native).
    pub code_off: u32,
}

/// Abstraction over `class_data_item`.
///
/// See: <https://source.android.com/docs/core/runtime/dex-format#class-data-item>
#[derive(Debug, Clone, Default)]
pub struct ClassDataItem {
    pub static_fields: Vec<EncodedField>,
    pub instance_fields: Vec<EncodedField>,
    pub direct_methods: Vec<EncodedMethod>,
    pub virtual_methods: Vec<EncodedMethod>,
}

impl ClassDataItem {
    fn parse(input: &mut &[u8]) -> Result<ClassDataItem, DexError> {
        let uleb = |input: &mut &[u8]| -> Result<u64, DexError> {
            Dex::uleb128(input).map(|(v, _)| v).map_err(|_| DexError::InvalidULEB128)
        };

        let static_fields_size = uleb(input)?;
        let instance_fields_size = uleb(input)?;
        let direct_methods_size = uleb(input)?;
        let virtual_methods_size = uleb(input)?;

        let parse_fields = |input: &mut &[u8], count: u64| -> Result<Vec<EncodedField>, DexError> {
            let mut fields = Vec::with_capacity(count as usize);
            let mut running_idx = 0u32;

            for _ in 0..count {
                let diff = uleb(input)? as u32;
                let access_flags = AccessFlags::from_bits_truncate(uleb(input)? as u32);
                running_idx += diff;
                fields.push(EncodedField {
                    field_idx: running_idx,
                    access_flags,
                });
            }

            Ok(fields)
        };

        let parse_methods =
            |input: &mut &[u8], count: u64| -> Result<Vec<EncodedMethod>, DexError> {
                let mut methods = Vec::with_capacity(count as usize);
                let mut running_idx = 0u32;

                for _ in 0..count {
                    let diff = uleb(input)? as u32;
                    let access_flags = AccessFlags::from_bits_truncate(uleb(input)? as u32);
                    let code_off = uleb(input)? as u32;
                    running_idx += diff;
                    methods.push(EncodedMethod {
                        method_idx: running_idx,
                        access_flags,
                        code_off,
                    });
                }

                Ok(methods)
            };

        Ok(ClassDataItem {
            static_fields: parse_fields(input, static_fields_size)?,
            instance_fields: parse_fields(input, instance_fields_size)?,
            direct_methods: parse_methods(input, direct_methods_size)?,
            virtual_methods: parse_methods(input, virtual_methods_size)?,
        })
    }
}

/// Abstraction over `code_item`.
///
/// See: <https://source.android.com/docs/core/runtime/dex-format#code-item>
#[derive(Debug, Clone)]
pub struct CodeItem {
    pub registers_size: u16,
    pub ins_size: u16,
    pub outs_size: u16,
    pub tries_size: u16,
    pub debug_info_off: u32,
    pub insns_size: u32,
    pub insns: Vec<u16>,
}

impl CodeItem {
    fn parse(input: &mut &[u8]) -> Result<CodeItem, DexError> {
        let (registers_size, ins_size, outs_size, tries_size, debug_info_off, insns_size) = (
            le_u16, le_u16, le_u16, le_u16, le_u32, le_u32,
        )
            .parse_next(input)
            .map_err(|_: ErrMode<ContextError>| DexError::Truncated)?;

        if tries_size != 0 {
            warn!("code item has {tries_size} try/catch entries; exception handling is out of scope");
        }

        let insns = repeat(insns_size as usize, le_u16)
            .parse_next(input)
            .map_err(|_: ErrMode<ContextError>| DexError::Truncated)?;

        Ok(CodeItem {
            registers_size,
            ins_size,
            outs_size,
            tries_size,
            debug_info_off,
            insns_size,
            insns,
        })
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

    fn patch_u32(buf: &mut [u8], pos: usize, v: u32) {
        buf[pos..pos + 4].copy_from_slice(&v.to_le_bytes());
    }

    fn put_uleb128(buf: &mut Vec<u8>, mut v: u32) {
        loop {
            let mut byte = (v & 0x7f) as u8;
            v >>= 7;
            if v != 0 {
                byte |= 0x80;
            }
            buf.push(byte);
            if v == 0 {
                break;
            }
        }
    }

    /// Builds a minimal, well-formed dex fixture holding one class
    /// (`Lcom/ex/App;`) with a single direct method `Test` whose code item
    /// is exactly the S5/S6 scenario's instruction stream.
    fn build_fixture() -> Vec<u8> {
        let header_size = 0x70u32;
        let string_ids_off = header_size;
        let string_ids_size = 2u32;
        let type_ids_off = string_ids_off + string_ids_size * 4;
        let type_ids_size = 1u32;
        let method_ids_off = type_ids_off + type_ids_size * 4;
        let method_ids_size = 1u32;
        let class_defs_off = method_ids_off + method_ids_size * 8;
        let class_defs_size = 1u32;
        let code_off = class_defs_off + class_defs_size * 32;

        let mut code_item_bytes = Vec::new();
        put_u16(&mut code_item_bytes, 1); // registers_size
        put_u16(&mut code_item_bytes, 0); // ins_size
        put_u16(&mut code_item_bytes, 0); // outs_size
        put_u16(&mut code_item_bytes, 0); // tries_size
        put_u32(&mut code_item_bytes, 0); // debug_info_off
        put_u32(&mut code_item_bytes, 4); // insns_size
        put_u16(&mut code_item_bytes, 0x0090);
        put_u16(&mut code_item_bytes, 0x0210);
        put_u16(&mut code_item_bytes, 0x0003);
        put_u16(&mut code_item_bytes, 0x000F);

        let class_data_off = code_off + code_item_bytes.len() as u32;

        let mut class_data_bytes = Vec::new();
        put_uleb128(&mut class_data_bytes, 0); // static_fields_size
        put_uleb128(&mut class_data_bytes, 0); // instance_fields_size
        put_uleb128(&mut class_data_bytes, 1); // direct_methods_size
        put_uleb128(&mut class_data_bytes, 0); // virtual_methods_size
        put_uleb128(&mut class_data_bytes, 0); // method_idx_diff (-> method_idx 0)
        put_uleb128(&mut class_data_bytes, 0); // access_flags
        put_uleb128(&mut class_data_bytes, code_off); // code_off

        let map_off = class_data_off + class_data_bytes.len() as u32;

        let map_entries = [
            (ItemType::HeaderItem as u16, 1u32, 0u32),
            (ItemType::StringIdItem as u16, string_ids_size, string_ids_off),
            (ItemType::TypeIdItem as u16, type_ids_size, type_ids_off),
            (ItemType::MethodIdItem as u16, method_ids_size, method_ids_off),
            (ItemType::ClassDefItem as u16, class_defs_size, class_defs_off),
        ];
        let mut map_list_bytes = Vec::new();
        put_u32(&mut map_list_bytes, map_entries.len() as u32);
        for (item_type, size, offset) in map_entries {
            put_u16(&mut map_list_bytes, item_type);
            put_u16(&mut map_list_bytes, 0);
            put_u32(&mut map_list_bytes, size);
            put_u32(&mut map_list_bytes, offset);
        }

        let string_data_off = map_off + map_list_bytes.len() as u32;
        let mut string_data = Vec::new();
        let descriptor_rel = string_data.len() as u32;
        put_uleb128(&mut string_data, "Lcom/ex/App;".len() as u32);
        string_data.extend_from_slice(b"Lcom/ex/App;");
        string_data.push(0);
        let method_name_rel = string_data.len() as u32;
        put_uleb128(&mut string_data, "Test".len() as u32);
        string_data.extend_from_slice(b"Test");
        string_data.push(0);

        let descriptor_off = string_data_off + descriptor_rel;
        let method_name_off = string_data_off + method_name_rel;
        let file_size = string_data_off + string_data.len() as u32;

        let mut buf = vec![0u8; header_size as usize];
        put_u32(&mut buf, descriptor_off); // string_ids[0]
        put_u32(&mut buf, method_name_off); // string_ids[1]
        put_u32(&mut buf, 0); // type_ids[0] -> string_ids[0]
        put_u16(&mut buf, 0); // method_ids[0].class_idx
        put_u16(&mut buf, 0); // method_ids[0].proto_idx
        put_u32(&mut buf, 1); // method_ids[0].name_idx -> string_ids[1]
        put_u16(&mut buf, 0); // class_defs[0].class_idx
        put_u16(&mut buf, 0); // pad1
        put_u32(&mut buf, 0); // access_flags
        put_u16(&mut buf, 0xFFFF); // superclass_idx (NO_INDEX)
        put_u16(&mut buf, 0); // pad2
        put_u32(&mut buf, 0); // interfaces_off
        put_u32(&mut buf, u32::MAX); // source_file_idx (NO_INDEX)
        put_u32(&mut buf, 0); // annotations_off
        put_u32(&mut buf, class_data_off);
        put_u32(&mut buf, 0); // static_values_off
        buf.extend_from_slice(&code_item_bytes);
        buf.extend_from_slice(&class_data_bytes);
        buf.extend_from_slice(&map_list_bytes);
        buf.extend_from_slice(&string_data);

        assert_eq!(buf.len() as u32, file_size);

        buf[0..4].copy_from_slice(b"dex\n");
        buf[4..8].copy_from_slice(b"035\0");
        patch_u32(&mut buf, 32, file_size);
        patch_u32(&mut buf, 36, header_size);
        patch_u32(&mut buf, 40, ENDIAN_CONSTANT);
        patch_u32(&mut buf, 44, 0); // link_size
        patch_u32(&mut buf, 48, 0); // link_off
        patch_u32(&mut buf, 52, map_off);
        patch_u32(&mut buf, 56, string_ids_size);
        patch_u32(&mut buf, 60, string_ids_off);
        patch_u32(&mut buf, 64, type_ids_size);
        patch_u32(&mut buf, 68, type_ids_off);
        patch_u32(&mut buf, 72, 0); // proto_ids_size
        patch_u32(&mut buf, 76, 0); // proto_ids_off
        patch_u32(&mut buf, 80, 0); // field_ids_size
        patch_u32(&mut buf, 84, 0); // field_ids_off
        patch_u32(&mut buf, 88, method_ids_size);
        patch_u32(&mut buf, 92, method_ids_off);
        patch_u32(&mut buf, 96, class_defs_size);
        patch_u32(&mut buf, 100, class_defs_off);
        patch_u32(&mut buf, 104, 0); // data_size
        patch_u32(&mut buf, 108, 0); // data_off

        let checksum = simd_adler32::adler32(&buf[12..]);
        patch_u32(&mut buf, 8, checksum);

        buf
    }

    #[test]
    fn well_formed_fixture_verifies() {
        let dex = Dex::open("fixture.dex", build_fixture()).expect("fixture should verify");
        assert!(dex.valid);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut data = build_fixture();
        data[3] = 0x00;
        match Dex::open("fixture.dex", data) {
            Err(DexError::BadMagic(_)) => {}
            other => panic!("expected BadMagic, got {other:?}"),
        }
    }

    #[test]
    fn swapped_endian_tag_is_rejected() {
        let mut data = build_fixture();
        patch_u32(&mut data, 40, REVERSE_ENDIAN_CONSTANT);
        // checksum window includes the endian tag; recompute so the earlier
        // checks (magic/version/checksum) still pass and endian is reached.
        let checksum = simd_adler32::adler32(&data[12..]);
        patch_u32(&mut data, 8, checksum);

        match Dex::open("fixture.dex", data) {
            Err(DexError::BadEndian(tag)) => assert_eq!(tag, REVERSE_ENDIAN_CONSTANT),
            other => panic!("expected BadEndian, got {other:?}"),
        }
    }

    #[test]
    fn corrupted_body_fails_checksum() {
        let mut data = build_fixture();
        let last = data.len() - 1;
        data[last] ^= 0xFF;

        match Dex::open("fixture.dex", data) {
            Err(DexError::BadChecksum { .. }) => {}
            other => panic!("expected BadChecksum, got {other:?}"),
        }
    }

    #[test]
    fn finds_class_and_method_and_runs_avm() {
        let dex = Dex::open("fixture.dex", build_fixture()).expect("fixture should verify");

        let class_def = dex.find_class_def("com.ex.App").expect("class lookup");
        assert_eq!(class_def.get_name(&dex).as_deref(), Some("Lcom/ex/App;"));

        let method_idx = dex
            .find_method_id("Test", class_def.class_idx)
            .expect("method lookup");

        let code_item = dex
            .read_method_code(class_def, method_idx)
            .expect("code item lookup");
        assert_eq!(code_item.insns_size, 4);

        assert_eq!(dex.run_method("com.ex.App", "Test").unwrap(), Some(3));
    }

    #[test]
    fn missing_class_is_not_found() {
        let dex = Dex::open("fixture.dex", build_fixture()).expect("fixture should verify");
        assert!(matches!(
            dex.find_class_def("com.ex.Missing"),
            Err(DexError::NotFound)
        ));
    }

    #[test]
    fn access_flags_render_as_bracketed_list() {
        let flags = AccessFlags::PUBLIC | AccessFlags::STATIC | AccessFlags::FINAL;
        assert_eq!(flags.to_string(), "[public static final]");
    }

    #[test]
    fn no_access_flags_render_as_default() {
        assert_eq!(AccessFlags::empty().to_string(), "default");
    }

    #[test]
    fn dex_magic_and_version_are_checked_independently() {
        let mut data = build_fixture();
        data[4..8].copy_from_slice(b"001\0");
        let checksum = simd_adler32::adler32(&data[12..]);
        patch_u32(&mut data, 8, checksum);

        let dex = Dex::open("fixture.dex", data).expect("dex\\n + 001 should still verify");
        assert!(dex.valid);
    }
}
