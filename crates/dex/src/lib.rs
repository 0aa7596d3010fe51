pub mod avm;
pub mod dex;
pub mod errors;

pub use avm::Avm;
pub use dex::{
    AccessFlags, ClassDataItem, ClassItem, CodeItem, Dex, DexHeader, EncodedField, EncodedMethod,
    FieldItem, ItemType, MapItem, MethodItem, ProtoItem, ProtoView, ENDIAN_CONSTANT, NO_INDEX,
    REVERSE_ENDIAN_CONSTANT,
};
pub use errors::DexError;
