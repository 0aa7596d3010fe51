pub mod axml;
pub mod errors;

pub mod structs;

pub use axml::{ManifestFacts, AXML};
pub use errors::AXMLError;
pub use structs::Chunk;
