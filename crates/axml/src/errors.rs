use thiserror::Error;

#[derive(Error, Debug)]
pub enum AXMLError {
    /// Ran out of bytes while a chunk still expected more
    #[error("truncated while parsing binary manifest")]
    Truncated,

    /// Top-level chunk type is not `Xml` (0x0003)
    #[error("file header is not a binary xml resource: type {0:#06x}")]
    BadResChunkType(u16),

    /// A tagged chunk in the XML body carried a type outside the known set
    #[error("unknown xml chunk type: {0:#06x}")]
    UnknownChunk(u16),
}
