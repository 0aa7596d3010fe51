use std::io;

use dalvik_inspect_axml::AXMLError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InspectError {
    /// Generic I/O error while trying to open the manifest or a dex file.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Error occurred while parsing AndroidManifest.xml. Fatal: unlike a
    /// per-dex miss, a broken manifest aborts the whole inspection.
    #[error("failed to parse AndroidManifest.xml")]
    Manifest(#[from] AXMLError),
}
