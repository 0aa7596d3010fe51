use flate2::Decompress;
use flate2::FlushDecompress;
use flate2::Status;
use std::collections::HashMap;

use crate::{
    errors::{FileCompressionType, ZipError},
    structs::{
        central_directory::CentralDirectory, eocd::EndOfCentralDirectory,
        local_file_header::LocalFileHeader,
    },
};

/// A parsed ZIP archive: central directory plus the local headers it points at.
pub struct ZipEntry {
    input: Vec<u8>,
    central_directory: CentralDirectory,
    local_headers: HashMap<String, LocalFileHeader>,
}

impl ZipEntry {
    pub fn new(input: Vec<u8>) -> Result<ZipEntry, ZipError> {
        if !input.starts_with(b"PK\x03\x04") {
            return Err(ZipError::InvalidHeader);
        }

        let eocd_offset =
            EndOfCentralDirectory::find_eocd(&input, 4096).ok_or(ZipError::NotFoundEocd)?;

        let eocd = EndOfCentralDirectory::parse(&mut &input[eocd_offset..])
            .map_err(|_| ZipError::ParseError)?;

        let central_directory =
            CentralDirectory::parse(&input, &eocd).map_err(|_| ZipError::ParseError)?;

        let local_headers = central_directory
            .entries
            .iter()
            .filter_map(|(filename, entry)| {
                LocalFileHeader::parse(&input, entry.local_header_offset as usize)
                    .ok()
                    .map(|header| (filename.clone(), header))
            })
            .collect();

        Ok(ZipEntry {
            input,
            central_directory,
            local_headers,
        })
    }

    /// Get list of the filenames from zip archive
    pub fn namelist(&self) -> impl Iterator<Item = &String> {
        self.central_directory.entries.keys()
    }

    /// Read (and decompress) a single entry, tolerating a central directory
    /// whose compression method disagrees with what the bytes actually are.
    pub fn read(&self, filename: &str) -> Result<(Vec<u8>, FileCompressionType), ZipError> {
        let local_header = self
            .local_headers
            .get(filename)
            .ok_or(ZipError::FileNotFound)?;

        let central_directory_entry = self
            .central_directory
            .entries
            .get(filename)
            .ok_or(ZipError::FileNotFound)?;

        let (compressed_size, uncompressed_size) =
            if local_header.compressed_size == 0 || local_header.uncompressed_size == 0 {
                (
                    central_directory_entry.compressed_size as usize,
                    central_directory_entry.uncompressed_size as usize,
                )
            } else {
                (
                    local_header.compressed_size as usize,
                    local_header.uncompressed_size as usize,
                )
            };

        let offset = central_directory_entry.local_header_offset as usize + local_header.size();
        let get_slice = |start: usize, end: usize| self.input.get(start..end).ok_or(ZipError::Eof);

        match (
            local_header.compression_method,
            compressed_size == uncompressed_size,
        ) {
            (0, _) => {
                let slice = get_slice(offset, offset + uncompressed_size)?;
                Ok((slice.to_vec(), FileCompressionType::Stored))
            }
            (8, _) => {
                let compressed_data = get_slice(offset, offset + compressed_size)?;
                let mut uncompressed_data = Vec::with_capacity(uncompressed_size);

                Decompress::new(false)
                    .decompress_vec(
                        compressed_data,
                        &mut uncompressed_data,
                        FlushDecompress::Finish,
                    )
                    .map_err(|_| ZipError::DecompressionError)?;

                Ok((uncompressed_data, FileCompressionType::Deflated))
            }
            (_, true) => {
                let slice = get_slice(offset, offset + uncompressed_size)?;
                Ok((slice.to_vec(), FileCompressionType::StoredTampered))
            }
            (_, false) => {
                let compressed_data = get_slice(offset, offset + compressed_size)?;
                let mut uncompressed_data = Vec::with_capacity(uncompressed_size);
                let mut decompressor = Decompress::new(false);

                let status = decompressor.decompress_vec(
                    compressed_data,
                    &mut uncompressed_data,
                    FlushDecompress::Finish,
                );

                let is_valid = decompressor.total_in() == compressed_data.len() as u64;
                match status {
                    Ok(Status::Ok) | Ok(Status::StreamEnd) if is_valid => {
                        Ok((uncompressed_data, FileCompressionType::DeflatedTampered))
                    }
                    _ => {
                        let slice = get_slice(offset, offset + uncompressed_size)?;
                        Ok((slice.to_vec(), FileCompressionType::StoredTampered))
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn stored_archive(name: &str, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let local_header_offset = 0u32;

        out.extend_from_slice(b"PK\x03\x04");
        out.extend_from_slice(&20u16.to_le_bytes()); // version_needed
        out.extend_from_slice(&0u16.to_le_bytes()); // general_purpose
        out.extend_from_slice(&0u16.to_le_bytes()); // compression_method = stored
        out.extend_from_slice(&0u16.to_le_bytes()); // mod time
        out.extend_from_slice(&0u16.to_le_bytes()); // mod date
        out.extend_from_slice(&0u32.to_le_bytes()); // crc32
        out.extend_from_slice(&(data.len() as u32).to_le_bytes()); // compressed_size
        out.extend_from_slice(&(data.len() as u32).to_le_bytes()); // uncompressed_size
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // extra_field_length
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(data);

        let central_dir_offset = out.len() as u32;
        out.extend_from_slice(b"PK\x01\x02");
        out.extend_from_slice(&20u16.to_le_bytes()); // version_made_by
        out.extend_from_slice(&20u16.to_le_bytes()); // version_needed
        out.extend_from_slice(&0u16.to_le_bytes()); // general_purpose
        out.extend_from_slice(&0u16.to_le_bytes()); // compression_method
        out.extend_from_slice(&0u16.to_le_bytes()); // mod time
        out.extend_from_slice(&0u16.to_le_bytes()); // mod date
        out.extend_from_slice(&0u32.to_le_bytes()); // crc32
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // extra_field_length
        out.extend_from_slice(&0u16.to_le_bytes()); // file_comment_length
        out.extend_from_slice(&0u16.to_le_bytes()); // disk_number_start
        out.extend_from_slice(&0u16.to_le_bytes()); // internal_attrs
        out.extend_from_slice(&0u32.to_le_bytes()); // external_attrs
        out.extend_from_slice(&local_header_offset.to_le_bytes());
        out.extend_from_slice(name.as_bytes());

        let central_dir_size = out.len() as u32 - central_dir_offset;
        out.extend_from_slice(b"PK\x05\x06");
        out.extend_from_slice(&0u16.to_le_bytes()); // disk_number
        out.extend_from_slice(&0u16.to_le_bytes()); // central_dir_start_disk
        out.extend_from_slice(&1u16.to_le_bytes()); // entries_on_this_disk
        out.extend_from_slice(&1u16.to_le_bytes()); // total_entries
        out.extend_from_slice(&central_dir_size.to_le_bytes());
        out.extend_from_slice(&central_dir_offset.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // comment_length

        out
    }

    #[test]
    fn round_trips_a_stored_entry() {
        let archive = stored_archive("AndroidManifest.xml", b"hello world");
        let zip = ZipEntry::new(archive).expect("valid archive");

        assert_eq!(zip.namelist().collect::<Vec<_>>(), vec!["AndroidManifest.xml"]);

        let (data, kind) = zip.read("AndroidManifest.xml").expect("entry present");
        assert_eq!(data, b"hello world");
        assert_eq!(kind, FileCompressionType::Stored);
    }

    #[test]
    fn round_trips_a_deflated_entry() {
        let mut encoder =
            flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"classes.dex payload").unwrap();
        let compressed = encoder.finish().unwrap();

        let mut archive = Vec::new();
        let name = "classes.dex";
        archive.extend_from_slice(b"PK\x03\x04");
        archive.extend_from_slice(&20u16.to_le_bytes());
        archive.extend_from_slice(&0u16.to_le_bytes());
        archive.extend_from_slice(&8u16.to_le_bytes()); // deflate
        archive.extend_from_slice(&0u16.to_le_bytes());
        archive.extend_from_slice(&0u16.to_le_bytes());
        archive.extend_from_slice(&0u32.to_le_bytes());
        archive.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
        archive.extend_from_slice(&19u32.to_le_bytes());
        archive.extend_from_slice(&(name.len() as u16).to_le_bytes());
        archive.extend_from_slice(&0u16.to_le_bytes());
        archive.extend_from_slice(name.as_bytes());
        archive.extend_from_slice(&compressed);

        let central_dir_offset = archive.len() as u32;
        archive.extend_from_slice(b"PK\x01\x02");
        archive.extend_from_slice(&20u16.to_le_bytes());
        archive.extend_from_slice(&20u16.to_le_bytes());
        archive.extend_from_slice(&0u16.to_le_bytes());
        archive.extend_from_slice(&8u16.to_le_bytes());
        archive.extend_from_slice(&0u16.to_le_bytes());
        archive.extend_from_slice(&0u16.to_le_bytes());
        archive.extend_from_slice(&0u32.to_le_bytes());
        archive.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
        archive.extend_from_slice(&19u32.to_le_bytes());
        archive.extend_from_slice(&(name.len() as u16).to_le_bytes());
        archive.extend_from_slice(&0u16.to_le_bytes());
        archive.extend_from_slice(&0u16.to_le_bytes());
        archive.extend_from_slice(&0u16.to_le_bytes());
        archive.extend_from_slice(&0u16.to_le_bytes());
        archive.extend_from_slice(&0u32.to_le_bytes());
        archive.extend_from_slice(&0u32.to_le_bytes());
        archive.extend_from_slice(name.as_bytes());

        let central_dir_size = archive.len() as u32 - central_dir_offset;
        archive.extend_from_slice(b"PK\x05\x06");
        archive.extend_from_slice(&0u16.to_le_bytes());
        archive.extend_from_slice(&0u16.to_le_bytes());
        archive.extend_from_slice(&1u16.to_le_bytes());
        archive.extend_from_slice(&1u16.to_le_bytes());
        archive.extend_from_slice(&central_dir_size.to_le_bytes());
        archive.extend_from_slice(&central_dir_offset.to_le_bytes());
        archive.extend_from_slice(&0u16.to_le_bytes());

        let zip = ZipEntry::new(archive).expect("valid archive");
        let (data, kind) = zip.read("classes.dex").expect("entry present");
        assert_eq!(data, b"classes.dex payload");
        assert_eq!(kind, FileCompressionType::Deflated);
    }

    #[test]
    fn rejects_non_zip_input() {
        let err = ZipEntry::new(vec![0u8; 16]).unwrap_err();
        assert!(matches!(err, ZipError::InvalidHeader));
    }

    #[test]
    fn missing_entry_is_file_not_found() {
        let archive = stored_archive("a.txt", b"x");
        let zip = ZipEntry::new(archive).unwrap();
        assert!(matches!(zip.read("b.txt"), Err(ZipError::FileNotFound)));
    }
}
