use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::entry::ZipEntry;
use crate::errors::ZipError;

/// Extracts every entry of the archive at `archive_path` under `out_dir`,
/// creating directories as needed. Mirrors a plain `unzip -o archive -d out`.
pub fn unzip(archive_path: &Path, out_dir: &Path) -> Result<(), ZipError> {
    let input = fs::read(archive_path)
        .map_err(|e| ZipError::Io(archive_path.display().to_string(), e))?;

    let archive = ZipEntry::new(input)?;

    for name in archive.namelist() {
        if name.ends_with('/') || name.starts_with("..") || name.contains("/../") {
            continue;
        }

        let (data, _) = archive.read(name)?;
        let dest = out_dir.join(name);

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| ZipError::Io(parent.display().to_string(), e))?;
        }

        fs::write(&dest, data).map_err(|e| ZipError::Io(dest.display().to_string(), e))?;
    }

    Ok(())
}

/// Returns every `.dex` file directly inside `dir` (one level deep, no
/// recursion into subdirectories).
pub fn list_dex(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_file())
        .filter(|entry| entry.path().extension().and_then(|s| s.to_str()) == Some("dex"))
        .map(|entry| entry.path().to_path_buf())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn list_dex_is_one_level_deep() {
        let tmp = tempdir();
        fs::write(tmp.join("classes.dex"), b"dex").unwrap();
        fs::write(tmp.join("notes.txt"), b"ignore me").unwrap();
        fs::create_dir_all(tmp.join("nested")).unwrap();
        fs::write(tmp.join("nested").join("classes2.dex"), b"dex").unwrap();

        let mut found = list_dex(&tmp);
        found.sort();

        assert_eq!(found, vec![tmp.join("classes.dex")]);

        fs::remove_dir_all(&tmp).unwrap();
    }

    #[test]
    fn unzip_materializes_entries_on_disk() {
        let tmp = tempdir();
        let archive_path = tmp.join("archive.zip");

        let mut file = fs::File::create(&archive_path).unwrap();
        file.write_all(&test_archive()).unwrap();
        drop(file);

        let out_dir = tmp.join("out");
        unzip(&archive_path, &out_dir).expect("extraction succeeds");

        let extracted = fs::read(out_dir.join("AndroidManifest.xml")).unwrap();
        assert_eq!(extracted, b"manifest bytes");

        fs::remove_dir_all(&tmp).unwrap();
    }

    fn tempdir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "dalvik-inspect-zip-test-{:?}",
            std::thread::current().id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn test_archive() -> Vec<u8> {
        let name = "AndroidManifest.xml";
        let data = b"manifest bytes";
        let mut out = Vec::new();

        out.extend_from_slice(b"PK\x03\x04");
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(data);

        let central_dir_offset = out.len() as u32;
        out.extend_from_slice(b"PK\x01\x02");
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(name.as_bytes());

        let central_dir_size = out.len() as u32 - central_dir_offset;
        out.extend_from_slice(b"PK\x05\x06");
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&central_dir_size.to_le_bytes());
        out.extend_from_slice(&central_dir_offset.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());

        out
    }
}
