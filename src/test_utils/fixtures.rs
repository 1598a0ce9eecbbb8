//! Filesystem and archive fixtures.

use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use std::path::Path;
use walkdir::WalkDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Writes `(relative path, content)` pairs under `root`, creating parents.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (path, content) in files {
        let target = root.join(path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).expect("create fixture directory");
        }
        std::fs::write(&target, content).expect("write fixture file");
    }
}

/// Reads every file under `root` into a sorted `relative path -> content` map.
///
/// Paths use forward slashes; entries under `skip_prefixes` are left out.
pub fn read_tree(root: &Path, skip_prefixes: &[&str]) -> BTreeMap<String, String> {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let relative = entry.path().strip_prefix(root).ok()?.to_string_lossy().replace('\\', "/");
            if skip_prefixes.iter().any(|prefix| relative.starts_with(prefix)) {
                return None;
            }
            let content = std::fs::read_to_string(entry.path()).unwrap_or_default();
            Some((relative, content))
        })
        .collect()
}

/// Builds an in-memory zip archive.
///
/// Names ending in `/` become directory entries; everything else is a file
/// with the given content. Entry order is preserved.
pub fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (name, content) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options).expect("add zip directory");
        } else {
            writer.start_file(*name, options).expect("start zip entry");
            writer.write_all(content).expect("write zip entry");
        }
    }

    writer.finish().expect("finish zip").into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_read_tree() {
        let temp = TempDir::new().unwrap();
        write_tree(temp.path(), &[("a.txt", "A"), ("sub/b.txt", "B"), (".old/c.txt", "C")]);

        let tree = read_tree(temp.path(), &[".old/"]);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree["sub/b.txt"], "B");
    }

    #[test]
    fn test_build_zip_is_readable() {
        let bytes = build_zip(&[("top/", b"".as_slice()), ("top/a.txt", b"A".as_slice())]);
        let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);
    }
}
