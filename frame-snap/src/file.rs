//! Loading the compressed frame from disk and persisting the JPEG.

use std::ffi::OsString;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use bytes::Bytes;

use crate::error::{Result, SnapError};

/// Source extensions accepted as-is; no other spelling is allowed.
pub const SOURCE_EXTENSIONS: [&str; 4] = [".h264", ".H264", ".h265", ".H265"];

/// Fails unless both paths are non-empty.
pub fn validate_paths(input: &Path, output: &Path) -> Result<()> {
    if input.as_os_str().is_empty() {
        return Err(SnapError::EmptyPath("input"));
    }
    if output.as_os_str().is_empty() {
        return Err(SnapError::EmptyPath("output"));
    }
    Ok(())
}

/// Checks the text after the last `.` of the file name against [`SOURCE_EXTENSIONS`].
pub fn validate_source_extension(path: &Path) -> Result<()> {
    let accepted = path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.rfind('.').map(|dot| &name[dot..]))
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext));
    if accepted {
        Ok(())
    } else {
        Err(SnapError::UnsupportedExtension(path.to_path_buf()))
    }
}

/// Reads at most `cap` bytes of `path`.
///
/// Anything past the cap is dropped with a warning; a zero-length file is an error.
pub fn load_input(path: &Path, cap: usize) -> Result<Bytes> {
    let file = fs::File::open(path)?;
    let mut data = Vec::with_capacity(cap.min(64 * 1024));
    let mut reader = file.take(cap as u64 + 1);
    reader.read_to_end(&mut data)?;

    if data.len() > cap {
        data.truncate(cap);
        log::warn!(
            "input {} is larger than {}B, only the first {}B are used",
            path.display(),
            cap,
            cap
        );
    }
    if data.is_empty() {
        return Err(SnapError::EmptyInput(path.display().to_string()));
    }
    log::debug!("loaded {}: {}B", path.display(), data.len());
    Ok(Bytes::from(data))
}

/// Writes `data` to `path`, replacing any existing file.
///
/// The bytes go to a uniquely named hidden sibling first and are renamed into place only after
/// a complete write, so a failure never leaves a truncated file at `path` and concurrent writers
/// of the same `path` do not share a temporary file.
pub fn persist_output(path: &Path, data: &[u8]) -> Result<()> {
    if data.is_empty() {
        return Err(SnapError::EmptyOutput);
    }
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut prefix = OsString::from(".");
    prefix.push(path.file_name().unwrap_or_default());
    prefix.push(".");

    let mut tmp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".partial")
        .tempfile_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    log::debug!("wrote {}: {}B", path.display(), data.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_exact_extensions() {
        for name in ["frame.h264", "frame.H264", "frame.h265", "dir/x.y.H265"] {
            assert!(validate_source_extension(Path::new(name)).is_ok(), "{name}");
        }
    }

    #[test]
    fn test_rejects_other_extensions() {
        for name in ["frame.mp4", "frame.hevc", "frame.H265.bak", "frame.hEvc", "frame"] {
            let err = validate_source_extension(Path::new(name)).unwrap_err();
            assert!(matches!(err, SnapError::UnsupportedExtension(_)), "{name}");
        }
    }

    #[test]
    fn test_rejects_empty_paths() {
        assert!(matches!(
            validate_paths(Path::new(""), Path::new("out.jpeg")),
            Err(SnapError::EmptyPath("input"))
        ));
        assert!(matches!(
            validate_paths(Path::new("in.h264"), Path::new("")),
            Err(SnapError::EmptyPath("output"))
        ));
    }

    #[test]
    fn test_load_rejects_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.h264");
        fs::write(&path, b"").unwrap();
        assert!(matches!(load_input(&path, 1024), Err(SnapError::EmptyInput(_))));
    }

    #[test]
    fn test_load_truncates_at_cap() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.h265");
        fs::write(&path, vec![9u8; 300]).unwrap();
        let data = load_input(&path, 128).unwrap();
        assert_eq!(data.len(), 128);

        let data = load_input(&path, 300).unwrap();
        assert_eq!(data.len(), 300);
    }

    #[test]
    fn test_persist_replaces_file_and_leaves_no_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jpeg");
        fs::write(&path, b"old").unwrap();
        persist_output(&path, &[0xFF, 0xD8, 0xFF, 0xD9]).unwrap();
        assert_eq!(fs::read(&path).unwrap(), vec![0xFF, 0xD8, 0xFF, 0xD9]);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_concurrent_persists_to_one_path_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jpeg");
        let first = vec![1u8; 4 * 1024 * 1024];
        let second = vec![2u8; 4 * 1024 * 1024];

        for _ in 0..10 {
            std::thread::scope(|s| {
                let a = s.spawn(|| persist_output(&path, &first));
                let b = s.spawn(|| persist_output(&path, &second));
                assert!(a.join().unwrap().is_ok());
                assert!(b.join().unwrap().is_ok());
            });
            let written = fs::read(&path).unwrap();
            assert!(written == first || written == second);
        }
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_persist_refuses_empty_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jpeg");
        assert!(matches!(persist_output(&path, &[]), Err(SnapError::EmptyOutput)));
        assert!(!path.exists());
    }

    #[test]
    fn test_persist_failure_leaves_destination_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("out.jpeg");
        assert!(matches!(persist_output(&path, &[1, 2, 3]), Err(SnapError::Io(_))));
        assert!(!path.exists());
    }
}
