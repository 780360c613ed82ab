//! Atomic file replacement (temp + rename)

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Replace `path` with `contents` without exposing a partially written file
///
/// Each call writes to its own uniquely named temp file in the target's
/// directory, so concurrent writers never share a temp file. The parent
/// directory is created if needed. On failure the temp file is removed and
/// the original is left untouched.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn entries(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_write_atomic_replaces_and_cleans_up() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("nested");
        let target = nested.join("progress.json");

        write_atomic(&target, b"first").unwrap();
        write_atomic(&target, b"second").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "second");
        assert_eq!(entries(&nested), vec!["progress.json".to_string()]);
    }

    #[test]
    fn test_concurrent_writers_never_fail_or_tear() {
        let temp_dir = TempDir::new().unwrap();
        let target = Arc::new(temp_dir.path().join("verbs.csv"));
        let payloads: Vec<Vec<u8>> = (0..4u8).map(|i| vec![b'a' + i; 64 * 1024]).collect();

        let handles: Vec<_> = payloads
            .iter()
            .cloned()
            .map(|payload| {
                let target = Arc::clone(&target);
                thread::spawn(move || {
                    for _ in 0..25 {
                        write_atomic(&target, &payload).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let written = fs::read(target.as_path()).unwrap();
        assert!(payloads.contains(&written));
        assert_eq!(entries(temp_dir.path()), vec!["verbs.csv".to_string()]);
    }
}
