use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;

pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)?;
    Ok(())
}

/// Removes `path` and everything under it. A missing directory is fine.
pub fn remove_dir_if_exists(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

pub fn atomic_write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let ts = Utc::now().timestamp_micros();
    let pid = std::process::id();
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("tmpfile");
    let tmp = path.with_file_name(format!(".{}.tmp.{}.{}", name, pid, ts));
    let mut file = fs::File::create(&tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    fs::rename(&tmp, path)?;
    if let Some(parent) = path.parent() {
        if let Ok(dir) = fs::File::open(parent) {
            let _ = dir.sync_all();
        }
    }
    Ok(())
}

pub fn atomic_write_json_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    atomic_write_bytes(path, &bytes)
}

/// Makes `src` visible at `dst`, by symlink when asked and supported,
/// otherwise by copy. An existing `dst` is replaced.
pub fn link_or_copy(src: &Path, dst: &Path, prefer_link: bool) -> Result<()> {
    if dst.symlink_metadata().is_ok() {
        fs::remove_file(dst)?;
    }
    #[cfg(unix)]
    {
        if prefer_link {
            let target = fs::canonicalize(src)?;
            std::os::unix::fs::symlink(target, dst)?;
            return Ok(());
        }
    }
    #[cfg(not(unix))]
    let _ = prefer_link;
    fs::copy(src, dst)?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn temp_root(tag: &str) -> std::path::PathBuf {
    let root = std::env::temp_dir().join(format!(
        "rxbench_{}_test_{}_{}",
        tag,
        std::process::id(),
        Utc::now().timestamp_micros()
    ));
    ensure_dir(&root).expect("temp root");
    root
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_dir_if_exists_tolerates_missing_dir() {
        let root = temp_root("rmdir");
        let missing = root.join("never_created");
        remove_dir_if_exists(&missing).expect("missing dir is not an error");
        let present = root.join("present");
        ensure_dir(&present.join("nested")).expect("nested");
        remove_dir_if_exists(&present).expect("remove");
        assert!(!present.exists());
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn link_or_copy_replaces_existing_target() {
        let root = temp_root("link");
        let src = root.join("aln.phy");
        fs::write(&src, "4 10\n").expect("src");
        let dst = root.join("cell").join("aln.phy");
        ensure_dir(dst.parent().unwrap()).expect("cell");
        fs::write(&dst, "stale").expect("stale");
        link_or_copy(&src, &dst, true).expect("link");
        assert_eq!(fs::read_to_string(&dst).unwrap(), "4 10\n");
        link_or_copy(&src, &dst, false).expect("copy");
        assert!(!dst.symlink_metadata().unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(&dst).unwrap(), "4 10\n");
        let _ = fs::remove_dir_all(root);
    }
}
