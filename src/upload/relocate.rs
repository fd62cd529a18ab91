// src/upload/relocate.rs

//! Moving files out of the watch directory without clobbering anything.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::warn;

use crate::fs::FileSystem;
use crate::watch::filter::split_extension;

/// Appended to a file's name when it is failed in place.
pub const FAILED_SUFFIX: &str = ".failed";

/// First free path for `file_name` inside `dir`.
///
/// `video.mp4` stays `video.mp4` if nothing is there, otherwise becomes
/// `video_1.mp4`, `video_2.mp4`, ... whichever is free first.
pub fn unique_destination(fs: &dyn FileSystem, dir: &Path, file_name: &OsStr) -> PathBuf {
    let candidate = dir.join(file_name);
    if !fs.exists(&candidate) {
        return candidate;
    }

    let name = file_name.to_string_lossy();
    let (stem, ext) = split_extension(&name);
    (1u64..)
        .map(|n| dir.join(format!("{stem}_{n}{ext}")))
        .find(|p| !fs.exists(p))
        .unwrap_or(candidate)
}

/// Move `src` into `dest_dir`, returning where it ended up.
///
/// A failed rename (typically across filesystems) falls back to
/// copy-then-delete. If the copy fails too, any partial copy is removed and
/// `src` is left where it was.
pub fn move_into(fs: &dyn FileSystem, src: &Path, dest_dir: &Path) -> Result<PathBuf> {
    let file_name = src
        .file_name()
        .ok_or_else(|| anyhow!("{:?} has no file name", src))?;
    let dest = unique_destination(fs, dest_dir, file_name);

    let rename_err = match fs.rename(src, &dest) {
        Ok(()) => return Ok(dest),
        Err(err) => err,
    };

    warn!(
        from = %src.display(),
        to = %dest.display(),
        error = %rename_err,
        "rename failed; falling back to copy"
    );

    if let Err(copy_err) = fs.copy(src, &dest) {
        if fs.exists(&dest) {
            if let Err(err) = fs.remove_file(&dest) {
                warn!(path = %dest.display(), error = %err, "could not remove partial copy");
            }
        }
        return Err(copy_err).with_context(|| format!("copying {:?} into {:?}", src, dest_dir));
    }

    if let Err(err) = fs.remove_file(src) {
        warn!(path = %src.display(), error = %err, "copied, but could not remove original");
    }

    Ok(dest)
}

/// Rename `path` in place by appending `suffix` to its file name.
pub fn rename_with_suffix(fs: &dyn FileSystem, path: &Path, suffix: &str) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("{:?} has no file name", path))?;
    let mut renamed = file_name.to_os_string();
    renamed.push(suffix);

    let dir = path.parent().unwrap_or(Path::new(""));
    let dest = unique_destination(fs, dir, &renamed);
    fs.rename(path, &dest)?;
    Ok(dest)
}
