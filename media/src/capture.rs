//! Naming and staging of photos under the pictures directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use uuid::Uuid;

/// Fresh `JPEG_<yyyyMMdd_HHmmss>_<suffix>.jpg` path under `dir`.
///
/// Creates `dir` if needed. The file itself is not created.
pub fn capture_path(dir: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let suffix = Uuid::new_v4().simple().to_string();
    Ok(dir.join(format!("JPEG_{stamp}_{}.jpg", &suffix[..8])))
}

/// Copy a picked image into `dir` under a fresh capture name.
///
/// The copy is what gets compressed and uploaded, so the original is never
/// touched and compression siblings land in the pictures directory.
pub fn stage_for_upload(source: &Path, dir: &Path) -> io::Result<PathBuf> {
    let target = capture_path(dir)?;
    fs::copy(source, &target)?;
    tracing::debug!(
        source = %source.display(),
        staged = %target.display(),
        "Staged image for upload"
    );
    Ok(target)
}
