//! Write-once output of generated files

use std::path::Path;

use tokio::fs;

/// What happened to one generated file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// The file existed and overwriting was not requested
    Skipped,
}

/// Write `contents` to `path` unless it already exists.
///
/// With `overwrite` set the file is always rewritten. Missing parent
/// directories are created first.
pub async fn write_generated(
    path: &Path,
    contents: &str,
    overwrite: bool,
) -> crate::Result<WriteOutcome> {
    if !overwrite && fs::try_exists(path).await? {
        log::debug!("{} exists, leaving it untouched", path.display());
        return Ok(WriteOutcome::Skipped);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, contents).await?;
    log::info!("Generated {}", path.display());
    Ok(WriteOutcome::Written)
}
