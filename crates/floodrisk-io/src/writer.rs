//! Output path preparation and JSON report writing.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;

/// Create every missing parent directory of `path`.
///
/// A bare file name (no parent component) needs nothing created.
///
/// # Errors
///
/// Returns [`IoError::OutputDirCreate`] if a directory cannot be created.
#[instrument(fields(path = %path.display()))]
pub fn prepare_output_path(path: &Path) -> Result<(), IoError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).map_err(|e| IoError::OutputDirCreate {
                path: dir.to_path_buf(),
                source: e,
            })?;
            debug!(dir = %dir.display(), "output directory ready");
        }
        _ => {}
    }
    Ok(())
}

/// Write `artifact` as pretty-printed JSON, creating parent directories.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::OutputDirCreate`] | Parent directory cannot be created |
/// | [`IoError::SerializeReport`] | JSON encoding failed |
/// | [`IoError::WriteFile`] | File write failed |
#[instrument(skip(artifact), fields(path = %path.display()))]
pub fn write_json_report<T: Serialize + ?Sized>(path: &Path, artifact: &T) -> Result<(), IoError> {
    prepare_output_path(path)?;
    let json = serde_json::to_string_pretty(artifact).map_err(|e| IoError::SerializeReport {
        path: path.to_path_buf(),
        source: e,
    })?;
    fs::write(path, &json).map_err(|e| IoError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    info!(size_bytes = json.len(), "report written");
    Ok(())
}
