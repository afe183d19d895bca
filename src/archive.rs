use crate::error::SubwrapError;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const ARCHIVE_NAME: &str = "backup.zip";

/// Stores the current contents of `files` in `<root>/backup.zip`, each under
/// its path relative to `root`.
///
/// The archive is built next to its final location and only moved into place
/// once complete. Files that cannot be read are left out with a warning.
pub fn archive(root: &Path, files: &[PathBuf]) -> Result<PathBuf> {
    let target = root.join(ARCHIVE_NAME);
    write_archive(root, &target, files).context(SubwrapError::Archive(target.clone()))?;
    info!(archive = %target.display(), files = files.len(), "Original files archived");
    Ok(target)
}

fn write_archive(root: &Path, target: &Path, files: &[PathBuf]) -> Result<()> {
    let tmp = NamedTempFile::new_in(root).context("Failed to create temporary archive")?;
    let mut zip = ZipWriter::new(tmp);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for file in files {
        let data = match fs::read(file) {
            Ok(data) => data,
            Err(err) => {
                warn!(file = %file.display(), error = %err, "Leaving unreadable file out of the archive");
                continue;
            }
        };
        zip.start_file(entry_name(root, file), options)
            .with_context(|| format!("Failed to add '{}'", file.display()))?;
        zip.write_all(&data)
            .with_context(|| format!("Failed to add '{}'", file.display()))?;
    }

    let tmp = zip.finish().context("Failed to finish archive")?;
    tmp.persist(target).context("Failed to move archive into place")?;
    Ok(())
}

/// The name a file is stored under: its path relative to `root`, with `/`
/// between components.
fn entry_name(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
