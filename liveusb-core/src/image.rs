//! Locating the disc image to install.
use crate::error::{InstallError, Result};
use crate::select::{self, Chooser};
use crate::volume::ImageFile;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Lists the files in `dir` whose extension is `extension`, sorted by name.
///
/// The scan is not recursive and the extension match ignores case.
pub fn candidates(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let scan_error = |source: io::Error| InstallError::ImageScan {
        dir: dir.to_path_buf(),
        source,
    };

    let mut found = Vec::new();
    for entry in fs::read_dir(dir).map_err(scan_error)? {
        let entry = entry.map_err(scan_error)?;
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if matches && path.is_file() {
            found.push(path);
        }
    }
    found.sort();
    debug!(dir = %dir.display(), count = found.len(), "scanned for disc images");
    Ok(found)
}

/// Finds the disc image to install.
///
/// # Arguments
///
/// * `dir` - The directory to scan.
/// * `extension` - The disc-image extension, without the dot.
/// * `download_url` - Shown to the operator when no image is present.
/// * `chooser` - Asked for a 1-based index when several images are present.
///
/// # Errors
///
/// Returns [`InstallError::ImageNotFound`] when the directory holds no image,
/// and [`InstallError::InvalidSelection`] for an answer that is not a number
/// in range.
pub fn find_image(
    dir: &Path,
    extension: &str,
    download_url: &str,
    chooser: &mut dyn Chooser,
) -> Result<ImageFile> {
    let mut images = candidates(dir, extension)?;

    let path = match images.len() {
        0 => {
            return Err(InstallError::ImageNotFound {
                dir: dir.to_path_buf(),
                extension: extension.to_string(),
                url: download_url.to_string(),
            });
        }
        1 => images.remove(0),
        count => {
            let items: Vec<String> = images
                .iter()
                .map(|p| {
                    p.file_name()
                        .unwrap_or_default()
                        .to_string_lossy()
                        .into_owned()
                })
                .collect();
            let answer = chooser
                .choose("Which image do you want to use", &items)
                .map_err(InstallError::Prompt)?;
            images.swap_remove(select::parse_index(&answer, count)?)
        }
    };

    info!(image = %path.display(), "using disc image");
    Ok(ImageFile { path })
}
