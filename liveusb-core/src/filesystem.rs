//! Filesystem verification and labelling of the target volume.
use crate::error::{InstallError, Result};
use crate::platform::VolumeHost;
use crate::volume::{FilesystemInfo, FilesystemKind, RemovableVolume};
use tracing::info;

/// Reads the filesystem metadata of `volume`.
///
/// # Errors
///
/// - [`InstallError::VolumeUnreadable`] if the metadata cannot be read, for
///   example because the device was unplugged or is not formatted.
/// - [`InstallError::UnsupportedFilesystem`] if the filesystem is neither
///   FAT16 nor FAT32.
pub fn inspect(host: &dyn VolumeHost, volume: &RemovableVolume) -> Result<FilesystemInfo> {
    let details = host
        .volume_details(volume)
        .map_err(|source| InstallError::VolumeUnreadable {
            volume: volume.id.clone(),
            source,
        })?;

    let kind = FilesystemKind::from_name(&details.filesystem);
    if !kind.is_supported() {
        return Err(InstallError::UnsupportedFilesystem {
            volume: volume.id.clone(),
            kind: kind.to_string(),
        });
    }

    Ok(FilesystemInfo {
        kind,
        label: details.label.trim_end().to_string(),
    })
}

/// Writes `label` to `volume`.
pub fn assign_label(host: &dyn VolumeHost, volume: &RemovableVolume, label: &str) -> Result<()> {
    host.set_label(volume, label)
        .map_err(|source| InstallError::LabelWriteFailed {
            volume: volume.id.clone(),
            label: label.to_string(),
            source,
        })
}

/// Verifies the volume is FAT and makes sure it carries a label.
///
/// An unlabelled volume is given `default_label`; an existing label is kept
/// as-is. The returned label is the one the boot configuration must use.
pub fn verify(
    host: &dyn VolumeHost,
    volume: &RemovableVolume,
    default_label: &str,
) -> Result<FilesystemInfo> {
    let mut info = inspect(host, volume)?;

    if info.label.is_empty() {
        assign_label(host, volume, default_label)?;
        info!(volume = %volume.id, label = default_label, "assigned volume label");
        info.label = default_label.to_string();
    } else {
        info!(volume = %volume.id, label = %info.label, "keeping existing volume label");
    }

    Ok(info)
}
