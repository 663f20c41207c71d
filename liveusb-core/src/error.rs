//! The error taxonomy shared by every stage of the install pipeline.
//!
//! Every variant is terminal for the session: nothing is retried, and the
//! pipeline stops at the first error it sees. Messages name the offending
//! resource (device, filesystem kind, file path) so they can be shown to the
//! operator as-is.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while installing a live image onto a removable volume.
#[derive(Error, Debug)]
pub enum InstallError {
    /// The host reported no removable volumes.
    #[error(
        "Sorry, I couldn't find any removable devices. Plug in a FAT-formatted USB key and try again."
    )]
    NoDeviceFound,

    /// The platform volume enumeration itself failed.
    #[error("Failed to enumerate storage volumes: {0}")]
    DeviceQuery(#[source] io::Error),

    /// The operator's answer did not name one of the offered choices.
    #[error("Invalid selection '{input}': expected a number between 1 and {count}")]
    InvalidSelection { input: String, count: usize },

    /// The interactive prompt could not be shown or read.
    #[error("Failed to read the operator's answer: {0}")]
    Prompt(#[source] io::Error),

    #[error(
        "Cannot read volume information for {volume}. Make sure your USB key is plugged in and formatted using the FAT filesystem"
    )]
    VolumeUnreadable {
        volume: String,
        #[source]
        source: io::Error,
    },

    #[error(
        "Unsupported filesystem on {volume}: {kind}. Please back up and format your USB key with the FAT filesystem"
    )]
    UnsupportedFilesystem { volume: String, kind: String },

    #[error("Failed to set volume label '{label}' on {volume}")]
    LabelWriteFailed {
        volume: String,
        label: String,
        #[source]
        source: io::Error,
    },

    #[error(
        "Cannot find a .{extension} file in {}. Please drag it into this directory. If you haven't downloaded Fedora yet, please visit: {url}",
        dir.display()
    )]
    ImageNotFound {
        dir: PathBuf,
        extension: String,
        url: String,
    },

    #[error("Failed to scan {} for disc images", dir.display())]
    ImageScan {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Extraction of {} failed: {reason}", image.display())]
    ExtractionFailed { image: PathBuf, reason: String },

    #[error("Failed to read boot configuration {}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write boot configuration {}", path.display())]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Bootloader installation on {volume} failed: {reason}")]
    BootloaderInstallFailed { volume: String, reason: String },
}

/// Result type alias for install operations.
pub type Result<T> = std::result::Result<T, InstallError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_filesystem_names_kind_and_volume() {
        let err = InstallError::UnsupportedFilesystem {
            volume: "F:".into(),
            kind: "NTFS".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("F:"));
        assert!(msg.contains("NTFS"));
    }

    #[test]
    fn image_not_found_points_to_download() {
        let err = InstallError::ImageNotFound {
            dir: PathBuf::from("/tmp/work"),
            extension: "iso".into(),
            url: "http://fedoraproject.org/get-fedora".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/work"));
        assert!(msg.contains(".iso"));
        assert!(msg.contains("http://fedoraproject.org/get-fedora"));
    }

    #[test]
    fn volume_unreadable_keeps_source() {
        use std::error::Error as _;

        let err = InstallError::VolumeUnreadable {
            volume: "/dev/sdb1".into(),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("/dev/sdb1"));
    }
}
