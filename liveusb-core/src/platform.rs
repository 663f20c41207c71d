//! Provides platform-specific functionality.
//!
//! This module contains the logic for interacting with the operating system to
//! enumerate storage volumes, read their filesystem type and label, and write
//! a new label.
//!
//! It uses conditional compilation (`#[cfg]`) to expose the correct implementation
//! for the target OS (e.g., Linux, Windows). Each submodule exposes the same
//! free functions, and [`SystemHost`] forwards the [`VolumeHost`] capability to
//! them so the pipeline stages never touch the OS directly.

use crate::volume::RemovableVolume;
use std::io;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use self::linux::*;

#[cfg(target_os = "windows")]
mod windows;
#[cfg(target_os = "windows")]
pub use self::windows::*;

/// A storage volume as reported by the host, removable or not.
#[derive(Clone, Debug, PartialEq)]
pub struct VolumeEntry {
    pub volume: RemovableVolume,
    pub removable: bool,
}

/// Raw filesystem metadata as the host reports it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VolumeDetails {
    /// Filesystem name, e.g. `FAT32`, `FAT`, `NTFS` or `ext4`.
    pub filesystem: String,
    /// Volume label, empty when the volume has none.
    pub label: String,
}

/// The host's storage-volume primitives.
pub trait VolumeHost {
    /// Lists every addressable storage volume with its removable flag.
    fn list_volumes(&self) -> io::Result<Vec<VolumeEntry>>;

    /// Reads the filesystem name and label of `volume`.
    fn volume_details(&self, volume: &RemovableVolume) -> io::Result<VolumeDetails>;

    /// Writes `label` to `volume`.
    fn set_label(&self, volume: &RemovableVolume, label: &str) -> io::Result<()>;
}

/// [`VolumeHost`] backed by the running operating system.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemHost;

impl VolumeHost for SystemHost {
    fn list_volumes(&self) -> io::Result<Vec<VolumeEntry>> {
        list_volumes()
    }

    fn volume_details(&self, volume: &RemovableVolume) -> io::Result<VolumeDetails> {
        volume_details(volume)
    }

    fn set_label(&self, volume: &RemovableVolume, label: &str) -> io::Result<()> {
        set_volume_label(volume, label)
    }
}
