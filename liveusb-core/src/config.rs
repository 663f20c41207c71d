//! Install configuration.
//!
//! Every name the pipeline looks for on the disc image or writes to the
//! volume lives here, so a front-end can retarget the installer without
//! touching the stages. [`InstallConfig::default`] describes a Fedora live
//! image booted through syslinux.
use crate::command::Tool;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the archive extractor's location.
pub const EXTRACTOR_ENV: &str = "LIVEUSB_7Z";
/// Environment variable that overrides the bootloader installer's location.
pub const BOOTLOADER_ENV: &str = "LIVEUSB_SYSLINUX";

#[derive(Clone, Debug)]
pub struct InstallConfig {
    /// Directory scanned for disc images and bundled tools.
    pub workdir: PathBuf,
    /// Label given to volumes that have none.
    pub default_label: String,
    /// Disc-image file extension, without the dot.
    pub image_extension: String,
    /// Where the operator can download an image.
    pub download_url: String,
    /// Directory whose presence proves the image was extracted.
    pub payload_dir: String,
    /// Archive member excluded from extraction (the El Torito boot catalog).
    pub boot_sector_exclusion: String,
    /// Bootloader directory as shipped on the disc.
    pub native_boot_dir: String,
    /// Boot configuration as shipped on the disc.
    pub native_boot_config: String,
    /// Bootloader directory on the installed volume.
    pub boot_dir: String,
    /// Rewritten boot configuration on the installed volume.
    pub boot_config: String,
    pub extractor: Tool,
    pub bootloader: Tool,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from("."),
            default_label: "FEDORA".into(),
            image_extension: "iso".into(),
            download_url: "http://fedoraproject.org/get-fedora".into(),
            payload_dir: "LiveOS".into(),
            boot_sector_exclusion: "[BOOT]".into(),
            native_boot_dir: "isolinux".into(),
            native_boot_config: "isolinux.cfg".into(),
            boot_dir: "syslinux".into(),
            boot_config: "syslinux.cfg".into(),
            extractor: Tool::new("7z", ["7-Zip/7z.exe", "7-Zip/7z"]),
            bootloader: Tool::new("syslinux", ["syslinux.exe"]),
        }
    }
}

impl InstallConfig {
    /// The default configuration, scanning `workdir` for images and tools.
    pub fn for_workdir(workdir: impl AsRef<Path>) -> Self {
        Self {
            workdir: workdir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Applies tool-path overrides looked up through `lookup`.
    ///
    /// Front-ends pass `std::env::var_os`; tests pass a closure.
    pub fn apply_env(mut self, lookup: impl Fn(&str) -> Option<OsString>) -> Self {
        if let Some(path) = lookup(EXTRACTOR_ENV).filter(|p| !p.is_empty()) {
            self.extractor.override_path = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup(BOOTLOADER_ENV).filter(|p| !p.is_empty()) {
            self.bootloader.override_path = Some(PathBuf::from(path));
        }
        self
    }
}
