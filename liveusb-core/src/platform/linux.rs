use super::{VolumeDetails, VolumeEntry};
use crate::volume::RemovableVolume;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::Command;
use sysinfo::Disks;
use tracing::debug;

const BOOT_SECTOR_SIZE: usize = 512;
const FAT_LABEL_LEN: usize = 11;
const EXTENDED_BOOT_SIGNATURE: u8 = 0x29;

/// Scans for all mounted storage volumes on a Linux system.
///
/// Volumes are discovered through `sysinfo`, which reports each mounted
/// filesystem together with the device it lives on and whether that device
/// is removable (it has a `usb-*` link under `/dev/disk/by-id`). A device
/// mounted at several places is reported once, at its first mount point.
///
/// Every partition of the disk holding `/` is reported as fixed, so a host
/// booted from a USB key never offers its own boot media.
///
/// Unmounted devices are not reported: every later stage writes through the
/// volume's mount point.
pub fn list_volumes() -> io::Result<Vec<VolumeEntry>> {
    let disks = Disks::new_with_refreshed_list();
    let system_disk = disks
        .iter()
        .find(|d| d.mount_point() == Path::new("/"))
        .map(|d| parent_device(Path::new(d.name())));
    if system_disk.is_none() {
        debug!("no device is mounted at /; not excluding a system disk");
    }
    let mut entries: Vec<VolumeEntry> = Vec::new();

    for disk in disks.iter() {
        let id = disk.name().to_string_lossy().to_string();
        if id.is_empty() || entries.iter().any(|e| e.volume.id == id) {
            continue;
        }
        let on_system_disk = system_disk
            .as_deref()
            .is_some_and(|system| parent_device(Path::new(&id)) == system);

        let size_gb = disk.total_space() as f64 / (1024.0 * 1024.0 * 1024.0);
        entries.push(VolumeEntry {
            volume: RemovableVolume {
                id,
                root: disk.mount_point().to_path_buf(),
                size_gb: Some(size_gb),
            },
            removable: disk.is_removable() && !on_system_disk,
        });
    }

    Ok(entries)
}

/// Reads the filesystem type and label of a mounted volume.
///
/// `sysinfo` only reports `vfat` for every FAT variant, so FAT volumes are
/// classified by the type string in their boot sector. The label is looked up
/// through udev's `/dev/disk/by-label` links first; for FAT volumes udev
/// does not know about, the copy kept in the boot sector is used.
///
/// # Errors
///
/// Fails if the device cannot be read, or if a FAT volume's label can be
/// found neither through udev nor in its boot sector. An unknown label is
/// never reported as empty, since an empty label gets overwritten.
pub fn volume_details(volume: &RemovableVolume) -> io::Result<VolumeDetails> {
    let disks = Disks::new_with_refreshed_list();
    let disk = disks
        .iter()
        .find(|d| d.name().to_string_lossy() == volume.id.as_str())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is no longer mounted", volume.id),
            )
        })?;

    let fs_name = disk.file_system().to_string_lossy().to_string();
    let udev_label = label_for_device(Path::new(&volume.id));

    let (filesystem, label) = if matches!(fs_name.as_str(), "vfat" | "msdos" | "fat") {
        let mut boot_sector = [0u8; BOOT_SECTOR_SIZE];
        File::open(&volume.id)?.read_exact(&mut boot_sector)?;
        let kind = fat_type(&boot_sector).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "unrecognized FAT boot sector")
        })?;
        let label = match udev_label {
            Some(label) => label,
            None => boot_sector_label(&boot_sector, kind).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("cannot determine the volume label of {}", volume.id),
                )
            })?,
        };
        (kind.to_string(), label)
    } else {
        (fs_name, udev_label.unwrap_or_default())
    };

    debug!(volume = %volume.id, %filesystem, %label, "read volume details");

    Ok(VolumeDetails { filesystem, label })
}

/// Writes a FAT volume label with `fatlabel` from dosfstools.
pub fn set_volume_label(volume: &RemovableVolume, label: &str) -> io::Result<()> {
    let fatlabel = which::which("fatlabel").map_err(|_| {
        io::Error::new(
            io::ErrorKind::NotFound,
            "fatlabel not found; install dosfstools",
        )
    })?;

    let output = Command::new(fatlabel).arg(&volume.id).arg(label).output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(io::Error::other(format!(
            "fatlabel exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }
    Ok(())
}

/// Flushes filesystem buffers so the device is safe to unplug.
pub fn flush_buffers() {
    nix::unistd::sync();
}

/// Reads the filesystem type string out of a FAT boot sector.
///
/// FAT32 keeps it at offset 82, FAT12/16 at offset 54. FAT12 is reported as
/// such and later rejected.
pub(crate) fn fat_type(boot_sector: &[u8]) -> Option<&'static str> {
    if boot_sector.len() < 90 {
        return None;
    }
    if boot_sector[82..90].starts_with(b"FAT32") {
        return Some("FAT32");
    }
    let legacy = &boot_sector[54..62];
    if legacy.starts_with(b"FAT16") {
        Some("FAT16")
    } else if legacy.starts_with(b"FAT12") {
        Some("FAT12")
    } else {
        None
    }
}

/// Reads the volume label kept in a FAT boot sector.
///
/// The label sits after the extended boot signature: offset 71 on FAT32,
/// offset 43 on FAT12/16. `NO NAME` is what formatters write for an
/// unlabelled volume and is returned as an empty label. Returns `None` if the
/// sector carries no extended boot signature, so it holds no label at all.
pub(crate) fn boot_sector_label(boot_sector: &[u8], kind: &str) -> Option<String> {
    let (signature, offset) = if kind == "FAT32" { (66, 71) } else { (38, 43) };
    if boot_sector.len() < offset + FAT_LABEL_LEN
        || boot_sector[signature] != EXTENDED_BOOT_SIGNATURE
    {
        return None;
    }
    let raw = &boot_sector[offset..offset + FAT_LABEL_LEN];
    let label = String::from_utf8_lossy(raw)
        .trim_end_matches([' ', '\0'])
        .to_string();
    if label == "NO NAME" {
        Some(String::new())
    } else {
        Some(label)
    }
}

/// Maps a partition to the disk it lives on: `/dev/sdb1` to `/dev/sdb`,
/// `/dev/nvme0n1p2` to `/dev/nvme0n1`. Whole disks map to themselves.
pub(crate) fn parent_device(partition: &Path) -> PathBuf {
    let path = partition.to_string_lossy();
    let without_digits = path.trim_end_matches(|c: char| c.is_ascii_digit());
    if without_digits.len() == path.len() {
        return partition.to_path_buf();
    }

    // nvme0n1p2 and mmcblk0p1 separate the partition number with a `p`
    // because the disk name itself ends in a digit.
    if let Some(disk) = without_digits.strip_suffix('p')
        && disk.ends_with(|c: char| c.is_ascii_digit())
    {
        return PathBuf::from(disk);
    }
    if path.starts_with("/dev/nvme") || path.starts_with("/dev/mmcblk") {
        return partition.to_path_buf();
    }
    PathBuf::from(without_digits)
}

/// Finds the label udev recorded for `device`.
fn label_for_device(device: &Path) -> Option<String> {
    let target = fs::canonicalize(device).ok()?;
    let links = fs::read_dir("/dev/disk/by-label").ok()?;

    links
        .filter_map(Result::ok)
        .find(|entry| fs::canonicalize(entry.path()).ok().as_deref() == Some(target.as_path()))
        .map(|entry| unescape_udev(&entry.file_name().to_string_lossy()))
}

/// Decodes udev's `\xNN` escapes in `/dev/disk/by-label` names.
pub(crate) fn unescape_udev(name: &str) -> String {
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() && bytes[i + 1] == b'x' {
            let hex = std::str::from_utf8(&bytes[i + 2..i + 4]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
