use super::{VolumeDetails, VolumeEntry};
use crate::volume::RemovableVolume;
use std::io;
use std::iter::once;
use std::ptr;
use windows_sys::Win32::Storage::FileSystem::{
    GetDriveTypeW, GetLogicalDrives, GetVolumeInformationW, SetVolumeLabelW,
};

// winbase.h
const DRIVE_REMOVABLE: u32 = 2;
const MAX_PATH: usize = 261;

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(once(0)).collect()
}

fn from_wide(buf: &[u16]) -> String {
    let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..len])
}

fn root_of(volume: &RemovableVolume) -> Vec<u16> {
    wide(&volume.root.to_string_lossy())
}

/// Scans every drive letter on a Windows system.
///
/// A drive is reported as removable when `GetDriveTypeW` says
/// `DRIVE_REMOVABLE`, which is what USB flash media report.
pub fn list_volumes() -> io::Result<Vec<VolumeEntry>> {
    let mask = unsafe { GetLogicalDrives() };
    if mask == 0 {
        return Err(io::Error::last_os_error());
    }

    let mut entries = Vec::new();
    for (bit, letter) in (b'A'..=b'Z').enumerate() {
        if mask & (1 << bit) == 0 {
            continue;
        }
        let volume = RemovableVolume::from_drive_letter(char::from(letter));
        let drive_type = unsafe { GetDriveTypeW(root_of(&volume).as_ptr()) };
        entries.push(VolumeEntry {
            volume,
            removable: drive_type == DRIVE_REMOVABLE,
        });
    }
    Ok(entries)
}

/// Reads the filesystem name (`FAT`, `FAT32`, `NTFS`, ...) and label of a drive.
pub fn volume_details(volume: &RemovableVolume) -> io::Result<VolumeDetails> {
    let root = root_of(volume);
    let mut label = [0u16; MAX_PATH];
    let mut filesystem = [0u16; MAX_PATH];

    let ok = unsafe {
        GetVolumeInformationW(
            root.as_ptr(),
            label.as_mut_ptr(),
            label.len() as u32,
            ptr::null_mut(),
            ptr::null_mut(),
            ptr::null_mut(),
            filesystem.as_mut_ptr(),
            filesystem.len() as u32,
        )
    };
    if ok == 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(VolumeDetails {
        filesystem: from_wide(&filesystem),
        label: from_wide(&label),
    })
}

/// Writes a volume label with `SetVolumeLabelW`.
pub fn set_volume_label(volume: &RemovableVolume, label: &str) -> io::Result<()> {
    let root = root_of(volume);
    let label = wide(label);
    let ok = unsafe { SetVolumeLabelW(root.as_ptr(), label.as_ptr()) };
    if ok == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Windows flushes removable media on its own once the handles are closed.
pub fn flush_buffers() {}
