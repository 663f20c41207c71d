use std::fmt;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};

/// A removable storage volume discovered on the host.
///
/// Volumes are discovered fresh on every run by the platform functions in
/// [`crate::platform`] and are never persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct RemovableVolume {
    /// The raw device designator (e.g., `F:` or `/dev/sdb1`). This is what
    /// the bootloader installer is pointed at.
    pub id: String,
    /// The directory the volume's filesystem is reachable at (e.g., `F:\` or
    /// `/run/media/user/USB`).
    pub root: PathBuf,
    /// The total size of the volume in gigabytes (GB), when the platform
    /// reports it.
    pub size_gb: Option<f64>,
}

impl RemovableVolume {
    /// Builds the volume for a Windows drive letter, e.g. `'f'` -> `F:` rooted at `F:\`.
    pub fn from_drive_letter(letter: char) -> Self {
        let letter = letter.to_ascii_uppercase();
        Self {
            id: format!("{letter}:"),
            root: PathBuf::from(format!("{letter}:{MAIN_SEPARATOR}")),
            size_gb: None,
        }
    }

    /// Joins a path relative to the volume's root.
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }
}

impl fmt::Display for RemovableVolume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = match self.size_gb {
            Some(gb) => format!("{gb:.1} GB"),
            None => "-".to_string(),
        };
        write!(f, "{:<15} {:>9} [{}]", self.id, size, self.root.display())
    }
}

/// Normalizes a drive designator typed by the operator.
///
/// Drive-letter forms (`f`, `f:`, `F:\`, `f:/`) become the canonical
/// uppercase form with a trailing path separator (`F:\` on Windows). Anything
/// else, such as a device path, is returned trimmed but otherwise untouched.
pub fn normalize_designator(input: &str) -> String {
    let trimmed = input.trim();
    let mut chars = trimmed.chars();
    let letter = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => c,
        _ => return trimmed.to_string(),
    };
    let rest: String = chars.collect();
    if matches!(rest.as_str(), "" | ":" | ":\\" | ":/") {
        format!("{}:{MAIN_SEPARATOR}", letter.to_ascii_uppercase())
    } else {
        trimmed.to_string()
    }
}

/// The filesystem family found on a volume.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilesystemKind {
    Fat16,
    Fat32,
    /// Anything else, carrying the name the platform reported.
    Other(String),
}

impl FilesystemKind {
    /// Classifies a platform-reported filesystem name.
    ///
    /// Windows reports FAT16 volumes as plain `FAT`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "FAT" | "FAT16" => Self::Fat16,
            "FAT32" => Self::Fat32,
            _ => Self::Other(name.trim().to_string()),
        }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Fat16 | Self::Fat32)
    }
}

impl fmt::Display for FilesystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fat16 => f.write_str("FAT16"),
            Self::Fat32 => f.write_str("FAT32"),
            Self::Other(name) if name.is_empty() => f.write_str("unknown"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// Filesystem metadata of the selected volume.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilesystemInfo {
    pub kind: FilesystemKind,
    /// The volume label. Empty until one is assigned.
    pub label: String,
}

/// The disc image chosen for installation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageFile {
    pub path: PathBuf,
}

impl ImageFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

impl fmt::Display for ImageFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drive_letters_normalize_to_canonical_root() {
        let expected = format!("F:{MAIN_SEPARATOR}");
        for input in ["f", "f:", "F:", " f:\\ ", "f:/"] {
            assert_eq!(normalize_designator(input), expected, "input {input:?}");
        }
    }

    #[test]
    fn device_paths_are_left_alone() {
        assert_eq!(normalize_designator(" /dev/sdb1 "), "/dev/sdb1");
        assert_eq!(normalize_designator("2"), "2");
    }

    #[test]
    fn from_drive_letter_uppercases() {
        let volume = RemovableVolume::from_drive_letter('e');
        assert_eq!(volume.id, "E:");
        assert_eq!(volume.root, PathBuf::from(format!("E:{MAIN_SEPARATOR}")));
    }

    #[test]
    fn filesystem_names_classify() {
        assert_eq!(FilesystemKind::from_name("FAT"), FilesystemKind::Fat16);
        assert_eq!(FilesystemKind::from_name("fat16"), FilesystemKind::Fat16);
        assert_eq!(FilesystemKind::from_name("FAT32"), FilesystemKind::Fat32);
        assert_eq!(
            FilesystemKind::from_name("NTFS"),
            FilesystemKind::Other("NTFS".into())
        );
        assert!(!FilesystemKind::from_name("exFAT").is_supported());
    }
}
