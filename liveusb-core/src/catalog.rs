//! Removable volume discovery and selection.
use crate::error::{InstallError, Result};
use crate::platform::VolumeHost;
use crate::select::{self, Chooser};
use crate::volume::{RemovableVolume, normalize_designator};
use tracing::{debug, info};

/// Lists the volumes the host reports as removable.
///
/// # Errors
///
/// Returns [`InstallError::NoDeviceFound`] when no removable volume is
/// present, or [`InstallError::DeviceQuery`] when the host cannot enumerate
/// its volumes at all.
pub fn list_removable_volumes(host: &dyn VolumeHost) -> Result<Vec<RemovableVolume>> {
    let entries = host.list_volumes().map_err(InstallError::DeviceQuery)?;
    debug!(total = entries.len(), "enumerated storage volumes");

    let mut volumes: Vec<RemovableVolume> = Vec::new();
    for entry in entries.into_iter().filter(|e| e.removable) {
        if !volumes.iter().any(|v| v.id == entry.volume.id) {
            volumes.push(entry.volume);
        }
    }

    if volumes.is_empty() {
        return Err(InstallError::NoDeviceFound);
    }
    Ok(volumes)
}

/// Picks the target volume.
///
/// A single volume is taken without asking. Otherwise the operator is shown
/// the list and may answer with a 1-based index or with the designator
/// itself (`f`, `F:`, `/dev/sdb1`, ...).
pub fn select_volume(
    mut volumes: Vec<RemovableVolume>,
    chooser: &mut dyn Chooser,
) -> Result<RemovableVolume> {
    match volumes.len() {
        0 => return Err(InstallError::NoDeviceFound),
        1 => {
            let volume = volumes.remove(0);
            info!(volume = %volume.id, "using the only removable device");
            return Ok(volume);
        }
        _ => {}
    }

    let items: Vec<String> = volumes.iter().map(ToString::to_string).collect();
    let answer = chooser
        .choose("Which drive do you want to put Fedora on", &items)
        .map_err(InstallError::Prompt)?;

    let index = match select::parse_index(&answer, volumes.len()) {
        Ok(index) => index,
        Err(not_an_index) => {
            let wanted = normalize_designator(&answer);
            volumes
                .iter()
                .position(|v| normalize_designator(&v.id) == wanted)
                .ok_or(not_an_index)?
        }
    };

    let volume = volumes.swap_remove(index);
    info!(volume = %volume.id, "operator selected device");
    Ok(volume)
}
